//! Chat transcript with two-phase assistant replies.
//!
//! Starting an exchange appends the user's message together with a pending
//! assistant slot directly after it. Resolving the exchange fills that slot in
//! place, so replies always sit next to the message they answer, whatever
//! order the calls complete in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::client::ChatTurn;

/// Author of a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Sequence number tying an assistant reply to the message it answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExchangeId(u64);

impl ExchangeId {
    pub fn get(&self) -> u64 {
        self.0
    }
}

/// Lifecycle of a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    /// Waiting for the service to answer
    Pending,
    /// A user message or a service reply
    Complete,
    /// An error message recorded in place of a reply
    Failed,
}

/// One message in the transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptEntry {
    pub role: Role,
    pub content: String,
    pub exchange: ExchangeId,
    pub status: EntryStatus,
    pub created_at: DateTime<Utc>,
}

/// How an exchange ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Answer(String),
    Error(String),
}

/// Ordered, append-only conversation for one session.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
    next_exchange: u64,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a user message and reserve the slot for its reply.
    pub fn begin(&mut self, message: impl Into<String>) -> ExchangeId {
        let exchange = ExchangeId(self.next_exchange);
        self.next_exchange += 1;
        let now = Utc::now();

        self.entries.push(TranscriptEntry {
            role: Role::User,
            content: message.into(),
            exchange,
            status: EntryStatus::Complete,
            created_at: now,
        });
        self.entries.push(TranscriptEntry {
            role: Role::Assistant,
            content: String::new(),
            exchange,
            status: EntryStatus::Pending,
            created_at: now,
        });

        exchange
    }

    /// Fill the reply slot of an exchange.
    ///
    /// Returns false when the exchange is unknown or already resolved.
    pub fn resolve(&mut self, exchange: ExchangeId, reply: Reply) -> bool {
        let Some(slot) = self.entries.iter_mut().find(|e| {
            e.exchange == exchange && e.role == Role::Assistant && e.status == EntryStatus::Pending
        }) else {
            return false;
        };

        let (content, status) = match reply {
            Reply::Answer(text) => (text, EntryStatus::Complete),
            Reply::Error(text) => (text, EntryStatus::Failed),
        };
        slot.content = content;
        slot.status = status;
        slot.created_at = Utc::now();
        true
    }

    /// All entries, pending slots included.
    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    /// Entries that are not waiting for a reply.
    pub fn settled(&self) -> impl Iterator<Item = &TranscriptEntry> {
        self.entries.iter().filter(|e| e.status != EntryStatus::Pending)
    }

    /// Whether any exchange is still waiting for its reply.
    pub fn has_pending(&self) -> bool {
        self.entries.iter().any(|e| e.status == EntryStatus::Pending)
    }

    /// Prior conversation suitable as context for the service.
    ///
    /// Pending slots and recorded errors are left out.
    pub fn history(&self) -> Vec<ChatTurn> {
        self.entries
            .iter()
            .filter(|e| e.status == EntryStatus::Complete)
            .map(|e| ChatTurn { role: e.role, content: e.content.clone() })
            .collect()
    }

    /// The last settled entry.
    pub fn last(&self) -> Option<&TranscriptEntry> {
        self.settled().last()
    }

    /// Number of entries, pending slots included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Start a new conversation.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
