//! Conversational assistant.
//!
//! Independent of the upload/generate pipeline. Failures never escape: they
//! are written into the transcript as the assistant's reply.

use crate::client::{Backend, ChatRequest};

use super::transcript::{Reply, Transcript};

/// What a call to [`Assistant::send`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Blank input; nothing recorded, nothing sent
    Ignored,
    /// The service answered
    Answered,
    /// The call failed and an error message was recorded as the reply
    Failed,
}

/// Chat session state: transcript plus retrieval mode.
#[derive(Debug, Clone)]
pub struct Assistant {
    transcript: Transcript,
    rag_mode: bool,
    include_history: bool,
}

impl Default for Assistant {
    fn default() -> Self {
        Self::new()
    }
}

impl Assistant {
    /// Create an assistant with retrieval enabled and no history forwarding.
    pub fn new() -> Self {
        Self { transcript: Transcript::new(), rag_mode: true, include_history: false }
    }

    /// Forward prior settled messages as `conversation_history`.
    pub fn with_history(mut self, include: bool) -> Self {
        self.include_history = include;
        self
    }

    /// Set the initial retrieval mode.
    pub fn with_rag_mode(mut self, enabled: bool) -> Self {
        self.rag_mode = enabled;
        self
    }

    /// Toggle retrieval for subsequent messages.
    pub fn set_rag_mode(&mut self, enabled: bool) {
        self.rag_mode = enabled;
    }

    pub fn rag_mode(&self) -> bool {
        self.rag_mode
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Start a new conversation.
    pub fn clear(&mut self) {
        self.transcript.clear();
    }

    /// Send a message and record the reply.
    ///
    /// Takes `&mut self` for the whole call, so sends on one session are
    /// serialized and the transcript follows submission order.
    pub async fn send<B>(&mut self, backend: &B, text: &str) -> SendOutcome
    where
        B: Backend + ?Sized,
    {
        if text.trim().is_empty() {
            return SendOutcome::Ignored;
        }

        let conversation_history = self.include_history.then(|| self.transcript.history());
        let exchange = self.transcript.begin(text);
        let request = ChatRequest {
            message: text.to_string(),
            use_rag: self.rag_mode,
            conversation_history,
        };

        match backend.chat(&request).await {
            Ok(response) => {
                tracing::debug!(exchange = exchange.get(), use_rag = request.use_rag, "Chat reply");
                self.transcript.resolve(exchange, Reply::Answer(response.response));
                SendOutcome::Answered
            }
            Err(e) => {
                tracing::warn!(exchange = exchange.get(), error = %e, "Chat request failed");
                self.transcript.resolve(exchange, Reply::Error(format!("Error: {}", e)));
                SendOutcome::Failed
            }
        }
    }
}
