//! Saved workflow session.
//!
//! Keeps the workflow state (upload reference, selection, last generation,
//! last push) between CLI invocations. The chat transcript is not saved.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::workflow::WorkflowState;

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "REQFLOW_DATA_DIR";

const SESSION_VERSION: u32 = 1;

/// On-disk session file contents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SavedSession {
    /// Version for future migrations
    #[serde(default)]
    pub version: u32,
    /// When the session was last written
    #[serde(default)]
    pub saved_at: Option<DateTime<Utc>>,
    /// Workflow state
    #[serde(default)]
    pub state: WorkflowState,
}

/// Loads and saves the session file.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    /// Session store at the default location.
    ///
    /// Uses `$REQFLOW_DATA_DIR/session.json` when set, otherwise
    /// `<data_dir>/reqflow/session.json`.
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self { path: Self::default_path()? })
    }

    /// Session store at a custom path.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn default_path() -> anyhow::Result<PathBuf> {
        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            if !dir.is_empty() {
                return Ok(PathBuf::from(dir).join("session.json"));
            }
        }

        let data_dir = crate::core::Config::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        Ok(data_dir.join("session.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the saved session, or an empty one if none exists.
    pub fn load(&self) -> anyhow::Result<SavedSession> {
        if !self.path.exists() {
            return Ok(SavedSession::default());
        }

        let content = fs::read_to_string(&self.path)?;
        let session: SavedSession = serde_json::from_str(&content).map_err(|e| {
            anyhow::anyhow!(
                "Session file {} is corrupt ({}). Run `reqflow reset` to start over.",
                self.path.display(),
                e
            )
        })?;
        Ok(session)
    }

    /// Load just the workflow state.
    pub fn load_state(&self) -> anyhow::Result<WorkflowState> {
        Ok(self.load()?.state)
    }

    /// Save the workflow state.
    pub fn save(&self, state: &WorkflowState) -> anyhow::Result<()> {
        let session = SavedSession {
            version: SESSION_VERSION,
            saved_at: Some(Utc::now()),
            state: state.clone(),
        };
        let content = serde_json::to_string_pretty(&session)?;

        // Ensure parent directory exists
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(&self.path, content)?;
        tracing::debug!(path = %self.path.display(), "Session saved");
        Ok(())
    }

    /// Delete the saved session. Returns whether a file was removed.
    pub fn reset(&self) -> anyhow::Result<bool> {
        if !self.path.exists() {
            return Ok(false);
        }
        fs::remove_file(&self.path)?;
        Ok(true)
    }
}
