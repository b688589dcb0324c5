//! Explicit workflow state.
//!
//! Everything the pipeline remembers between steps lives in one value. The
//! coordinators borrow it; each writes only the entities it produces.

use serde::{Deserialize, Serialize};

use super::types::{
    ArtifactSelection, DocumentCandidate, GenerationResult, OutputFormat, PushResult,
    UploadReference,
};

/// Coarse position in the upload → generate → download/push pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum WorkflowStage {
    /// Nothing uploaded yet; only the assistant is available
    NoDocument,
    /// A document is uploaded; generation is unlocked
    DocumentReady,
    /// Artifacts exist; download and push are unlocked
    ArtifactsReady,
}

impl std::fmt::Display for WorkflowStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::NoDocument => "no document",
            Self::DocumentReady => "document ready",
            Self::ArtifactsReady => "artifacts ready",
        };
        f.write_str(name)
    }
}

/// Session state shared by the coordinators.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowState {
    pub(super) selected_file: Option<DocumentCandidate>,
    pub(super) upload: Option<UploadReference>,
    pub(super) selection: ArtifactSelection,
    pub(super) format: OutputFormat,
    pub(super) generation: Option<GenerationResult>,
    pub(super) last_push: Option<PushResult>,
}

impl WorkflowState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current pipeline stage.
    pub fn stage(&self) -> WorkflowStage {
        if self.generation.as_ref().is_some_and(|g| !g.is_empty()) {
            WorkflowStage::ArtifactsReady
        } else if self.upload.is_some() {
            WorkflowStage::DocumentReady
        } else {
            WorkflowStage::NoDocument
        }
    }

    /// Document accepted for the next upload.
    pub fn selected_file(&self) -> Option<&DocumentCandidate> {
        self.selected_file.as_ref()
    }

    /// Reference from the most recent successful upload.
    pub fn upload(&self) -> Option<&UploadReference> {
        self.upload.as_ref()
    }

    /// Artifact types the next generation will request.
    pub fn selection(&self) -> &ArtifactSelection {
        &self.selection
    }

    /// Output format for generation and download.
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Result of the most recent successful generation.
    pub fn generation(&self) -> Option<&GenerationResult> {
        self.generation.as_ref()
    }

    /// Result of the most recent successful push.
    pub fn last_push(&self) -> Option<&PushResult> {
        self.last_push.as_ref()
    }
}
