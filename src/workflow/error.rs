//! Workflow error types.

use crate::client::ApiError;

/// A locally detected precondition failure. Never reaches the network.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Please upload a PDF or DOCX file (got {0})")]
    UnsupportedFileType(String),

    #[error("Please select a file first")]
    NoFileSelected,

    #[error("Please upload a document first")]
    NoDocumentUploaded,

    #[error("Please select at least one artifact type")]
    NoArtifactSelected,

    #[error("Specification text is empty")]
    EmptySpecText,

    #[error("No artifacts have been generated yet")]
    NothingGenerated,

    #[error("No artifacts to push. Please generate artifacts first.")]
    NoArtifactsToPush,

    #[error(
        "Unknown artifact type: {0} (expected one of epic, stories, use_cases, tdd, data_model)"
    )]
    UnknownArtifactType(String),

    #[error("Unknown output format: {0} (expected docx or pdf)")]
    UnknownOutputFormat(String),
}

/// Result type for workflow operations.
pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// Error types for workflow operations.
///
/// Transport failures are tagged with the step that issued them so the
/// message shown to the user names what failed.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Upload failed: {0}")]
    Upload(#[source] ApiError),

    #[error("Generation failed: {0}")]
    Generation(#[source] ApiError),

    #[error("Download failed: {0}")]
    Download(#[source] ApiError),

    #[error("Push to tracker failed: {0}")]
    Push(#[source] ApiError),

    #[error("Could not read {path}: {source}")]
    ReadDocument {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not save {path}: {source}")]
    SaveArtifact {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl WorkflowError {
    /// Whether this error was raised locally without a network call.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// The transport error behind this failure, if any.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Upload(e) | Self::Generation(e) | Self::Download(e) | Self::Push(e) => Some(e),
            _ => None,
        }
    }
}
