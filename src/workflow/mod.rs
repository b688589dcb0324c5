//! Document-to-work-item workflow.
//!
//! [`Workflow`] owns the backend handle, the explicit [`WorkflowState`] and the
//! chat [`Assistant`]. Each pipeline step is implemented by a coordinator that
//! borrows the state for the duration of its call:
//!
//! - [`UploadCoordinator`]: choose and upload the specification document
//! - [`GenerationCoordinator`]: choose artifact types and format, generate
//! - [`DownloadCoordinator`]: save generated documents locally
//! - [`PushCoordinator`]: create tracker work items from generated artifacts
//!
//! Because each step needs `&mut` access to the state, a second call of the
//! same kind cannot start while one is in flight.

mod assistant;
mod download;
mod error;
mod generate;
mod push;
mod state;
mod transcript;
mod types;
mod upload;

use std::path::{Path, PathBuf};

pub use assistant::{Assistant, SendOutcome};
pub use download::{DownloadCoordinator, SavedArtifact};
pub use error::{ValidationError, WorkflowError, WorkflowResult};
pub use generate::{GenerationCoordinator, SpecSource};
pub use push::PushCoordinator;
pub use state::{WorkflowStage, WorkflowState};
pub use transcript::{EntryStatus, ExchangeId, Reply, Role, Transcript, TranscriptEntry};
pub use types::{
    ArtifactSelection, ArtifactType, DocumentCandidate, GenerationResult, OutputFormat,
    PushOptions, PushResult, UploadReference, WorkItem, WorkItemId, DEFAULT_WORK_ITEM_TYPE,
    DOCX_MIME, PDF_MIME,
};
pub use upload::UploadCoordinator;

use crate::client::{ApiResult, Backend, HealthResponse};

/// A user session over one backend.
pub struct Workflow<B> {
    backend: B,
    state: WorkflowState,
    assistant: Assistant,
    download_dir: PathBuf,
}

impl<B: Backend> Workflow<B> {
    /// Start a fresh session. Downloads go to the current directory.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            state: WorkflowState::new(),
            assistant: Assistant::new(),
            download_dir: PathBuf::from("."),
        }
    }

    /// Resume from a previously saved state.
    pub fn with_state(mut self, state: WorkflowState) -> Self {
        self.state = state;
        self
    }

    /// Directory downloaded documents are saved to.
    pub fn with_download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = dir.into();
        self
    }

    /// Replace the chat assistant.
    pub fn with_assistant(mut self, assistant: Assistant) -> Self {
        self.assistant = assistant;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    /// Give up the session, keeping its state.
    pub fn into_state(self) -> WorkflowState {
        self.state
    }

    pub fn stage(&self) -> WorkflowStage {
        self.state.stage()
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    pub fn upload_coordinator(&mut self) -> UploadCoordinator<'_, B> {
        UploadCoordinator::new(&self.backend, &mut self.state)
    }

    pub fn generation_coordinator(&mut self) -> GenerationCoordinator<'_, B> {
        GenerationCoordinator::new(&self.backend, &mut self.state)
    }

    pub fn download_coordinator(&self) -> DownloadCoordinator<'_, B> {
        DownloadCoordinator::new(&self.backend, &self.state, &self.download_dir)
    }

    pub fn push_coordinator(&mut self) -> PushCoordinator<'_, B> {
        PushCoordinator::new(&self.backend, &mut self.state)
    }

    pub fn select_file(&mut self, candidate: DocumentCandidate) -> Result<(), ValidationError> {
        self.upload_coordinator().select_file(candidate)
    }

    pub async fn upload(&mut self) -> WorkflowResult<UploadReference> {
        self.upload_coordinator().upload().await
    }

    pub fn toggle_artifact_type(&mut self, artifact: ArtifactType, included: bool) {
        self.generation_coordinator().toggle_artifact_type(artifact, included);
    }

    pub fn set_output_format(&mut self, format: OutputFormat) {
        self.generation_coordinator().set_output_format(format);
    }

    pub async fn generate(&mut self) -> WorkflowResult<GenerationResult> {
        self.generation_coordinator().generate().await
    }

    pub async fn generate_from_text(&mut self, text: &str) -> WorkflowResult<GenerationResult> {
        self.generation_coordinator().generate_from_text(text).await
    }

    pub async fn download(&self, artifact: ArtifactType) -> WorkflowResult<SavedArtifact> {
        self.download_coordinator().download(artifact).await
    }

    pub async fn download_latest(&self) -> WorkflowResult<SavedArtifact> {
        self.download_coordinator().download_latest().await
    }

    pub async fn push(&mut self, options: &PushOptions) -> WorkflowResult<PushResult> {
        self.push_coordinator().push(options).await
    }

    pub fn assistant(&self) -> &Assistant {
        &self.assistant
    }

    pub fn assistant_mut(&mut self) -> &mut Assistant {
        &mut self.assistant
    }

    /// Send a chat message through the session's assistant.
    pub async fn chat(&mut self, text: &str) -> SendOutcome {
        self.assistant.send(&self.backend, text).await
    }

    /// Check that the service is up.
    pub async fn health(&self) -> ApiResult<HealthResponse> {
        self.backend.health().await
    }
}
