//! Artifact selection and generation.

use crate::client::{Backend, GenerateRequest};

use super::error::{ValidationError, WorkflowError, WorkflowResult};
use super::state::WorkflowState;
use super::types::{ArtifactType, GenerationResult, OutputFormat};

/// Where the specification for a generation request comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecSource {
    /// Server path of an uploaded document
    FilePath(String),
    /// Raw specification text
    Text(String),
}

/// Manages the artifact selection and submits generation requests.
pub struct GenerationCoordinator<'a, B: ?Sized> {
    backend: &'a B,
    state: &'a mut WorkflowState,
}

impl<'a, B: Backend + ?Sized> GenerationCoordinator<'a, B> {
    pub fn new(backend: &'a B, state: &'a mut WorkflowState) -> Self {
        Self { backend, state }
    }

    /// Include or exclude an artifact type from the next request.
    pub fn toggle_artifact_type(&mut self, artifact: ArtifactType, included: bool) {
        self.state.selection.set(artifact, included);
    }

    /// Set the output format for generation and download.
    pub fn set_output_format(&mut self, format: OutputFormat) {
        self.state.format = format;
    }

    /// Generate the selected artifacts from the uploaded document.
    ///
    /// Fails locally, before any call, when nothing is uploaded or nothing is
    /// selected. A failed call leaves the previous result in place.
    pub async fn generate(&mut self) -> WorkflowResult<GenerationResult> {
        let upload = self.state.upload.as_ref().ok_or(ValidationError::NoDocumentUploaded)?;
        let source = SpecSource::FilePath(upload.file_path.clone());
        self.submit(source).await
    }

    /// Generate the selected artifacts from raw specification text.
    ///
    /// Does not require an upload.
    pub async fn generate_from_text(&mut self, text: &str) -> WorkflowResult<GenerationResult> {
        if text.trim().is_empty() {
            return Err(ValidationError::EmptySpecText.into());
        }
        self.submit(SpecSource::Text(text.to_string())).await
    }

    /// Build the request body for the current selection and format.
    pub fn build_request(&self, source: SpecSource) -> Result<GenerateRequest, ValidationError> {
        if self.state.selection.is_empty() {
            return Err(ValidationError::NoArtifactSelected);
        }

        let (spec_file_path, spec_text) = match source {
            SpecSource::FilePath(path) => (Some(path), None),
            SpecSource::Text(text) => (None, Some(text)),
        };

        Ok(GenerateRequest {
            spec_file_path,
            spec_text,
            artifact_types: self.state.selection.selected(),
            output_format: self.state.format,
        })
    }

    async fn submit(&mut self, source: SpecSource) -> WorkflowResult<GenerationResult> {
        let request = self.build_request(source)?;
        let format = request.output_format;

        tracing::info!(
            artifacts = ?request.artifact_types,
            format = %format,
            "Generating artifacts"
        );

        let response = self.backend.generate(&request).await.map_err(WorkflowError::Generation)?;
        let result = response.into_result(format);

        tracing::info!(
            generated = result.file_paths.len(),
            message = %result.message,
            "Generation complete"
        );
        self.state.generation = Some(result.clone());
        Ok(result)
    }
}
