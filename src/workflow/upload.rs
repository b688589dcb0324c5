//! Document selection and upload.

use crate::client::{Backend, UploadPayload};

use super::error::{ValidationError, WorkflowError, WorkflowResult};
use super::state::WorkflowState;
use super::types::{DocumentCandidate, UploadReference};

/// Selects and uploads the specification document.
pub struct UploadCoordinator<'a, B: ?Sized> {
    backend: &'a B,
    state: &'a mut WorkflowState,
}

impl<'a, B: Backend + ?Sized> UploadCoordinator<'a, B> {
    pub fn new(backend: &'a B, state: &'a mut WorkflowState) -> Self {
        Self { backend, state }
    }

    /// Accept a PDF or DOCX document for the next upload.
    ///
    /// A rejected candidate leaves the previous selection in place.
    pub fn select_file(&mut self, candidate: DocumentCandidate) -> Result<(), ValidationError> {
        if !candidate.is_supported() {
            tracing::debug!(
                file = %candidate.file_name,
                mime = %candidate.mime_type,
                "Rejected file"
            );
            return Err(ValidationError::UnsupportedFileType(candidate.mime_type));
        }
        self.state.selected_file = Some(candidate);
        Ok(())
    }

    /// Upload the selected document.
    ///
    /// On success the returned reference replaces any earlier one.
    pub async fn upload(&mut self) -> WorkflowResult<UploadReference> {
        let candidate =
            self.state.selected_file.as_ref().ok_or(ValidationError::NoFileSelected)?;

        let bytes = tokio::fs::read(&candidate.path).await.map_err(|source| {
            WorkflowError::ReadDocument { path: candidate.path.display().to_string(), source }
        })?;

        let payload = UploadPayload {
            file_name: candidate.file_name.clone(),
            mime_type: candidate.mime_type.clone(),
            bytes,
        };

        let response = self.backend.upload(payload).await.map_err(WorkflowError::Upload)?;
        let reference = UploadReference::from(response);

        tracing::info!(
            file = %reference.file_name,
            path = %reference.file_path,
            indexed = ?reference.indexed,
            "Document uploaded"
        );
        self.state.upload = Some(reference.clone());
        Ok(reference)
    }
}
