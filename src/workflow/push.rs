//! Pushing generated artifacts to the issue tracker.
//!
//! The pushed set is always the key set of the last successful generation,
//! not the current selection. Pushes are at-most-once: nothing is retried and
//! partially created items are not rolled back.

use crate::client::{Backend, PushRequest};

use super::error::{ValidationError, WorkflowError, WorkflowResult};
use super::state::WorkflowState;
use super::types::{PushOptions, PushResult};

/// Submits generated artifacts as tracker work items.
pub struct PushCoordinator<'a, B: ?Sized> {
    backend: &'a B,
    state: &'a mut WorkflowState,
}

impl<'a, B: Backend + ?Sized> PushCoordinator<'a, B> {
    pub fn new(backend: &'a B, state: &'a mut WorkflowState) -> Self {
        Self { backend, state }
    }

    /// Build the request body from the last generation.
    pub fn build_request(&self, options: &PushOptions) -> Result<PushRequest, ValidationError> {
        let artifact_types = self
            .state
            .generation
            .as_ref()
            .map(|g| g.artifact_types())
            .filter(|types| !types.is_empty())
            .ok_or(ValidationError::NoArtifactsToPush)?;

        Ok(PushRequest {
            artifact_types,
            work_item_type: options.work_item_type.clone(),
            project_name: options.project_name.clone(),
            area_path: options.area_path.clone(),
            iteration_path: options.iteration_path.clone(),
        })
    }

    /// Create work items for every artifact of the last generation.
    pub async fn push(&mut self, options: &PushOptions) -> WorkflowResult<PushResult> {
        let request = self.build_request(options)?;

        tracing::info!(
            artifacts = ?request.artifact_types,
            work_item_type = %request.work_item_type,
            "Pushing artifacts to tracker"
        );

        let result = self.backend.push(&request).await.map_err(WorkflowError::Push)?;

        for error in &result.errors {
            tracing::warn!(error = %error, "Tracker reported a partial failure");
        }
        tracing::info!(created = result.work_items_created.len(), "Push complete");

        self.state.last_push = Some(result.clone());
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::client::mock::MockBackend;
    use crate::client::{ApiError, Operation};
    use crate::workflow::{ArtifactType, GenerationResult, OutputFormat};

    fn generated_state(types: &[ArtifactType]) -> WorkflowState {
        WorkflowState {
            generation: Some(GenerationResult {
                message: "ok".to_string(),
                file_paths: types.iter().map(|t| (*t, format!("{}.docx", t))).collect(),
                artifacts: BTreeMap::new(),
                format: OutputFormat::Docx,
            }),
            ..WorkflowState::default()
        }
    }

    #[tokio::test]
    async fn test_push_without_generation_makes_no_call() {
        let backend = MockBackend::new();
        let mut state = WorkflowState::new();

        let err = PushCoordinator::new(&backend, &mut state)
            .push(&PushOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(ValidationError::NoArtifactsToPush)));
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_push_with_empty_generation_makes_no_call() {
        let backend = MockBackend::new();
        let mut state = generated_state(&[]);

        let err = PushCoordinator::new(&backend, &mut state)
            .push(&PushOptions::default())
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_push_sends_generated_keys_not_selection() {
        let backend = MockBackend::new();
        let mut state = generated_state(&[ArtifactType::Epic, ArtifactType::Tdd]);
        state.selection.set(ArtifactType::Tdd, false);
        state.selection.set(ArtifactType::Stories, true);

        let result = PushCoordinator::new(&backend, &mut state)
            .push(&PushOptions::default())
            .await
            .unwrap();

        let request = backend.last_push().unwrap();
        assert_eq!(request.artifact_types, vec![ArtifactType::Epic, ArtifactType::Tdd]);
        assert_eq!(request.work_item_type, "User Story");
        assert_eq!(result.work_items_created.len(), 2);
        assert_eq!(state.last_push(), Some(&result));
    }

    #[tokio::test]
    async fn test_push_forwards_placement() {
        let backend = MockBackend::new();
        let mut state = generated_state(&[ArtifactType::Stories]);
        let options = PushOptions {
            project_name: Some("Checkout".to_string()),
            iteration_path: Some("Checkout\\Sprint 12".to_string()),
            ..PushOptions::new("Epic")
        };

        PushCoordinator::new(&backend, &mut state).push(&options).await.unwrap();

        let request = backend.last_push().unwrap();
        assert_eq!(request.work_item_type, "Epic");
        assert_eq!(request.project_name.as_deref(), Some("Checkout"));
        assert!(request.area_path.is_none());
    }

    #[tokio::test]
    async fn test_push_failure_is_not_retried() {
        let backend = MockBackend::new();
        backend.fail_next(
            Operation::Push,
            ApiError::Http {
                status: 400,
                detail: "Azure DevOps Personal Access Token not configured".to_string(),
            },
        );
        let mut state = generated_state(&[ArtifactType::Epic]);

        let err = PushCoordinator::new(&backend, &mut state)
            .push(&PushOptions::default())
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Push to tracker failed: Azure DevOps Personal Access Token not configured"
        );
        assert_eq!(backend.calls_of(Operation::Push).len(), 1);
        assert!(state.last_push().is_none());
    }
}
