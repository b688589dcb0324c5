//! Downloading generated artifacts to disk.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::client::Backend;

use super::error::{ValidationError, WorkflowError, WorkflowResult};
use super::state::WorkflowState;
use super::types::{ArtifactType, OutputFormat};

/// A document saved to disk by a download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedArtifact {
    /// Artifact type, or `None` for the service's most recent document
    pub artifact: Option<ArtifactType>,
    /// Format requested
    pub format: OutputFormat,
    /// Where the document was written
    pub path: PathBuf,
    /// Payload size in bytes
    pub size: usize,
}

/// Fetches generated documents and saves them under a target directory.
pub struct DownloadCoordinator<'a, B: ?Sized> {
    backend: &'a B,
    state: &'a WorkflowState,
    target_dir: &'a Path,
}

impl<'a, B: Backend + ?Sized> DownloadCoordinator<'a, B> {
    pub fn new(backend: &'a B, state: &'a WorkflowState, target_dir: &'a Path) -> Self {
        Self { backend, state, target_dir }
    }

    /// Download one artifact in the current output format and save it as
    /// `<artifact>.<format>`.
    ///
    /// Requires a completed generation. Whether `artifact` was part of that
    /// generation is left for the service to decide.
    pub async fn download(&self, artifact: ArtifactType) -> WorkflowResult<SavedArtifact> {
        let generation = self.state.generation.as_ref().ok_or(ValidationError::NothingGenerated)?;
        if !generation.contains(artifact) {
            tracing::warn!(artifact = %artifact, "Requesting artifact absent from last generation");
        }
        self.fetch(Some(artifact), artifact.as_str()).await
    }

    /// Download the service's most recent document in the current format and
    /// save it as `latest.<format>`.
    pub async fn download_latest(&self) -> WorkflowResult<SavedArtifact> {
        self.state.generation.as_ref().ok_or(ValidationError::NothingGenerated)?;
        self.fetch(None, "latest").await
    }

    async fn fetch(
        &self,
        artifact: Option<ArtifactType>,
        stem: &str,
    ) -> WorkflowResult<SavedArtifact> {
        let format = self.state.format;
        let bytes =
            self.backend.download(format, artifact).await.map_err(WorkflowError::Download)?;
        let size = bytes.len();

        let path = self.target_dir.join(format!("{}.{}", stem, format));
        let target = path.clone();
        tokio::task::spawn_blocking(move || save_atomically(&target, &bytes))
            .await
            .map_err(io::Error::other)
            .and_then(|saved| saved)
            .map_err(|source| WorkflowError::SaveArtifact {
                path: path.display().to_string(),
                source,
            })?;

        tracing::info!(path = %path.display(), size, "Artifact saved");
        Ok(SavedArtifact { artifact, format, path, size })
    }
}

/// Write `bytes` to a temporary file next to `path`, then rename it into place.
fn save_atomically(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    fs::create_dir_all(dir)?;

    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    file.write_all(bytes)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use tempfile::TempDir;

    use super::*;
    use crate::client::mock::{Call, MockBackend};
    use crate::client::{ApiError, Operation};
    use crate::workflow::GenerationResult;

    fn generated_state(types: &[ArtifactType], format: OutputFormat) -> WorkflowState {
        let file_paths: BTreeMap<_, _> =
            types.iter().map(|t| (*t, format!("data/generated/{}_1.{}", t, format))).collect();
        WorkflowState {
            format,
            generation: Some(GenerationResult {
                message: "ok".to_string(),
                file_paths,
                artifacts: BTreeMap::new(),
                format,
            }),
            ..WorkflowState::default()
        }
    }

    #[tokio::test]
    async fn test_download_saves_under_type_and_format() {
        let dir = TempDir::new().unwrap();
        let backend = MockBackend::new();
        let state = generated_state(&[ArtifactType::Epic], OutputFormat::Docx);

        let saved = DownloadCoordinator::new(&backend, &state, dir.path())
            .download(ArtifactType::Epic)
            .await
            .unwrap();

        assert_eq!(saved.path, dir.path().join("epic.docx"));
        assert_eq!(fs::read(&saved.path).unwrap(), b"epic.docx contents");
        assert_eq!(
            backend.calls(),
            vec![Call::Download { format: OutputFormat::Docx, artifact: Some(ArtifactType::Epic) }]
        );
    }

    #[tokio::test]
    async fn test_download_uses_current_format() {
        let dir = TempDir::new().unwrap();
        let backend = MockBackend::new();
        let mut state = generated_state(&[ArtifactType::Tdd], OutputFormat::Docx);
        state.format = OutputFormat::Pdf;

        let saved = DownloadCoordinator::new(&backend, &state, dir.path())
            .download(ArtifactType::Tdd)
            .await
            .unwrap();
        assert_eq!(saved.path.file_name().unwrap(), "tdd.pdf");
    }

    #[tokio::test]
    async fn test_download_before_generation_is_rejected() {
        let dir = TempDir::new().unwrap();
        let backend = MockBackend::new();
        let state = WorkflowState::new();

        let err = DownloadCoordinator::new(&backend, &state, dir.path())
            .download(ArtifactType::Epic)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(ValidationError::NothingGenerated)));
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_absent_type_reaches_service_and_surfaces_its_error() {
        let dir = TempDir::new().unwrap();
        let backend = MockBackend::new();
        backend.fail_next(
            Operation::Download,
            ApiError::Http {
                status: 404,
                detail: "No docx file found for artifact type: tdd".to_string(),
            },
        );
        let state = generated_state(&[ArtifactType::Epic], OutputFormat::Docx);

        let err = DownloadCoordinator::new(&backend, &state, dir.path())
            .download(ArtifactType::Tdd)
            .await
            .unwrap_err();

        assert_eq!(err.api_error().and_then(ApiError::status), Some(404));
        assert_eq!(err.to_string(), "Download failed: No docx file found for artifact type: tdd");
        assert_eq!(backend.call_count(), 1);
        assert!(!dir.path().join("tdd.docx").exists());
    }

    #[tokio::test]
    async fn test_download_latest() {
        let dir = TempDir::new().unwrap();
        let backend = MockBackend::new();
        let state = generated_state(&[ArtifactType::Epic], OutputFormat::Pdf);

        let saved =
            DownloadCoordinator::new(&backend, &state, dir.path()).download_latest().await.unwrap();
        assert_eq!(saved.path, dir.path().join("latest.pdf"));
        assert!(saved.artifact.is_none());
    }

    #[tokio::test]
    async fn test_unwritable_target_reports_save_error() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("out");
        fs::write(&blocker, b"not a directory").unwrap();

        let backend = MockBackend::new();
        let state = generated_state(&[ArtifactType::Epic], OutputFormat::Docx);
        let downloads = DownloadCoordinator::new(&backend, &state, &blocker);

        let err = downloads.download(ArtifactType::Epic).await.unwrap_err();
        match err {
            WorkflowError::SaveArtifact { path, .. } => assert!(path.ends_with("epic.docx")),
            other => panic!("unexpected error {:?}", other),
        }
        assert_eq!(backend.calls_of(Operation::Download).len(), 1);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_download_on_single_threaded_runtime() {
        let dir = TempDir::new().unwrap();
        let backend = MockBackend::new();
        let state = generated_state(&[ArtifactType::Stories], OutputFormat::Pdf);
        let downloads = DownloadCoordinator::new(&backend, &state, dir.path());

        let saved = downloads.download(ArtifactType::Stories).await.unwrap();
        assert_eq!(fs::read_to_string(&saved.path).unwrap(), "stories.pdf contents");
        assert_eq!(saved.size, "stories.pdf contents".len());
    }

    #[test]
    fn test_save_replaces_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("epic.docx");
        save_atomically(&path, b"first").unwrap();
        save_atomically(&path, b"second").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"second");
    }
}
