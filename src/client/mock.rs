//! In-memory backend that records calls.
//!
//! Answers every operation with a plausible response derived from the request
//! unless a failure has been queued for that operation.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::api::{
    ChatRequest, ChatResponse, GenerateRequest, GenerateResponse, HealthResponse, PushRequest,
    UploadPayload, UploadResponse,
};
use super::error::{ApiError, ApiResult};
use super::transport::Operation;
use super::Backend;
use crate::workflow::{ArtifactType, OutputFormat, PushResult, WorkItem, WorkItemId};

/// A call observed by [`MockBackend`].
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Upload { file_name: String, mime_type: String, size: usize },
    Generate(GenerateRequest),
    Download { format: OutputFormat, artifact: Option<ArtifactType> },
    Chat(ChatRequest),
    Push(PushRequest),
    Health,
}

impl Call {
    /// Operation kind of this call.
    pub fn operation(&self) -> Operation {
        match self {
            Self::Upload { .. } => Operation::Upload,
            Self::Generate(_) => Operation::Generate,
            Self::Download { .. } => Operation::Download,
            Self::Chat(_) => Operation::Chat,
            Self::Push(_) => Operation::Push,
            Self::Health => Operation::Health,
        }
    }
}

/// Recording in-memory [`Backend`].
#[derive(Debug, Default)]
pub struct MockBackend {
    calls: Mutex<Vec<Call>>,
    failures: Mutex<HashMap<Operation, VecDeque<ApiError>>>,
    upload_paths: Mutex<VecDeque<String>>,
    chat_replies: Mutex<VecDeque<String>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next call of `operation` with `error`.
    pub fn fail_next(&self, operation: Operation, error: ApiError) {
        self.failures.lock().entry(operation).or_default().push_back(error);
    }

    /// Server path returned by the next upload. Defaults to `/tmp/<file name>`.
    pub fn next_upload_path(&self, path: impl Into<String>) {
        self.upload_paths.lock().push_back(path.into());
    }

    /// Text of the next chat reply. Defaults to an echo of the message.
    pub fn next_chat_reply(&self, reply: impl Into<String>) {
        self.chat_replies.lock().push_back(reply.into());
    }

    /// All calls so far, in order.
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    /// Number of calls so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Calls of one operation kind.
    pub fn calls_of(&self, operation: Operation) -> Vec<Call> {
        self.calls.lock().iter().filter(|c| c.operation() == operation).cloned().collect()
    }

    /// The most recent generate request.
    pub fn last_generate(&self) -> Option<GenerateRequest> {
        self.calls.lock().iter().rev().find_map(|c| match c {
            Call::Generate(request) => Some(request.clone()),
            _ => None,
        })
    }

    /// The most recent push request.
    pub fn last_push(&self) -> Option<PushRequest> {
        self.calls.lock().iter().rev().find_map(|c| match c {
            Call::Push(request) => Some(request.clone()),
            _ => None,
        })
    }

    /// The most recent chat request.
    pub fn last_chat(&self) -> Option<ChatRequest> {
        self.calls.lock().iter().rev().find_map(|c| match c {
            Call::Chat(request) => Some(request.clone()),
            _ => None,
        })
    }

    fn record(&self, call: Call) -> ApiResult<()> {
        let operation = call.operation();
        self.calls.lock().push(call);
        match self.failures.lock().get_mut(&operation).and_then(VecDeque::pop_front) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn upload(&self, payload: UploadPayload) -> ApiResult<UploadResponse> {
        self.record(Call::Upload {
            file_name: payload.file_name.clone(),
            mime_type: payload.mime_type.clone(),
            size: payload.bytes.len(),
        })?;

        let file_path = self
            .upload_paths
            .lock()
            .pop_front()
            .unwrap_or_else(|| format!("/tmp/{}", payload.file_name));
        let file_type = payload.file_name.rsplit_once('.').map(|(_, ext)| format!(".{}", ext));

        Ok(UploadResponse {
            file_name: payload.file_name,
            file_path,
            message: Some("File uploaded and parsed successfully".to_string()),
            file_type,
            indexed: Some(true),
        })
    }

    async fn generate(&self, request: &GenerateRequest) -> ApiResult<GenerateResponse> {
        self.record(Call::Generate(request.clone()))?;

        let file_paths = request
            .artifact_types
            .iter()
            .map(|t| (t.to_string(), format!("data/generated/{}_1.{}", t, request.output_format)))
            .collect();
        let artifacts = request
            .artifact_types
            .iter()
            .map(|t| (t.to_string(), serde_json::json!({ "title": t.label() })))
            .collect();

        Ok(GenerateResponse {
            message: format!("Successfully generated {} artifacts", request.artifact_types.len()),
            file_paths,
            artifacts,
        })
    }

    async fn download(
        &self,
        format: OutputFormat,
        artifact: Option<ArtifactType>,
    ) -> ApiResult<Vec<u8>> {
        self.record(Call::Download { format, artifact })?;
        let name = artifact.map_or("latest", |a| a.as_str());
        Ok(format!("{}.{} contents", name, format).into_bytes())
    }

    async fn chat(&self, request: &ChatRequest) -> ApiResult<ChatResponse> {
        self.record(Call::Chat(request.clone()))?;
        let response = self
            .chat_replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| format!("You said: {}", request.message));
        Ok(ChatResponse { response, used_rag: Some(request.use_rag) })
    }

    async fn push(&self, request: &PushRequest) -> ApiResult<PushResult> {
        self.record(Call::Push(request.clone()))?;

        let work_items_created: Vec<WorkItem> = request
            .artifact_types
            .iter()
            .zip(1u64..)
            .map(|(t, id)| WorkItem {
                id: WorkItemId::Number(id),
                title: format!("{}: Spec", t.as_str().to_uppercase()),
                url: format!("https://tracker.example/_workitems/{}", id),
                work_item_type: Some(request.work_item_type.clone()),
            })
            .collect();

        Ok(PushResult {
            message: format!("Successfully created {} work items", work_items_created.len()),
            work_items_created,
            errors: Vec::new(),
        })
    }

    async fn health(&self) -> ApiResult<HealthResponse> {
        self.record(Call::Health)?;
        Ok(HealthResponse { status: "healthy".to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_failures_are_consumed_once() {
        let backend = MockBackend::new();
        backend.fail_next(Operation::Health, ApiError::Network("connection refused".to_string()));

        assert!(backend.health().await.is_err());
        assert!(backend.health().await.is_ok());
        assert_eq!(backend.calls_of(Operation::Health).len(), 2);
    }

    #[tokio::test]
    async fn test_generate_echoes_requested_types() {
        let backend = MockBackend::new();
        let request = GenerateRequest {
            spec_file_path: Some("/tmp/spec.pdf".to_string()),
            spec_text: None,
            artifact_types: vec![ArtifactType::Tdd],
            output_format: OutputFormat::Pdf,
        };
        let response = backend.generate(&request).await.unwrap();
        assert_eq!(response.file_paths["tdd"], "data/generated/tdd_1.pdf");
        assert_eq!(backend.last_generate(), Some(request));
    }
}
