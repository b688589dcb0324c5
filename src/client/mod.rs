//! Backend service client.
//!
//! [`Backend`] is the seam between the workflow coordinators and the service.
//! [`HttpBackend`] talks to the real service over [`Transport`];
//! [`mock::MockBackend`] answers in memory and records every call.

pub mod api;
mod error;
pub mod mock;
mod transport;

pub use api::{
    ChatRequest, ChatResponse, ChatTurn, GenerateRequest, GenerateResponse, HealthResponse,
    PushRequest, UploadPayload, UploadResponse,
};
pub use error::{detail_from_body, ApiError, ApiResult};
pub use transport::{
    Operation, TimeoutPolicy, Transport, DEFAULT_BASE_URL, DEFAULT_TIMEOUT, GENERATE_TIMEOUT,
};

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Method;

use crate::workflow::{ArtifactType, OutputFormat, PushResult};

/// Operations the backend service exposes.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Upload a document as multipart field `file`.
    async fn upload(&self, payload: UploadPayload) -> ApiResult<UploadResponse>;

    /// Generate artifacts from an uploaded document or raw text.
    async fn generate(&self, request: &GenerateRequest) -> ApiResult<GenerateResponse>;

    /// Fetch a generated document. Without an artifact type the service
    /// returns its most recent document of that format.
    async fn download(
        &self,
        format: OutputFormat,
        artifact: Option<ArtifactType>,
    ) -> ApiResult<Vec<u8>>;

    /// Ask the assistant a question.
    async fn chat(&self, request: &ChatRequest) -> ApiResult<ChatResponse>;

    /// Create tracker work items from generated artifacts.
    async fn push(&self, request: &PushRequest) -> ApiResult<PushResult>;

    /// Probe the service health endpoint.
    async fn health(&self) -> ApiResult<HealthResponse>;
}

/// [`Backend`] implementation over HTTP.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    transport: Transport,
}

impl HttpBackend {
    /// Create a backend for the given base address and timeout table.
    pub fn new(base_url: &str, timeouts: TimeoutPolicy) -> ApiResult<Self> {
        Ok(Self { transport: Transport::new(base_url, timeouts)? })
    }

    /// The underlying transport.
    pub fn transport(&self) -> &Transport {
        &self.transport
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn upload(&self, payload: UploadPayload) -> ApiResult<UploadResponse> {
        let part = Part::bytes(payload.bytes)
            .file_name(payload.file_name)
            .mime_str(&payload.mime_type)
            .map_err(|e| ApiError::Decode(format!("invalid MIME type: {}", e)))?;
        let form = Form::new().part("file", part);

        let url = self.transport.endpoint("/upload");
        let request = self.transport.request(Operation::Upload, Method::POST, &url).multipart(form);
        self.transport.send_json(request).await
    }

    async fn generate(&self, request: &GenerateRequest) -> ApiResult<GenerateResponse> {
        let url = self.transport.endpoint("/generate");
        let request = self.transport.request(Operation::Generate, Method::POST, &url).json(request);
        self.transport.send_json(request).await
    }

    async fn download(
        &self,
        format: OutputFormat,
        artifact: Option<ArtifactType>,
    ) -> ApiResult<Vec<u8>> {
        let url = self.transport.endpoint(&format!("/download/{}", format));
        let mut request = self.transport.request(Operation::Download, Method::GET, &url);
        if let Some(artifact) = artifact {
            request = request.query(&[("artifact_type", artifact.as_str())]);
        }
        self.transport.send_binary(request).await
    }

    async fn chat(&self, request: &ChatRequest) -> ApiResult<ChatResponse> {
        let url = self.transport.endpoint("/chat");
        let request = self.transport.request(Operation::Chat, Method::POST, &url).json(request);
        self.transport.send_json(request).await
    }

    async fn push(&self, request: &PushRequest) -> ApiResult<PushResult> {
        let url = self.transport.endpoint("/ado/push");
        let request = self.transport.request(Operation::Push, Method::POST, &url).json(request);
        self.transport.send_json(request).await
    }

    async fn health(&self) -> ApiResult<HealthResponse> {
        let url = self.transport.health_endpoint()?;
        let request = self.transport.request(Operation::Health, Method::GET, url.as_str());
        self.transport.send_json(request).await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use wiremock::matchers::{
        body_json, body_string_contains, header_regex, method, path, query_param,
        query_param_is_missing,
    };
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn backend_for(server: &MockServer) -> HttpBackend {
        HttpBackend::new(&format!("{}/api/v1", server.uri()), TimeoutPolicy::default()).unwrap()
    }

    #[tokio::test]
    async fn test_upload_sends_multipart_file_field() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/upload"))
            .and(header_regex("content-type", "^multipart/form-data"))
            .and(body_string_contains(r#"name="file""#))
            .and(body_string_contains(r#"filename="spec.pdf""#))
            .and(body_string_contains("application/pdf"))
            .and(body_string_contains("%PDF-1.7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "message": "File uploaded successfully",
                "file_name": "spec.pdf",
                "file_path": "data/uploads/abc123_spec.pdf",
                "indexed": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response = backend_for(&server)
            .upload(UploadPayload {
                file_name: "spec.pdf".to_string(),
                mime_type: "application/pdf".to_string(),
                bytes: b"%PDF-1.7".to_vec(),
            })
            .await
            .unwrap();

        assert_eq!(response.file_path, "data/uploads/abc123_spec.pdf");
        assert_eq!(response.indexed, Some(true));
    }

    #[tokio::test]
    async fn test_generate_posts_selection_and_format() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/generate"))
            .and(body_json(json!({
                "spec_file_path": "/tmp/abc123",
                "artifact_types": ["epic", "use_cases"],
                "output_format": "pdf"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "message": "Successfully generated 2 artifacts",
                "file_paths": {
                    "epic": "data/generated/epic_1.pdf",
                    "use_cases": "data/generated/use_cases_1.pdf"
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let request = GenerateRequest {
            spec_file_path: Some("/tmp/abc123".to_string()),
            spec_text: None,
            artifact_types: vec![ArtifactType::Epic, ArtifactType::UseCases],
            output_format: OutputFormat::Pdf,
        };
        let response = backend_for(&server).generate(&request).await.unwrap();
        let result = response.into_result(OutputFormat::Pdf);

        assert_eq!(result.artifact_types(), vec![ArtifactType::Epic, ArtifactType::UseCases]);
    }

    #[tokio::test]
    async fn test_download_uses_format_path_and_type_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/download/docx"))
            .and(query_param("artifact_type", "use_cases"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"PK\x03\x04".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let bytes = backend_for(&server)
            .download(OutputFormat::Docx, Some(ArtifactType::UseCases))
            .await
            .unwrap();
        assert_eq!(bytes, b"PK\x03\x04");
    }

    #[tokio::test]
    async fn test_download_latest_omits_type_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/download/pdf"))
            .and(query_param_is_missing("artifact_type"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let bytes = backend_for(&server).download(OutputFormat::Pdf, None).await.unwrap();
        assert_eq!(bytes, b"%PDF");
    }

    #[tokio::test]
    async fn test_chat_posts_message_and_rag_flag() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/chat"))
            .and(body_json(json!({ "message": "What is the main epic?", "use_rag": false })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "response": "Checkout redesign", "used_rag": false })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let request = ChatRequest {
            message: "What is the main epic?".to_string(),
            use_rag: false,
            conversation_history: None,
        };
        let response = backend_for(&server).chat(&request).await.unwrap();
        assert_eq!(response.response, "Checkout redesign");
        assert_eq!(response.used_rag, Some(false));
    }

    #[tokio::test]
    async fn test_push_posts_to_tracker_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/ado/push"))
            .and(body_json(json!({
                "artifact_types": ["epic", "stories"],
                "work_item_type": "User Story",
                "area_path": "Shop\\Checkout"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "message": "Created 1 work item",
                "work_items_created": [
                    {
                        "id": 101,
                        "title": "EPIC: Checkout",
                        "url": "https://dev.azure.com/x/_workitems/101"
                    }
                ],
                "errors": ["stories: field Title is required"]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let request = PushRequest {
            artifact_types: vec![ArtifactType::Epic, ArtifactType::Stories],
            work_item_type: "User Story".to_string(),
            project_name: None,
            area_path: Some("Shop\\Checkout".to_string()),
            iteration_path: None,
        };
        let result = backend_for(&server).push(&request).await.unwrap();

        assert_eq!(result.work_items_created.len(), 1);
        assert_eq!(result.work_items_created[0].id.to_string(), "101");
        assert_eq!(result.errors, vec!["stories: field Title is required".to_string()]);
    }

    #[tokio::test]
    async fn test_health_is_served_from_origin() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "healthy" })))
            .expect(1)
            .mount(&server)
            .await;

        let health = backend_for(&server).health().await.unwrap();
        assert!(health.is_healthy());
    }

    #[tokio::test]
    async fn test_error_detail_is_passed_through() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/download/docx"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({ "detail": "File not found" })),
            )
            .mount(&server)
            .await;

        let err = backend_for(&server)
            .download(OutputFormat::Docx, Some(ArtifactType::Tdd))
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(404));
        assert_eq!(err.to_string(), "File not found");
    }

    #[tokio::test]
    async fn test_structured_detail_is_rendered_as_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/ado/push"))
            .respond_with(ResponseTemplate::new(422).set_body_json(json!({
                "detail": [{"loc": ["body", "artifact_types"], "msg": "field required"}]
            })))
            .mount(&server)
            .await;

        let request = PushRequest {
            artifact_types: vec![],
            work_item_type: "User Story".to_string(),
            project_name: None,
            area_path: None,
            iteration_path: None,
        };
        let err = backend_for(&server).push(&request).await.unwrap_err();

        assert_eq!(err.status(), Some(422));
        assert_eq!(
            err.to_string(),
            r#"[{"loc":["body","artifact_types"],"msg":"field required"}]"#
        );
    }

    #[tokio::test]
    async fn test_missing_detail_names_the_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/chat"))
            .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
            .mount(&server)
            .await;

        let request =
            ChatRequest { message: "hi".to_string(), use_rag: true, conversation_history: None };
        let err = backend_for(&server).chat(&request).await.unwrap_err();
        assert_eq!(err.to_string(), "Request failed with status code 500");
    }

    #[tokio::test]
    async fn test_timeout_is_a_network_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "status": "healthy" }))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let backend = HttpBackend::new(
            &format!("{}/api/v1", server.uri()),
            TimeoutPolicy::uniform(Duration::from_millis(200)),
        )
        .unwrap();
        let err = backend.health().await.unwrap_err();

        assert!(err.is_network());
        assert_eq!(err.to_string(), "Network error: request timed out");
    }

    #[tokio::test]
    async fn test_unparseable_success_body_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
            .mount(&server)
            .await;

        let err = backend_for(&server).health().await.unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }
}
