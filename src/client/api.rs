//! Request and response bodies of the backend API.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::workflow::{
    ArtifactType, GenerationResult, OutputFormat, Role, UploadReference,
};

/// A document ready to be sent as the multipart `file` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPayload {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Response of `POST /upload`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub file_name: String,
    pub file_path: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub file_type: Option<String>,
    #[serde(default)]
    pub indexed: Option<bool>,
}

impl From<UploadResponse> for UploadReference {
    fn from(response: UploadResponse) -> Self {
        Self {
            file_name: response.file_name,
            file_path: response.file_path,
            file_type: response.file_type,
            indexed: response.indexed,
        }
    }
}

/// Body of `POST /generate`. Exactly one of the two sources is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec_file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec_text: Option<String>,
    pub artifact_types: Vec<ArtifactType>,
    pub output_format: OutputFormat,
}

/// Response of `POST /generate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub message: String,
    pub file_paths: BTreeMap<String, String>,
    #[serde(default)]
    pub artifacts: BTreeMap<String, serde_json::Value>,
}

impl GenerateResponse {
    /// Convert into a [`GenerationResult`] for the requested format.
    ///
    /// Keys outside the known artifact set are dropped.
    pub fn into_result(self, format: OutputFormat) -> GenerationResult {
        let file_paths = self
            .file_paths
            .into_iter()
            .filter_map(|(key, path)| match key.parse::<ArtifactType>() {
                Ok(artifact) => Some((artifact, path)),
                Err(_) => {
                    tracing::warn!(artifact = key, "Ignoring unknown artifact type in response");
                    None
                }
            })
            .collect();

        let artifacts = self
            .artifacts
            .into_iter()
            .filter_map(|(key, content)| key.parse::<ArtifactType>().ok().map(|a| (a, content)))
            .collect();

        GenerationResult { message: self.message, file_paths, artifacts, format }
    }
}

/// A prior transcript message sent as conversation context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

/// Body of `POST /chat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub use_rag: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_history: Option<Vec<ChatTurn>>,
}

/// Response of `POST /chat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    #[serde(default)]
    pub used_rag: Option<bool>,
}

/// Body of `POST /ado/push`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushRequest {
    pub artifact_types: Vec<ArtifactType>,
    pub work_item_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iteration_path: Option<String>,
}

/// Response of `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

impl HealthResponse {
    pub fn is_healthy(&self) -> bool {
        self.status.eq_ignore_ascii_case("healthy")
    }
}
