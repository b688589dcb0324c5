//! Transport error types.

/// Result type for backend calls.
pub type ApiResult<T> = Result<T, ApiError>;

/// Error types for backend calls.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The service could not be reached, or the call timed out.
    #[error("Network error: {0}")]
    Network(String),

    /// The service answered with a failure status.
    #[error("{detail}")]
    Http { status: u16, detail: String },

    /// The service answered with a body this client cannot read.
    #[error("Invalid response: {0}")]
    Decode(String),

    #[error("Invalid base URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// HTTP status of a service-reported failure.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the call failed before a response arrived.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    /// Build an `Http` error from a failure status and its raw body.
    pub fn from_status(status: u16, body: &[u8]) -> Self {
        Self::Http { status, detail: detail_from_body(status, body) }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Network("request timed out".to_string())
        } else if e.is_decode() {
            Self::Decode(e.to_string())
        } else if let Some(status) = e.status() {
            Self::Http { status: status.as_u16(), detail: e.to_string() }
        } else {
            Self::Network(e.to_string())
        }
    }
}

/// Extract the user-facing message from a failure body.
///
/// A string `detail` is returned verbatim; any other `detail` value (such as a
/// list of field validation errors) is rendered as compact JSON. Without a
/// `detail` field a generic message naming the status is returned.
pub fn detail_from_body(status: u16, body: &[u8]) -> String {
    let detail = serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("detail").cloned());

    match detail {
        Some(serde_json::Value::String(s)) if !s.is_empty() => s,
        Some(serde_json::Value::String(_) | serde_json::Value::Null) | None => {
            format!("Request failed with status code {}", status)
        }
        Some(other) => other.to_string(),
    }
}
