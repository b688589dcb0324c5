//! HTTP transport for the backend service.
//!
//! Every request goes to one fixed base address. Each call carries the timeout
//! that [`TimeoutPolicy`] assigns to its operation; nothing is retried here.

use std::fmt;
use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;

use super::error::{ApiError, ApiResult};

/// Default base address of the backend API.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000/api/v1";

/// Default per-call timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Timeout for generation calls; local inference can take many minutes.
pub const GENERATE_TIMEOUT: Duration = Duration::from_secs(900);

/// Backend operation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Upload,
    Generate,
    Download,
    Chat,
    Push,
    Health,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Upload => "upload",
            Self::Generate => "generate",
            Self::Download => "download",
            Self::Chat => "chat",
            Self::Push => "push",
            Self::Health => "health",
        };
        f.write_str(name)
    }
}

/// Per-operation timeout table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutPolicy {
    pub upload: Duration,
    pub generate: Duration,
    pub download: Duration,
    pub chat: Duration,
    pub push: Duration,
    pub health: Duration,
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        Self {
            upload: DEFAULT_TIMEOUT,
            generate: GENERATE_TIMEOUT,
            download: DEFAULT_TIMEOUT,
            chat: DEFAULT_TIMEOUT,
            push: DEFAULT_TIMEOUT,
            health: DEFAULT_TIMEOUT,
        }
    }
}

impl TimeoutPolicy {
    /// The same timeout for every operation.
    pub fn uniform(timeout: Duration) -> Self {
        Self {
            upload: timeout,
            generate: timeout,
            download: timeout,
            chat: timeout,
            push: timeout,
            health: timeout,
        }
    }

    /// Timeout applied to a call of the given operation.
    pub fn for_operation(&self, operation: Operation) -> Duration {
        match operation {
            Operation::Upload => self.upload,
            Operation::Generate => self.generate,
            Operation::Download => self.download,
            Operation::Chat => self.chat,
            Operation::Push => self.push,
            Operation::Health => self.health,
        }
    }
}

/// Thin wrapper over `reqwest` bound to the backend base address.
#[derive(Debug, Clone)]
pub struct Transport {
    /// HTTP client
    client: Client,
    /// API base address, e.g. `http://127.0.0.1:8000/api/v1`
    base_url: Url,
    /// Per-operation timeouts
    timeouts: TimeoutPolicy,
}

impl Transport {
    /// Create a transport for the given base address.
    pub fn new(base_url: &str, timeouts: TimeoutPolicy) -> ApiResult<Self> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(base_url.to_string()));
        }

        let client = Client::builder()
            .user_agent(concat!("reqflow/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        Ok(Self { client, base_url, timeouts })
    }

    /// The API base address.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The timeout table.
    pub fn timeouts(&self) -> &TimeoutPolicy {
        &self.timeouts
    }

    /// Absolute URL for an API path such as `/generate`.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// URL of the service health check, which lives at the origin rather
    /// than under the API prefix.
    pub fn health_endpoint(&self) -> ApiResult<Url> {
        self.base_url.join("/health").map_err(|e| ApiError::InvalidUrl(e.to_string()))
    }

    /// Start a request for an operation with that operation's timeout.
    pub fn request(&self, operation: Operation, method: Method, url: &str) -> RequestBuilder {
        let timeout = self.timeouts.for_operation(operation);
        tracing::debug!(
            operation = %operation,
            method = %method,
            url = url,
            timeout_secs = timeout.as_secs(),
            "Dispatching request"
        );
        self.client.request(method, url).timeout(timeout)
    }

    /// Send a request and decode a JSON response.
    pub async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> ApiResult<T> {
        let response = Self::checked(request.header("Accept", "application/json")).await?;
        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Send a request and return the raw response body.
    pub async fn send_binary(&self, request: RequestBuilder) -> ApiResult<Vec<u8>> {
        let response = Self::checked(request).await?;
        Ok(response.bytes().await?.to_vec())
    }

    /// Send a request and turn a failure status into [`ApiError::Http`].
    async fn checked(request: RequestBuilder) -> ApiResult<Response> {
        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let body = response.bytes().await.unwrap_or_default();
        let error = ApiError::from_status(status.as_u16(), &body);
        tracing::debug!(status = status.as_u16(), error = %error, "Request failed");
        Err(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timeouts() {
        let policy = TimeoutPolicy::default();
        assert_eq!(policy.for_operation(Operation::Generate), Duration::from_secs(900));
        for op in [Operation::Upload, Operation::Download, Operation::Chat, Operation::Push] {
            assert_eq!(policy.for_operation(op), Duration::from_secs(300));
        }
    }

    #[test]
    fn test_uniform_timeouts() {
        let policy = TimeoutPolicy::uniform(Duration::from_secs(5));
        assert_eq!(policy.for_operation(Operation::Generate), Duration::from_secs(5));
    }

    #[test]
    fn test_endpoint_keeps_api_prefix() {
        let transport = Transport::new(DEFAULT_BASE_URL, TimeoutPolicy::default()).unwrap();
        assert_eq!(transport.endpoint("/upload"), "http://127.0.0.1:8000/api/v1/upload");
        assert_eq!(
            transport.endpoint("download/pdf"),
            "http://127.0.0.1:8000/api/v1/download/pdf"
        );
    }

    #[test]
    fn test_trailing_slash_is_ignored() {
        let transport =
            Transport::new("http://localhost:9000/api/v1/", TimeoutPolicy::default()).unwrap();
        assert_eq!(transport.endpoint("/chat"), "http://localhost:9000/api/v1/chat");
    }

    #[test]
    fn test_health_endpoint_is_at_origin() {
        let transport = Transport::new(DEFAULT_BASE_URL, TimeoutPolicy::default()).unwrap();
        assert_eq!(transport.health_endpoint().unwrap().as_str(), "http://127.0.0.1:8000/health");
    }

    #[test]
    fn test_invalid_base_url() {
        let err = Transport::new("not a url", TimeoutPolicy::default()).unwrap_err();
        assert!(matches!(err, ApiError::InvalidUrl(_)));
    }
}
