/*!
 * Server Connection
 * Request/response calls against the server API
 */

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::core::limits::HTTP_REQUEST_TIMEOUT;
use crate::vfs::{VfsError, VfsResult};

/// Request body: `{method, args: [...]}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiRequest {
    pub method: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

/// Response body: `{result, error}`, exactly one of them meaningful
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    #[serde(default)]
    pub result: Value,
    #[serde(default)]
    pub error: Value,
}

impl ApiResponse {
    pub fn ok(result: Value) -> Self {
        Self {
            result,
            error: Value::Null,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            result: Value::Null,
            error: Value::String(message.into()),
        }
    }

    /// Split into a result; a non-empty `error` wins and is passed through verbatim
    pub fn into_result(self) -> VfsResult<Value> {
        match self.error {
            Value::Null | Value::Bool(false) => Ok(self.result),
            Value::String(s) if s.is_empty() => Ok(self.result),
            Value::String(s) => Err(VfsError::Transport(s)),
            other => Err(VfsError::Transport(other.to_string())),
        }
    }
}

/// How a plain resource is fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMethod {
    Get,
    Head,
}

/// Transport to the server, replaceable in tests
#[async_trait]
pub trait Connection: Send + Sync {
    /// Call an API method and return its `result`
    async fn request(&self, method: &str, args: Vec<Value>) -> VfsResult<Value>;

    /// Fetch a plain URL; `Head` returns an empty body on success
    async fn fetch(&self, url: &str, method: FetchMethod) -> VfsResult<Bytes>;
}

/// reqwest-backed connection
#[derive(Debug, Clone)]
pub struct HttpConnection {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpConnection {
    pub fn new(endpoint: impl Into<String>) -> VfsResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(HTTP_REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Connection for HttpConnection {
    #[instrument(skip(self, args), fields(endpoint = %self.endpoint))]
    async fn request(&self, method: &str, args: Vec<Value>) -> VfsResult<Value> {
        let body = ApiRequest {
            method: method.to_string(),
            args,
        };
        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let response: ApiResponse = response.json().await?;
        debug!(method, "API call completed");
        response.into_result()
    }

    async fn fetch(&self, url: &str, method: FetchMethod) -> VfsResult<Bytes> {
        let builder = match method {
            FetchMethod::Get => self.client.get(url),
            FetchMethod::Head => self.client.head(url),
        };
        let response = builder.send().await?.error_for_status()?;
        match method {
            FetchMethod::Get => Ok(response.bytes().await?),
            FetchMethod::Head => Ok(Bytes::new()),
        }
    }
}
