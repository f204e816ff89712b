//! Transport seam — the single place requests leave the process.

use async_trait::async_trait;
use http::{Method, StatusCode};
use reqwest::header::AUTHORIZATION;
use serde::de::DeserializeOwned;
use url::Url;

use crate::config::ClientConfig;
use crate::error::{ApiError, ApiResult};
use crate::models::Envelope;

/// An outbound call, kept whole so it can be replayed once after a refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRequest {
    pub method: Method,
    /// Path relative to the API base URL, without a leading `/`.
    pub path: String,
    pub body: Option<serde_json::Value>,
    pub query: Vec<(String, String)>,
    /// Set on the replay; a retried request is never retried again.
    pub retried: bool,
}

impl PendingRequest {
    pub fn new(method: Method, path: &str) -> Self {
        Self {
            method,
            path: path.trim_start_matches('/').to_string(),
            body: None,
            query: Vec::new(),
            retried: false,
        }
    }

    pub fn with_body(mut self, body: Option<serde_json::Value>) -> Self {
        self.body = body;
        self
    }

    pub fn with_query(mut self, query: &[(String, String)]) -> Self {
        self.query = query.to_vec();
        self
    }
}

/// A fully-read response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// JSON response helper.
    pub fn json_body(status: StatusCode, value: &serde_json::Value) -> Self {
        Self::new(status, value.to_string())
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == StatusCode::UNAUTHORIZED
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Decode the body. An empty body decodes as JSON `null`.
    pub fn json<T: DeserializeOwned>(&self) -> ApiResult<T> {
        let bytes: &[u8] = if self.body.iter().all(u8::is_ascii_whitespace) {
            b"null"
        } else {
            &self.body
        };
        serde_json::from_slice(bytes).map_err(ApiError::from)
    }

    /// Turn a non-2xx response into [`ApiError::Status`], using the envelope's
    /// `message` when the body carries one.
    pub fn error_for_status(self) -> ApiResult<Self> {
        if self.is_success() {
            return Ok(self);
        }
        let message = serde_json::from_slice::<Envelope<serde_json::Value>>(&self.body)
            .ok()
            .and_then(|env| env.message)
            .unwrap_or_else(|| {
                self.status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            });
        Err(ApiError::Status {
            status: self.status,
            message,
        })
    }
}

/// Sends a request, optionally with a bearer credential.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &PendingRequest, bearer: Option<&str>) -> ApiResult<Response>;
}

/// Production transport over `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    base: Url,
}

impl ReqwestTransport {
    pub fn new(base_url: &str) -> ApiResult<Self> {
        Self::with_client(base_url, reqwest::Client::new())
    }

    pub fn from_config(config: &ClientConfig) -> ApiResult<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;
        Self::with_client(&config.api_url, client)
    }

    pub fn with_client(base_url: &str, client: reqwest::Client) -> ApiResult<Self> {
        // A trailing slash keeps any base path when joining.
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        Ok(Self {
            client,
            base: Url::parse(&normalized)?,
        })
    }

    pub fn url_for(&self, path: &str) -> ApiResult<Url> {
        Ok(self.base.join(path.trim_start_matches('/'))?)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &PendingRequest, bearer: Option<&str>) -> ApiResult<Response> {
        let url = self.url_for(&request.path)?;
        let mut builder = self.client.request(request.method.clone(), url);
        if let Some(token) = bearer {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let resp = builder.send().await?;
        let status = resp.status();
        let body = resp.bytes().await?;
        Ok(Response::new(status, body.to_vec()))
    }
}
