//! Authenticated HTTP client.
//!
//! Every request carries the stored access token as a bearer credential. A
//! 401 triggers the refresh protocol:
//!
//! 1. no refresh token: clear the store, hand back the 401;
//! 2. one `POST /api/v1/auth/refresh`; on success store the new pair and
//!    replay the original request once, returning whatever it returns;
//! 3. on any refresh failure: clear the store, hand back the original 401.
//!
//! Concurrent 401s share one refresh. The refresh step is serialised, and a
//! request that finds the stored access token already replaced since it was
//! sent replays with the new token instead of refreshing again.

pub mod transport;

use std::sync::Arc;

use http::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::{ApiError, ApiResult};
use crate::models::{Envelope, RefreshData};
use crate::tokens::TokenStore;

pub use transport::{PendingRequest, ReqwestTransport, Response, Transport};

/// Token refresh endpoint.
pub const REFRESH_PATH: &str = "/api/v1/auth/refresh";

/// HTTP client bound to a token store.
pub struct HttpClient {
    transport: Arc<dyn Transport>,
    tokens: Arc<dyn TokenStore>,
    refresh_lock: Mutex<()>,
}

impl HttpClient {
    pub fn new(transport: Arc<dyn Transport>, tokens: Arc<dyn TokenStore>) -> Self {
        Self {
            transport,
            tokens,
            refresh_lock: Mutex::new(()),
        }
    }

    /// Client over `reqwest` for the configured base URL.
    pub fn from_config(config: &ClientConfig, tokens: Arc<dyn TokenStore>) -> ApiResult<Self> {
        let transport = ReqwestTransport::from_config(config)?;
        Ok(Self::new(Arc::new(transport), tokens))
    }

    pub fn tokens(&self) -> &Arc<dyn TokenStore> {
        &self.tokens
    }

    /// Send a request through the refresh protocol.
    ///
    /// Non-2xx statuses are returned as responses, not errors; only transport
    /// failures are `Err`.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
        query: Option<&[(String, String)]>,
    ) -> ApiResult<Response> {
        let mut pending = PendingRequest::new(method, path).with_body(body);
        if let Some(query) = query {
            pending = pending.with_query(query);
        }
        self.execute(pending).await
    }

    async fn execute(&self, mut pending: PendingRequest) -> ApiResult<Response> {
        let sent_with = self.tokens.access_token();
        debug!(
            method = %pending.method,
            path = %pending.path,
            authenticated = sent_with.is_some(),
            "sending request"
        );

        let response = self.transport.send(&pending, sent_with.as_deref()).await?;
        if !response.is_unauthorized() || pending.retried {
            return Ok(response);
        }

        let Some(access) = self.recover(sent_with.as_deref()).await else {
            return Ok(response);
        };

        pending.retried = true;
        debug!(method = %pending.method, path = %pending.path, "replaying request after refresh");
        self.transport.send(&pending, Some(&access)).await
    }

    /// Obtain a usable access token after a 401, or clear the store.
    async fn recover(&self, sent_with: Option<&str>) -> Option<String> {
        let _guard = self.refresh_lock.lock().await;

        let current = self.tokens.get();
        if let Some(access) = current.access.as_deref()
            && Some(access) != sent_with
        {
            debug!("access token already replaced, skipping refresh");
            return Some(access.to_string());
        }

        let Some(refresh) = current.refresh else {
            info!("401 without refresh token, clearing session");
            self.tokens.clear();
            return None;
        };

        match self.refresh_tokens(&refresh).await {
            Ok((access, rotated)) => {
                self.tokens.set(&access, rotated.as_deref());
                info!(rotated = rotated.is_some(), "access token refreshed");
                Some(access)
            }
            Err(e) => {
                warn!(error = %e, "token refresh failed, clearing session");
                self.tokens.clear();
                None
            }
        }
    }

    /// One call to the refresh endpoint, without a bearer credential.
    async fn refresh_tokens(&self, refresh: &str) -> ApiResult<(String, Option<String>)> {
        let pending = PendingRequest::new(Method::POST, REFRESH_PATH)
            .with_body(Some(serde_json::json!({ "refresh_token": refresh })));
        let response = self.transport.send(&pending, None).await?.error_for_status()?;
        let envelope: Envelope<RefreshData> = response.json()?;
        let data = envelope
            .data
            .ok_or_else(|| ApiError::InvalidResponse("refresh response has no data".into()))?;
        match data.access_token {
            Some(access) if !access.is_empty() => Ok((access, data.refresh_token)),
            _ => Err(ApiError::InvalidResponse(
                "refresh response has no access_token".into(),
            )),
        }
    }

    // ---------------------------------------------------------------------------
    // Typed helpers
    // ---------------------------------------------------------------------------

    /// Request and decode; a non-2xx final response becomes [`ApiError::Status`].
    pub async fn call_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
        query: Option<&[(String, String)]>,
    ) -> ApiResult<T> {
        self.request(method, path, body, query)
            .await?
            .error_for_status()?
            .json()
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: Option<&[(String, String)]>,
    ) -> ApiResult<T> {
        self.call_json(Method::GET, path, None, query).await
    }

    pub async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> ApiResult<T> {
        let body = body.map(serde_json::to_value).transpose()?;
        self.call_json(Method::POST, path, body, None).await
    }

    pub async fn put_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> ApiResult<T> {
        let body = body.map(serde_json::to_value).transpose()?;
        self.call_json(Method::PUT, path, body, None).await
    }

    pub async fn patch_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> ApiResult<T> {
        let body = body.map(serde_json::to_value).transpose()?;
        self.call_json(Method::PATCH, path, body, None).await
    }

    pub async fn delete_json<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        self.call_json(Method::DELETE, path, None, None).await
    }
}
