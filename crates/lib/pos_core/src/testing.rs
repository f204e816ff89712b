//! Test doubles shared by the unit tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use http::{Method, StatusCode};

use crate::client::transport::{PendingRequest, Response, Transport};
use crate::error::ApiResult;
use crate::gate::HistoryNavigator;

/// One call seen by [`ScriptedTransport`].
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: Method,
    pub path: String,
    pub bearer: Option<String>,
    pub body: Option<serde_json::Value>,
    pub query: Vec<(String, String)>,
    pub retried: bool,
}

type Handler = dyn Fn(&PendingRequest, Option<&str>) -> ApiResult<Response> + Send + Sync;

/// Transport that answers from a closure and records every call.
pub struct ScriptedTransport {
    handler: Box<Handler>,
    calls: Mutex<Vec<RecordedCall>>,
    delay: Option<Duration>,
}

impl ScriptedTransport {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&PendingRequest, Option<&str>) -> ApiResult<Response> + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Sleep before answering, so concurrent callers overlap.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, path: &str) -> usize {
        let path = path.trim_start_matches('/');
        self.calls.lock().unwrap().iter().filter(|c| c.path == path).count()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &PendingRequest, bearer: Option<&str>) -> ApiResult<Response> {
        self.calls.lock().unwrap().push(RecordedCall {
            method: request.method.clone(),
            path: request.path.clone(),
            bearer: bearer.map(str::to_string),
            body: request.body.clone(),
            query: request.query.clone(),
            retried: request.retried,
        });
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.handler)(request, bearer)
    }
}

pub fn json(status: StatusCode, value: serde_json::Value) -> ApiResult<Response> {
    Ok(Response::json_body(status, &value))
}

pub fn unauthorized() -> ApiResult<Response> {
    json(
        StatusCode::UNAUTHORIZED,
        serde_json::json!({ "status": "error", "message": "Invalid or expired token" }),
    )
}

pub fn profile(role: &str) -> ApiResult<Response> {
    json(
        StatusCode::OK,
        serde_json::json!({
            "status": "success",
            "data": { "id": 1, "name": "Rina", "email": "rina@pos.test", "role": role }
        }),
    )
}

pub fn navigator() -> Arc<HistoryNavigator> {
    Arc::new(HistoryNavigator::default())
}
