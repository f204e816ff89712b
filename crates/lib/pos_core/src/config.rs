//! Client configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Default API base URL (local development server).
pub const DEFAULT_API_URL: &str = "http://localhost:8080";

/// Default freshness window for the cached session: 30 seconds.
pub const DEFAULT_SESSION_TTL_MS: i64 = 30_000;

/// Configuration for the POS client.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// API base URL (e.g. "http://localhost:8080").
    pub api_url: String,
    /// Location of the persisted token file.
    pub token_file: PathBuf,
    /// How long a fetched session stays fresh (milliseconds).
    pub session_ttl_ms: i64,
    /// Per-request timeout. `None` leaves the transport default in place.
    pub request_timeout: Option<Duration>,
}

impl ClientConfig {
    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable                               | Default                          |
    /// |----------------------------------------|----------------------------------|
    /// | `POS_API_URL` / `NEXT_PUBLIC_API_URL`  | `http://localhost:8080`          |
    /// | `POS_TOKEN_FILE`                       | `<data_dir>/pos01/tokens.json`   |
    /// | `POS_SESSION_TTL_MS`                   | `30000`                          |
    /// | `POS_REQUEST_TIMEOUT_SECS`             | unset                            |
    pub fn from_env() -> Self {
        Self {
            api_url: resolve_api_url(),
            token_file: std::env::var("POS_TOKEN_FILE")
                .ok()
                .filter(|p| !p.is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(default_token_file),
            session_ttl_ms: std::env::var("POS_SESSION_TTL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_SESSION_TTL_MS),
            request_timeout: std::env::var("POS_REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            token_file: default_token_file(),
            session_ttl_ms: DEFAULT_SESSION_TTL_MS,
            request_timeout: None,
        }
    }
}

/// Resolve the API URL: `POS_API_URL` → `NEXT_PUBLIC_API_URL` → default.
fn resolve_api_url() -> String {
    if let Ok(url) = std::env::var("POS_API_URL")
        && !url.is_empty()
    {
        return url;
    }
    if let Ok(url) = std::env::var("NEXT_PUBLIC_API_URL")
        && !url.is_empty()
    {
        return url;
    }
    DEFAULT_API_URL.to_string()
}

/// Path to the persisted token file.
pub fn default_token_file() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pos01")
        .join("tokens.json")
}
