//! Token store — the persisted access/refresh token pair.
//!
//! Tokens are opaque strings. Both tokens are always written together under a
//! single lock so a concurrent reader never sees half of an update.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Storage key for the access token.
pub const ACCESS_KEY: &str = "accessToken";
/// Storage key for the refresh token.
pub const REFRESH_KEY: &str = "refreshToken";

/// The stored credentials. Either half may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    #[serde(rename = "accessToken", default, skip_serializing_if = "Option::is_none")]
    pub access: Option<String>,
    #[serde(rename = "refreshToken", default, skip_serializing_if = "Option::is_none")]
    pub refresh: Option<String>,
}

impl TokenPair {
    pub fn is_empty(&self) -> bool {
        self.access.is_none() && self.refresh.is_none()
    }

    /// Apply a `set`: access always, refresh only when provided.
    fn apply(&mut self, access: &str, refresh: Option<&str>) {
        self.access = Some(access.to_string());
        if let Some(refresh) = refresh {
            self.refresh = Some(refresh.to_string());
        }
    }
}

/// Injectable token storage.
///
/// `get` never fails: with nothing stored it returns an empty pair.
pub trait TokenStore: Send + Sync {
    fn get(&self) -> TokenPair;

    /// Store `access`; store `refresh` only when given, keeping the previous
    /// refresh token otherwise.
    fn set(&self, access: &str, refresh: Option<&str>);

    /// Remove both tokens.
    fn clear(&self);

    fn access_token(&self) -> Option<String> {
        self.get().access
    }

    fn refresh_token(&self) -> Option<String> {
        self.get().refresh
    }
}

fn lock(pair: &Mutex<TokenPair>) -> MutexGuard<'_, TokenPair> {
    pair.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// In-memory store
// =============================================================================

/// Process-local store. Used by tests and short-lived tools.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    pair: Mutex<TokenPair>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with the given tokens already stored.
    pub fn with_tokens(access: Option<&str>, refresh: Option<&str>) -> Self {
        Self {
            pair: Mutex::new(TokenPair {
                access: access.map(str::to_string),
                refresh: refresh.map(str::to_string),
            }),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self) -> TokenPair {
        lock(&self.pair).clone()
    }

    fn set(&self, access: &str, refresh: Option<&str>) {
        lock(&self.pair).apply(access, refresh);
    }

    fn clear(&self) {
        *lock(&self.pair) = TokenPair::default();
    }
}

// =============================================================================
// File-backed store
// =============================================================================

/// Device-persisted store: a small JSON file keyed like browser local storage.
///
/// The in-memory copy is authoritative for the process; every change is
/// written through with a temp-file rename so the file always holds a whole
/// pair. Write failures are logged and otherwise ignored.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    pair: Mutex<TokenPair>,
}

impl FileTokenStore {
    /// Open the store at `path`. A missing or unreadable file reads as empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let pair = read_pair(&path);
        debug!(path = %path.display(), has_access = pair.access.is_some(), "opened token file");
        Self {
            path,
            pair: Mutex::new(pair),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, pair: &TokenPair) {
        if let Err(e) = write_pair(&self.path, pair) {
            warn!(path = %self.path.display(), error = %e, "failed to persist tokens");
        }
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self) -> TokenPair {
        lock(&self.pair).clone()
    }

    fn set(&self, access: &str, refresh: Option<&str>) {
        let mut pair = lock(&self.pair);
        pair.apply(access, refresh);
        self.persist(&pair);
    }

    fn clear(&self) {
        let mut pair = lock(&self.pair);
        *pair = TokenPair::default();
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to remove token file");
                // Fall back to overwriting with an empty pair.
                self.persist(&pair);
            }
        }
    }
}

fn read_pair(path: &Path) -> TokenPair {
    let Ok(raw) = std::fs::read_to_string(path) else {
        return TokenPair::default();
    };
    serde_json::from_str(&raw).unwrap_or_else(|e| {
        warn!(path = %path.display(), error = %e, "ignoring unreadable token file");
        TokenPair::default()
    })
}

fn write_pair(path: &Path, pair: &TokenPair) -> std::io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_vec_pretty(pair).map_err(std::io::Error::other)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json)?;
    std::fs::rename(&tmp, path)
}
