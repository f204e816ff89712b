//! Session query — cached, deduplicated "current user" fetch.
//!
//! A successful profile is kept for a short freshness window. The fetch runs
//! on its own task and callers await a shared handle to its result, so one
//! network call serves every concurrently mounted gate and the fetch finishes
//! even when every waiter has gone away. Failures are handed to every waiter
//! but never cached.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use tracing::debug;

use crate::client::HttpClient;
use crate::config::DEFAULT_SESSION_TTL_MS;
use crate::error::SessionError;
use crate::models::{Envelope, Session};

/// Profile endpoint.
pub const PROFILE_PATH: &str = "/api/v1/auth/profile";

type ProfileFuture = Shared<BoxFuture<'static, Result<Session, SessionError>>>;

#[derive(Debug, Clone)]
struct CachedSession {
    session: Session,
    expires_at: DateTime<Utc>,
}

#[derive(Default)]
struct QueryState {
    cached: Option<CachedSession>,
    in_flight: Option<(u64, ProfileFuture)>,
    next_fetch: u64,
}

type SharedState = Arc<Mutex<QueryState>>;

fn lock(state: &Mutex<QueryState>) -> MutexGuard<'_, QueryState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Cached profile query over an [`HttpClient`].
pub struct SessionQuery {
    client: Arc<HttpClient>,
    /// Freshness window (milliseconds).
    pub ttl_ms: i64,
    state: SharedState,
}

impl SessionQuery {
    pub fn new(client: Arc<HttpClient>) -> Self {
        Self::with_ttl(client, DEFAULT_SESSION_TTL_MS)
    }

    pub fn with_ttl(client: Arc<HttpClient>, ttl_ms: i64) -> Self {
        Self {
            client,
            ttl_ms,
            state: Arc::new(Mutex::new(QueryState::default())),
        }
    }

    pub fn client(&self) -> &Arc<HttpClient> {
        &self.client
    }

    /// The current user, from cache when fresh.
    ///
    /// Must be called from within a Tokio runtime.
    pub async fn current_user(&self) -> Result<Session, SessionError> {
        let fetch = {
            let mut state = lock(&self.state);
            if let Some(cached) = &state.cached
                && Utc::now() < cached.expires_at
            {
                return Ok(cached.session.clone());
            }
            match &state.in_flight {
                Some((id, fetch)) => {
                    debug!(fetch_id = id, "joining in-flight profile fetch");
                    fetch.clone()
                }
                None => {
                    state.next_fetch += 1;
                    let id = state.next_fetch;
                    let fetch = self.spawn_fetch(id);
                    state.in_flight = Some((id, fetch.clone()));
                    debug!(fetch_id = id, "starting profile fetch");
                    fetch
                }
            }
        };

        fetch.await
    }

    /// Start fetch `id` on its own task. The task settles the cache itself,
    /// so a fetch whose waiters were all dropped still completes.
    fn spawn_fetch(&self, id: u64) -> ProfileFuture {
        let client = Arc::clone(&self.client);
        let state = Arc::clone(&self.state);
        let ttl_ms = self.ttl_ms;

        let task = tokio::spawn(async move {
            let result = fetch_profile(&client).await;
            let mut state = lock(&state);
            if matches!(&state.in_flight, Some((current, _)) if *current == id) {
                state.in_flight = None;
                if let Ok(session) = &result
                    && let Some(expires_at) = expiry(ttl_ms)
                {
                    state.cached = Some(CachedSession {
                        session: session.clone(),
                        expires_at,
                    });
                }
            }
            result
        });

        async move {
            task.await.unwrap_or_else(|e| {
                Err(SessionError::Transport(format!("profile fetch aborted: {e}")))
            })
        }
        .boxed()
        .shared()
    }

    /// The cached session if still fresh, without fetching.
    pub fn cached(&self) -> Option<Session> {
        let state = lock(&self.state);
        state
            .cached
            .as_ref()
            .filter(|c| Utc::now() < c.expires_at)
            .map(|c| c.session.clone())
    }

    /// Drop the cached session and detach any in-flight fetch from the cache.
    pub fn invalidate(&self) {
        let mut state = lock(&self.state);
        state.cached = None;
        state.in_flight = None;
    }
}

/// When a session fetched now stops being fresh. `None` means don't cache;
/// a window past the representable range never expires.
fn expiry(ttl_ms: i64) -> Option<DateTime<Utc>> {
    if ttl_ms <= 0 {
        return None;
    }
    let ttl = chrono::Duration::try_milliseconds(ttl_ms)?;
    Some(
        Utc::now()
            .checked_add_signed(ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC),
    )
}

async fn fetch_profile(client: &HttpClient) -> Result<Session, SessionError> {
    let envelope: Envelope<Session> = client.get_json(PROFILE_PATH, None).await?;
    envelope
        .data
        .ok_or_else(|| SessionError::Decode("profile response has no data".into()))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use http::StatusCode;

    use super::*;
    use crate::models::Role;
    use crate::testing::{ScriptedTransport, json, profile, unauthorized};
    use crate::tokens::MemoryTokenStore;

    fn query(transport: ScriptedTransport, ttl_ms: i64) -> (SessionQuery, Arc<ScriptedTransport>) {
        let transport = Arc::new(transport);
        let tokens = Arc::new(MemoryTokenStore::with_tokens(Some("A"), None));
        let client = Arc::new(HttpClient::new(transport.clone(), tokens));
        (SessionQuery::with_ttl(client, ttl_ms), transport)
    }

    #[tokio::test]
    async fn fetches_profile() {
        let (q, transport) = query(ScriptedTransport::new(|_, _| profile("admin")), 30_000);
        let session = q.current_user().await.unwrap();
        assert_eq!(session.role, Some(Role::Admin));
        assert_eq!(session.email, "rina@pos.test");
        assert_eq!(transport.count(PROFILE_PATH), 1);
    }

    #[tokio::test]
    async fn fresh_result_is_served_from_cache() {
        let (q, transport) = query(ScriptedTransport::new(|_, _| profile("user")), 30_000);
        q.current_user().await.unwrap();
        q.current_user().await.unwrap();
        assert_eq!(transport.count(PROFILE_PATH), 1);
        assert!(q.cached().is_some());
    }

    #[tokio::test]
    async fn expired_result_is_refetched() {
        let (q, transport) = query(ScriptedTransport::new(|_, _| profile("user")), 0);
        q.current_user().await.unwrap();
        q.current_user().await.unwrap();
        assert_eq!(transport.count(PROFILE_PATH), 2);
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_fetch() {
        let transport =
            ScriptedTransport::new(|_, _| profile("user")).with_delay(Duration::from_millis(30));
        let (q, transport) = query(transport, 30_000);

        let (a, b, c) = tokio::join!(q.current_user(), q.current_user(), q.current_user());
        assert_eq!(a.unwrap(), b.clone().unwrap());
        assert_eq!(b.unwrap().role, c.unwrap().role);
        assert_eq!(transport.count(PROFILE_PATH), 1);
    }

    #[tokio::test]
    async fn concurrent_failure_fans_out_and_is_not_cached() {
        let transport = ScriptedTransport::new(|_, _| unauthorized())
            .with_delay(Duration::from_millis(30));
        let (q, transport) = query(transport, 30_000);

        let (a, b) = tokio::join!(q.current_user(), q.current_user());
        assert_eq!(a, Err(SessionError::Unauthenticated));
        assert_eq!(b, Err(SessionError::Unauthenticated));
        assert_eq!(transport.count(PROFILE_PATH), 1);

        let _ = q.current_user().await;
        assert_eq!(transport.count(PROFILE_PATH), 2);
    }

    #[tokio::test]
    async fn server_error_is_unexpected_status() {
        let (q, _) = query(
            ScriptedTransport::new(|_, _| {
                json(StatusCode::BAD_GATEWAY, serde_json::json!({ "status": "error" }))
            }),
            30_000,
        );
        assert_eq!(q.current_user().await, Err(SessionError::UnexpectedStatus(502)));
    }

    #[tokio::test]
    async fn missing_data_is_decode_error() {
        let (q, _) = query(
            ScriptedTransport::new(|_, _| {
                json(StatusCode::OK, serde_json::json!({ "status": "success" }))
            }),
            30_000,
        );
        assert!(matches!(q.current_user().await, Err(SessionError::Decode(_))));
    }

    #[tokio::test]
    async fn invalidate_forces_refetch() {
        let (q, transport) = query(ScriptedTransport::new(|_, _| profile("user")), 30_000);
        q.current_user().await.unwrap();
        q.invalidate();
        assert!(q.cached().is_none());
        q.current_user().await.unwrap();
        assert_eq!(transport.count(PROFILE_PATH), 2);
    }

    #[tokio::test]
    async fn ttl_beyond_calendar_range_caches_without_panicking() {
        let (q, transport) = query(ScriptedTransport::new(|_, _| profile("user")), i64::MAX);
        q.current_user().await.unwrap();
        q.current_user().await.unwrap();
        assert_eq!(transport.count(PROFILE_PATH), 1);
        assert!(expiry(i64::MAX).is_some());
        assert!(expiry(0).is_none());
        assert!(expiry(i64::MIN).is_none());
    }

    #[tokio::test]
    async fn fetch_completes_after_its_waiter_is_dropped() {
        let transport =
            ScriptedTransport::new(|_, _| profile("admin")).with_delay(Duration::from_millis(30));
        let (q, transport) = query(transport, 30_000);

        let abandoned = tokio::time::timeout(Duration::from_millis(5), q.current_user()).await;
        assert!(abandoned.is_err());

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(q.cached().and_then(|s| s.role), Some(Role::Admin));
        q.current_user().await.unwrap();
        assert_eq!(transport.count(PROFILE_PATH), 1);
    }
}
