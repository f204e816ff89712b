//! Route gates — explicit state machines deciding whether a page renders.
//!
//! A gate starts `Pending`, settles once, and redirects (by `replace`) on
//! entering a state that has a redirect target. After `unmount` a gate no
//! longer changes state or redirects.

pub mod require_auth;
pub mod require_role;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::models::Role;
use crate::routes::{self, Requirement};
use crate::session::SessionQuery;
use crate::tokens::TokenStore;

pub use require_auth::RequireAuth;
pub use require_role::RequireRole;

/// Gate state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// Session not settled yet; nothing is rendered.
    Pending,
    /// Signed in; children render.
    Authenticated,
    /// Signed in with an allowed role; children render.
    Authorized,
    /// Signed in without an allowed role.
    Unauthorized,
    /// No usable session.
    Unauthenticated,
}

impl GateState {
    /// Route replaced on entering this state.
    pub fn redirect_target(&self) -> Option<&'static str> {
        match self {
            GateState::Unauthenticated => Some(routes::LOGIN),
            GateState::Unauthorized => Some(routes::DASHBOARD),
            _ => None,
        }
    }

    pub fn renders_children(&self) -> bool {
        matches!(self, GateState::Authenticated | GateState::Authorized)
    }

    pub fn is_settled(&self) -> bool {
        !matches!(self, GateState::Pending)
    }
}

/// Where gates send the user. Redirects replace the current history entry.
pub trait Navigator: Send + Sync {
    fn replace(&self, path: &str);
}

/// Navigator that records replaced routes in order.
#[derive(Debug, Default)]
pub struct HistoryNavigator {
    history: Mutex<Vec<String>>,
}

impl HistoryNavigator {
    pub fn history(&self) -> Vec<String> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Most recent replacement, if any.
    pub fn current(&self) -> Option<String> {
        self.history().last().cloned()
    }
}

impl Navigator for HistoryNavigator {
    fn replace(&self, path: &str) {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(path.to_string());
    }
}

/// State cell shared by both gates: holds the state, applies redirects on
/// entry and ignores everything after unmount.
struct GateCell {
    name: &'static str,
    state: Mutex<GateState>,
    mounted: CancellationToken,
    navigator: Arc<dyn Navigator>,
}

impl GateCell {
    fn new(name: &'static str, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            name,
            state: Mutex::new(GateState::Pending),
            mounted: CancellationToken::new(),
            navigator,
        }
    }

    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn state(&self) -> GateState {
        *self.lock()
    }

    /// Move to `next`. The redirect fires only on an actual state change.
    fn enter(&self, next: GateState) -> GateState {
        if self.mounted.is_cancelled() {
            debug!(gate = self.name, ?next, "gate unmounted, ignoring transition");
            return self.state();
        }
        let previous = {
            let mut state = self.lock();
            std::mem::replace(&mut *state, next)
        };
        if previous != next {
            debug!(gate = self.name, ?previous, ?next, "gate transition");
            if let Some(target) = next.redirect_target() {
                self.navigator.replace(target);
            }
        }
        next
    }

    /// Await `outcome` unless the gate is unmounted first.
    async fn settle(&self, outcome: impl Future<Output = GateState>) -> GateState {
        tokio::select! {
            biased;
            _ = self.mounted.cancelled() => self.state(),
            next = outcome => self.enter(next),
        }
    }

    fn unmount(&self) {
        self.mounted.cancel();
    }
}

/// Evaluate the gates a page requires.
///
/// Role pages nest the role gate inside the auth gate: it mounts only once
/// the auth gate renders its children, and reads the profile the auth gate
/// already fetched. Returns the first non-rendering state, or the passing one.
pub async fn guard_page(
    requirement: &Requirement,
    tokens: Arc<dyn TokenStore>,
    session: Arc<SessionQuery>,
    navigator: Arc<dyn Navigator>,
) -> GateState {
    match requirement {
        Requirement::Public => GateState::Authorized,
        Requirement::Authenticated => {
            RequireAuth::new(tokens, session, navigator).evaluate().await
        }
        Requirement::Roles(roles) => {
            let auth = RequireAuth::new(tokens, Arc::clone(&session), Arc::clone(&navigator));
            let auth_state = auth.evaluate().await;
            if !auth_state.renders_children() {
                return auth_state;
            }
            RequireRole::new(roles.to_vec(), session, navigator)
                .evaluate()
                .await
        }
    }
}

/// Roles allowed to see `requirement`, for display.
pub fn allowed_roles(requirement: &Requirement) -> &'static [Role] {
    match requirement {
        Requirement::Roles(roles) => roles,
        _ => &[],
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::client::HttpClient;
    use crate::session::PROFILE_PATH;
    use crate::testing::{ScriptedTransport, navigator, profile};
    use crate::tokens::MemoryTokenStore;

    #[test]
    fn redirect_targets() {
        assert_eq!(GateState::Unauthenticated.redirect_target(), Some("/auth/login"));
        assert_eq!(GateState::Unauthorized.redirect_target(), Some("/dashboard"));
        assert_eq!(GateState::Pending.redirect_target(), None);
        assert_eq!(GateState::Authorized.redirect_target(), None);
        assert!(!GateState::Pending.renders_children());
        assert!(GateState::Authenticated.renders_children());
    }

    #[test]
    fn enter_redirects_once_per_state_change() {
        let nav = navigator();
        let cell = GateCell::new("test", nav.clone());
        cell.enter(GateState::Unauthenticated);
        cell.enter(GateState::Unauthenticated);
        assert_eq!(nav.history(), vec!["/auth/login"]);
    }

    #[test]
    fn enter_after_unmount_is_a_no_op() {
        let nav = navigator();
        let cell = GateCell::new("test", nav.clone());
        cell.unmount();
        assert_eq!(cell.enter(GateState::Unauthorized), GateState::Pending);
        assert!(nav.history().is_empty());
    }

    #[tokio::test]
    async fn role_page_runs_both_gates_on_one_profile_call() {
        let transport = Arc::new(
            ScriptedTransport::new(|_, _| profile("admin")).with_delay(Duration::from_millis(20)),
        );
        let tokens: Arc<dyn TokenStore> =
            Arc::new(MemoryTokenStore::with_tokens(Some("A"), Some("R")));
        let client = Arc::new(HttpClient::new(transport.clone(), Arc::clone(&tokens)));
        let session = Arc::new(SessionQuery::new(client));
        let nav = navigator();

        let state = guard_page(
            &Requirement::Roles(&[Role::Admin, Role::Superadmin]),
            tokens,
            session,
            nav.clone(),
        )
        .await;

        assert_eq!(state, GateState::Authorized);
        assert_eq!(transport.count(PROFILE_PATH), 1);
        assert!(nav.history().is_empty());
    }

    #[tokio::test]
    async fn role_page_without_token_goes_to_login() {
        let transport = Arc::new(ScriptedTransport::new(|_, _| crate::testing::unauthorized()));
        let tokens: Arc<dyn TokenStore> = Arc::new(MemoryTokenStore::new());
        let client = Arc::new(HttpClient::new(transport.clone(), Arc::clone(&tokens)));
        let session = Arc::new(SessionQuery::new(client));
        let nav = navigator();

        let state = guard_page(
            &Requirement::Roles(&[Role::Superadmin]),
            tokens,
            session,
            nav.clone(),
        )
        .await;

        assert_eq!(state, GateState::Unauthenticated);
        assert!(transport.calls().is_empty());
        assert_eq!(nav.history(), vec!["/auth/login"]);
    }

    #[tokio::test]
    async fn role_page_with_only_refresh_token_does_not_refresh() {
        let transport = Arc::new(ScriptedTransport::new(|_, _| profile("superadmin")));
        let tokens: Arc<dyn TokenStore> = Arc::new(MemoryTokenStore::with_tokens(None, Some("R")));
        let client = Arc::new(HttpClient::new(transport.clone(), Arc::clone(&tokens)));
        let session = Arc::new(SessionQuery::new(client));
        let nav = navigator();

        let state = guard_page(
            &Requirement::Roles(&[Role::Superadmin]),
            Arc::clone(&tokens),
            session,
            nav.clone(),
        )
        .await;

        assert_eq!(state, GateState::Unauthenticated);
        assert!(transport.calls().is_empty());
        assert_eq!(tokens.access_token(), None);
        assert_eq!(tokens.refresh_token().as_deref(), Some("R"));
        assert_eq!(nav.history(), vec!["/auth/login"]);
    }

    #[tokio::test]
    async fn role_page_for_wrong_role_redirects_once_to_dashboard() {
        let transport = Arc::new(ScriptedTransport::new(|_, _| profile("user")));
        let tokens: Arc<dyn TokenStore> = Arc::new(MemoryTokenStore::with_tokens(Some("A"), None));
        let client = Arc::new(HttpClient::new(transport.clone(), Arc::clone(&tokens)));
        let session = Arc::new(SessionQuery::new(client));
        let nav = navigator();

        let state = guard_page(
            &Requirement::Roles(&[Role::Admin, Role::Superadmin]),
            tokens,
            session,
            nav.clone(),
        )
        .await;

        assert_eq!(state, GateState::Unauthorized);
        assert_eq!(transport.count(PROFILE_PATH), 1);
        assert_eq!(nav.history(), vec!["/dashboard"]);
    }

    #[test]
    fn allowed_roles_for_requirements() {
        assert!(allowed_roles(&Requirement::Authenticated).is_empty());
        assert_eq!(
            allowed_roles(&Requirement::Roles(&[Role::Superadmin])),
            &[Role::Superadmin]
        );
    }
}
