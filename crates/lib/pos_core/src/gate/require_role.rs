//! RequireRole — renders children only for users holding an allowed role.

use std::sync::Arc;

use tracing::debug;

use super::{GateCell, GateState, Navigator};
use crate::error::SessionError;
use crate::models::{Role, Session};
use crate::session::SessionQuery;

/// Transition once the session query settles.
pub fn transition(outcome: &Result<Session, SessionError>, allowed: &[Role]) -> GateState {
    match outcome {
        Err(_) => GateState::Unauthenticated,
        Ok(session) if session.has_any_role(allowed) => GateState::Authorized,
        Ok(_) => GateState::Unauthorized,
    }
}

/// Role gate.
pub struct RequireRole {
    allowed: Vec<Role>,
    session: Arc<SessionQuery>,
    cell: GateCell,
}

impl RequireRole {
    pub fn new(
        allowed: impl Into<Vec<Role>>,
        session: Arc<SessionQuery>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            allowed: allowed.into(),
            session,
            cell: GateCell::new("RequireRole", navigator),
        }
    }

    pub fn allowed(&self) -> &[Role] {
        &self.allowed
    }

    pub fn state(&self) -> GateState {
        self.cell.state()
    }

    pub async fn evaluate(&self) -> GateState {
        let session = Arc::clone(&self.session);
        let allowed = self.allowed.clone();
        self.cell
            .settle(async move {
                let outcome = session.current_user().await;
                let next = transition(&outcome, &allowed);
                let role = outcome.as_ref().ok().and_then(|s| s.role);
                debug!(?role, ?allowed, ?next, "role check");
                next
            })
            .await
    }

    pub fn unmount(&self) {
        self.cell.unmount();
    }
}
