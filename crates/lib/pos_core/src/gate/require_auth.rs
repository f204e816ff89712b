//! RequireAuth — renders children only for a signed-in user.

use std::sync::Arc;

use tracing::debug;

use super::{GateCell, GateState, Navigator};
use crate::error::SessionError;
use crate::models::Session;
use crate::session::SessionQuery;
use crate::tokens::TokenStore;

/// Transition once the session query settles.
pub fn transition(outcome: &Result<Session, SessionError>) -> GateState {
    match outcome {
        Ok(_) => GateState::Authenticated,
        Err(_) => GateState::Unauthenticated,
    }
}

/// Authentication gate.
pub struct RequireAuth {
    tokens: Arc<dyn TokenStore>,
    session: Arc<SessionQuery>,
    cell: GateCell,
}

impl RequireAuth {
    pub fn new(
        tokens: Arc<dyn TokenStore>,
        session: Arc<SessionQuery>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            tokens,
            session,
            cell: GateCell::new("RequireAuth", navigator),
        }
    }

    pub fn state(&self) -> GateState {
        self.cell.state()
    }

    /// Settle the gate. Without an access token this is immediate and makes no
    /// network call.
    pub async fn evaluate(&self) -> GateState {
        if self.tokens.access_token().is_none() {
            return self.cell.enter(GateState::Unauthenticated);
        }
        let session = Arc::clone(&self.session);
        self.cell
            .settle(async move {
                let outcome = session.current_user().await;
                if let Err(e) = &outcome {
                    debug!(error = %e, "session query failed");
                }
                transition(&outcome)
            })
            .await
    }

    /// Stop reacting to a pending evaluation.
    pub fn unmount(&self) {
        self.cell.unmount();
    }
}
