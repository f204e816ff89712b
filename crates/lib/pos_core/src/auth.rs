//! Login / logout flows and the home-route redirect.

use tracing::info;

use crate::client::HttpClient;
use crate::error::{ApiError, ApiResult};
use crate::gate::Navigator;
use crate::models::auth::Credentials;
use crate::models::{Envelope, LoginData, Session};
use crate::routes;
use crate::session::SessionQuery;
use crate::tokens::TokenStore;

/// Login endpoint.
pub const LOGIN_PATH: &str = "/api/v1/auth/login";

/// Minimum password length accepted by the login form.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Check the login form before any network call.
pub fn validate_credentials(email: &str, password: &str) -> ApiResult<()> {
    if !is_valid_email(email) {
        return Err(ApiError::Validation("Please enter a valid email".into()));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
}

/// Sign in. Stores the returned token pair and drops any cached session.
///
/// Returns the user echoed by the server, when it sends one.
pub async fn login(
    client: &HttpClient,
    session: &SessionQuery,
    email: &str,
    password: &str,
) -> ApiResult<Option<Session>> {
    validate_credentials(email, password)?;

    let credentials = Credentials {
        email: email.to_string(),
        password: password.to_string(),
    };
    let envelope: Envelope<LoginData> = client.post_json(LOGIN_PATH, Some(&credentials)).await?;
    let data = envelope
        .data
        .ok_or_else(|| ApiError::InvalidResponse("login response has no data".into()))?;

    let access = match data.access_token.as_deref() {
        Some(access) if !access.is_empty() => access,
        _ => {
            return Err(ApiError::InvalidResponse(
                "login response has no access_token".into(),
            ));
        }
    };

    client.tokens().set(access, data.refresh_token.as_deref());
    session.invalidate();
    info!(email, "signed in");
    Ok(data.user)
}

/// Sign out locally: forget the tokens and the cached session, then go to
/// the login screen.
pub fn logout(tokens: &dyn TokenStore, session: &SessionQuery, navigator: &dyn Navigator) {
    tokens.clear();
    session.invalidate();
    info!("signed out");
    navigator.replace(routes::LOGIN);
}

/// Where `/` sends the user.
pub fn home_route(tokens: &dyn TokenStore) -> &'static str {
    if tokens.access_token().is_some() {
        routes::DASHBOARD
    } else {
        routes::LOGIN
    }
}
