use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::error::ApiError;
use crate::session::Principal;
use crate::state::AppState;

use super::tenant::RequestTenant;

/// Session id carried by the console cookie, if it parses
pub fn session_id(jar: &CookieJar, config: &SessionConfig) -> Option<Uuid> {
    jar.get(&config.cookie_name)
        .and_then(|cookie| Uuid::parse_str(cookie.value()).ok())
}

pub fn session_cookie(config: &SessionConfig, id: Uuid) -> Cookie<'static> {
    Cookie::build((config.cookie_name.clone(), id.simple().to_string()))
        .path("/")
        .http_only(true)
        .secure(config.secure_cookie)
        .same_site(SameSite::Lax)
        .build()
}

/// Deletion cookie; attributes match `session_cookie` so `__Host-` names are accepted
pub fn removal_cookie(config: &SessionConfig) -> Cookie<'static> {
    Cookie::build((config.cookie_name.clone(), String::new()))
        .path("/")
        .http_only(true)
        .secure(config.secure_cookie)
        .same_site(SameSite::Lax)
        .build()
}

/// Signed-in principal for JSON endpoints; 401 when the session is not ready,
/// expired, or bound to another host or tenant
pub async fn require_principal(
    state: &AppState,
    jar: &CookieJar,
    tenant: &RequestTenant,
) -> Result<Principal, ApiError> {
    let id = session_id(jar, &state.config.session)
        .ok_or_else(|| ApiError::unauthorized("Sign in required"))?;
    // JSON traffic from the console shell counts as activity
    let session = state
        .sessions
        .touch(id)
        .await
        .ok_or_else(|| ApiError::unauthorized("Session expired, please sign in again"))?;

    if session.host != tenant.host {
        tracing::warn!("Session {} used from host {} (bound to {})", id, tenant.host, session.host);
        return Err(ApiError::unauthorized("Sign in required"));
    }

    let principal = session
        .state
        .principal()
        .ok_or_else(|| ApiError::unauthorized("Sign in required"))?;

    if principal.tokens.is_expired(Utc::now()) {
        return Err(ApiError::unauthorized("Session expired, please sign in again"));
    }
    if principal.tenant_id != tenant.tenant_id() {
        return Err(ApiError::forbidden("Session belongs to a different organization"));
    }

    Ok(principal.clone())
}
