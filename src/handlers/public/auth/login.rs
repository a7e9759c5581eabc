// handlers/public/auth/login.rs - GET /auth/login

use axum::{
    extract::{Query, State},
    response::Redirect,
    Extension,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use crate::error::ApiError;
use crate::gate::sanitize_return_to;
use crate::middleware::{session_cookie, session_id, RequestTenant};
use crate::session::GateState;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    #[serde(rename = "returnTo")]
    pub return_to: Option<String>,
}

/// Start a sign-in explicitly. A session that is already signed in goes straight
/// to the requested page.
pub async fn login_get(
    State(state): State<AppState>,
    Extension(tenant): Extension<RequestTenant>,
    jar: CookieJar,
    Query(query): Query<LoginQuery>,
) -> Result<(CookieJar, Redirect), ApiError> {
    let session = state
        .sessions
        .load(session_id(&jar, &state.config.session), &tenant.host)
        .await;
    let jar = jar.add(session_cookie(&state.config.session, session.id));
    let return_to = sanitize_return_to(query.return_to.as_deref());

    if let GateState::Ready(principal) = &session.state {
        if principal.tenant_id == tenant.tenant_id() {
            let destination = if return_to == "/" { principal.home_path().to_string() } else { return_to };
            return Ok((jar, Redirect::to(&destination)));
        }
    }

    let authorize_url = state
        .gate
        .begin_sign_in(session.id, &tenant.host, return_to, tenant.tenant_id(), None)
        .await?;

    Ok((jar, Redirect::to(&authorize_url)))
}
