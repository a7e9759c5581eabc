// handlers/public/auth/logout.rs - GET /auth/logout

use axum::{extract::State, response::Redirect, Extension};
use axum_extra::extract::cookie::CookieJar;

use crate::error::ApiError;
use crate::middleware::{removal_cookie, session_id, RequestTenant};
use crate::state::AppState;

pub async fn logout_get(
    State(state): State<AppState>,
    Extension(tenant): Extension<RequestTenant>,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect), ApiError> {
    let id = session_id(&jar, &state.config.session);
    let logout_url = state.gate.sign_out(id, &tenant.host).await?;
    let jar = jar.remove(removal_cookie(&state.config.session));
    Ok((jar, Redirect::to(&logout_url)))
}
