// handlers/public/auth/callback.rs - GET /auth/callback

use axum::{
    extract::{Query, State},
    response::Redirect,
    Extension,
};
use axum_extra::extract::cookie::CookieJar;

use crate::auth::AuthErrorCode;
use crate::gate::{error_page_path, CallbackOutcome, CallbackParams};
use crate::middleware::{removal_cookie, session_id, RequestTenant};
use crate::state::AppState;

/// Finish the sign-in started by the gate or `/auth/login`. Failures land on
/// the error page, never on another sign-in redirect.
pub async fn callback_get(
    State(state): State<AppState>,
    Extension(tenant): Extension<RequestTenant>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> (CookieJar, Redirect) {
    let Some(id) = session_id(&jar, &state.config.session) else {
        tracing::warn!("Callback on {} without a session cookie", tenant.host);
        return (jar, Redirect::to(&error_page_path(AuthErrorCode::SignInFailed, "/")));
    };

    match state.gate.complete_sign_in(id, &tenant.host, params).await {
        CallbackOutcome::Continue(path) => (jar, Redirect::to(&path)),
        CallbackOutcome::Failed { code, location, session_ended } => {
            tracing::info!("Sign-in for session {} ended with {}", id, code);
            let jar = if session_ended {
                jar.remove(removal_cookie(&state.config.session))
            } else {
                jar
            };
            (jar, Redirect::to(&location))
        }
    }
}
