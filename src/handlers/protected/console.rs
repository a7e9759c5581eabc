// handlers/protected/console.rs - every console page (router fallback)

use axum::{
    extract::State,
    http::{Method, StatusCode, Uri},
    response::{IntoResponse, Redirect, Response},
    Extension,
};
use axum_extra::extract::cookie::CookieJar;

use crate::error::ApiError;
use crate::gate::{GateDecision, UNAUTHORIZED_PATH};
use crate::middleware::{session_cookie, session_id, RequestTenant};
use crate::pages;
use crate::state::AppState;

/// Gate the requested page, then render the console shell or redirect
pub async fn console_page(
    State(state): State<AppState>,
    Extension(tenant): Extension<RequestTenant>,
    jar: CookieJar,
    method: Method,
    uri: Uri,
) -> Result<Response, ApiError> {
    if method != Method::GET && method != Method::HEAD {
        return Err(ApiError::not_found(format!("No route for {} {}", method, uri.path())));
    }

    let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    let session = state
        .sessions
        .load(session_id(&jar, &state.config.session), &tenant.host)
        .await;
    let jar = jar.add(session_cookie(&state.config.session, session.id));

    let decision = state
        .gate
        .evaluate(session.id, &tenant.host, path_and_query, &tenant.resolution)
        .await?;

    let response = match decision {
        // Public prefixes with no handler of their own
        GateDecision::Public => (StatusCode::NOT_FOUND, "Not found").into_response(),
        GateDecision::Render(principal) if uri.path() == "/" => {
            Redirect::to(principal.home_path()).into_response()
        }
        GateDecision::Render(_) => {
            pages::console_shell(state.config.console.static_dir.as_deref())
                .await
                .into_response()
        }
        GateDecision::SignIn { authorize_url } => Redirect::to(&authorize_url).into_response(),
        GateDecision::SigningIn { return_to } => pages::signing_in_page(&return_to).into_response(),
        GateDecision::Unauthorized => Redirect::to(UNAUTHORIZED_PATH).into_response(),
    };

    Ok((jar, response).into_response())
}
