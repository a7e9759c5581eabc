// handlers/public/auth/error.rs - GET /auth/error?code=<code>&returnTo=<path>

use axum::{
    extract::{Query, State},
    response::Html,
};
use serde::Deserialize;

use crate::auth::AuthErrorCode;
use crate::gate::sanitize_return_to;
use crate::pages;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ErrorQuery {
    pub code: Option<String>,
    #[serde(rename = "returnTo")]
    pub return_to: Option<String>,
}

pub async fn error_get(State(state): State<AppState>, Query(query): Query<ErrorQuery>) -> Html<String> {
    let code = query
        .code
        .as_deref()
        .and_then(|c| c.parse::<AuthErrorCode>().ok())
        .unwrap_or(AuthErrorCode::SignInFailed);
    let return_to = sanitize_return_to(query.return_to.as_deref());

    pages::error_page(code, &return_to, &state.config.console.support_email)
}
