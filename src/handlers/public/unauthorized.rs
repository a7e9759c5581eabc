// handlers/public/unauthorized.rs - GET /unauthorized

use axum::{
    extract::State,
    http::StatusCode,
    response::Html,
};
use axum_extra::extract::cookie::CookieJar;

use crate::middleware::session_id;
use crate::pages;
use crate::state::AppState;

pub async fn unauthorized_get(State(state): State<AppState>, jar: CookieJar) -> (StatusCode, Html<String>) {
    let home = match session_id(&jar, &state.config.session) {
        Some(id) => state
            .sessions
            .get(id)
            .await
            .and_then(|s| s.state.principal().map(|p| p.home_path()))
            // A user without any role has no dashboard to go back to
            .filter(|home| *home != "/unauthorized"),
        None => None,
    };

    (StatusCode::FORBIDDEN, pages::unauthorized_page(home))
}
