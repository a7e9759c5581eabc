// handlers/protected/context.rs - GET /session/context
//
// Bootstrap data for the console shell: who is signed in, which tenant this
// host serves, and where the user's dashboard is.

use axum::{extract::State, Extension};
use axum_extra::extract::cookie::CookieJar;
use serde::Serialize;

use crate::auth::Role;
use crate::middleware::{require_principal, ApiResponse, ApiResult, RequestTenant};
use crate::session::Principal;
use crate::tenant::TenantResolution;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SessionContext {
    pub user: Principal,
    pub roles: Vec<Role>,
    pub home: &'static str,
    pub tenant: TenantResolution,
}

pub async fn context_get(
    State(state): State<AppState>,
    Extension(tenant): Extension<RequestTenant>,
    jar: CookieJar,
) -> ApiResult<SessionContext> {
    let principal = require_principal(&state, &jar, &tenant).await?;

    Ok(ApiResponse::success(SessionContext {
        roles: principal.roles.iter().collect(),
        home: principal.home_path(),
        user: principal,
        tenant: tenant.resolution,
    }))
}
