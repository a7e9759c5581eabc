// handlers/public/auth/signup.rs - GET /auth/signup?role=<role>

use std::collections::HashMap;

use axum::{
    extract::{Query, State},
    response::Redirect,
    Extension,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use crate::auth::Role;
use crate::error::ApiError;
use crate::gate::sanitize_return_to;
use crate::middleware::{session_cookie, session_id, RequestTenant};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SignupQuery {
    pub role: Option<String>,
    #[serde(rename = "returnTo")]
    pub return_to: Option<String>,
}

fn parse_role(raw: Option<&str>) -> Result<Role, ApiError> {
    let invalid = |reason: &str| {
        let mut field_errors = HashMap::new();
        field_errors.insert("role".to_string(), reason.to_string());
        ApiError::validation_error("Invalid signup role", Some(field_errors))
    };

    let raw = raw.ok_or_else(|| invalid("This field is required"))?;
    let role: Role = raw.parse().map_err(|_| invalid("Unknown role"))?;
    if !role.is_self_registrable() {
        return Err(invalid("This role cannot be chosen at signup"));
    }
    Ok(role)
}

/// Persist the chosen role in the pending login, then open the provider's
/// signup screen. The role is submitted to `/auth/register` on the callback.
pub async fn signup_get(
    State(state): State<AppState>,
    Extension(tenant): Extension<RequestTenant>,
    jar: CookieJar,
    Query(query): Query<SignupQuery>,
) -> Result<(CookieJar, Redirect), ApiError> {
    let role = parse_role(query.role.as_deref())?;

    let session = state
        .sessions
        .load(session_id(&jar, &state.config.session), &tenant.host)
        .await;
    let jar = jar.add(session_cookie(&state.config.session, session.id));

    let authorize_url = state
        .gate
        .begin_sign_in(
            session.id,
            &tenant.host,
            sanitize_return_to(query.return_to.as_deref()),
            tenant.tenant_id(),
            Some(role),
        )
        .await?;

    Ok((jar, Redirect::to(&authorize_url)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signup_roles_are_limited_to_members() {
        assert_eq!(parse_role(Some("Student")).unwrap(), Role::Student);
        assert_eq!(parse_role(Some("guardian")).unwrap(), Role::Parent);
        assert_eq!(parse_role(Some("admin")).unwrap_err().status_code(), 400);
        assert_eq!(parse_role(Some("wizard")).unwrap_err().status_code(), 400);
        assert_eq!(parse_role(None).unwrap_err().status_code(), 400);
    }
}
