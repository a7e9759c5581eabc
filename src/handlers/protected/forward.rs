// handlers/protected/forward.rs - ANY /api/*path
//
// Console pages call the platform backend through here, so the browser never
// holds the access token. The session's bearer token, the tenant id and the
// original host are attached; the backend's status and body are relayed as-is.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Method, Uri},
    response::{IntoResponse, Response},
    Extension,
};
use axum_extra::extract::cookie::CookieJar;

use crate::api::RequestContext;
use crate::error::ApiError;
use crate::middleware::{require_principal, RequestTenant};
use crate::state::AppState;

/// Backend path for a console `/api/...` request, query preserved
pub fn backend_target(uri: &Uri) -> String {
    let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    match path_and_query.strip_prefix("/api") {
        Some(rest) if rest.starts_with('/') => rest.to_string(),
        Some(rest) => format!("/{}", rest),
        None => path_and_query.to_string(),
    }
}

pub async fn forward_any(
    State(state): State<AppState>,
    Extension(tenant): Extension<RequestTenant>,
    jar: CookieJar,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Body,
) -> Result<Response, ApiError> {
    let principal = require_principal(&state, &jar, &tenant).await?;

    let body = axum::body::to_bytes(body, state.config.api.max_request_size_bytes)
        .await
        .map_err(|_| ApiError::bad_request("Request body too large"))?;
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());

    let target = backend_target(&uri);
    let ctx = RequestContext::anonymous(Some(tenant.host.clone()))
        .with_token(principal.tokens.access_token.clone())
        .with_tenant(tenant.tenant_id());

    if state.config.api.enable_request_logging {
        tracing::info!("{} {} -> backend for {}", method, target, principal.subject);
    }

    let forwarded = state
        .backend
        .forward(method, &target, &ctx, content_type, body)
        .await?;

    let mut response = (forwarded.status, forwarded.body).into_response();
    if let Some(content_type) = forwarded
        .content_type
        .and_then(|ct| header::HeaderValue::from_str(&ct).ok())
    {
        response.headers_mut().insert(header::CONTENT_TYPE, content_type);
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_strips_api_prefix_and_keeps_query() {
        let uri: Uri = "/api/programs?page=2".parse().unwrap();
        assert_eq!(backend_target(&uri), "/programs?page=2");

        let uri: Uri = "/api/tenants/t-1/custom-domains".parse().unwrap();
        assert_eq!(backend_target(&uri), "/tenants/t-1/custom-domains");
    }
}
