use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::ApiError;
use crate::pages;
use crate::state::AppState;
use crate::tenant::{request_host, TenantResolution};

/// Host and tenant of the current request, injected by `resolve_tenant_middleware`
#[derive(Clone, Debug)]
pub struct RequestTenant {
    pub host: String,
    pub resolution: TenantResolution,
}

impl RequestTenant {
    pub fn tenant_id(&self) -> Option<String> {
        self.resolution.tenant_id()
    }
}

/// Middleware that resolves the request host to a tenant before any console route runs.
/// Hosts the backend does not know get the tenant-not-found page.
pub async fn resolve_tenant_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(host) = request_host(request.headers()) else {
        return ApiError::bad_request("Missing Host header").into_response();
    };

    let resolution = match state.tenants.resolve(&host).await {
        Ok(resolution) => resolution,
        Err(e) => {
            tracing::error!("Tenant resolution failed for host '{}': {}", host, e);
            return ApiError::bad_gateway("Unable to resolve the organization for this address").into_response();
        }
    };

    if resolution == TenantResolution::Unknown {
        return (
            StatusCode::NOT_FOUND,
            pages::tenant_not_found_page(&state.config.console.support_email),
        )
            .into_response();
    }

    tracing::debug!("Request for host {} resolved to {:?}", host, resolution);
    request.extensions_mut().insert(RequestTenant { host, resolution });

    next.run(request).await
}
