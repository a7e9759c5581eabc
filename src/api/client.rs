// REST client for the platform backend
//
// Every call carries the caller's RequestContext: bearer token when signed in,
// x-tenant-id when tenant-scoped, and x-forwarded-host so the backend sees
// the browser's original host.

use std::time::Duration;

use axum::body::Bytes;
use reqwest::{header, Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::config::BackendConfig;
use crate::types::{RegisterRequest, TenantContext, TenantDomainResponse, UserProfile};

pub const TENANT_HEADER: &str = "x-tenant-id";
pub const FORWARDED_HOST_HEADER: &str = "x-forwarded-host";

#[derive(Debug, Error)]
pub enum ClientError {
    /// Backend answered with a non-2xx status
    #[error("backend returned {status}: {message}")]
    Status { status: u16, body: Value, message: String },

    #[error("backend request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid backend response: {0}")]
    Decode(String),

    #[error("invalid backend url: {0}")]
    Url(#[from] url::ParseError),
}

impl ClientError {
    /// HTTP status of the backend response, if one was received
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    fn from_response(status: StatusCode, bytes: &[u8]) -> Self {
        let body: Value = serde_json::from_slice(bytes).unwrap_or_else(|_| {
            let text = String::from_utf8_lossy(bytes).trim().to_string();
            if text.is_empty() { Value::Null } else { Value::String(text) }
        });

        let message = body
            .get("message")
            .or_else(|| body.get("error"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("Request failed")
                    .to_string()
            });

        ClientError::Status { status: status.as_u16(), body, message }
    }
}

/// Per-request identity and tenant headers
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub token: Option<String>,
    pub tenant_id: Option<String>,
    pub forwarded_host: Option<String>,
}

impl RequestContext {
    pub fn anonymous(forwarded_host: Option<String>) -> Self {
        Self { forwarded_host, ..Self::default() }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_tenant(mut self, tenant_id: Option<String>) -> Self {
        self.tenant_id = tenant_id;
        self
    }
}

/// Raw response relayed from the backend by the forwarding endpoint
#[derive(Debug)]
pub struct ForwardedResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: Bytes,
}

#[derive(Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(config: &BackendConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, path: &str, ctx: &RequestContext) -> reqwest::RequestBuilder {
        let mut builder = self
            .http
            .request(method, self.url(path))
            .header(header::ACCEPT, "application/json");

        if let Some(token) = &ctx.token {
            builder = builder.bearer_auth(token);
        }
        if let Some(tenant_id) = &ctx.tenant_id {
            builder = builder.header(TENANT_HEADER, tenant_id);
        }
        if let Some(host) = &ctx.forwarded_host {
            builder = builder.header(FORWARDED_HOST_HEADER, host);
        }
        builder
    }

    async fn execute<T: DeserializeOwned>(&self, builder: reqwest::RequestBuilder) -> Result<T, ClientError> {
        let response = builder.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            return Err(ClientError::from_response(status, &bytes));
        }

        // Some endpoints answer 204; treat an empty body as JSON null
        let bytes: &[u8] = if bytes.is_empty() { b"null" } else { &bytes };
        serde_json::from_slice(bytes).map_err(|e| ClientError::Decode(e.to_string()))
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str, ctx: &RequestContext) -> Result<T, ClientError> {
        self.execute(self.request(Method::GET, path, ctx)).await
    }

    pub async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        ctx: &RequestContext,
        body: &B,
    ) -> Result<T, ClientError> {
        self.execute(self.request(Method::POST, path, ctx).json(body)).await
    }

    /// GET /auth/me - current user profile and roles
    pub async fn current_user(&self, ctx: &RequestContext) -> Result<UserProfile, ClientError> {
        let value: Value = self.get_json("/auth/me", ctx).await?;
        // Some deployments wrap the profile in { "user": ... } or { "data": ... }
        let profile = match value {
            Value::Object(mut map) if !map.contains_key("id") => map
                .remove("user")
                .or_else(|| map.remove("data"))
                .unwrap_or(Value::Object(map)),
            other => other,
        };
        serde_json::from_value(profile).map_err(|e| ClientError::Decode(e.to_string()))
    }

    /// POST /auth/register - self-registration with the selected role
    pub async fn register(&self, ctx: &RequestContext, request: &RegisterRequest) -> Result<Value, ClientError> {
        self.post_json("/auth/register", ctx, request).await
    }

    /// GET /health
    pub async fn health(&self) -> Result<Value, ClientError> {
        self.get_json("/health", &RequestContext::default()).await
    }

    /// GET /tenant-domain/context - resolve the tenant served on `host`
    pub async fn tenant_domain_context(&self, host: &str) -> Result<Option<TenantContext>, ClientError> {
        let ctx = RequestContext::anonymous(Some(host.to_string()));
        match self.get_json::<TenantDomainResponse>("/tenant-domain/context", &ctx).await {
            Ok(response) => Ok(response.tenant),
            Err(ClientError::Status { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Relay an arbitrary console request to the backend
    pub async fn forward(
        &self,
        method: Method,
        path_and_query: &str,
        ctx: &RequestContext,
        content_type: Option<&str>,
        body: Bytes,
    ) -> Result<ForwardedResponse, ClientError> {
        let mut builder = self.request(method, path_and_query, ctx);
        if let Some(content_type) = content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }
        if !body.is_empty() {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?;

        Ok(ForwardedResponse { status, content_type, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client(server: &MockServer) -> BackendClient {
        BackendClient::new(&BackendConfig { api_url: server.base_url(), timeout_secs: 5 }).unwrap()
    }

    #[tokio::test]
    async fn current_user_sends_identity_headers() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/auth/me")
                    .header("authorization", "Bearer tok")
                    .header("x-tenant-id", "t-1")
                    .header("x-forwarded-host", "acme.example.com");
                then.status(200).json_body(json!({ "id": "u-1", "roles": ["admin"] }));
            })
            .await;

        let ctx = RequestContext::anonymous(Some("acme.example.com".into()))
            .with_token("tok")
            .with_tenant(Some("t-1".into()));
        let profile = client(&server).current_user(&ctx).await.unwrap();

        mock.assert_async().await;
        assert_eq!(profile.id, "u-1");
    }

    #[tokio::test]
    async fn current_user_unwraps_user_envelope() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/auth/me");
                then.status(200).json_body(json!({ "user": { "id": "u-2" } }));
            })
            .await;

        let profile = client(&server).current_user(&RequestContext::default()).await.unwrap();
        assert_eq!(profile.id, "u-2");
    }

    #[tokio::test]
    async fn non_success_carries_status_and_message() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/auth/me");
                then.status(404).json_body(json!({ "message": "No membership for tenant" }));
            })
            .await;

        let err = client(&server).current_user(&RequestContext::default()).await.unwrap_err();
        assert_eq!(err.status(), Some(404));
        match err {
            ClientError::Status { message, body, .. } => {
                assert_eq!(message, "No membership for tenant");
                assert_eq!(body["message"], "No membership for tenant");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn error_without_body_falls_back_to_reason() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/health");
                then.status(503);
            })
            .await;

        let err = client(&server).health().await.unwrap_err();
        match err {
            ClientError::Status { status, message, .. } => {
                assert_eq!(status, 503);
                assert_eq!(message, "Service Unavailable");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_tenant_domain_is_none() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/tenant-domain/context").header("x-forwarded-host", "nowhere.test");
                then.status(404);
            })
            .await;

        let tenant = client(&server).tenant_domain_context("nowhere.test").await.unwrap();
        assert!(tenant.is_none());
    }
}
