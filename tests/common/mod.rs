#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use httpmock::prelude::*;
use serde_json::{json, Value};
use tower::ServiceExt;
use url::Url;

use tenant_console::auth::{AuthorizeRequest, IdentityClaims, IdentityError, IdentityProvider, SignedIn, TokenSet};
use tenant_console::config::AppConfig;
use tenant_console::gate::RouteTable;
use tenant_console::{app, AppState};

pub const TENANT_HOST: &str = "acme.test";
pub const TENANT_ID: &str = "t-acme";
pub const PLATFORM_HOST: &str = "admin.test";
pub const AUTHORIZE_URL: &str = "https://id.test/authorize";
pub const LOGOUT_URL: &str = "https://id.test/v2/logout";

/// Identity provider scripted with authorization codes
#[derive(Default)]
pub struct FakeIdentity {
    codes: Mutex<HashMap<String, SignedIn>>,
    exchanges: Mutex<Vec<String>>,
}

impl FakeIdentity {
    pub fn with_user(self, code: &str, sub: &str) -> Self {
        self.codes.lock().unwrap().insert(code.to_string(), signed_in(sub));
        self
    }

    /// Code whose tokens are already past their expiry
    pub fn with_expired_user(self, code: &str, sub: &str) -> Self {
        let mut signed_in = signed_in(sub);
        signed_in.tokens.expires_at = Utc::now() - Duration::minutes(1);
        self.codes.lock().unwrap().insert(code.to_string(), signed_in);
        self
    }

    pub fn exchanged_codes(&self) -> Vec<String> {
        self.exchanges.lock().unwrap().clone()
    }
}

pub fn signed_in(sub: &str) -> SignedIn {
    SignedIn {
        tokens: TokenSet {
            access_token: access_token(sub),
            id_token: None,
            refresh_token: None,
            expires_at: Utc::now() + Duration::hours(1),
        },
        identity: IdentityClaims {
            sub: sub.to_string(),
            email: Some(format!("{}@acme.test", sub)),
            name: None,
        },
    }
}

pub fn access_token(sub: &str) -> String {
    format!("access-{}", sub)
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    fn authorize_url(&self, request: &AuthorizeRequest<'_>) -> Result<String, IdentityError> {
        let url = Url::parse_with_params(
            AUTHORIZE_URL,
            &[
                ("state", request.state),
                ("code_challenge", request.code_challenge),
                ("redirect_uri", request.redirect_uri),
                ("screen_hint", if request.signup { "signup" } else { "login" }),
            ],
        )?;
        Ok(url.to_string())
    }

    async fn exchange_code(&self, code: &str, _verifier: &str, _redirect_uri: &str) -> Result<SignedIn, IdentityError> {
        self.exchanges.lock().unwrap().push(code.to_string());
        self.codes
            .lock()
            .unwrap()
            .get(code)
            .cloned()
            .ok_or_else(|| IdentityError::TokenEndpoint { status: 400, message: "invalid_grant".to_string() })
    }

    fn logout_url(&self, return_to: &str) -> Result<String, IdentityError> {
        Ok(Url::parse_with_params(LOGOUT_URL, &[("returnTo", return_to)])?.to_string())
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub location: Option<String>,
    pub body: String,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap_or(Value::Null)
    }

    pub fn location(&self) -> &str {
        self.location.as_deref().unwrap_or_default()
    }
}

/// Console router against a mocked backend, plus a one-browser cookie jar
pub struct TestApp {
    pub router: Router,
    pub backend: MockServer,
    pub identity: Arc<FakeIdentity>,
    pub cookie_name: String,
    host: Mutex<String>,
    cookie: Mutex<Option<String>>,
}

pub async fn spawn_app(identity: FakeIdentity) -> TestApp {
    spawn_app_with(identity, |_| {}).await
}

pub async fn spawn_app_with(identity: FakeIdentity, configure: impl FnOnce(&mut AppConfig)) -> TestApp {
    let backend = MockServer::start_async().await;
    backend
        .mock_async(|when, then| {
            when.method(GET).path("/tenant-domain/context").header("x-forwarded-host", TENANT_HOST);
            then.status(200).json_body(json!({
                "tenant": { "id": TENANT_ID, "name": "Acme Academy", "slug": "acme" }
            }));
        })
        .await;

    let mut config = AppConfig::development();
    config.backend.api_url = backend.base_url();
    config.console.public_url = format!("http://{}", TENANT_HOST);
    config.console.support_email = "help@acme.test".to_string();
    config.tenant.platform_hosts = vec![PLATFORM_HOST.to_string()];
    configure(&mut config);

    let identity = Arc::new(identity);
    let cookie_name = config.session.cookie_name.clone();
    let state = AppState::with_identity(config, identity.clone(), RouteTable::console_default())
        .expect("failed to build app state");

    TestApp {
        router: app(state),
        backend,
        identity,
        cookie_name,
        host: Mutex::new(TENANT_HOST.to_string()),
        cookie: Mutex::new(None),
    }
}

impl TestApp {
    pub fn set_host(&self, host: &str) {
        *self.host.lock().unwrap() = host.to_string();
    }

    pub fn cookie(&self) -> Option<String> {
        self.cookie.lock().unwrap().clone()
    }

    pub fn set_cookie(&self, cookie: Option<String>) {
        *self.cookie.lock().unwrap() = cookie;
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        self.request(Method::GET, path, None).await
    }

    pub async fn request(&self, method: Method, path: &str, body: Option<Value>) -> TestResponse {
        let host = self.host.lock().unwrap().clone();
        let mut builder = Request::builder().method(method).uri(path).header(header::HOST, host);
        if let Some(cookie) = self.cookie() {
            builder = builder.header(header::COOKIE, format!("{}={}", self.cookie_name, cookie));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();

        for value in response.headers().get_all(header::SET_COOKIE) {
            let raw = value.to_str().unwrap();
            let pair = raw.split(';').next().unwrap_or_default();
            if let Some(value) = pair.strip_prefix(&format!("{}=", self.cookie_name)) {
                self.set_cookie(if value.is_empty() { None } else { Some(value.to_string()) });
            }
        }

        let status = response.status();
        let location = response
            .headers()
            .get(header::LOCATION)
            .map(|v| v.to_str().unwrap().to_string());
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();

        TestResponse {
            status,
            location,
            body: String::from_utf8_lossy(&bytes).to_string(),
        }
    }

    /// Open a gated page and return the `state` of the authorize redirect
    pub async fn start_sign_in(&self, path: &str) -> String {
        let res = self.get(path).await;
        assert_eq!(res.status, StatusCode::SEE_OTHER, "expected sign-in redirect for {}", path);
        assert!(res.location().starts_with(AUTHORIZE_URL), "unexpected location {}", res.location());
        query_param(res.location(), "state").expect("authorize url without state")
    }

    pub async fn callback(&self, code: &str, state: &str) -> TestResponse {
        self.get(&format!("/auth/callback?code={}&state={}", code, state)).await
    }

    /// Profile endpoint answering for `sub`'s access token
    pub async fn mock_profile(&self, sub: &str, status: u16, body: Value) -> httpmock::Mock<'_> {
        let token = format!("Bearer {}", access_token(sub));
        self.backend
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/auth/me")
                    .header("authorization", token)
                    .header("x-tenant-id", TENANT_ID);
                then.status(status).json_body(body);
            })
            .await
    }

    /// Full sign-in as `sub` with the given roles; returns where the callback sent the browser
    pub async fn sign_in_as(&self, sub: &str, roles: &[&str], path: &str) -> String {
        let code = format!("code-{}", sub);
        self.identity
            .codes
            .lock()
            .unwrap()
            .insert(code.clone(), signed_in(sub));
        self.mock_profile(sub, 200, json!({ "id": sub, "email": format!("{}@acme.test", sub), "roles": roles }))
            .await;

        let state = self.start_sign_in(path).await;
        let res = self.callback(&code, &state).await;
        assert_eq!(res.status, StatusCode::SEE_OTHER);
        res.location().to_string()
    }
}

pub fn query_param(url: &str, name: &str) -> Option<String> {
    let parsed = if url.starts_with('/') {
        Url::parse(&format!("http://local{}", url)).ok()?
    } else {
        Url::parse(url).ok()?
    };
    parsed
        .query_pairs()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
}
