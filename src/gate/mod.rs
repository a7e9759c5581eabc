// Tenant/auth gate
//
// Decides for every console request whether to render, send the browser to
// sign in, or redirect to an error page. The per-session state lives in
// `session::GateState`:
//
//   Unauthenticated -> PendingLogin -> LoadingProfile -> Ready | Failed
//
// A LoadingProfile older than the sign-in timeout is abandoned (the callback
// request was dropped) and the next gated request starts a new sign-in.
//
// Every transition is applied through `SessionStore::update`, so checking and
// changing the state is a single step under the store lock.

pub mod routes;

use std::sync::Arc;

use chrono::{Duration, Utc};
use thiserror::Error;
use url::form_urlencoded;
use uuid::Uuid;

use crate::api::{BackendClient, ClientError, RequestContext};
use crate::auth::{AuthErrorCode, AuthorizeRequest, IdentityError, IdentityProvider, Role};
use crate::session::{GateState, PendingLogin, Principal, SessionStore};
use crate::tenant::TenantResolution;
use crate::types::RegisterRequest;

pub use routes::{RouteAccess, RouteTable};

pub const CALLBACK_PATH: &str = "/auth/callback";
pub const ERROR_PATH: &str = "/auth/error";
pub const UNAUTHORIZED_PATH: &str = "/unauthorized";

#[derive(Debug, Error)]
pub enum GateError {
    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error("session {0} no longer exists")]
    SessionLost(Uuid),
}

/// Outcome of gating one console request
#[derive(Debug)]
pub enum GateDecision {
    /// Route needs no sign-in
    Public,
    Render(Box<Principal>),
    /// Send the browser to the identity provider
    SignIn { authorize_url: String },
    /// A callback for this session is still loading the profile
    SigningIn { return_to: String },
    Unauthorized,
}

/// Query parameters the identity provider sends back to the callback
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Where the browser goes after the callback
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// Signed in; relative path to continue at
    Continue(String),
    /// Relative error page, or the provider's logout URL returning to it.
    /// `session_ended` is set when the session was destroyed and the cookie should go.
    Failed { code: AuthErrorCode, location: String, session_ended: bool },
}

/// Keep redirects on-site and away from the auth routes themselves
pub fn sanitize_return_to(raw: Option<&str>) -> String {
    match raw.map(str::trim) {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.starts_with("/\\")
                && path != "/auth"
                && !path.starts_with("/auth/")
                && !path.starts_with("/auth?") =>
        {
            path.to_string()
        }
        _ => "/".to_string(),
    }
}

/// `/auth/error?code=..&returnTo=..`
pub fn error_page_path(code: AuthErrorCode, return_to: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("code", code.as_str())
        .append_pair("returnTo", return_to)
        .finish();
    format!("{}?{}", ERROR_PATH, query)
}

/// Path component of a path-and-query string
pub fn path_only(path_and_query: &str) -> &str {
    path_and_query.split(['?', '#']).next().unwrap_or("/")
}

pub struct AuthGate {
    identity: Arc<dyn IdentityProvider>,
    backend: BackendClient,
    sessions: Arc<SessionStore>,
    routes: RouteTable,
    public_url: String,
    sign_in_timeout: Duration,
}

enum Step {
    Ready(Box<Principal>),
    SignIn(PendingLogin),
    SigningIn(String),
}

impl AuthGate {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        backend: BackendClient,
        sessions: Arc<SessionStore>,
        routes: RouteTable,
        public_url: &str,
        sign_in_timeout: Duration,
    ) -> Self {
        Self {
            identity,
            backend,
            sessions,
            routes,
            public_url: public_url.trim_end_matches('/').to_string(),
            sign_in_timeout,
        }
    }

    /// Browser-visible origin for `host`. The configured public URL is used when
    /// it names the same host, since it carries the scheme and port.
    pub fn origin_for(&self, host: &str) -> String {
        let public = url::Url::parse(&self.public_url).ok();
        match public {
            Some(url) if url.host_str() == Some(host) => self.public_url.clone(),
            Some(url) => format!("{}://{}", url.scheme(), host),
            None => format!("https://{}", host),
        }
    }

    fn authorize_url(&self, pending: &PendingLogin, host: &str) -> Result<String, IdentityError> {
        let redirect_uri = format!("{}{}", self.origin_for(host), CALLBACK_PATH);
        self.identity.authorize_url(&AuthorizeRequest {
            state: &pending.state,
            code_challenge: &pending.pkce.challenge,
            redirect_uri: &redirect_uri,
            signup: pending.registration.is_some(),
        })
    }

    /// Gate a console request for `path_and_query`
    pub async fn evaluate(
        &self,
        session_id: Uuid,
        host: &str,
        path_and_query: &str,
        tenant: &TenantResolution,
    ) -> Result<GateDecision, GateError> {
        let access = self.routes.access_for(path_only(path_and_query));
        if *access == RouteAccess::Public {
            return Ok(GateDecision::Public);
        }

        let now = Utc::now();
        let tenant_id = tenant.tenant_id();
        let return_to = sanitize_return_to(Some(path_and_query));

        let sign_in_timeout = self.sign_in_timeout;
        let step = self
            .sessions
            .update(session_id, |session| {
                tracing::trace!("Gating {} for session {} in state {}", path_and_query, session.id, session.state.name());
                if let GateState::Ready(principal) = &session.state {
                    if principal.tokens.is_expired(now) {
                        tracing::info!("Session {} tokens expired, signing in again", session.id);
                        session.state = GateState::Unauthenticated;
                    } else if principal.tenant_id != tenant_id {
                        tracing::warn!(
                            "Session {} bound to tenant {:?} but host resolves to {:?}",
                            session.id,
                            principal.tenant_id,
                            tenant_id
                        );
                        session.state = GateState::Unauthenticated;
                    }
                }
                if let GateState::LoadingProfile { started_at, return_to, tenant_id: pending_tenant, .. } = &session.state {
                    if now - *started_at > sign_in_timeout {
                        tracing::warn!("Session {} abandoned while loading the profile, starting over", session.id);
                        let pending = PendingLogin::new(return_to.clone(), pending_tenant.clone(), None);
                        session.state = GateState::PendingLogin(pending);
                    }
                }

                match &session.state {
                    GateState::Ready(principal) => Step::Ready(principal.clone()),
                    // One sign-in attempt per session: reuse it and its original path
                    GateState::PendingLogin(pending) => Step::SignIn(pending.clone()),
                    GateState::LoadingProfile { return_to, .. } => Step::SigningIn(return_to.clone()),
                    GateState::Unauthenticated | GateState::Failed(_) => {
                        let pending = PendingLogin::new(return_to, tenant_id.clone(), None);
                        session.state = GateState::PendingLogin(pending.clone());
                        Step::SignIn(pending)
                    }
                }
            })
            .await
            .ok_or(GateError::SessionLost(session_id))?;

        match step {
            Step::Ready(principal) => {
                if access.allows(&principal.roles) {
                    Ok(GateDecision::Render(principal))
                } else {
                    tracing::info!(
                        "User {} lacks roles for {} (has {:?})",
                        principal.subject,
                        path_and_query,
                        principal.roles
                    );
                    Ok(GateDecision::Unauthorized)
                }
            }
            Step::SignIn(pending) => {
                tracing::debug!("Session {} sent to sign in, returning to {}", session_id, pending.return_to);
                Ok(GateDecision::SignIn { authorize_url: self.authorize_url(&pending, host)? })
            }
            Step::SigningIn(return_to) => Ok(GateDecision::SigningIn { return_to }),
        }
    }

    /// Start a fresh sign-in (explicit login or signup), replacing any pending one
    pub async fn begin_sign_in(
        &self,
        session_id: Uuid,
        host: &str,
        return_to: String,
        tenant_id: Option<String>,
        registration: Option<Role>,
    ) -> Result<String, GateError> {
        let pending = PendingLogin::new(return_to, tenant_id, registration);
        self.sessions
            .update(session_id, |session| {
                session.state = GateState::PendingLogin(pending.clone());
            })
            .await
            .ok_or(GateError::SessionLost(session_id))?;

        if let Some(role) = registration {
            tracing::info!("Session {} signing up as {}", session_id, role);
        }
        Ok(self.authorize_url(&pending, host)?)
    }

    async fn fail(&self, session_id: Uuid, host: &str, code: AuthErrorCode, return_to: &str, sign_out: bool) -> CallbackOutcome {
        if sign_out {
            // Signed in at the provider but unusable here: destroy the session
            self.sessions.remove(session_id).await;
        } else {
            self.sessions
                .update(session_id, |session| session.state = GateState::Failed(code))
                .await;
        }

        let error_path = error_page_path(code, return_to);
        let location = if sign_out {
            let return_url = format!("{}{}", self.origin_for(host), error_path);
            match self.identity.logout_url(&return_url) {
                Ok(url) => url,
                Err(e) => {
                    tracing::error!("Failed to build logout url: {}", e);
                    error_path
                }
            }
        } else {
            error_path
        };

        CallbackOutcome::Failed { code, location, session_ended: sign_out }
    }

    /// Handle the identity provider's redirect back to `/auth/callback`
    pub async fn complete_sign_in(
        &self,
        session_id: Uuid,
        host: &str,
        params: CallbackParams,
    ) -> CallbackOutcome {
        // Take the pending login out of the session; a second callback finds nothing
        let taken = self
            .sessions
            .update(session_id, |session| match std::mem::take(&mut session.state) {
                GateState::PendingLogin(pending) if params.state.as_deref() == Some(pending.state.as_str()) => {
                    Ok(pending)
                }
                other => {
                    let already_signed_in = other.principal().map(|p| p.home_path());
                    session.state = other;
                    Err(already_signed_in)
                }
            })
            .await;

        let pending = match taken {
            Some(Ok(pending)) => pending,
            Some(Err(Some(home))) => {
                tracing::debug!("Duplicate callback for signed-in session {}", session_id);
                return CallbackOutcome::Continue(home.to_string());
            }
            Some(Err(None)) | None => {
                // Leave the session alone: a forged callback must not cancel a real sign-in
                tracing::warn!("Callback state mismatch for session {}", session_id);
                return CallbackOutcome::Failed {
                    code: AuthErrorCode::SignInFailed,
                    location: error_page_path(AuthErrorCode::SignInFailed, "/"),
                    session_ended: false,
                };
            }
        };

        if let Some(error) = &params.error {
            tracing::warn!(
                "Identity provider returned error '{}': {}",
                error,
                params.error_description.as_deref().unwrap_or("")
            );
            return self.fail(session_id, host, AuthErrorCode::SignInFailed, &pending.return_to, false).await;
        }
        let Some(code) = params.code.as_deref() else {
            return self.fail(session_id, host, AuthErrorCode::SignInFailed, &pending.return_to, false).await;
        };

        let redirect_uri = format!("{}{}", self.origin_for(host), CALLBACK_PATH);
        let signed_in = match self.identity.exchange_code(code, &pending.pkce.verifier, &redirect_uri).await {
            Ok(signed_in) => signed_in,
            Err(e) => {
                tracing::warn!("Code exchange failed for session {}: {}", session_id, e);
                return self.fail(session_id, host, AuthErrorCode::SignInFailed, &pending.return_to, false).await;
            }
        };

        self.sessions
            .update(session_id, |session| {
                session.state = GateState::LoadingProfile {
                    tokens: signed_in.tokens.clone(),
                    identity: signed_in.identity.clone(),
                    return_to: pending.return_to.clone(),
                    tenant_id: pending.tenant_id.clone(),
                    started_at: Utc::now(),
                };
            })
            .await;

        let ctx = RequestContext::anonymous(Some(host.to_string()))
            .with_token(signed_in.tokens.access_token.clone())
            .with_tenant(pending.tenant_id.clone());

        // The pending login was taken out of the session above, so this runs once per sign-in
        if let Some(role) = pending.registration {
            let request = RegisterRequest {
                role: role.as_str().to_string(),
                tenant_id: pending.tenant_id.clone(),
            };
            match self.backend.register(&ctx, &request).await {
                Ok(_) => tracing::info!("Registered {} as {}", signed_in.identity.sub, role),
                Err(ClientError::Status { status: 409, .. }) => {
                    tracing::info!("{} already registered", signed_in.identity.sub);
                }
                Err(e) => {
                    tracing::error!("Registration failed for {}: {}", signed_in.identity.sub, e);
                    return self
                        .fail(session_id, host, AuthErrorCode::RegistrationFailed, &pending.return_to, true)
                        .await;
                }
            }
        }

        let profile = match self.backend.current_user(&ctx).await {
            Ok(profile) => profile,
            Err(e) => {
                let code = AuthErrorCode::from_profile_error(&e);
                tracing::warn!("Profile load failed for {} ({}): {}", signed_in.identity.sub, code, e);
                return self.fail(session_id, host, code, &pending.return_to, true).await;
            }
        };

        let principal = Principal::new(signed_in.identity, profile, pending.tenant_id, signed_in.tokens);
        let destination = if pending.return_to == "/" {
            principal.home_path().to_string()
        } else {
            pending.return_to
        };
        tracing::info!(
            "Signed in {} with roles {:?}, continuing to {}",
            principal.subject,
            principal.roles,
            destination
        );

        let stored = self
            .sessions
            .update(session_id, |session| {
                session.state = GateState::Ready(Box::new(principal));
            })
            .await;
        if stored.is_none() {
            return self.fail(session_id, host, AuthErrorCode::SignInFailed, &destination, false).await;
        }

        CallbackOutcome::Continue(destination)
    }

    /// End the session and return the provider logout URL
    pub async fn sign_out(&self, session_id: Option<Uuid>, host: &str) -> Result<String, GateError> {
        if let Some(id) = session_id {
            self.sessions.remove(id).await;
        }
        let return_url = format!("{}/", self.origin_for(host));
        Ok(self.identity.logout_url(&return_url)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{IdentityClaims, SignedIn, TokenSet};
    use crate::config::BackendConfig;
    use async_trait::async_trait;
    use serde_json::json;

    struct NoopIdentity;

    #[async_trait]
    impl IdentityProvider for NoopIdentity {
        fn authorize_url(&self, request: &AuthorizeRequest<'_>) -> Result<String, IdentityError> {
            Ok(format!("https://id.test/authorize?state={}", request.state))
        }

        async fn exchange_code(&self, _: &str, _: &str, _: &str) -> Result<SignedIn, IdentityError> {
            Err(IdentityError::MissingIdToken)
        }

        fn logout_url(&self, return_to: &str) -> Result<String, IdentityError> {
            Ok(format!("https://id.test/v2/logout?returnTo={}", return_to))
        }
    }

    fn gate(sessions: Arc<SessionStore>, sign_in_timeout: Duration) -> AuthGate {
        let backend = BackendClient::new(&BackendConfig { api_url: "http://127.0.0.1:9".into(), timeout_secs: 1 }).unwrap();
        AuthGate::new(
            Arc::new(NoopIdentity),
            backend,
            sessions,
            RouteTable::console_default(),
            "http://acme.test",
            sign_in_timeout,
        )
    }

    fn tenant(id: &str) -> TenantResolution {
        TenantResolution::Tenant(serde_json::from_value(json!({ "id": id, "name": id })).unwrap())
    }

    fn tokens(valid_for: Duration) -> TokenSet {
        TokenSet {
            access_token: "tok".into(),
            id_token: None,
            refresh_token: None,
            expires_at: Utc::now() + valid_for,
        }
    }

    fn coach(tenant_id: &str, valid_for: Duration) -> GateState {
        let identity = IdentityClaims { sub: "u-1".into(), email: None, name: None };
        let profile = serde_json::from_value(json!({ "id": "u-1", "roles": ["coach"] })).unwrap();
        GateState::Ready(Box::new(Principal::new(identity, profile, Some(tenant_id.into()), tokens(valid_for))))
    }

    async fn session_in(sessions: &SessionStore, state: GateState) -> Uuid {
        let session = sessions.load(None, "acme.test").await;
        sessions.update(session.id, |s| s.state = state).await;
        session.id
    }

    #[tokio::test]
    async fn abandoned_profile_load_starts_a_new_sign_in() {
        let sessions = Arc::new(SessionStore::new(Duration::minutes(10)));
        let gate = gate(sessions.clone(), Duration::seconds(30));
        let loading = |started_at: chrono::DateTime<Utc>| GateState::LoadingProfile {
            tokens: tokens(Duration::hours(1)),
            identity: IdentityClaims { sub: "u-1".into(), email: None, name: None },
            return_to: "/coach/roster".into(),
            tenant_id: Some("t-1".into()),
            started_at,
        };

        let fresh = session_in(&sessions, loading(Utc::now())).await;
        let decision = gate.evaluate(fresh, "acme.test", "/coach", &tenant("t-1")).await.unwrap();
        assert!(matches!(decision, GateDecision::SigningIn { return_to } if return_to == "/coach/roster"));

        let stale = session_in(&sessions, loading(Utc::now() - Duration::minutes(2))).await;
        let decision = gate.evaluate(stale, "acme.test", "/coach", &tenant("t-1")).await.unwrap();
        assert!(matches!(decision, GateDecision::SignIn { .. }));

        let state = sessions.get(stale).await.unwrap().state;
        assert!(matches!(state, GateState::PendingLogin(p) if p.return_to == "/coach/roster"));
    }

    #[tokio::test]
    async fn ready_session_for_another_tenant_signs_in_again() {
        let sessions = Arc::new(SessionStore::new(Duration::minutes(10)));
        let gate = gate(sessions.clone(), Duration::seconds(30));
        let id = session_in(&sessions, coach("t-1", Duration::hours(1))).await;

        let decision = gate.evaluate(id, "acme.test", "/coach", &tenant("t-1")).await.unwrap();
        assert!(matches!(decision, GateDecision::Render(_)));

        // The host now resolves to a different tenant
        let decision = gate.evaluate(id, "acme.test", "/coach", &tenant("t-2")).await.unwrap();
        assert!(matches!(decision, GateDecision::SignIn { .. }));
        let state = sessions.get(id).await.unwrap().state;
        assert!(matches!(state, GateState::PendingLogin(p) if p.tenant_id.as_deref() == Some("t-2")));
    }

    #[tokio::test]
    async fn expired_tokens_sign_in_again() {
        let sessions = Arc::new(SessionStore::new(Duration::minutes(10)));
        let gate = gate(sessions.clone(), Duration::seconds(30));
        let id = session_in(&sessions, coach("t-1", -Duration::minutes(1))).await;

        let decision = gate.evaluate(id, "acme.test", "/coach", &tenant("t-1")).await.unwrap();
        assert!(matches!(decision, GateDecision::SignIn { .. }));
    }

    #[tokio::test]
    async fn forged_callback_leaves_pending_login_alone() {
        let sessions = Arc::new(SessionStore::new(Duration::minutes(10)));
        let gate = gate(sessions.clone(), Duration::seconds(30));
        let pending = PendingLogin::new("/coach".into(), Some("t-1".into()), Some(Role::Coach));
        let id = session_in(&sessions, GateState::PendingLogin(pending.clone())).await;

        let params = CallbackParams { code: Some("x".into()), state: Some("forged".into()), ..Default::default() };
        let outcome = gate.complete_sign_in(id, "acme.test", params).await;
        assert!(matches!(outcome, CallbackOutcome::Failed { session_ended: false, .. }));

        let state = sessions.get(id).await.unwrap().state;
        assert!(matches!(state, GateState::PendingLogin(p) if p == pending));
    }

    #[test]
    fn return_to_must_be_local_and_outside_auth() {
        assert_eq!(sanitize_return_to(Some("/admin/programs?page=2")), "/admin/programs?page=2");
        assert_eq!(sanitize_return_to(Some("https://evil.test")), "/");
        assert_eq!(sanitize_return_to(Some("//evil.test/x")), "/");
        assert_eq!(sanitize_return_to(Some("/\\evil.test")), "/");
        assert_eq!(sanitize_return_to(Some("/auth/callback?code=x")), "/");
        assert_eq!(sanitize_return_to(Some("/authors")), "/authors");
        assert_eq!(sanitize_return_to(None), "/");
    }

    #[test]
    fn error_page_path_encodes_return_to() {
        assert_eq!(
            error_page_path(AuthErrorCode::SessionExpired, "/admin/users?x=1&y=2"),
            "/auth/error?code=session-expired&returnTo=%2Fadmin%2Fusers%3Fx%3D1%26y%3D2"
        );
    }

    #[test]
    fn path_only_strips_query_and_fragment() {
        assert_eq!(path_only("/coach/roster?week=3"), "/coach/roster");
        assert_eq!(path_only("/coach#top"), "/coach");
        assert_eq!(path_only("/"), "/");
    }
}
