// Identity provider seam
//
// The console signs users in with an OIDC authorization-code flow (PKCE S256).
// `IdentityProvider` is the boundary the gate talks to; `OidcProvider` is the
// production implementation, tests substitute a scripted provider.

use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::config::IdentityConfig;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("identity provider is not configured: {0}")]
    NotConfigured(&'static str),

    #[error("invalid identity provider url: {0}")]
    Url(#[from] url::ParseError),

    #[error("token endpoint returned {status}: {message}")]
    TokenEndpoint { status: u16, message: String },

    #[error("token request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("token response has no id_token")]
    MissingIdToken,

    #[error("invalid id_token: {0}")]
    InvalidIdToken(#[from] jsonwebtoken::errors::Error),
}

/// Tokens obtained from the authorization-code exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    pub id_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl TokenSet {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Identity asserted by the provider's ID token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityClaims {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SignedIn {
    pub tokens: TokenSet,
    pub identity: IdentityClaims,
}

/// Parameters of one authorize redirect
#[derive(Debug, Clone)]
pub struct AuthorizeRequest<'a> {
    pub state: &'a str,
    pub code_challenge: &'a str,
    pub redirect_uri: &'a str,
    /// Open the provider's signup screen instead of login
    pub signup: bool,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    fn authorize_url(&self, request: &AuthorizeRequest<'_>) -> Result<String, IdentityError>;

    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
        redirect_uri: &str,
    ) -> Result<SignedIn, IdentityError>;

    fn logout_url(&self, return_to: &str) -> Result<String, IdentityError>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    id_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct IdTokenClaims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

pub struct OidcProvider {
    http: reqwest::Client,
    config: IdentityConfig,
}

impl OidcProvider {
    pub fn new(config: IdentityConfig) -> Result<Self, IdentityError> {
        if config.client_id.is_empty() {
            return Err(IdentityError::NotConfigured("IDENTITY_CLIENT_ID"));
        }
        // Validate once so the URL builders below cannot fail on the base
        Url::parse(&config.issuer_url)?;

        let http = reqwest::Client::builder()
            .timeout(StdDuration::from_secs(15))
            .build()?;
        Ok(Self { http, config })
    }

    fn endpoint(&self, path: &str) -> Result<Url, IdentityError> {
        Ok(Url::parse(&format!(
            "{}/{}",
            self.config.issuer_url.trim_end_matches('/'),
            path
        ))?)
    }

    /// Decode ID token claims. The token comes straight from the token endpoint
    /// over TLS, so only audience and expiry are checked here.
    fn decode_id_token(&self, id_token: &str) -> Result<IdentityClaims, IdentityError> {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.insecure_disable_signature_validation();
        validation.set_audience(&[self.config.client_id.as_str()]);

        let data = decode::<IdTokenClaims>(id_token, &DecodingKey::from_secret(&[]), &validation)?;
        Ok(IdentityClaims {
            sub: data.claims.sub,
            email: data.claims.email,
            name: data.claims.name,
        })
    }
}

#[async_trait]
impl IdentityProvider for OidcProvider {
    fn authorize_url(&self, request: &AuthorizeRequest<'_>) -> Result<String, IdentityError> {
        let mut url = self.endpoint("authorize")?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("response_type", "code")
                .append_pair("client_id", &self.config.client_id)
                .append_pair("redirect_uri", request.redirect_uri)
                .append_pair("scope", &self.config.scope)
                .append_pair("state", request.state)
                .append_pair("code_challenge", request.code_challenge)
                .append_pair("code_challenge_method", "S256");
            if let Some(audience) = &self.config.audience {
                query.append_pair("audience", audience);
            }
            if request.signup {
                query.append_pair("screen_hint", "signup");
            }
        }
        Ok(url.into())
    }

    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
        redirect_uri: &str,
    ) -> Result<SignedIn, IdentityError> {
        let mut form = vec![
            ("grant_type", "authorization_code"),
            ("client_id", self.config.client_id.as_str()),
            ("code", code),
            ("code_verifier", code_verifier),
            ("redirect_uri", redirect_uri),
        ];
        if let Some(secret) = &self.config.client_secret {
            form.push(("client_secret", secret.as_str()));
        }

        let response = self
            .http
            .post(self.endpoint("oauth/token")?)
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body: serde_json::Value = response.json().await.unwrap_or_default();
            let message = body
                .get("error_description")
                .or_else(|| body.get("error"))
                .and_then(|v| v.as_str())
                .unwrap_or("token exchange failed")
                .to_string();
            return Err(IdentityError::TokenEndpoint { status: status.as_u16(), message });
        }

        let token: TokenResponse = response.json().await?;
        let id_token = token.id_token.ok_or(IdentityError::MissingIdToken)?;
        let identity = self.decode_id_token(&id_token)?;
        let lifetime = token.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);

        Ok(SignedIn {
            tokens: TokenSet {
                access_token: token.access_token,
                id_token: Some(id_token),
                refresh_token: token.refresh_token,
                expires_at: Utc::now() + Duration::seconds(lifetime),
            },
            identity,
        })
    }

    fn logout_url(&self, return_to: &str) -> Result<String, IdentityError> {
        let mut url = self.endpoint("v2/logout")?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("returnTo", return_to);
        Ok(url.into())
    }
}
