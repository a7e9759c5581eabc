use std::sync::Arc;

use crate::api::{BackendClient, ClientError};
use crate::auth::{IdentityError, IdentityProvider, OidcProvider};
use crate::config::AppConfig;
use crate::gate::{AuthGate, RouteTable};
use crate::session::SessionStore;
use crate::tenant::TenantResolver;

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error(transparent)]
    Backend(#[from] ClientError),

    #[error(transparent)]
    Identity(#[from] IdentityError),
}

/// Everything a request handler needs, cloned per request
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub backend: BackendClient,
    pub sessions: Arc<SessionStore>,
    pub tenants: Arc<TenantResolver>,
    pub gate: Arc<AuthGate>,
}

impl AppState {
    /// Production wiring: OIDC provider from config
    pub fn from_config(config: AppConfig) -> Result<Self, StateError> {
        let identity = OidcProvider::new(config.identity.clone())?;
        Self::with_identity(config, Arc::new(identity), RouteTable::console_default())
    }

    pub fn with_identity(
        config: AppConfig,
        identity: Arc<dyn IdentityProvider>,
        routes: RouteTable,
    ) -> Result<Self, StateError> {
        let backend = BackendClient::new(&config.backend)?;
        let sessions = Arc::new(SessionStore::new(config.session.idle_ttl()));
        let tenants = Arc::new(TenantResolver::new(backend.clone(), &config.tenant));
        let gate = Arc::new(AuthGate::new(
            identity,
            backend.clone(),
            sessions.clone(),
            routes,
            &config.console.public_url,
            config.session.sign_in_timeout(),
        ));

        Ok(Self {
            config: Arc::new(config),
            backend,
            sessions,
            tenants,
            gate,
        })
    }
}
