use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub backend: BackendConfig,
    pub identity: IdentityConfig,
    pub session: SessionConfig,
    pub tenant: TenantConfig,
    pub console: ConsoleConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the platform REST backend, without trailing slash
    pub api_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    pub issuer_url: String,
    pub client_id: String,
    pub client_secret: Option<String>,
    pub audience: Option<String>,
    pub scope: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub cookie_name: String,
    pub idle_ttl_minutes: i64,
    pub secure_cookie: bool,
    pub purge_interval_secs: u64,
    /// How long a callback may spend loading the profile before the gate starts over
    pub sign_in_timeout_secs: i64,
}

impl SessionConfig {
    /// Idle TTL, clamped to one minute .. 30 days
    pub fn idle_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.idle_ttl_minutes.clamp(1, 30 * 24 * 60))
    }

    /// Sign-in timeout, clamped to one second .. one hour
    pub fn sign_in_timeout(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.sign_in_timeout_secs.clamp(1, 60 * 60))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantConfig {
    /// Hosts that serve the console without a tenant (super-admin console, local dev)
    pub platform_hosts: Vec<String>,
    pub cache_ttl_secs: i64,
}

impl TenantConfig {
    /// Cache TTL, clamped to zero .. one day
    pub fn cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.cache_ttl_secs.clamp(0, 24 * 60 * 60))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleConfig {
    /// Externally visible origin of this service, used for callback and logout URLs
    pub public_url: String,
    pub static_dir: Option<String>,
    pub support_email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub enable_request_logging: bool,
    pub max_request_size_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Backend overrides
        if let Ok(v) = env::var("BACKEND_API_URL") {
            self.backend.api_url = v.trim_end_matches('/').to_string();
        }
        if let Ok(v) = env::var("BACKEND_TIMEOUT_SECS") {
            self.backend.timeout_secs = v.parse().unwrap_or(self.backend.timeout_secs);
        }

        // Identity provider overrides
        if let Ok(v) = env::var("IDENTITY_ISSUER_URL") {
            self.identity.issuer_url = v.trim_end_matches('/').to_string();
        }
        if let Ok(v) = env::var("IDENTITY_CLIENT_ID") {
            self.identity.client_id = v;
        }
        if let Ok(v) = env::var("IDENTITY_CLIENT_SECRET") {
            self.identity.client_secret = Some(v).filter(|s| !s.is_empty());
        }
        if let Ok(v) = env::var("IDENTITY_AUDIENCE") {
            self.identity.audience = Some(v).filter(|s| !s.is_empty());
        }
        if let Ok(v) = env::var("IDENTITY_SCOPE") {
            self.identity.scope = v;
        }

        // Session overrides
        if let Ok(v) = env::var("SESSION_COOKIE_NAME") {
            self.session.cookie_name = v;
        }
        if let Ok(v) = env::var("SESSION_IDLE_TTL_MINUTES") {
            self.session.idle_ttl_minutes = v.parse().unwrap_or(self.session.idle_ttl_minutes);
        }
        if let Ok(v) = env::var("SESSION_SIGN_IN_TIMEOUT_SECS") {
            self.session.sign_in_timeout_secs = v.parse().unwrap_or(self.session.sign_in_timeout_secs);
        }
        if let Ok(v) = env::var("SESSION_SECURE_COOKIE") {
            self.session.secure_cookie = v.parse().unwrap_or(self.session.secure_cookie);
        }

        // Tenant overrides
        if let Ok(v) = env::var("TENANT_PLATFORM_HOSTS") {
            self.tenant.platform_hosts = split_list(&v);
        }
        if let Ok(v) = env::var("TENANT_CACHE_TTL_SECS") {
            self.tenant.cache_ttl_secs = v.parse().unwrap_or(self.tenant.cache_ttl_secs);
        }

        // Console overrides
        if let Ok(v) = env::var("CONSOLE_PUBLIC_URL") {
            self.console.public_url = v.trim_end_matches('/').to_string();
        }
        if let Ok(v) = env::var("CONSOLE_STATIC_DIR") {
            self.console.static_dir = Some(v).filter(|s| !s.is_empty());
        }
        if let Ok(v) = env::var("CONSOLE_SUPPORT_EMAIL") {
            self.console.support_email = v;
        }

        // API overrides
        if let Ok(v) = env::var("API_ENABLE_REQUEST_LOGGING") {
            self.api.enable_request_logging = v.parse().unwrap_or(self.api.enable_request_logging);
        }
        if let Ok(v) = env::var("API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes = v.parse().unwrap_or(self.api.max_request_size_bytes);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = split_list(&v);
        }

        self
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            backend: BackendConfig {
                api_url: "http://localhost:4000".to_string(),
                timeout_secs: 30,
            },
            identity: IdentityConfig {
                issuer_url: "http://localhost:8081".to_string(),
                client_id: "console-dev".to_string(),
                client_secret: None,
                audience: None,
                scope: "openid profile email".to_string(),
            },
            session: SessionConfig {
                cookie_name: "console_session".to_string(),
                idle_ttl_minutes: 12 * 60,
                secure_cookie: false,
                purge_interval_secs: 300,
                sign_in_timeout_secs: 60,
            },
            tenant: TenantConfig {
                platform_hosts: vec!["localhost".to_string(), "127.0.0.1".to_string()],
                cache_ttl_secs: 30,
            },
            console: ConsoleConfig {
                public_url: "http://localhost:3000".to_string(),
                static_dir: None,
                support_email: "support@localhost".to_string(),
            },
            api: ApiConfig {
                enable_request_logging: true,
                max_request_size_bytes: 10 * 1024 * 1024, // 10MB
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
            },
        }
    }

    pub fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            backend: BackendConfig {
                api_url: "https://api.staging.example.com".to_string(),
                timeout_secs: 15,
            },
            identity: IdentityConfig {
                issuer_url: "https://login.staging.example.com".to_string(),
                client_id: String::new(),
                client_secret: None,
                audience: Some("https://api.staging.example.com".to_string()),
                scope: "openid profile email".to_string(),
            },
            session: SessionConfig {
                cookie_name: "console_session".to_string(),
                idle_ttl_minutes: 8 * 60,
                secure_cookie: true,
                purge_interval_secs: 300,
                sign_in_timeout_secs: 60,
            },
            tenant: TenantConfig {
                platform_hosts: vec!["admin.staging.example.com".to_string()],
                cache_ttl_secs: 300,
            },
            console: ConsoleConfig {
                public_url: "https://console.staging.example.com".to_string(),
                static_dir: Some("dist".to_string()),
                support_email: "support@example.com".to_string(),
            },
            api: ApiConfig {
                enable_request_logging: true,
                max_request_size_bytes: 5 * 1024 * 1024, // 5MB
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://staging.example.com".to_string()],
            },
        }
    }

    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            backend: BackendConfig {
                api_url: "https://api.example.com".to_string(),
                timeout_secs: 10,
            },
            identity: IdentityConfig {
                issuer_url: "https://login.example.com".to_string(),
                client_id: String::new(),
                client_secret: None,
                audience: Some("https://api.example.com".to_string()),
                scope: "openid profile email".to_string(),
            },
            session: SessionConfig {
                cookie_name: "__Host-console_session".to_string(),
                idle_ttl_minutes: 4 * 60,
                secure_cookie: true,
                purge_interval_secs: 120,
                sign_in_timeout_secs: 60,
            },
            tenant: TenantConfig {
                platform_hosts: vec!["admin.example.com".to_string()],
                cache_ttl_secs: 600,
            },
            console: ConsoleConfig {
                public_url: "https://console.example.com".to_string(),
                static_dir: Some("dist".to_string()),
                support_email: "support@example.com".to_string(),
            },
            api: ApiConfig {
                enable_request_logging: false,
                max_request_size_bytes: 2 * 1024 * 1024, // 2MB
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://app.example.com".to_string()],
            },
        }
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[macro_export]
macro_rules! is_development {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Development)
    };
}
