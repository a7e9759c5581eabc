// Hostname -> tenant resolution
//
// The backend owns the domain table; this module normalizes the request host,
// short-circuits platform hosts and caches answers per host.

use std::collections::HashMap;

use axum::http::{header, HeaderMap};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::api::{BackendClient, ClientError};
use crate::api::client::FORWARDED_HOST_HEADER;
use crate::config::TenantConfig;
use crate::types::TenantContext;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "tenant", rename_all = "lowercase")]
pub enum TenantResolution {
    Tenant(TenantContext),
    /// Served without a tenant (super-admin console, local development)
    Platform,
    /// Backend knows no tenant for this host
    Unknown,
}

impl TenantResolution {
    pub fn tenant(&self) -> Option<&TenantContext> {
        match self {
            TenantResolution::Tenant(tenant) => Some(tenant),
            _ => None,
        }
    }

    pub fn tenant_id(&self) -> Option<String> {
        self.tenant().map(|t| t.id.clone())
    }
}

/// Lowercase, strip port and trailing dot. Returns None for an empty host.
pub fn normalize_host(raw: &str) -> Option<String> {
    let host = raw.trim().to_lowercase();
    let host = if let Some(rest) = host.strip_prefix('[') {
        // IPv6 literal: keep the brackets, drop the port
        rest.split(']').next().map(|h| format!("[{}]", h)).unwrap_or_default()
    } else {
        host.split(':').next().unwrap_or_default().to_string()
    };
    let host = host.trim_end_matches('.').to_string();
    if host.is_empty() || host == "[]" {
        None
    } else {
        Some(host)
    }
}

/// Browser-facing host: first `x-forwarded-host` value, else `Host`
pub fn request_host(headers: &HeaderMap) -> Option<String> {
    headers
        .get(FORWARDED_HOST_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .or_else(|| headers.get(header::HOST).and_then(|v| v.to_str().ok()))
        .and_then(normalize_host)
}

struct CachedResolution {
    resolution: TenantResolution,
    expires_at: DateTime<Utc>,
}

pub struct TenantResolver {
    backend: BackendClient,
    platform_hosts: Vec<String>,
    ttl: Duration,
    cache: RwLock<HashMap<String, CachedResolution>>,
}

impl TenantResolver {
    pub fn new(backend: BackendClient, config: &TenantConfig) -> Self {
        Self {
            backend,
            platform_hosts: config
                .platform_hosts
                .iter()
                .filter_map(|h| normalize_host(h))
                .collect(),
            ttl: config.cache_ttl(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn is_platform_host(&self, host: &str) -> bool {
        self.platform_hosts.iter().any(|h| h == host)
    }

    /// Resolve a normalized host. Backend failures are returned, not cached.
    pub async fn resolve(&self, host: &str) -> Result<TenantResolution, ClientError> {
        if self.is_platform_host(host) {
            return Ok(TenantResolution::Platform);
        }

        let now = Utc::now();
        // Fast path: try read lock
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.get(host) {
                if cached.expires_at > now {
                    return Ok(cached.resolution.clone());
                }
            }
        }

        let resolution = match self.backend.tenant_domain_context(host).await? {
            Some(tenant) => {
                tracing::debug!("Resolved host {} to tenant {} ({})", host, tenant.name, tenant.id);
                TenantResolution::Tenant(tenant)
            }
            None => {
                tracing::warn!("No tenant registered for host {}", host);
                TenantResolution::Unknown
            }
        };

        {
            let mut cache = self.cache.write().await;
            cache.insert(
                host.to_string(),
                CachedResolution {
                    resolution: resolution.clone(),
                    expires_at: now + self.ttl,
                },
            );
        }

        Ok(resolution)
    }
}
