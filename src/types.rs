/// Shared wire types exchanged with the platform backend

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tenant record returned by `/tenant-domain/context`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantContext {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default, alias = "primary_domain")]
    pub primary_domain: Option<String>,
    /// Appearance settings, passed through to the console untouched
    #[serde(default)]
    pub branding: Option<Value>,
}

/// Envelope of `/tenant-domain/context`; `tenant` is null for hosts the backend does not know
#[derive(Debug, Clone, Deserialize)]
pub struct TenantDomainResponse {
    #[serde(default)]
    pub tenant: Option<TenantContext>,
}

/// A role entry as the backend sends it: a bare name or a role object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawRole {
    Name(String),
    Detailed {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        key: Option<String>,
        #[serde(default)]
        slug: Option<String>,
        #[serde(default)]
        metadata: Option<Value>,
    },
}

/// Association between the user and the current tenant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    #[serde(default, alias = "tenant_id")]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub roles: Vec<RawRole>,
    #[serde(default, alias = "reward_credits")]
    pub reward_credits: Option<i64>,
}

/// Current-user profile returned by `/auth/me`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub roles: Vec<RawRole>,
    #[serde(default)]
    pub membership: Option<Membership>,
    #[serde(default, alias = "is_super_admin")]
    pub is_super_admin: bool,
}

/// Body of `POST /auth/register`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
}
