use serde_json::json;

use crate::api::{BackendClient, RequestContext};
use crate::auth::{AuthErrorCode, RoleSet};
use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::config::AppConfig;

pub async fn handle(
    config: &AppConfig,
    token: &str,
    tenant: Option<String>,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    let backend = BackendClient::new(&config.backend)?;
    let ctx = RequestContext::anonymous(None).with_token(token).with_tenant(tenant.clone());

    let profile = match backend.current_user(&ctx).await {
        Ok(profile) => profile,
        Err(e) => {
            // Same classification the console uses after sign-in
            let code = AuthErrorCode::from_profile_error(&e);
            output_error(&output_format, &format!("{}: {}", code.title(), e), Some(code.as_str()))?;
            return Err(anyhow::anyhow!("profile load failed ({})", code));
        }
    };

    let roles = RoleSet::from_profile(&profile);
    let role_names: Vec<&str> = roles.iter().map(|r| r.as_str()).collect();

    output_details(
        &output_format,
        &[
            ("User", profile.id.clone()),
            ("Email", profile.email.clone().unwrap_or_default()),
            ("Tenant", tenant.clone().unwrap_or_else(|| "-".to_string())),
            ("Roles", if role_names.is_empty() { "-".to_string() } else { role_names.join(", ") }),
            ("Home", roles.home_path().to_string()),
        ],
        json!({
            "user": profile,
            "tenant_id": tenant,
            "roles": role_names,
            "home": roles.home_path(),
        }),
    )
}
