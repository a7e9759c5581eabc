use serde_json::json;

use crate::api::BackendClient;
use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::config::AppConfig;

pub async fn handle(config: &AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    let backend = BackendClient::new(&config.backend)?;

    match backend.health().await {
        Ok(body) => output_success(
            &output_format,
            &format!("Backend {} is healthy", backend.base_url()),
            Some(json!({ "backend": backend.base_url(), "health": body })),
        ),
        Err(e) => {
            output_error(&output_format, &format!("Backend {} unhealthy: {}", backend.base_url(), e), Some("BACKEND_UNAVAILABLE"))?;
            Err(anyhow::anyhow!("health check failed"))
        }
    }
}
