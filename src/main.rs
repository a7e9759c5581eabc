use std::time::Duration;

use tracing_subscriber::EnvFilter;

use tenant_console::config::{self, AppConfig};
use tenant_console::{app, is_development, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up BACKEND_API_URL, IDENTITY_*, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Initialize configuration (this loads the config singleton)
    let config: &AppConfig = config::config();
    tracing::info!("Starting tenant console in {:?} mode", config.environment);
    if is_development!() {
        tracing::debug!("Backend {} / identity {}", config.backend.api_url, config.identity.issuer_url);
    }

    let state = AppState::from_config(config.clone())?;
    spawn_session_purge(&state, Duration::from_secs(config.session.purge_interval_secs));

    // Allow tests or deployments to override port via env
    let port = std::env::var("CONSOLE_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Tenant console listening on http://{}", bind_addr);

    axum::serve(listener, app(state)).await?;
    Ok(())
}

fn spawn_session_purge(state: &AppState, every: Duration) {
    let sessions = state.sessions.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            let purged = sessions.purge_expired().await;
            if purged > 0 {
                tracing::debug!("Purged {} idle sessions", purged);
            }
        }
    });
}
