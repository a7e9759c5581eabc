use clap::Subcommand;
use futures::future::join_all;
use serde_json::json;

use crate::api::BackendClient;
use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::tenant::{normalize_host, TenantResolution, TenantResolver};

#[derive(Subcommand)]
pub enum TenantCommands {
    #[command(about = "Resolve hostnames to tenants the way the console does")]
    Resolve {
        #[arg(required = true, help = "Hostnames, optionally with port")]
        hosts: Vec<String>,
    },
}

pub async fn handle(cmd: TenantCommands, config: &AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        TenantCommands::Resolve { hosts } => {
            let backend = BackendClient::new(&config.backend)?;
            let resolver = TenantResolver::new(backend, &config.tenant);

            let lookups = hosts.iter().map(|raw| {
                let resolver = &resolver;
                async move {
                    match normalize_host(raw) {
                        Some(host) => {
                            let result = resolver.resolve(&host).await;
                            (raw.as_str(), Some(host), Some(result))
                        }
                        None => (raw.as_str(), None, None),
                    }
                }
            });
            let results = join_all(lookups).await;

            match output_format {
                OutputFormat::Json => {
                    let rows: Vec<_> = results
                        .iter()
                        .map(|(raw, host, result)| match result {
                            Some(Ok(resolution)) => json!({ "input": raw, "host": host, "resolution": resolution }),
                            Some(Err(e)) => json!({ "input": raw, "host": host, "error": e.to_string() }),
                            None => json!({ "input": raw, "error": "invalid host" }),
                        })
                        .collect();
                    println!("{}", serde_json::to_string_pretty(&json!({ "hosts": rows }))?);
                }
                OutputFormat::Text => {
                    println!("{:<35} {:<10} {:<25} {}", "HOST", "KIND", "TENANT ID", "NAME");
                    println!("{}", "-".repeat(90));

                    for (raw, host, result) in &results {
                        let host = host.as_deref().unwrap_or(*raw);
                        match result {
                            Some(Ok(TenantResolution::Tenant(t))) => {
                                println!("{:<35} {:<10} {:<25} {}", host, "tenant", t.id, t.name)
                            }
                            Some(Ok(TenantResolution::Platform)) => println!("{:<35} {:<10}", host, "platform"),
                            Some(Ok(TenantResolution::Unknown)) => println!("{:<35} {:<10}", host, "unknown"),
                            Some(Err(e)) => println!("{:<35} {:<10} {}", host, "error", e),
                            None => println!("{:<35} {:<10} invalid host", host, "error"),
                        }
                    }
                }
            }

            if results.iter().any(|(_, _, r)| !matches!(r, Some(Ok(_)))) {
                return Err(anyhow::anyhow!("one or more hosts could not be resolved"));
            }
            Ok(())
        }
    }
}
