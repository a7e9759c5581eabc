pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "console")]
#[command(about = "Tenant console operator CLI - inspect tenant resolution and access rules")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[arg(long, global = true, env = "BACKEND_API_URL", help = "Backend API base URL")]
    pub backend: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Check backend API health")]
    Health,

    #[command(about = "Tenant domain resolution")]
    Tenant {
        #[command(subcommand)]
        cmd: commands::tenant::TenantCommands,
    },

    #[command(about = "Load the profile behind an access token and show its roles")]
    Whoami {
        #[arg(long, help = "Backend access token")]
        token: String,
        #[arg(long, help = "Tenant ID to scope the profile request")]
        tenant: Option<String>,
    },

    #[command(about = "Route access rules")]
    Access {
        #[command(subcommand)]
        cmd: commands::access::AccessCommands,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    let mut config = crate::config::config().clone();
    if let Some(url) = cli.backend {
        config.backend.api_url = url;
    }

    match cli.command {
        Commands::Health => commands::health::handle(&config, output_format).await,
        Commands::Tenant { cmd } => commands::tenant::handle(cmd, &config, output_format).await,
        Commands::Whoami { token, tenant } => {
            commands::whoami::handle(&config, &token, tenant, output_format).await
        }
        Commands::Access { cmd } => commands::access::handle(cmd, output_format),
    }
}
