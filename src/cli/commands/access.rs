use clap::Subcommand;
use serde_json::json;

use crate::auth::{Role, RoleSet};
use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::gate::{RouteAccess, RouteTable};

#[derive(Subcommand)]
pub enum AccessCommands {
    #[command(about = "Check whether a set of roles may open a console path")]
    Check {
        #[arg(help = "Console path, e.g. /coach/roster")]
        path: String,
        #[arg(long, value_delimiter = ',', help = "Comma-separated roles (aliases accepted)")]
        roles: Vec<String>,
    },
}

pub fn handle(cmd: AccessCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        AccessCommands::Check { path, roles } => {
            let mut set = RoleSet::new();
            for name in &roles {
                match Role::normalize(name) {
                    Some(role) => set.insert(role),
                    None => return Err(anyhow::anyhow!("Unknown role '{}'", name)),
                }
            }

            let table = RouteTable::console_default();
            let access = table.access_for(&path);
            let allowed = access.allows(&set);
            let requirement = match access {
                RouteAccess::Public => "public".to_string(),
                RouteAccess::Authenticated => "any signed-in user".to_string(),
                RouteAccess::Roles(required) => required.iter().map(|r| r.as_str()).collect::<Vec<_>>().join(" | "),
            };

            output_details(
                &output_format,
                &[
                    ("Path", path.clone()),
                    ("Requires", requirement.clone()),
                    ("Allowed", allowed.to_string()),
                    ("Home", set.home_path().to_string()),
                ],
                json!({
                    "path": path,
                    "requires": requirement,
                    "allowed": allowed,
                    "home": set.home_path(),
                }),
            )
        }
    }
}
