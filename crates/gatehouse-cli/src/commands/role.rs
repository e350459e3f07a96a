//! Role listing.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use gatehouse_core::config::AppConfig;
use gatehouse_core::error::AppError;
use gatehouse_service::OpContext;

use crate::output::{self, OutputFormat};

/// Arguments for role commands
#[derive(Debug, Args)]
pub struct RoleArgs {
    /// Role subcommand
    #[command(subcommand)]
    pub command: RoleCommand,
}

/// Role subcommands
#[derive(Debug, Subcommand)]
pub enum RoleCommand {
    /// List roles and the permissions they grant
    List {
        /// Case-insensitive name substring
        #[arg(short, long)]
        filter: Option<String>,
    },
}

#[derive(Debug, Serialize, Tabled)]
struct RoleRow {
    id: String,
    name: String,
    active: String,
    permissions: String,
}

/// Execute role commands
pub async fn execute(
    args: &RoleArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let service = super::connect_service(config).await?;
    let ctx = OpContext::new();

    match &args.command {
        RoleCommand::List { filter } => {
            let roles = service
                .roles_with_permissions(&ctx, filter.as_deref())
                .await?;
            let rows: Vec<RoleRow> = roles
                .iter()
                .map(|r| RoleRow {
                    id: r.role.id.to_string(),
                    name: r.role.name.clone(),
                    active: if r.role.is_active { "yes" } else { "no" }.to_string(),
                    permissions: r
                        .permissions
                        .iter()
                        .map(|p| p.name.as_str())
                        .collect::<Vec<_>>()
                        .join(", "),
                })
                .collect();
            output::print_list(&rows, format);
        }
    }
    Ok(())
}
