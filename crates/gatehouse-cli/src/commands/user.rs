//! User management CLI commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use gatehouse_core::config::AppConfig;
use gatehouse_core::error::AppError;
use gatehouse_core::types::RoleId;
use gatehouse_service::OpContext;

use crate::output::{self, OutputFormat};

/// Arguments for user commands
#[derive(Debug, Args)]
pub struct UserArgs {
    /// User subcommand
    #[command(subcommand)]
    pub command: UserCommand,
}

/// User subcommands
#[derive(Debug, Subcommand)]
pub enum UserCommand {
    /// Create a user directly, bypassing the invitation flow
    Add {
        /// Login email
        #[arg(short, long)]
        email: String,
        /// Password (will prompt if not provided)
        #[arg(short, long)]
        password: Option<String>,
        /// Given name
        #[arg(long)]
        first_name: String,
        /// Family name
        #[arg(long)]
        last_name: String,
        /// Role name to assign; repeat for several
        #[arg(short, long = "role", required = true)]
        roles: Vec<String>,
    },
    /// List users with their roles
    List {
        /// Case-insensitive email substring
        #[arg(short, long)]
        filter: Option<String>,
    },
}

#[derive(Debug, Serialize, Tabled)]
struct UserRow {
    id: String,
    email: String,
    name: String,
    roles: String,
    active: String,
    created_at: String,
}

/// Execute user commands
pub async fn execute(
    args: &UserArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let service = super::connect_service(config).await?;
    let ctx = OpContext::new();

    match &args.command {
        UserCommand::Add {
            email,
            password,
            first_name,
            last_name,
            roles,
        } => {
            let known = service.roles_with_permissions(&ctx, None).await?;
            let mut role_ids: Vec<RoleId> = Vec::with_capacity(roles.len());
            for name in roles {
                let role = known
                    .iter()
                    .find(|r| r.role.name.eq_ignore_ascii_case(name))
                    .ok_or_else(|| AppError::not_found(format!("Role '{name}' does not exist")))?;
                role_ids.push(role.role.id);
            }

            let password = match password {
                Some(p) => p.clone(),
                None => dialoguer::Password::new()
                    .with_prompt("Password")
                    .with_confirmation("Confirm password", "Passwords do not match")
                    .interact()
                    .map_err(|e| AppError::internal(format!("Input error: {e}")))?,
            };

            let user = service
                .create_user(
                    &ctx, None, email, &password, first_name, last_name, &role_ids,
                )
                .await?;
            output::print_success(&format!("Created user {} (id {})", user.email, user.id));
        }
        UserCommand::List { filter } => {
            let users = service.list_users(&ctx, filter.as_deref()).await?;
            let rows: Vec<UserRow> = users
                .iter()
                .map(|u| UserRow {
                    id: u.user.id.to_string(),
                    email: u.user.email.clone(),
                    name: u.user.full_name(),
                    roles: u
                        .roles
                        .iter()
                        .map(|r| r.name.as_str())
                        .collect::<Vec<_>>()
                        .join(", "),
                    active: if u.user.is_active { "yes" } else { "no" }.to_string(),
                    created_at: u.user.created_at.format("%Y-%m-%d %H:%M").to_string(),
                })
                .collect();
            output::print_list(&rows, format);
        }
    }
    Ok(())
}
