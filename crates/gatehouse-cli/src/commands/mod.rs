//! CLI command definitions and dispatch.

pub mod migrate;
pub mod role;
pub mod seed;
pub mod user;

use std::sync::Arc;

use clap::{Parser, Subcommand};

use gatehouse_core::config::AppConfig;
use gatehouse_core::error::AppError;
use gatehouse_database::{DatabasePool, Repositories};
use gatehouse_service::{LogNotifier, RbacService};

use crate::output::OutputFormat;

/// Gatehouse: identity, onboarding, and role-based access control
#[derive(Debug, Parser)]
#[command(name = "gatehouse", version, about, long_about = None)]
pub struct Cli {
    /// Configuration environment (selects `config/{env}.toml`)
    #[arg(short, long, env = "GATEHOUSE_ENV", default_value = "development")]
    pub env: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Create the built-in permissions and the `admin` role
    Seed,
    /// User management
    User(user::UserArgs),
    /// Role management
    Role(role::RoleArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        let config = AppConfig::load(&self.env)?;
        match &self.command {
            Commands::Migrate => migrate::execute(&config).await,
            Commands::Seed => seed::execute(&config).await,
            Commands::User(args) => user::execute(args, &config, self.format).await,
            Commands::Role(args) => role::execute(args, &config, self.format).await,
        }
    }
}

/// Connect to the configured database and build the service facade.
///
/// Mail is never sent from the CLI.
pub async fn connect_service(config: &AppConfig) -> Result<RbacService, AppError> {
    let pool = DatabasePool::connect(&config.database).await?;
    RbacService::new(
        config,
        Repositories::postgres(pool.into_pool()),
        Arc::new(LogNotifier::new()),
    )
}
