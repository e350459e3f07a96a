//! Database migration command.

use gatehouse_core::config::AppConfig;
use gatehouse_core::error::AppError;
use gatehouse_database::DatabasePool;
use gatehouse_database::migration::run_migrations;

use crate::output;

/// Run all pending migrations.
pub async fn execute(config: &AppConfig) -> Result<(), AppError> {
    let pool = DatabasePool::connect(&config.database).await?;
    println!("Running database migrations...");
    run_migrations(pool.pool()).await?;
    output::print_success("All migrations applied.");
    pool.close().await;
    Ok(())
}
