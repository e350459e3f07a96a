//! Gatehouse server: identity, onboarding, and role-based access control.
//!
//! Main entry point that wires the crates together and starts the HTTP server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, fmt};

use gatehouse_api::{AppState, build_app};
use gatehouse_core::config::AppConfig;
use gatehouse_core::error::AppError;
use gatehouse_database::connection::mask_password;
use gatehouse_database::{DatabasePool, MemoryStore, Repositories};
use gatehouse_service::{LogNotifier, Notifier, RbacService, SmtpNotifier};

#[tokio::main]
async fn main() {
    let env = std::env::var("GATEHOUSE_ENV").unwrap_or_else(|_| "development".to_string());
    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    let in_memory = std::env::args().skip(1).any(|a| a == "--memory");
    if let Err(e) = run(config, in_memory).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

async fn run(config: AppConfig, in_memory: bool) -> Result<(), AppError> {
    tracing::info!(
        environment = %config.environment,
        "Starting Gatehouse v{}",
        env!("CARGO_PKG_VERSION")
    );
    if config.auth.uses_default_secret() {
        tracing::warn!("Using the built-in development JWT secret");
    }

    // ── Storage ──────────────────────────────────────────────────
    let repos = if in_memory {
        tracing::warn!("Running with the in-memory store; all data is lost on exit");
        Repositories::memory(MemoryStore::new())
    } else {
        tracing::info!(url = %mask_password(&config.database.url), "Connecting to database...");
        let pool = DatabasePool::connect(&config.database).await?;

        tracing::info!("Running database migrations...");
        gatehouse_database::migration::run_migrations(pool.pool()).await?;
        tracing::info!("Database migrations complete");
        Repositories::postgres(pool.into_pool())
    };

    // ── Notifications ────────────────────────────────────────────
    let notifier: Arc<dyn Notifier> = if config.mail.enabled {
        tracing::info!(host = %config.mail.host, port = config.mail.port, "SMTP delivery enabled");
        Arc::new(SmtpNotifier::new(&config.mail)?)
    } else {
        tracing::info!("Mail disabled; notifications are logged only");
        Arc::new(LogNotifier::new())
    };

    let rbac = RbacService::new(&config, repos, notifier)?;
    let shutdown = CancellationToken::new();

    // ── Session sweep ────────────────────────────────────────────
    let cleanup_handle = match config.session.cleanup_interval_minutes {
        0 => {
            tracing::info!("Session cleanup disabled");
            None
        }
        minutes => Some(
            rbac.session_cleanup()
                .spawn(Duration::from_secs(minutes * 60), shutdown.clone()),
        ),
    };

    // ── HTTP server ──────────────────────────────────────────────
    let state = AppState::new(Arc::new(config.clone()), Arc::new(rbac), shutdown.clone());
    let app = build_app(state);

    let addr = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;

    tracing::info!("Gatehouse listening on {}", addr);

    let server_shutdown = shutdown.clone();
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received, starting graceful shutdown...");
        server_shutdown.cancel();
    })
    .await
    .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

    shutdown.cancel();
    if let Some(handle) = cleanup_handle {
        let _ = tokio::time::timeout(Duration::from_secs(10), handle).await;
    }

    tracing::info!("Gatehouse shut down gracefully");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
