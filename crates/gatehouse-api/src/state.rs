//! Application state shared across all handlers and extractors.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use gatehouse_core::config::AppConfig;
use gatehouse_service::{OpContext, RbacService};

/// Passed to every Axum handler via `State<AppState>`.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// The service facade.
    pub rbac: Arc<RbacService>,
    /// Fired on shutdown; in-flight operations observe a child token.
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Creates the state.
    pub fn new(config: Arc<AppConfig>, rbac: Arc<RbacService>, shutdown: CancellationToken) -> Self {
        Self {
            config,
            rbac,
            shutdown,
        }
    }

    /// A fresh operation context bounded by the request timeout and shutdown.
    ///
    /// A timeout of zero means no deadline.
    pub fn op_context(&self) -> OpContext {
        let ctx = OpContext::new().with_cancellation(self.shutdown.child_token());
        match self.config.server.request_timeout_seconds {
            0 => ctx,
            secs => ctx.with_timeout(Duration::from_secs(secs)),
        }
    }
}
