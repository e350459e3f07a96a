//! Periodic purge of expired and deactivated sessions.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use gatehouse_core::config::SessionConfig;
use gatehouse_core::result::AppResult;
use gatehouse_database::SessionRepo;

/// Deletes session rows that have been dead for longer than the grace period.
#[derive(Clone)]
pub struct SessionCleanup {
    sessions: Arc<dyn SessionRepo>,
    grace: chrono::Duration,
}

impl std::fmt::Debug for SessionCleanup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCleanup")
            .field("grace", &self.grace)
            .finish()
    }
}

impl SessionCleanup {
    /// Creates a cleanup handler using the configured grace period.
    pub fn new(sessions: Arc<dyn SessionRepo>, config: &SessionConfig) -> Self {
        Self {
            sessions,
            grace: chrono::Duration::minutes(config.purge_grace_minutes.min(i32::MAX as u64) as i64),
        }
    }

    /// Runs one sweep as of `now`. Returns the number of rows removed.
    pub async fn run_cleanup(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let cutoff = now - self.grace;
        let purged = self.sessions.purge_expired(cutoff).await?;
        if purged > 0 {
            info!(purged, cutoff = %cutoff, "Session cleanup completed");
        }
        Ok(purged)
    }

    /// Run the sweep every `interval` until `cancel` fires.
    pub fn spawn(self, interval: Duration, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        info!("Session cleanup stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        if let Err(e) = self.run_cleanup(Utc::now()).await {
                            error!(error = %e, "Session cleanup failed");
                        }
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use gatehouse_core::types::{SessionId, UserId};
    use gatehouse_database::MemoryStore;
    use gatehouse_entity::NewSession;

    use super::*;

    async fn add_session(store: &MemoryStore, user: i64, expires_at: DateTime<Utc>) {
        store
            .insert(NewSession {
                user_id: UserId(user),
                jti: SessionId::new(),
                ip_address: None,
                user_agent: None,
                expires_at,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_refreshable_sessions_survive() {
        let store = MemoryStore::new();
        let now = Utc::now();
        // Access expired an hour ago; still inside the refresh window.
        add_session(&store, 1, now - chrono::Duration::hours(1)).await;
        // Dead for two days.
        add_session(&store, 2, now - chrono::Duration::days(2)).await;

        let cleanup = SessionCleanup::new(Arc::new(store.clone()), &SessionConfig::default());
        assert_eq!(cleanup.run_cleanup(now).await.unwrap(), 1);
        assert_eq!(store.session_count(UserId(1)).await, 1);
        assert_eq!(store.session_count(UserId(2)).await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_sweep_stops_on_cancel() {
        let store = MemoryStore::new();
        add_session(&store, 1, Utc::now() - chrono::Duration::days(5)).await;

        let cancel = CancellationToken::new();
        let handle = SessionCleanup::new(Arc::new(store.clone()), &SessionConfig::default())
            .spawn(Duration::from_secs(60), cancel.clone());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(store.session_count(UserId(1)).await, 0);

        cancel.cancel();
        handle.await.unwrap();
    }
}
