//! In-memory notifier for tests and local runs.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::{Map, Value};

use gatehouse_core::error::AppError;
use gatehouse_core::result::AppResult;

use super::Notifier;

/// One captured `send` call.
#[derive(Debug, Clone)]
pub struct SentNotification {
    /// Recipient.
    pub to: String,
    /// Template name.
    pub template: String,
    /// Template data.
    pub data: Map<String, Value>,
}

/// Keeps every notification in memory. Can be switched to fail delivery.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<SentNotification>>>,
    fail: bool,
}

impl RecordingNotifier {
    /// A notifier that accepts everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// A notifier whose every delivery fails with `ExternalService`.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn entries(&self) -> MutexGuard<'_, Vec<SentNotification>> {
        self.sent.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Every successful send, oldest first.
    pub fn sent(&self) -> Vec<SentNotification> {
        self.entries().clone()
    }

    /// The most recent notification sent to `to`.
    pub fn last_to(&self, to: &str) -> Option<SentNotification> {
        self.entries().iter().rev().find(|n| n.to == to).cloned()
    }

    /// The `token` field of the latest invitation sent to `to`.
    pub fn invitation_token(&self, to: &str) -> Option<String> {
        self.entries()
            .iter()
            .rev()
            .filter(|n| n.to == to && n.template == super::USER_INVITATION)
            .find_map(|n| n.data.get("token").and_then(Value::as_str).map(str::to_string))
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, to: &str, template: &str, data: Map<String, Value>) -> AppResult<()> {
        if self.fail {
            return Err(AppError::external_service("Mail relay unavailable"));
        }
        self.entries().push(SentNotification {
            to: to.to_string(),
            template: template.to_string(),
            data,
        });
        Ok(())
    }
}
