//! Outbound notifications.
//!
//! A [`Notifier`] receives a recipient, a template name, and the template
//! data. [`SmtpNotifier`] renders and mails it, [`LogNotifier`] only logs
//! that it happened, and [`RecordingNotifier`] keeps every call in memory.

mod log;
mod recording;
mod smtp;
pub mod template;

use async_trait::async_trait;
use serde_json::{Map, Value};

use gatehouse_core::result::AppResult;

pub use self::log::LogNotifier;
pub use self::recording::{RecordingNotifier, SentNotification};
pub use self::smtp::SmtpNotifier;

/// Template sent to a new invitee.
pub const USER_INVITATION: &str = "user_invitation";
/// Template sent after a password change.
pub const PASSWORD_CHANGED: &str = "password_changed";

/// Delivers templated messages.
#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    /// Send `template` to `to`, filled from `data`.
    ///
    /// Fails with `ExternalService` when delivery fails.
    async fn send(&self, to: &str, template: &str, data: Map<String, Value>) -> AppResult<()>;
}
