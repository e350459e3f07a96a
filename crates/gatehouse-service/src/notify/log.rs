//! Notifier that only logs.

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::info;

use gatehouse_core::result::AppResult;

use super::Notifier;
use super::template::render;

/// Renders the template and logs the subject, without delivering anything.
///
/// Used when SMTP is disabled. Template data may hold token material, so
/// neither the data nor the body is logged.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl LogNotifier {
    /// Create a log-only notifier.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, to: &str, template: &str, data: Map<String, Value>) -> AppResult<()> {
        let mail = render(template, &data)?;
        info!(
            to = %to,
            template = %template,
            subject = %mail.subject,
            "Mail delivery disabled; notification logged only"
        );
        Ok(())
    }
}
