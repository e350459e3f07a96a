//! SMTP delivery through lettre.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde_json::{Map, Value};
use tracing::{error, info};

use gatehouse_core::config::MailConfig;
use gatehouse_core::error::{AppError, ErrorKind};
use gatehouse_core::result::AppResult;

use super::Notifier;
use super::template::render;

/// Sends rendered templates over a STARTTLS SMTP relay.
#[derive(Clone)]
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl std::fmt::Debug for SmtpNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpNotifier")
            .field("from", &self.from.to_string())
            .finish_non_exhaustive()
    }
}

impl SmtpNotifier {
    /// Build the transport from mail configuration.
    pub fn new(config: &MailConfig) -> AppResult<Self> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Configuration,
                    format!("Failed to create SMTP relay for {}", config.host),
                    e,
                )
            })?
            .port(config.port);

        if !config.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ));
        }

        let from = format!("{} <{}>", config.from_name, config.from_email)
            .parse::<Mailbox>()
            .map_err(|e| AppError::configuration(format!("Invalid sender address: {e}")))?;

        info!(host = %config.host, port = config.port, "SMTP notifier initialized");

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, to: &str, template: &str, data: Map<String, Value>) -> AppResult<()> {
        let mail = render(template, &data)?;

        let recipient = to
            .parse::<Mailbox>()
            .map_err(|e| AppError::external_service(format!("Invalid recipient: {e}")))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(recipient)
            .subject(mail.subject)
            .header(ContentType::TEXT_HTML)
            .body(mail.body)
            .map_err(|e| AppError::external_service(format!("Failed to build message: {e}")))?;

        match self.transport.send(message).await {
            Ok(_) => {
                info!(to = %to, template = %template, "Email sent");
                Ok(())
            }
            Err(e) => {
                error!(to = %to, template = %template, error = %e, "Failed to send email");
                Err(AppError::with_source(
                    ErrorKind::ExternalService,
                    "Failed to send email",
                    e,
                ))
            }
        }
    }
}
