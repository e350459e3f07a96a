//! Outbound mail configuration.

use serde::{Deserialize, Serialize};

/// SMTP settings for the invitation notifier.
///
/// When `enabled` is false the server logs notifications instead of
/// sending them.
#[derive(Clone, Serialize, Deserialize)]
pub struct MailConfig {
    /// Whether SMTP delivery is enabled.
    #[serde(default)]
    pub enabled: bool,
    /// SMTP relay host.
    #[serde(default = "default_host")]
    pub host: String,
    /// SMTP relay port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// SMTP username.
    #[serde(default)]
    pub username: String,
    /// SMTP password.
    #[serde(default)]
    pub password: String,
    /// Sender address.
    #[serde(default = "default_from_email")]
    pub from_email: String,
    /// Sender display name.
    #[serde(default = "default_from_name")]
    pub from_name: String,
    /// Base URL the invitation link points at; the token is appended.
    #[serde(default = "default_invitation_base_url")]
    pub invitation_base_url: String,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: default_host(),
            port: default_port(),
            username: String::new(),
            password: String::new(),
            from_email: default_from_email(),
            from_name: default_from_name(),
            invitation_base_url: default_invitation_base_url(),
        }
    }
}

impl std::fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailConfig")
            .field("enabled", &self.enabled)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"****")
            .field("from_email", &self.from_email)
            .field("from_name", &self.from_name)
            .field("invitation_base_url", &self.invitation_base_url)
            .finish()
    }
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    587
}

fn default_from_email() -> String {
    "no-reply@localhost".to_string()
}

fn default_from_name() -> String {
    "Gatehouse".to_string()
}

fn default_invitation_base_url() -> String {
    "http://localhost:3000/register".to_string()
}
