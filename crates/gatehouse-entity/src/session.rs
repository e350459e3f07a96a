//! Session entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use gatehouse_core::types::{SessionId, UserId};

/// A recorded login.
///
/// Sessions are created on login and deactivated on logout. The refresh
/// flow moves `expires_at` forward; nothing else mutates a row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Session {
    /// Row identifier.
    pub id: i64,
    /// The user this session belongs to.
    pub user_id: UserId,
    /// Session identifier embedded in tokens.
    pub jti: SessionId,
    /// Client IP address, when known.
    pub ip_address: Option<String>,
    /// User-Agent header value.
    pub user_agent: Option<String>,
    /// Cleared on logout.
    pub is_active: bool,
    /// Expiry of the most recent access token issued for the session.
    pub expires_at: DateTime<Utc>,
    /// Last login or refresh.
    pub last_activity: DateTime<Utc>,
    /// When the session was created (login time).
    pub created_at: DateTime<Utc>,
    /// When the session was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Active and not past its expiry.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.expires_at > now
    }
}

/// Data required to record a login.
#[derive(Debug, Clone)]
pub struct NewSession {
    /// The authenticated user.
    pub user_id: UserId,
    /// Fresh session identifier.
    pub jti: SessionId,
    /// Client IP address.
    pub ip_address: Option<String>,
    /// Client User-Agent.
    pub user_agent: Option<String>,
    /// Expiry of the access token issued at login.
    pub expires_at: DateTime<Utc>,
}
