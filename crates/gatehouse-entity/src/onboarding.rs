//! Onboarding (invitation) entity.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;
use uuid::Uuid;

use gatehouse_core::types::{RoleId, UserId};

/// Persisted onboarding state. Expiry is derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "onboarding_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OnboardingStatus {
    /// Invitation sent, account not yet created.
    Invited,
    /// Account created; terminal.
    Completed,
}

impl OnboardingStatus {
    /// Return the status as stored.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Invited => "INVITED",
            Self::Completed => "COMPLETED",
        }
    }
}

impl fmt::Display for OnboardingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An invitation record, one per email.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OnboardingProcess {
    /// Record identifier.
    pub id: Uuid,
    /// Invitee email (normalized).
    pub email: String,
    /// Roles the invitee receives on registration.
    pub role_ids: Json<Vec<RoleId>>,
    /// Workflow state.
    pub status: OnboardingStatus,
    /// Set together with `status = COMPLETED`.
    pub completed: bool,
    /// The inviting user; recorded as grantor of the role edges.
    pub created_by: UserId,
    /// Invitation expiry.
    pub expired_at: DateTime<Utc>,
    /// When the record was created or last re-issued.
    pub created_at: DateTime<Utc>,
    /// When the record was last updated.
    pub updated_at: DateTime<Utc>,
}

impl OnboardingProcess {
    /// Whether the invitation has lapsed at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expired_at <= now
    }

    /// An invitation that still blocks a re-invite and still admits registration.
    pub fn is_pending_at(&self, now: DateTime<Utc>) -> bool {
        !self.completed && self.status == OnboardingStatus::Invited && !self.is_expired_at(now)
    }

    /// Role ids as a plain slice.
    pub fn roles(&self) -> &[RoleId] {
        &self.role_ids.0
    }
}

/// Data required to create or re-issue an invitation.
#[derive(Debug, Clone)]
pub struct NewOnboarding {
    /// Invitee email (normalized).
    pub email: String,
    /// Roles to grant on registration.
    pub role_ids: Vec<RoleId>,
    /// The inviting user.
    pub created_by: UserId,
    /// Invitation expiry.
    pub expired_at: DateTime<Utc>,
}
