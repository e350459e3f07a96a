//! Claim sets carried by the three token kinds.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use gatehouse_core::types::{RoleId, SessionId, UserId};

/// The `token_type` tag. A token is only accepted where its kind is expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// Short-lived token presented on every request.
    Access,
    /// Longer-lived token exchanged for a new access token.
    Refresh,
    /// Token mailed to an invitee, redeemed at registration.
    EmailInvitation,
}

impl TokenKind {
    /// The tag as it appears in the claim set.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
            Self::EmailInvitation => "email_invitation",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Claims of access and refresh tokens, bound to one login session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// The user the token was issued to.
    pub id: UserId,
    /// The session identifier; shared by the access and refresh token of one login.
    pub jti: SessionId,
    /// Issued-at, seconds since epoch.
    pub iat: i64,
    /// Expiry, seconds since epoch.
    pub exp: i64,
    /// Access or refresh.
    pub token_type: TokenKind,
}

impl SessionClaims {
    /// Expiry as a timestamp.
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

/// Claims of an email-invitation token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvitationClaims {
    /// The invited address.
    pub email: String,
    /// Roles offered by the invitation.
    pub role_ids: Vec<RoleId>,
    /// Issued-at, seconds since epoch.
    pub iat: i64,
    /// Expiry, seconds since epoch.
    pub exp: i64,
    /// Always `email_invitation`.
    pub token_type: TokenKind,
}

impl InvitationClaims {
    /// Expiry as a timestamp.
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

/// A signed compact token together with the claims it carries.
#[derive(Debug, Clone)]
pub struct SignedToken<C> {
    /// The compact JWT serialization.
    pub token: String,
    /// The claims that were signed.
    pub claims: C,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tags_match_wire_format() {
        let tags: Vec<String> = [
            TokenKind::Access,
            TokenKind::Refresh,
            TokenKind::EmailInvitation,
        ]
        .iter()
        .map(|k| serde_json::to_string(k).unwrap())
        .collect();
        assert_eq!(tags, ["\"access\"", "\"refresh\"", "\"email_invitation\""]);
        assert_eq!(TokenKind::EmailInvitation.to_string(), "email_invitation");
    }
}
