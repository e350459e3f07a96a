//! HS256 token signing.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde::Serialize;

use gatehouse_core::config::AuthConfig;
use gatehouse_core::error::AppError;
use gatehouse_core::result::AppResult;
use gatehouse_core::types::{RoleId, SessionId, UserId};

use super::claims::{InvitationClaims, SessionClaims, SignedToken, TokenKind};

/// Signs access, refresh, and invitation tokens with the shared secret.
#[derive(Clone)]
pub struct JwtEncoder {
    encoding_key: EncodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
    invitation_ttl: Duration,
}

impl std::fmt::Debug for JwtEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtEncoder")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .field("invitation_ttl", &self.invitation_ttl)
            .finish()
    }
}

impl JwtEncoder {
    /// Creates a new encoder from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            access_ttl: minutes(config.access_token_ttl_minutes),
            refresh_ttl: minutes(config.refresh_token_ttl_minutes),
            invitation_ttl: minutes(config.email_invitation_ttl_minutes),
        }
    }

    /// Access token lifetime.
    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    /// Refresh token lifetime.
    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    /// Invitation token lifetime.
    pub fn invitation_ttl(&self) -> Duration {
        self.invitation_ttl
    }

    /// Issue an access token for `(user_id, session_id)` as of `now`.
    pub fn issue_access(
        &self,
        user_id: UserId,
        session_id: SessionId,
        now: DateTime<Utc>,
    ) -> AppResult<SignedToken<SessionClaims>> {
        self.issue_session(user_id, session_id, TokenKind::Access, self.access_ttl, now)
    }

    /// Issue a refresh token for `(user_id, session_id)` as of `now`.
    pub fn issue_refresh(
        &self,
        user_id: UserId,
        session_id: SessionId,
        now: DateTime<Utc>,
    ) -> AppResult<SignedToken<SessionClaims>> {
        self.issue_session(user_id, session_id, TokenKind::Refresh, self.refresh_ttl, now)
    }

    /// Issue an invitation token for `email` offering `role_ids`.
    pub fn issue_invitation(
        &self,
        email: &str,
        role_ids: &[RoleId],
        now: DateTime<Utc>,
    ) -> AppResult<SignedToken<InvitationClaims>> {
        let claims = InvitationClaims {
            email: email.to_string(),
            role_ids: role_ids.to_vec(),
            iat: now.timestamp(),
            exp: (now + self.invitation_ttl).timestamp(),
            token_type: TokenKind::EmailInvitation,
        };
        self.sign(claims)
    }

    fn issue_session(
        &self,
        user_id: UserId,
        session_id: SessionId,
        kind: TokenKind,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> AppResult<SignedToken<SessionClaims>> {
        let claims = SessionClaims {
            id: user_id,
            jti: session_id,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            token_type: kind,
        };
        self.sign(claims)
    }

    fn sign<C: Serialize>(&self, claims: C) -> AppResult<SignedToken<C>> {
        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("Failed to sign token: {e}")))?;
        Ok(SignedToken { token, claims })
    }
}

/// Ten years; keeps `now + ttl` far from the timestamp range limits.
const MAX_TTL_MINUTES: u64 = 60 * 24 * 365 * 10;

fn minutes(value: u64) -> Duration {
    Duration::minutes(value.min(MAX_TTL_MINUTES) as i64)
}
