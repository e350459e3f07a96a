//! The token service: one place that owns both signing and verification.

use chrono::{DateTime, Duration, Utc};

use gatehouse_core::config::AuthConfig;
use gatehouse_core::result::AppResult;
use gatehouse_core::types::{RoleId, SessionId, UserId};

use super::claims::{InvitationClaims, SessionClaims, SignedToken, TokenKind};
use super::decoder::JwtDecoder;
use super::encoder::JwtEncoder;

/// Issues and verifies access, refresh, and invitation tokens.
#[derive(Debug, Clone)]
pub struct TokenService {
    encoder: JwtEncoder,
    decoder: JwtDecoder,
}

impl TokenService {
    /// Creates a token service from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoder: JwtEncoder::new(config),
            decoder: JwtDecoder::new(config),
        }
    }

    /// Access token lifetime.
    pub fn access_ttl(&self) -> Duration {
        self.encoder.access_ttl()
    }

    /// Refresh token lifetime.
    pub fn refresh_ttl(&self) -> Duration {
        self.encoder.refresh_ttl()
    }

    /// Invitation token lifetime.
    pub fn invitation_ttl(&self) -> Duration {
        self.encoder.invitation_ttl()
    }

    /// Issue an access token bound to `(user_id, session_id)`.
    pub fn issue_access(
        &self,
        user_id: UserId,
        session_id: SessionId,
        now: DateTime<Utc>,
    ) -> AppResult<SignedToken<SessionClaims>> {
        self.encoder.issue_access(user_id, session_id, now)
    }

    /// Issue a refresh token bound to `(user_id, session_id)`.
    pub fn issue_refresh(
        &self,
        user_id: UserId,
        session_id: SessionId,
        now: DateTime<Utc>,
    ) -> AppResult<SignedToken<SessionClaims>> {
        self.encoder.issue_refresh(user_id, session_id, now)
    }

    /// Issue an invitation token.
    pub fn issue_invitation(
        &self,
        email: &str,
        role_ids: &[RoleId],
        now: DateTime<Utc>,
    ) -> AppResult<SignedToken<InvitationClaims>> {
        self.encoder.issue_invitation(email, role_ids, now)
    }

    /// Verify a session token of the `expected` kind.
    pub fn verify_session(&self, token: &str, expected: TokenKind) -> AppResult<SessionClaims> {
        self.decoder.verify_session(token, expected)
    }

    /// Verify an invitation token.
    pub fn verify_invitation(&self, token: &str) -> AppResult<InvitationClaims> {
        self.decoder.verify_invitation(token)
    }

    /// Exchange a refresh token for a new access token carrying the same
    /// `(id, jti)`. The refresh token itself is not rotated.
    ///
    /// This checks the token only; the session manager layers the
    /// session-is-active check on top.
    pub fn refresh_access(&self, refresh_token: &str) -> AppResult<SignedToken<SessionClaims>> {
        let claims = self.verify_session(refresh_token, TokenKind::Refresh)?;
        self.issue_access(claims.id, claims.jti, Utc::now())
    }
}
