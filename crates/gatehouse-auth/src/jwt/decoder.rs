//! Token verification.
//!
//! Checks run in a fixed order: signature (which also rejects malformed
//! input), then expiry, then the `token_type` tag. Each failure has its
//! own error kind so callers and logs can tell them apart; the HTTP layer
//! collapses all of them into one 401.

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use gatehouse_core::config::AuthConfig;
use gatehouse_core::error::AppError;
use gatehouse_core::result::AppResult;

use super::claims::{InvitationClaims, SessionClaims, TokenKind};

/// Verifies tokens signed by [`super::JwtEncoder`].
#[derive(Clone)]
pub struct JwtDecoder {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for JwtDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtDecoder")
            .field("algorithms", &self.validation.algorithms)
            .finish()
    }
}

impl JwtDecoder {
    /// Creates a new decoder from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        // Expiry is checked by hand after the signature so the order of
        // failures is deterministic.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.required_spec_claims.clear();

        Self {
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
        }
    }

    /// Verify an access or refresh token of the `expected` kind.
    pub fn verify_session(&self, token: &str, expected: TokenKind) -> AppResult<SessionClaims> {
        self.verify_session_at(token, expected, Utc::now())
    }

    /// [`Self::verify_session`] against an explicit clock.
    pub fn verify_session_at(
        &self,
        token: &str,
        expected: TokenKind,
        now: DateTime<Utc>,
    ) -> AppResult<SessionClaims> {
        self.verify(token, expected, now)
    }

    /// Verify an email-invitation token.
    pub fn verify_invitation(&self, token: &str) -> AppResult<InvitationClaims> {
        self.verify_invitation_at(token, Utc::now())
    }

    /// [`Self::verify_invitation`] against an explicit clock.
    pub fn verify_invitation_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> AppResult<InvitationClaims> {
        self.verify(token, TokenKind::EmailInvitation, now)
    }

    fn verify<C: DeserializeOwned>(
        &self,
        token: &str,
        expected: TokenKind,
        now: DateTime<Utc>,
    ) -> AppResult<C> {
        let data = decode::<Value>(token, &self.decoding_key, &self.validation)
            .map_err(|e| AppError::token_signature_invalid(format!("Token rejected: {e}")))?;
        let claims = data.claims;

        let exp = claims
            .get("exp")
            .and_then(Value::as_i64)
            .ok_or_else(|| AppError::token_signature_invalid("Token has no expiry"))?;
        if now.timestamp() >= exp {
            return Err(AppError::token_expired("Token has expired"));
        }

        let kind = claims.get("token_type").and_then(Value::as_str);
        if kind != Some(expected.as_str()) {
            return Err(AppError::token_kind_mismatch(format!(
                "Expected a {expected} token"
            )));
        }

        serde_json::from_value(claims)
            .map_err(|e| AppError::token_signature_invalid(format!("Malformed claims: {e}")))
    }
}
