//! Unified application error types for Gatehouse.
//!
//! All crates map their internal errors into [`AppError`] for consistent
//! propagation through the ? operator. The [`ErrorKind`] keeps the domain
//! failure cases distinct for logging even where the HTTP boundary later
//! collapses several of them into one response.

use std::fmt;
use thiserror::Error;

/// Error kind categorization used across the entire application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// No active principal owns the supplied email.
    PrincipalNotFound,
    /// The supplied password did not verify against the stored hash.
    InvalidCredential,
    /// The token's `exp` claim is in the past.
    TokenExpired,
    /// The token is well-formed and signed but of a different kind.
    TokenKindMismatch,
    /// The token is malformed or its signature does not verify.
    TokenSignatureInvalid,
    /// The session referenced by a token is missing, inactive, or expired.
    SessionRevoked,
    /// No authenticated principal is attached to the request.
    Unauthenticated,
    /// The principal lacks the permissions an operation requires.
    Unauthorized,
    /// An active principal already owns the email.
    AlreadyRegistered,
    /// A live invitation already exists for the email.
    AlreadyInvited,
    /// No pending, unexpired invitation exists for the email.
    InvitationNotFound,
    /// A role named by an invitation is inactive or missing.
    RoleNotActive,
    /// The old password supplied to a reset did not verify.
    PasswordMismatch,
    /// The requested resource was not found.
    NotFound,
    /// Input validation failed.
    Validation,
    /// A uniqueness or state conflict occurred.
    Conflict,
    /// A repository or transport failure.
    Storage,
    /// A configuration error occurred.
    Configuration,
    /// A serialization/deserialization error occurred.
    Serialization,
    /// An outbound collaborator (mail, identity provider) failed.
    ExternalService,
    /// The caller cancelled the operation or its deadline elapsed.
    Cancelled,
    /// An internal error occurred.
    Internal,
}

impl ErrorKind {
    /// Whether this kind is a credential or token failure.
    ///
    /// All of these surface to HTTP callers as the same undifferentiated
    /// "authentication failed" response.
    pub fn is_authentication_failure(&self) -> bool {
        matches!(
            self,
            Self::PrincipalNotFound
                | Self::InvalidCredential
                | Self::TokenExpired
                | Self::TokenKindMismatch
                | Self::TokenSignatureInvalid
                | Self::SessionRevoked
                | Self::Unauthenticated
        )
    }

    /// Return the kind as a stable upper-case code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PrincipalNotFound => "PRINCIPAL_NOT_FOUND",
            Self::InvalidCredential => "INVALID_CREDENTIAL",
            Self::TokenExpired => "TOKEN_EXPIRED",
            Self::TokenKindMismatch => "TOKEN_KIND_MISMATCH",
            Self::TokenSignatureInvalid => "TOKEN_SIGNATURE_INVALID",
            Self::SessionRevoked => "SESSION_REVOKED",
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::AlreadyRegistered => "ALREADY_REGISTERED",
            Self::AlreadyInvited => "ALREADY_INVITED",
            Self::InvitationNotFound => "INVITATION_NOT_FOUND",
            Self::RoleNotActive => "ROLE_NOT_ACTIVE",
            Self::PasswordMismatch => "PASSWORD_MISMATCH",
            Self::NotFound => "NOT_FOUND",
            Self::Validation => "VALIDATION",
            Self::Conflict => "CONFLICT",
            Self::Storage => "STORAGE",
            Self::Configuration => "CONFIGURATION",
            Self::Serialization => "SERIALIZATION",
            Self::ExternalService => "EXTERNAL_SERVICE",
            Self::Cancelled => "CANCELLED",
            Self::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The unified application error used throughout Gatehouse.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message. Never carries credentials or tokens.
    pub message: String,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new application error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Create a new application error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Returns `true` if the error is of the given kind.
    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }

    pub fn principal_not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PrincipalNotFound, message)
    }

    pub fn invalid_credential(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidCredential, message)
    }

    pub fn token_expired(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TokenExpired, message)
    }

    pub fn token_kind_mismatch(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TokenKindMismatch, message)
    }

    pub fn token_signature_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TokenSignatureInvalid, message)
    }

    pub fn session_revoked(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SessionRevoked, message)
    }

    /// Create an unauthenticated error (no verified principal).
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthenticated, message)
    }

    /// Create an unauthorized error (principal lacks permission).
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    pub fn already_registered(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AlreadyRegistered, message)
    }

    pub fn already_invited(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AlreadyInvited, message)
    }

    pub fn invitation_not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvitationNotFound, message)
    }

    pub fn role_not_active(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RoleNotActive, message)
    }

    pub fn password_mismatch(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PasswordMismatch, message)
    }

    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Create a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    /// Create a storage error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Storage, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create an external-service error.
    pub fn external_service(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ExternalService, message)
    }

    /// Create a cancellation error.
    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Cancelled, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}

#[cfg(feature = "sqlx")]
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        Self::with_source(ErrorKind::Storage, "Database operation failed", err)
    }
}
