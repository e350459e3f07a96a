//! The verified caller of an operation.

use serde::{Deserialize, Serialize};

use gatehouse_core::types::{SessionId, UserId};

/// A principal whose access token and session have both been verified.
///
/// Built by the request extractor and passed explicitly to every operation
/// that needs to know who is calling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedPrincipal {
    /// The calling user.
    pub user_id: UserId,
    /// The session the access token belongs to.
    pub session_id: SessionId,
}

impl AuthenticatedPrincipal {
    /// Create a principal from verified ids.
    pub fn new(user_id: UserId, session_id: SessionId) -> Self {
        Self {
            user_id,
            session_id,
        }
    }
}
