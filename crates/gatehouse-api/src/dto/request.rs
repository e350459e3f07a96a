//! Request DTOs with validation.

use serde::{Deserialize, Serialize};
use validator::Validate;

use gatehouse_core::types::{PermissionId, RoleId};

/// Login request body.
#[derive(Clone, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    /// Login email.
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    /// Password.
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Token refresh request body.
#[derive(Clone, Serialize, Deserialize, Validate)]
pub struct RefreshRequest {
    /// Refresh token.
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh_token: String,
}

/// Registration body; the identity comes from the invitation bearer token.
#[derive(Clone, Serialize, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Given name.
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    /// Family name.
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    /// Chosen password; the policy itself is enforced by the service.
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Password change request.
#[derive(Clone, Serialize, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    /// Current password.
    #[validate(length(min = 1))]
    pub current_password: String,
    /// New password.
    #[validate(length(min = 1))]
    pub new_password: String,
}

/// Invitation request.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct InviteRequest {
    /// Invitee email.
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    /// Roles granted on registration.
    #[validate(length(min = 1, message = "At least one role is required"))]
    pub role_ids: Vec<RoleId>,
}

/// Role creation request.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateRoleRequest {
    /// Unique role name.
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// Initial permission grants.
    #[serde(default)]
    pub permission_ids: Vec<PermissionId>,
}

/// Role activation toggle.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SetRoleActiveRequest {
    /// New state.
    pub is_active: bool,
}

/// Assign a role to a user.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AssignRoleRequest {
    /// Role to assign.
    pub role_id: RoleId,
}

/// Grant a permission to a role.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GrantPermissionRequest {
    /// Permission to grant.
    pub permission_id: PermissionId,
}

/// Permission creation request.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreatePermissionRequest {
    /// Resource part of `resource.action`.
    #[validate(length(min = 1, max = 50))]
    pub resource: String,
    /// Action part of `resource.action`.
    #[validate(length(min = 1, max = 50))]
    pub action: String,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
}

/// Optional name or email substring filter for list endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterQuery {
    /// Case-insensitive substring.
    #[serde(default)]
    pub filter: Option<String>,
}

impl FilterQuery {
    /// The filter, if non-blank.
    pub fn as_deref(&self) -> Option<&str> {
        self.filter.as_deref().map(str::trim).filter(|f| !f.is_empty())
    }
}
