//! Role entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use gatehouse_core::types::{RoleId, UserId};

use crate::permission::Permission;

/// A named bundle of permissions.
///
/// Roles are never deleted; deactivating one removes its permissions
/// from every holder without touching the assignment edges.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Role {
    /// Unique role identifier.
    pub id: RoleId,
    /// Unique role name.
    pub name: String,
    /// Free-form description.
    pub description: Option<String>,
    /// Soft on/off switch.
    pub is_active: bool,
    /// The user who created the role, if any.
    pub created_by: Option<UserId>,
    /// When the role was created.
    pub created_at: DateTime<Utc>,
    /// When the role was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Data required to insert a role.
#[derive(Debug, Clone)]
pub struct NewRole {
    /// Unique role name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Creating user.
    pub created_by: Option<UserId>,
}

/// A role with the permissions granted to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleWithPermissions {
    /// The role.
    #[serde(flatten)]
    pub role: Role,
    /// Permissions granted to the role.
    pub permissions: Vec<Permission>,
}
