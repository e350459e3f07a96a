//! Permission entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use gatehouse_core::types::{PermissionId, UserId};

/// A named capability. The name is always `"{resource}.{action}"`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Permission {
    /// Unique permission identifier.
    pub id: PermissionId,
    /// Unique dotted name, e.g. `user.create`.
    pub name: String,
    /// Resource part of the name.
    pub resource: String,
    /// Action part of the name.
    pub action: String,
    /// Free-form description.
    pub description: Option<String>,
    /// Inactive permissions never resolve for any principal.
    pub is_active: bool,
    /// The user who created the permission, if any.
    pub created_by: Option<UserId>,
    /// When the permission was created.
    pub created_at: DateTime<Utc>,
    /// When the permission was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Data required to insert a permission.
#[derive(Debug, Clone)]
pub struct NewPermission {
    /// Resource part, e.g. `user`.
    pub resource: String,
    /// Action part, e.g. `create`.
    pub action: String,
    /// Optional description.
    pub description: Option<String>,
    /// Creating user.
    pub created_by: Option<UserId>,
}

impl NewPermission {
    /// The dotted name this permission will be stored under.
    pub fn name(&self) -> String {
        format!("{}.{}", self.resource, self.action)
    }
}
