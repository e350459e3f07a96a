//! Canonical permission names, `resource.action`.

/// Create users and send invitations.
pub const USER_CREATE: &str = "user.create";
/// Update users.
pub const USER_UPDATE: &str = "user.update";
/// Delete users.
pub const USER_DELETE: &str = "user.delete";
/// List and view users.
pub const USER_VIEW: &str = "user.view";

/// Create roles.
pub const ROLE_CREATE: &str = "role.create";
/// Update roles, including activation.
pub const ROLE_UPDATE: &str = "role.update";
/// Delete roles.
pub const ROLE_DELETE: &str = "role.delete";
/// List and view roles.
pub const ROLE_VIEW: &str = "role.view";
/// Assign roles to users.
pub const ROLE_ASSIGN: &str = "role.assign";

/// List and view permissions.
pub const PERMISSION_VIEW: &str = "permission.view";
/// Create permissions and grant them to roles.
pub const PERMISSION_ASSIGN: &str = "permission.assign";

/// Every built-in permission, in seeding order.
pub const ALL: &[&str] = &[
    USER_CREATE,
    USER_UPDATE,
    USER_DELETE,
    USER_VIEW,
    ROLE_CREATE,
    ROLE_UPDATE,
    ROLE_DELETE,
    ROLE_VIEW,
    ROLE_ASSIGN,
    PERMISSION_VIEW,
    PERMISSION_ASSIGN,
];

/// Split `resource.action` into its parts.
pub fn split(name: &str) -> Option<(&str, &str)> {
    let (resource, action) = name.split_once('.')?;
    if resource.is_empty() || action.is_empty() || action.contains('.') {
        return None;
    }
    Some((resource, action))
}
