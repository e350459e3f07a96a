//! Role administration and role assignment.

use serde::Deserialize;
use tracing::info;

use gatehouse_core::error::AppError;
use gatehouse_core::result::AppResult;
use gatehouse_core::types::{PermissionId, RoleId, UserId};
use gatehouse_database::Repositories;
use gatehouse_entity::{NewRole, Role, RoleWithPermissions};

/// Input for [`RoleService::create_role`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewRoleRequest {
    /// Unique role name.
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Permissions granted to the role on creation.
    #[serde(default)]
    pub permission_ids: Vec<PermissionId>,
}

/// Manages roles, their permission grants, and user assignments.
#[derive(Clone)]
pub struct RoleService {
    repos: Repositories,
}

impl std::fmt::Debug for RoleService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoleService").finish_non_exhaustive()
    }
}

impl RoleService {
    /// Creates a role service.
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    /// Create a role together with its initial permission grants.
    pub async fn create_role(
        &self,
        actor: Option<UserId>,
        req: NewRoleRequest,
    ) -> AppResult<Role> {
        let name = req.name.trim();
        if name.is_empty() {
            return Err(AppError::validation("Role name must not be empty"));
        }

        for permission_id in &req.permission_ids {
            if self.repos.permissions.find_by_id(*permission_id).await?.is_none() {
                return Err(AppError::not_found(format!(
                    "Permission {permission_id} does not exist"
                )));
            }
        }

        let role = self
            .repos
            .roles
            .insert(
                NewRole {
                    name: name.to_string(),
                    description: req.description.filter(|d| !d.trim().is_empty()),
                    created_by: actor,
                },
                &req.permission_ids,
            )
            .await?;

        info!(
            actor = ?actor,
            role_id = %role.id,
            name = %role.name,
            permissions = req.permission_ids.len(),
            "Role created"
        );
        Ok(role)
    }

    /// Active roles whose name contains `name_filter`.
    pub async fn list_roles(&self, name_filter: Option<&str>) -> AppResult<Vec<Role>> {
        self.repos.roles.find_active(name_filter).await
    }

    /// Roles with the permissions granted to each.
    pub async fn roles_with_permissions(
        &self,
        name_filter: Option<&str>,
    ) -> AppResult<Vec<RoleWithPermissions>> {
        self.repos.roles.list_with_permissions(name_filter).await
    }

    /// Activate or deactivate a role.
    pub async fn set_role_active(&self, role_id: RoleId, active: bool) -> AppResult<()> {
        self.repos.roles.set_active(role_id, active).await?;
        info!(role_id = %role_id, active, "Role activation changed");
        Ok(())
    }

    /// Give `user_id` the active role `role_id`.
    pub async fn assign_role(&self, actor: UserId, user_id: UserId, role_id: RoleId) -> AppResult<()> {
        if self.repos.users.find_by_id(user_id).await?.is_none() {
            return Err(AppError::not_found(format!("User {user_id} not found")));
        }

        let role = self
            .repos
            .roles
            .find_by_id(role_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Role {role_id} does not exist")))?;
        if !role.is_active {
            return Err(AppError::role_not_active(format!(
                "Role {} is not active",
                role.name
            )));
        }

        self.repos
            .role_assignments
            .insert(user_id, role_id, actor)
            .await?;

        info!(actor = %actor, user_id = %user_id, role_id = %role_id, "Role assigned");
        Ok(())
    }

    /// Grant `permission_id` to `role_id`.
    pub async fn grant_permission(
        &self,
        actor: UserId,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> AppResult<()> {
        if self.repos.roles.find_by_id(role_id).await?.is_none() {
            return Err(AppError::not_found(format!("Role {role_id} does not exist")));
        }
        if self.repos.permissions.find_by_id(permission_id).await?.is_none() {
            return Err(AppError::not_found(format!(
                "Permission {permission_id} does not exist"
            )));
        }

        self.repos
            .role_permissions
            .insert(role_id, permission_id, actor)
            .await?;

        info!(
            actor = %actor,
            role_id = %role_id,
            permission_id = %permission_id,
            "Permission granted"
        );
        Ok(())
    }
}
