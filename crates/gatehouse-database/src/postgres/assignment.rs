//! User-role and role-permission edge repositories.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

use gatehouse_core::error::{AppError, ErrorKind};
use gatehouse_core::result::AppResult;
use gatehouse_core::types::{PermissionId, RoleId, UserId};
use gatehouse_entity::{Permission, Role};

use super::{is_foreign_key_violation, is_unique_violation, storage};
use crate::traits::{RoleAssignmentRepo, RolePermissionRepo};

/// Insert one user-role edge per id inside the caller's transaction.
pub(crate) async fn insert_many_tx(
    tx: &mut Transaction<'_, Postgres>,
    user_id: UserId,
    role_ids: &[RoleId],
    granted_by: UserId,
) -> AppResult<()> {
    if role_ids.is_empty() {
        return Ok(());
    }

    let ids: Vec<i64> = role_ids.iter().map(|r| r.value()).collect();
    sqlx::query(
        r#"
        INSERT INTO user_roles (user_id, role_id, added_by)
        SELECT $1, rid, $3 FROM UNNEST($2::BIGINT[]) AS rid
        "#,
    )
    .bind(user_id)
    .bind(&ids)
    .bind(granted_by)
    .execute(&mut **tx)
    .await
    .map_err(|e| {
        if is_foreign_key_violation(&e) {
            AppError::role_not_active("One or more roles no longer exist")
        } else {
            AppError::with_source(ErrorKind::Storage, "Failed to insert role assignments", e)
        }
    })?;

    Ok(())
}

/// Share-lock the given roles and fail unless every one of them is active.
///
/// Holding the lock until commit keeps a concurrent deactivation from
/// slipping in between this check and the edge insert.
pub(crate) async fn lock_active_roles_tx(
    tx: &mut Transaction<'_, Postgres>,
    role_ids: &[RoleId],
) -> AppResult<()> {
    if role_ids.is_empty() {
        return Ok(());
    }

    let ids: Vec<i64> = role_ids.iter().map(|r| r.value()).collect();
    let active: Vec<(i64,)> =
        sqlx::query_as("SELECT id FROM roles WHERE id = ANY($1) AND is_active FOR SHARE")
            .bind(&ids)
            .fetch_all(&mut **tx)
            .await
            .map_err(storage("Failed to lock roles"))?;

    if active.len() != ids.len() {
        return Err(AppError::role_not_active(
            "One or more roles are missing or inactive",
        ));
    }
    Ok(())
}

/// Repository for user-role edges.
#[derive(Debug, Clone)]
pub struct PgRoleAssignmentRepository {
    pool: PgPool,
}

impl PgRoleAssignmentRepository {
    /// Create a new assignment repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoleAssignmentRepo for PgRoleAssignmentRepository {
    async fn insert(&self, user_id: UserId, role_id: RoleId, granted_by: UserId) -> AppResult<()> {
        sqlx::query("INSERT INTO user_roles (user_id, role_id, added_by) VALUES ($1, $2, $3)")
            .bind(user_id)
            .bind(role_id)
            .bind(granted_by)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AppError::conflict(format!("User {user_id} already has role {role_id}"))
                } else if is_foreign_key_violation(&e) {
                    AppError::not_found("User or role does not exist")
                } else {
                    AppError::with_source(ErrorKind::Storage, "Failed to assign role", e)
                }
            })?;
        Ok(())
    }

    async fn roles_for_user(&self, user_id: UserId) -> AppResult<Vec<Role>> {
        sqlx::query_as::<_, Role>(
            r#"
            SELECT r.*
            FROM user_roles ur
            JOIN roles r ON r.id = ur.role_id
            WHERE ur.user_id = $1 AND ur.is_active AND r.is_active
            ORDER BY r.name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage("Failed to load roles for user"))
    }
}

/// Repository for role-permission edges.
#[derive(Debug, Clone)]
pub struct PgRolePermissionRepository {
    pool: PgPool,
}

impl PgRolePermissionRepository {
    /// Create a new role-permission repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RolePermissionRepo for PgRolePermissionRepository {
    async fn insert(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
        granted_by: UserId,
    ) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO role_permissions (role_id, permission_id, added_by) VALUES ($1, $2, $3)",
        )
        .bind(role_id)
        .bind(permission_id)
        .bind(granted_by)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::conflict(format!(
                    "Role {role_id} already has permission {permission_id}"
                ))
            } else if is_foreign_key_violation(&e) {
                AppError::not_found("Role or permission does not exist")
            } else {
                AppError::with_source(ErrorKind::Storage, "Failed to grant permission", e)
            }
        })?;
        Ok(())
    }

    async fn permissions_for_role(&self, role_id: RoleId) -> AppResult<Vec<Permission>> {
        sqlx::query_as::<_, Permission>(
            r#"
            SELECT p.*
            FROM role_permissions rp
            JOIN permissions p ON p.id = rp.permission_id
            WHERE rp.role_id = $1
            ORDER BY p.name
            "#,
        )
        .bind(role_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage("Failed to load permissions for role"))
    }
}
