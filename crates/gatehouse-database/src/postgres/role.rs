//! Role repository implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};

use gatehouse_core::error::{AppError, ErrorKind};
use gatehouse_core::result::AppResult;
use gatehouse_core::types::{PermissionId, RoleId};
use gatehouse_entity::{NewRole, Permission, Role, RoleWithPermissions};

use super::{is_foreign_key_violation, is_unique_violation, like_pattern, storage};
use crate::traits::RoleRepo;

/// Repository for roles.
#[derive(Debug, Clone)]
pub struct PgRoleRepository {
    pool: PgPool,
}

impl PgRoleRepository {
    /// Create a new role repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct RolePermissionRow {
    role_id: RoleId,
    #[sqlx(flatten)]
    permission: Permission,
}

#[async_trait]
impl RoleRepo for PgRoleRepository {
    async fn find_by_id(&self, id: RoleId) -> AppResult<Option<Role>> {
        sqlx::query_as::<_, Role>("SELECT * FROM roles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage("Failed to find role by id"))
    }

    async fn find_by_name(&self, name: &str) -> AppResult<Option<Role>> {
        sqlx::query_as::<_, Role>("SELECT * FROM roles WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage("Failed to find role by name"))
    }

    async fn find_active(&self, name_filter: Option<&str>) -> AppResult<Vec<Role>> {
        sqlx::query_as::<_, Role>(
            "SELECT * FROM roles WHERE is_active AND ($1::TEXT IS NULL OR name ILIKE $1) ORDER BY name",
        )
        .bind(like_pattern(name_filter))
        .fetch_all(&self.pool)
        .await
        .map_err(storage("Failed to list active roles"))
    }

    async fn list(&self, name_filter: Option<&str>) -> AppResult<Vec<Role>> {
        sqlx::query_as::<_, Role>(
            "SELECT * FROM roles WHERE ($1::TEXT IS NULL OR name ILIKE $1) ORDER BY name",
        )
        .bind(like_pattern(name_filter))
        .fetch_all(&self.pool)
        .await
        .map_err(storage("Failed to list roles"))
    }

    async fn insert(&self, role: NewRole, permission_ids: &[PermissionId]) -> AppResult<Role> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(storage("Failed to begin transaction"))?;

        let created = sqlx::query_as::<_, Role>(
            "INSERT INTO roles (name, description, created_by) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(&role.name)
        .bind(&role.description)
        .bind(role.created_by)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::conflict(format!("Role '{}' already exists", role.name))
            } else {
                AppError::with_source(ErrorKind::Storage, "Failed to insert role", e)
            }
        })?;

        if !permission_ids.is_empty() {
            let ids: Vec<i64> = permission_ids.iter().map(|p| p.value()).collect();
            sqlx::query(
                r#"
                INSERT INTO role_permissions (role_id, permission_id, added_by)
                SELECT $1, pid, $3 FROM UNNEST($2::BIGINT[]) AS pid
                ON CONFLICT (role_id, permission_id) DO NOTHING
                "#,
            )
            .bind(created.id)
            .bind(&ids)
            .bind(role.created_by)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    AppError::not_found("One or more permissions do not exist")
                } else {
                    AppError::with_source(ErrorKind::Storage, "Failed to grant permissions", e)
                }
            })?;
        }

        tx.commit()
            .await
            .map_err(storage("Failed to commit role insert"))?;
        Ok(created)
    }

    async fn set_active(&self, id: RoleId, active: bool) -> AppResult<()> {
        let result =
            sqlx::query("UPDATE roles SET is_active = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(active)
                .execute(&self.pool)
                .await
                .map_err(storage("Failed to update role"))?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("Role {id} not found")));
        }
        Ok(())
    }

    async fn list_with_permissions(
        &self,
        name_filter: Option<&str>,
    ) -> AppResult<Vec<RoleWithPermissions>> {
        let roles = self.list(name_filter).await?;
        let ids: Vec<i64> = roles.iter().map(|r| r.id.value()).collect();

        let rows = sqlx::query_as::<_, RolePermissionRow>(
            r#"
            SELECT rp.role_id, p.*
            FROM role_permissions rp
            JOIN permissions p ON p.id = rp.permission_id
            WHERE rp.role_id = ANY($1)
            ORDER BY p.name
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(storage("Failed to load role permissions"))?;

        let mut by_role: HashMap<RoleId, Vec<Permission>> = HashMap::new();
        for row in rows {
            by_role.entry(row.role_id).or_default().push(row.permission);
        }

        Ok(roles
            .into_iter()
            .map(|role| {
                let permissions = by_role.remove(&role.id).unwrap_or_default();
                RoleWithPermissions { role, permissions }
            })
            .collect())
    }
}
