//! Permission repository and permission resolution.

use std::collections::BTreeSet;

use async_trait::async_trait;
use sqlx::PgPool;

use gatehouse_core::error::ErrorKind;
use gatehouse_core::result::AppResult;
use gatehouse_core::types::{PermissionId, UserId};
use gatehouse_entity::{NewPermission, Permission};

use super::{like_pattern, on_unique, storage};
use crate::traits::{PermissionRepo, PermissionResolver};

/// Repository for permissions.
#[derive(Debug, Clone)]
pub struct PgPermissionRepository {
    pool: PgPool,
}

impl PgPermissionRepository {
    /// Create a new permission repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PermissionRepo for PgPermissionRepository {
    async fn find_by_id(&self, id: PermissionId) -> AppResult<Option<Permission>> {
        sqlx::query_as::<_, Permission>("SELECT * FROM permissions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage("Failed to find permission by id"))
    }

    async fn search(&self, name_filter: Option<&str>) -> AppResult<Vec<Permission>> {
        sqlx::query_as::<_, Permission>(
            "SELECT * FROM permissions WHERE ($1::TEXT IS NULL OR name ILIKE $1) ORDER BY name",
        )
        .bind(like_pattern(name_filter))
        .fetch_all(&self.pool)
        .await
        .map_err(storage("Failed to search permissions"))
    }

    async fn insert(&self, permission: NewPermission) -> AppResult<Permission> {
        let name = permission.name();
        sqlx::query_as::<_, Permission>(
            r#"
            INSERT INTO permissions (name, resource, action, description, created_by)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&name)
        .bind(&permission.resource)
        .bind(&permission.action)
        .bind(&permission.description)
        .bind(permission.created_by)
        .fetch_one(&self.pool)
        .await
        .map_err(on_unique(
            ErrorKind::Conflict,
            format!("Permission '{name}' already exists"),
            "Failed to insert permission",
        ))
    }
}

/// Resolves a principal's effective permission names with a single join.
#[derive(Debug, Clone)]
pub struct PgPermissionResolver {
    pool: PgPool,
}

impl PgPermissionResolver {
    /// Create a new resolver.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PermissionResolver for PgPermissionResolver {
    async fn resolve(&self, user_id: UserId) -> AppResult<BTreeSet<String>> {
        let names: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT DISTINCT p.name
            FROM users u
            JOIN user_roles ur ON ur.user_id = u.id AND ur.is_active
            JOIN roles r ON r.id = ur.role_id AND r.is_active
            JOIN role_permissions rp ON rp.role_id = r.id
            JOIN permissions p ON p.id = rp.permission_id AND p.is_active
            WHERE u.id = $1 AND u.is_active
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage("Failed to resolve permissions"))?;

        Ok(names.into_iter().collect())
    }
}
