//! User repository implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool, Postgres, Transaction};

use gatehouse_core::error::{AppError, ErrorKind};
use gatehouse_core::result::AppResult;
use gatehouse_core::types::UserId;
use gatehouse_entity::{NewUser, Role, User, UserWithRoles};

use super::{like_pattern, on_unique, storage};
use crate::traits::UserRepo;

const LIST_LIMIT: i64 = 50;

/// Repository for principal queries.
#[derive(Debug, Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    /// Create a new user repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct UserRoleRow {
    user_id: UserId,
    #[sqlx(flatten)]
    role: Role,
}

/// Insert a principal inside the caller's transaction.
pub(crate) async fn insert_user_tx(
    tx: &mut Transaction<'_, Postgres>,
    user: &NewUser,
) -> AppResult<User> {
    sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (email, password_hash, first_name, last_name)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .fetch_one(&mut **tx)
    .await
    .map_err(on_unique(
        ErrorKind::AlreadyRegistered,
        format!("User with email {} is already registered", user.email),
        "Failed to insert user",
    ))
}

#[async_trait]
impl UserRepo for PgUserRepository {
    async fn find_active_by_email(&self, email: &str) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE LOWER(email) = LOWER($1) AND is_active",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage("Failed to find user by email"))
    }

    async fn find_by_id(&self, id: UserId) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage("Failed to find user by id"))
    }

    async fn insert(&self, user: NewUser) -> AppResult<User> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(storage("Failed to begin transaction"))?;
        let created = insert_user_tx(&mut tx, &user).await?;
        tx.commit()
            .await
            .map_err(storage("Failed to commit user insert"))?;
        Ok(created)
    }

    async fn update_password_hash(&self, id: UserId, password_hash: &str) -> AppResult<()> {
        let result =
            sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(password_hash)
                .execute(&self.pool)
                .await
                .map_err(storage("Failed to update password hash"))?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("User {id} not found")));
        }
        Ok(())
    }

    async fn list_with_roles(&self, email_filter: Option<&str>) -> AppResult<Vec<UserWithRoles>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users
            WHERE ($1::TEXT IS NULL OR email ILIKE $1)
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(like_pattern(email_filter))
        .bind(LIST_LIMIT)
        .fetch_all(&self.pool)
        .await
        .map_err(storage("Failed to list users"))?;

        let ids: Vec<i64> = users.iter().map(|u| u.id.value()).collect();
        let rows = sqlx::query_as::<_, UserRoleRow>(
            r#"
            SELECT ur.user_id, r.*
            FROM user_roles ur
            JOIN roles r ON r.id = ur.role_id
            WHERE ur.user_id = ANY($1) AND ur.is_active AND r.is_active
            ORDER BY r.name
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(storage("Failed to load user roles"))?;

        let mut by_user: HashMap<UserId, Vec<Role>> = HashMap::new();
        for row in rows {
            by_user.entry(row.user_id).or_default().push(row.role);
        }

        Ok(users
            .into_iter()
            .map(|user| {
                let roles = by_user.remove(&user.id).unwrap_or_default();
                UserWithRoles { user, roles }
            })
            .collect())
    }
}
