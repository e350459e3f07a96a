//! Session repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use gatehouse_core::result::AppResult;
use gatehouse_core::types::{SessionId, UserId};
use gatehouse_entity::{NewSession, Session};

use super::storage;
use crate::traits::SessionRepo;

/// Repository for login sessions.
#[derive(Debug, Clone)]
pub struct PgSessionRepository {
    pool: PgPool,
}

impl PgSessionRepository {
    /// Create a new session repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionRepo for PgSessionRepository {
    async fn insert(&self, session: NewSession) -> AppResult<Session> {
        sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO user_sessions (user_id, jti, ip_address, user_agent, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(session.user_id)
        .bind(session.jti)
        .bind(&session.ip_address)
        .bind(&session.user_agent)
        .bind(session.expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(storage("Failed to create session"))
    }

    async fn find_by_jti(&self, jti: SessionId) -> AppResult<Option<Session>> {
        sqlx::query_as::<_, Session>("SELECT * FROM user_sessions WHERE jti = $1")
            .bind(jti)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage("Failed to find session"))
    }

    async fn touch(&self, jti: SessionId, expires_at: DateTime<Utc>) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE user_sessions
            SET expires_at = $2, last_activity = NOW(), updated_at = NOW()
            WHERE jti = $1 AND is_active
            "#,
        )
        .bind(jti)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(storage("Failed to touch session"))?;

        Ok(result.rows_affected() > 0)
    }

    async fn deactivate(&self, jti: SessionId) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE user_sessions SET is_active = FALSE, updated_at = NOW() WHERE jti = $1 AND is_active",
        )
        .bind(jti)
        .execute(&self.pool)
        .await
        .map_err(storage("Failed to deactivate session"))?;

        Ok(result.rows_affected() > 0)
    }

    async fn deactivate_all_for_principal(&self, user_id: UserId) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE user_sessions SET is_active = FALSE, updated_at = NOW() WHERE user_id = $1 AND is_active",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(storage("Failed to deactivate sessions"))?;

        Ok(result.rows_affected())
    }

    async fn purge_expired(&self, older_than: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            "DELETE FROM user_sessions WHERE expires_at < $1 OR (NOT is_active AND updated_at < $1)",
        )
        .bind(older_than)
        .execute(&self.pool)
        .await
        .map_err(storage("Failed to purge sessions"))?;

        Ok(result.rows_affected())
    }
}
