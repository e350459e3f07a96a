//! Transactional account registration.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;

use gatehouse_core::result::AppResult;
use gatehouse_core::types::{RoleId, UserId};
use gatehouse_entity::{NewUser, User};

use super::assignment::{insert_many_tx, lock_active_roles_tx};
use super::onboarding::mark_completed_tx;
use super::storage;
use super::user::insert_user_tx;
use crate::distinct_roles;
use crate::traits::AccountRegistrar;

/// Runs the user insert and its role edges in one transaction, together with
/// onboarding completion when registering from an invitation.
///
/// An early return drops the transaction, which rolls it back; that also
/// covers a caller dropping the future mid-flight.
#[derive(Debug, Clone)]
pub struct PgAccountRegistrar {
    pool: PgPool,
}

impl PgAccountRegistrar {
    /// Create a new registrar.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountRegistrar for PgAccountRegistrar {
    async fn register(
        &self,
        user: NewUser,
        role_ids: &[RoleId],
        granted_by: UserId,
    ) -> AppResult<User> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(storage("Failed to begin registration"))?;

        let created = insert_user_tx(&mut tx, &user).await?;
        insert_many_tx(&mut tx, created.id, role_ids, granted_by).await?;
        mark_completed_tx(&mut tx, &created.email).await?;

        tx.commit()
            .await
            .map_err(storage("Failed to commit registration"))?;

        debug!(user_id = %created.id, roles = role_ids.len(), "Registration committed");
        Ok(created)
    }

    async fn create(
        &self,
        user: NewUser,
        role_ids: &[RoleId],
        granted_by: Option<UserId>,
    ) -> AppResult<User> {
        let role_ids = distinct_roles(role_ids);
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(storage("Failed to begin account creation"))?;

        lock_active_roles_tx(&mut tx, &role_ids).await?;
        let created = insert_user_tx(&mut tx, &user).await?;
        let grantor = granted_by.unwrap_or(created.id);
        insert_many_tx(&mut tx, created.id, &role_ids, grantor).await?;

        tx.commit()
            .await
            .map_err(storage("Failed to commit account creation"))?;

        debug!(user_id = %created.id, roles = role_ids.len(), "Account committed");
        Ok(created)
    }
}
