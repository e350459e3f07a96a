//! Onboarding (invitation) repository implementation.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use gatehouse_core::error::AppError;
use gatehouse_core::result::AppResult;
use gatehouse_entity::{NewOnboarding, OnboardingProcess};

use super::storage;
use crate::traits::OnboardingRepo;

/// Flip the pending invitation for `email` to completed inside the caller's
/// transaction. Fails with `InvitationNotFound` when nothing was pending.
pub(crate) async fn mark_completed_tx(
    tx: &mut Transaction<'_, Postgres>,
    email: &str,
) -> AppResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE user_onboarding_process
        SET completed = TRUE, status = 'COMPLETED', updated_at = NOW()
        WHERE LOWER(email) = LOWER($1)
          AND completed = FALSE
          AND status = 'INVITED'
          AND expired_at > NOW()
        "#,
    )
    .bind(email)
    .execute(&mut **tx)
    .await
    .map_err(storage("Failed to complete onboarding"))?;

    if result.rows_affected() == 0 {
        return Err(AppError::invitation_not_found(format!(
            "No pending invitation for {email}"
        )));
    }
    Ok(())
}

/// Repository for invitation records.
#[derive(Debug, Clone)]
pub struct PgOnboardingRepository {
    pool: PgPool,
}

impl PgOnboardingRepository {
    /// Create a new onboarding repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OnboardingRepo for PgOnboardingRepository {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<OnboardingProcess>> {
        sqlx::query_as::<_, OnboardingProcess>(
            "SELECT * FROM user_onboarding_process WHERE LOWER(email) = LOWER($1)",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage("Failed to find onboarding record"))
    }

    async fn upsert_invitation(&self, record: NewOnboarding) -> AppResult<OnboardingProcess> {
        // The conflict branch only fires for a lapsed or finished record, so a
        // live invitation yields no row.
        let row = sqlx::query_as::<_, OnboardingProcess>(
            r#"
            INSERT INTO user_onboarding_process
                (id, email, role_ids, status, completed, created_by, expired_at)
            VALUES ($1, $2, $3, 'INVITED', FALSE, $4, $5)
            ON CONFLICT ((LOWER(email))) DO UPDATE SET
                role_ids   = EXCLUDED.role_ids,
                status     = 'INVITED',
                completed  = FALSE,
                created_by = EXCLUDED.created_by,
                expired_at = EXCLUDED.expired_at,
                created_at = $6,
                updated_at = $6
            WHERE user_onboarding_process.completed
               OR user_onboarding_process.expired_at <= $6
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&record.email)
        .bind(Json(&record.role_ids))
        .bind(record.created_by)
        .bind(record.expired_at)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage("Failed to upsert onboarding record"))?;

        row.ok_or_else(|| {
            AppError::already_invited(format!(
                "A pending invitation already exists for {}",
                record.email
            ))
        })
    }
}
