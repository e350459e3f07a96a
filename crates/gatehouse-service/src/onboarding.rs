//! Invite → register onboarding workflow.
//!
//! A record moves from none to `INVITED` to `COMPLETED`. Expiry is never
//! stored as a state; it is derived from `expired_at` on every read.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

use gatehouse_auth::{InvitationClaims, PasswordHasher, PasswordValidator, TokenService};
use gatehouse_core::config::MailConfig;
use gatehouse_core::error::{AppError, ErrorKind};
use gatehouse_core::result::AppResult;
use gatehouse_core::types::{RoleId, UserId};
use gatehouse_database::Repositories;
use gatehouse_entity::{NewOnboarding, NewUser, OnboardingProcess, User};

use crate::email;
use crate::notify::{Notifier, USER_INVITATION};

/// Account details supplied by the invitee at registration.
#[derive(Clone, Deserialize)]
pub struct AccountFields {
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Chosen password, plaintext until hashed.
    pub password: String,
}

impl std::fmt::Debug for AccountFields {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountFields")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .finish_non_exhaustive()
    }
}

/// An onboarding record with its derived expiry flag.
#[derive(Debug, Clone, Serialize)]
pub struct InvitationStatus {
    /// The stored record.
    #[serde(flatten)]
    pub process: OnboardingProcess,
    /// Whether `expired_at` has passed.
    pub is_expired: bool,
}

/// Drives invitations and invitation-based registration.
#[derive(Clone)]
pub struct OnboardingService {
    repos: Repositories,
    tokens: Arc<TokenService>,
    hasher: Arc<PasswordHasher>,
    validator: Arc<PasswordValidator>,
    notifier: Arc<dyn Notifier>,
    invitation_base_url: String,
}

impl std::fmt::Debug for OnboardingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnboardingService")
            .field("invitation_base_url", &self.invitation_base_url)
            .finish_non_exhaustive()
    }
}

impl OnboardingService {
    /// Creates an onboarding service.
    pub fn new(
        repos: Repositories,
        tokens: Arc<TokenService>,
        hasher: Arc<PasswordHasher>,
        validator: Arc<PasswordValidator>,
        notifier: Arc<dyn Notifier>,
        mail: &MailConfig,
    ) -> Self {
        Self {
            repos,
            tokens,
            hasher,
            validator,
            notifier,
            invitation_base_url: mail.invitation_base_url.clone(),
        }
    }

    /// Invite `email` with `role_ids`, on behalf of `inviter`.
    ///
    /// The record is written before the token is issued and mailed, so a
    /// failed send leaves a record that can be re-queried but not re-invited
    /// until it expires.
    pub async fn invite(
        &self,
        inviter: UserId,
        email: &str,
        role_ids: &[RoleId],
    ) -> AppResult<OnboardingProcess> {
        let email = email::normalize(email)?;
        let role_ids = dedup(role_ids);
        if role_ids.is_empty() {
            return Err(AppError::validation("At least one role is required"));
        }

        if self.repos.users.find_active_by_email(&email).await?.is_some() {
            return Err(AppError::already_registered(format!(
                "User with email {email} is already registered"
            )));
        }

        for role_id in &role_ids {
            if self.repos.roles.find_by_id(*role_id).await?.is_none() {
                return Err(AppError::not_found(format!("Role {role_id} does not exist")));
            }
        }

        let now = Utc::now();
        let record = self
            .repos
            .onboarding
            .upsert_invitation(NewOnboarding {
                email: email.clone(),
                role_ids: role_ids.clone(),
                created_by: inviter,
                expired_at: now + self.tokens.invitation_ttl(),
            })
            .await?;

        let token = self.tokens.issue_invitation(&email, &role_ids, now)?;
        let data = invitation_data(
            &email,
            &token.token,
            &self.invitation_base_url,
            record.expired_at,
            inviter,
        );

        self.notifier
            .send(&email, USER_INVITATION, data)
            .await
            .map_err(|e| {
                if e.is(ErrorKind::ExternalService) {
                    e
                } else {
                    AppError::with_source(
                        ErrorKind::ExternalService,
                        "Failed to send invitation",
                        e,
                    )
                }
            })?;

        info!(email = %email, inviter = %inviter, roles = role_ids.len(), "Invitation sent");
        Ok(record)
    }

    /// Create the account for a verified invitation.
    ///
    /// `verified_email` and `verified_role_ids` come from an invitation token
    /// that has already been checked. The stored record decides the roles.
    pub async fn register(
        &self,
        verified_email: &str,
        verified_role_ids: &[RoleId],
        fields: AccountFields,
    ) -> AppResult<User> {
        let email = email::normalize(verified_email)?;
        self.validator.validate(&fields.password)?;

        if self.repos.users.find_active_by_email(&email).await?.is_some() {
            return Err(AppError::already_registered(format!(
                "User with email {email} is already registered"
            )));
        }

        let now = Utc::now();
        let record = match self.repos.onboarding.find_by_email(&email).await? {
            // A concurrent registration committed after the user lookup above.
            Some(r) if r.completed => {
                return Err(AppError::already_registered(format!(
                    "User with email {email} is already registered"
                )));
            }
            Some(r) if r.is_pending_at(now) => r,
            _ => {
                return Err(AppError::invitation_not_found(format!(
                    "No pending invitation for {email}"
                )));
            }
        };

        for role_id in record.roles() {
            let active = self
                .repos
                .roles
                .find_by_id(*role_id)
                .await?
                .map(|r| r.is_active)
                .unwrap_or(false);
            if !active {
                warn!(role_id = %role_id, email = %email, "Invited role is not active");
                return Err(AppError::role_not_active(format!(
                    "Role {role_id} is not active"
                )));
            }
        }

        let offered: BTreeSet<RoleId> = verified_role_ids.iter().copied().collect();
        let stored: BTreeSet<RoleId> = record.roles().iter().copied().collect();
        if offered != stored {
            warn!(email = %email, "Invitation token roles differ from the stored invitation");
        }

        let password_hash = self.hasher.hash(&fields.password).await?;
        let user = self
            .repos
            .registrar
            .register(
                NewUser {
                    email: email.clone(),
                    password_hash,
                    first_name: fields.first_name.trim().to_string(),
                    last_name: fields.last_name.trim().to_string(),
                },
                record.roles(),
                record.created_by,
            )
            .await?;

        info!(user_id = %user.id, roles = record.roles().len(), "Registration completed");
        Ok(user)
    }

    /// Check an invitation token's signature, expiry, and kind.
    pub fn verify_invitation(&self, token: &str) -> AppResult<InvitationClaims> {
        self.tokens.verify_invitation(token)
    }

    /// Verify an invitation token and register with the identity it carries.
    pub async fn register_with_token(&self, token: &str, fields: AccountFields) -> AppResult<User> {
        let claims = self.verify_invitation(token)?;
        self.register(&claims.email, &claims.role_ids, fields).await
    }

    /// Look up the invitation for `email`.
    pub async fn invitation_status(&self, email: &str) -> AppResult<InvitationStatus> {
        let email = email::normalize(email)?;
        let process = self
            .repos
            .onboarding
            .find_by_email(&email)
            .await?
            .ok_or_else(|| AppError::invitation_not_found(format!("No invitation for {email}")))?;

        Ok(InvitationStatus {
            is_expired: process.is_expired_at(Utc::now()),
            process,
        })
    }
}

fn dedup(role_ids: &[RoleId]) -> Vec<RoleId> {
    let mut seen = BTreeSet::new();
    role_ids.iter().copied().filter(|r| seen.insert(*r)).collect()
}

fn invitation_data(
    email: &str,
    token: &str,
    base_url: &str,
    expires_at: DateTime<Utc>,
    invited_by: UserId,
) -> Map<String, Value> {
    let mut data = Map::new();
    data.insert("email".into(), Value::from(email));
    data.insert("token".into(), Value::from(token));
    data.insert(
        "invitation_url".into(),
        Value::from(format!("{base_url}?token={token}")),
    );
    data.insert("expires_at".into(), Value::from(expires_at.to_rfc3339()));
    data.insert("invited_by".into(), Value::from(invited_by.value()));
    data
}
