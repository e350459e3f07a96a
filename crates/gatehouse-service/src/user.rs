//! Account maintenance: password reset, listing, and direct creation.

use std::sync::Arc;

use chrono::Utc;
use serde_json::{Map, Value};
use tracing::{info, warn};

use gatehouse_auth::{PasswordHasher, PasswordValidator};
use gatehouse_core::error::AppError;
use gatehouse_core::result::AppResult;
use gatehouse_core::types::{RoleId, UserId};
use gatehouse_database::Repositories;
use gatehouse_entity::{NewUser, User, UserWithRoles};

use crate::email;
use crate::notify::{Notifier, PASSWORD_CHANGED};

/// User account operations outside the invitation flow.
#[derive(Clone)]
pub struct UserService {
    repos: Repositories,
    hasher: Arc<PasswordHasher>,
    validator: Arc<PasswordValidator>,
    notifier: Arc<dyn Notifier>,
}

impl std::fmt::Debug for UserService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserService").finish_non_exhaustive()
    }
}

impl UserService {
    /// Creates a user service.
    pub fn new(
        repos: Repositories,
        hasher: Arc<PasswordHasher>,
        validator: Arc<PasswordValidator>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            repos,
            hasher,
            validator,
            notifier,
        }
    }

    /// Replace the password of `user_id` after checking the current one.
    ///
    /// Existing sessions stay valid.
    pub async fn reset_password(
        &self,
        user_id: UserId,
        old_password: &str,
        new_password: &str,
    ) -> AppResult<()> {
        let user = self
            .repos
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("User {user_id} not found")))?;

        if !self.hasher.verify(old_password, &user.password_hash).await? {
            warn!(user_id = %user_id, "Password reset rejected: current password mismatch");
            return Err(AppError::password_mismatch("Current password is incorrect"));
        }

        self.validator.validate(new_password)?;
        self.validator.validate_not_same(old_password, new_password)?;

        let new_hash = self.hasher.hash(new_password).await?;
        self.repos
            .users
            .update_password_hash(user_id, &new_hash)
            .await?;

        info!(user_id = %user_id, "Password changed");

        let mut data = Map::new();
        data.insert("first_name".into(), Value::from(user.first_name.clone()));
        data.insert("email".into(), Value::from(user.email.clone()));
        data.insert("changed_at".into(), Value::from(Utc::now().to_rfc3339()));
        if let Err(e) = self.notifier.send(&user.email, PASSWORD_CHANGED, data).await {
            warn!(user_id = %user_id, error = %e, "Password change notice not sent");
        }

        Ok(())
    }

    /// Users matching `email_filter`, newest first, with their active roles.
    pub async fn list_users(&self, email_filter: Option<&str>) -> AppResult<Vec<UserWithRoles>> {
        self.repos.users.list_with_roles(email_filter).await
    }

    /// Create an account directly, bypassing invitations.
    ///
    /// Used for bootstrapping the first administrator. Repeated role ids
    /// collapse to one grant, and every role must be active. The account
    /// and its role edges are written together or not at all. Edges are
    /// granted by `granted_by`, or by the new user itself when absent.
    pub async fn create_user(
        &self,
        granted_by: Option<UserId>,
        email: &str,
        password: &str,
        first_name: &str,
        last_name: &str,
        role_ids: &[RoleId],
    ) -> AppResult<User> {
        let email = email::normalize(email)?;
        self.validator.validate(password)?;

        let mut distinct: Vec<RoleId> = Vec::with_capacity(role_ids.len());
        for role_id in role_ids {
            if distinct.contains(role_id) {
                continue;
            }
            match self.repos.roles.find_by_id(*role_id).await? {
                Some(role) if role.is_active => distinct.push(*role_id),
                Some(_) => {
                    return Err(AppError::role_not_active(format!(
                        "Role {role_id} is not active"
                    )));
                }
                None => return Err(AppError::not_found(format!("Role {role_id} does not exist"))),
            }
        }

        let password_hash = self.hasher.hash(password).await?;
        let user = self
            .repos
            .registrar
            .create(
                NewUser {
                    email,
                    password_hash,
                    first_name: first_name.trim().to_string(),
                    last_name: last_name.trim().to_string(),
                },
                &distinct,
                granted_by,
            )
            .await?;

        info!(user_id = %user.id, roles = distinct.len(), "User created");
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use gatehouse_core::ErrorKind;
    use gatehouse_core::config::AuthConfig;
    use gatehouse_database::{MemoryStore, RoleRepo};
    use gatehouse_entity::NewRole;

    use super::*;
    use crate::notify::RecordingNotifier;

    fn service(store: &MemoryStore, notifier: &RecordingNotifier) -> (UserService, Arc<PasswordHasher>) {
        let config = AuthConfig {
            argon2_memory_kib: 1024,
            argon2_iterations: 1,
            ..AuthConfig::default()
        };
        let hasher = Arc::new(PasswordHasher::new(&config).unwrap());
        let service = UserService::new(
            Repositories::memory(store.clone()),
            hasher.clone(),
            Arc::new(PasswordValidator::new(&config)),
            Arc::new(notifier.clone()),
        );
        (service, hasher)
    }

    #[tokio::test]
    async fn test_reset_password_flow() {
        let store = MemoryStore::new();
        let notifier = RecordingNotifier::new();
        let (service, hasher) = service(&store, &notifier);
        let user = service
            .create_user(None, "ann@x.com", "original1", "Ann", "Lee", &[])
            .await
            .unwrap();

        let err = service
            .reset_password(user.id, "wrong-pass", "changed22")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::PasswordMismatch);

        let err = service
            .reset_password(user.id, "original1", "abc")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);

        service
            .reset_password(user.id, "original1", "changed22")
            .await
            .unwrap();

        let stored = service.repos.users.find_by_id(user.id).await.unwrap().unwrap();
        assert!(hasher.verify("changed22", &stored.password_hash).await.unwrap());
        assert!(!hasher.verify("original1", &stored.password_hash).await.unwrap());
        assert_eq!(notifier.last_to("ann@x.com").unwrap().template, PASSWORD_CHANGED);
    }

    #[tokio::test]
    async fn test_reset_password_unknown_user() {
        let store = MemoryStore::new();
        let (service, _) = service(&store, &RecordingNotifier::new());
        let err = service
            .reset_password(UserId(99), "a", "b")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_failed_notice_does_not_fail_reset() {
        let store = MemoryStore::new();
        let (service, _) = service(&store, &RecordingNotifier::failing());
        let user = service
            .create_user(None, "ben@x.com", "original1", "Ben", "Ng", &[])
            .await
            .unwrap();
        service
            .reset_password(user.id, "original1", "changed22")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_create_user_with_roles() {
        let store = MemoryStore::new();
        let (service, _) = service(&store, &RecordingNotifier::new());
        let admin = RoleRepo::insert(
            &store,
            NewRole {
                name: "admin".to_string(),
                description: None,
                created_by: None,
            },
            &[],
        )
        .await
        .unwrap();

        let user = service
            .create_user(None, "Root@X.com", "original1", "Root", "User", &[admin.id])
            .await
            .unwrap();
        assert_eq!(user.email, "root@x.com");

        let listed = service.list_users(Some("root")).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].roles[0].name, "admin");

        let err = service
            .create_user(None, "root@x.com", "original1", "Root", "User", &[])
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::AlreadyRegistered);
    }

    #[tokio::test]
    async fn test_create_user_grants_repeated_role_once() {
        let store = MemoryStore::new();
        let (service, _) = service(&store, &RecordingNotifier::new());
        let admin = RoleRepo::insert(
            &store,
            NewRole {
                name: "admin".to_string(),
                description: None,
                created_by: None,
            },
            &[],
        )
        .await
        .unwrap();

        let user = service
            .create_user(None, "dup@x.com", "original1", "Dup", "Roles", &[admin.id, admin.id])
            .await
            .unwrap();

        assert_eq!(store.role_edge_count(user.id).await, 1);
        assert_eq!(store.user_count().await, 1);
    }

    #[tokio::test]
    async fn test_create_user_failure_leaves_no_account() {
        let store = MemoryStore::new();
        let (service, _) = service(&store, &RecordingNotifier::new());
        let viewer = RoleRepo::insert(
            &store,
            NewRole {
                name: "viewer".to_string(),
                description: None,
                created_by: None,
            },
            &[],
        )
        .await
        .unwrap();
        store.set_active(viewer.id, false).await.unwrap();

        let err = service
            .create_user(None, "gone@x.com", "original1", "Gone", "Girl", &[viewer.id])
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::RoleNotActive);

        let err = service
            .create_user(None, "gone@x.com", "original1", "Gone", "Girl", &[RoleId(404)])
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);

        assert_eq!(store.user_count().await, 0);
        assert!(
            service
                .repos
                .users
                .find_active_by_email("gone@x.com")
                .await
                .unwrap()
                .is_none()
        );
    }
}
