//! Trait implementations for [`MemoryStore`].

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use uuid::Uuid;

use gatehouse_core::error::AppError;
use gatehouse_core::result::AppResult;
use gatehouse_core::types::{PermissionId, RoleId, SessionId, UserId};
use gatehouse_entity::{
    NewOnboarding, NewPermission, NewRole, NewSession, NewUser, OnboardingProcess,
    OnboardingStatus, Permission, Role, RoleWithPermissions, Session, User, UserWithRoles,
};

use super::{MemoryStore, RolePermissionEdge, State, UserRoleEdge, contains_ci, email_key};
use crate::distinct_roles;
use crate::traits::{
    AccountRegistrar, OnboardingRepo, PermissionRepo, PermissionResolver, RoleAssignmentRepo,
    RolePermissionRepo, RoleRepo, SessionRepo, UserRepo,
};

const LIST_LIMIT: usize = 50;

fn insert_user(state: &mut State, user: NewUser) -> AppResult<User> {
    if state.active_user_by_email(&user.email).is_some() {
        return Err(AppError::already_registered(format!(
            "User with email {} is already registered",
            user.email
        )));
    }
    let now = Utc::now();
    let id = state.next_user_id();
    let created = User {
        id,
        email: user.email,
        password_hash: user.password_hash,
        first_name: user.first_name,
        last_name: user.last_name,
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    state.users.insert(id, created.clone());
    Ok(created)
}

#[async_trait]
impl UserRepo for MemoryStore {
    async fn find_active_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let state = self.state.lock().await;
        Ok(state.active_user_by_email(email).cloned())
    }

    async fn find_by_id(&self, id: UserId) -> AppResult<Option<User>> {
        Ok(self.state.lock().await.users.get(&id).cloned())
    }

    async fn insert(&self, user: NewUser) -> AppResult<User> {
        let mut state = self.state.lock().await;
        insert_user(&mut state, user)
    }

    async fn update_password_hash(&self, id: UserId, password_hash: &str) -> AppResult<()> {
        let mut state = self.state.lock().await;
        let user = state
            .users
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("User {id} not found")))?;
        user.password_hash = password_hash.to_string();
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn list_with_roles(&self, email_filter: Option<&str>) -> AppResult<Vec<UserWithRoles>> {
        let state = self.state.lock().await;
        let mut users: Vec<&User> = state
            .users
            .values()
            .filter(|u| contains_ci(&u.email, email_filter))
            .collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        Ok(users
            .into_iter()
            .take(LIST_LIMIT)
            .map(|u| UserWithRoles {
                user: u.clone(),
                roles: state.active_roles_for(u.id),
            })
            .collect())
    }
}

#[async_trait]
impl RoleRepo for MemoryStore {
    async fn find_by_id(&self, id: RoleId) -> AppResult<Option<Role>> {
        Ok(self.state.lock().await.roles.get(&id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> AppResult<Option<Role>> {
        let state = self.state.lock().await;
        Ok(state.roles.values().find(|r| r.name == name).cloned())
    }

    async fn find_active(&self, name_filter: Option<&str>) -> AppResult<Vec<Role>> {
        let state = self.state.lock().await;
        let mut roles: Vec<Role> = state
            .roles
            .values()
            .filter(|r| r.is_active && contains_ci(&r.name, name_filter))
            .cloned()
            .collect();
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(roles)
    }

    async fn list(&self, name_filter: Option<&str>) -> AppResult<Vec<Role>> {
        let state = self.state.lock().await;
        let mut roles: Vec<Role> = state
            .roles
            .values()
            .filter(|r| contains_ci(&r.name, name_filter))
            .cloned()
            .collect();
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(roles)
    }

    async fn insert(&self, role: NewRole, permission_ids: &[PermissionId]) -> AppResult<Role> {
        let mut state = self.state.lock().await;
        if state.roles.values().any(|r| r.name == role.name) {
            return Err(AppError::conflict(format!(
                "Role '{}' already exists",
                role.name
            )));
        }
        if permission_ids
            .iter()
            .any(|p| !state.permissions.contains_key(p))
        {
            return Err(AppError::not_found("One or more permissions do not exist"));
        }

        let now = Utc::now();
        let id = state.next_role_id();
        let created = Role {
            id,
            name: role.name,
            description: role.description,
            is_active: true,
            created_by: role.created_by,
            created_at: now,
            updated_at: now,
        };
        state.roles.insert(id, created.clone());

        let unique: BTreeSet<PermissionId> = permission_ids.iter().copied().collect();
        for permission_id in unique {
            state.role_permissions.push(RolePermissionEdge {
                role_id: id,
                permission_id,
                added_by: role.created_by,
            });
        }
        Ok(created)
    }

    async fn set_active(&self, id: RoleId, active: bool) -> AppResult<()> {
        let mut state = self.state.lock().await;
        let role = state
            .roles
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Role {id} not found")))?;
        role.is_active = active;
        role.updated_at = Utc::now();
        Ok(())
    }

    async fn list_with_permissions(
        &self,
        name_filter: Option<&str>,
    ) -> AppResult<Vec<RoleWithPermissions>> {
        let state = self.state.lock().await;
        let mut roles: Vec<RoleWithPermissions> = state
            .roles
            .values()
            .filter(|r| contains_ci(&r.name, name_filter))
            .map(|r| RoleWithPermissions {
                role: r.clone(),
                permissions: state.permissions_for_role(r.id),
            })
            .collect();
        roles.sort_by(|a, b| a.role.name.cmp(&b.role.name));
        Ok(roles)
    }
}

#[async_trait]
impl PermissionRepo for MemoryStore {
    async fn find_by_id(&self, id: PermissionId) -> AppResult<Option<Permission>> {
        Ok(self.state.lock().await.permissions.get(&id).cloned())
    }

    async fn search(&self, name_filter: Option<&str>) -> AppResult<Vec<Permission>> {
        let state = self.state.lock().await;
        let mut permissions: Vec<Permission> = state
            .permissions
            .values()
            .filter(|p| contains_ci(&p.name, name_filter))
            .cloned()
            .collect();
        permissions.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(permissions)
    }

    async fn insert(&self, permission: NewPermission) -> AppResult<Permission> {
        let mut state = self.state.lock().await;
        let name = permission.name();
        if state.permissions.values().any(|p| p.name == name) {
            return Err(AppError::conflict(format!(
                "Permission '{name}' already exists"
            )));
        }
        let now = Utc::now();
        let id = state.next_permission_id();
        let created = Permission {
            id,
            name,
            resource: permission.resource,
            action: permission.action,
            description: permission.description,
            is_active: true,
            created_by: permission.created_by,
            created_at: now,
            updated_at: now,
        };
        state.permissions.insert(id, created.clone());
        Ok(created)
    }
}

#[async_trait]
impl RoleAssignmentRepo for MemoryStore {
    async fn insert(&self, user_id: UserId, role_id: RoleId, granted_by: UserId) -> AppResult<()> {
        let mut state = self.state.lock().await;
        if !state.users.contains_key(&user_id) || !state.roles.contains_key(&role_id) {
            return Err(AppError::not_found("User or role does not exist"));
        }
        if state
            .user_roles
            .iter()
            .any(|e| e.user_id == user_id && e.role_id == role_id)
        {
            return Err(AppError::conflict(format!(
                "User {user_id} already has role {role_id}"
            )));
        }
        state.user_roles.push(UserRoleEdge {
            user_id,
            role_id,
            added_by: granted_by,
            is_active: true,
        });
        Ok(())
    }

    async fn roles_for_user(&self, user_id: UserId) -> AppResult<Vec<Role>> {
        Ok(self.state.lock().await.active_roles_for(user_id))
    }
}

#[async_trait]
impl RolePermissionRepo for MemoryStore {
    async fn insert(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
        granted_by: UserId,
    ) -> AppResult<()> {
        let mut state = self.state.lock().await;
        if !state.roles.contains_key(&role_id) || !state.permissions.contains_key(&permission_id) {
            return Err(AppError::not_found("Role or permission does not exist"));
        }
        if state
            .role_permissions
            .iter()
            .any(|e| e.role_id == role_id && e.permission_id == permission_id)
        {
            return Err(AppError::conflict(format!(
                "Role {role_id} already has permission {permission_id}"
            )));
        }
        state.role_permissions.push(RolePermissionEdge {
            role_id,
            permission_id,
            added_by: Some(granted_by),
        });
        Ok(())
    }

    async fn permissions_for_role(&self, role_id: RoleId) -> AppResult<Vec<Permission>> {
        Ok(self.state.lock().await.permissions_for_role(role_id))
    }
}

#[async_trait]
impl PermissionResolver for MemoryStore {
    async fn resolve(&self, user_id: UserId) -> AppResult<BTreeSet<String>> {
        let state = self.state.lock().await;
        let active_user = state
            .users
            .get(&user_id)
            .map(|u| u.is_active)
            .unwrap_or(false);
        if !active_user {
            return Ok(BTreeSet::new());
        }

        Ok(state
            .active_roles_for(user_id)
            .iter()
            .flat_map(|r| state.permissions_for_role(r.id))
            .filter(|p| p.is_active)
            .map(|p| p.name)
            .collect())
    }
}

#[async_trait]
impl OnboardingRepo for MemoryStore {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<OnboardingProcess>> {
        let state = self.state.lock().await;
        Ok(state.onboarding.get(&email_key(email)).cloned())
    }

    async fn upsert_invitation(&self, record: NewOnboarding) -> AppResult<OnboardingProcess> {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        let key = email_key(&record.email);

        let id = match state.onboarding.get(&key) {
            Some(existing) if existing.is_pending_at(now) => {
                return Err(AppError::already_invited(format!(
                    "A pending invitation already exists for {}",
                    record.email
                )));
            }
            Some(existing) => existing.id,
            None => Uuid::new_v4(),
        };

        let process = OnboardingProcess {
            id,
            email: record.email,
            role_ids: Json(record.role_ids),
            status: OnboardingStatus::Invited,
            completed: false,
            created_by: record.created_by,
            expired_at: record.expired_at,
            created_at: now,
            updated_at: now,
        };
        state.onboarding.insert(key, process.clone());
        Ok(process)
    }
}

#[async_trait]
impl AccountRegistrar for MemoryStore {
    async fn register(
        &self,
        user: NewUser,
        role_ids: &[RoleId],
        granted_by: UserId,
    ) -> AppResult<User> {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        let key = email_key(&user.email);

        // Every check runs before the first write, so a failure leaves no trace.
        if state.active_user_by_email(&user.email).is_some() {
            return Err(AppError::already_registered(format!(
                "User with email {} is already registered",
                user.email
            )));
        }
        if role_ids.iter().any(|r| !state.roles.contains_key(r)) {
            return Err(AppError::role_not_active("One or more roles no longer exist"));
        }
        let pending = state
            .onboarding
            .get(&key)
            .map(|p| p.is_pending_at(now))
            .unwrap_or(false);
        if !pending {
            return Err(AppError::invitation_not_found(format!(
                "No pending invitation for {}",
                user.email
            )));
        }

        let created = insert_user(&mut state, user)?;
        for role_id in role_ids {
            state.user_roles.push(UserRoleEdge {
                user_id: created.id,
                role_id: *role_id,
                added_by: granted_by,
                is_active: true,
            });
        }
        if let Some(process) = state.onboarding.get_mut(&key) {
            process.completed = true;
            process.status = OnboardingStatus::Completed;
            process.updated_at = now;
        }
        Ok(created)
    }

    async fn create(
        &self,
        user: NewUser,
        role_ids: &[RoleId],
        granted_by: Option<UserId>,
    ) -> AppResult<User> {
        let role_ids = distinct_roles(role_ids);
        let mut state = self.state.lock().await;

        let all_active = role_ids
            .iter()
            .all(|r| state.roles.get(r).is_some_and(|role| role.is_active));
        if !all_active {
            return Err(AppError::role_not_active(
                "One or more roles are missing or inactive",
            ));
        }

        let created = insert_user(&mut state, user)?;
        let grantor = granted_by.unwrap_or(created.id);
        for role_id in role_ids {
            state.user_roles.push(UserRoleEdge {
                user_id: created.id,
                role_id,
                added_by: grantor,
                is_active: true,
            });
        }
        Ok(created)
    }
}

#[async_trait]
impl SessionRepo for MemoryStore {
    async fn insert(&self, session: NewSession) -> AppResult<Session> {
        let mut state = self.state.lock().await;
        if state.sessions.contains_key(&session.jti) {
            return Err(AppError::conflict(format!(
                "Session {} already exists",
                session.jti
            )));
        }
        let now = Utc::now();
        let created = Session {
            id: state.next_session_row(),
            user_id: session.user_id,
            jti: session.jti,
            ip_address: session.ip_address,
            user_agent: session.user_agent,
            is_active: true,
            expires_at: session.expires_at,
            last_activity: now,
            created_at: now,
            updated_at: now,
        };
        state.sessions.insert(created.jti, created.clone());
        Ok(created)
    }

    async fn find_by_jti(&self, jti: SessionId) -> AppResult<Option<Session>> {
        Ok(self.state.lock().await.sessions.get(&jti).cloned())
    }

    async fn touch(&self, jti: SessionId, expires_at: DateTime<Utc>) -> AppResult<bool> {
        let mut state = self.state.lock().await;
        match state.sessions.get_mut(&jti) {
            Some(session) if session.is_active => {
                let now = Utc::now();
                session.expires_at = expires_at;
                session.last_activity = now;
                session.updated_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn deactivate(&self, jti: SessionId) -> AppResult<bool> {
        let mut state = self.state.lock().await;
        match state.sessions.get_mut(&jti) {
            Some(session) if session.is_active => {
                session.is_active = false;
                session.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn deactivate_all_for_principal(&self, user_id: UserId) -> AppResult<u64> {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        let mut changed = 0;
        for session in state
            .sessions
            .values_mut()
            .filter(|s| s.user_id == user_id && s.is_active)
        {
            session.is_active = false;
            session.updated_at = now;
            changed += 1;
        }
        Ok(changed)
    }

    async fn purge_expired(&self, older_than: DateTime<Utc>) -> AppResult<u64> {
        let mut state = self.state.lock().await;
        let before = state.sessions.len();
        state.sessions.retain(|_, s| {
            let expired = s.expires_at < older_than;
            let stale = !s.is_active && s.updated_at < older_than;
            !(expired || stale)
        });
        Ok((before - state.sessions.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration;

    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            password_hash: "$argon2id$placeholder".to_string(),
            first_name: "Alice".to_string(),
            last_name: "Liddell".to_string(),
        }
    }

    async fn seed_role(store: &MemoryStore, name: &str) -> Role {
        RoleRepo::insert(
            store,
            NewRole {
                name: name.to_string(),
                description: None,
                created_by: None,
            },
            &[],
        )
        .await
        .unwrap()
    }

    async fn invite(store: &MemoryStore, email: &str, roles: Vec<RoleId>, ttl: Duration) {
        store
            .upsert_invitation(NewOnboarding {
                email: email.to_string(),
                role_ids: roles,
                created_by: UserId(1),
                expired_at: Utc::now() + ttl,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_upsert_rejects_live_invitation_and_replaces_expired() {
        let store = MemoryStore::new();
        invite(&store, "alice@x.com", vec![RoleId(5)], Duration::minutes(10)).await;

        let err = store
            .upsert_invitation(NewOnboarding {
                email: "ALICE@x.com".to_string(),
                role_ids: vec![RoleId(5)],
                created_by: UserId(1),
                expired_at: Utc::now() + Duration::minutes(10),
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind, gatehouse_core::ErrorKind::AlreadyInvited);
        assert_eq!(store.onboarding_count().await, 1);

        let expired = MemoryStore::new();
        invite(&expired, "bob@x.com", vec![RoleId(1)], Duration::minutes(-1)).await;
        invite(&expired, "bob@x.com", vec![RoleId(2)], Duration::minutes(10)).await;
        let record = expired.find_by_email("bob@x.com").await.unwrap().unwrap();
        assert_eq!(record.roles(), &[RoleId(2)]);
        assert_eq!(expired.onboarding_count().await, 1);
    }

    #[tokio::test]
    async fn test_register_is_all_or_nothing() {
        let store = MemoryStore::new();
        let role = seed_role(&store, "viewer").await;
        invite(&store, "alice@x.com", vec![role.id, RoleId(999)], Duration::minutes(10)).await;

        let err = store
            .register(new_user("alice@x.com"), &[role.id, RoleId(999)], UserId(1))
            .await
            .unwrap_err();
        assert_eq!(err.kind, gatehouse_core::ErrorKind::RoleNotActive);
        assert_eq!(store.user_count().await, 0);

        let record = store.find_by_email("alice@x.com").await.unwrap().unwrap();
        assert_eq!(record.status, OnboardingStatus::Invited);
    }

    #[tokio::test]
    async fn test_concurrent_register_has_single_winner() {
        let store = MemoryStore::new();
        let role = seed_role(&store, "viewer").await;
        invite(&store, "alice@x.com", vec![role.id], Duration::minutes(10)).await;

        let registrar: Arc<dyn AccountRegistrar> = Arc::new(store.clone());
        let roles = [role.id];
        let (a, b) = tokio::join!(
            registrar.register(new_user("alice@x.com"), &roles, UserId(1)),
            registrar.register(new_user("alice@x.com"), &roles, UserId(1)),
        );

        let outcomes = [a, b];
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        let loser = outcomes.iter().find_map(|r| r.as_ref().err()).unwrap();
        assert_eq!(loser.kind, gatehouse_core::ErrorKind::AlreadyRegistered);
        assert_eq!(store.user_count().await, 1);
    }

    #[tokio::test]
    async fn test_create_collapses_repeated_roles() {
        let store = MemoryStore::new();
        let role = seed_role(&store, "admin").await;

        let user = store
            .create(new_user("root@x.com"), &[role.id, role.id], None)
            .await
            .unwrap();

        assert_eq!(store.role_edge_count(user.id).await, 1);
        let held: Vec<RoleId> = store
            .roles_for_user(user.id)
            .await
            .unwrap()
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(held, vec![role.id]);
    }

    #[tokio::test]
    async fn test_create_with_inactive_role_writes_nothing() {
        let store = MemoryStore::new();
        let viewer = seed_role(&store, "viewer").await;
        let retired = seed_role(&store, "retired").await;
        store.set_active(retired.id, false).await.unwrap();

        let err = store
            .create(new_user("bob@x.com"), &[viewer.id, retired.id], Some(UserId(1)))
            .await
            .unwrap_err();
        assert_eq!(err.kind, gatehouse_core::ErrorKind::RoleNotActive);

        let err = store
            .create(new_user("bob@x.com"), &[viewer.id, RoleId(404)], Some(UserId(1)))
            .await
            .unwrap_err();
        assert_eq!(err.kind, gatehouse_core::ErrorKind::RoleNotActive);

        assert_eq!(store.user_count().await, 0);
        assert!(store.find_active_by_email("bob@x.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_purge_keeps_sessions_within_grace() {
        let store = MemoryStore::new();
        let now = Utc::now();
        for (offset, user) in [(-120, 1), (-5, 2), (30, 3)] {
            SessionRepo::insert(
                &store,
                NewSession {
                    user_id: UserId(user),
                    jti: SessionId::new(),
                    ip_address: None,
                    user_agent: None,
                    expires_at: now + Duration::minutes(offset),
                },
            )
            .await
            .unwrap();
        }

        let purged = store
            .purge_expired(now - Duration::minutes(60))
            .await
            .unwrap();
        assert_eq!(purged, 1);
        assert_eq!(store.session_count(UserId(1)).await, 0);
        assert_eq!(store.session_count(UserId(2)).await, 1);
    }
}
