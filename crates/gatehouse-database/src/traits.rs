//! Repository interfaces consumed by the auth and service layers.
//!
//! Each trait is one capability set with one implementation per backend
//! (see [`crate::postgres`] and [`crate::memory`]). Callers hold them as
//! `Arc<dyn Trait>` and never branch on which backend is behind it.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use gatehouse_core::result::AppResult;
use gatehouse_core::types::{PermissionId, RoleId, SessionId, UserId};
use gatehouse_entity::{
    NewOnboarding, NewPermission, NewRole, NewSession, NewUser, OnboardingProcess, Permission,
    Role, RoleWithPermissions, Session, User, UserWithRoles,
};

/// Principal storage.
#[async_trait]
pub trait UserRepo: Send + Sync + 'static {
    /// Find the active principal owning `email` (case-insensitive).
    async fn find_active_by_email(&self, email: &str) -> AppResult<Option<User>>;

    /// Find a principal by id, active or not.
    async fn find_by_id(&self, id: UserId) -> AppResult<Option<User>>;

    /// Insert a principal outside of any registration unit.
    ///
    /// Fails with `AlreadyRegistered` when an active principal owns the email.
    async fn insert(&self, user: NewUser) -> AppResult<User>;

    /// Overwrite the stored password hash.
    async fn update_password_hash(&self, id: UserId, password_hash: &str) -> AppResult<()>;

    /// List users (newest first, at most 50) with their active roles.
    async fn list_with_roles(&self, email_filter: Option<&str>) -> AppResult<Vec<UserWithRoles>>;
}

/// Role storage.
#[async_trait]
pub trait RoleRepo: Send + Sync + 'static {
    /// Find a role by id, active or not.
    async fn find_by_id(&self, id: RoleId) -> AppResult<Option<Role>>;

    /// Find a role by exact name.
    async fn find_by_name(&self, name: &str) -> AppResult<Option<Role>>;

    /// Active roles whose name contains `name_filter` (case-insensitive).
    async fn find_active(&self, name_filter: Option<&str>) -> AppResult<Vec<Role>>;

    /// All roles whose name contains `name_filter`.
    async fn list(&self, name_filter: Option<&str>) -> AppResult<Vec<Role>>;

    /// Insert a role and its permission edges as one unit.
    ///
    /// Fails with `Conflict` on a duplicate name.
    async fn insert(&self, role: NewRole, permission_ids: &[PermissionId]) -> AppResult<Role>;

    /// Flip the soft active flag. Fails with `NotFound` for an unknown id.
    async fn set_active(&self, id: RoleId, active: bool) -> AppResult<()>;

    /// Roles matching `name_filter` together with their granted permissions.
    async fn list_with_permissions(
        &self,
        name_filter: Option<&str>,
    ) -> AppResult<Vec<RoleWithPermissions>>;
}

/// Permission storage.
#[async_trait]
pub trait PermissionRepo: Send + Sync + 'static {
    /// Find a permission by id.
    async fn find_by_id(&self, id: PermissionId) -> AppResult<Option<Permission>>;

    /// Permissions whose name contains `name_filter` (case-insensitive).
    async fn search(&self, name_filter: Option<&str>) -> AppResult<Vec<Permission>>;

    /// Insert a permission named `resource.action`.
    ///
    /// Fails with `Conflict` on a duplicate name.
    async fn insert(&self, permission: NewPermission) -> AppResult<Permission>;
}

/// User-to-role edges.
#[async_trait]
pub trait RoleAssignmentRepo: Send + Sync + 'static {
    /// Add one edge. Fails with `Conflict` if the edge already exists.
    async fn insert(&self, user_id: UserId, role_id: RoleId, granted_by: UserId) -> AppResult<()>;

    /// Active roles reachable through the user's active edges.
    async fn roles_for_user(&self, user_id: UserId) -> AppResult<Vec<Role>>;
}

/// Role-to-permission edges.
#[async_trait]
pub trait RolePermissionRepo: Send + Sync + 'static {
    /// Add one edge. Fails with `Conflict` if the edge already exists.
    async fn insert(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
        granted_by: UserId,
    ) -> AppResult<()>;

    /// Permissions granted to a role.
    async fn permissions_for_role(&self, role_id: RoleId) -> AppResult<Vec<Permission>>;
}

/// Walks user -> active edges -> active roles -> edges -> active permissions.
#[async_trait]
pub trait PermissionResolver: Send + Sync + 'static {
    /// Distinct permission names held by the user.
    async fn resolve(&self, user_id: UserId) -> AppResult<BTreeSet<String>>;
}

/// Invitation records.
#[async_trait]
pub trait OnboardingRepo: Send + Sync + 'static {
    /// Find the record for `email` (case-insensitive).
    async fn find_by_email(&self, email: &str) -> AppResult<Option<OnboardingProcess>>;

    /// Create the record, or replace it if the existing one is expired or
    /// completed.
    ///
    /// Fails with `AlreadyInvited` if a pending, unexpired record exists.
    /// The check and the write are a single storage-level step, so of two
    /// concurrent invites for one email only one succeeds.
    async fn upsert_invitation(&self, record: NewOnboarding) -> AppResult<OnboardingProcess>;
}

/// The registration unit of work.
#[async_trait]
pub trait AccountRegistrar: Send + Sync + 'static {
    /// Atomically insert the principal, one role edge per id (granted by
    /// `granted_by`), and mark the invitation for the email completed.
    ///
    /// Fails with `AlreadyRegistered` on a duplicate active email and with
    /// `InvitationNotFound` if no pending invitation remains. On any
    /// failure nothing is written.
    async fn register(
        &self,
        user: NewUser,
        role_ids: &[RoleId],
        granted_by: UserId,
    ) -> AppResult<User>;

    /// Atomically insert the principal and one role edge per distinct id,
    /// without touching onboarding state.
    ///
    /// Edges are granted by `granted_by`, or by the new principal when
    /// absent. Fails with `AlreadyRegistered` on a duplicate active email
    /// and with `RoleNotActive` if a role is missing or inactive. On any
    /// failure nothing is written.
    async fn create(
        &self,
        user: NewUser,
        role_ids: &[RoleId],
        granted_by: Option<UserId>,
    ) -> AppResult<User>;
}

/// Login session records.
#[async_trait]
pub trait SessionRepo: Send + Sync + 'static {
    /// Record a login.
    async fn insert(&self, session: NewSession) -> AppResult<Session>;

    /// Find a session by its token identifier.
    async fn find_by_jti(&self, jti: SessionId) -> AppResult<Option<Session>>;

    /// Extend an active session's expiry and bump `last_activity`.
    ///
    /// Returns `false` if no active session matched.
    async fn touch(&self, jti: SessionId, expires_at: DateTime<Utc>) -> AppResult<bool>;

    /// Deactivate one session. Returns `false` if it was already inactive or missing.
    async fn deactivate(&self, jti: SessionId) -> AppResult<bool>;

    /// Deactivate every active session of the user; returns how many changed.
    async fn deactivate_all_for_principal(&self, user_id: UserId) -> AppResult<u64>;

    /// Delete sessions that expired, or were deactivated, before `older_than`.
    async fn purge_expired(&self, older_than: DateTime<Utc>) -> AppResult<u64>;
}
