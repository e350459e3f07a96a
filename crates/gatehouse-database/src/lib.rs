//! # gatehouse-database
//!
//! Repository interfaces for every Gatehouse entity, with a PostgreSQL
//! implementation for deployments and an in-memory one for tests and
//! local runs.

pub mod connection;
pub mod memory;
pub mod migration;
pub mod postgres;
pub mod traits;

use std::sync::Arc;

use sqlx::PgPool;

use gatehouse_core::types::RoleId;

pub use connection::DatabasePool;
pub use memory::MemoryStore;
pub use traits::{
    AccountRegistrar, OnboardingRepo, PermissionRepo, PermissionResolver, RoleAssignmentRepo,
    RolePermissionRepo, RoleRepo, SessionRepo, UserRepo,
};

/// Every repository the upper layers need, behind trait objects.
#[derive(Clone)]
pub struct Repositories {
    /// Principals.
    pub users: Arc<dyn UserRepo>,
    /// Roles.
    pub roles: Arc<dyn RoleRepo>,
    /// Permissions.
    pub permissions: Arc<dyn PermissionRepo>,
    /// User-to-role edges.
    pub role_assignments: Arc<dyn RoleAssignmentRepo>,
    /// Role-to-permission edges.
    pub role_permissions: Arc<dyn RolePermissionRepo>,
    /// Effective permission lookup.
    pub resolver: Arc<dyn PermissionResolver>,
    /// Invitation records.
    pub onboarding: Arc<dyn OnboardingRepo>,
    /// Registration unit of work.
    pub registrar: Arc<dyn AccountRegistrar>,
    /// Login sessions.
    pub sessions: Arc<dyn SessionRepo>,
}

impl Repositories {
    /// Build the PostgreSQL-backed set over one pool.
    pub fn postgres(pool: PgPool) -> Self {
        use crate::postgres::{
            PgAccountRegistrar, PgOnboardingRepository, PgPermissionRepository,
            PgPermissionResolver, PgRoleAssignmentRepository, PgRolePermissionRepository,
            PgRoleRepository, PgSessionRepository, PgUserRepository,
        };

        Self {
            users: Arc::new(PgUserRepository::new(pool.clone())),
            roles: Arc::new(PgRoleRepository::new(pool.clone())),
            permissions: Arc::new(PgPermissionRepository::new(pool.clone())),
            role_assignments: Arc::new(PgRoleAssignmentRepository::new(pool.clone())),
            role_permissions: Arc::new(PgRolePermissionRepository::new(pool.clone())),
            resolver: Arc::new(PgPermissionResolver::new(pool.clone())),
            onboarding: Arc::new(PgOnboardingRepository::new(pool.clone())),
            registrar: Arc::new(PgAccountRegistrar::new(pool.clone())),
            sessions: Arc::new(PgSessionRepository::new(pool)),
        }
    }

    /// Build the in-memory set; all repositories share `store`.
    pub fn memory(store: MemoryStore) -> Self {
        Self {
            users: Arc::new(store.clone()),
            roles: Arc::new(store.clone()),
            permissions: Arc::new(store.clone()),
            role_assignments: Arc::new(store.clone()),
            role_permissions: Arc::new(store.clone()),
            resolver: Arc::new(store.clone()),
            onboarding: Arc::new(store.clone()),
            registrar: Arc::new(store.clone()),
            sessions: Arc::new(store),
        }
    }
}

/// Drop repeated role ids, keeping first-seen order.
pub(crate) fn distinct_roles(role_ids: &[RoleId]) -> Vec<RoleId> {
    let mut seen = Vec::with_capacity(role_ids.len());
    for id in role_ids {
        if !seen.contains(id) {
            seen.push(*id);
        }
    }
    seen
}

impl std::fmt::Debug for Repositories {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repositories").finish_non_exhaustive()
    }
}
