//! In-memory implementations of every repository trait.
//!
//! All state lives behind one `tokio::sync::Mutex`, and every trait method
//! runs as a single critical section. Multi-step operations such as
//! registration and invite upserts are therefore atomic, mirroring what the
//! Postgres backend gets from transactions and unique indexes. Used by the
//! test suites and by `--memory` development runs.

mod repos;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tokio::sync::Mutex;

use gatehouse_core::types::{PermissionId, RoleId, SessionId, UserId};
use gatehouse_entity::{OnboardingProcess, Permission, Role, Session, User};

/// Shared in-memory store. Cloning shares the underlying state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

#[derive(Debug, Default)]
struct State {
    users: BTreeMap<UserId, User>,
    roles: BTreeMap<RoleId, Role>,
    permissions: BTreeMap<PermissionId, Permission>,
    user_roles: Vec<UserRoleEdge>,
    role_permissions: Vec<RolePermissionEdge>,
    onboarding: HashMap<String, OnboardingProcess>,
    sessions: HashMap<SessionId, Session>,
    next_user_id: i64,
    next_role_id: i64,
    next_permission_id: i64,
    next_session_row: i64,
}

#[derive(Debug, Clone)]
struct UserRoleEdge {
    user_id: UserId,
    role_id: RoleId,
    #[allow(dead_code)]
    added_by: UserId,
    is_active: bool,
}

#[derive(Debug, Clone)]
struct RolePermissionEdge {
    role_id: RoleId,
    permission_id: PermissionId,
    #[allow(dead_code)]
    added_by: Option<UserId>,
}

impl State {
    fn next_user_id(&mut self) -> UserId {
        self.next_user_id += 1;
        UserId(self.next_user_id)
    }

    fn next_role_id(&mut self) -> RoleId {
        self.next_role_id += 1;
        RoleId(self.next_role_id)
    }

    fn next_permission_id(&mut self) -> PermissionId {
        self.next_permission_id += 1;
        PermissionId(self.next_permission_id)
    }

    fn next_session_row(&mut self) -> i64 {
        self.next_session_row += 1;
        self.next_session_row
    }

    fn active_user_by_email(&self, email: &str) -> Option<&User> {
        self.users
            .values()
            .find(|u| u.is_active && u.email.eq_ignore_ascii_case(email))
    }

    fn active_roles_for(&self, user_id: UserId) -> Vec<Role> {
        let mut roles: Vec<Role> = self
            .user_roles
            .iter()
            .filter(|e| e.user_id == user_id && e.is_active)
            .filter_map(|e| self.roles.get(&e.role_id))
            .filter(|r| r.is_active)
            .cloned()
            .collect();
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        roles
    }

    fn permissions_for_role(&self, role_id: RoleId) -> Vec<Permission> {
        let mut permissions: Vec<Permission> = self
            .role_permissions
            .iter()
            .filter(|e| e.role_id == role_id)
            .filter_map(|e| self.permissions.get(&e.permission_id))
            .cloned()
            .collect();
        permissions.sort_by(|a, b| a.name.cmp(&b.name));
        permissions
    }
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of user rows, active or not.
    pub async fn user_count(&self) -> usize {
        self.state.lock().await.users.len()
    }

    /// Number of user-role edges for `user_id`.
    pub async fn role_edge_count(&self, user_id: UserId) -> usize {
        self.state
            .lock()
            .await
            .user_roles
            .iter()
            .filter(|e| e.user_id == user_id)
            .count()
    }

    /// Number of onboarding rows.
    pub async fn onboarding_count(&self) -> usize {
        self.state.lock().await.onboarding.len()
    }

    /// Number of session rows for `user_id`.
    pub async fn session_count(&self, user_id: UserId) -> usize {
        self.state
            .lock()
            .await
            .sessions
            .values()
            .filter(|s| s.user_id == user_id)
            .count()
    }
}

fn email_key(email: &str) -> String {
    email.trim().to_lowercase()
}

fn contains_ci(haystack: &str, filter: Option<&str>) -> bool {
    match filter.map(str::trim).filter(|f| !f.is_empty()) {
        Some(f) => haystack.to_lowercase().contains(&f.to_lowercase()),
        None => true,
    }
}
