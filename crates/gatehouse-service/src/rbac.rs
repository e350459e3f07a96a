//! The facade every caller goes through.
//!
//! [`RbacService`] wires the session manager, authorization gate, and the
//! onboarding, user, role, and permission services over one set of
//! repositories. Each operation takes an [`OpContext`] and runs under it.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::info;

use gatehouse_auth::session::RefreshResult;
use gatehouse_auth::{
    AuthenticatedPrincipal, AuthorizationGate, ClientMeta, InvitationClaims, LoginResult,
    PasswordHasher, PasswordValidator, SessionCleanup, SessionManager, TokenService,
};
use gatehouse_core::config::AppConfig;
use gatehouse_core::result::AppResult;
use gatehouse_core::types::{PermissionId, RoleId, SessionId, UserId};
use gatehouse_database::Repositories;
use gatehouse_entity::{Permission, Role, RoleWithPermissions, User, UserWithRoles};

use crate::context::OpContext;
use crate::notify::Notifier;
use crate::onboarding::{AccountFields, InvitationStatus, OnboardingService};
use crate::permission::PermissionService;
use crate::role::{NewRoleRequest, RoleService};
use crate::user::UserService;

/// Authentication, onboarding, and role administration in one place.
#[derive(Clone)]
pub struct RbacService {
    sessions: SessionManager,
    gate: AuthorizationGate,
    onboarding: OnboardingService,
    users: UserService,
    roles: RoleService,
    permissions: PermissionService,
    cleanup: SessionCleanup,
}

impl std::fmt::Debug for RbacService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RbacService")
            .field("cleanup", &self.cleanup)
            .finish_non_exhaustive()
    }
}

impl RbacService {
    /// Build every component from configuration.
    ///
    /// Fails with `Configuration` if the password hashing parameters are
    /// unusable.
    pub fn new(
        config: &AppConfig,
        repos: Repositories,
        notifier: Arc<dyn Notifier>,
    ) -> AppResult<Self> {
        let tokens = Arc::new(TokenService::new(&config.auth));
        let hasher = Arc::new(PasswordHasher::new(&config.auth)?);
        let validator = Arc::new(PasswordValidator::new(&config.auth));

        let service = Self {
            sessions: SessionManager::new(
                repos.users.clone(),
                repos.sessions.clone(),
                tokens.clone(),
                hasher.clone(),
            ),
            gate: AuthorizationGate::new(repos.resolver.clone()),
            onboarding: OnboardingService::new(
                repos.clone(),
                tokens,
                hasher.clone(),
                validator.clone(),
                notifier.clone(),
                &config.mail,
            ),
            users: UserService::new(repos.clone(), hasher, validator, notifier),
            roles: RoleService::new(repos.clone()),
            permissions: PermissionService::new(repos.clone()),
            cleanup: SessionCleanup::new(repos.sessions, &config.session),
        };

        info!("RBAC service initialized");
        Ok(service)
    }

    /// A sweeper over the same session store.
    pub fn session_cleanup(&self) -> SessionCleanup {
        self.cleanup.clone()
    }

    // ── Sessions ────────────────────────────────────────────────────

    /// Password login.
    pub async fn login(
        &self,
        ctx: &OpContext,
        email: &str,
        password: &str,
        meta: ClientMeta,
    ) -> AppResult<LoginResult> {
        ctx.run(self.sessions.login(email, password, meta)).await
    }

    /// Login for an email an external identity provider already verified.
    pub async fn login_verified(
        &self,
        ctx: &OpContext,
        email: &str,
        meta: ClientMeta,
    ) -> AppResult<LoginResult> {
        ctx.run(self.sessions.login_verified(email, meta)).await
    }

    /// Exchange a refresh token for a new access token.
    pub async fn refresh_access(
        &self,
        ctx: &OpContext,
        refresh_token: &str,
    ) -> AppResult<RefreshResult> {
        ctx.run(self.sessions.refresh_access(refresh_token)).await
    }

    /// End one session.
    pub async fn logout(&self, ctx: &OpContext, session_id: SessionId) -> AppResult<bool> {
        ctx.run(self.sessions.logout(session_id)).await
    }

    /// End every session of a user.
    pub async fn logout_all(&self, ctx: &OpContext, user_id: UserId) -> AppResult<u64> {
        ctx.run(self.sessions.logout_all(user_id)).await
    }

    /// Verify an access token and its session.
    pub async fn authenticate(
        &self,
        ctx: &OpContext,
        access_token: &str,
    ) -> AppResult<AuthenticatedPrincipal> {
        ctx.run(self.sessions.authenticate(access_token)).await
    }

    // ── Onboarding ──────────────────────────────────────────────────

    /// Invite `email` with `role_ids`.
    pub async fn invite(
        &self,
        ctx: &OpContext,
        inviter: UserId,
        email: &str,
        role_ids: &[RoleId],
    ) -> AppResult<InvitationStatus> {
        ctx.run(async {
            let process = self.onboarding.invite(inviter, email, role_ids).await?;
            Ok(InvitationStatus {
                process,
                is_expired: false,
            })
        })
        .await
    }

    /// Register from an already verified invitation identity.
    pub async fn register(
        &self,
        ctx: &OpContext,
        verified_email: &str,
        verified_role_ids: &[RoleId],
        fields: AccountFields,
    ) -> AppResult<User> {
        ctx.run(
            self.onboarding
                .register(verified_email, verified_role_ids, fields),
        )
        .await
    }

    /// Check an invitation token without consuming it.
    pub fn verify_invitation(&self, invitation_token: &str) -> AppResult<InvitationClaims> {
        self.onboarding.verify_invitation(invitation_token)
    }

    /// Verify an invitation token, then register.
    pub async fn register_with_token(
        &self,
        ctx: &OpContext,
        invitation_token: &str,
        fields: AccountFields,
    ) -> AppResult<User> {
        ctx.run(self.onboarding.register_with_token(invitation_token, fields))
            .await
    }

    /// The invitation record for `email`.
    pub async fn invitation_status(
        &self,
        ctx: &OpContext,
        email: &str,
    ) -> AppResult<InvitationStatus> {
        ctx.run(self.onboarding.invitation_status(email)).await
    }

    // ── Accounts ────────────────────────────────────────────────────

    /// Change a password after checking the current one.
    pub async fn reset_password(
        &self,
        ctx: &OpContext,
        user_id: UserId,
        old_password: &str,
        new_password: &str,
    ) -> AppResult<()> {
        ctx.run(self.users.reset_password(user_id, old_password, new_password))
            .await
    }

    /// Users with their active roles.
    pub async fn list_users(
        &self,
        ctx: &OpContext,
        email_filter: Option<&str>,
    ) -> AppResult<Vec<UserWithRoles>> {
        ctx.run(self.users.list_users(email_filter)).await
    }

    /// Create an account without an invitation.
    #[allow(clippy::too_many_arguments)]
    pub async fn create_user(
        &self,
        ctx: &OpContext,
        granted_by: Option<UserId>,
        email: &str,
        password: &str,
        first_name: &str,
        last_name: &str,
        role_ids: &[RoleId],
    ) -> AppResult<User> {
        ctx.run(self.users.create_user(
            granted_by, email, password, first_name, last_name, role_ids,
        ))
        .await
    }

    // ── Authorization ───────────────────────────────────────────────

    /// Distinct permission names held by `user_id`.
    pub async fn permissions_for(
        &self,
        ctx: &OpContext,
        user_id: UserId,
    ) -> AppResult<BTreeSet<String>> {
        ctx.run(self.gate.permissions_for(user_id)).await
    }

    /// Allow if `principal` holds any of `required`.
    pub async fn authorize(
        &self,
        ctx: &OpContext,
        principal: &AuthenticatedPrincipal,
        required: &[&str],
    ) -> AppResult<()> {
        ctx.run(self.gate.require_any(principal, required)).await
    }

    // ── Roles and permissions ───────────────────────────────────────

    /// Create a role with its initial permissions.
    pub async fn create_role(
        &self,
        ctx: &OpContext,
        actor: Option<UserId>,
        req: NewRoleRequest,
    ) -> AppResult<Role> {
        ctx.run(self.roles.create_role(actor, req)).await
    }

    /// Active roles matching `name_filter`.
    pub async fn list_roles(&self, ctx: &OpContext, name_filter: Option<&str>) -> AppResult<Vec<Role>> {
        ctx.run(self.roles.list_roles(name_filter)).await
    }

    /// Roles matching `name_filter` with their permissions.
    pub async fn roles_with_permissions(
        &self,
        ctx: &OpContext,
        name_filter: Option<&str>,
    ) -> AppResult<Vec<RoleWithPermissions>> {
        ctx.run(self.roles.roles_with_permissions(name_filter)).await
    }

    /// Activate or deactivate a role.
    pub async fn set_role_active(
        &self,
        ctx: &OpContext,
        role_id: RoleId,
        active: bool,
    ) -> AppResult<()> {
        ctx.run(self.roles.set_role_active(role_id, active)).await
    }

    /// Give a user an active role.
    pub async fn assign_role(
        &self,
        ctx: &OpContext,
        actor: UserId,
        user_id: UserId,
        role_id: RoleId,
    ) -> AppResult<()> {
        ctx.run(self.roles.assign_role(actor, user_id, role_id)).await
    }

    /// Grant a permission to a role.
    pub async fn grant_permission(
        &self,
        ctx: &OpContext,
        actor: UserId,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> AppResult<()> {
        ctx.run(self.roles.grant_permission(actor, role_id, permission_id))
            .await
    }

    /// Create the permission `resource.action`.
    pub async fn create_permission(
        &self,
        ctx: &OpContext,
        actor: Option<UserId>,
        resource: &str,
        action: &str,
        description: Option<String>,
    ) -> AppResult<Permission> {
        ctx.run(
            self.permissions
                .create_permission(actor, resource, action, description),
        )
        .await
    }

    /// Permissions matching `name_filter`.
    pub async fn search_permissions(
        &self,
        ctx: &OpContext,
        name_filter: Option<&str>,
    ) -> AppResult<Vec<Permission>> {
        ctx.run(self.permissions.search_permissions(name_filter))
            .await
    }
}

#[cfg(test)]
mod tests {
    use tokio_util::sync::CancellationToken;

    use gatehouse_auth::rbac::permissions;
    use gatehouse_core::ErrorKind;
    use gatehouse_database::MemoryStore;

    use super::*;
    use crate::notify::RecordingNotifier;

    fn config() -> AppConfig {
        let mut config = AppConfig::default();
        config.auth.argon2_memory_kib = 1024;
        config.auth.argon2_iterations = 1;
        config
    }

    struct Fixture {
        service: RbacService,
        notifier: RecordingNotifier,
        ctx: OpContext,
        admin: UserId,
        viewer: RoleId,
    }

    async fn fixture() -> Fixture {
        let notifier = RecordingNotifier::new();
        let service = RbacService::new(
            &config(),
            Repositories::memory(MemoryStore::new()),
            Arc::new(notifier.clone()),
        )
        .unwrap();
        let ctx = OpContext::new();

        let mut all = Vec::new();
        for name in permissions::ALL {
            let (resource, action) = permissions::split(name).unwrap();
            let p = service
                .create_permission(&ctx, None, resource, action, None)
                .await
                .unwrap();
            all.push(p.id);
        }
        let view = service
            .search_permissions(&ctx, Some(permissions::USER_VIEW))
            .await
            .unwrap()[0]
            .id;

        let admin_role = service
            .create_role(
                &ctx,
                None,
                NewRoleRequest {
                    name: "admin".to_string(),
                    description: None,
                    permission_ids: all,
                },
            )
            .await
            .unwrap();
        let viewer = service
            .create_role(
                &ctx,
                None,
                NewRoleRequest {
                    name: "viewer".to_string(),
                    description: None,
                    permission_ids: vec![view],
                },
            )
            .await
            .unwrap();

        let admin = service
            .create_user(&ctx, None, "admin@x.com", "adminpass", "Ada", "Min", &[admin_role.id])
            .await
            .unwrap();

        Fixture {
            service,
            notifier,
            ctx,
            admin: admin.id,
            viewer: viewer.id,
        }
    }

    #[tokio::test]
    async fn test_invite_register_login_authorize() {
        let f = fixture().await;
        let status = f
            .service
            .invite(&f.ctx, f.admin, "bob@x.com", &[f.viewer])
            .await
            .unwrap();
        assert!(!status.is_expired);

        let token = f.notifier.invitation_token("bob@x.com").unwrap();
        let bob = f
            .service
            .register_with_token(
                &f.ctx,
                &token,
                AccountFields {
                    first_name: "Bob".to_string(),
                    last_name: "B".to_string(),
                    password: "bobpass1".to_string(),
                },
            )
            .await
            .unwrap();

        let login = f
            .service
            .login(&f.ctx, "bob@x.com", "bobpass1", ClientMeta::default())
            .await
            .unwrap();
        let principal = f
            .service
            .authenticate(&f.ctx, &login.access_token)
            .await
            .unwrap();
        assert_eq!(principal.user_id, bob.id);

        f.service
            .authorize(&f.ctx, &principal, &[permissions::USER_VIEW])
            .await
            .unwrap();
        let err = f
            .service
            .authorize(&f.ctx, &principal, &[permissions::USER_CREATE])
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthorized);

        assert!(f.service.logout(&f.ctx, login.session_id).await.unwrap());
        let err = f
            .service
            .authenticate(&f.ctx, &login.access_token)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::SessionRevoked);
    }

    #[tokio::test]
    async fn test_admin_holds_every_builtin_permission() {
        let f = fixture().await;
        let held = f.service.permissions_for(&f.ctx, f.admin).await.unwrap();
        for name in permissions::ALL {
            assert!(held.contains(*name), "{name}");
        }
    }

    #[tokio::test]
    async fn test_cancelled_context_short_circuits() {
        let f = fixture().await;
        let cancel = CancellationToken::new();
        let ctx = OpContext::new().with_cancellation(cancel.clone());
        cancel.cancel();

        let err = f
            .service
            .invite(&ctx, f.admin, "late@x.com", &[f.viewer])
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Cancelled);

        let err = f
            .service
            .invitation_status(&f.ctx, "late@x.com")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvitationNotFound);
    }
}
