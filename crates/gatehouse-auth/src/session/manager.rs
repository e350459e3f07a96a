//! Session lifecycle manager: login, refresh, logout, validation.

use std::net::IpAddr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use gatehouse_core::error::AppError;
use gatehouse_core::result::AppResult;
use gatehouse_core::types::{SessionId, UserId};
use gatehouse_database::{SessionRepo, UserRepo};
use gatehouse_entity::{NewSession, Session, User};

use crate::jwt::{TokenKind, TokenService};
use crate::password::PasswordHasher;
use crate::principal::AuthenticatedPrincipal;

/// Client details recorded with a session.
#[derive(Debug, Clone, Default)]
pub struct ClientMeta {
    /// Remote address, when known.
    pub ip: Option<IpAddr>,
    /// `User-Agent` header, when present.
    pub user_agent: Option<String>,
}

/// Tokens handed out by a successful login.
#[derive(Clone, Serialize, Deserialize)]
pub struct LoginResult {
    /// Access token.
    pub access_token: String,
    /// Refresh token.
    pub refresh_token: String,
    /// Access token expiry.
    pub access_expires_at: DateTime<Utc>,
    /// Refresh token expiry.
    pub refresh_expires_at: DateTime<Utc>,
    /// The authenticated user.
    pub user_id: UserId,
    /// The new session.
    pub session_id: SessionId,
}

impl std::fmt::Debug for LoginResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginResult")
            .field("access_expires_at", &self.access_expires_at)
            .field("refresh_expires_at", &self.refresh_expires_at)
            .field("user_id", &self.user_id)
            .field("session_id", &self.session_id)
            .finish_non_exhaustive()
    }
}

/// A new access token obtained through refresh.
#[derive(Clone, Serialize, Deserialize)]
pub struct RefreshResult {
    /// Access token.
    pub access_token: String,
    /// Access token expiry.
    pub access_expires_at: DateTime<Utc>,
}

impl std::fmt::Debug for RefreshResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshResult")
            .field("access_expires_at", &self.access_expires_at)
            .finish_non_exhaustive()
    }
}

/// Manages the complete session lifecycle.
#[derive(Clone)]
pub struct SessionManager {
    users: Arc<dyn UserRepo>,
    sessions: Arc<dyn SessionRepo>,
    tokens: Arc<TokenService>,
    hasher: Arc<PasswordHasher>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("tokens", &self.tokens)
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    /// Creates a session manager.
    pub fn new(
        users: Arc<dyn UserRepo>,
        sessions: Arc<dyn SessionRepo>,
        tokens: Arc<TokenService>,
        hasher: Arc<PasswordHasher>,
    ) -> Self {
        Self {
            users,
            sessions,
            tokens,
            hasher,
        }
    }

    /// Password login.
    ///
    /// 1. Find the active user by email (decoy verify when absent)
    /// 2. Verify the password
    /// 3. Issue access and refresh tokens under a fresh `jti`
    /// 4. Persist the session; no tokens are returned if this fails
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        meta: ClientMeta,
    ) -> AppResult<LoginResult> {
        let Some(user) = self.users.find_active_by_email(email).await? else {
            self.hasher.verify_decoy(password).await;
            debug!("Login attempt for unknown principal");
            return Err(AppError::principal_not_found("No active principal for email"));
        };

        if !self.hasher.verify(password, &user.password_hash).await? {
            warn!(user_id = %user.id, "Login failed: wrong password");
            return Err(AppError::invalid_credential("Password does not match"));
        }

        self.open_session(&user, meta).await
    }

    /// Login for an email already verified by an external identity provider.
    pub async fn login_verified(&self, email: &str, meta: ClientMeta) -> AppResult<LoginResult> {
        let user = self
            .users
            .find_active_by_email(email)
            .await?
            .ok_or_else(|| AppError::principal_not_found("No active principal for email"))?;

        self.open_session(&user, meta).await
    }

    async fn open_session(&self, user: &User, meta: ClientMeta) -> AppResult<LoginResult> {
        let jti = SessionId::new();
        let now = Utc::now();
        let access = self.tokens.issue_access(user.id, jti, now)?;
        let refresh = self.tokens.issue_refresh(user.id, jti, now)?;

        self.sessions
            .insert(NewSession {
                user_id: user.id,
                jti,
                ip_address: meta.ip.map(|ip| ip.to_string()),
                user_agent: meta.user_agent,
                expires_at: access.claims.expires_at(),
            })
            .await?;

        info!(user_id = %user.id, session_id = %jti, "Login successful");

        Ok(LoginResult {
            access_expires_at: access.claims.expires_at(),
            refresh_expires_at: refresh.claims.expires_at(),
            access_token: access.token,
            refresh_token: refresh.token,
            user_id: user.id,
            session_id: jti,
        })
    }

    /// Exchange a refresh token for a new access token.
    ///
    /// The session named by the token must still be active. On success its
    /// expiry moves to the new access token's expiry.
    pub async fn refresh_access(&self, refresh_token: &str) -> AppResult<RefreshResult> {
        let claims = self
            .tokens
            .verify_session(refresh_token, TokenKind::Refresh)?;

        let session = self
            .sessions
            .find_by_jti(claims.jti)
            .await?
            .filter(|s| s.is_active && s.user_id == claims.id)
            .ok_or_else(|| AppError::session_revoked("Session is no longer active"))?;

        let access = self.tokens.issue_access(claims.id, claims.jti, Utc::now())?;
        if !self
            .sessions
            .touch(session.jti, access.claims.expires_at())
            .await?
        {
            return Err(AppError::session_revoked("Session is no longer active"));
        }

        debug!(user_id = %claims.id, session_id = %claims.jti, "Access token refreshed");

        Ok(RefreshResult {
            access_expires_at: access.claims.expires_at(),
            access_token: access.token,
        })
    }

    /// Deactivate one session. Returns `false` if it was not active.
    pub async fn logout(&self, session_id: SessionId) -> AppResult<bool> {
        let changed = self.sessions.deactivate(session_id).await?;
        info!(session_id = %session_id, changed, "Logout");
        Ok(changed)
    }

    /// Deactivate every session of a user.
    pub async fn logout_all(&self, user_id: UserId) -> AppResult<u64> {
        let count = self.sessions.deactivate_all_for_principal(user_id).await?;
        info!(user_id = %user_id, count, "Logged out all sessions");
        Ok(count)
    }

    /// The session must exist, be active, and not be past its expiry.
    pub async fn validate_session(&self, session_id: SessionId) -> AppResult<Session> {
        let now = Utc::now();
        self.sessions
            .find_by_jti(session_id)
            .await?
            .filter(|s| s.is_valid_at(now))
            .ok_or_else(|| AppError::session_revoked("Session is not valid"))
    }

    /// Verify an access token and its session, yielding the caller.
    pub async fn authenticate(&self, access_token: &str) -> AppResult<AuthenticatedPrincipal> {
        let claims = self
            .tokens
            .verify_session(access_token, TokenKind::Access)?;
        let session = self.validate_session(claims.jti).await?;
        if session.user_id != claims.id {
            return Err(AppError::session_revoked("Session belongs to another principal"));
        }
        Ok(AuthenticatedPrincipal::new(claims.id, claims.jti))
    }
}

#[cfg(test)]
mod tests {
    use gatehouse_core::ErrorKind;
    use gatehouse_core::config::AuthConfig;
    use gatehouse_database::MemoryStore;
    use gatehouse_entity::NewUser;

    use super::*;

    struct Fixture {
        store: MemoryStore,
        manager: SessionManager,
        user_id: UserId,
    }

    async fn fixture() -> Fixture {
        let config = AuthConfig {
            argon2_memory_kib: 1024,
            argon2_iterations: 1,
            ..AuthConfig::default()
        };
        let store = MemoryStore::new();
        let hasher = Arc::new(PasswordHasher::new(&config).unwrap());
        let digest = hasher.hash("hunter22").await.unwrap();
        let user = UserRepo::insert(
            &store,
            NewUser {
                email: "alice@x.com".to_string(),
                password_hash: digest,
                first_name: "Alice".to_string(),
                last_name: "Liddell".to_string(),
            },
        )
        .await
        .unwrap();

        let manager = SessionManager::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(TokenService::new(&config)),
            hasher,
        );
        Fixture {
            store,
            manager,
            user_id: user.id,
        }
    }

    #[tokio::test]
    async fn test_login_persists_session_bound_to_tokens() {
        let f = fixture().await;
        let result = f
            .manager
            .login("ALICE@x.com", "hunter22", ClientMeta::default())
            .await
            .unwrap();

        assert_eq!(result.user_id, f.user_id);
        assert_eq!(f.store.session_count(f.user_id).await, 1);

        let principal = f.manager.authenticate(&result.access_token).await.unwrap();
        assert_eq!(principal.session_id, result.session_id);
        assert!(!format!("{result:?}").contains(&result.access_token));
    }

    #[tokio::test]
    async fn test_login_failures_are_distinguished_internally() {
        let f = fixture().await;
        let err = f
            .manager
            .login("alice@x.com", "wrong-pass", ClientMeta::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidCredential);

        let err = f
            .manager
            .login("nobody@x.com", "hunter22", ClientMeta::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::PrincipalNotFound);
        assert_eq!(f.store.session_count(f.user_id).await, 0);
    }

    #[tokio::test]
    async fn test_refresh_requires_active_session() {
        let f = fixture().await;
        let login = f
            .manager
            .login("alice@x.com", "hunter22", ClientMeta::default())
            .await
            .unwrap();

        let refreshed = f.manager.refresh_access(&login.refresh_token).await.unwrap();
        let principal = f.manager.authenticate(&refreshed.access_token).await.unwrap();
        assert_eq!(principal.session_id, login.session_id);

        assert!(f.manager.logout(login.session_id).await.unwrap());
        let err = f
            .manager
            .refresh_access(&login.refresh_token)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::SessionRevoked);

        let err = f.manager.authenticate(&login.access_token).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::SessionRevoked);
    }

    #[tokio::test]
    async fn test_access_token_cannot_refresh() {
        let f = fixture().await;
        let login = f
            .manager
            .login("alice@x.com", "hunter22", ClientMeta::default())
            .await
            .unwrap();
        let err = f
            .manager
            .refresh_access(&login.access_token)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::TokenKindMismatch);
    }

    #[tokio::test]
    async fn test_logout_all_deactivates_every_session() {
        let f = fixture().await;
        for _ in 0..3 {
            f.manager
                .login("alice@x.com", "hunter22", ClientMeta::default())
                .await
                .unwrap();
        }
        assert_eq!(f.manager.logout_all(f.user_id).await.unwrap(), 3);
        assert_eq!(f.manager.logout_all(f.user_id).await.unwrap(), 0);
    }
}
