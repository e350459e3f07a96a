//! Request-time permission checks.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{error, warn};

use gatehouse_core::error::AppError;
use gatehouse_core::result::AppResult;
use gatehouse_core::types::UserId;
use gatehouse_database::PermissionResolver;

use crate::principal::AuthenticatedPrincipal;

/// Grants or denies an operation based on the caller's effective permissions.
#[derive(Clone)]
pub struct AuthorizationGate {
    resolver: Arc<dyn PermissionResolver>,
}

impl std::fmt::Debug for AuthorizationGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationGate").finish_non_exhaustive()
    }
}

impl AuthorizationGate {
    /// Creates a gate over a permission resolver.
    pub fn new(resolver: Arc<dyn PermissionResolver>) -> Self {
        Self { resolver }
    }

    /// The distinct permission names held by `user_id`.
    pub async fn permissions_for(&self, user_id: UserId) -> AppResult<BTreeSet<String>> {
        self.resolver.resolve(user_id).await
    }

    /// Allow if the principal holds at least one of `required`.
    ///
    /// An empty `required` list denies. A resolver failure denies as well;
    /// the cause is logged, not returned.
    pub async fn require_any(
        &self,
        principal: &AuthenticatedPrincipal,
        required: &[&str],
    ) -> AppResult<()> {
        if required.is_empty() {
            return Err(AppError::unauthorized("No permission grants this operation"));
        }

        let held = match self.resolver.resolve(principal.user_id).await {
            Ok(held) => held,
            Err(e) => {
                error!(user_id = %principal.user_id, error = %e, "Permission resolution failed");
                return Err(AppError::unauthorized("Permission check failed"));
            }
        };

        if required.iter().any(|p| held.contains(*p)) {
            Ok(())
        } else {
            warn!(
                user_id = %principal.user_id,
                required = ?required,
                "Permission denied"
            );
            Err(AppError::unauthorized(format!(
                "Requires one of: {}",
                required.join(", ")
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use gatehouse_core::ErrorKind;
    use gatehouse_core::types::SessionId;

    use super::*;
    use crate::rbac::permissions;

    struct Fixed(Option<Vec<&'static str>>);

    #[async_trait]
    impl PermissionResolver for Fixed {
        async fn resolve(&self, _user_id: UserId) -> AppResult<BTreeSet<String>> {
            match &self.0 {
                Some(names) => Ok(names.iter().map(|n| n.to_string()).collect()),
                None => Err(AppError::storage("connection reset")),
            }
        }
    }

    fn principal() -> AuthenticatedPrincipal {
        AuthenticatedPrincipal::new(UserId(1), SessionId::new())
    }

    #[tokio::test]
    async fn test_any_of_semantics() {
        let gate = AuthorizationGate::new(Arc::new(Fixed(Some(vec![permissions::USER_VIEW]))));
        let p = principal();

        assert!(
            gate.require_any(&p, &[permissions::ROLE_VIEW, permissions::USER_VIEW])
                .await
                .is_ok()
        );
        let err = gate
            .require_any(&p, &[permissions::ROLE_VIEW])
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthorized);
    }

    #[tokio::test]
    async fn test_empty_requirement_denies() {
        let gate = AuthorizationGate::new(Arc::new(Fixed(Some(permissions::ALL.to_vec()))));
        let err = gate.require_any(&principal(), &[]).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthorized);
    }

    #[tokio::test]
    async fn test_resolver_failure_fails_closed() {
        let gate = AuthorizationGate::new(Arc::new(Fixed(None)));
        let err = gate
            .require_any(&principal(), &[permissions::USER_VIEW])
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthorized);
    }
}
