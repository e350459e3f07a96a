//! Permission catalogue.

use tracing::info;

use gatehouse_auth::rbac::permissions;
use gatehouse_core::error::AppError;
use gatehouse_core::result::AppResult;
use gatehouse_core::types::UserId;
use gatehouse_database::Repositories;
use gatehouse_entity::{NewPermission, Permission};

/// Creates and searches `resource.action` permissions.
#[derive(Clone)]
pub struct PermissionService {
    repos: Repositories,
}

impl std::fmt::Debug for PermissionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionService").finish_non_exhaustive()
    }
}

impl PermissionService {
    /// Creates a permission service.
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    /// Create the permission `resource.action`.
    ///
    /// Both parts are lowercased and must be non-empty without dots.
    pub async fn create_permission(
        &self,
        actor: Option<UserId>,
        resource: &str,
        action: &str,
        description: Option<String>,
    ) -> AppResult<Permission> {
        let resource = resource.trim().to_lowercase();
        let action = action.trim().to_lowercase();
        let name = format!("{resource}.{action}");
        if permissions::split(&name).is_none() || resource.contains('.') {
            return Err(AppError::validation(format!(
                "Invalid permission name '{name}', expected resource.action"
            )));
        }

        let permission = self
            .repos
            .permissions
            .insert(NewPermission {
                resource,
                action,
                description: description.filter(|d| !d.trim().is_empty()),
                created_by: actor,
            })
            .await?;

        info!(permission_id = %permission.id, name = %permission.name, "Permission created");
        Ok(permission)
    }

    /// Permissions whose name contains `name_filter`.
    pub async fn search_permissions(&self, name_filter: Option<&str>) -> AppResult<Vec<Permission>> {
        self.repos.permissions.search(name_filter).await
    }
}

#[cfg(test)]
mod tests {
    use gatehouse_core::ErrorKind;
    use gatehouse_database::MemoryStore;

    use super::*;

    #[tokio::test]
    async fn test_create_and_search() {
        let service = PermissionService::new(Repositories::memory(MemoryStore::new()));
        let created = service
            .create_permission(None, "Report", "Export", None)
            .await
            .unwrap();
        assert_eq!(created.name, "report.export");

        service
            .create_permission(Some(UserId(1)), "report", "view", Some("Read reports".into()))
            .await
            .unwrap();
        assert_eq!(service.search_permissions(Some("report")).await.unwrap().len(), 2);
        assert_eq!(service.search_permissions(Some("EXPORT")).await.unwrap().len(), 1);

        let err = service
            .create_permission(None, "report", "export", None)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_rejects_malformed_names() {
        let service = PermissionService::new(Repositories::memory(MemoryStore::new()));
        for (resource, action) in [("", "view"), ("user", ""), ("a.b", "c"), ("user", "x.y")] {
            let err = service
                .create_permission(None, resource, action, None)
                .await
                .unwrap_err();
            assert_eq!(err.kind, ErrorKind::Validation, "{resource}.{action}");
        }
    }
}
