//! Seeds the built-in permissions and an `admin` role holding all of them.
//!
//! Safe to run repeatedly: existing permissions and roles are left alone.

use gatehouse_auth::rbac::permissions;
use gatehouse_core::config::AppConfig;
use gatehouse_core::error::AppError;
use gatehouse_core::types::PermissionId;
use gatehouse_service::{NewRoleRequest, OpContext, RbacService};

use crate::output;

/// Name of the seeded administrator role.
pub const ADMIN_ROLE: &str = "admin";

/// Execute the seed command.
pub async fn execute(config: &AppConfig) -> Result<(), AppError> {
    let service = super::connect_service(config).await?;
    let ctx = OpContext::new();

    let ids = ensure_permissions(&service, &ctx).await?;
    ensure_admin_role(&service, &ctx, ids).await
}

async fn ensure_permissions(
    service: &RbacService,
    ctx: &OpContext,
) -> Result<Vec<PermissionId>, AppError> {
    let mut ids = Vec::with_capacity(permissions::ALL.len());
    for name in permissions::ALL {
        let existing = service
            .search_permissions(ctx, Some(name))
            .await?
            .into_iter()
            .find(|p| p.name == *name);

        let permission = match existing {
            Some(p) => p,
            None => {
                let Some((resource, action)) = permissions::split(name) else {
                    continue;
                };
                let created = service
                    .create_permission(ctx, None, resource, action, None)
                    .await?;
                output::print_success(&format!("Created permission {}", created.name));
                created
            }
        };
        ids.push(permission.id);
    }
    Ok(ids)
}

async fn ensure_admin_role(
    service: &RbacService,
    ctx: &OpContext,
    permission_ids: Vec<PermissionId>,
) -> Result<(), AppError> {
    let exists = service
        .roles_with_permissions(ctx, Some(ADMIN_ROLE))
        .await?
        .iter()
        .any(|r| r.role.name == ADMIN_ROLE);
    if exists {
        println!("Role {ADMIN_ROLE} already exists, leaving it unchanged.");
        return Ok(());
    }

    let role = service
        .create_role(
            ctx,
            None,
            NewRoleRequest {
                name: ADMIN_ROLE.to_string(),
                description: Some("Full administrative access".to_string()),
                permission_ids,
            },
        )
        .await?;
    output::print_success(&format!("Created role {} (id {})", role.name, role.id));
    Ok(())
}
