//! Role handlers.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;

use gatehouse_auth::rbac::permissions;
use gatehouse_core::types::RoleId;
use gatehouse_entity::{Role, RoleWithPermissions};
use gatehouse_service::NewRoleRequest;

use crate::dto::request::{
    CreateRoleRequest, FilterQuery, GrantPermissionRequest, SetRoleActiveRequest,
};
use crate::dto::response::{ApiResponse, MessageResponse};
use crate::error::ApiError;
use crate::extractors::{AuthUser, ValidatedJson};
use crate::state::AppState;

/// GET /api/roles
pub async fn list_roles(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<FilterQuery>,
) -> Result<Json<ApiResponse<Vec<RoleWithPermissions>>>, ApiError> {
    let ctx = state.op_context();
    state
        .rbac
        .authorize(&ctx, &auth, &[permissions::ROLE_VIEW])
        .await?;

    let roles = state
        .rbac
        .roles_with_permissions(&ctx, query.as_deref())
        .await?;
    Ok(Json(ApiResponse::ok(roles)))
}

/// POST /api/roles
pub async fn create_role(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(req): ValidatedJson<CreateRoleRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Role>>), ApiError> {
    let ctx = state.op_context();
    state
        .rbac
        .authorize(&ctx, &auth, &[permissions::ROLE_CREATE])
        .await?;

    let role = state
        .rbac
        .create_role(
            &ctx,
            Some(auth.user_id),
            NewRoleRequest {
                name: req.name,
                description: req.description,
                permission_ids: req.permission_ids,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(role))))
}

/// PUT /api/roles/{id}/active
pub async fn set_role_active(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(role_id): Path<RoleId>,
    ValidatedJson(req): ValidatedJson<SetRoleActiveRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let ctx = state.op_context();
    state
        .rbac
        .authorize(&ctx, &auth, &[permissions::ROLE_UPDATE])
        .await?;

    state
        .rbac
        .set_role_active(&ctx, role_id, req.is_active)
        .await?;
    let message = if req.is_active {
        "Role activated"
    } else {
        "Role deactivated"
    };
    Ok(Json(ApiResponse::ok(MessageResponse::new(message))))
}

/// POST /api/roles/{id}/permissions
pub async fn grant_permission(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(role_id): Path<RoleId>,
    ValidatedJson(req): ValidatedJson<GrantPermissionRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let ctx = state.op_context();
    state
        .rbac
        .authorize(&ctx, &auth, &[permissions::PERMISSION_ASSIGN])
        .await?;

    state
        .rbac
        .grant_permission(&ctx, auth.user_id, role_id, req.permission_id)
        .await?;
    Ok(Json(ApiResponse::ok(MessageResponse::new(
        "Permission granted",
    ))))
}
