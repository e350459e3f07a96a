//! Permission catalogue handlers.

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;

use gatehouse_auth::rbac::permissions;
use gatehouse_entity::Permission;

use crate::dto::request::{CreatePermissionRequest, FilterQuery};
use crate::dto::response::ApiResponse;
use crate::error::ApiError;
use crate::extractors::{AuthUser, ValidatedJson};
use crate::state::AppState;

/// GET /api/permissions
pub async fn list_permissions(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<FilterQuery>,
) -> Result<Json<ApiResponse<Vec<Permission>>>, ApiError> {
    let ctx = state.op_context();
    state
        .rbac
        .authorize(&ctx, &auth, &[permissions::PERMISSION_VIEW])
        .await?;

    let found = state
        .rbac
        .search_permissions(&ctx, query.as_deref())
        .await?;
    Ok(Json(ApiResponse::ok(found)))
}

/// POST /api/permissions
pub async fn create_permission(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(req): ValidatedJson<CreatePermissionRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Permission>>), ApiError> {
    let ctx = state.op_context();
    state
        .rbac
        .authorize(&ctx, &auth, &[permissions::PERMISSION_ASSIGN])
        .await?;

    let created = state
        .rbac
        .create_permission(
            &ctx,
            Some(auth.user_id),
            &req.resource,
            &req.action,
            req.description,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(created))))
}
