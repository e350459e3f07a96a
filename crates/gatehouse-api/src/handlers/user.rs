//! User handlers: self-service and administration.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;

use gatehouse_auth::rbac::permissions;
use gatehouse_core::types::UserId;
use gatehouse_entity::UserWithRoles;
use gatehouse_service::InvitationStatus;

use crate::dto::request::{AssignRoleRequest, ChangePasswordRequest, FilterQuery, InviteRequest};
use crate::dto::response::{ApiResponse, MessageResponse, PermissionsResponse};
use crate::error::ApiError;
use crate::extractors::{AuthUser, ValidatedJson};
use crate::state::AppState;

/// GET /api/users/me/permissions
pub async fn my_permissions(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<PermissionsResponse>>, ApiError> {
    let held = state
        .rbac
        .permissions_for(&state.op_context(), auth.user_id)
        .await?;
    Ok(Json(ApiResponse::ok(PermissionsResponse {
        permissions: held.into_iter().collect(),
    })))
}

/// PUT /api/users/me/password
pub async fn change_password(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(req): ValidatedJson<ChangePasswordRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state
        .rbac
        .reset_password(
            &state.op_context(),
            auth.user_id,
            &req.current_password,
            &req.new_password,
        )
        .await?;
    Ok(Json(ApiResponse::ok(MessageResponse::new(
        "Password changed successfully",
    ))))
}

/// POST /api/users/invite
pub async fn invite(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(req): ValidatedJson<InviteRequest>,
) -> Result<(StatusCode, Json<ApiResponse<InvitationStatus>>), ApiError> {
    let ctx = state.op_context();
    state
        .rbac
        .authorize(&ctx, &auth, &[permissions::USER_CREATE])
        .await?;

    let status = state
        .rbac
        .invite(&ctx, auth.user_id, &req.email, &req.role_ids)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(status))))
}

/// GET /api/users
pub async fn list_users(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<FilterQuery>,
) -> Result<Json<ApiResponse<Vec<UserWithRoles>>>, ApiError> {
    let ctx = state.op_context();
    state
        .rbac
        .authorize(&ctx, &auth, &[permissions::USER_VIEW])
        .await?;

    let users = state.rbac.list_users(&ctx, query.as_deref()).await?;
    Ok(Json(ApiResponse::ok(users)))
}

/// POST /api/users/{id}/roles
pub async fn assign_role(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<UserId>,
    ValidatedJson(req): ValidatedJson<AssignRoleRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let ctx = state.op_context();
    state
        .rbac
        .authorize(&ctx, &auth, &[permissions::ROLE_ASSIGN])
        .await?;

    state
        .rbac
        .assign_role(&ctx, auth.user_id, user_id, req.role_id)
        .await?;
    Ok(Json(ApiResponse::ok(MessageResponse::new("Role assigned"))))
}
