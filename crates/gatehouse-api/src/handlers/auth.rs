//! Auth handlers: login, refresh, logout, and invitation registration.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;

use gatehouse_service::AccountFields;

use crate::dto::request::{LoginRequest, RefreshRequest, RegisterRequest};
use crate::dto::response::{
    ApiResponse, LoginResponse, MessageResponse, RefreshResponse, UserResponse,
};
use crate::error::ApiError;
use crate::extractors::{AuthUser, ClientInfo, InvitationBearer, ValidatedJson};
use crate::state::AppState;

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    ClientInfo(meta): ClientInfo,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    let result = state
        .rbac
        .login(&state.op_context(), &req.email, &req.password, meta)
        .await?;

    Ok(Json(ApiResponse::ok(LoginResponse {
        access_token: result.access_token,
        refresh_token: result.refresh_token,
        access_expires_at: result.access_expires_at,
        refresh_expires_at: result.refresh_expires_at,
        user_id: result.user_id,
    })))
}

/// POST /api/auth/refresh
pub async fn refresh(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RefreshRequest>,
) -> Result<Json<ApiResponse<RefreshResponse>>, ApiError> {
    let result = state
        .rbac
        .refresh_access(&state.op_context(), &req.refresh_token)
        .await?;

    Ok(Json(ApiResponse::ok(RefreshResponse {
        access_token: result.access_token,
        access_expires_at: result.access_expires_at,
    })))
}

/// POST /api/auth/logout
pub async fn logout(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state
        .rbac
        .logout(&state.op_context(), auth.session_id)
        .await?;
    Ok(Json(ApiResponse::ok(MessageResponse::new(
        "Logged out successfully",
    ))))
}

/// POST /api/auth/logout-all
pub async fn logout_all(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let count = state
        .rbac
        .logout_all(&state.op_context(), auth.user_id)
        .await?;
    Ok(Json(ApiResponse::ok(MessageResponse::new(format!(
        "Ended {count} session(s)"
    )))))
}

/// POST /api/auth/register
///
/// Authorized by the invitation token, not by a session.
pub async fn register(
    State(state): State<AppState>,
    InvitationBearer(claims): InvitationBearer,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserResponse>>), ApiError> {
    let user = state
        .rbac
        .register(
            &state.op_context(),
            &claims.email,
            &claims.role_ids,
            AccountFields {
                first_name: req.first_name,
                last_name: req.last_name,
                password: req.password,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(user.into()))))
}
