//! Bearer-token extractors.
//!
//! [`AuthUser`] accepts only access tokens whose session is still valid.
//! [`InvitationBearer`] accepts only invitation tokens.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::TypedHeader;
use axum_extra::headers::Authorization;
use axum_extra::headers::authorization::Bearer;

use gatehouse_auth::{AuthenticatedPrincipal, InvitationClaims};
use gatehouse_core::error::AppError;

use crate::error::ApiError;
use crate::state::AppState;

async fn bearer_token(parts: &mut Parts, state: &AppState) -> Result<String, ApiError> {
    let TypedHeader(Authorization(bearer)) =
        TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
            .await
            .map_err(|_| AppError::unauthenticated("Missing or malformed bearer token"))?;
    Ok(bearer.token().to_string())
}

/// The authenticated caller.
#[derive(Debug, Clone)]
pub struct AuthUser(pub AuthenticatedPrincipal);

impl std::ops::Deref for AuthUser {
    type Target = AuthenticatedPrincipal;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts, state).await?;
        let principal = state
            .rbac
            .authenticate(&state.op_context(), &token)
            .await?;
        Ok(AuthUser(principal))
    }
}

/// Verified invitation claims from the `Authorization` header.
#[derive(Debug, Clone)]
pub struct InvitationBearer(pub InvitationClaims);

impl FromRequestParts<AppState> for InvitationBearer {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts, state).await?;
        let claims = state.rbac.verify_invitation(&token)?;
        Ok(InvitationBearer(claims))
    }
}
