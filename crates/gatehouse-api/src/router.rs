//! Route definitions for the Gatehouse HTTP API.
//!
//! All routes are mounted under `/api`.

use axum::Router;
use axum::routing::{get, post, put};

use crate::handlers;
use crate::state::AppState;

/// Build the `/api` router and thread `state` through every route.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .merge(auth_routes())
        .merge(user_routes())
        .merge(role_routes())
        .merge(permission_routes())
        .route("/health", get(handlers::health::health));

    Router::new().nest("/api", api_routes).with_state(state)
}

/// Login, refresh, logout, registration
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/refresh", post(handlers::auth::refresh))
        .route("/auth/logout", post(handlers::auth::logout))
        .route("/auth/logout-all", post(handlers::auth::logout_all))
        .route("/auth/register", post(handlers::auth::register))
}

fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(handlers::user::list_users))
        .route("/users/invite", post(handlers::user::invite))
        .route("/users/me/permissions", get(handlers::user::my_permissions))
        .route("/users/me/password", put(handlers::user::change_password))
        .route("/users/{id}/roles", post(handlers::user::assign_role))
}

fn role_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/roles",
            get(handlers::role::list_roles).post(handlers::role::create_role),
        )
        .route("/roles/{id}/active", put(handlers::role::set_role_active))
        .route("/roles/{id}/permissions", post(handlers::role::grant_permission))
}

fn permission_routes() -> Router<AppState> {
    Router::new().route(
        "/permissions",
        get(handlers::permission::list_permissions).post(handlers::permission::create_permission),
    )
}
