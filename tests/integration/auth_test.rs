//! Integration tests for login, refresh, logout, and password change.

mod helpers;

use helpers::{ADMIN_EMAIL, ADMIN_PASSWORD};
use http::StatusCode;

#[tokio::test]
async fn test_login_success() {
    let app = helpers::TestApp::new().await;

    let response = app
        .request(
            "POST",
            "/api/auth/login",
            Some(serde_json::json!({
                "email": ADMIN_EMAIL,
                "password": ADMIN_PASSWORD,
            })),
            None,
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["success"], true);
    let data = &response.body["data"];
    assert!(data["access_token"].is_string());
    assert!(data["refresh_token"].is_string());
    assert_eq!(data["user_id"], app.admin_id.value());
    assert_eq!(app.store.session_count(app.admin_id).await, 1);
}

#[tokio::test]
async fn test_login_email_is_case_insensitive() {
    let app = helpers::TestApp::new().await;
    app.login("ADMIN@Example.COM", ADMIN_PASSWORD).await;
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let app = helpers::TestApp::new().await;

    let wrong_password = app
        .request(
            "POST",
            "/api/auth/login",
            Some(serde_json::json!({
                "email": ADMIN_EMAIL,
                "password": "not-the-password",
            })),
            None,
        )
        .await;
    let unknown_user = app
        .request(
            "POST",
            "/api/auth/login",
            Some(serde_json::json!({
                "email": "nobody@example.com",
                "password": "whatever",
            })),
            None,
        )
        .await;

    assert_eq!(wrong_password.status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_user.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password.body, unknown_user.body);
    assert_eq!(wrong_password.body["error"], "UNAUTHENTICATED");
    assert_eq!(app.store.session_count(app.admin_id).await, 0);
}

#[tokio::test]
async fn test_login_rejects_malformed_body() {
    let app = helpers::TestApp::new().await;

    let response = app
        .request(
            "POST",
            "/api/auth/login",
            Some(serde_json::json!({
                "email": "not-an-email",
                "password": "x",
            })),
            None,
        )
        .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.body["error"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_protected_route_requires_token() {
    let app = helpers::TestApp::new().await;

    let missing = app
        .request("GET", "/api/users/me/permissions", None, None)
        .await;
    let garbage = app
        .request("GET", "/api/users/me/permissions", None, Some("not.a.jwt"))
        .await;

    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);
    assert_eq!(garbage.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_issues_working_access_token() {
    let app = helpers::TestApp::new().await;
    let login = app.login_full(ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let refresh_token = login["refresh_token"].as_str().unwrap();

    let response = app
        .request(
            "POST",
            "/api/auth/refresh",
            Some(serde_json::json!({ "refresh_token": refresh_token })),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let access = response.body["data"]["access_token"].as_str().unwrap();
    let me = app
        .request("GET", "/api/users/me/permissions", None, Some(access))
        .await;
    assert_eq!(me.status, StatusCode::OK);
}

#[tokio::test]
async fn test_refresh_rejects_access_token() {
    let app = helpers::TestApp::new().await;
    let access = app.admin_token().await;

    let response = app
        .request(
            "POST",
            "/api/auth/refresh",
            Some(serde_json::json!({ "refresh_token": access })),
            None,
        )
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_token_is_not_an_access_token() {
    let app = helpers::TestApp::new().await;
    let login = app.login_full(ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let refresh_token = login["refresh_token"].as_str().unwrap();

    let response = app
        .request("GET", "/api/users/me/permissions", None, Some(refresh_token))
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_revokes_session() {
    let app = helpers::TestApp::new().await;
    let login = app.login_full(ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let access = login["access_token"].as_str().unwrap();
    let refresh_token = login["refresh_token"].as_str().unwrap();

    let response = app
        .request("POST", "/api/auth/logout", None, Some(access))
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let after = app
        .request("GET", "/api/users/me/permissions", None, Some(access))
        .await;
    assert_eq!(after.status, StatusCode::UNAUTHORIZED);

    let refreshed = app
        .request(
            "POST",
            "/api/auth/refresh",
            Some(serde_json::json!({ "refresh_token": refresh_token })),
            None,
        )
        .await;
    assert_eq!(refreshed.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_all_ends_every_session() {
    let app = helpers::TestApp::new().await;
    let first = app.admin_token().await;
    let second = app.admin_token().await;

    let response = app
        .request("POST", "/api/auth/logout-all", None, Some(&first))
        .await;
    assert_eq!(response.status, StatusCode::OK);

    for token in [&first, &second] {
        let after = app
            .request("GET", "/api/users/me/permissions", None, Some(token))
            .await;
        assert_eq!(after.status, StatusCode::UNAUTHORIZED);
    }
}

#[tokio::test]
async fn test_change_password() {
    let app = helpers::TestApp::new().await;
    let token = app.admin_token().await;

    let wrong = app
        .request(
            "PUT",
            "/api/users/me/password",
            Some(serde_json::json!({
                "current_password": "incorrect",
                "new_password": "brand-new-secret",
            })),
            Some(&token),
        )
        .await;
    assert_eq!(wrong.status, StatusCode::BAD_REQUEST);
    assert_eq!(wrong.body["error"], "PASSWORD_MISMATCH");

    let ok = app
        .request(
            "PUT",
            "/api/users/me/password",
            Some(serde_json::json!({
                "current_password": ADMIN_PASSWORD,
                "new_password": "brand-new-secret",
            })),
            Some(&token),
        )
        .await;
    assert_eq!(ok.status, StatusCode::OK);

    let old = app
        .request(
            "POST",
            "/api/auth/login",
            Some(serde_json::json!({
                "email": ADMIN_EMAIL,
                "password": ADMIN_PASSWORD,
            })),
            None,
        )
        .await;
    assert_eq!(old.status, StatusCode::UNAUTHORIZED);
    app.login(ADMIN_EMAIL, "brand-new-secret").await;
}

#[tokio::test]
async fn test_health() {
    let app = helpers::TestApp::new().await;
    let response = app.request("GET", "/api/health", None, None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["status"], "ok");
}
