//! Integration tests for the invitation and registration flow.

mod helpers;

use http::StatusCode;

const INVITEE: &str = "new.hire@example.com";

async fn invite(app: &helpers::TestApp, token: &str, email: &str) -> helpers::TestResponse {
    app.request(
        "POST",
        "/api/users/invite",
        Some(serde_json::json!({
            "email": email,
            "role_ids": [app.viewer_role],
        })),
        Some(token),
    )
    .await
}

async fn register(app: &helpers::TestApp, invitation: &str, password: &str) -> helpers::TestResponse {
    app.request(
        "POST",
        "/api/auth/register",
        Some(serde_json::json!({
            "first_name": "New",
            "last_name": "Hire",
            "password": password,
        })),
        Some(invitation),
    )
    .await
}

#[tokio::test]
async fn test_invite_register_login() {
    let app = helpers::TestApp::new().await;
    let admin = app.admin_token().await;

    let invited = invite(&app, &admin, "New.Hire@Example.com").await;
    assert_eq!(invited.status, StatusCode::CREATED, "{:?}", invited.body);
    assert_eq!(invited.body["data"]["email"], INVITEE);
    assert_eq!(invited.body["data"]["is_expired"], false);

    let sent = app.notifier.last_to(INVITEE).expect("No invitation sent");
    assert!(sent.data["invitation_url"].as_str().unwrap().contains("?token="));
    let invitation = app.notifier.invitation_token(INVITEE).unwrap();

    let registered = register(&app, &invitation, "hire-password").await;
    assert_eq!(registered.status, StatusCode::CREATED, "{:?}", registered.body);
    assert_eq!(registered.body["data"]["email"], INVITEE);
    assert!(registered.body["data"].get("password_hash").is_none());

    let token = app.login(INVITEE, "hire-password").await;
    let me = app
        .request("GET", "/api/users/me/permissions", None, Some(&token))
        .await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["data"]["permissions"], serde_json::json!(["user.view"]));
}

#[tokio::test]
async fn test_registration_is_single_use() {
    let app = helpers::TestApp::new().await;
    let admin = app.admin_token().await;
    invite(&app, &admin, INVITEE).await;
    let invitation = app.notifier.invitation_token(INVITEE).unwrap();

    let first = register(&app, &invitation, "hire-password").await;
    assert_eq!(first.status, StatusCode::CREATED);

    let second = register(&app, &invitation, "other-password").await;
    assert_eq!(second.status, StatusCode::CONFLICT);
    assert_eq!(second.body["error"], "ALREADY_REGISTERED");
    assert_eq!(app.store.user_count().await, 2);
}

#[tokio::test]
async fn test_register_requires_invitation_token() {
    let app = helpers::TestApp::new().await;
    let admin = app.admin_token().await;

    let forged = register(&app, "forged.invitation.token", "hire-password").await;
    assert_eq!(forged.status, StatusCode::UNAUTHORIZED);

    // A session token is not an invitation.
    let wrong_kind = register(&app, &admin, "hire-password").await;
    assert_eq!(wrong_kind.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_invite_registered_email_conflicts() {
    let app = helpers::TestApp::new().await;
    let admin = app.admin_token().await;

    let response = invite(&app, &admin, helpers::ADMIN_EMAIL).await;

    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.body["error"], "ALREADY_REGISTERED");
    assert!(app.notifier.sent().is_empty());
}

#[tokio::test]
async fn test_invite_unknown_role() {
    let app = helpers::TestApp::new().await;
    let admin = app.admin_token().await;

    let response = app
        .request(
            "POST",
            "/api/users/invite",
            Some(serde_json::json!({
                "email": INVITEE,
                "role_ids": [9999],
            })),
            Some(&admin),
        )
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(app.store.onboarding_count().await, 0);
}

#[tokio::test]
async fn test_invite_requires_user_create() {
    let app = helpers::TestApp::new().await;
    app.create_user("viewer@example.com", "viewer-password", &[app.viewer_role])
        .await;
    let viewer = app.login("viewer@example.com", "viewer-password").await;

    let response = invite(&app, &viewer, INVITEE).await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(app.store.onboarding_count().await, 0);
}

#[tokio::test]
async fn test_reinvite_while_pending_conflicts() {
    let app = helpers::TestApp::new().await;
    let admin = app.admin_token().await;

    assert_eq!(invite(&app, &admin, INVITEE).await.status, StatusCode::CREATED);

    for _ in 0..2 {
        let again = invite(&app, &admin, INVITEE).await;
        assert_eq!(again.status, StatusCode::CONFLICT);
        assert_eq!(again.body["error"], "ALREADY_INVITED");
    }

    assert_eq!(app.store.onboarding_count().await, 1);
    assert_eq!(app.notifier.sent().len(), 1);
}

#[tokio::test]
async fn test_register_rejects_short_password() {
    let app = helpers::TestApp::new().await;
    let admin = app.admin_token().await;
    invite(&app, &admin, INVITEE).await;
    let invitation = app.notifier.invitation_token(INVITEE).unwrap();

    let response = register(&app, &invitation, "abc").await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(app.store.user_count().await, 1);
}
