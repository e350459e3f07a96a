//! Integration tests for role and permission administration.

mod helpers;

use http::StatusCode;
use serde_json::{Value, json};

const VIEWER_EMAIL: &str = "viewer@example.com";
const VIEWER_PASSWORD: &str = "viewer-password";

async fn my_permissions(app: &helpers::TestApp, token: &str) -> Vec<String> {
    let response = app
        .request("GET", "/api/users/me/permissions", None, Some(token))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    serde_json::from_value(response.body["data"]["permissions"].clone()).unwrap()
}

fn id_of(response: &helpers::TestResponse) -> i64 {
    response.body["data"]["id"].as_i64().expect("No id in response")
}

#[tokio::test]
async fn test_admin_holds_every_builtin_permission() {
    let app = helpers::TestApp::new().await;
    let admin = app.admin_token().await;

    let held = my_permissions(&app, &admin).await;

    for name in gatehouse_auth::rbac::permissions::ALL {
        assert!(held.iter().any(|p| p == name), "missing {name}");
    }
}

#[tokio::test]
async fn test_viewer_is_limited_to_its_grants() {
    let app = helpers::TestApp::new().await;
    app.create_user(VIEWER_EMAIL, VIEWER_PASSWORD, &[app.viewer_role])
        .await;
    let viewer = app.login(VIEWER_EMAIL, VIEWER_PASSWORD).await;

    let users = app.request("GET", "/api/users", None, Some(&viewer)).await;
    assert_eq!(users.status, StatusCode::OK);
    assert_eq!(users.body["data"].as_array().unwrap().len(), 2);

    let filtered = app
        .request("GET", "/api/users?filter=VIEWER", None, Some(&viewer))
        .await;
    assert_eq!(filtered.body["data"].as_array().unwrap().len(), 1);

    let roles = app.request("GET", "/api/roles", None, Some(&viewer)).await;
    assert_eq!(roles.status, StatusCode::FORBIDDEN);
    assert_eq!(roles.body["error"], "FORBIDDEN");

    let create = app
        .request(
            "POST",
            "/api/roles",
            Some(json!({ "name": "sneaky", "permission_ids": [] })),
            Some(&viewer),
        )
        .await;
    assert_eq!(create.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_custom_permission_reaches_user_through_role() {
    let app = helpers::TestApp::new().await;
    let admin = app.admin_token().await;
    let viewer_id = app
        .create_user(VIEWER_EMAIL, VIEWER_PASSWORD, &[app.viewer_role])
        .await;

    let permission = app
        .request(
            "POST",
            "/api/permissions",
            Some(json!({ "resource": "Report", "action": "Export" })),
            Some(&admin),
        )
        .await;
    assert_eq!(permission.status, StatusCode::CREATED, "{:?}", permission.body);
    assert_eq!(permission.body["data"]["name"], "report.export");

    let role = app
        .request(
            "POST",
            "/api/roles",
            Some(json!({
                "name": "reporter",
                "description": "Exports reports",
                "permission_ids": [id_of(&permission)],
            })),
            Some(&admin),
        )
        .await;
    assert_eq!(role.status, StatusCode::CREATED, "{:?}", role.body);

    let assigned = app
        .request(
            "POST",
            &format!("/api/users/{viewer_id}/roles"),
            Some(json!({ "role_id": id_of(&role) })),
            Some(&admin),
        )
        .await;
    assert_eq!(assigned.status, StatusCode::OK, "{:?}", assigned.body);

    let viewer = app.login(VIEWER_EMAIL, VIEWER_PASSWORD).await;
    assert_eq!(
        my_permissions(&app, &viewer).await,
        vec!["report.export".to_string(), "user.view".to_string()]
    );

    let again = app
        .request(
            "POST",
            &format!("/api/users/{viewer_id}/roles"),
            Some(json!({ "role_id": id_of(&role) })),
            Some(&admin),
        )
        .await;
    assert_eq!(again.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_deactivated_role_grants_nothing() {
    let app = helpers::TestApp::new().await;
    let admin = app.admin_token().await;
    let viewer_id = app
        .create_user(VIEWER_EMAIL, VIEWER_PASSWORD, &[app.viewer_role])
        .await;
    let viewer = app.login(VIEWER_EMAIL, VIEWER_PASSWORD).await;
    assert_eq!(my_permissions(&app, &viewer).await, vec!["user.view"]);

    let response = app
        .request(
            "PUT",
            &format!("/api/roles/{}/active", app.viewer_role),
            Some(json!({ "is_active": false })),
            Some(&admin),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    assert!(my_permissions(&app, &viewer).await.is_empty());
    let users = app.request("GET", "/api/users", None, Some(&viewer)).await;
    assert_eq!(users.status, StatusCode::FORBIDDEN);

    let assign = app
        .request(
            "POST",
            &format!("/api/users/{viewer_id}/roles"),
            Some(json!({ "role_id": app.viewer_role })),
            Some(&admin),
        )
        .await;
    assert_eq!(assign.status, StatusCode::BAD_REQUEST);
    assert_eq!(assign.body["error"], "ROLE_NOT_ACTIVE");
}

#[tokio::test]
async fn test_permission_names_are_validated_and_unique() {
    let app = helpers::TestApp::new().await;
    let admin = app.admin_token().await;

    let dotted = app
        .request(
            "POST",
            "/api/permissions",
            Some(json!({ "resource": "a.b", "action": "read" })),
            Some(&admin),
        )
        .await;
    assert_eq!(dotted.status, StatusCode::UNPROCESSABLE_ENTITY);

    let duplicate = app
        .request(
            "POST",
            "/api/permissions",
            Some(json!({ "resource": "user", "action": "view" })),
            Some(&admin),
        )
        .await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);

    let listed = app
        .request("GET", "/api/permissions?filter=role.", None, Some(&admin))
        .await;
    assert_eq!(listed.status, StatusCode::OK);
    let names: Vec<&str> = listed.body["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|p: &Value| p["name"].as_str())
        .collect();
    assert!(!names.is_empty());
    assert!(names.iter().all(|n| n.starts_with("role.")));
}

#[tokio::test]
async fn test_grant_permission_to_role() {
    let app = helpers::TestApp::new().await;
    let admin = app.admin_token().await;
    app.create_user(VIEWER_EMAIL, VIEWER_PASSWORD, &[app.viewer_role])
        .await;

    let listed = app
        .request("GET", "/api/permissions?filter=role.view", None, Some(&admin))
        .await;
    let role_view = listed.body["data"][0]["id"].as_i64().unwrap();

    let granted = app
        .request(
            "POST",
            &format!("/api/roles/{}/permissions", app.viewer_role),
            Some(json!({ "permission_id": role_view })),
            Some(&admin),
        )
        .await;
    assert_eq!(granted.status, StatusCode::OK, "{:?}", granted.body);

    let viewer = app.login(VIEWER_EMAIL, VIEWER_PASSWORD).await;
    let roles = app.request("GET", "/api/roles", None, Some(&viewer)).await;
    assert_eq!(roles.status, StatusCode::OK);
}
