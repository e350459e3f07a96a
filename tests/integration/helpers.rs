//! Shared test helpers for integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use gatehouse_api::{AppState, build_app};
use gatehouse_auth::rbac::permissions;
use gatehouse_core::config::AppConfig;
use gatehouse_core::types::{RoleId, UserId};
use gatehouse_database::{MemoryStore, Repositories};
use gatehouse_service::{NewRoleRequest, OpContext, RbacService, RecordingNotifier};

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "admin-password";

/// Test application backed by the in-memory store.
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// Direct handle on the service facade
    pub rbac: Arc<RbacService>,
    /// Shared store, for assertions on persisted state
    pub store: MemoryStore,
    /// Captures outbound mail
    pub notifier: RecordingNotifier,
    pub admin_id: UserId,
    /// Holds every built-in permission
    pub admin_role: RoleId,
    /// Holds only `user.view`
    pub viewer_role: RoleId,
}

impl TestApp {
    /// Create a new test application with an admin user already seeded.
    pub async fn new() -> Self {
        let mut config = AppConfig::default();
        config.auth.argon2_memory_kib = 1024;
        config.auth.argon2_iterations = 1;
        config.server.request_timeout_seconds = 5;

        let store = MemoryStore::new();
        let notifier = RecordingNotifier::new();
        let rbac = RbacService::new(
            &config,
            Repositories::memory(store.clone()),
            Arc::new(notifier.clone()),
        )
        .expect("Failed to build service");
        let ctx = OpContext::new();

        let mut all = Vec::new();
        let mut view = None;
        for name in permissions::ALL {
            let (resource, action) = permissions::split(name).expect("Bad builtin name");
            let p = rbac
                .create_permission(&ctx, None, resource, action, None)
                .await
                .expect("Failed to create permission");
            if *name == permissions::USER_VIEW {
                view = Some(p.id);
            }
            all.push(p.id);
        }

        let admin_role = rbac
            .create_role(&ctx, None, role("admin", all))
            .await
            .expect("Failed to create admin role")
            .id;
        let viewer_role = rbac
            .create_role(
                &ctx,
                None,
                role("viewer", view.into_iter().collect()),
            )
            .await
            .expect("Failed to create viewer role")
            .id;

        let admin = rbac
            .create_user(
                &ctx,
                None,
                ADMIN_EMAIL,
                ADMIN_PASSWORD,
                "Ada",
                "Admin",
                &[admin_role],
            )
            .await
            .expect("Failed to create admin");

        let rbac = Arc::new(rbac);
        let state = AppState::new(Arc::new(config), Arc::clone(&rbac), CancellationToken::new());

        Self {
            router: build_app(state),
            rbac,
            store,
            notifier,
            admin_id: admin.id,
            admin_role,
            viewer_role,
        }
    }

    /// Create an active user holding `roles`.
    pub async fn create_user(&self, email: &str, password: &str, roles: &[RoleId]) -> UserId {
        self.rbac
            .create_user(&OpContext::new(), None, email, password, "Test", "User", roles)
            .await
            .expect("Failed to create test user")
            .id
    }

    /// Login and return the `data` object of the response.
    pub async fn login_full(&self, email: &str, password: &str) -> Value {
        let body = serde_json::json!({
            "email": email,
            "password": password,
        });

        let response = self
            .request("POST", "/api/auth/login", Some(body), None)
            .await;

        assert_eq!(
            response.status,
            StatusCode::OK,
            "Login failed: {:?}",
            response.body
        );
        response.body["data"].clone()
    }

    /// Login and return the access token.
    pub async fn login(&self, email: &str, password: &str) -> String {
        self.login_full(email, password).await["access_token"]
            .as_str()
            .expect("No access_token in login response")
            .to_string()
    }

    pub async fn admin_token(&self) -> String {
        self.login(ADMIN_EMAIL, ADMIN_PASSWORD).await
    }

    /// Make an HTTP request to the test app
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> TestResponse {
        let body_str = body
            .map(|b| serde_json::to_string(&b).expect("Failed to serialize body"))
            .unwrap_or_default();

        let mut req = Request::builder()
            .method(method)
            .uri(path)
            .header("Content-Type", "application/json");

        if let Some(token) = token {
            req = req.header("Authorization", format!("Bearer {token}"));
        }

        let req = req
            .body(Body::from(body_str))
            .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read body")
            .to_bytes();

        let body: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

        TestResponse { status, body }
    }
}

fn role(name: &str, permission_ids: Vec<gatehouse_core::types::PermissionId>) -> NewRoleRequest {
    NewRoleRequest {
        name: name.to_string(),
        description: None,
        permission_ids,
    }
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Parsed JSON body
    pub body: Value,
}
