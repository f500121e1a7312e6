use std::sync::Arc;

use axum::{
    Router,
    body::{self, Body},
    http::{Request, StatusCode, header},
};
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use laundry_admin::{
    auth::Role,
    test_helpers::{InMemoryRoleStore, bearer_token, test_router},
};

struct TestApp {
    store: Arc<InMemoryRoleStore>,
    router: Router,
}

impl TestApp {
    fn new() -> Self {
        let store = Arc::new(InMemoryRoleStore::default());
        let router = test_router(store.clone());
        Self { store, router }
    }

    fn user(&self, email: &str, role: Role) -> (Uuid, String) {
        let id = self.store.add_profile(email);
        if role != Role::User {
            self.store.seed_assignment(id, role, None);
        }
        (id, bearer_token(id, Some(email)))
    }

    async fn call(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router should respond");
        let status = response.status();
        let bytes = body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should read");
        let json = serde_json::from_slice(&bytes).expect("body should be json");
        (status, json)
    }

    async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, token);
        }
        self.call(
            builder
                .body(Body::from(body.to_string()))
                .expect("request should build"),
        )
        .await
    }

    async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, token);
        }
        self.call(builder.body(Body::empty()).expect("request should build"))
            .await
    }
}

#[tokio::test]
async fn health_is_public() {
    let app = TestApp::new();
    let (status, body) = app.get("/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn unknown_routes_return_json_errors() {
    let app = TestApp::new();
    let (status, body) = app.get("/api/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn missing_or_bad_tokens_are_unauthorized() {
    let app = TestApp::new();

    let (status, body) = app.get("/api/admin/users", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Missing/invalid Authorization header");

    let (status, body) = app
        .get("/api/admin/users", Some("Bearer not-a-token"))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid or expired token");
}

#[tokio::test]
async fn promote_then_list_shows_admin() {
    let app = TestApp::new();
    let (root_id, root) = app.user("root@x.com", Role::SuperAdmin);
    let (target, _) = app.user("target@x.com", Role::User);

    let (status, body) = app
        .post(
            "/api/admin/users/promote",
            Some(&root),
            json!({ "userId": target, "role": "admin" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "User role updated to admin");

    let (status, body) = app.get("/api/admin/users", Some(&root)).await;
    assert_eq!(status, StatusCode::OK);
    let rows = body["adminUsers"].as_array().expect("adminUsers array");
    let row = rows
        .iter()
        .find(|row| row["id"] == json!(target))
        .expect("target should be listed");
    assert_eq!(row["effective_role"], "admin");
    assert_eq!(row["is_admin"], true);
    assert_eq!(row["role_assignment"]["created_by"], json!(root_id));

    let audit = app.store.audit_entries();
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].actor_id, Some(root_id));
    assert_eq!(audit[0].payload, json!({ "role": "admin" }));
}

#[tokio::test]
async fn gate_refusals_are_bad_requests() {
    let app = TestApp::new();
    let (_, root) = app.user("root@x.com", Role::SuperAdmin);
    let (other_root, _) = app.user("other@x.com", Role::SuperAdmin);
    let (_, admin) = app.user("admin@x.com", Role::Admin);
    let (plain_id, plain) = app.user("plain@x.com", Role::User);

    let (status, body) = app
        .post(
            "/api/admin/users/promote",
            Some(&root),
            json!({ "userId": other_root, "role": "user" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Cannot modify super admin users");

    let (status, body) = app
        .post(
            "/api/admin/users/demote",
            Some(&root),
            json!({ "userId": other_root }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Cannot modify super admin users");

    let (status, body) = app
        .post(
            "/api/admin/users/promote",
            Some(&admin),
            json!({ "userId": plain_id, "role": "admin" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Only super admins can change user roles");

    let (status, body) = app.get("/api/admin/users", Some(&plain)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Only admins can view admin users");

    let (status, body) = app
        .post(
            "/api/admin/users/promote",
            Some(&root),
            json!({ "userId": Uuid::new_v4(), "role": "admin" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(
        body["error"]
            .as_str()
            .is_some_and(|message| message.ends_with("not found"))
    );

    assert!(app.store.audit_actions().is_empty());
}

#[tokio::test]
async fn malformed_requests_never_reach_storage() {
    let app = TestApp::new();
    let (_, root) = app.user("root@x.com", Role::SuperAdmin);
    let (target, _) = app.user("target@x.com", Role::User);
    app.store.fail_storage(true);

    let (status, body) = app
        .post(
            "/api/admin/users/promote",
            Some(&root),
            json!({ "role": "admin" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "userId is required");

    let (status, body) = app
        .post(
            "/api/admin/users/promote",
            Some(&root),
            json!({ "userId": target, "role": "owner" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid role: owner");

    let (status, body) = app
        .post(
            "/api/admin/users/demote",
            Some(&root),
            json!({ "userId": "not-a-uuid" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid userId: not-a-uuid");
}

#[tokio::test]
async fn demote_twice_succeeds() {
    let app = TestApp::new();
    let (_, root) = app.user("root@x.com", Role::SuperAdmin);
    let (admin_id, _) = app.user("admin@x.com", Role::Admin);

    for _ in 0..2 {
        let (status, body) = app
            .post(
                "/api/admin/users/demote",
                Some(&root),
                json!({ "userId": admin_id }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
    }
    assert_eq!(app.store.role_of(admin_id), Role::User);
    assert_eq!(app.store.audit_actions(), vec!["demote_user", "demote_user"]);
}

#[tokio::test]
async fn demote_of_concurrently_granted_super_admin_is_refused() {
    let app = TestApp::new();
    let (_, root) = app.user("root@x.com", Role::SuperAdmin);
    let (admin_id, _) = app.user("admin@x.com", Role::Admin);
    app.store.grant_super_admin_before_next_write();

    let (status, body) = app
        .post(
            "/api/admin/users/demote",
            Some(&root),
            json!({ "userId": admin_id }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Cannot modify super admin users");
    assert_eq!(app.store.role_of(admin_id), Role::SuperAdmin);
    assert!(app.store.audit_actions().is_empty());
}

#[tokio::test]
async fn escalation_to_super_admin_is_final() {
    let app = TestApp::new();
    let (_, first) = app.user("first@x.com", Role::SuperAdmin);
    let (second_id, second) = app.user("second@x.com", Role::SuperAdmin);
    let (target, _) = app.user("target@x.com", Role::User);

    for (token, role) in [(&first, "admin"), (&second, "super_admin")] {
        let (status, _) = app
            .post(
                "/api/admin/users/promote",
                Some(token),
                json!({ "userId": target, "role": role }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    let assignment = app.store.assignment(target).expect("assignment exists");
    assert_eq!(assignment.role, "super_admin");
    assert_eq!(assignment.created_by, Some(second_id));

    let (status, body) = app
        .post(
            "/api/admin/users/promote",
            Some(&first),
            json!({ "userId": target, "role": "admin" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Cannot modify super admin users");
}

#[tokio::test]
async fn list_applies_filter_and_sort() {
    let app = TestApp::new();
    let (_, root) = app.user("root@x.com", Role::SuperAdmin);
    app.user("bob@x.com", Role::User);
    app.user("amy@x.com", Role::Admin);
    app.user("cat@x.com", Role::User);

    let (status, body) = app
        .get("/api/admin/users?role=user&sort=email&order=asc", Some(&root))
        .await;
    assert_eq!(status, StatusCode::OK);
    let emails: Vec<_> = body["adminUsers"]
        .as_array()
        .expect("adminUsers array")
        .iter()
        .map(|row| row["email"].as_str().unwrap_or_default().to_string())
        .collect();
    assert_eq!(emails, vec!["bob@x.com", "cat@x.com"]);

    let (status, body) = app.get("/api/admin/users", Some(&root)).await;
    assert_eq!(status, StatusCode::OK);
    let first = &body["adminUsers"][0];
    assert_eq!(first["email"], "cat@x.com");

    let (status, body) = app
        .get("/api/admin/users?sort=height", Some(&root))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn list_storage_failure_is_internal_error() {
    let app = TestApp::new();
    let (_, root) = app.user("root@x.com", Role::SuperAdmin);
    app.store.fail_storage(true);

    let (status, body) = app.get("/api/admin/users", Some(&root)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Internal server error");
}

#[tokio::test]
async fn search_finds_unassigned_users_only() {
    let app = TestApp::new();
    let (_, root) = app.user("root@x.com", Role::SuperAdmin);
    let (hit, _) = app.user("abcuser@x.com", Role::User);
    app.user("xyz@x.com", Role::User);

    let (status, body) = app
        .post("/api/admin/users/search", Some(&root), json!({ "email": "ab" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "users": [] }));

    let (status, body) = app
        .post("/api/admin/users/search", Some(&root), json!({ "email": "abc" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    let users = body["users"].as_array().expect("users array");
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["id"], json!(hit));
}

#[tokio::test]
async fn search_errors_degrade_to_empty_results() {
    let app = TestApp::new();
    let (_, root) = app.user("root@x.com", Role::SuperAdmin);
    app.user("abcuser@x.com", Role::User);
    app.store.fail_storage(true);

    let (status, body) = app
        .post("/api/admin/users/search", Some(&root), json!({ "email": "abc" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "users": [] }));
}

#[tokio::test]
async fn sync_then_me_reports_profile() {
    let app = TestApp::new();
    let id = Uuid::new_v4();
    let token = bearer_token(id, Some("New.User@X.com"));

    let (status, body) = app.get("/api/me", Some(&token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Profile not found");

    let (status, body) = app
        .post(
            "/api/directory/sync",
            Some(&token),
            json!({ "fullName": "New User", "phone": "555-0100" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["profile"]["email"], "new.user@x.com");
    assert_eq!(body["profile"]["full_name"], "New User");

    let (status, body) = app.get("/api/me", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["profile"]["id"], json!(id));
    assert_eq!(body["effective_role"], "user");
    assert_eq!(body["is_admin"], false);
}

#[tokio::test]
async fn sync_without_email_claim_is_rejected() {
    let app = TestApp::new();
    let token = bearer_token(Uuid::new_v4(), None);

    let (status, body) = app
        .post("/api/directory/sync", Some(&token), json!({}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Token does not carry an email");
}
