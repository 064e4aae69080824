//! End-to-end tests of the JSON API through the axum router.
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use rewear::auth::TokenIssuer;
use rewear::http::{AppState, router};
use rewear::service::MarketService;
use serde_json::{Value, json};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

struct Api {
    app: Router,
    service: MarketService,
    _dir: TempDir,
}

fn api() -> Api {
    let dir = tempfile::tempdir().unwrap();
    let db = Arc::new(sled::open(dir.path().join("http.db")).unwrap());
    let service = MarketService::new(db).unwrap();
    let state = AppState::new(service.clone(), TokenIssuer::new("test-secret", 1).unwrap(), 10);
    Api {
        app: router(state),
        service,
        _dir: dir,
    }
}

impl Api {
    async fn call(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header("authorization", format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        // non-JSON bodies come back as a string so assertions report them
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, value)
    }

    /// Register and log in; returns (account id, token).
    async fn sign_up(&self, username: &str) -> (String, String) {
        let (status, _) = self
            .call(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({
                    "username": username,
                    "name": username,
                    "email": format!("{username}@rewear.test"),
                    "password": "hunter2",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = self
            .call(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "email": format!("{username}@rewear.test"), "password": "hunter2" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        (
            body["user"]["id"].as_str().unwrap().to_string(),
            body["access_token"].as_str().unwrap().to_string(),
        )
    }

    async fn admin(&self) -> (String, String) {
        let (id, token) = self.sign_up("admin").await;
        self.service.promote_admin("admin").unwrap();
        (id, token)
    }

    async fn upload(&self, token: &str, title: &str) -> String {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/items/upload",
                Some(token),
                Some(json!({
                    "title": title,
                    "description": "barely worn",
                    "category": "Tops",
                    "type": "Shirt",
                    "condition": "like new",
                    "tags": "denim, blue",
                    "images": ["uploads/front.jpg", "uploads/back.jpg"],
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["item_id"].as_str().unwrap().to_string()
    }

    async fn approve(&self, admin_token: &str, item_id: &str) {
        let (status, body) = self
            .call(
                Method::POST,
                &format!("/api/admin/items/{item_id}/moderate"),
                Some(admin_token),
                Some(json!({ "action": "approve" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
    }
}

#[tokio::test]
async fn health_needs_no_token() {
    let api = api();
    let (status, body) = api.call(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
}

#[tokio::test]
async fn protected_routes_require_a_bearer_token() {
    let api = api();
    let (status, body) = api.call(Method::GET, "/api/items/my-items", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Unauthorized");

    let (status, _) = api.call(Method::GET, "/api/swap/my-requests", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn bad_credentials_are_unauthorized() {
    let api = api();
    api.sign_up("alice").await;
    let (status, body) = api
        .call(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "alice@rewear.test", "password": "wrong" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Unauthorized");
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let api = api();
    api.sign_up("alice").await;
    let (status, body) = api
        .call(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({
                "username": "alice",
                "name": "Alice",
                "email": "other@rewear.test",
                "password": "pw",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Conflict");
}

#[tokio::test]
async fn uploads_wait_for_moderation_before_listing() {
    let api = api();
    let (_, admin) = api.admin().await;
    let (bob_id, bob) = api.sign_up("bob").await;
    let item_id = api.upload(&bob, "Denim jacket").await;

    let (_, body) = api.call(Method::GET, "/api/items", None, None).await;
    assert_eq!(body["pagination"]["total"], 0);

    // regular users cannot moderate
    let (status, body) = api
        .call(
            Method::POST,
            &format!("/api/admin/items/{item_id}/moderate"),
            Some(&bob),
            Some(json!({ "action": "approve" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "PermissionDenied");

    api.approve(&admin, &item_id).await;

    let (_, body) = api.call(Method::GET, "/api/items?search=denim", None, None).await;
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["pagination"]["pages"], 1);

    let (status, body) = api.call(Method::GET, &format!("/api/items/{item_id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["item"]["condition"], "Like New");
    assert_eq!(body["item"]["status"], "available");
    assert_eq!(body["item"]["main_image"], "uploads/front.jpg");
    assert_eq!(body["item"]["uploader"]["id"], bob_id.as_str());
    assert_eq!(body["item"]["tags"], json!(["denim", "blue"]));
}

#[tokio::test]
async fn unknown_condition_is_a_bad_request() {
    let api = api();
    let (_, bob) = api.sign_up("bob").await;
    let (status, body) = api
        .call(
            Method::POST,
            "/api/items/upload",
            Some(&bob),
            Some(json!({
                "title": "Jacket",
                "category": "Tops",
                "type": "Jacket",
                "condition": "mint",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Validation");
}

#[tokio::test]
async fn points_swap_round_trip() {
    let api = api();
    let (_, admin) = api.admin().await;
    let (alice_id, alice) = api.sign_up("alice").await;
    let (_, bob) = api.sign_up("bob").await;

    let (status, body) = api
        .call(
            Method::POST,
            &format!("/api/admin/users/{alice_id}/add-points"),
            Some(&admin),
            Some(json!({ "points": 100 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["new_balance"], 100);

    let item_id = api.upload(&bob, "Denim jacket").await;
    api.approve(&admin, &item_id).await;

    let (status, body) = api
        .call(
            Method::POST,
            "/api/swap/request",
            Some(&alice),
            Some(json!({
                "requested_item_id": item_id,
                "swap_type": "points",
                "points_used": 50,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let swap_id = body["swap_id"].as_str().unwrap().to_string();

    let (_, body) = api.call(Method::GET, "/api/swap/received-requests", Some(&bob), None).await;
    assert_eq!(body["swaps"].as_array().unwrap().len(), 1);
    assert_eq!(body["swaps"][0]["requester"]["username"], "alice");

    // only the owner may respond
    let (status, _) = api
        .call(
            Method::POST,
            &format!("/api/swap/{swap_id}/respond"),
            Some(&alice),
            Some(json!({ "action": "accept" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = api
        .call(
            Method::POST,
            &format!("/api/swap/{swap_id}/respond"),
            Some(&bob),
            Some(json!({ "action": "accept" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["success"], true);
    assert_eq!(body["swap"]["status"], "accepted");

    let (status, body) = api
        .call(
            Method::POST,
            &format!("/api/swap/{swap_id}/respond"),
            Some(&bob),
            Some(json!({ "action": "reject" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "InvalidState");

    let (_, body) = api.call(Method::GET, "/api/auth/me", Some(&alice), None).await;
    assert_eq!(body["user"]["points_balance"], 50);
}

#[tokio::test]
async fn malformed_swap_requests_are_rejected() {
    let api = api();
    let (_, alice) = api.sign_up("alice").await;

    let (status, body) = api
        .call(
            Method::POST,
            "/api/swap/request",
            Some(&alice),
            Some(json!({ "requested_item_id": "item_x", "swap_type": "direct" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Validation");

    let (status, body) = api
        .call(
            Method::POST,
            "/api/swap/request",
            Some(&alice),
            Some(json!({ "requested_item_id": "item_x", "swap_type": "points", "points_used": 5 })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NotFound");
}

#[tokio::test]
async fn undecodable_bodies_are_validation_errors() {
    let api = api();
    let (_, admin) = api.admin().await;
    let (bob_id, bob) = api.sign_up("bob").await;

    let bodies = [
        json!({ "requested_item_id": "item_x", "swap_type": "points", "points_used": -5 }),
        json!({ "requested_item_id": "item_x" }),
    ];
    for body in bodies {
        let (status, reply) = api
            .call(Method::POST, "/api/swap/request", Some(&bob), Some(body.clone()))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}: {reply}");
        assert_eq!(reply["success"], false);
        assert_eq!(reply["error"], "Validation");
        assert!(reply["message"].as_str().is_some_and(|m| !m.is_empty()));
    }

    let (status, reply) = api
        .call(
            Method::POST,
            &format!("/api/admin/users/{bob_id}/add-points"),
            Some(&admin),
            Some(json!({ "points": "50" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{reply}");
    assert_eq!(reply["error"], "Validation");

    // missing content type
    let (status, reply) = api.call(Method::POST, "/api/auth/login", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{reply}");
    assert_eq!(reply["error"], "Validation");

    let (status, reply) = api.call(Method::GET, "/api/items?page=abc", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{reply}");
    assert_eq!(reply["error"], "Validation");
}

#[tokio::test]
async fn pages_past_the_end_are_empty() {
    let api = api();
    let (_, admin) = api.admin().await;
    let (_, bob) = api.sign_up("bob").await;
    let item_id = api.upload(&bob, "Denim jacket").await;
    api.approve(&admin, &item_id).await;

    let (status, body) = api
        .call(Method::GET, &format!("/api/items?page={}&per_page=10", usize::MAX), None, None)
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["items"], json!([]));
    assert_eq!(body["pagination"]["total"], 1);
}

#[tokio::test]
async fn admin_routes_are_forbidden_to_users() {
    let api = api();
    let (_, admin) = api.admin().await;
    let (bob_id, bob) = api.sign_up("bob").await;

    for uri in ["/api/admin/dashboard", "/api/admin/users", "/api/admin/reports", "/api/admin/items/pending"] {
        let (status, _) = api.call(Method::GET, uri, Some(&bob), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{uri}");
        let (status, body) = api.call(Method::GET, uri, Some(&admin), None).await;
        assert_eq!(status, StatusCode::OK, "{uri}: {body}");
    }

    let (status, body) = api
        .call(
            Method::POST,
            &format!("/api/admin/users/{bob_id}/add-points"),
            Some(&admin),
            Some(json!({ "points": -5 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Validation");

    let (status, body) = api
        .call(
            Method::POST,
            &format!("/api/admin/users/{bob_id}/toggle-admin"),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_admin"], true);
}
