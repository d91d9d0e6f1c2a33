//! Signed-token routes and user CRUD, driven through the composed router

mod common;

use axum::http::{Method, StatusCode};
use chrono::Utc;
use common::TestContext;
use serde_json::json;

#[tokio::test]
async fn health_and_index_are_public() {
    let ctx = TestContext::new().await;

    let health = ctx.get("/health", None).await;
    assert_eq!(health.status, StatusCode::OK);
    assert_eq!(health.body["status"], "healthy");

    let index = ctx.get("/", None).await;
    assert_eq!(index.status, StatusCode::OK);
    assert_eq!(index.body["message"], "OK");
}

#[tokio::test]
async fn token_path_bypasses_the_gate() {
    let ctx = TestContext::new().await;

    let response = ctx
        .json(
            Method::POST,
            "/api/v1/users/token",
            None,
            Some(json!({ "username": "alice", "password": "password123" })),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["message"], "OK");
    assert!(response.body["data"]["access_token"].is_string());

    let exp = response.body["data"]["exp"].as_i64().unwrap();
    let expected = Utc::now().timestamp() + 3600;
    assert!((expected - 5..=expected).contains(&exp));
}

#[tokio::test]
async fn protected_route_without_header_is_rejected() {
    let ctx = TestContext::new().await;

    let response = ctx.get("/api/v1/users", None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["message"], "Invalid authorization");

    let response = ctx.get("/api/v1/users", Some("not-a-jwt")).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["message"], "Invalid authorization");
}

#[tokio::test]
async fn unknown_path_is_not_found_rather_than_unauthorized() {
    let ctx = TestContext::new().await;
    let response = ctx.get("/api/v1/nothing-here", None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn signed_token_opens_the_api() {
    let ctx = TestContext::new().await;
    let token = ctx.signed_token("alice", "password123").await;

    let response = ctx.get("/api/v1/users", Some(&token)).await;
    assert_eq!(response.status, StatusCode::OK);

    let users = response.body["data"].as_array().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["username"], "alice");
    assert!(users[0].get("password").is_none());
}

#[tokio::test]
async fn me_reports_the_signed_identity() {
    let ctx = TestContext::new().await;
    let token = ctx.signed_token("alice", "password123").await;

    let response = ctx.get("/api/v1/me", Some(&token)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["user"]["username"], "alice");
    assert_eq!(response.body["data"]["auth"]["scheme"], "signed");
    assert_eq!(response.body["data"]["auth"]["username"], "alice");
}

#[tokio::test]
async fn login_failures_are_indistinguishable() {
    let ctx = TestContext::new().await;

    let unknown = ctx
        .json(
            Method::POST,
            "/api/v1/users/token",
            None,
            Some(json!({ "username": "mallory", "password": "password123" })),
        )
        .await;
    let wrong = ctx
        .json(
            Method::POST,
            "/api/v1/users/token",
            None,
            Some(json!({ "username": "alice", "password": "password124" })),
        )
        .await;

    assert_eq!(unknown.status, StatusCode::BAD_REQUEST);
    assert_eq!(unknown.status, wrong.status);
    assert_eq!(unknown.body, wrong.body);
    assert_eq!(unknown.body["message"], "incorrect username or password");
}

#[tokio::test]
async fn validation_errors_are_listed_per_field() {
    let ctx = TestContext::new().await;

    let response = ctx
        .json(Method::POST, "/api/v1/users/token", None, Some(json!({})))
        .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    let details = response.body["details"].as_array().unwrap();
    assert_eq!(details.len(), 2);
    assert_eq!(details[0]["field"], "password");
    assert_eq!(details[0]["message"], "The password field is required.");
    assert_eq!(details[1]["field"], "username");
    assert_eq!(details[1]["message"], "The username field is required.");
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let ctx = TestContext::new().await;

    let request = axum::extract::Request::builder()
        .method(Method::POST)
        .uri("/api/v1/users/token")
        .header("content-type", "application/json")
        .body(axum::body::Body::from("{not json"))
        .unwrap();
    let response = ctx.send(request).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn opaque_token_does_not_open_signed_routes() {
    let ctx = TestContext::new().await;
    let opaque = ctx.opaque_token("alice", "password123").await;
    let signed = ctx.signed_token("alice", "password123").await;

    assert_eq!(
        ctx.get("/api/v1/users", Some(&opaque)).await.status,
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        ctx.get("/api/oauth/users", Some(&signed)).await.status,
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn user_crud_round() {
    let ctx = TestContext::new().await;
    let token = ctx.signed_token("alice", "password123").await;

    let created = ctx
        .json(
            Method::POST,
            "/api/v1/users",
            Some(&token),
            Some(json!({ "username": "bob", "password": "hunter2" })),
        )
        .await;
    assert_eq!(created.status, StatusCode::OK);
    assert_eq!(created.body["message"], "save data success");

    let listed = ctx.get("/api/v1/users?limit=1&offset=1", Some(&token)).await;
    let page = listed.body["data"].as_array().unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0]["username"], "bob");
    let bob_id = page[0]["id"].as_str().unwrap().to_string();

    let found = ctx.get(&format!("/api/v1/users/{bob_id}"), Some(&token)).await;
    assert_eq!(found.status, StatusCode::OK);
    assert_eq!(found.body["data"]["username"], "bob");

    let updated = ctx
        .json(
            Method::PUT,
            "/api/v1/users",
            Some(&token),
            Some(json!({ "id": bob_id, "username": "robert", "password": "correct-horse" })),
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.body["message"], "update data success");

    // The new password is live
    ctx.signed_token("robert", "correct-horse").await;

    let deleted = ctx
        .json(Method::DELETE, &format!("/api/v1/users/{bob_id}"), Some(&token), None)
        .await;
    assert_eq!(deleted.status, StatusCode::OK);
    assert_eq!(deleted.body["message"], "delete data success");

    let gone = ctx.get(&format!("/api/v1/users/{bob_id}"), Some(&token)).await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_without_password_keeps_it() {
    let ctx = TestContext::new().await;
    let token = ctx.signed_token("alice", "password123").await;
    let alice_id = ctx.get("/api/v1/me", Some(&token)).await.body["data"]["user"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let updated = ctx
        .json(
            Method::PUT,
            "/api/v1/users",
            Some(&token),
            Some(json!({ "id": alice_id, "username": "alice" })),
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK);

    ctx.signed_token("alice", "password123").await;
}

#[tokio::test]
async fn missing_users_are_not_found() {
    let ctx = TestContext::new().await;
    let token = ctx.signed_token("alice", "password123").await;

    let response = ctx
        .json(Method::DELETE, "/api/v1/users/no-such-id", Some(&token), None)
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = ctx
        .json(
            Method::PUT,
            "/api/v1/users",
            Some(&token),
            Some(json!({ "id": "no-such-id", "username": "ghost" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn duplicate_username_conflicts() {
    let ctx = TestContext::new().await;
    let token = ctx.signed_token("alice", "password123").await;

    let response = ctx
        .json(
            Method::POST,
            "/api/v1/users",
            Some(&token),
            Some(json!({ "username": "alice", "password": "whatever" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    let ctx = TestContext::new().await;

    let generated = ctx.get("/health", None).await;
    let id = generated.headers["x-request-id"].to_str().unwrap();
    assert!(!id.is_empty());

    let request = axum::extract::Request::builder()
        .uri("/health")
        .header("x-request-id", "req-42")
        .body(axum::body::Body::empty())
        .unwrap();
    let echoed = ctx.send(request).await;
    assert_eq!(echoed.headers["x-request-id"], "req-42");
}
