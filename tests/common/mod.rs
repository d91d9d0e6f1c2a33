//! Shared setup for the router-level tests: an in-memory app seeded with
//! `alice/password123` and the OAuth clients `000000/999999` and
//! `111111/888888`.
#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    extract::Request,
    http::{header, HeaderMap, Method, StatusCode},
    Router,
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;
use warden_api::{
    create_app,
    utils::config::{
        ClientConfig, Config, JwtConfig, OAuthConfig, PasswordConfig, SeedUser, ServerConfig,
    },
    AppState,
};

pub const CLIENT_ID: &str = "000000";
pub const CLIENT_SECRET: &str = "999999";
pub const OTHER_CLIENT_ID: &str = "111111";
pub const OTHER_CLIENT_SECRET: &str = "888888";

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

pub struct TestContext {
    pub app: Router,
    pub state: AppState,
}

pub fn test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_origins: vec!["*".to_string()],
            request_timeout_secs: 30,
            shutdown_timeout_secs: 10,
        },
        database: None,
        jwt: JwtConfig {
            secret: "test-jwt-secret-key-for-testing-only".to_string(),
            validity_secs: 3600,
        },
        // Cheap parameters, the tests hash a lot
        password: PasswordConfig {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        },
        oauth: OAuthConfig {
            clients: vec![
                ClientConfig {
                    id: CLIENT_ID.to_string(),
                    secret: CLIENT_SECRET.to_string(),
                    redirect_uri: "http://localhost".to_string(),
                },
                ClientConfig {
                    id: OTHER_CLIENT_ID.to_string(),
                    secret: OTHER_CLIENT_SECRET.to_string(),
                    redirect_uri: "http://localhost:9000".to_string(),
                },
            ],
            token_validity_secs: 7200,
            sweep_interval_secs: 60,
        },
        seed_users: vec![SeedUser {
            username: "alice".to_string(),
            password: "password123".to_string(),
        }],
    }
}

impl TestContext {
    pub async fn new() -> Self {
        let state = AppState::build(Arc::new(test_config()))
            .await
            .expect("Failed to build state");
        let app = create_app(state.clone());
        Self { app, state }
    }

    pub async fn send(&self, request: Request) -> TestResponse {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn json(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.json(Method::GET, uri, token, None).await
    }

    pub async fn form(
        &self,
        uri: &str,
        fields: &[(&str, &str)],
        authorization: Option<&str>,
    ) -> TestResponse {
        let encoded = fields
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        let mut request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(value) = authorization {
            request = request.header(header::AUTHORIZATION, value);
        }
        self.send(request.body(Body::from(encoded)).unwrap()).await
    }

    /// Log in through `POST /api/v1/users/token`
    pub async fn signed_token(&self, username: &str, password: &str) -> String {
        let response = self
            .json(
                Method::POST,
                "/api/v1/users/token",
                None,
                Some(serde_json::json!({ "username": username, "password": password })),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.body);
        response.body["data"]["access_token"]
            .as_str()
            .unwrap()
            .to_string()
    }

    /// Password grant through `POST /oauth/token` with form client credentials
    pub async fn opaque_token(&self, username: &str, password: &str) -> String {
        let response = self
            .form(
                "/oauth/token",
                &[
                    ("grant_type", "password"),
                    ("username", username),
                    ("password", password),
                    ("client_id", CLIENT_ID),
                    ("client_secret", CLIENT_SECRET),
                ],
                None,
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.body);
        response.body["access_token"].as_str().unwrap().to_string()
    }
}
