//! Shared fixtures for the API integration tests

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use backoffice_access_log::{log_channel, LogReceiver, LogSender, LogStore, MemoryLogStore};
use backoffice_api::{default_skip_auth_paths, ApiServer, ApiServerConfig};
use backoffice_auth::hash_password;
use backoffice_db::entities::user;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt; // For `oneshot` method

pub const ADMIN_PASSWORD: &str = "admin123";

pub struct TestApp {
    pub router: Router,
    pub db: DatabaseConnection,
    pub logs: Arc<MemoryLogStore>,
    pub sender: LogSender,
    /// Held so enqueues are not rejected as closed; tests that flush take it.
    pub receiver: Option<LogReceiver>,
}

/// Helper to create an in-memory database with migrations applied
pub async fn create_test_db() -> DatabaseConnection {
    let db = backoffice_db::connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");
    backoffice_db::migrate(&db)
        .await
        .expect("Failed to run migrations");
    db
}

pub fn test_config(capture_skip_paths: Vec<String>) -> ApiServerConfig {
    ApiServerConfig {
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        enable_cors: false,
        cors_origins: None,
        jwt_secret: "test-secret".to_string(),
        jwt_issuer: "backoffice-test".to_string(),
        token_ttl: chrono::Duration::hours(1),
        skip_auth_paths: default_skip_auth_paths(),
        timezone: chrono::FixedOffset::east_opt(0).unwrap(),
        max_body_bytes: 0,
        capture_skip_paths,
    }
}

/// App whose access logs are never flushed
pub async fn spawn_app() -> TestApp {
    let db = create_test_db().await;
    let logs = Arc::new(MemoryLogStore::new());
    let (sender, receiver) = log_channel(1000);

    let server = ApiServer::new(
        test_config(vec!["/api/system/log".to_string()]),
        db.clone(),
        logs.clone() as Arc<dyn LogStore>,
        sender.clone(),
    );

    TestApp {
        router: server.build_router(),
        db,
        logs,
        sender,
        receiver: Some(receiver),
    }
}

pub async fn create_user(db: &DatabaseConnection, username: &str, password: &str) -> user::Model {
    let now = Utc::now();
    user::ActiveModel {
        username: Set(username.to_string()),
        nickname: Set(format!("{} nick", username)),
        email: Set(format!("{}@example.com", username)),
        phone: Set(String::new()),
        gender: Set(String::new()),
        status: Set(1),
        password_hash: Set(hash_password(password).unwrap()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn send(
    router: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };

    (status, value)
}

pub async fn login(router: &Router, username: &str, password: &str) -> String {
    let (status, body) = send(
        router,
        "POST",
        "/api/auth/login",
        None,
        Some(serde_json::json!({ "username": username, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {}", body);
    body["data"]["token"].as_str().unwrap().to_string()
}

/// Seed an admin and return its token.
pub async fn admin_token(app: &TestApp) -> String {
    create_user(&app.db, "admin", ADMIN_PASSWORD).await;
    login(&app.router, "admin", ADMIN_PASSWORD).await
}
