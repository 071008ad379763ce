//! Integration tests for authentication endpoints

mod common;

use axum::http::StatusCode;
use backoffice_db::entities::{resource, role, role_resource, user, user_role};
use chrono::Utc;
use common::{admin_token, create_user, login, send, spawn_app, ADMIN_PASSWORD};
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde_json::json;

#[tokio::test]
async fn test_login_success_returns_user_info() {
    let app = spawn_app().await;
    let admin = create_user(&app.db, "admin", ADMIN_PASSWORD).await;

    let now = Utc::now();
    let role = role::ActiveModel {
        role_name: Set("Administrator".to_string()),
        role_code: Set("admin".to_string()),
        role_desc: Set(String::new()),
        status: Set(1),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&app.db)
    .await
    .unwrap();
    let resource = resource::ActiveModel {
        resource_name: Set("Users".to_string()),
        permission_code: Set("system:user:list".to_string()),
        resource_type: Set("MENU".to_string()),
        sort: Set(0),
        status: Set(1),
        requires_auth: Set(1),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&app.db)
    .await
    .unwrap();
    user_role::Entity::insert(user_role::ActiveModel {
        user_id: Set(admin.id),
        role_id: Set(role.id),
    })
    .exec_without_returning(&app.db)
    .await
    .unwrap();
    role_resource::Entity::insert(role_resource::ActiveModel {
        role_id: Set(role.id),
        resource_id: Set(resource.id),
    })
    .exec_without_returning(&app.db)
    .await
    .unwrap();

    let (status, body) = send(
        &app.router,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "username": "admin", "password": ADMIN_PASSWORD })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["code"], 200);
    assert!(!body["data"]["token"].as_str().unwrap().is_empty());
    assert_eq!(body["data"]["expiresIn"], 3600);

    let info = &body["data"]["userInfo"];
    assert_eq!(info["username"], "admin");
    assert_eq!(info["roles"], json!(["admin"]));
    assert_eq!(info["permissions"], json!(["system:user:list"]));
    assert_eq!(info["createdAt"].as_str().unwrap().len(), 19);
}

#[tokio::test]
async fn test_login_rejects_bad_credentials() {
    let app = spawn_app().await;
    create_user(&app.db, "admin", ADMIN_PASSWORD).await;

    for (username, password) in [("admin", "wrong-password"), ("ghost", ADMIN_PASSWORD)] {
        let (status, body) = send(
            &app.router,
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "username": username, "password": password })),
        )
        .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "invalid username or password");
        assert_eq!(body["code"], 401);
    }
}

#[tokio::test]
async fn test_login_disabled_account() {
    let app = spawn_app().await;
    let user = create_user(&app.db, "bob", "secret1").await;

    let mut active: user::ActiveModel = user.into();
    active.status = Set(0);
    active.update(&app.db).await.unwrap();

    let (status, body) = send(
        &app.router,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "username": "bob", "password": "secret1" })),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "account is disabled");
}

#[tokio::test]
async fn test_malformed_login_body_is_bad_request() {
    let app = spawn_app().await;

    let (status, body) = send(
        &app.router,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "username": "admin" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let app = spawn_app().await;

    let (status, body) = send(&app.router, "GET", "/api/auth/user", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "missing Authorization header");

    let (status, body) = send(&app.router, "GET", "/api/users", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "invalid or expired token");

    let (status, _) = send(&app.router, "GET", "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_current_user_and_logout() {
    let app = spawn_app().await;
    let token = admin_token(&app).await;

    let (status, body) = send(&app.router, "GET", "/api/auth/user", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "admin");
    assert_eq!(body["data"]["email"], "admin@example.com");

    let (status, body) = send(&app.router, "POST", "/api/auth/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["ok"], true);
}

#[tokio::test]
async fn test_refresh_token() {
    let app = spawn_app().await;
    let token = admin_token(&app).await;

    let (status, body) = send(
        &app.router,
        "POST",
        "/api/auth/refresh",
        Some(&token),
        Some(json!({ "token": token })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let fresh = body["data"]["token"].as_str().unwrap().to_string();

    let (status, _) = send(&app.router, "GET", "/api/auth/user", Some(&fresh), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app.router,
        "POST",
        "/api/auth/refresh",
        Some(&token),
        Some(json!({ "token": "not-a-jwt" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "invalid or expired token");
}

#[tokio::test]
async fn test_refresh_for_deleted_user() {
    let app = spawn_app().await;
    let user = create_user(&app.db, "carol", "secret1").await;
    let token = login(&app.router, "carol", "secret1").await;

    user::Entity::delete_by_id(user.id)
        .exec(&app.db)
        .await
        .unwrap();

    let (status, body) = send(
        &app.router,
        "POST",
        "/api/auth/refresh",
        Some(&token),
        Some(json!({ "token": token })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "user not found");
}

#[tokio::test]
async fn test_change_password() {
    let app = spawn_app().await;
    let token = admin_token(&app).await;

    let (status, body) = send(
        &app.router,
        "POST",
        "/api/auth/change-password",
        Some(&token),
        Some(json!({ "oldPassword": "nope-nope", "newPassword": "brand-new" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "old password is incorrect");

    let (status, _) = send(
        &app.router,
        "POST",
        "/api/auth/change-password",
        Some(&token),
        Some(json!({ "oldPassword": ADMIN_PASSWORD, "newPassword": "abc" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app.router,
        "POST",
        "/api/auth/change-password",
        Some(&token),
        Some(json!({ "oldPassword": ADMIN_PASSWORD, "newPassword": "brand-new" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    login(&app.router, "admin", "brand-new").await;
    let (status, _) = send(
        &app.router,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "username": "admin", "password": ADMIN_PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
