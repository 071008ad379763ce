//! Integration tests for backoffice-db
//!
//! Runs against a real SQLite in-memory database

use backoffice_access_log::{
    CapturedBody, LogFilter, LogRecord, LogSink, LogStore, PageRequest, TimeRange,
};
use backoffice_db::{
    connect,
    entities::{role, sys_config, user, user_role},
    migrate, SeaOrmLogStore,
};
use chrono::{Duration as ChronoDuration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, Set,
};
use serde_json::json;
use std::time::Duration;

/// Helper to create a test database
async fn setup_test_db() -> sea_orm::DatabaseConnection {
    let db = connect("sqlite::memory:")
        .await
        .expect("Failed to connect to in-memory database");

    migrate(&db).await.expect("Failed to run migrations");

    db
}

fn record(method: &str, path: &str, status: u16) -> LogRecord {
    let now = Utc::now();
    LogRecord {
        timestamp: now,
        method: method.to_string(),
        path: path.to_string(),
        query: String::new(),
        ip: "10.0.0.1".to_string(),
        user_agent: "integration-test".to_string(),
        status,
        latency: Duration::from_millis(25),
        handler: format!("{} {}", method, path),
        request: None,
        response: None,
        errors: String::new(),
        content_length: -1,
        truncated: false,
        created_at: now,
    }
}

async fn create_user(db: &sea_orm::DatabaseConnection, username: &str) -> user::Model {
    let now = Utc::now();
    user::ActiveModel {
        username: Set(username.to_string()),
        nickname: Set(String::new()),
        email: Set(format!("{}@example.com", username)),
        phone: Set(String::new()),
        gender: Set(String::new()),
        status: Set(1),
        password_hash: Set("$argon2id$placeholder".to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to insert user")
}

async fn create_role(db: &sea_orm::DatabaseConnection, code: &str) -> role::Model {
    let now = Utc::now();
    role::ActiveModel {
        role_name: Set(code.to_uppercase()),
        role_code: Set(code.to_string()),
        role_desc: Set(String::new()),
        status: Set(1),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to insert role")
}

#[tokio::test]
async fn test_database_connection() {
    let db = connect("sqlite::memory:").await.expect("Failed to connect");

    let backend = db.get_database_backend();
    assert!(matches!(backend, sea_orm::DatabaseBackend::Sqlite));
}

#[tokio::test]
async fn test_migrations_run_successfully() {
    let db = connect("sqlite::memory:").await.expect("Failed to connect");

    let result = migrate(&db).await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_persist_batch_and_read_back() {
    let db = setup_test_db().await;
    let store = SeaOrmLogStore::new(db);

    let mut first = record("POST", "/api/users", 201);
    first.request = Some(CapturedBody::Structured(json!({"username": "alice"})));
    first.response = Some(CapturedBody::Raw("created".to_string()));
    first.truncated = true;

    store
        .persist_batch(vec![first, record("GET", "/api/roles", 200)])
        .await
        .expect("persist");

    let page = store
        .list(PageRequest::default(), &LogFilter::default())
        .await
        .expect("list");
    assert_eq!(page.total, 2);

    let created = page
        .rows
        .iter()
        .find(|row| row.record.path == "/api/users")
        .expect("row for /api/users");

    let stored = store.get(created.id).await.expect("get").expect("present");
    assert_eq!(stored.record.method, "POST");
    assert_eq!(stored.record.status, 201);
    assert_eq!(stored.record.latency, Duration::from_millis(25));
    assert_eq!(
        stored.record.request,
        Some(CapturedBody::Structured(json!({"username": "alice"})))
    );
    assert_eq!(
        stored.record.response,
        Some(CapturedBody::Raw("created".to_string()))
    );
    assert!(stored.record.truncated);
}

#[tokio::test]
async fn test_persist_empty_batch_is_noop() {
    let db = setup_test_db().await;
    let store = SeaOrmLogStore::new(db);

    store.persist_batch(Vec::new()).await.expect("persist");

    let page = store
        .list(PageRequest::default(), &LogFilter::default())
        .await
        .unwrap();
    assert_eq!(page.total, 0);
    assert!(page.rows.is_empty());
}

#[tokio::test]
async fn test_persist_large_batch() {
    let db = setup_test_db().await;
    let store = SeaOrmLogStore::new(db);

    let batch: Vec<_> = (0..1200)
        .map(|i| record("GET", &format!("/api/items/{}", i), 200))
        .collect();
    store.persist_batch(batch).await.expect("persist");

    let page = store
        .list(PageRequest::new(1, 50), &LogFilter::default())
        .await
        .unwrap();
    assert_eq!(page.total, 1200);
    assert_eq!(page.rows.len(), 50);
}

#[tokio::test]
async fn test_list_filters() {
    let db = setup_test_db().await;
    let store = SeaOrmLogStore::new(db);

    let mut other_ip = record("GET", "/api/menu/tree", 200);
    other_ip.ip = "192.168.1.9".to_string();

    store
        .persist_batch(vec![
            record("GET", "/api/users", 200),
            record("POST", "/api/users", 400),
            record("DELETE", "/api/roles/3", 200),
            other_ip,
        ])
        .await
        .unwrap();

    let by_method = LogFilter {
        method: Some("post".to_string()),
        ..Default::default()
    };
    let page = store.list(PageRequest::default(), &by_method).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.rows[0].record.status, 400);

    let by_path = LogFilter {
        path: Some("users".to_string()),
        ..Default::default()
    };
    assert_eq!(
        store.list(PageRequest::default(), &by_path).await.unwrap().total,
        2
    );

    let by_status = LogFilter {
        status: Some(200),
        ..Default::default()
    };
    assert_eq!(
        store
            .list(PageRequest::default(), &by_status)
            .await
            .unwrap()
            .total,
        3
    );

    let by_ip = LogFilter {
        ip: Some("192.168.1.9".to_string()),
        ..Default::default()
    };
    let page = store.list(PageRequest::default(), &by_ip).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.rows[0].record.path, "/api/menu/tree");

    let by_handler = LogFilter {
        handler: Some("DELETE /api/roles".to_string()),
        ..Default::default()
    };
    assert_eq!(
        store
            .list(PageRequest::default(), &by_handler)
            .await
            .unwrap()
            .total,
        1
    );
}

#[tokio::test]
async fn test_substring_filters_are_literal_and_ignore_case() {
    let db = setup_test_db().await;
    let store = SeaOrmLogStore::new(db);

    store
        .persist_batch(vec![
            record("GET", "/api/school_admission", 200),
            record("GET", "/api/schoolXadmission", 200),
            record("GET", "/api/100%/done", 200),
        ])
        .await
        .unwrap();

    let underscore = LogFilter {
        path: Some("school_adm".to_string()),
        ..Default::default()
    };
    let page = store.list(PageRequest::default(), &underscore).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.rows[0].record.path, "/api/school_admission");

    let percent = LogFilter {
        path: Some("100%".to_string()),
        ..Default::default()
    };
    assert_eq!(
        store.list(PageRequest::default(), &percent).await.unwrap().total,
        1
    );

    let upper = LogFilter {
        handler: Some("GET /API/SCHOOL".to_string()),
        ..Default::default()
    };
    assert_eq!(
        store.list(PageRequest::default(), &upper).await.unwrap().total,
        2
    );
}

#[tokio::test]
async fn test_list_huge_page_number_is_empty() {
    let db = setup_test_db().await;
    let store = SeaOrmLogStore::new(db);

    store
        .persist_batch(vec![record("GET", "/api/users", 200)])
        .await
        .unwrap();

    let page = store
        .list(PageRequest::new(u64::MAX, 1000), &LogFilter::default())
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert!(page.rows.is_empty());
}

#[tokio::test]
async fn test_list_time_range() {
    let db = setup_test_db().await;
    let store = SeaOrmLogStore::new(db);

    let mut old = record("GET", "/api/old", 200);
    old.timestamp = Utc::now() - ChronoDuration::days(3);
    store
        .persist_batch(vec![old, record("GET", "/api/new", 200)])
        .await
        .unwrap();

    let recent = LogFilter {
        time_range: Some(TimeRange {
            start: Utc::now() - ChronoDuration::hours(1),
            end: Utc::now() + ChronoDuration::hours(1),
        }),
        ..Default::default()
    };
    let page = store.list(PageRequest::default(), &recent).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.rows[0].record.path, "/api/new");
}

#[tokio::test]
async fn test_list_newest_first_with_pagination() {
    let db = setup_test_db().await;
    let store = SeaOrmLogStore::new(db);

    let base = Utc::now();
    let batch: Vec<_> = (0..5)
        .map(|i| {
            let mut r = record("GET", &format!("/api/page/{}", i), 200);
            r.timestamp = base + ChronoDuration::seconds(i);
            r
        })
        .collect();
    store.persist_batch(batch).await.unwrap();

    let first = store
        .list(PageRequest::new(1, 2), &LogFilter::default())
        .await
        .unwrap();
    assert_eq!(first.total, 5);
    assert_eq!(first.rows[0].record.path, "/api/page/4");
    assert_eq!(first.rows[1].record.path, "/api/page/3");

    let last = store
        .list(PageRequest::new(3, 2), &LogFilter::default())
        .await
        .unwrap();
    assert_eq!(last.rows.len(), 1);
    assert_eq!(last.rows[0].record.path, "/api/page/0");
}

#[tokio::test]
async fn test_soft_delete_hides_rows() {
    let db = setup_test_db().await;
    let store = SeaOrmLogStore::new(db.clone());

    store
        .persist_batch(vec![
            record("GET", "/a", 200),
            record("GET", "/b", 200),
            record("GET", "/c", 200),
        ])
        .await
        .unwrap();

    let ids: Vec<i32> = store
        .list(PageRequest::default(), &LogFilter::default())
        .await
        .unwrap()
        .rows
        .iter()
        .map(|row| row.id)
        .collect();

    assert!(store.delete(ids[0]).await.unwrap());
    assert!(!store.delete(ids[0]).await.unwrap());
    assert!(store.get(ids[0]).await.unwrap().is_none());

    // Row is still physically present
    let physical = backoffice_db::entities::AccessLog::find()
        .count(&db)
        .await
        .unwrap();
    assert_eq!(physical, 3);

    let removed = store.delete_many(&[ids[0], ids[1]]).await.unwrap();
    assert_eq!(removed, 1);

    assert_eq!(store.delete_many(&[]).await.unwrap(), 0);

    let remaining = store
        .list(PageRequest::default(), &LogFilter::default())
        .await
        .unwrap();
    assert_eq!(remaining.total, 1);
    assert_eq!(remaining.rows[0].id, ids[2]);

    assert_eq!(store.delete_all().await.unwrap(), 1);
    assert_eq!(store.delete_all().await.unwrap(), 0);
}

#[tokio::test]
async fn test_get_missing_log() {
    let db = setup_test_db().await;
    let store = SeaOrmLogStore::new(db);

    assert!(store.get(9999).await.unwrap().is_none());
}

#[tokio::test]
async fn test_unique_username() {
    let db = setup_test_db().await;

    create_user(&db, "alice").await;

    let now = Utc::now();
    let duplicate = user::ActiveModel {
        username: Set("alice".to_string()),
        nickname: Set(String::new()),
        email: Set(String::new()),
        phone: Set(String::new()),
        gender: Set(String::new()),
        status: Set(1),
        password_hash: Set(String::new()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&db)
    .await;

    assert!(duplicate.is_err());
}

#[tokio::test]
async fn test_unique_config_key() {
    let db = setup_test_db().await;

    let config = |key: &str| sys_config::ActiveModel {
        config_key: Set(key.to_string()),
        config_name: Set("Site name".to_string()),
        config_value: Set("Back Office".to_string()),
        config_type: Set("Y".to_string()),
        remark: Set(String::new()),
        create_time: Set(Utc::now()),
        ..Default::default()
    };

    config("site.name").insert(&db).await.expect("first insert");
    assert!(config("site.name").insert(&db).await.is_err());
}

#[tokio::test]
async fn test_user_role_relation() {
    let db = setup_test_db().await;

    let alice = create_user(&db, "alice").await;
    let admin = create_role(&db, "admin").await;
    let editor = create_role(&db, "editor").await;

    for role_id in [admin.id, editor.id] {
        user_role::ActiveModel {
            user_id: Set(alice.id),
            role_id: Set(role_id),
        }
        .insert(&db)
        .await
        .expect("assign role");
    }

    let roles = alice.find_related(role::Entity).all(&db).await.unwrap();
    let mut codes: Vec<_> = roles.into_iter().map(|r| r.role_code).collect();
    codes.sort();
    assert_eq!(codes, vec!["admin", "editor"]);

    let assignments = user_role::Entity::find()
        .filter(user_role::Column::UserId.eq(alice.id))
        .count(&db)
        .await
        .unwrap();
    assert_eq!(assignments, 2);
}
