//! User accounts and their role assignments

use axum::extract::{Path, State};
use backoffice_auth::{check_password_policy, hash_password};
use backoffice_db::entities::{role, user, user_role};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use std::sync::Arc;
use tracing::info;

use crate::extract::{parse_id, ValidJson, ValidQuery};
use crate::handlers::{filled, page_request};
use crate::models::{
    Ack, AssignRolesRequest, CreateUserRequest, Role, UpdateUserRequest, User, UserList,
    UserQuery,
};
use crate::response::{ok, ApiError, ApiResult, ErrorResponse};
use crate::AppState;

async fn find_user(db: &DatabaseConnection, id: i32) -> Result<user::Model, ApiError> {
    user::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::not_found("user not found"))
}

async fn ensure_username_free(
    db: &DatabaseConnection,
    username: &str,
    except: Option<i32>,
) -> Result<(), ApiError> {
    let mut query = user::Entity::find().filter(user::Column::Username.eq(username));
    if let Some(id) = except {
        query = query.filter(user::Column::Id.ne(id));
    }

    if query.count(db).await? > 0 {
        return Err(ApiError::bad_request("username already exists"));
    }
    Ok(())
}

/// List users
#[utoipa::path(
    get,
    path = "/api/users",
    params(
        ("page" = Option<u64>, Query, description = "Page number (default: 1)"),
        ("pageSize" = Option<u64>, Query, description = "Page size (default: 10)"),
        ("username" = Option<String>, Query, description = "Filter by username (partial match)"),
        ("status" = Option<i32>, Query, description = "Filter by status")
    ),
    responses(
        (status = 200, description = "Page of users", body = UserList),
        (status = 400, description = "Invalid query", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    ValidQuery(query): ValidQuery<UserQuery>,
) -> ApiResult<UserList> {
    let page = page_request(query.page, query.page_size);

    let mut condition = Condition::all();
    if let Some(username) = filled(&query.username) {
        condition = condition.add(user::Column::Username.contains(username));
    }
    if let Some(status) = query.status {
        condition = condition.add(user::Column::Status.eq(status));
    }

    let paginator = user::Entity::find()
        .filter(condition)
        .order_by_asc(user::Column::Id)
        .paginate(&state.db, page.size);

    let total = paginator.num_items().await?;
    let list = paginator
        .fetch_page(page.index())
        .await?
        .into_iter()
        .map(User::from)
        .collect();

    ok(UserList {
        list,
        total,
        page: page.page,
        page_size: page.size,
    })
}

/// Get a user
#[utoipa::path(
    get,
    path = "/api/users/{id}",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User", body = User),
        (status = 400, description = "Invalid ID", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<User> {
    let id = parse_id(&id, "user")?;
    ok(find_user(&state.db, id).await?.into())
}

/// Create a user
#[utoipa::path(
    post,
    path = "/api/users",
    request_body = CreateUserRequest,
    responses(
        (status = 200, description = "User created", body = User),
        (status = 400, description = "Invalid input or duplicate username", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    ValidJson(req): ValidJson<CreateUserRequest>,
) -> ApiResult<User> {
    let username = req.username.trim().to_string();
    if username.is_empty() {
        return Err(ApiError::bad_request("username is required"));
    }
    check_password_policy(&req.password)?;
    ensure_username_free(&state.db, &username, None).await?;

    let now = Utc::now();
    let created = user::ActiveModel {
        username: Set(username),
        nickname: Set(req.nickname),
        email: Set(req.email),
        phone: Set(req.phone),
        gender: Set(req.gender),
        status: Set(req.status),
        password_hash: Set(hash_password(&req.password)?),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    info!("Created user {} ({})", created.username, created.id);
    ok(created.into())
}

/// Update a user
#[utoipa::path(
    put,
    path = "/api/users/{id}",
    params(("id" = i32, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = User),
        (status = 400, description = "Invalid input or duplicate username", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ValidJson(req): ValidJson<UpdateUserRequest>,
) -> ApiResult<User> {
    let id = parse_id(&id, "user")?;
    let existing = find_user(&state.db, id).await?;
    let mut active: user::ActiveModel = existing.into();

    if let Some(username) = req.username {
        let username = username.trim().to_string();
        if username.is_empty() {
            return Err(ApiError::bad_request("username is required"));
        }
        ensure_username_free(&state.db, &username, Some(id)).await?;
        active.username = Set(username);
    }
    if let Some(password) = req.password.filter(|p| !p.is_empty()) {
        check_password_policy(&password)?;
        active.password_hash = Set(hash_password(&password)?);
    }
    if let Some(nickname) = req.nickname {
        active.nickname = Set(nickname);
    }
    if let Some(email) = req.email {
        active.email = Set(email);
    }
    if let Some(phone) = req.phone {
        active.phone = Set(phone);
    }
    if let Some(gender) = req.gender {
        active.gender = Set(gender);
    }
    if let Some(status) = req.status {
        active.status = Set(status);
    }
    active.updated_at = Set(Utc::now());

    ok(active.update(&state.db).await?.into())
}

/// Delete a user
#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User deleted", body = Ack),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Ack> {
    let id = parse_id(&id, "user")?;

    let txn = state.db.begin().await?;
    user_role::Entity::delete_many()
        .filter(user_role::Column::UserId.eq(id))
        .exec(&txn)
        .await?;
    let result = user::Entity::delete_by_id(id).exec(&txn).await?;
    if result.rows_affected == 0 {
        txn.rollback().await?;
        return Err(ApiError::not_found("user not found"));
    }
    txn.commit().await?;

    info!("Deleted user {}", id);
    ok(Ack::new())
}

/// Replace a user's roles
#[utoipa::path(
    post,
    path = "/api/users/{id}/roles",
    params(("id" = i32, Path, description = "User ID")),
    request_body = AssignRolesRequest,
    responses(
        (status = 200, description = "Roles now assigned to the user", body = Vec<Role>),
        (status = 400, description = "Unknown role", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn assign_roles(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ValidJson(req): ValidJson<AssignRolesRequest>,
) -> ApiResult<Vec<Role>> {
    let id = parse_id(&id, "user")?;
    let user = find_user(&state.db, id).await?;

    let mut role_ids = req.role_ids;
    role_ids.sort_unstable();
    role_ids.dedup();

    if !role_ids.is_empty() {
        let known = role::Entity::find()
            .filter(role::Column::Id.is_in(role_ids.clone()))
            .count(&state.db)
            .await?;
        if known != role_ids.len() as u64 {
            return Err(ApiError::bad_request("role not found"));
        }
    }

    let txn = state.db.begin().await?;
    user_role::Entity::delete_many()
        .filter(user_role::Column::UserId.eq(id))
        .exec(&txn)
        .await?;
    if !role_ids.is_empty() {
        let links = role_ids.iter().map(|&role_id| user_role::ActiveModel {
            user_id: Set(id),
            role_id: Set(role_id),
        });
        user_role::Entity::insert_many(links)
            .exec_without_returning(&txn)
            .await?;
    }
    txn.commit().await?;

    info!("Assigned {} roles to user {}", role_ids.len(), id);

    let roles = user
        .find_related(role::Entity)
        .order_by_asc(role::Column::Id)
        .all(&state.db)
        .await?;
    ok(roles.into_iter().map(Role::from).collect())
}

/// Get a user's roles
#[utoipa::path(
    get,
    path = "/api/users/{id}/roles",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "Roles assigned to the user", body = Vec<Role>),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn get_user_roles(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Vec<Role>> {
    let id = parse_id(&id, "user")?;
    let user = find_user(&state.db, id).await?;

    let roles = user
        .find_related(role::Entity)
        .order_by_asc(role::Column::Id)
        .all(&state.db)
        .await?;
    ok(roles.into_iter().map(Role::from).collect())
}
