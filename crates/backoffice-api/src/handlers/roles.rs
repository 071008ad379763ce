//! Roles and the resources they grant

use axum::extract::{Path, State};
use backoffice_db::entities::{resource, role, role_resource, user_role};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use std::sync::Arc;
use tracing::info;

use crate::extract::{parse_id, ValidJson, ValidQuery};
use crate::handlers::{filled, page_request};
use crate::models::{
    Ack, CreateRoleRequest, DeletedCount, IdsRequest, Role, RoleList, RolePermissionsRequest,
    RoleQuery, UpdateRoleRequest,
};
use crate::response::{ok, ApiError, ApiResult, ErrorResponse};
use crate::AppState;

async fn find_role(db: &DatabaseConnection, id: i32) -> Result<role::Model, ApiError> {
    role::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::not_found("role not found"))
}

async fn ensure_code_free(
    db: &DatabaseConnection,
    code: &str,
    except: Option<i32>,
) -> Result<(), ApiError> {
    let mut query = role::Entity::find().filter(role::Column::RoleCode.eq(code));
    if let Some(id) = except {
        query = query.filter(role::Column::Id.ne(id));
    }

    if query.count(db).await? > 0 {
        return Err(ApiError::bad_request("role code already exists"));
    }
    Ok(())
}

async fn permission_ids(db: &DatabaseConnection, role_id: i32) -> Result<Vec<i32>, ApiError> {
    let ids = role_resource::Entity::find()
        .filter(role_resource::Column::RoleId.eq(role_id))
        .order_by_asc(role_resource::Column::ResourceId)
        .all(db)
        .await?
        .into_iter()
        .map(|link| link.resource_id)
        .collect();
    Ok(ids)
}

/// List roles
#[utoipa::path(
    get,
    path = "/api/roles",
    params(
        ("page" = Option<u64>, Query, description = "Page number (default: 1)"),
        ("size" = Option<u64>, Query, description = "Page size (default: 10)"),
        ("roleName" = Option<String>, Query, description = "Filter by name (partial match)"),
        ("roleCode" = Option<String>, Query, description = "Filter by code"),
        ("status" = Option<i32>, Query, description = "Filter by status")
    ),
    responses(
        (status = 200, description = "Page of roles", body = RoleList),
        (status = 400, description = "Invalid query", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "roles"
)]
pub async fn list_roles(
    State(state): State<Arc<AppState>>,
    ValidQuery(query): ValidQuery<RoleQuery>,
) -> ApiResult<RoleList> {
    let page = page_request(query.page, query.size);

    let mut condition = Condition::all();
    if let Some(name) = filled(&query.role_name) {
        condition = condition.add(role::Column::RoleName.contains(name));
    }
    if let Some(code) = filled(&query.role_code) {
        condition = condition.add(role::Column::RoleCode.eq(code));
    }
    if let Some(status) = query.status {
        condition = condition.add(role::Column::Status.eq(status));
    }

    let paginator = role::Entity::find()
        .filter(condition)
        .order_by_asc(role::Column::Id)
        .paginate(&state.db, page.size);

    let total = paginator.num_items().await?;
    let list = paginator
        .fetch_page(page.index())
        .await?
        .into_iter()
        .map(Role::from)
        .collect();

    ok(RoleList {
        list,
        total,
        page: page.page,
        size: page.size,
    })
}

/// Get a role
#[utoipa::path(
    get,
    path = "/api/roles/{id}",
    params(("id" = i32, Path, description = "Role ID")),
    responses(
        (status = 200, description = "Role", body = Role),
        (status = 404, description = "Role not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "roles"
)]
pub async fn get_role(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Role> {
    let id = parse_id(&id, "role")?;
    ok(find_role(&state.db, id).await?.into())
}

/// Create a role
#[utoipa::path(
    post,
    path = "/api/roles",
    request_body = CreateRoleRequest,
    responses(
        (status = 200, description = "Role created", body = Role),
        (status = 400, description = "Invalid input or duplicate code", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "roles"
)]
pub async fn create_role(
    State(state): State<Arc<AppState>>,
    ValidJson(req): ValidJson<CreateRoleRequest>,
) -> ApiResult<Role> {
    let code = req.role_code.trim().to_string();
    if code.is_empty() || req.role_name.trim().is_empty() {
        return Err(ApiError::bad_request("role name and code are required"));
    }
    ensure_code_free(&state.db, &code, None).await?;

    let now = Utc::now();
    let created = role::ActiveModel {
        role_name: Set(req.role_name.trim().to_string()),
        role_code: Set(code),
        role_desc: Set(req.role_desc),
        status: Set(req.status),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    info!("Created role {} ({})", created.role_code, created.id);
    ok(created.into())
}

/// Update a role
#[utoipa::path(
    put,
    path = "/api/roles/{id}",
    params(("id" = i32, Path, description = "Role ID")),
    request_body = UpdateRoleRequest,
    responses(
        (status = 200, description = "Role updated", body = Role),
        (status = 400, description = "Duplicate code", body = ErrorResponse),
        (status = 404, description = "Role not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "roles"
)]
pub async fn update_role(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ValidJson(req): ValidJson<UpdateRoleRequest>,
) -> ApiResult<Role> {
    let id = parse_id(&id, "role")?;
    let mut active: role::ActiveModel = find_role(&state.db, id).await?.into();

    if let Some(code) = req.role_code {
        let code = code.trim().to_string();
        if code.is_empty() {
            return Err(ApiError::bad_request("role code is required"));
        }
        ensure_code_free(&state.db, &code, Some(id)).await?;
        active.role_code = Set(code);
    }
    if let Some(name) = req.role_name {
        active.role_name = Set(name);
    }
    if let Some(desc) = req.role_desc {
        active.role_desc = Set(desc);
    }
    if let Some(status) = req.status {
        active.status = Set(status);
    }
    active.updated_at = Set(Utc::now());

    ok(active.update(&state.db).await?.into())
}

/// Delete a role
#[utoipa::path(
    delete,
    path = "/api/roles/{id}",
    params(("id" = i32, Path, description = "Role ID")),
    responses(
        (status = 200, description = "Role deleted", body = Ack),
        (status = 404, description = "Role not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "roles"
)]
pub async fn delete_role(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Ack> {
    let id = parse_id(&id, "role")?;

    let deleted = delete_roles(&state.db, vec![id]).await?;
    if deleted == 0 {
        return Err(ApiError::not_found("role not found"));
    }

    info!("Deleted role {}", id);
    ok(Ack::new())
}

/// Delete several roles
#[utoipa::path(
    delete,
    path = "/api/roles/batch",
    request_body = IdsRequest,
    responses(
        (status = 200, description = "Roles deleted", body = DeletedCount),
        (status = 400, description = "No ids given", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "roles"
)]
pub async fn batch_delete_roles(
    State(state): State<Arc<AppState>>,
    ValidJson(req): ValidJson<IdsRequest>,
) -> ApiResult<DeletedCount> {
    if req.ids.is_empty() {
        return Err(ApiError::bad_request("ids must not be empty"));
    }

    let deleted = delete_roles(&state.db, req.ids).await?;
    info!("Deleted {} roles", deleted);
    ok(DeletedCount { deleted })
}

/// Remove roles together with their user and resource links.
async fn delete_roles(db: &DatabaseConnection, ids: Vec<i32>) -> Result<u64, ApiError> {
    let txn = db.begin().await?;

    user_role::Entity::delete_many()
        .filter(user_role::Column::RoleId.is_in(ids.clone()))
        .exec(&txn)
        .await?;
    role_resource::Entity::delete_many()
        .filter(role_resource::Column::RoleId.is_in(ids.clone()))
        .exec(&txn)
        .await?;
    let result = role::Entity::delete_many()
        .filter(role::Column::Id.is_in(ids))
        .exec(&txn)
        .await?;

    txn.commit().await?;
    Ok(result.rows_affected)
}

/// Get the resource ids granted to a role
#[utoipa::path(
    get,
    path = "/api/roles/{id}/permissions",
    params(("id" = i32, Path, description = "Role ID")),
    responses(
        (status = 200, description = "Granted resource ids", body = RolePermissionsRequest),
        (status = 404, description = "Role not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "roles"
)]
pub async fn get_role_permissions(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<RolePermissionsRequest> {
    let id = parse_id(&id, "role")?;
    find_role(&state.db, id).await?;

    ok(RolePermissionsRequest {
        permission_ids: permission_ids(&state.db, id).await?,
    })
}

/// Replace the resources granted to a role
#[utoipa::path(
    put,
    path = "/api/roles/{id}/permissions",
    params(("id" = i32, Path, description = "Role ID")),
    request_body = RolePermissionsRequest,
    responses(
        (status = 200, description = "Granted resource ids", body = RolePermissionsRequest),
        (status = 400, description = "Unknown resource", body = ErrorResponse),
        (status = 404, description = "Role not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "roles"
)]
pub async fn set_role_permissions(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ValidJson(req): ValidJson<RolePermissionsRequest>,
) -> ApiResult<RolePermissionsRequest> {
    let id = parse_id(&id, "role")?;
    find_role(&state.db, id).await?;

    let mut resource_ids = req.permission_ids;
    resource_ids.sort_unstable();
    resource_ids.dedup();

    if !resource_ids.is_empty() {
        let known = resource::Entity::find()
            .filter(resource::Column::Id.is_in(resource_ids.clone()))
            .count(&state.db)
            .await?;
        if known != resource_ids.len() as u64 {
            return Err(ApiError::bad_request("resource not found"));
        }
    }

    let txn = state.db.begin().await?;
    role_resource::Entity::delete_many()
        .filter(role_resource::Column::RoleId.eq(id))
        .exec(&txn)
        .await?;
    if !resource_ids.is_empty() {
        let links = resource_ids.iter().map(|&resource_id| role_resource::ActiveModel {
            role_id: Set(id),
            resource_id: Set(resource_id),
        });
        role_resource::Entity::insert_many(links)
            .exec_without_returning(&txn)
            .await?;
    }
    txn.commit().await?;

    info!("Role {} now grants {} resources", id, resource_ids.len());
    ok(RolePermissionsRequest {
        permission_ids: resource_ids,
    })
}
