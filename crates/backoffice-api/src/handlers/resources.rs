//! Permission-bearing resources (menus, buttons, APIs)

use axum::{
    extract::{Path, State},
    Extension,
};
use backoffice_db::entities::{resource, role_resource};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use std::sync::Arc;
use tracing::info;

use crate::extract::{parse_id, ValidJson, ValidQuery};
use crate::handlers::{build_tree, filled, page_request, total_pages};
use crate::middleware::AuthUser;
use crate::models::{
    Ack, CreateResourceRequest, Resource, ResourceList, ResourceQuery, UpdateResourceRequest,
};
use crate::response::{ok, ApiError, ApiResult, ErrorResponse};
use crate::AppState;

const RESOURCE_TYPES: [&str; 3] = ["MENU", "BUTTON", "API"];

async fn find_resource(db: &DatabaseConnection, id: i32) -> Result<resource::Model, ApiError> {
    resource::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::not_found("resource not found"))
}

async fn ensure_code_free(
    db: &DatabaseConnection,
    code: &str,
    except: Option<i32>,
) -> Result<(), ApiError> {
    let mut query = resource::Entity::find().filter(resource::Column::PermissionCode.eq(code));
    if let Some(id) = except {
        query = query.filter(resource::Column::Id.ne(id));
    }

    if query.count(db).await? > 0 {
        return Err(ApiError::bad_request("permission code already exists"));
    }
    Ok(())
}

fn check_type(resource_type: &str) -> Result<String, ApiError> {
    let upper = resource_type.trim().to_ascii_uppercase();
    if !RESOURCE_TYPES.contains(&upper.as_str()) {
        return Err(ApiError::bad_request(format!(
            "invalid resource type: {}",
            resource_type
        )));
    }
    Ok(upper)
}

async fn check_parent(
    db: &DatabaseConnection,
    parent_id: Option<i32>,
    own_id: Option<i32>,
) -> Result<(), ApiError> {
    let Some(parent_id) = parent_id else {
        return Ok(());
    };
    if Some(parent_id) == own_id {
        return Err(ApiError::bad_request("resource cannot be its own parent"));
    }
    if resource::Entity::find_by_id(parent_id).one(db).await?.is_none() {
        return Err(ApiError::bad_request("parent resource not found"));
    }
    Ok(())
}

/// List resources
#[utoipa::path(
    get,
    path = "/api/resources",
    params(
        ("page" = Option<u64>, Query, description = "Page number (default: 1)"),
        ("page_size" = Option<u64>, Query, description = "Page size (default: 10)"),
        ("resource_name" = Option<String>, Query, description = "Filter by name (partial match)"),
        ("type" = Option<String>, Query, description = "MENU, BUTTON or API"),
        ("status" = Option<i32>, Query, description = "Filter by status")
    ),
    responses(
        (status = 200, description = "Page of resources", body = ResourceList)
    ),
    security(("bearer_auth" = [])),
    tag = "resources"
)]
pub async fn list_resources(
    State(state): State<Arc<AppState>>,
    ValidQuery(query): ValidQuery<ResourceQuery>,
) -> ApiResult<ResourceList> {
    let page = page_request(query.page, query.page_size);

    let mut condition = Condition::all();
    if let Some(name) = filled(&query.resource_name) {
        condition = condition.add(resource::Column::ResourceName.contains(name));
    }
    if let Some(resource_type) = filled(&query.resource_type) {
        condition = condition
            .add(resource::Column::ResourceType.eq(resource_type.to_ascii_uppercase()));
    }
    if let Some(status) = query.status {
        condition = condition.add(resource::Column::Status.eq(status));
    }

    let paginator = resource::Entity::find()
        .filter(condition)
        .order_by_asc(resource::Column::Sort)
        .order_by_asc(resource::Column::Id)
        .paginate(&state.db, page.size);

    let total = paginator.num_items().await?;
    let data = paginator
        .fetch_page(page.index())
        .await?
        .into_iter()
        .map(Resource::from)
        .collect();

    ok(ResourceList {
        data,
        total,
        page: page.page,
        page_size: page.size,
        total_pages: total_pages(total, page.size),
    })
}

/// All resources nested by parent
#[utoipa::path(
    get,
    path = "/api/resources/tree",
    responses(
        (status = 200, description = "Resource tree", body = Vec<Resource>)
    ),
    security(("bearer_auth" = [])),
    tag = "resources"
)]
pub async fn resource_tree(State(state): State<Arc<AppState>>) -> ApiResult<Vec<Resource>> {
    let rows = resource::Entity::find().all(&state.db).await?;
    ok(build_tree(rows.into_iter().map(Resource::from).collect()))
}

/// Get a resource
#[utoipa::path(
    get,
    path = "/api/resources/{id}",
    params(("id" = i32, Path, description = "Resource ID")),
    responses(
        (status = 200, description = "Resource", body = Resource),
        (status = 404, description = "Resource not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "resources"
)]
pub async fn get_resource(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Resource> {
    let id = parse_id(&id, "resource")?;
    ok(find_resource(&state.db, id).await?.into())
}

/// Create a resource
#[utoipa::path(
    post,
    path = "/api/resources",
    request_body = CreateResourceRequest,
    responses(
        (status = 200, description = "Resource created", body = Resource),
        (status = 400, description = "Invalid input or duplicate permission code", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "resources"
)]
pub async fn create_resource(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    ValidJson(req): ValidJson<CreateResourceRequest>,
) -> ApiResult<Resource> {
    let code = req.permission_code.trim().to_string();
    if code.is_empty() || req.resource_name.trim().is_empty() {
        return Err(ApiError::bad_request(
            "resource name and permission code are required",
        ));
    }
    let resource_type = check_type(&req.resource_type)?;
    ensure_code_free(&state.db, &code, None).await?;
    check_parent(&state.db, req.parent_id, None).await?;

    let now = Utc::now();
    let created = resource::ActiveModel {
        resource_name: Set(req.resource_name.trim().to_string()),
        permission_code: Set(code),
        description: Set(req.desc),
        resource_type: Set(resource_type),
        resource_path: Set(req.resource_path),
        http_method: Set(req.http_method.map(|m| m.to_ascii_uppercase())),
        parent_id: Set(req.parent_id),
        sort: Set(req.sort),
        status: Set(req.status),
        requires_auth: Set(req.requires_auth),
        remark: Set(req.remark),
        created_by: Set(Some(auth.user_id)),
        updated_by: Set(Some(auth.user_id)),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    info!("Created resource {} ({})", created.permission_code, created.id);
    ok(created.into())
}

/// Update a resource
#[utoipa::path(
    put,
    path = "/api/resources/{id}",
    params(("id" = i32, Path, description = "Resource ID")),
    request_body = UpdateResourceRequest,
    responses(
        (status = 200, description = "Resource updated", body = Resource),
        (status = 400, description = "Invalid input or duplicate permission code", body = ErrorResponse),
        (status = 404, description = "Resource not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "resources"
)]
pub async fn update_resource(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Extension(auth): Extension<AuthUser>,
    ValidJson(req): ValidJson<UpdateResourceRequest>,
) -> ApiResult<Resource> {
    let id = parse_id(&id, "resource")?;
    let mut active: resource::ActiveModel = find_resource(&state.db, id).await?.into();

    if let Some(code) = req.permission_code {
        let code = code.trim().to_string();
        if code.is_empty() {
            return Err(ApiError::bad_request("permission code is required"));
        }
        ensure_code_free(&state.db, &code, Some(id)).await?;
        active.permission_code = Set(code);
    }
    if let Some(resource_type) = req.resource_type {
        active.resource_type = Set(check_type(&resource_type)?);
    }
    if req.parent_id.is_some() {
        check_parent(&state.db, req.parent_id, Some(id)).await?;
        active.parent_id = Set(req.parent_id);
    }
    if let Some(name) = req.resource_name {
        active.resource_name = Set(name);
    }
    if let Some(desc) = req.desc {
        active.description = Set(Some(desc));
    }
    if let Some(path) = req.resource_path {
        active.resource_path = Set(Some(path));
    }
    if let Some(method) = req.http_method {
        active.http_method = Set(Some(method.to_ascii_uppercase()));
    }
    if let Some(sort) = req.sort {
        active.sort = Set(sort);
    }
    if let Some(status) = req.status {
        active.status = Set(status);
    }
    if let Some(requires_auth) = req.requires_auth {
        active.requires_auth = Set(requires_auth);
    }
    if let Some(remark) = req.remark {
        active.remark = Set(Some(remark));
    }
    active.updated_by = Set(Some(auth.user_id));
    active.updated_at = Set(Utc::now());

    ok(active.update(&state.db).await?.into())
}

/// Delete a resource
#[utoipa::path(
    delete,
    path = "/api/resources/{id}",
    params(("id" = i32, Path, description = "Resource ID")),
    responses(
        (status = 200, description = "Resource deleted", body = Ack),
        (status = 400, description = "Resource still has children", body = ErrorResponse),
        (status = 404, description = "Resource not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "resources"
)]
pub async fn delete_resource(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Ack> {
    let id = parse_id(&id, "resource")?;
    find_resource(&state.db, id).await?;

    let children = resource::Entity::find()
        .filter(resource::Column::ParentId.eq(id))
        .count(&state.db)
        .await?;
    if children > 0 {
        return Err(ApiError::bad_request("resource has child resources"));
    }

    let txn = state.db.begin().await?;
    role_resource::Entity::delete_many()
        .filter(role_resource::Column::ResourceId.eq(id))
        .exec(&txn)
        .await?;
    resource::Entity::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;

    info!("Deleted resource {}", id);
    ok(Ack::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_type_normalizes_case() {
        assert_eq!(check_type("menu").unwrap(), "MENU");
        assert_eq!(check_type(" Api ").unwrap(), "API");
        assert!(check_type("PAGE").is_err());
    }
}
