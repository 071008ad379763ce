//! System configuration key/value entries

use axum::extract::{Path, State};
use backoffice_db::entities::sys_config;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use std::sync::Arc;
use tracing::info;

use crate::extract::{parse_id, ValidJson, ValidQuery};
use crate::handlers::{filled, page_request};
use crate::models::{Ack, ConfigList, ConfigQuery, ConfigRequest, SysConfig};
use crate::response::{ok, ApiError, ApiResult, ErrorResponse};
use crate::AppState;

async fn find_config(db: &DatabaseConnection, id: i32) -> Result<sys_config::Model, ApiError> {
    sys_config::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::not_found("config not found"))
}

async fn ensure_key_free(
    db: &DatabaseConnection,
    key: &str,
    except: Option<i32>,
) -> Result<(), ApiError> {
    let mut query = sys_config::Entity::find().filter(sys_config::Column::ConfigKey.eq(key));
    if let Some(id) = except {
        query = query.filter(sys_config::Column::Id.ne(id));
    }

    if query.count(db).await? > 0 {
        return Err(ApiError::bad_request("config key already exists"));
    }
    Ok(())
}

fn check_request(req: &ConfigRequest) -> Result<(String, String), ApiError> {
    let key = req.config_key.trim();
    let name = req.config_name.trim();
    if key.is_empty() || name.is_empty() {
        return Err(ApiError::bad_request("config key and name are required"));
    }
    Ok((key.to_string(), name.to_string()))
}

/// List config entries
#[utoipa::path(
    get,
    path = "/api/system/config/list",
    params(
        ("pageNum" = Option<u64>, Query, description = "Page number (default: 1)"),
        ("pageSize" = Option<u64>, Query, description = "Page size (default: 10)"),
        ("configName" = Option<String>, Query, description = "Filter by name (partial match)"),
        ("configKey" = Option<String>, Query, description = "Filter by key (partial match)"),
        ("configType" = Option<String>, Query, description = "Y = built in, N = user defined")
    ),
    responses(
        (status = 200, description = "Page of config entries", body = ConfigList)
    ),
    security(("bearer_auth" = [])),
    tag = "configs"
)]
pub async fn list_configs(
    State(state): State<Arc<AppState>>,
    ValidQuery(query): ValidQuery<ConfigQuery>,
) -> ApiResult<ConfigList> {
    let page = page_request(query.page_num, query.page_size);

    let mut condition = Condition::all();
    if let Some(name) = filled(&query.config_name) {
        condition = condition.add(sys_config::Column::ConfigName.contains(name));
    }
    if let Some(key) = filled(&query.config_key) {
        condition = condition.add(sys_config::Column::ConfigKey.contains(key));
    }
    if let Some(config_type) = filled(&query.config_type) {
        condition = condition.add(sys_config::Column::ConfigType.eq(config_type));
    }

    let paginator = sys_config::Entity::find()
        .filter(condition)
        .order_by_asc(sys_config::Column::Id)
        .paginate(&state.db, page.size);

    let total = paginator.num_items().await?;
    let rows = paginator
        .fetch_page(page.index())
        .await?
        .into_iter()
        .map(SysConfig::from)
        .collect();

    ok(ConfigList { rows, total })
}

/// Get a config entry
#[utoipa::path(
    get,
    path = "/api/system/config/{id}",
    params(("id" = i32, Path, description = "Config ID")),
    responses(
        (status = 200, description = "Config entry", body = SysConfig),
        (status = 404, description = "Config not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "configs"
)]
pub async fn get_config(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<SysConfig> {
    let id = parse_id(&id, "config")?;
    ok(find_config(&state.db, id).await?.into())
}

/// Create a config entry
#[utoipa::path(
    post,
    path = "/api/system/config",
    request_body = ConfigRequest,
    responses(
        (status = 200, description = "Config created", body = SysConfig),
        (status = 400, description = "Invalid input or duplicate key", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "configs"
)]
pub async fn create_config(
    State(state): State<Arc<AppState>>,
    ValidJson(req): ValidJson<ConfigRequest>,
) -> ApiResult<SysConfig> {
    let (key, name) = check_request(&req)?;
    ensure_key_free(&state.db, &key, None).await?;

    let created = sys_config::ActiveModel {
        config_key: Set(key),
        config_name: Set(name),
        config_value: Set(req.config_value),
        config_type: Set(req.config_type),
        remark: Set(req.remark),
        create_time: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    info!("Created config {} ({})", created.config_key, created.id);
    ok(created.into())
}

/// Update a config entry (id taken from the body)
#[utoipa::path(
    put,
    path = "/api/system/config",
    request_body = ConfigRequest,
    responses(
        (status = 200, description = "Config updated", body = SysConfig),
        (status = 400, description = "Missing id, invalid input or duplicate key", body = ErrorResponse),
        (status = 404, description = "Config not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "configs"
)]
pub async fn update_config(
    State(state): State<Arc<AppState>>,
    ValidJson(req): ValidJson<ConfigRequest>,
) -> ApiResult<SysConfig> {
    let id = req
        .id
        .filter(|id| *id > 0)
        .ok_or_else(|| ApiError::bad_request("config id is required"))?;
    let (key, name) = check_request(&req)?;

    let existing = find_config(&state.db, id).await?;
    ensure_key_free(&state.db, &key, Some(id)).await?;

    let mut active: sys_config::ActiveModel = existing.into();
    active.config_key = Set(key);
    active.config_name = Set(name);
    active.config_value = Set(req.config_value);
    active.config_type = Set(req.config_type);
    active.remark = Set(req.remark);

    ok(active.update(&state.db).await?.into())
}

/// Delete a config entry
#[utoipa::path(
    delete,
    path = "/api/system/config/{id}",
    params(("id" = i32, Path, description = "Config ID")),
    responses(
        (status = 200, description = "Config deleted", body = Ack),
        (status = 404, description = "Config not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "configs"
)]
pub async fn delete_config(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Ack> {
    let id = parse_id(&id, "config")?;

    let result = sys_config::Entity::delete_by_id(id).exec(&state.db).await?;
    if result.rows_affected == 0 {
        return Err(ApiError::not_found("config not found"));
    }

    info!("Deleted config {}", id);
    ok(Ack::new())
}
