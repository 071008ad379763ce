//! Navigation menu tree

use axum::extract::{Path, State};
use backoffice_db::entities::menu;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, Set,
};
use std::sync::Arc;
use tracing::info;

use crate::extract::{parse_id, ValidJson, ValidQuery};
use crate::handlers::{build_tree, filled};
use crate::models::{Ack, Menu, MenuQuery, MenuRequest};
use crate::response::{ok, ApiError, ApiResult, ErrorResponse};
use crate::AppState;

async fn find_menu(db: &DatabaseConnection, id: i32) -> Result<menu::Model, ApiError> {
    menu::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::not_found("menu not found"))
}

/// Serialize route meta for storage; `null` is stored as an empty object.
fn meta_text(meta: &serde_json::Value) -> String {
    match meta {
        serde_json::Value::Null => "{}".to_string(),
        other => other.to_string(),
    }
}

fn check_name(req: &MenuRequest) -> Result<String, ApiError> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(ApiError::bad_request("menu name is required"));
    }
    Ok(name.to_string())
}

/// Menu tree
#[utoipa::path(
    get,
    path = "/api/menu/tree",
    params(
        ("type" = Option<i32>, Query, description = "1 = directory, 2 = menu, 3 = button"),
        ("name" = Option<String>, Query, description = "Filter by name (partial match)"),
        ("visible" = Option<bool>, Query, description = "Filter by visibility")
    ),
    responses(
        (status = 200, description = "Menus nested by parent", body = Vec<Menu>)
    ),
    security(("bearer_auth" = [])),
    tag = "menus"
)]
pub async fn menu_tree(
    State(state): State<Arc<AppState>>,
    ValidQuery(query): ValidQuery<MenuQuery>,
) -> ApiResult<Vec<Menu>> {
    let mut condition = Condition::all();
    if let Some(menu_type) = query.menu_type.filter(|t| *t != 0) {
        condition = condition.add(menu::Column::MenuType.eq(menu_type));
    }
    if let Some(name) = filled(&query.name) {
        condition = condition.add(menu::Column::Name.contains(name));
    }
    if let Some(visible) = query.visible {
        condition = condition.add(menu::Column::Visible.eq(visible));
    }

    let rows = menu::Entity::find().filter(condition).all(&state.db).await?;
    ok(build_tree(rows.into_iter().map(Menu::from).collect()))
}

/// Create a menu
#[utoipa::path(
    post,
    path = "/api/menu",
    request_body = MenuRequest,
    responses(
        (status = 200, description = "Menu created", body = Menu),
        (status = 400, description = "Invalid input", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "menus"
)]
pub async fn create_menu(
    State(state): State<Arc<AppState>>,
    ValidJson(req): ValidJson<MenuRequest>,
) -> ApiResult<Menu> {
    let name = check_name(&req)?;
    if let Some(parent_id) = req.parent_id {
        find_menu(&state.db, parent_id)
            .await
            .map_err(|_| ApiError::bad_request("parent menu not found"))?;
    }

    let created = menu::ActiveModel {
        name: Set(name),
        path: Set(req.path),
        component: Set(req.component),
        parent_id: Set(req.parent_id),
        menu_type: Set(req.menu_type),
        redirect: Set(req.redirect),
        permission: Set(req.permission),
        visible: Set(req.visible.unwrap_or(true)),
        sort: Set(req.sort.unwrap_or(0)),
        meta: Set(meta_text(&req.meta)),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    info!("Created menu {} ({})", created.name, created.id);
    ok(created.into())
}

/// Update a menu
#[utoipa::path(
    put,
    path = "/api/menu/{id}",
    params(("id" = i32, Path, description = "Menu ID")),
    request_body = MenuRequest,
    responses(
        (status = 200, description = "Menu updated", body = Menu),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 404, description = "Menu not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "menus"
)]
pub async fn update_menu(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ValidJson(req): ValidJson<MenuRequest>,
) -> ApiResult<Menu> {
    let id = parse_id(&id, "menu")?;
    let existing = find_menu(&state.db, id).await?;
    let name = check_name(&req)?;
    if req.parent_id == Some(id) {
        return Err(ApiError::bad_request("menu cannot be its own parent"));
    }

    let visible = req.visible.unwrap_or(existing.visible);
    let sort = req.sort.unwrap_or(existing.sort);
    let meta = if req.meta.is_null() {
        existing.meta.clone()
    } else {
        meta_text(&req.meta)
    };

    let mut active: menu::ActiveModel = existing.into();
    active.name = Set(name);
    active.path = Set(req.path);
    active.component = Set(req.component);
    active.parent_id = Set(req.parent_id);
    active.menu_type = Set(req.menu_type);
    active.redirect = Set(req.redirect);
    active.permission = Set(req.permission);
    active.visible = Set(visible);
    active.sort = Set(sort);
    active.meta = Set(meta);

    ok(active.update(&state.db).await?.into())
}

/// Delete a menu
#[utoipa::path(
    delete,
    path = "/api/menu/{id}",
    params(("id" = i32, Path, description = "Menu ID")),
    responses(
        (status = 200, description = "Menu deleted", body = Ack),
        (status = 400, description = "Menu still has children", body = ErrorResponse),
        (status = 404, description = "Menu not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "menus"
)]
pub async fn delete_menu(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Ack> {
    let id = parse_id(&id, "menu")?;
    find_menu(&state.db, id).await?;

    let children = menu::Entity::find()
        .filter(menu::Column::ParentId.eq(id))
        .count(&state.db)
        .await?;
    if children > 0 {
        return Err(ApiError::bad_request("menu has child menus"));
    }

    menu::Entity::delete_by_id(id).exec(&state.db).await?;
    info!("Deleted menu {}", id);
    ok(Ack::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_meta_text() {
        assert_eq!(meta_text(&serde_json::Value::Null), "{}");
        assert_eq!(meta_text(&json!({"title": "Home"})), r#"{"title":"Home"}"#);
    }
}
