//! School admission score lines

use axum::extract::{Path, State};
use backoffice_db::entities::school_admission;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use std::sync::Arc;
use tracing::info;

use crate::extract::{parse_id, ValidJson, ValidQuery};
use crate::handlers::{filled, page_request};
use crate::models::{
    Ack, SchoolAdmission, SchoolAdmissionList, SchoolAdmissionQuery, SchoolAdmissionRequest,
};
use crate::response::{ok, ApiError, ApiResult, ErrorResponse};
use crate::AppState;

async fn find_admission(
    db: &DatabaseConnection,
    id: i32,
) -> Result<school_admission::Model, ApiError> {
    school_admission::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::not_found("school admission not found"))
}

fn check_request(req: &SchoolAdmissionRequest) -> Result<(), ApiError> {
    if req.school_code.trim().is_empty() || req.school_name.trim().is_empty() {
        return Err(ApiError::bad_request("school code and name are required"));
    }
    if req.year <= 0 {
        return Err(ApiError::bad_request("year must be positive"));
    }
    Ok(())
}

/// List admission scores, highest first
#[utoipa::path(
    get,
    path = "/api/school-admission",
    params(
        ("page" = Option<u64>, Query, description = "Page number (default: 1)"),
        ("pageSize" = Option<u64>, Query, description = "Page size (default: 10)"),
        ("schoolName" = Option<String>, Query, description = "Filter by school (partial match)"),
        ("category" = Option<String>, Query, description = "Filter by category"),
        ("year" = Option<i32>, Query, description = "Filter by year")
    ),
    responses(
        (status = 200, description = "Page of admission scores", body = SchoolAdmissionList)
    ),
    security(("bearer_auth" = [])),
    tag = "school-admission"
)]
pub async fn list_school_admissions(
    State(state): State<Arc<AppState>>,
    ValidQuery(query): ValidQuery<SchoolAdmissionQuery>,
) -> ApiResult<SchoolAdmissionList> {
    let page = page_request(query.page, query.page_size);

    let mut condition = Condition::all();
    if let Some(name) = filled(&query.school_name) {
        condition = condition.add(school_admission::Column::SchoolName.contains(name));
    }
    if let Some(category) = filled(&query.category) {
        condition = condition.add(school_admission::Column::Category.eq(category));
    }
    if let Some(year) = query.year {
        condition = condition.add(school_admission::Column::Year.eq(year));
    }

    let paginator = school_admission::Entity::find()
        .filter(condition)
        .order_by_desc(school_admission::Column::TotalScore)
        .order_by_asc(school_admission::Column::Id)
        .paginate(&state.db, page.size);

    let total = paginator.num_items().await?;
    let list = paginator
        .fetch_page(page.index())
        .await?
        .into_iter()
        .map(SchoolAdmission::from)
        .collect();

    ok(SchoolAdmissionList {
        list,
        total,
        page: page.page,
        page_size: page.size,
    })
}

/// Get an admission score
#[utoipa::path(
    get,
    path = "/api/school-admission/{id}",
    params(("id" = i32, Path, description = "Record ID")),
    responses(
        (status = 200, description = "Admission score", body = SchoolAdmission),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "school-admission"
)]
pub async fn get_school_admission(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<SchoolAdmission> {
    let id = parse_id(&id, "school admission")?;
    ok(find_admission(&state.db, id).await?.into())
}

/// Create an admission score
#[utoipa::path(
    post,
    path = "/api/school-admission",
    request_body = SchoolAdmissionRequest,
    responses(
        (status = 200, description = "Created", body = SchoolAdmission),
        (status = 400, description = "Invalid input", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "school-admission"
)]
pub async fn create_school_admission(
    State(state): State<Arc<AppState>>,
    ValidJson(req): ValidJson<SchoolAdmissionRequest>,
) -> ApiResult<SchoolAdmission> {
    check_request(&req)?;

    let now = Utc::now();
    let created = school_admission::ActiveModel {
        school_code: Set(req.school_code.trim().to_string()),
        school_name: Set(req.school_name.trim().to_string()),
        category: Set(req.category),
        total_score: Set(req.total_score),
        tie_breaker: Set(req.tie_breaker),
        admission_scope: Set(req.admission_scope),
        year: Set(req.year),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    info!("Created school admission {} ({})", created.school_name, created.id);
    ok(created.into())
}

/// Update an admission score
#[utoipa::path(
    put,
    path = "/api/school-admission/{id}",
    params(("id" = i32, Path, description = "Record ID")),
    request_body = SchoolAdmissionRequest,
    responses(
        (status = 200, description = "Updated", body = SchoolAdmission),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "school-admission"
)]
pub async fn update_school_admission(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ValidJson(req): ValidJson<SchoolAdmissionRequest>,
) -> ApiResult<SchoolAdmission> {
    let id = parse_id(&id, "school admission")?;
    check_request(&req)?;

    let mut active: school_admission::ActiveModel = find_admission(&state.db, id).await?.into();
    active.school_code = Set(req.school_code.trim().to_string());
    active.school_name = Set(req.school_name.trim().to_string());
    active.category = Set(req.category);
    active.total_score = Set(req.total_score);
    active.tie_breaker = Set(req.tie_breaker);
    active.admission_scope = Set(req.admission_scope);
    active.year = Set(req.year);
    active.updated_at = Set(Utc::now());

    ok(active.update(&state.db).await?.into())
}

/// Delete an admission score
#[utoipa::path(
    delete,
    path = "/api/school-admission/{id}",
    params(("id" = i32, Path, description = "Record ID")),
    responses(
        (status = 200, description = "Deleted", body = Ack),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "school-admission"
)]
pub async fn delete_school_admission(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Ack> {
    let id = parse_id(&id, "school admission")?;

    let result = school_admission::Entity::delete_by_id(id)
        .exec(&state.db)
        .await?;
    if result.rows_affected == 0 {
        return Err(ApiError::not_found("school admission not found"));
    }

    info!("Deleted school admission {}", id);
    ok(Ack::new())
}
