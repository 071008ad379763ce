//! High school admission plans

use axum::extract::{Path, State};
use backoffice_db::entities::admission_plan;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use std::sync::Arc;
use tracing::info;

use crate::extract::{parse_id, ValidJson, ValidQuery};
use crate::handlers::{filled, page_request};
use crate::models::{
    Ack, AdmissionPlan, AdmissionPlanList, AdmissionPlanQuery, AdmissionPlanRequest,
};
use crate::response::{ok, ApiError, ApiResult, ErrorResponse};
use crate::AppState;

async fn find_plan(db: &DatabaseConnection, id: i32) -> Result<admission_plan::Model, ApiError> {
    admission_plan::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::not_found("admission plan not found"))
}

fn check_request(req: &AdmissionPlanRequest) -> Result<(), ApiError> {
    if req.school_name.trim().is_empty() {
        return Err(ApiError::bad_request("school name is required"));
    }
    if req.year <= 0 {
        return Err(ApiError::bad_request("year must be positive"));
    }
    Ok(())
}

fn apply(active: &mut admission_plan::ActiveModel, req: AdmissionPlanRequest) {
    active.year = Set(req.year);
    active.district_type = Set(req.district_type);
    active.school_name = Set(req.school_name.trim().to_string());
    active.school_level = Set(req.school_level);
    active.operation_nature = Set(req.operation_nature);
    active.total_students = Set(req.total_students);
    active.boarding_students = Set(req.boarding_students);
    active.day_students = Set(req.day_students);
    active.admission_scope = Set(req.admission_scope);
    active.remarks = Set(req.remarks);
    active.acd_students = Set(req.acd_students);
    active.ac_students = Set(req.ac_students);
    active.d_students = Set(req.d_students);
}

/// List admission plans
#[utoipa::path(
    get,
    path = "/api/plans",
    params(
        ("page" = Option<u64>, Query, description = "Page number (default: 1)"),
        ("page_size" = Option<u64>, Query, description = "Page size (default: 10)"),
        ("year" = Option<i32>, Query, description = "Filter by year"),
        ("school_name" = Option<String>, Query, description = "Filter by school (partial match)"),
        ("district_type" = Option<String>, Query, description = "Filter by district type")
    ),
    responses(
        (status = 200, description = "Page of admission plans", body = AdmissionPlanList)
    ),
    security(("bearer_auth" = [])),
    tag = "plans"
)]
pub async fn list_plans(
    State(state): State<Arc<AppState>>,
    ValidQuery(query): ValidQuery<AdmissionPlanQuery>,
) -> ApiResult<AdmissionPlanList> {
    let page = page_request(query.page, query.page_size);

    let mut condition = Condition::all();
    if let Some(year) = query.year {
        condition = condition.add(admission_plan::Column::Year.eq(year));
    }
    if let Some(name) = filled(&query.school_name) {
        condition = condition.add(admission_plan::Column::SchoolName.contains(name));
    }
    if let Some(district) = filled(&query.district_type) {
        condition = condition.add(admission_plan::Column::DistrictType.eq(district));
    }

    let paginator = admission_plan::Entity::find()
        .filter(condition)
        .order_by_asc(admission_plan::Column::Id)
        .paginate(&state.db, page.size);

    let total = paginator.num_items().await?;
    let list = paginator
        .fetch_page(page.index())
        .await?
        .into_iter()
        .map(AdmissionPlan::from)
        .collect();

    ok(AdmissionPlanList {
        list,
        total,
        page: page.page,
        page_size: page.size,
    })
}

/// Get an admission plan
#[utoipa::path(
    get,
    path = "/api/plans/{id}",
    params(("id" = i32, Path, description = "Plan ID")),
    responses(
        (status = 200, description = "Admission plan", body = AdmissionPlan),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "plans"
)]
pub async fn get_plan(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<AdmissionPlan> {
    let id = parse_id(&id, "admission plan")?;
    ok(find_plan(&state.db, id).await?.into())
}

/// Create an admission plan
#[utoipa::path(
    post,
    path = "/api/plans",
    request_body = AdmissionPlanRequest,
    responses(
        (status = 200, description = "Created", body = AdmissionPlan),
        (status = 400, description = "Invalid input", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "plans"
)]
pub async fn create_plan(
    State(state): State<Arc<AppState>>,
    ValidJson(req): ValidJson<AdmissionPlanRequest>,
) -> ApiResult<AdmissionPlan> {
    check_request(&req)?;

    let mut active = <admission_plan::ActiveModel as Default>::default();
    apply(&mut active, req);
    let created = active.insert(&state.db).await?;

    info!("Created admission plan {} ({})", created.school_name, created.id);
    ok(created.into())
}

/// Update an admission plan
#[utoipa::path(
    put,
    path = "/api/plans/{id}",
    params(("id" = i32, Path, description = "Plan ID")),
    request_body = AdmissionPlanRequest,
    responses(
        (status = 200, description = "Updated", body = AdmissionPlan),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "plans"
)]
pub async fn update_plan(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ValidJson(req): ValidJson<AdmissionPlanRequest>,
) -> ApiResult<AdmissionPlan> {
    let id = parse_id(&id, "admission plan")?;
    check_request(&req)?;

    let mut active: admission_plan::ActiveModel = find_plan(&state.db, id).await?.into();
    apply(&mut active, req);

    ok(active.update(&state.db).await?.into())
}

/// Delete an admission plan
#[utoipa::path(
    delete,
    path = "/api/plans/{id}",
    params(("id" = i32, Path, description = "Plan ID")),
    responses(
        (status = 200, description = "Deleted", body = Ack),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "plans"
)]
pub async fn delete_plan(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Ack> {
    let id = parse_id(&id, "admission plan")?;

    let result = admission_plan::Entity::delete_by_id(id)
        .exec(&state.db)
        .await?;
    if result.rows_affected == 0 {
        return Err(ApiError::not_found("admission plan not found"));
    }

    info!("Deleted admission plan {}", id);
    ok(Ack::new())
}
