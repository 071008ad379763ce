//! API request and response models

use backoffice_access_log::{CapturedBody, StoredLog};
use backoffice_db::entities::{
    admission_plan, menu, resource, role, school_admission, sys_config, user,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

fn default_status() -> i32 {
    1
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
}

/// Generic acknowledgement payload
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Ack {
    pub ok: bool,
}

impl Ack {
    pub fn new() -> Self {
        Self { ok: true }
    }
}

impl Default for Ack {
    fn default() -> Self {
        Self::new()
    }
}

/// A list of ids, used by batch endpoints
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IdsRequest {
    #[serde(default)]
    pub ids: Vec<i32>,
}

/// Result of a delete that may touch several rows
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeletedCount {
    pub deleted: u64,
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remember: Option<bool>,
}

/// Profile of the signed-in user
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub nickname: String,
    /// Role codes
    pub roles: Vec<String>,
    /// Permission codes granted through the roles
    pub permissions: Vec<String>,
    /// `YYYY-MM-DD HH:MM:SS` in the service time zone
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub user_info: UserInfo,
    /// Token lifetime in seconds
    pub expires_in: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RefreshRequest {
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub token: String,
    pub expires_in: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// User account (never carries the password)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i32,
    pub username: String,
    pub nickname: String,
    pub email: String,
    pub phone: String,
    pub gender: String,
    /// 1 = enabled, 0 = disabled
    pub status: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<user::Model> for User {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            nickname: model.nickname,
            email: model.email,
            phone: model.phone,
            gender: model.gender,
            status: model.status,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub nickname: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub gender: String,
    #[serde(default = "default_status")]
    pub status: i32,
}

/// Partial user update; absent fields are left unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    pub nickname: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub gender: Option<String>,
    pub status: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserQuery {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
    /// Substring match
    pub username: Option<String>,
    pub status: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserList {
    pub list: Vec<User>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignRolesRequest {
    #[serde(default)]
    pub role_ids: Vec<i32>,
}

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: i32,
    pub role_name: String,
    pub role_code: String,
    pub role_desc: String,
    pub status: i32,
    #[serde(rename = "createTime")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updateTime")]
    pub updated_at: DateTime<Utc>,
}

impl From<role::Model> for Role {
    fn from(model: role::Model) -> Self {
        Self {
            id: model.id,
            role_name: model.role_name,
            role_code: model.role_code,
            role_desc: model.role_desc,
            status: model.status,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoleRequest {
    pub role_name: String,
    pub role_code: String,
    #[serde(default)]
    pub role_desc: String,
    #[serde(default = "default_status")]
    pub status: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRoleRequest {
    pub role_name: Option<String>,
    pub role_code: Option<String>,
    pub role_desc: Option<String>,
    pub status: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoleQuery {
    pub page: Option<u64>,
    pub size: Option<u64>,
    /// Substring match
    pub role_name: Option<String>,
    pub role_code: Option<String>,
    pub status: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RoleList {
    pub list: Vec<Role>,
    pub total: u64,
    pub page: u64,
    pub size: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RolePermissionsRequest {
    #[serde(default)]
    pub permission_ids: Vec<i32>,
}

// ---------------------------------------------------------------------------
// Resources (permissions)
// ---------------------------------------------------------------------------

/// A permission-bearing resource: menu entry, button or API
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Resource {
    pub id: i32,
    pub resource_name: String,
    pub permission_code: String,
    pub desc: Option<String>,
    /// MENU, BUTTON or API
    #[serde(rename = "type")]
    pub resource_type: String,
    pub resource_path: Option<String>,
    pub http_method: Option<String>,
    pub parent_id: Option<i32>,
    pub sort: i32,
    pub status: i32,
    pub requires_auth: i32,
    pub remark: Option<String>,
    pub created_by: Option<i32>,
    pub updated_by: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Only filled in tree responses
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[schema(no_recursion)]
    pub children: Vec<Resource>,
}

impl From<resource::Model> for Resource {
    fn from(model: resource::Model) -> Self {
        Self {
            id: model.id,
            resource_name: model.resource_name,
            permission_code: model.permission_code,
            desc: model.description,
            resource_type: model.resource_type,
            resource_path: model.resource_path,
            http_method: model.http_method,
            parent_id: model.parent_id,
            sort: model.sort,
            status: model.status,
            requires_auth: model.requires_auth,
            remark: model.remark,
            created_by: model.created_by,
            updated_by: model.updated_by,
            created_at: model.created_at,
            updated_at: model.updated_at,
            children: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateResourceRequest {
    pub resource_name: String,
    pub permission_code: String,
    pub desc: Option<String>,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub resource_path: Option<String>,
    pub http_method: Option<String>,
    pub parent_id: Option<i32>,
    #[serde(default)]
    pub sort: i32,
    #[serde(default = "default_status")]
    pub status: i32,
    #[serde(default = "default_status")]
    pub requires_auth: i32,
    pub remark: Option<String>,
}

/// Partial resource update; absent fields are left unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateResourceRequest {
    pub resource_name: Option<String>,
    pub permission_code: Option<String>,
    pub desc: Option<String>,
    #[serde(rename = "type")]
    pub resource_type: Option<String>,
    pub resource_path: Option<String>,
    pub http_method: Option<String>,
    pub parent_id: Option<i32>,
    pub sort: Option<i32>,
    pub status: Option<i32>,
    pub requires_auth: Option<i32>,
    pub remark: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ResourceQuery {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
    /// Substring match
    pub resource_name: Option<String>,
    #[serde(rename = "type")]
    pub resource_type: Option<String>,
    pub status: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ResourceList {
    pub data: Vec<Resource>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
    pub total_pages: u64,
}

// ---------------------------------------------------------------------------
// Menus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Menu {
    pub id: i32,
    pub name: String,
    pub path: String,
    pub component: Option<String>,
    pub parent_id: Option<i32>,
    /// 1 = directory, 2 = menu, 3 = button
    #[serde(rename = "type")]
    pub menu_type: i32,
    pub redirect: String,
    pub permission: Option<String>,
    pub visible: bool,
    pub sort: i32,
    /// Route meta (title, icon, ...)
    #[schema(value_type = Object)]
    pub meta: serde_json::Value,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[schema(no_recursion)]
    pub children: Vec<Menu>,
}

impl From<menu::Model> for Menu {
    fn from(model: menu::Model) -> Self {
        let meta = serde_json::from_str(&model.meta)
            .unwrap_or_else(|_| serde_json::Value::Object(Default::default()));

        Self {
            id: model.id,
            name: model.name,
            path: model.path,
            component: model.component,
            parent_id: model.parent_id,
            menu_type: model.menu_type,
            redirect: model.redirect,
            permission: model.permission,
            visible: model.visible,
            sort: model.sort,
            meta,
            children: Vec::new(),
        }
    }
}

/// Menu create/update body
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MenuRequest {
    pub name: String,
    #[serde(default)]
    pub path: String,
    pub component: Option<String>,
    pub parent_id: Option<i32>,
    #[serde(rename = "type", default)]
    pub menu_type: i32,
    #[serde(default)]
    pub redirect: String,
    pub permission: Option<String>,
    pub visible: Option<bool>,
    pub sort: Option<i32>,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub meta: serde_json::Value,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct MenuQuery {
    #[serde(rename = "type")]
    pub menu_type: Option<i32>,
    /// Substring match
    pub name: Option<String>,
    pub visible: Option<bool>,
}

// ---------------------------------------------------------------------------
// System configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SysConfig {
    pub id: i32,
    pub config_key: String,
    pub config_name: String,
    pub config_value: String,
    /// Y = built in, N = user defined
    pub config_type: String,
    pub remark: String,
    pub create_time: DateTime<Utc>,
}

impl From<sys_config::Model> for SysConfig {
    fn from(model: sys_config::Model) -> Self {
        Self {
            id: model.id,
            config_key: model.config_key,
            config_name: model.config_name,
            config_value: model.config_value,
            config_type: model.config_type,
            remark: model.remark,
            create_time: model.create_time,
        }
    }
}

/// Config create/update body; `id` is required on update
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfigRequest {
    pub id: Option<i32>,
    pub config_key: String,
    pub config_name: String,
    #[serde(default)]
    pub config_value: String,
    #[serde(default = "default_config_type")]
    pub config_type: String,
    #[serde(default)]
    pub remark: String,
}

fn default_config_type() -> String {
    "N".to_string()
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfigQuery {
    pub page_num: Option<u64>,
    pub page_size: Option<u64>,
    /// Substring match
    pub config_name: Option<String>,
    /// Substring match
    pub config_key: Option<String>,
    pub config_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConfigList {
    pub rows: Vec<SysConfig>,
    pub total: u64,
}

// ---------------------------------------------------------------------------
// School admission scores
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SchoolAdmission {
    pub id: i32,
    pub school_code: String,
    pub school_name: String,
    pub category: String,
    pub total_score: i32,
    pub tie_breaker: String,
    pub admission_scope: String,
    pub year: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<school_admission::Model> for SchoolAdmission {
    fn from(model: school_admission::Model) -> Self {
        Self {
            id: model.id,
            school_code: model.school_code,
            school_name: model.school_name,
            category: model.category,
            total_score: model.total_score,
            tie_breaker: model.tie_breaker,
            admission_scope: model.admission_scope,
            year: model.year,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SchoolAdmissionRequest {
    pub school_code: String,
    pub school_name: String,
    pub category: String,
    pub total_score: i32,
    #[serde(default)]
    pub tie_breaker: String,
    #[serde(default)]
    pub admission_scope: String,
    pub year: i32,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SchoolAdmissionQuery {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
    /// Substring match
    pub school_name: Option<String>,
    pub category: Option<String>,
    pub year: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SchoolAdmissionList {
    pub list: Vec<SchoolAdmission>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
}

// ---------------------------------------------------------------------------
// High school admission plans
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AdmissionPlan {
    pub id: i32,
    pub year: i32,
    pub district_type: String,
    pub school_name: String,
    pub school_level: String,
    pub operation_nature: String,
    pub total_students: Option<i32>,
    pub boarding_students: Option<i32>,
    pub day_students: Option<i32>,
    pub admission_scope: String,
    pub remarks: String,
    pub acd_students: i32,
    pub ac_students: i32,
    pub d_students: i32,
}

impl From<admission_plan::Model> for AdmissionPlan {
    fn from(model: admission_plan::Model) -> Self {
        Self {
            id: model.id,
            year: model.year,
            district_type: model.district_type,
            school_name: model.school_name,
            school_level: model.school_level,
            operation_nature: model.operation_nature,
            total_students: model.total_students,
            boarding_students: model.boarding_students,
            day_students: model.day_students,
            admission_scope: model.admission_scope,
            remarks: model.remarks,
            acd_students: model.acd_students,
            ac_students: model.ac_students,
            d_students: model.d_students,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AdmissionPlanRequest {
    pub year: i32,
    #[serde(default)]
    pub district_type: String,
    pub school_name: String,
    #[serde(default)]
    pub school_level: String,
    #[serde(default)]
    pub operation_nature: String,
    pub total_students: Option<i32>,
    pub boarding_students: Option<i32>,
    pub day_students: Option<i32>,
    #[serde(default)]
    pub admission_scope: String,
    #[serde(default)]
    pub remarks: String,
    #[serde(default)]
    pub acd_students: i32,
    #[serde(default)]
    pub ac_students: i32,
    #[serde(default)]
    pub d_students: i32,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct AdmissionPlanQuery {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
    pub year: Option<i32>,
    /// Substring match
    pub school_name: Option<String>,
    pub district_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionPlanList {
    pub list: Vec<AdmissionPlan>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
}

// ---------------------------------------------------------------------------
// Access logs
// ---------------------------------------------------------------------------

/// A persisted HTTP access log entry
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub id: i32,
    pub timestamp: DateTime<Utc>,
    pub method: String,
    pub path: String,
    pub query: String,
    pub ip: String,
    pub user_agent: String,
    pub status: u16,
    /// Milliseconds
    pub latency: i64,
    /// `"<METHOD> <route>"`
    pub handler: String,
    /// JSON value, or a string when the body was not JSON or was cut
    #[schema(value_type = Option<Object>)]
    pub request: Option<serde_json::Value>,
    #[schema(value_type = Option<Object>)]
    pub response: Option<serde_json::Value>,
    pub errors: String,
    pub content_length: i64,
    pub truncated: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn body_value(body: Option<CapturedBody>) -> Option<serde_json::Value> {
    body.map(|body| match body {
        CapturedBody::Structured(value) => value,
        CapturedBody::Raw(text) => serde_json::Value::String(text),
    })
}

impl From<StoredLog> for LogEntry {
    fn from(stored: StoredLog) -> Self {
        let latency = stored.record.latency_ms();
        let record = stored.record;

        Self {
            id: stored.id,
            timestamp: record.timestamp,
            method: record.method,
            path: record.path,
            query: record.query,
            ip: record.ip,
            user_agent: record.user_agent,
            status: record.status,
            latency,
            handler: record.handler,
            request: body_value(record.request),
            response: body_value(record.response),
            errors: record.errors,
            content_length: record.content_length,
            truncated: record.truncated,
            created_at: record.created_at,
            updated_at: stored.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LogList {
    pub rows: Vec<LogEntry>,
    pub total: u64,
    pub page: u64,
    pub size: u64,
}
