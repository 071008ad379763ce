//! AccessLog entity: one persisted HTTP request/response summary

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "logs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Request completion time
    pub timestamp: ChronoDateTimeUtc,

    pub method: String,

    #[sea_orm(column_type = "Text")]
    pub path: String,

    #[sea_orm(column_type = "Text")]
    pub query: String,

    pub ip: String,

    #[sea_orm(column_type = "Text")]
    pub user_agent: String,

    pub status: i32,

    pub latency_ms: i64,

    pub handler: String,

    /// JSON-encoded captured request body
    #[sea_orm(column_type = "Text", nullable)]
    pub request: Option<String>,

    /// JSON-encoded captured response body
    #[sea_orm(column_type = "Text", nullable)]
    pub response: Option<String>,

    /// Handler errors, newline separated
    #[sea_orm(column_type = "Text")]
    pub errors: String,

    pub content_length: i64,

    pub truncated: bool,

    pub created_at: ChronoDateTimeUtc,

    pub updated_at: ChronoDateTimeUtc,

    /// Set when the record is deleted; such rows are invisible to reads
    pub deleted_at: Option<ChronoDateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
