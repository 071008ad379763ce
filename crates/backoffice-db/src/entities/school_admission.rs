//! SchoolAdmission entity: per-school admission score lines

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "school_admission_info")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub school_code: String,

    pub school_name: String,

    pub category: String,

    pub total_score: i32,

    pub tie_breaker: String,

    pub admission_scope: String,

    pub year: i32,

    pub created_at: ChronoDateTimeUtc,

    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
