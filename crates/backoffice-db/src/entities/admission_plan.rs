//! AdmissionPlan entity: high-school enrolment plan per year

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "high_school_admission_plans")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub year: i32,

    pub district_type: String,

    pub school_name: String,

    pub school_level: String,

    pub operation_nature: String,

    pub total_students: Option<i32>,

    pub boarding_students: Option<i32>,

    pub day_students: Option<i32>,

    #[sea_orm(column_type = "Text")]
    pub admission_scope: String,

    #[sea_orm(column_type = "Text")]
    pub remarks: String,

    pub acd_students: i32,

    pub ac_students: i32,

    pub d_students: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
