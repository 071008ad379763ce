//! Resource entity: a permission-bearing menu, button or API endpoint

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "resources")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub resource_name: String,

    /// Permission identifier checked by clients (unique)
    #[sea_orm(unique)]
    pub permission_code: String,

    pub description: Option<String>,

    /// MENU, BUTTON or API
    pub resource_type: String,

    /// Route or API path
    pub resource_path: Option<String>,

    /// HTTP method for API resources
    pub http_method: Option<String>,

    /// Parent resource for tree building
    pub parent_id: Option<i32>,

    pub sort: i32,

    /// 1 = enabled, 0 = disabled
    pub status: i32,

    /// 1 = requires authentication
    pub requires_auth: i32,

    pub remark: Option<String>,

    pub created_by: Option<i32>,

    pub updated_by: Option<i32>,

    pub created_at: ChronoDateTimeUtc,

    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::role_resource::Entity")]
    RoleResources,
}

impl Related<super::role_resource::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RoleResources.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
