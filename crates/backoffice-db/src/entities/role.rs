//! Role entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "roles")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub role_name: String,

    /// Stable role identifier (unique)
    #[sea_orm(unique)]
    pub role_code: String,

    pub role_desc: String,

    /// 1 = enabled, 0 = disabled
    pub status: i32,

    pub created_at: ChronoDateTimeUtc,

    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::user_role::Entity")]
    UserRoles,

    #[sea_orm(has_many = "super::role_resource::Entity")]
    RoleResources,
}

impl Related<super::user_role::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserRoles.def()
    }
}

impl Related<super::role_resource::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RoleResources.def()
    }
}

impl Related<super::resource::Entity> for Entity {
    fn to() -> RelationDef {
        super::role_resource::Relation::Resource.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::role_resource::Relation::Role.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
