//! Menu entity for the admin navigation tree

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "menus")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub name: String,

    pub path: String,

    pub component: Option<String>,

    pub parent_id: Option<i32>,

    /// 1 = directory, 2 = menu, 3 = button
    pub menu_type: i32,

    pub redirect: String,

    pub permission: Option<String>,

    pub visible: bool,

    pub sort: i32,

    /// JSON-encoded route meta (title, icon, ...)
    #[sea_orm(column_type = "Text")]
    pub meta: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
