//! Database entities

pub mod access_log;
pub mod admission_plan;
pub mod menu;
pub mod resource;
pub mod role;
pub mod role_resource;
pub mod school_admission;
pub mod sys_config;
pub mod user;
pub mod user_role;

pub use access_log::Entity as AccessLog;
pub use admission_plan::Entity as AdmissionPlan;
pub use menu::Entity as Menu;
pub use resource::Entity as Resource;
pub use role::Entity as Role;
pub use role_resource::Entity as RoleResource;
pub use school_admission::Entity as SchoolAdmission;
pub use sys_config::Entity as SysConfig;
pub use user::Entity as User;
pub use user_role::Entity as UserRole;

pub mod prelude {
    pub use super::access_log::Entity as AccessLog;
    pub use super::admission_plan::Entity as AdmissionPlan;
    pub use super::menu::Entity as Menu;
    pub use super::resource::Entity as Resource;
    pub use super::role::Entity as Role;
    pub use super::role_resource::Entity as RoleResource;
    pub use super::school_admission::Entity as SchoolAdmission;
    pub use super::sys_config::Entity as SysConfig;
    pub use super::user::Entity as User;
    pub use super::user_role::Entity as UserRole;
}
