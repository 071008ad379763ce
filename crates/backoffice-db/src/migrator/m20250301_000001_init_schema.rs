//! Initial schema: accounts, permissions, navigation, reference data and request logs

use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ============================================================
        // 1. Accounts and roles
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(User::Table)
                    .if_not_exists()
                    .col(pk_auto(User::Id))
                    .col(string_len(User::Username, 64).not_null().unique_key())
                    .col(string_len(User::Nickname, 64).not_null().default(""))
                    .col(string_len(User::Email, 128).not_null().default(""))
                    .col(string_len(User::Phone, 20).not_null().default(""))
                    .col(string_len(User::Gender, 10).not_null().default(""))
                    .col(integer(User::Status).not_null().default(1))
                    .col(string_len(User::PasswordHash, 255).not_null())
                    .col(timestamp_with_time_zone(User::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(User::UpdatedAt).not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Role::Table)
                    .if_not_exists()
                    .col(pk_auto(Role::Id))
                    .col(string_len(Role::RoleName, 64).not_null())
                    .col(string_len(Role::RoleCode, 64).not_null().unique_key())
                    .col(string_len(Role::RoleDesc, 255).not_null().default(""))
                    .col(integer(Role::Status).not_null().default(1))
                    .col(timestamp_with_time_zone(Role::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Role::UpdatedAt).not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(UserRole::Table)
                    .if_not_exists()
                    .col(integer(UserRole::UserId).not_null())
                    .col(integer(UserRole::RoleId).not_null())
                    .primary_key(
                        Index::create()
                            .col(UserRole::UserId)
                            .col(UserRole::RoleId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_roles_user_id")
                            .from(UserRole::Table, UserRole::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_roles_role_id")
                            .from(UserRole::Table, UserRole::RoleId)
                            .to(Role::Table, Role::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // ============================================================
        // 2. Permission resources
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(Resource::Table)
                    .if_not_exists()
                    .col(pk_auto(Resource::Id))
                    .col(string_len(Resource::ResourceName, 50).not_null())
                    .col(
                        string_len(Resource::PermissionCode, 100)
                            .not_null()
                            .unique_key(),
                    )
                    .col(string_len(Resource::Description, 200).null())
                    .col(string_len(Resource::ResourceType, 20).not_null())
                    .col(string_len(Resource::ResourcePath, 500).null())
                    .col(string_len(Resource::HttpMethod, 10).null())
                    .col(integer(Resource::ParentId).null())
                    .col(integer(Resource::Sort).not_null().default(0))
                    .col(integer(Resource::Status).not_null().default(1))
                    .col(integer(Resource::RequiresAuth).not_null().default(1))
                    .col(string_len(Resource::Remark, 500).null())
                    .col(integer(Resource::CreatedBy).null())
                    .col(integer(Resource::UpdatedBy).null())
                    .col(timestamp_with_time_zone(Resource::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Resource::UpdatedAt).not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_resources_parent_id")
                    .table(Resource::Table)
                    .col(Resource::ParentId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RoleResource::Table)
                    .if_not_exists()
                    .col(integer(RoleResource::RoleId).not_null())
                    .col(integer(RoleResource::ResourceId).not_null())
                    .primary_key(
                        Index::create()
                            .col(RoleResource::RoleId)
                            .col(RoleResource::ResourceId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_role_resources_role_id")
                            .from(RoleResource::Table, RoleResource::RoleId)
                            .to(Role::Table, Role::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_role_resources_resource_id")
                            .from(RoleResource::Table, RoleResource::ResourceId)
                            .to(Resource::Table, Resource::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // ============================================================
        // 3. Navigation and system parameters
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(Menu::Table)
                    .if_not_exists()
                    .col(pk_auto(Menu::Id))
                    .col(string_len(Menu::Name, 64).not_null())
                    .col(string_len(Menu::Path, 255).not_null().default(""))
                    .col(string_len(Menu::Component, 255).null())
                    .col(integer(Menu::ParentId).null())
                    .col(integer(Menu::MenuType).not_null().default(2))
                    .col(string_len(Menu::Redirect, 255).not_null().default(""))
                    .col(string_len(Menu::Permission, 100).null())
                    .col(boolean(Menu::Visible).not_null().default(true))
                    .col(integer(Menu::Sort).not_null().default(0))
                    .col(text(Menu::Meta).not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SysConfig::Table)
                    .if_not_exists()
                    .col(pk_auto(SysConfig::Id))
                    .col(
                        string_len(SysConfig::ConfigKey, 100)
                            .not_null()
                            .unique_key(),
                    )
                    .col(string_len(SysConfig::ConfigName, 100).not_null())
                    .col(string_len(SysConfig::ConfigValue, 500).not_null())
                    .col(string_len(SysConfig::ConfigType, 1).not_null().default("N"))
                    .col(string_len(SysConfig::Remark, 500).not_null().default(""))
                    .col(timestamp_with_time_zone(SysConfig::CreateTime).not_null())
                    .to_owned(),
            )
            .await?;

        // ============================================================
        // 4. Admission reference data
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(SchoolAdmission::Table)
                    .if_not_exists()
                    .col(pk_auto(SchoolAdmission::Id))
                    .col(string_len(SchoolAdmission::SchoolCode, 20).not_null())
                    .col(string_len(SchoolAdmission::SchoolName, 100).not_null())
                    .col(string_len(SchoolAdmission::Category, 20).not_null())
                    .col(integer(SchoolAdmission::TotalScore).not_null())
                    .col(string_len(SchoolAdmission::TieBreaker, 255).not_null().default(""))
                    .col(
                        string_len(SchoolAdmission::AdmissionScope, 255)
                            .not_null()
                            .default(""),
                    )
                    .col(integer(SchoolAdmission::Year).not_null())
                    .col(timestamp_with_time_zone(SchoolAdmission::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(SchoolAdmission::UpdatedAt).not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AdmissionPlan::Table)
                    .if_not_exists()
                    .col(pk_auto(AdmissionPlan::Id))
                    .col(integer(AdmissionPlan::Year).not_null())
                    .col(string_len(AdmissionPlan::DistrictType, 50).not_null().default(""))
                    .col(string_len(AdmissionPlan::SchoolName, 255).not_null())
                    .col(string_len(AdmissionPlan::SchoolLevel, 50).not_null().default(""))
                    .col(
                        string_len(AdmissionPlan::OperationNature, 50)
                            .not_null()
                            .default(""),
                    )
                    .col(integer(AdmissionPlan::TotalStudents).null())
                    .col(integer(AdmissionPlan::BoardingStudents).null())
                    .col(integer(AdmissionPlan::DayStudents).null())
                    .col(text(AdmissionPlan::AdmissionScope).not_null())
                    .col(text(AdmissionPlan::Remarks).not_null())
                    .col(integer(AdmissionPlan::AcdStudents).not_null().default(0))
                    .col(integer(AdmissionPlan::AcStudents).not_null().default(0))
                    .col(integer(AdmissionPlan::DStudents).not_null().default(0))
                    .to_owned(),
            )
            .await?;

        // ============================================================
        // 5. HTTP request logs
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(AccessLog::Table)
                    .if_not_exists()
                    .col(pk_auto(AccessLog::Id))
                    .col(timestamp_with_time_zone(AccessLog::Timestamp).not_null())
                    .col(string_len(AccessLog::Method, 16).not_null())
                    .col(text(AccessLog::Path).not_null())
                    .col(text(AccessLog::Query).not_null())
                    .col(string_len(AccessLog::Ip, 64).not_null())
                    .col(text(AccessLog::UserAgent).not_null())
                    .col(integer(AccessLog::Status).not_null())
                    .col(big_integer(AccessLog::LatencyMs).not_null())
                    .col(string_len(AccessLog::Handler, 255).not_null())
                    .col(text(AccessLog::Request).null())
                    .col(text(AccessLog::Response).null())
                    .col(text(AccessLog::Errors).not_null())
                    .col(big_integer(AccessLog::ContentLength).not_null())
                    .col(boolean(AccessLog::Truncated).not_null().default(false))
                    .col(timestamp_with_time_zone(AccessLog::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(AccessLog::UpdatedAt).not_null())
                    .col(timestamp_with_time_zone(AccessLog::DeletedAt).null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_logs_timestamp")
                    .table(AccessLog::Table)
                    .col(AccessLog::Timestamp)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_logs_deleted_at")
                    .table(AccessLog::Table)
                    .col(AccessLog::DeletedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop tables in reverse order (respecting foreign keys)
        manager
            .drop_table(Table::drop().table(AccessLog::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(AdmissionPlan::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(SchoolAdmission::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(SysConfig::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Menu::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(RoleResource::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(UserRole::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Resource::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Role::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(User::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum User {
    #[sea_orm(iden = "users")]
    Table,
    Id,
    Username,
    Nickname,
    Email,
    Phone,
    Gender,
    Status,
    PasswordHash,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Role {
    #[sea_orm(iden = "roles")]
    Table,
    Id,
    RoleName,
    RoleCode,
    RoleDesc,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum UserRole {
    #[sea_orm(iden = "user_roles")]
    Table,
    UserId,
    RoleId,
}

#[derive(DeriveIden)]
enum Resource {
    #[sea_orm(iden = "resources")]
    Table,
    Id,
    ResourceName,
    PermissionCode,
    Description,
    ResourceType,
    ResourcePath,
    HttpMethod,
    ParentId,
    Sort,
    Status,
    RequiresAuth,
    Remark,
    CreatedBy,
    UpdatedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum RoleResource {
    #[sea_orm(iden = "role_resources")]
    Table,
    RoleId,
    ResourceId,
}

#[derive(DeriveIden)]
enum Menu {
    #[sea_orm(iden = "menus")]
    Table,
    Id,
    Name,
    Path,
    Component,
    ParentId,
    MenuType,
    Redirect,
    Permission,
    Visible,
    Sort,
    Meta,
}

#[derive(DeriveIden)]
enum SysConfig {
    #[sea_orm(iden = "sys_config")]
    Table,
    Id,
    ConfigKey,
    ConfigName,
    ConfigValue,
    ConfigType,
    Remark,
    CreateTime,
}

#[derive(DeriveIden)]
enum SchoolAdmission {
    #[sea_orm(iden = "school_admission_info")]
    Table,
    Id,
    SchoolCode,
    SchoolName,
    Category,
    TotalScore,
    TieBreaker,
    AdmissionScope,
    Year,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum AdmissionPlan {
    #[sea_orm(iden = "high_school_admission_plans")]
    Table,
    Id,
    Year,
    DistrictType,
    SchoolName,
    SchoolLevel,
    OperationNature,
    TotalStudents,
    BoardingStudents,
    DayStudents,
    AdmissionScope,
    Remarks,
    AcdStudents,
    AcStudents,
    DStudents,
}

#[derive(DeriveIden)]
enum AccessLog {
    #[sea_orm(iden = "logs")]
    Table,
    Id,
    Timestamp,
    Method,
    Path,
    Query,
    Ip,
    UserAgent,
    Status,
    LatencyMs,
    Handler,
    Request,
    Response,
    Errors,
    ContentLength,
    Truncated,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}
