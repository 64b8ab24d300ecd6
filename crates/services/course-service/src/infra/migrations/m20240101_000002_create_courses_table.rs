//! Migration: courses table.

use sea_orm_migration::prelude::*;

use super::m20240101_000001_create_departments_table::Departments;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Courses::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Courses::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Courses::Title).string_len(255).not_null())
                    .col(ColumnDef::new(Courses::Description).text().null())
                    .col(ColumnDef::new(Courses::Credits).integer().not_null().default(0))
                    .col(ColumnDef::new(Courses::DepartmentId).big_integer().not_null())
                    .col(ColumnDef::new(Courses::Active).boolean().not_null().default(true))
                    .col(ColumnDef::new(Courses::Deleted).big_integer().not_null().default(0))
                    .col(ColumnDef::new(Courses::CreatedAt).timestamp_with_time_zone().null())
                    .col(ColumnDef::new(Courses::UpdatedAt).timestamp_with_time_zone().null())
                    .col(ColumnDef::new(Courses::CreatedBy).big_integer().null())
                    .col(ColumnDef::new(Courses::UpdatedBy).big_integer().null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_courses_department")
                            .from(Courses::Table, Courses::DepartmentId)
                            .to(Departments::Table, Departments::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_courses_title_department_deleted")
                    .table(Courses::Table)
                    .col(Courses::Title)
                    .col(Courses::DepartmentId)
                    .col(Courses::Deleted)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Courses::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Courses {
    Table,
    Id,
    Title,
    Description,
    Credits,
    DepartmentId,
    Active,
    Deleted,
    CreatedAt,
    UpdatedAt,
    CreatedBy,
    UpdatedBy,
}
