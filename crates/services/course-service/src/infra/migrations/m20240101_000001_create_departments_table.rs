//! Migration: departments table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Departments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Departments::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Departments::Name).string_len(255).not_null())
                    .col(ColumnDef::new(Departments::Description).text().null())
                    .col(ColumnDef::new(Departments::Active).boolean().not_null().default(true))
                    .col(ColumnDef::new(Departments::Deleted).big_integer().not_null().default(0))
                    .col(ColumnDef::new(Departments::CreatedAt).timestamp_with_time_zone().null())
                    .col(ColumnDef::new(Departments::UpdatedAt).timestamp_with_time_zone().null())
                    .col(ColumnDef::new(Departments::CreatedBy).big_integer().null())
                    .col(ColumnDef::new(Departments::UpdatedBy).big_integer().null())
                    .to_owned(),
            )
            .await?;

        // a soft-deleted name can be reused
        manager
            .create_index(
                Index::create()
                    .name("uq_departments_name_deleted")
                    .table(Departments::Table)
                    .col(Departments::Name)
                    .col(Departments::Deleted)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Departments::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Departments {
    Table,
    Id,
    Name,
    Description,
    Active,
    Deleted,
    CreatedAt,
    UpdatedAt,
    CreatedBy,
    UpdatedBy,
}
