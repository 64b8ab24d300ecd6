//! Database migrations.
//!
//! Migration names follow the pattern: m{YYYYMMDD}_{NNNNNN}_{description}

use sea_orm_migration::prelude::*;

mod m20240101_000001_create_departments_table;
mod m20240101_000002_create_courses_table;
mod m20240102_000001_create_course_count_function;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_departments_table::Migration),
            Box::new(m20240101_000002_create_courses_table::Migration),
            Box::new(m20240102_000001_create_course_count_function::Migration),
        ]
    }
}
