//! Migration: per-department course count function.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(
                r#"
                CREATE OR REPLACE FUNCTION department_course_counts(min_credits BIGINT DEFAULT 0)
                RETURNS TABLE (department_id BIGINT, department_name VARCHAR, course_count BIGINT)
                LANGUAGE sql STABLE AS $$
                    SELECT d.id, d.name, COUNT(c.id)
                    FROM departments d
                    LEFT JOIN courses c
                        ON c.department_id = d.id AND c.deleted = 0 AND c.credits >= min_credits
                    WHERE d.deleted = 0
                    GROUP BY d.id, d.name
                    ORDER BY d.id
                $$
                "#,
            )
            .await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DROP FUNCTION IF EXISTS department_course_counts(BIGINT)")
            .await?;
        Ok(())
    }
}
