//! SeaORM repository tests against a mock connection.

use std::collections::BTreeMap;

use chrono::{TimeZone, Utc};
use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, Value};

use course_service_lib::model::{Department, DepartmentDto};
use course_service_lib::repository::{entities::department, DepartmentTable};
use crud::{BaseRepository, SeaOrmRepository};
use domain::{BaseFields, Entity};

fn model(id: i64, name: &str) -> department::Model {
    department::Model {
        id,
        name: name.to_string(),
        description: None,
        active: true,
        deleted: 0,
        created_at: Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
        updated_at: None,
        created_by: Some(1),
        updated_by: None,
    }
}

fn count_row(count: i64) -> BTreeMap<&'static str, Value> {
    BTreeMap::from([("num_items", Value::BigInt(Some(count)))])
}

#[tokio::test]
async fn test_find_by_id_marks_record_loaded() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![model(3, "Anatomy")]])
        .into_connection();
    let repository = SeaOrmRepository::<DepartmentTable>::new(db);

    let found = repository.find_by_id(3).await.unwrap().unwrap();

    assert_eq!(found.name, "Anatomy");
    assert_eq!(found.base.active, Some(true));
    assert_eq!(found.base.state.old_active, Some(true));
    assert!(!found.is_new_record());
    assert_eq!(found.base.audit.created_by, Some(1));
}

#[tokio::test]
async fn test_find_by_id_missing_row() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<department::Model>::new()])
        .into_connection();
    let repository = SeaOrmRepository::<DepartmentTable>::new(db);

    assert!(repository.find_by_id(8).await.unwrap().is_none());
}

#[tokio::test]
async fn test_insert_defaults_active() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![model(10, "Histology")]])
        .into_connection();
    let repository = SeaOrmRepository::<DepartmentTable>::new(db);

    let department = Department {
        base: BaseFields::default(),
        name: "Histology".to_string(),
        description: None,
    };
    let saved = repository.save(department).await.unwrap();

    assert_eq!(saved.id(), Some(10));
    assert_eq!(saved.active(), Some(true));
    assert!(!saved.is_new_record());
}

#[tokio::test]
async fn test_soft_delete_sets_own_id() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_exec_results([MockExecResult {
            last_insert_id: 0,
            rows_affected: 1,
        }])
        .into_connection();
    let repository = SeaOrmRepository::<DepartmentTable>::new(db);

    let mut department = Department::default();
    department.base = BaseFields::with_id(4);
    let deleted = repository.delete(department).await.unwrap();

    assert_eq!(deleted.base.deleted, 4);
}

#[tokio::test]
async fn test_soft_delete_of_missing_row_is_not_found() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_exec_results([MockExecResult {
            last_insert_id: 0,
            rows_affected: 0,
        }])
        .into_connection();
    let repository = SeaOrmRepository::<DepartmentTable>::new(db);

    let mut department = Department::default();
    department.base = BaseFields::with_id(4);
    let err = repository.delete(department).await.unwrap_err();

    assert_eq!(err.error_code(), Some(602));
}

#[tokio::test]
async fn test_delete_without_id_is_rejected() {
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
    let repository = SeaOrmRepository::<DepartmentTable>::new(db);

    let err = repository.delete(Department::default()).await.unwrap_err();
    assert_eq!(err.error_code(), Some(601));
}

#[tokio::test]
async fn test_live_courses_block_department_delete() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![count_row(2)], vec![count_row(0)]])
        .into_connection();
    let repository = SeaOrmRepository::<DepartmentTable>::new(db);

    assert!(repository.exists_foreign_key_constraint(1).await.unwrap());
    assert!(!repository.exists_foreign_key_constraint(2).await.unwrap());
}

#[tokio::test]
async fn test_search_rejects_unknown_sort_property() {
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
    let repository = SeaOrmRepository::<DepartmentTable>::new(db);

    let page = crud::PageRequest::new(1, 10).with_sort(vec![crud::SortOrder::asc("budget")]);
    let err = repository
        .search(&DepartmentDto::default(), &page)
        .await
        .unwrap_err();

    assert!(matches!(err, common::AppError::BadRequest(_)));
}
