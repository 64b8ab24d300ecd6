//! Department table binding.

use async_trait::async_trait;
use sea_orm::{
    ActiveValue::Set, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, Select,
};

use crud::repository::{created, key, ColumnOf, TableBinding};
use domain::{BaseFields, Dto, Entity, Id, NOT_DELETED};

use super::entities::{course, department};
use crate::model::{Department, DepartmentDto};

pub struct DepartmentTable;

#[async_trait]
impl TableBinding for DepartmentTable {
    type Table = department::Entity;
    type Model = department::Model;
    type ActiveModel = department::ActiveModel;
    type Domain = Department;
    type Filter = DepartmentDto;

    fn id_column() -> ColumnOf<Self> {
        department::Column::Id
    }

    fn active_column() -> ColumnOf<Self> {
        department::Column::Active
    }

    fn deleted_column() -> ColumnOf<Self> {
        department::Column::Deleted
    }

    fn to_domain(model: department::Model) -> Department {
        let mut base = BaseFields::with_id(model.id);
        base.active = Some(model.active);
        base.deleted = model.deleted;
        base.audit
            .set(model.created_by, model.created_at, model.updated_by, model.updated_at);

        Department {
            base,
            name: model.name,
            description: model.description,
        }
    }

    fn to_active_model(entity: &Department) -> department::ActiveModel {
        let base = entity.base();
        department::ActiveModel {
            id: key(entity),
            name: Set(entity.name.clone()),
            description: Set(entity.description.clone()),
            active: Set(base.active.unwrap_or(true)),
            deleted: created(entity, base.deleted),
            created_at: created(entity, base.audit.created_at),
            created_by: created(entity, base.audit.created_by),
            updated_at: Set(base.audit.updated_at),
            updated_by: Set(base.audit.updated_by),
        }
    }

    fn apply_filter(query: Select<department::Entity>, filter: &DepartmentDto) -> Select<department::Entity> {
        match filter.name.as_deref().map(str::trim).filter(|name| !name.is_empty()) {
            Some(name) if filter.strictly_search() => query.filter(department::Column::Name.eq(name)),
            Some(name) => query.filter(department::Column::Name.contains(name)),
            None => query,
        }
    }

    async fn count_dependents(db: &DatabaseConnection, id: Id) -> Result<u64, DbErr> {
        course::Entity::find()
            .filter(course::Column::DepartmentId.eq(id))
            .filter(course::Column::Deleted.eq(NOT_DELETED))
            .count(db)
            .await
    }
}
