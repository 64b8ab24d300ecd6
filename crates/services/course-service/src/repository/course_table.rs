//! Course table binding.

use sea_orm::{ActiveValue::Set, ColumnTrait, QueryFilter, Select};

use crud::repository::{created, key, ColumnOf, TableBinding};
use domain::{BaseFields, Dto, Entity};

use super::entities::course;
use crate::model::{Course, CourseDto};

pub struct CourseTable;

impl TableBinding for CourseTable {
    type Table = course::Entity;
    type Model = course::Model;
    type ActiveModel = course::ActiveModel;
    type Domain = Course;
    type Filter = CourseDto;

    fn id_column() -> ColumnOf<Self> {
        course::Column::Id
    }

    fn active_column() -> ColumnOf<Self> {
        course::Column::Active
    }

    fn deleted_column() -> ColumnOf<Self> {
        course::Column::Deleted
    }

    fn to_domain(model: course::Model) -> Course {
        let mut base = BaseFields::with_id(model.id);
        base.active = Some(model.active);
        base.deleted = model.deleted;
        base.audit
            .set(model.created_by, model.created_at, model.updated_by, model.updated_at);

        Course {
            base,
            title: model.title,
            description: model.description,
            credits: model.credits,
            department_id: model.department_id,
        }
    }

    fn to_active_model(entity: &Course) -> course::ActiveModel {
        let base = entity.base();
        course::ActiveModel {
            id: key(entity),
            title: Set(entity.title.clone()),
            description: Set(entity.description.clone()),
            credits: Set(entity.credits),
            department_id: Set(entity.department_id),
            active: Set(base.active.unwrap_or(true)),
            deleted: created(entity, base.deleted),
            created_at: created(entity, base.audit.created_at),
            created_by: created(entity, base.audit.created_by),
            updated_at: Set(base.audit.updated_at),
            updated_by: Set(base.audit.updated_by),
        }
    }

    fn apply_filter(query: Select<course::Entity>, filter: &CourseDto) -> Select<course::Entity> {
        let mut query = match filter.title.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            Some(title) if filter.strictly_search() => query.filter(course::Column::Title.eq(title)),
            Some(title) => query.filter(course::Column::Title.contains(title)),
            None => query,
        };
        if let Some(department_id) = filter.department_id {
            query = query.filter(course::Column::DepartmentId.eq(department_id));
        }
        if let Some(credits) = filter.credits {
            query = query.filter(course::Column::Credits.eq(credits));
        }
        query
    }
}
