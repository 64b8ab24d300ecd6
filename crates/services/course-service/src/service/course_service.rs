//! Course rules.

use std::sync::Arc;

use async_trait::async_trait;

use common::AppResult;
use crud::{BaseRepository, BaseService, MappingHooks, ServiceHooks};
use domain::{DataError, Entity};

use crate::model::{Course, CourseDto, Department, DepartmentDto};

pub type CourseService = BaseService<Course, CourseDto, CourseHooks>;

pub struct CourseHooks {
    departments: Arc<dyn BaseRepository<Department, DepartmentDto>>,
}

impl CourseHooks {
    pub fn new(departments: Arc<dyn BaseRepository<Department, DepartmentDto>>) -> Self {
        Self { departments }
    }
}

#[async_trait]
impl MappingHooks<Course, CourseDto> for CourseHooks {
    async fn specific_map_to_dto(&self, entity: &Course, dto: &mut CourseDto) -> AppResult<()> {
        if entity.map_all_properties() {
            dto.department_name = self
                .departments
                .find_by_id(entity.department_id)
                .await?
                .map(|department| department.name);
        }
        Ok(())
    }
}

#[async_trait]
impl ServiceHooks<Course, CourseDto> for CourseHooks {
    async fn before_save(&self, entity: Course, _dto: &CourseDto) -> AppResult<Course> {
        if !self.departments.exists_by_id(entity.department_id).await? {
            return Err(DataError::not_found(entity.department_id, Department::NAME).into());
        }
        Ok(entity)
    }
}
