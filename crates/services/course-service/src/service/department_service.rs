//! Department rules.

use std::sync::Arc;

use async_trait::async_trait;

use common::{AppError, AppResult};
use crud::{security, BaseRepository, BaseService, MappingHooks, PageRequest, ServiceHooks};
use domain::{DataError, Entity, ROLE_ADMIN};

use crate::model::{Department, DepartmentDto};

/// Authority allowing non-admins to delete departments.
pub const DEPARTMENT_DELETE: &str = "DEPARTMENT_DELETE";

/// Another live department already uses the name.
pub const DEPARTMENT_NAME_TAKEN: i32 = 1101;

pub type DepartmentService = BaseService<Department, DepartmentDto, DepartmentHooks>;

pub struct DepartmentHooks {
    departments: Arc<dyn BaseRepository<Department, DepartmentDto>>,
}

impl DepartmentHooks {
    pub fn new(departments: Arc<dyn BaseRepository<Department, DepartmentDto>>) -> Self {
        Self { departments }
    }
}

impl MappingHooks<Department, DepartmentDto> for DepartmentHooks {}

#[async_trait]
impl ServiceHooks<Department, DepartmentDto> for DepartmentHooks {
    async fn before_save(&self, mut entity: Department, _dto: &DepartmentDto) -> AppResult<Department> {
        entity.name = entity.name.trim().to_string();
        if entity.name.is_empty() {
            return Err(AppError::validation("Department name is required"));
        }

        let mut criteria = DepartmentDto {
            name: Some(entity.name.clone()),
            ..DepartmentDto::default()
        };
        criteria.base.strictly_search = Some(true);

        let taken = self
            .departments
            .search(&criteria, &PageRequest::new(1, 1))
            .await?
            .content
            .into_iter()
            .any(|other| other.id() != entity.id());
        if taken {
            return Err(name_taken(&entity.name));
        }

        Ok(entity)
    }

    async fn before_save_in_batch(
        &self,
        entity: Department,
        dto: &DepartmentDto,
        accepted: &[Department],
    ) -> AppResult<Department> {
        let entity = self.before_save(entity, dto).await?;
        if accepted.iter().any(|other| other.name == entity.name) {
            return Err(name_taken(&entity.name));
        }
        Ok(entity)
    }

    async fn before_delete(&self, entity: Department) -> AppResult<Department> {
        if !(security::has_role(ROLE_ADMIN) || security::has_authority(DEPARTMENT_DELETE)) {
            tracing::warn!(
                user = ?security::current_username(),
                id = ?entity.id(),
                "Department delete denied"
            );
            return Err(AppError::Forbidden);
        }
        Ok(entity)
    }
}

fn name_taken(name: &str) -> AppError {
    DataError::coded(DEPARTMENT_NAME_TAKEN, format!("Department '{}' already exists", name)).into()
}
