//! Application state.

use std::sync::Arc;

use common::AppResult;
use crud::{BaseRepository, JwtAuthenticator};

use crate::infra::Database;
use crate::model::{Course, CourseDto, Department, DepartmentDto};
use crate::service::{CourseHooks, CourseService, DepartmentHooks, DepartmentService};

pub type DepartmentRepository = Arc<dyn BaseRepository<Department, DepartmentDto>>;
pub type CourseRepository = Arc<dyn BaseRepository<Course, CourseDto>>;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub departments: Arc<DepartmentService>,
    pub courses: Arc<CourseService>,
    pub department_repository: DepartmentRepository,
    pub authenticator: Arc<JwtAuthenticator>,
    /// Absent when running over in-memory repositories
    pub database: Option<Database>,
}

impl AppState {
    /// Wire the services over the given repositories.
    pub fn new(
        departments: DepartmentRepository,
        courses: CourseRepository,
        authenticator: Arc<JwtAuthenticator>,
    ) -> AppResult<Self> {
        let department_service = DepartmentService::new(
            Arc::clone(&departments),
            Arc::new(DepartmentHooks::new(Arc::clone(&departments))),
        )?;
        let course_service =
            CourseService::new(courses, Arc::new(CourseHooks::new(Arc::clone(&departments))))?;

        Ok(Self {
            departments: Arc::new(department_service),
            courses: Arc::new(course_service),
            department_repository: departments,
            authenticator,
            database: None,
        })
    }

    pub fn with_database(mut self, database: Database) -> Self {
        self.database = Some(database);
        self
    }
}
