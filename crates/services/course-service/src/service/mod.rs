//! Service layer - per-table hooks on the generic CRUD pipeline.

mod course_service;
mod department_service;

pub use course_service::{CourseHooks, CourseService};
pub use department_service::{
    DepartmentHooks, DepartmentService, DEPARTMENT_DELETE, DEPARTMENT_NAME_TAKEN,
};
