//! Records and DTOs served by this service.

mod course;
mod department;

pub use course::{Course, CourseDto};
pub use department::{Department, DepartmentDto};
