//! Repository layer for data access.
//!
//! Each table is bound to its record type once; the generic SeaORM
//! repository does the rest.

mod course_table;
mod department_table;
pub mod entities;

pub use course_table::CourseTable;
pub use department_table::DepartmentTable;
