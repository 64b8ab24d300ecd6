//! SeaORM table models.

pub mod course;
pub mod department;
