//! Domain layer - record model, DTO base, coded errors and principals.
//!
//! This crate contains pure domain logic with no infrastructure dependencies.

pub mod constants;
pub mod dto;
pub mod entity;
pub mod error;
pub mod principal;

pub use constants::*;
pub use dto::{BaseDtoFields, Dto};
pub use entity::{same_identity, AuditFields, BaseFields, Entity, Id, RecordState};
pub use error::{DataError, DataResult, DATA_ERROR_CODE};
pub use principal::{GrantedAuthorities, RoleHierarchy, UserPrincipal};
