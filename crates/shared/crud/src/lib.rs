//! Generic CRUD layer shared by the services.
//!
//! A service declares a record, its DTO and a [`TableBinding`]; this crate
//! supplies the rest:
//! - soft-deleting repositories over SeaORM, with a caching decorator
//! - name-based record/DTO mapping with per-type hooks
//! - the save/delete/search pipeline with per-item batch results
//! - the request security context and a REST router

pub mod cache;
pub mod mapper;
pub mod mapping;
pub mod pagination;
pub mod repository;
pub mod rest;
pub mod security;
pub mod service;

#[cfg(test)]
mod test_support;

pub use cache::CacheStore;
pub use mapper::{CollectionConverter, Converter, ModelMapper};
pub use mapping::{EntityMapper, MappingHooks, NoHooks};
pub use pagination::{Direction, Page, PageMeta, PageParams, PageRequest, SortOrder};
pub use repository::{BaseRepository, CachedRepository, SeaOrmRepository, TableBinding};
pub use rest::{authenticate, crud_routes, JwtAuthenticator};
pub use service::{BaseService, CrudOperations, ServiceHooks};

#[cfg(any(test, feature = "test-utils"))]
pub use repository::InMemoryRepository;
