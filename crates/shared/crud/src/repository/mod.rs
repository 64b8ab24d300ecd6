//! Repository layer - data access abstraction.
//!
//! Every repository soft-deletes: a deleted row keeps existing with its
//! `deleted` column set to its own id and disappears from every query.
//! There is deliberately no delete-by-id; callers load the record and go
//! through [`BaseRepository::delete`] after the foreign key check.

mod cached;
#[cfg(any(test, feature = "test-utils"))]
mod memory;
mod sea;
pub mod transaction;

use async_trait::async_trait;
use serde_json::Value;

use common::{AppResult, JsonMap};
use domain::{Entity, Id};

use crate::pagination::{Page, PageRequest};

pub use cached::CachedRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use memory::InMemoryRepository;
pub use sea::{created, key, ColumnOf, SeaOrmRepository, TableBinding};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Persistence contract for one record type.
///
/// `F` is the search criteria, usually the record's DTO: a criteria field is
/// applied only when it is set.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait BaseRepository<E: Entity, F: Send + Sync + 'static>: Send + Sync {
    /// Insert when [`Entity::is_new_record`], update otherwise.
    async fn save(&self, entity: E) -> AppResult<E>;

    /// Save every record in one transaction.
    async fn save_all(&self, entities: Vec<E>) -> AppResult<Vec<E>>;

    async fn find_all(&self) -> AppResult<Vec<E>>;

    async fn find_all_by_id(&self, ids: &[Id]) -> AppResult<Vec<E>>;

    async fn find_by_id(&self, id: Id) -> AppResult<Option<E>>;

    async fn exists_by_id(&self, id: Id) -> AppResult<bool>;

    /// `active` of a live record, `None` when it does not exist.
    async fn active_by_id(&self, id: Id) -> AppResult<Option<bool>>;

    /// Soft delete: `deleted` becomes the record's id.
    async fn delete(&self, entity: E) -> AppResult<E>;

    async fn delete_entities(&self, entities: Vec<E>) -> AppResult<Vec<E>> {
        let mut deleted = Vec::with_capacity(entities.len());
        for entity in entities {
            deleted.push(self.delete(entity).await?);
        }
        Ok(deleted)
    }

    /// Soft delete every live record, returning how many were marked.
    async fn delete_all(&self) -> AppResult<u64>;

    /// Whether live records elsewhere still reference `id`.
    async fn exists_foreign_key_constraint(&self, _id: Id) -> AppResult<bool> {
        Ok(false)
    }

    async fn search(&self, criteria: &F, page: &PageRequest) -> AppResult<Page<E>>;

    /// Call a stored function with named parameters; each row is returned as
    /// a JSON object.
    async fn call_procedure(&self, name: &str, params: &JsonMap) -> AppResult<Vec<Value>>;
}
