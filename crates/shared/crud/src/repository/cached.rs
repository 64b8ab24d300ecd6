//! Caching decorator for repositories.
//!
//! Reads of single records are cached per region; any write evicts the whole
//! region. A failing cache never fails a read.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use common::{json, AppResult, JsonMap};
use domain::{Entity, Id};

use super::BaseRepository;
use crate::cache::CacheStore;
use crate::pagination::{Page, PageRequest};

pub struct CachedRepository<R> {
    inner: R,
    cache: Arc<dyn CacheStore>,
    region: String,
}

impl<R> CachedRepository<R> {
    pub fn new(inner: R, cache: Arc<dyn CacheStore>, region: impl Into<String>) -> Self {
        Self {
            inner,
            cache,
            region: region.into(),
        }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    fn key(&self, kind: &str, id: Id) -> String {
        format!("{}:{}:{}", self.region, kind, id)
    }

    async fn lookup<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.cache.get(key).await {
            Ok(Some(cached)) => match json::from_str(&cached) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::warn!(key, "Discarding unreadable cache entry: {}", e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(key, "Cache read failed: {}", e);
                None
            }
        }
    }

    async fn store<T: Serialize + Sync>(&self, key: &str, value: &T) {
        let stored = match json::to_string(value) {
            Ok(serialized) => self.cache.put(key, serialized).await,
            Err(e) => Err(e),
        };
        if let Err(e) = stored {
            tracing::warn!(key, "Cache write failed: {}", e);
        }
    }

    async fn evict(&self) -> AppResult<()> {
        self.cache.evict_region(&self.region).await
    }
}

#[async_trait]
impl<E, F, R> BaseRepository<E, F> for CachedRepository<R>
where
    E: Entity,
    F: Send + Sync + 'static,
    R: BaseRepository<E, F>,
{
    async fn save(&self, entity: E) -> AppResult<E> {
        let saved = self.inner.save(entity).await?;
        self.evict().await?;
        Ok(saved)
    }

    async fn save_all(&self, entities: Vec<E>) -> AppResult<Vec<E>> {
        let saved = self.inner.save_all(entities).await?;
        self.evict().await?;
        Ok(saved)
    }

    async fn find_all(&self) -> AppResult<Vec<E>> {
        self.inner.find_all().await
    }

    async fn find_all_by_id(&self, ids: &[Id]) -> AppResult<Vec<E>> {
        self.inner.find_all_by_id(ids).await
    }

    async fn find_by_id(&self, id: Id) -> AppResult<Option<E>> {
        let key = self.key("find", id);
        if let Some(cached) = self.lookup::<Option<E>>(&key).await {
            return Ok(cached.map(|mut entity| {
                entity.base_mut().mark_loaded();
                entity
            }));
        }

        let found = self.inner.find_by_id(id).await?;
        self.store(&key, &found).await;
        Ok(found)
    }

    async fn exists_by_id(&self, id: Id) -> AppResult<bool> {
        let key = self.key("exists", id);
        if let Some(cached) = self.lookup::<bool>(&key).await {
            return Ok(cached);
        }

        let exists = self.inner.exists_by_id(id).await?;
        self.store(&key, &exists).await;
        Ok(exists)
    }

    async fn active_by_id(&self, id: Id) -> AppResult<Option<bool>> {
        let key = self.key("active", id);
        if let Some(cached) = self.lookup::<Option<bool>>(&key).await {
            return Ok(cached);
        }

        let active = self.inner.active_by_id(id).await?;
        self.store(&key, &active).await;
        Ok(active)
    }

    async fn delete(&self, entity: E) -> AppResult<E> {
        let deleted = self.inner.delete(entity).await?;
        self.evict().await?;
        Ok(deleted)
    }

    async fn delete_entities(&self, entities: Vec<E>) -> AppResult<Vec<E>> {
        let deleted = self.inner.delete_entities(entities).await?;
        self.evict().await?;
        Ok(deleted)
    }

    async fn delete_all(&self) -> AppResult<u64> {
        let count = self.inner.delete_all().await?;
        self.evict().await?;
        Ok(count)
    }

    async fn exists_foreign_key_constraint(&self, id: Id) -> AppResult<bool> {
        self.inner.exists_foreign_key_constraint(id).await
    }

    async fn search(&self, criteria: &F, page: &PageRequest) -> AppResult<Page<E>> {
        self.inner.search(criteria, page).await
    }

    async fn call_procedure(&self, name: &str, params: &JsonMap) -> AppResult<Vec<Value>> {
        let rows = self.inner.call_procedure(name, params).await?;
        self.evict().await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MockCacheStore;
    use crate::repository::MockBaseRepository;
    use crate::test_support::Ward;
    use mockall::predicate::eq;

    type WardRepository = MockBaseRepository<Ward, ()>;

    fn ward(id: Id) -> Ward {
        Ward::named(Some(id), "Cardiology")
    }

    #[tokio::test]
    async fn test_find_by_id_hit_skips_repository() {
        let mut cache = MockCacheStore::new();
        cache
            .expect_get()
            .with(eq("ward:find:4"))
            .times(1)
            .returning(|_| Ok(Some(r#"{"id":4,"active":true,"deleted":0,"name":"ICU"}"#.to_string())));

        let mut inner = WardRepository::new();
        inner.expect_find_by_id().never();

        let repository = CachedRepository::new(inner, Arc::new(cache), "ward");
        let found = repository.find_by_id(4).await.unwrap().unwrap();

        assert_eq!(found.name, "ICU");
        assert_eq!(found.base.state.old_active, Some(true));
    }

    #[tokio::test]
    async fn test_find_by_id_miss_populates_cache() {
        let mut cache = MockCacheStore::new();
        cache.expect_get().returning(|_| Ok(None));
        cache
            .expect_put()
            .withf(|key, value| key == "ward:find:4" && value.contains("Cardiology"))
            .times(1)
            .returning(|_, _| Ok(()));

        let mut inner = WardRepository::new();
        inner
            .expect_find_by_id()
            .with(eq(4))
            .times(1)
            .returning(|id| Ok(Some(ward(id))));

        let repository = CachedRepository::new(inner, Arc::new(cache), "ward");
        let found = repository.find_by_id(4).await.unwrap();
        assert_eq!(found.map(|w| w.name).as_deref(), Some("Cardiology"));
    }

    #[tokio::test]
    async fn test_cache_failure_falls_through() {
        let mut cache = MockCacheStore::new();
        cache
            .expect_get()
            .returning(|_| Err(common::AppError::internal("down")));
        cache
            .expect_put()
            .returning(|_, _| Err(common::AppError::internal("down")));

        let mut inner = WardRepository::new();
        inner.expect_exists_by_id().returning(|_| Ok(true));

        let repository = CachedRepository::new(inner, Arc::new(cache), "ward");
        assert!(repository.exists_by_id(9).await.unwrap());
    }

    #[tokio::test]
    async fn test_every_write_evicts_region() {
        let mut cache = MockCacheStore::new();
        cache
            .expect_evict_region()
            .with(eq("ward"))
            .times(3)
            .returning(|_| Ok(()));

        let mut inner = WardRepository::new();
        inner.expect_save().returning(Ok);
        inner.expect_delete().returning(|mut w| {
            w.base.mark_deleted();
            Ok(w)
        });
        inner.expect_delete_all().returning(|| Ok(2));

        let repository = CachedRepository::new(inner, Arc::new(cache), "ward");
        repository.save(ward(1)).await.unwrap();
        let deleted = repository.delete(ward(5)).await.unwrap();
        assert_eq!(deleted.base.deleted, 5);
        assert_eq!(repository.delete_all().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_failed_write_does_not_evict() {
        let mut cache = MockCacheStore::new();
        cache.expect_evict_region().never();

        let mut inner = WardRepository::new();
        inner
            .expect_save()
            .returning(|_| Err(common::AppError::internal("constraint")));

        let repository = CachedRepository::new(inner, Arc::new(cache), "ward");
        assert!(repository.save(ward(1)).await.is_err());
    }
}
