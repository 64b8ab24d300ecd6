//! Cache regions for repository reads.
//!
//! Values are stored as JSON strings under `{region}:{key}` so a whole region
//! can be evicted after any write.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client, RedisError};
use tokio::sync::RwLock;

use common::{AppError, AppResult, CacheConfig};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Key-value store backing cached repositories.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    async fn put(&self, key: &str, value: String) -> AppResult<()>;

    /// Drop every key of a region.
    async fn evict_region(&self, region: &str) -> AppResult<()>;
}

/// Build the cache store from configuration: Redis when a URL is set, the
/// in-process map otherwise.
pub async fn connect(config: &CacheConfig) -> AppResult<Arc<dyn CacheStore>> {
    match &config.url {
        Some(url) => {
            let cache = RedisCache::connect(url, config.default_ttl_seconds)
                .await
                .map_err(cache_error)?;
            tracing::info!("Redis cache connected");
            Ok(Arc::new(cache))
        }
        None => {
            tracing::info!("No REDIS_URL configured, using in-memory cache");
            Ok(Arc::new(MemoryCache::default()))
        }
    }
}

/// Redis cache wrapper with connection pooling.
#[derive(Clone)]
pub struct RedisCache {
    connection: ConnectionManager,
    default_ttl: u64,
}

impl RedisCache {
    pub async fn connect(url: &str, default_ttl: u64) -> Result<Self, RedisError> {
        let client = Client::open(url)?;
        let connection = ConnectionManager::new(client).await?;

        Ok(Self {
            connection,
            default_ttl,
        })
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let mut conn = self.connection.clone();
        conn.get(key).await.map_err(cache_error)
    }

    async fn put(&self, key: &str, value: String) -> AppResult<()> {
        let mut conn = self.connection.clone();
        conn.set_ex::<_, _, ()>(key, value, self.default_ttl)
            .await
            .map_err(cache_error)
    }

    async fn evict_region(&self, region: &str) -> AppResult<()> {
        let mut conn = self.connection.clone();
        let keys: Vec<String> = conn
            .keys(format!("{}:*", region))
            .await
            .map_err(cache_error)?;

        if keys.is_empty() {
            return Ok(());
        }

        // UNLINK is non-blocking (Redis 4.0+); fall back to DEL
        let unlinked: Result<i64, RedisError> =
            redis::cmd("UNLINK").arg(&keys).query_async(&mut conn).await;

        if unlinked.is_err() {
            let _: i64 = conn.del(&keys).await.map_err(cache_error)?;
        }

        tracing::debug!(region, count = keys.len(), "Cache region evicted");
        Ok(())
    }
}

/// Process-local cache for single-instance deployments and tests.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, String>>,
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: String) -> AppResult<()> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn evict_region(&self, region: &str) -> AppResult<()> {
        let prefix = format!("{}:", region);
        self.entries
            .write()
            .await
            .retain(|key, _| !key.starts_with(&prefix));
        Ok(())
    }
}

fn cache_error(e: RedisError) -> AppError {
    tracing::error!("Redis error: {}", e);
    AppError::Cache(e)
}
