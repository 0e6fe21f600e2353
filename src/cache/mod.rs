//! Read-through cache in front of the store.
//!
//! Values are JSON strings with a TTL. Redis is used when configured, otherwise an in-process map.
//! The cache is never authoritative: every failure is logged and the store answers instead.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::errors::AppError;

/// Expiry for a cached course preview.
pub const COURSE_TTL: u64 = 86_400;
/// Expiry for a course preview written after a review.
pub const REVIEW_TTL: u64 = 604_800;
/// Expiry for the full course list.
pub const ALL_COURSES_TTL: u64 = 86_400;
pub const LAYOUT_TTL: u64 = 604_800;
pub const USER_TTL: u64 = 86_400;

/// Key of the cached full course list.
pub const ALL_COURSES_KEY: &str = "allCourses";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

/// Key-value store with per-entry expiry.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: String, ttl_secs: u64) -> Result<(), CacheError>;

    /// Removing a missing key succeeds.
    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}

pub struct RedisCache {
    conn: ConnectionManager,
}

impl RedisCache {
    pub async fn new(redis_url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: String, ttl_secs: u64) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: () = conn.set_ex(key, value, ttl_secs).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(key).await?;
        Ok(())
    }
}

/// In-process cache for single-node deployments and tests.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, (String, Instant)>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some((_, expires_at)) if *expires_at <= Instant::now() => {
                entries.remove(key);
                Ok(None)
            }
            Some((value, _)) => Ok(Some(value.clone())),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: String, ttl_secs: u64) -> Result<(), CacheError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        entries.retain(|_, (_, expires_at)| *expires_at > now);
        entries.insert(key.to_string(), (value, now + Duration::from_secs(ttl_secs)));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.lock().await.remove(key);
        Ok(())
    }
}

/// Where a fetched value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Cache,
    Store,
}

#[derive(Debug, Clone)]
pub struct Fetched<T> {
    pub value: T,
    pub source: Source,
}

/// Typed, failure-tolerant facade over a [`Cache`].
#[derive(Clone)]
pub struct CacheService {
    inner: Arc<dyn Cache>,
}

impl CacheService {
    pub fn new(inner: Arc<dyn Cache>) -> Self {
        Self { inner }
    }

    /// Cached value for `key`, if present and readable.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.inner.get(key).await {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(key, "Cache read failed: {}", e);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key, "Discarding unreadable cache entry: {}", e);
                None
            }
        }
    }

    pub async fn put<T: Serialize>(&self, key: &str, value: &T, ttl_secs: u64) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(key, "Cache value not serializable: {}", e);
                return;
            }
        };

        if let Err(e) = self.inner.set(key, raw, ttl_secs).await {
            tracing::warn!(key, "Cache write failed: {}", e);
        }
    }

    pub async fn invalidate(&self, keys: &[&str]) {
        for key in keys {
            if let Err(e) = self.inner.delete(key).await {
                tracing::warn!(key, "Cache eviction failed: {}", e);
            }
        }
    }

    /// Read-through lookup: the cache first, then `load`, whose result is cached with `ttl_secs`.
    pub async fn fetch<T, F, Fut>(
        &self,
        key: &str,
        ttl_secs: u64,
        load: F,
    ) -> Result<Option<Fetched<T>>, AppError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>, AppError>>,
    {
        if let Some(value) = self.get(key).await {
            tracing::debug!(key, "Cache hit");
            return Ok(Some(Fetched {
                value,
                source: Source::Cache,
            }));
        }

        let Some(value) = load().await? else {
            return Ok(None);
        };
        self.put(key, &value, ttl_secs).await;

        Ok(Some(Fetched {
            value,
            source: Source::Store,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct BrokenCache;

    #[async_trait]
    impl Cache for BrokenCache {
        async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
            Err(CacheError::Redis(redis::RedisError::from((
                redis::ErrorKind::Io,
                "connection refused",
            ))))
        }

        async fn set(&self, _key: &str, _value: String, _ttl: u64) -> Result<(), CacheError> {
            Err(CacheError::Redis(redis::RedisError::from((
                redis::ErrorKind::Io,
                "connection refused",
            ))))
        }

        async fn delete(&self, _key: &str) -> Result<(), CacheError> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_memory_cache_entries_expire() {
        let cache = MemoryCache::new();
        cache.set("faq", "[]".to_string(), 60).await.unwrap();

        tokio::time::advance(Duration::from_secs(59)).await;
        assert_eq!(cache.get("faq").await.unwrap().as_deref(), Some("[]"));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(cache.get("faq").await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_memory_cache_set_drops_expired_keys() {
        let cache = MemoryCache::new();
        cache.set("Banner", "{}".to_string(), 10).await.unwrap();
        cache.set("faq", "[]".to_string(), 120).await.unwrap();

        tokio::time::advance(Duration::from_secs(11)).await;
        cache.set("Categories", "[]".to_string(), 60).await.unwrap();

        let entries = cache.entries.lock().await;
        assert!(!entries.contains_key("Banner"));
        assert!(entries.contains_key("faq"));
        assert!(entries.contains_key("Categories"));
    }

    #[tokio::test]
    async fn test_fetch_loads_once_then_hits() {
        let service = CacheService::new(Arc::new(MemoryCache::new()));
        let loads = AtomicUsize::new(0);

        for expected in [Source::Store, Source::Cache] {
            let fetched = service
                .fetch("course-1", COURSE_TTL, || async {
                    loads.fetch_add(1, Ordering::SeqCst);
                    Ok(Some(vec![1, 2, 3]))
                })
                .await
                .unwrap()
                .unwrap();
            assert_eq!(fetched.value, vec![1, 2, 3]);
            assert_eq!(fetched.source, expected);
        }
        assert_eq!(loads.load(Ordering::SeqCst), 1);

        service.invalidate(&["course-1"]).await;
        let fetched = service
            .fetch("course-1", COURSE_TTL, || async { Ok(Some(vec![4])) })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.source, Source::Store);
        assert_eq!(fetched.value, vec![4]);
    }

    #[tokio::test]
    async fn test_missing_value_is_not_cached() {
        let service = CacheService::new(Arc::new(MemoryCache::new()));
        let fetched = service
            .fetch::<String, _, _>("gone", COURSE_TTL, || async { Ok(None) })
            .await
            .unwrap();
        assert!(fetched.is_none());
        assert!(service.get::<String>("gone").await.is_none());
    }

    #[tokio::test]
    async fn test_broken_cache_falls_back_to_store() {
        let service = CacheService::new(Arc::new(BrokenCache));
        let fetched = service
            .fetch(ALL_COURSES_KEY, ALL_COURSES_TTL, || async {
                Ok(Some("from store".to_string()))
            })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.value, "from store");
        assert_eq!(fetched.source, Source::Store);
    }
}
