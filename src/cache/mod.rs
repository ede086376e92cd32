//! Read-through snapshot cache in front of the flag store.
//!
//! Cache failures never reach the caller: unavailable, slow or corrupt
//! entries are treated as misses and the store is consulted instead.
//! Writes do not invalidate; entries expire after the configured TTL.

pub mod memory;
pub mod redis_cache;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::models::{Environment, Flag};
use crate::store::{FlagStore, Result};

pub use memory::MemoryFlagCache;
pub use redis_cache::RedisFlagCache;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("cache unavailable: {0}")]
    Unavailable(String),
}

/// String key/value cache with per-entry TTL
#[async_trait]
pub trait FlagCache: Send + Sync {
    async fn get(&self, key: &str) -> std::result::Result<Option<String>, CacheError>;

    async fn set_with_ttl(
        &self,
        key: &str,
        value: String,
        ttl: Duration,
    ) -> std::result::Result<(), CacheError>;
}

pub fn cache_key(env: Environment) -> String {
    format!("flags:{}", env)
}

#[derive(Clone)]
pub struct CacheAside {
    store: FlagStore,
    cache: Arc<dyn FlagCache>,
    ttl: Duration,
    call_timeout: Duration,
}

impl CacheAside {
    pub fn new(
        store: FlagStore,
        cache: Arc<dyn FlagCache>,
        ttl: Duration,
        call_timeout: Duration,
    ) -> Self {
        Self {
            store,
            cache,
            ttl,
            call_timeout,
        }
    }

    /// Flag snapshot for `env`, from cache when possible.
    ///
    /// On a miss the store result is returned right away and the cache is
    /// repopulated by a background task.
    pub async fn load_flags(&self, env: Environment) -> Result<Vec<Flag>> {
        if let Some(flags) = self.read_cached(env).await {
            return Ok(flags);
        }

        let flags = self.store.list().await?;
        self.spawn_repopulate(env, &flags);
        Ok(flags)
    }

    async fn read_cached(&self, env: Environment) -> Option<Vec<Flag>> {
        let key = cache_key(env);

        let raw = match timeout(self.call_timeout, self.cache.get(&key)).await {
            Ok(Ok(Some(raw))) => raw,
            Ok(Ok(None)) => {
                debug!(%key, "cache miss");
                return None;
            }
            Ok(Err(e)) => {
                warn!(%key, error = %e, "cache read failed, falling back to store");
                return None;
            }
            Err(_) => {
                warn!(%key, "cache read timed out, falling back to store");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(flags) => Some(flags),
            Err(e) => {
                warn!(%key, error = %e, "corrupt cache entry, falling back to store");
                None
            }
        }
    }

    fn spawn_repopulate(&self, env: Environment, flags: &[Flag]) {
        let payload = match serde_json::to_string(flags) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "could not serialize flag snapshot");
                return;
            }
        };

        let key = cache_key(env);
        let cache = Arc::clone(&self.cache);
        let ttl = self.ttl;
        let call_timeout = self.call_timeout;

        tokio::spawn(async move {
            match timeout(call_timeout, cache.set_with_ttl(&key, payload, ttl)).await {
                Ok(Ok(())) => debug!(%key, ttl_secs = ttl.as_secs(), "cache repopulated"),
                Ok(Err(e)) => warn!(%key, error = %e, "cache repopulation failed"),
                Err(_) => warn!(%key, "cache repopulation timed out"),
            }
        });
    }
}
