use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

use super::{CacheError, FlagCache};

/// Process-local TTL cache, used when no Redis URL is configured
#[derive(Default)]
pub struct MemoryFlagCache {
    entries: RwLock<HashMap<String, (String, Instant)>>,
}

impl MemoryFlagCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FlagCache for MemoryFlagCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|(_, expires_at)| Instant::now() < *expires_at)
            .map(|(value, _)| value.clone()))
    }

    async fn set_with_ttl(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let mut entries = self.entries.write().await;
        let now = Instant::now();
        entries.retain(|_, (_, expires_at)| now < *expires_at);
        entries.insert(key.to_string(), (value, now + ttl));
        Ok(())
    }
}
