use std::sync::Arc;
use std::time::Duration;

use crate::cache::{CacheAside, FlagCache};
use crate::evaluation::{evaluate_with_options, EvaluationOptions};
use crate::models::{
    AuditLogEntry, Environment, EvaluationContext, EvaluationResult, Flag, FlagInput,
};
use crate::store::{FlagRepository, FlagStore, Result};

/// Maximum audit entries returned for a single flag
pub const AUDIT_HISTORY_LIMIT: i64 = 1000;

#[derive(Debug, Clone, Copy)]
pub struct ServiceSettings {
    pub cache_ttl: Duration,
    pub cache_timeout: Duration,
    pub evaluation: EvaluationOptions,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(60),
            cache_timeout: Duration::from_millis(250),
            evaluation: EvaluationOptions::default(),
        }
    }
}

/// Entry point used by callers: evaluation through the cache, management
/// straight against the store.
#[derive(Clone)]
pub struct FlagService {
    store: FlagStore,
    cache: CacheAside,
    evaluation: EvaluationOptions,
}

impl FlagService {
    pub fn new(
        repo: Arc<dyn FlagRepository>,
        cache: Arc<dyn FlagCache>,
        settings: ServiceSettings,
    ) -> Self {
        let store = FlagStore::new(repo);
        let cache = CacheAside::new(
            store.clone(),
            cache,
            settings.cache_ttl,
            settings.cache_timeout,
        );
        Self {
            store,
            cache,
            evaluation: settings.evaluation,
        }
    }

    /// `None` when the flag key is unknown
    pub async fn evaluate(
        &self,
        key: &str,
        env: Environment,
        context: &EvaluationContext,
    ) -> Result<Option<EvaluationResult>> {
        let flags = self.cache.load_flags(env).await?;
        Ok(flags
            .iter()
            .find(|f| f.key == key)
            .map(|flag| evaluate_with_options(flag, env, context, self.evaluation)))
    }

    /// One result per requested key, in request order. Unknown keys yield a
    /// `flag-not-found` result instead of failing the batch.
    pub async fn evaluate_batch(
        &self,
        keys: &[String],
        env: Environment,
        context: &EvaluationContext,
    ) -> Result<Vec<EvaluationResult>> {
        let flags = self.cache.load_flags(env).await?;
        Ok(keys
            .iter()
            .map(|key| match flags.iter().find(|f| &f.key == key) {
                Some(flag) => evaluate_with_options(flag, env, context, self.evaluation),
                None => EvaluationResult::not_found(key),
            })
            .collect())
    }

    pub async fn list_flags(&self) -> Result<Vec<Flag>> {
        self.store.list().await
    }

    pub async fn get_flag(&self, key: &str) -> Result<Option<Flag>> {
        self.store.get_by_key(key).await
    }

    pub async fn upsert_flag(&self, actor: &str, input: FlagInput) -> Result<Flag> {
        self.store.upsert(actor, input).await
    }

    pub async fn rollback_flag(
        &self,
        actor: &str,
        key: &str,
        to_version: i64,
    ) -> Result<Option<Flag>> {
        self.store.rollback(actor, key, to_version).await
    }

    pub async fn flag_history(&self, key: &str) -> Result<Vec<AuditLogEntry>> {
        self.store.history(key, AUDIT_HISTORY_LIMIT).await
    }

    pub async fn close(&self) {
        self.store.close().await
    }
}
