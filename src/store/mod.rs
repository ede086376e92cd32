//! Versioned flag storage.
//!
//! `FlagStore` owns the versioning rules (upsert increments, rollback restores
//! an audited snapshot). Persistence goes through a `FlagRepository`, which
//! must apply a document write and its audit entry as one unit, guarded by a
//! compare-and-set on the per-key write revision.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::models::{AuditAction, AuditLogEntry, Flag, FlagInput};

pub use memory::MemoryFlagRepository;
pub use postgres::PgFlagRepository;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("concurrent write to flag '{key}'")]
    Conflict { key: String },
    #[error("invalid stored data: {0}")]
    Corrupt(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// A flag document together with its physical write counter
#[derive(Debug, Clone, PartialEq)]
pub struct StoredFlag {
    pub flag: Flag,
    pub revision: i64,
}

/// A document write plus the audit entry describing it
#[derive(Debug, Clone)]
pub struct FlagWrite {
    pub flag: Flag,
    /// Revision the writer loaded; `None` when the key did not exist
    pub expected_revision: Option<i64>,
    pub audit: AuditLogEntry,
}

#[async_trait]
pub trait FlagRepository: Send + Sync {
    async fn get_flag(&self, key: &str) -> Result<Option<StoredFlag>>;

    /// All flags, ordered by key ascending
    async fn list_flags(&self) -> Result<Vec<Flag>>;

    /// Earliest `create`/`update` snapshot of `key` recorded at `version`
    async fn find_snapshot(&self, key: &str, version: i64) -> Result<Option<Flag>>;

    /// Audit entries for `key`, newest first
    async fn list_audit(&self, key: &str, limit: i64) -> Result<Vec<AuditLogEntry>>;

    /// Persist `write.flag` and append `write.audit` atomically.
    ///
    /// Fails with `StoreError::Conflict` when the stored revision no longer
    /// matches `write.expected_revision`; nothing is written in that case.
    async fn write_flag(&self, write: FlagWrite) -> Result<()>;

    async fn close(&self) {}
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

#[derive(Clone)]
pub struct FlagStore {
    repo: Arc<dyn FlagRepository>,
}

impl FlagStore {
    pub fn new(repo: Arc<dyn FlagRepository>) -> Self {
        Self { repo }
    }

    pub async fn get_by_key(&self, key: &str) -> Result<Option<Flag>> {
        Ok(self.repo.get_flag(key).await?.map(|stored| stored.flag))
    }

    pub async fn list(&self) -> Result<Vec<Flag>> {
        self.repo.list_flags().await
    }

    /// Create or replace a flag, bumping its version by one
    #[instrument(skip(self, input), fields(key = %input.key))]
    pub async fn upsert(&self, actor: &str, input: FlagInput) -> Result<Flag> {
        let existing = self.repo.get_flag(&input.key).await?;

        let (version, created_by, description, expected_revision) = match &existing {
            Some(stored) => (
                stored.flag.version + 1,
                stored.flag.created_by.clone(),
                input.description.or_else(|| stored.flag.description.clone()),
                Some(stored.revision),
            ),
            None => (1, actor.to_string(), input.description, None),
        };

        let flag = Flag {
            key: input.key,
            flag_type: input.flag_type,
            envs: input.envs,
            version,
            created_by,
            updated_by: actor.to_string(),
            updated_at: now_millis(),
            description,
        };

        let action = if existing.is_some() {
            AuditAction::Update
        } else {
            AuditAction::Create
        };
        let audit = AuditLogEntry::snapshot(actor, action, &flag);

        self.repo
            .write_flag(FlagWrite {
                flag: flag.clone(),
                expected_revision,
                audit,
            })
            .await?;

        info!(
            key = %flag.key,
            version = flag.version,
            action = action.as_str(),
            actor,
            "flag saved"
        );
        Ok(flag)
    }

    /// Restore the snapshot recorded at `to_version`.
    ///
    /// Returns `Ok(None)` without writing when no such snapshot exists. The
    /// restored document reports `version == to_version`.
    #[instrument(skip(self))]
    pub async fn rollback(&self, actor: &str, key: &str, to_version: i64) -> Result<Option<Flag>> {
        let snapshot = match self.repo.find_snapshot(key, to_version).await? {
            Some(snapshot) => snapshot,
            None => return Ok(None),
        };
        let expected_revision = self.repo.get_flag(key).await?.map(|stored| stored.revision);

        let flag = Flag {
            version: to_version,
            updated_by: actor.to_string(),
            updated_at: now_millis(),
            ..snapshot
        };
        let audit = AuditLogEntry::rollback(actor, &flag, to_version);

        self.repo
            .write_flag(FlagWrite {
                flag: flag.clone(),
                expected_revision,
                audit,
            })
            .await?;

        info!(key, to_version, actor, "flag rolled back");
        Ok(Some(flag))
    }

    pub async fn history(&self, key: &str, limit: i64) -> Result<Vec<AuditLogEntry>> {
        self.repo.list_audit(key, limit).await
    }

    pub async fn close(&self) {
        self.repo.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AuditData, EnvConfig, Environment, FlagType, RollbackRecord};
    use serde_json::json;

    fn store() -> FlagStore {
        FlagStore::new(Arc::new(MemoryFlagRepository::new()))
    }

    fn input(key: &str, default_value: serde_json::Value) -> FlagInput {
        FlagInput {
            key: key.to_string(),
            flag_type: FlagType::Boolean,
            envs: vec![EnvConfig {
                env: Environment::Dev,
                default_value,
                rules: None,
                rollout: None,
                variants: None,
            }],
            description: None,
        }
    }

    #[tokio::test]
    async fn test_upsert_creates_then_updates() {
        let store = store();

        let created = store.upsert("alice", input("new-ui", json!(true))).await.unwrap();
        assert_eq!(created.version, 1);
        assert_eq!(created.created_by, "alice");

        let updated = store.upsert("bob", input("new-ui", json!(false))).await.unwrap();
        assert_eq!(updated.version, 2);
        assert_eq!(updated.created_by, "alice");
        assert_eq!(updated.updated_by, "bob");

        let history = store.history("new-ui", 10).await.unwrap();
        let actions: Vec<_> = history.iter().map(|e| e.action).collect();
        assert_eq!(actions, vec![AuditAction::Update, AuditAction::Create]);
        assert_eq!(history[0].data, AuditData::Snapshot(updated));
    }

    #[tokio::test]
    async fn test_upsert_keeps_description_when_omitted() {
        let store = store();
        let mut first = input("desc", json!(true));
        first.description = Some("checkout redesign".to_string());
        store.upsert("alice", first).await.unwrap();

        let second = store.upsert("alice", input("desc", json!(false))).await.unwrap();
        assert_eq!(second.description.as_deref(), Some("checkout redesign"));
    }

    #[tokio::test]
    async fn test_rollback_to_unknown_version_writes_nothing() {
        let store = store();
        store.upsert("alice", input("new-ui", json!(true))).await.unwrap();

        assert_eq!(store.rollback("bob", "new-ui", 7).await.unwrap(), None);
        assert_eq!(store.rollback("bob", "ghost", 1).await.unwrap(), None);
        assert_eq!(store.history("new-ui", 10).await.unwrap().len(), 1);
        assert_eq!(store.get_by_key("new-ui").await.unwrap().unwrap().version, 1);
    }

    #[tokio::test]
    async fn test_rollback_restores_snapshot_with_target_version() {
        let store = store();
        store.upsert("alice", input("new-ui", json!("v1"))).await.unwrap();
        store.upsert("alice", input("new-ui", json!("v2"))).await.unwrap();
        store.upsert("alice", input("new-ui", json!("v3"))).await.unwrap();

        let restored = store.rollback("carol", "new-ui", 1).await.unwrap().unwrap();
        assert_eq!(restored.version, 1);
        assert_eq!(restored.envs[0].default_value, json!("v1"));
        assert_eq!(restored.updated_by, "carol");
        assert_eq!(restored.created_by, "alice");
        assert_eq!(store.get_by_key("new-ui").await.unwrap().unwrap(), restored);

        let latest = &store.history("new-ui", 1).await.unwrap()[0];
        assert_eq!(latest.action, AuditAction::Rollback);
        assert_eq!(
            latest.data,
            AuditData::Rollback(RollbackRecord {
                to_version: 1,
                applied_version: 1
            })
        );

        // versioning resumes from the restored version
        let next = store.upsert("alice", input("new-ui", json!("v4"))).await.unwrap();
        assert_eq!(next.version, 2);
    }

    #[tokio::test]
    async fn test_list_is_ordered_by_key() {
        let store = store();
        for key in ["zeta", "alpha", "mid"] {
            store.upsert("alice", input(key, json!(true))).await.unwrap();
        }
        let keys: Vec<_> = store.list().await.unwrap().into_iter().map(|f| f.key).collect();
        assert_eq!(keys, vec!["alpha", "mid", "zeta"]);
    }

    #[tokio::test]
    async fn test_concurrent_upserts_keep_one_audit_entry_per_version() {
        let store = store();
        store.upsert("alice", input("race", json!(0))).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.upsert("writer", input("race", json!(i))).await
            }));
        }

        let mut succeeded = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => succeeded += 1,
                Err(StoreError::Conflict { key }) => assert_eq!(key, "race"),
                Err(other) => panic!("unexpected error {other}"),
            }
        }

        let current = store.get_by_key("race").await.unwrap().unwrap();
        assert_eq!(current.version, 1 + succeeded);

        let history = store.history("race", 100).await.unwrap();
        assert_eq!(history.len() as i64, 1 + succeeded);
        let mut versions: Vec<_> = history.iter().filter_map(|e| e.snapshot_version()).collect();
        versions.sort();
        versions.dedup();
        assert_eq!(versions.len(), history.len());
    }
}
