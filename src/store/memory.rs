use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use super::{FlagRepository, FlagWrite, Result, StoreError, StoredFlag};
use crate::models::{AuditData, AuditLogEntry, Flag};

type Slot = Arc<Mutex<Option<StoredFlag>>>;

#[derive(Default)]
struct AuditLog {
    entries: Vec<AuditLogEntry>,
    // (flag key, snapshot version) -> first entry position holding it
    snapshots: HashMap<(String, i64), usize>,
}

/// In-process repository with the same write semantics as the Postgres one.
///
/// Each key has its own slot lock, so writers to different keys only share
/// the brief audit append. A writer holds its slot lock until both the
/// document and the audit entry are in place.
#[derive(Default)]
pub struct MemoryFlagRepository {
    slots: RwLock<HashMap<String, Slot>>,
    audit: RwLock<AuditLog>,
}

impl MemoryFlagRepository {
    pub fn new() -> Self {
        Self::default()
    }

    async fn slot(&self, key: &str) -> Option<Slot> {
        self.slots.read().await.get(key).cloned()
    }

    async fn slot_or_insert(&self, key: &str) -> Slot {
        if let Some(slot) = self.slot(key).await {
            return slot;
        }
        let mut slots = self.slots.write().await;
        Arc::clone(slots.entry(key.to_string()).or_default())
    }
}

#[async_trait]
impl FlagRepository for MemoryFlagRepository {
    async fn get_flag(&self, key: &str) -> Result<Option<StoredFlag>> {
        match self.slot(key).await {
            Some(slot) => Ok(slot.lock().await.clone()),
            None => Ok(None),
        }
    }

    async fn list_flags(&self) -> Result<Vec<Flag>> {
        let slots: Vec<Slot> = self.slots.read().await.values().cloned().collect();

        let mut flags = Vec::with_capacity(slots.len());
        for slot in slots {
            if let Some(stored) = slot.lock().await.as_ref() {
                flags.push(stored.flag.clone());
            }
        }
        flags.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(flags)
    }

    async fn find_snapshot(&self, key: &str, version: i64) -> Result<Option<Flag>> {
        let audit = self.audit.read().await;
        let snapshot = audit
            .snapshots
            .get(&(key.to_string(), version))
            .and_then(|&pos| audit.entries.get(pos))
            .and_then(|entry| match &entry.data {
                AuditData::Snapshot(flag) => Some(flag.clone()),
                _ => None,
            });
        Ok(snapshot)
    }

    async fn list_audit(&self, key: &str, limit: i64) -> Result<Vec<AuditLogEntry>> {
        let audit = self.audit.read().await;
        Ok(audit
            .entries
            .iter()
            .rev()
            .filter(|e| e.entity_id == key)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn write_flag(&self, write: FlagWrite) -> Result<()> {
        let slot = self.slot_or_insert(&write.flag.key).await;
        let mut current = slot.lock().await;

        let revision = current.as_ref().map(|s| s.revision);
        if revision != write.expected_revision {
            return Err(StoreError::Conflict {
                key: write.flag.key,
            });
        }

        let mut audit = self.audit.write().await;
        if let Some(version) = write.audit.snapshot_version() {
            let pos = audit.entries.len();
            audit
                .snapshots
                .entry((write.flag.key.clone(), version))
                .or_insert(pos);
        }
        audit.entries.push(write.audit);

        *current = Some(StoredFlag {
            flag: write.flag,
            revision: revision.unwrap_or(0) + 1,
        });
        Ok(())
    }
}
