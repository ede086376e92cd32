use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::flag::Flag;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Flag,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Flag => "flag",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    Create,
    Update,
    Rollback,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Create => "create",
            AuditAction::Update => "update",
            AuditAction::Rollback => "rollback",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "create" => Some(AuditAction::Create),
            "update" => Some(AuditAction::Update),
            "rollback" => Some(AuditAction::Rollback),
            _ => None,
        }
    }

    /// Whether entries with this action carry a restorable flag snapshot
    pub fn records_snapshot(&self) -> bool {
        matches!(self, AuditAction::Create | AuditAction::Update)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollbackRecord {
    pub to_version: i64,
    pub applied_version: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AuditData {
    Snapshot(Flag),
    Rollback(RollbackRecord),
}

/// Immutable record of one flag mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub ts: i64,
    pub actor: String,
    pub entity_type: EntityType,
    pub entity_id: String,
    pub action: AuditAction,
    pub data: AuditData,
}

impl AuditLogEntry {
    pub fn snapshot(actor: &str, action: AuditAction, flag: &Flag) -> Self {
        Self {
            id: Uuid::new_v4(),
            ts: flag.updated_at,
            actor: actor.to_string(),
            entity_type: EntityType::Flag,
            entity_id: flag.key.clone(),
            action,
            data: AuditData::Snapshot(flag.clone()),
        }
    }

    pub fn rollback(actor: &str, flag: &Flag, to_version: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            ts: flag.updated_at,
            actor: actor.to_string(),
            entity_type: EntityType::Flag,
            entity_id: flag.key.clone(),
            action: AuditAction::Rollback,
            data: AuditData::Rollback(RollbackRecord {
                to_version,
                applied_version: flag.version,
            }),
        }
    }

    /// Version of the recorded snapshot, if this entry holds one
    pub fn snapshot_version(&self) -> Option<i64> {
        match (&self.data, self.action.records_snapshot()) {
            (AuditData::Snapshot(flag), true) => Some(flag.version),
            _ => None,
        }
    }
}
