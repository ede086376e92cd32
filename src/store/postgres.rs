use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::PgPool;
use std::time::Duration;
use tracing::{instrument, warn};
use uuid::Uuid;

use super::{FlagRepository, FlagWrite, Result, StoreError, StoredFlag};
use crate::models::{AuditAction, AuditData, AuditLogEntry, EntityType, Flag};

// Database row types

#[derive(Debug, sqlx::FromRow)]
struct FlagRow {
    doc: Json<Flag>,
    revision: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct AuditRow {
    id: Uuid,
    ts: i64,
    actor: String,
    entity_id: String,
    action: String,
    data: Json<AuditData>,
}

impl TryFrom<AuditRow> for AuditLogEntry {
    type Error = StoreError;

    fn try_from(row: AuditRow) -> Result<Self> {
        let action = AuditAction::parse(&row.action)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown audit action '{}'", row.action)))?;
        Ok(AuditLogEntry {
            id: row.id,
            ts: row.ts,
            actor: row.actor,
            entity_type: EntityType::Flag,
            entity_id: row.entity_id,
            action,
            data: row.data.0,
        })
    }
}

/// Postgres-backed repository. Flags live in `flags` as JSONB documents;
/// `audit_logs` is append-only and indexed by `(entity_id, version)`.
#[derive(Clone)]
pub struct PgFlagRepository {
    pool: PgPool,
}

impl PgFlagRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(
        url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(url)
            .await?;
        Ok(Self { pool })
    }

    /// Apply pending schema migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(sqlx::Error::from)?;
        Ok(())
    }
}

#[async_trait]
impl FlagRepository for PgFlagRepository {
    #[instrument(skip(self))]
    async fn get_flag(&self, key: &str) -> Result<Option<StoredFlag>> {
        let row: Option<FlagRow> = sqlx::query_as(
            r#"
            SELECT doc, revision FROM flags
            WHERE key = $1
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| StoredFlag {
            flag: r.doc.0,
            revision: r.revision,
        }))
    }

    #[instrument(skip(self))]
    async fn list_flags(&self) -> Result<Vec<Flag>> {
        let docs: Vec<Json<Flag>> = sqlx::query_scalar(
            r#"
            SELECT doc FROM flags
            ORDER BY key COLLATE "C" ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(docs.into_iter().map(|d| d.0).collect())
    }

    #[instrument(skip(self))]
    async fn find_snapshot(&self, key: &str, version: i64) -> Result<Option<Flag>> {
        let doc: Option<Json<Flag>> = sqlx::query_scalar(
            r#"
            SELECT data FROM audit_logs
            WHERE entity_type = $1 AND entity_id = $2
              AND action IN ('create', 'update')
              AND version = $3
            ORDER BY seq ASC
            LIMIT 1
            "#,
        )
        .bind(EntityType::Flag.as_str())
        .bind(key)
        .bind(version)
        .fetch_optional(&self.pool)
        .await?;

        Ok(doc.map(|d| d.0))
    }

    #[instrument(skip(self))]
    async fn list_audit(&self, key: &str, limit: i64) -> Result<Vec<AuditLogEntry>> {
        let rows: Vec<AuditRow> = sqlx::query_as(
            r#"
            SELECT id, ts, actor, entity_id, action, data
            FROM audit_logs
            WHERE entity_type = $1 AND entity_id = $2
            ORDER BY seq DESC
            LIMIT $3
            "#,
        )
        .bind(EntityType::Flag.as_str())
        .bind(key)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(AuditLogEntry::try_from).collect()
    }

    #[instrument(skip(self, write), fields(key = %write.flag.key, version = write.flag.version))]
    async fn write_flag(&self, write: FlagWrite) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        // Step 1: compare-and-set on the write revision
        let affected = match write.expected_revision {
            None => sqlx::query(
                r#"
                INSERT INTO flags (key, version, revision, doc, updated_at)
                VALUES ($1, $2, 1, $3, $4)
                ON CONFLICT (key) DO NOTHING
                "#,
            )
            .bind(&write.flag.key)
            .bind(write.flag.version)
            .bind(Json(&write.flag))
            .bind(write.flag.updated_at)
            .execute(&mut *tx)
            .await?
            .rows_affected(),
            Some(revision) => sqlx::query(
                r#"
                UPDATE flags
                SET version = $2, revision = revision + 1, doc = $3, updated_at = $4
                WHERE key = $1 AND revision = $5
                "#,
            )
            .bind(&write.flag.key)
            .bind(write.flag.version)
            .bind(Json(&write.flag))
            .bind(write.flag.updated_at)
            .bind(revision)
            .execute(&mut *tx)
            .await?
            .rows_affected(),
        };

        if affected != 1 {
            tx.rollback().await?;
            warn!(key = %write.flag.key, "lost compare-and-set race");
            return Err(StoreError::Conflict {
                key: write.flag.key,
            });
        }

        // Step 2: audit entry in the same transaction
        let audit = &write.audit;
        sqlx::query(
            r#"
            INSERT INTO audit_logs (id, ts, actor, entity_type, entity_id, action, version, data)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(audit.id)
        .bind(audit.ts)
        .bind(&audit.actor)
        .bind(audit.entity_type.as_str())
        .bind(&audit.entity_id)
        .bind(audit.action.as_str())
        .bind(audit.snapshot_version())
        .bind(Json(&audit.data))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
