// Override ledger: operator-directed phase skips. Append-only audit rows;
// at most one active per project. Never touches tracker state or the
// completion log; skipped phases only matter to progress accounting.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::info;

use crate::clock::Clock;
use crate::error::WorkflowError;
use crate::observability::workflow_metrics;

#[derive(Debug, Clone, PartialEq)]
pub struct PhaseOverride {
    pub id: i64,
    pub project_id: String,
    pub from_phase_id: i64,
    pub to_phase_id: i64,
    pub skipped_phase_ids: Vec<i64>,
    pub reason: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
}

pub struct OverrideLedger {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
}

impl OverrideLedger {
    pub fn new(pool: SqlitePool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }

    /// Record a new override: the previous active one (if any) is
    /// deactivated in the same transaction, never mutated otherwise.
    pub async fn record_override(
        &self,
        project_id: &str,
        from_phase_id: i64,
        to_phase_id: i64,
        skipped_phase_ids: &[i64],
        reason: &str,
        created_by: &str,
    ) -> Result<PhaseOverride, WorkflowError> {
        let skipped_json = serde_json::to_string(skipped_phase_ids)
            .map_err(|e| WorkflowError::CatalogIntegrity(format!("unencodable phase list: {e}")))?;
        let created_at = self.clock.now();

        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE phase_overrides SET is_active = 0 WHERE project_id = ?1 AND is_active = 1")
            .bind(project_id)
            .execute(&mut *tx)
            .await?;

        let id = sqlx::query(
            "INSERT INTO phase_overrides \
             (project_id, from_phase_id, to_phase_id, skipped_phase_ids, reason, created_by, created_at, is_active) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1)",
        )
        .bind(project_id)
        .bind(from_phase_id)
        .bind(to_phase_id)
        .bind(&skipped_json)
        .bind(reason)
        .bind(created_by)
        .bind(created_at)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        tx.commit().await?;

        workflow_metrics().record_override();
        info!(
            project_id = %project_id,
            from_phase_id = %from_phase_id,
            to_phase_id = %to_phase_id,
            skipped = ?skipped_phase_ids,
            created_by = %created_by,
            "Phase override recorded"
        );

        Ok(PhaseOverride {
            id,
            project_id: project_id.to_string(),
            from_phase_id,
            to_phase_id,
            skipped_phase_ids: skipped_phase_ids.to_vec(),
            reason: reason.to_string(),
            created_by: created_by.to_string(),
            created_at,
            is_active: true,
        })
    }

    /// The project's active override, if any.
    pub async fn get_active_override(
        &self,
        project_id: &str,
    ) -> Result<Option<PhaseOverride>, WorkflowError> {
        let row = sqlx::query(
            "SELECT id, project_id, from_phase_id, to_phase_id, skipped_phase_ids, reason, \
             created_by, created_at, is_active \
             FROM phase_overrides WHERE project_id = ?1 AND is_active = 1",
        )
        .bind(project_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| override_from_row(&r)).transpose()
    }

    /// Full audit trail for a project, newest first.
    pub async fn history(&self, project_id: &str) -> Result<Vec<PhaseOverride>, WorkflowError> {
        let rows = sqlx::query(
            "SELECT id, project_id, from_phase_id, to_phase_id, skipped_phase_ids, reason, \
             created_by, created_at, is_active \
             FROM phase_overrides WHERE project_id = ?1 ORDER BY created_at DESC, id DESC",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(override_from_row).collect()
    }
}

pub(crate) fn override_from_row(row: &SqliteRow) -> Result<PhaseOverride, WorkflowError> {
    let skipped_json: String = row.get("skipped_phase_ids");
    let skipped_phase_ids: Vec<i64> = serde_json::from_str(&skipped_json)
        .map_err(|e| WorkflowError::CatalogIntegrity(format!("undecodable phase list: {e}")))?;

    Ok(PhaseOverride {
        id: row.get("id"),
        project_id: row.get("project_id"),
        from_phase_id: row.get("from_phase_id"),
        to_phase_id: row.get("to_phase_id"),
        skipped_phase_ids,
        reason: row.get("reason"),
        created_by: row.get("created_by"),
        created_at: row.get("created_at"),
        is_active: row.get("is_active"),
    })
}
