use std::sync::Arc;

use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use crate::catalog::WorkflowCatalog;
use crate::clock::Clock;
use crate::error::WorkflowError;
use crate::progression::compute_next;
use crate::tracker::types::{completed_item_from_row, fetch_tracker, CompletionResult};

/// Sole writer of tracker position pointers. Each completion is one
/// transaction: append the completion record, advance the cursor with an
/// optimistic compare-and-swap on the current item, commit. A concurrent
/// advance makes the CAS miss and the whole transaction aborts.
pub struct CompletionRecorder {
    pool: SqlitePool,
    catalog: Arc<WorkflowCatalog>,
    clock: Arc<dyn Clock>,
}

impl CompletionRecorder {
    pub fn new(pool: SqlitePool, catalog: Arc<WorkflowCatalog>, clock: Arc<dyn Clock>) -> Self {
        Self {
            pool,
            catalog,
            clock,
        }
    }

    pub async fn complete(
        &self,
        tracker_id: &str,
        line_item_id: i64,
        completed_by: &str,
        notes: Option<&str>,
    ) -> Result<CompletionResult, WorkflowError> {
        if self.catalog.line_item(line_item_id).is_none() {
            return Err(WorkflowError::NotFound {
                what: "line item",
                id: line_item_id.to_string(),
            });
        }

        let tracker = fetch_tracker(&self.pool, tracker_id).await?;
        let Some(current) = tracker.current else {
            warn!(
                tracker_id = %tracker_id,
                line_item_id = %line_item_id,
                "Completion attempted on a finished workflow"
            );
            return Err(WorkflowError::InvalidTransition {
                tracker_id: tracker.id,
                expected: None,
                got: line_item_id,
            });
        };
        if current.line_item_id != line_item_id {
            warn!(
                tracker_id = %tracker_id,
                active_item = %current.line_item_id,
                line_item_id = %line_item_id,
                "Completion attempted on a non-active line item"
            );
            return Err(WorkflowError::InvalidTransition {
                tracker_id: tracker.id,
                expected: Some(current.line_item_id),
                got: line_item_id,
            });
        }

        let next = compute_next(&self.catalog, &current)?;
        let now = self.clock.now();

        let mut tx = self.pool.begin().await?;

        // A retry of an interrupted call may find the record already there;
        // the conflict is treated as already-applied, not an error.
        let inserted = sqlx::query(
            "INSERT INTO completed_items \
             (tracker_id, phase_id, section_id, line_item_id, completed_by, completed_at, notes) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) \
             ON CONFLICT (tracker_id, line_item_id) DO NOTHING",
        )
        .bind(tracker_id)
        .bind(current.phase_id)
        .bind(current.section_id)
        .bind(line_item_id)
        .bind(completed_by)
        .bind(now)
        .bind(notes)
        .execute(&mut *tx)
        .await?;
        if inserted.rows_affected() == 0 {
            debug!(
                tracker_id = %tracker_id,
                line_item_id = %line_item_id,
                "Completion record already present, applying as retry"
            );
        }

        // Timestamps refresh only for the levels the cursor actually entered;
        // on workflow completion everything clears with the pointers.
        let (phase_started_at, section_started_at, item_started_at) = match next.position {
            Some(_) => (
                if next.completed_phase {
                    Some(now)
                } else {
                    tracker.phase_started_at
                },
                if next.completed_section {
                    Some(now)
                } else {
                    tracker.section_started_at
                },
                Some(now),
            ),
            None => (None, None, None),
        };

        let updated = sqlx::query(
            "UPDATE trackers SET \
             current_phase_id = ?1, current_section_id = ?2, current_line_item_id = ?3, \
             phase_started_at = ?4, section_started_at = ?5, item_started_at = ?6, \
             last_completed_item_id = ?7 \
             WHERE id = ?8 AND current_line_item_id = ?9",
        )
        .bind(next.position.map(|p| p.phase_id))
        .bind(next.position.map(|p| p.section_id))
        .bind(next.position.map(|p| p.line_item_id))
        .bind(phase_started_at)
        .bind(section_started_at)
        .bind(item_started_at)
        .bind(line_item_id)
        .bind(tracker_id)
        .bind(line_item_id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            warn!(
                tracker_id = %tracker_id,
                line_item_id = %line_item_id,
                "Tracker advanced concurrently, aborting completion"
            );
            return Err(WorkflowError::StaleState {
                tracker_id: tracker_id.to_string(),
            });
        }

        let completion_row = sqlx::query(
            "SELECT id, tracker_id, phase_id, section_id, line_item_id, completed_by, completed_at, notes \
             FROM completed_items WHERE tracker_id = ?1 AND line_item_id = ?2",
        )
        .bind(tracker_id)
        .bind(line_item_id)
        .fetch_one(&mut *tx)
        .await?;
        let completion = completed_item_from_row(&completion_row);

        tx.commit().await?;

        let tracker = fetch_tracker(&self.pool, tracker_id).await?;
        info!(
            tracker_id = %tracker_id,
            line_item_id = %line_item_id,
            completed_by = %completed_by,
            completed_section = %next.completed_section,
            completed_phase = %next.completed_phase,
            is_complete = %next.is_complete,
            "Line item completed"
        );

        Ok(CompletionResult {
            tracker,
            completion,
            completed_section: next.completed_section,
            completed_phase: next.completed_phase,
            is_complete: next.is_complete,
        })
    }
}
