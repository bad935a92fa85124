// Status calculator: progress accounting over the completion log, the
// active override, and the immutable catalog totals.

use std::sync::Arc;

use serde::Serialize;
use sqlx::SqlitePool;

use crate::catalog::WorkflowCatalog;
use crate::error::WorkflowError;
use crate::overrides::override_from_row;
use crate::tracker::fetch_tracker;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkflowStatus {
    pub completed_items: u64,
    pub skipped_items: u64,
    pub adjusted_completed_items: u64,
    pub total_items: u64,
    pub progress_percent: u32,
    pub is_complete: bool,
}

pub struct StatusCalculator {
    pool: SqlitePool,
    catalog: Arc<WorkflowCatalog>,
}

impl StatusCalculator {
    pub fn new(pool: SqlitePool, catalog: Arc<WorkflowCatalog>) -> Self {
        Self { pool, catalog }
    }

    /// Progress snapshot for one tracker. The tracker row, completion count,
    /// and active override are read inside one transaction so a concurrent
    /// completion cannot tear the numbers.
    pub async fn get_status(&self, tracker_id: &str) -> Result<WorkflowStatus, WorkflowError> {
        let mut tx = self.pool.begin().await?;

        let tracker = fetch_tracker(&mut *tx, tracker_id).await?;

        let completed_items = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM completed_items WHERE tracker_id = ?1",
        )
        .bind(tracker_id)
        .fetch_one(&mut *tx)
        .await? as u64;

        let override_row = sqlx::query(
            "SELECT id, project_id, from_phase_id, to_phase_id, skipped_phase_ids, reason, \
             created_by, created_at, is_active \
             FROM phase_overrides WHERE project_id = ?1 AND is_active = 1",
        )
        .bind(&tracker.project_id)
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await?;

        let skipped_items = match override_row {
            Some(row) => {
                let active = override_from_row(&row)?;
                self.catalog.active_items_in_phases(&active.skipped_phase_ids)
            }
            None => 0,
        };

        let adjusted_completed_items = completed_items + skipped_items;
        let total_items = self.catalog.total_active_items();

        Ok(WorkflowStatus {
            completed_items,
            skipped_items,
            adjusted_completed_items,
            total_items,
            progress_percent: progress_percent(adjusted_completed_items, total_items),
            is_complete: tracker.is_complete(),
        })
    }
}

/// `round(100 * adjusted / total)`, defined as 0 for an empty catalog.
fn progress_percent(adjusted: u64, total: u64) -> u32 {
    if total == 0 {
        return 0;
    }
    ((100.0 * adjusted as f64) / total as f64).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_percent_rounds_to_nearest() {
        assert_eq!(progress_percent(15, 40), 38); // 37.5 rounds up
        assert_eq!(progress_percent(1, 3), 33);
        assert_eq!(progress_percent(2, 3), 67);
        assert_eq!(progress_percent(40, 40), 100);
        assert_eq!(progress_percent(0, 40), 0);
    }

    #[test]
    fn test_progress_percent_of_empty_catalog_is_zero() {
        assert_eq!(progress_percent(0, 0), 0);
        assert_eq!(progress_percent(5, 0), 0);
    }
}
