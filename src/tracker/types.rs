use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::catalog::Position;
use crate::error::WorkflowError;

/// Cursor for one workflow instance of one project. A project may carry
/// several trackers (one per trade); they progress independently.
///
/// Invariant: `current` is Some with mutually consistent ids, or None when
/// the workflow is complete. Only the completion recorder writes it.
#[derive(Debug, Clone, PartialEq)]
pub struct Tracker {
    pub id: String,
    pub project_id: String,
    pub workflow_type: String,
    pub is_main_workflow: bool,
    pub current: Option<Position>,
    pub phase_started_at: Option<DateTime<Utc>>,
    pub section_started_at: Option<DateTime<Utc>>,
    pub item_started_at: Option<DateTime<Utc>>,
    pub last_completed_item_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl Tracker {
    pub fn is_complete(&self) -> bool {
        self.current.is_none()
    }
}

/// Append-only record that a line item was finished for a tracker.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedItem {
    pub id: i64,
    pub tracker_id: String,
    pub phase_id: i64,
    pub section_id: i64,
    pub line_item_id: i64,
    pub completed_by: String,
    pub completed_at: DateTime<Utc>,
    pub notes: Option<String>,
}

/// Outcome of a successful completion. The boundary flags mirror the
/// progression engine's output and exist for observability; subsequent calls
/// never depend on them.
#[derive(Debug, Clone)]
pub struct CompletionResult {
    pub tracker: Tracker,
    pub completion: CompletedItem,
    pub completed_section: bool,
    pub completed_phase: bool,
    pub is_complete: bool,
}

pub(crate) const TRACKER_COLUMNS: &str = "id, project_id, workflow_type, is_main_workflow, \
     current_phase_id, current_section_id, current_line_item_id, \
     phase_started_at, section_started_at, item_started_at, \
     last_completed_item_id, created_at";

pub(crate) fn tracker_from_row(row: &SqliteRow) -> Result<Tracker, WorkflowError> {
    let id: String = row.get("id");
    let phase_id: Option<i64> = row.get("current_phase_id");
    let section_id: Option<i64> = row.get("current_section_id");
    let line_item_id: Option<i64> = row.get("current_line_item_id");

    let current = match (phase_id, section_id, line_item_id) {
        (Some(phase_id), Some(section_id), Some(line_item_id)) => Some(Position {
            phase_id,
            section_id,
            line_item_id,
        }),
        (None, None, None) => None,
        _ => return Err(WorkflowError::CorruptTracker { tracker_id: id }),
    };

    Ok(Tracker {
        project_id: row.get("project_id"),
        workflow_type: row.get("workflow_type"),
        is_main_workflow: row.get("is_main_workflow"),
        current,
        phase_started_at: row.get("phase_started_at"),
        section_started_at: row.get("section_started_at"),
        item_started_at: row.get("item_started_at"),
        last_completed_item_id: row.get("last_completed_item_id"),
        created_at: row.get("created_at"),
        id,
    })
}

pub(crate) fn completed_item_from_row(row: &SqliteRow) -> CompletedItem {
    CompletedItem {
        id: row.get("id"),
        tracker_id: row.get("tracker_id"),
        phase_id: row.get("phase_id"),
        section_id: row.get("section_id"),
        line_item_id: row.get("line_item_id"),
        completed_by: row.get("completed_by"),
        completed_at: row.get("completed_at"),
        notes: row.get("notes"),
    }
}

pub(crate) async fn fetch_tracker<'e, E>(
    executor: E,
    tracker_id: &str,
) -> Result<Tracker, WorkflowError>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    let sql = format!("SELECT {TRACKER_COLUMNS} FROM trackers WHERE id = ?1");
    let row = sqlx::query(&sql)
        .bind(tracker_id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| WorkflowError::NotFound {
            what: "tracker",
            id: tracker_id.to_string(),
        })?;

    tracker_from_row(&row)
}
