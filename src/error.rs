use thiserror::Error;

/// Errors surfaced by the workflow core.
///
/// Alert and event fan-out failures are deliberately not represented here:
/// they are logged and swallowed after the completion transaction commits,
/// since alerts are derived state and re-derivable from the tracker.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Completion attempted on a line item that is not the tracker's current
    /// item. No mutation happened.
    #[error("line item {got} is not the active item for tracker {tracker_id} (active: {expected:?})")]
    InvalidTransition {
        tracker_id: String,
        expected: Option<i64>,
        got: i64,
    },

    #[error("{what} {id} not found")]
    NotFound { what: &'static str, id: String },

    /// A concurrent completion advanced the tracker first. The caller should
    /// re-fetch the current position and may retry.
    #[error("tracker {tracker_id} was advanced concurrently, re-fetch and retry")]
    StaleState { tracker_id: String },

    /// The catalog violates its ordering contract (duplicate display orders,
    /// orphaned rows). Fatal: ordering is undefined, so nothing is guessed.
    #[error("workflow catalog integrity violation: {0}")]
    CatalogIntegrity(String),

    /// Tracker row with partially-null position pointers. The pointers must
    /// be all set and mutually consistent, or all null.
    #[error("tracker {tracker_id} has inconsistent position pointers")]
    CorruptTracker { tracker_id: String },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}
