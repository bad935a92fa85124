// Workflow tracker: the per-instance cursor over the catalog, and the
// completion recorder that is the only writer of its position pointers.

pub mod recorder;
pub mod types;

pub use recorder::CompletionRecorder;
pub use types::{CompletedItem, CompletionResult, Tracker};

pub(crate) use types::{fetch_tracker, tracker_from_row};
