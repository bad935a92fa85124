use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Workflow engine counters.
#[derive(Debug, Default)]
pub struct WorkflowMetrics {
    pub completions: AtomicU64,
    pub invalid_transitions: AtomicU64,
    pub stale_conflicts: AtomicU64,
    pub alerts_created: AtomicU64,
    pub alerts_resolved: AtomicU64,
    pub overrides_recorded: AtomicU64,
}

impl WorkflowMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_completion(&self) {
        self.completions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_invalid_transition(&self) {
        self.invalid_transitions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stale_conflict(&self) {
        self.stale_conflicts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_alert_created(&self) {
        self.alerts_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_alert_resolved(&self) {
        self.alerts_resolved.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_override(&self) {
        self.overrides_recorded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_stats(&self) -> WorkflowStats {
        WorkflowStats {
            completions: self.completions.load(Ordering::Relaxed),
            invalid_transitions: self.invalid_transitions.load(Ordering::Relaxed),
            stale_conflicts: self.stale_conflicts.load(Ordering::Relaxed),
            alerts_created: self.alerts_created.load(Ordering::Relaxed),
            alerts_resolved: self.alerts_resolved.load(Ordering::Relaxed),
            overrides_recorded: self.overrides_recorded.load(Ordering::Relaxed),
        }
    }

    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            "Workflow metrics: completions={}, invalid_transitions={}, stale_conflicts={}, alerts_created={}, alerts_resolved={}, overrides={}",
            stats.completions,
            stats.invalid_transitions,
            stats.stale_conflicts,
            stats.alerts_created,
            stats.alerts_resolved,
            stats.overrides_recorded
        );
    }
}

#[derive(Debug, Clone)]
pub struct WorkflowStats {
    pub completions: u64,
    pub invalid_transitions: u64,
    pub stale_conflicts: u64,
    pub alerts_created: u64,
    pub alerts_resolved: u64,
    pub overrides_recorded: u64,
}

/// Global metrics instance
static WORKFLOW_METRICS: std::sync::LazyLock<WorkflowMetrics> =
    std::sync::LazyLock::new(WorkflowMetrics::new);

pub fn workflow_metrics() -> &'static WorkflowMetrics {
    &WORKFLOW_METRICS
}

/// Time an operation and log its duration on finish.
pub struct OperationTimer {
    operation: String,
    start: Instant,
}

impl OperationTimer {
    pub fn new(operation: &str) -> Self {
        Self {
            operation: operation.to_string(),
            start: Instant::now(),
        }
    }

    pub fn finish(self) {
        let duration = self.start.elapsed();
        info!(
            operation = %self.operation,
            duration_ms = duration.as_millis(),
            "Operation completed"
        );
    }
}
