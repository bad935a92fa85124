use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

/// Initialize structured logging for the workflow engine.
/// JSON output with span context so completions can be correlated with the
/// derived alert and event activity they trigger.
pub fn init_telemetry() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(true),
        )
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("sitetrack telemetry initialized with structured logging");
    Ok(())
}

/// Generate a correlation ID for linking a completion to its derived effects.
pub fn generate_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

/// Create a span with common workflow progression attributes.
pub fn create_progression_span(
    operation: &str,
    tracker_id: Option<&str>,
    line_item_id: Option<i64>,
    correlation_id: Option<&str>,
) -> tracing::Span {
    tracing::info_span!(
        "workflow_progression",
        operation = operation,
        tracker.id = tracker_id,
        line_item.id = line_item_id,
        correlation.id = correlation_id,
    )
}

/// Shutdown telemetry gracefully.
pub fn shutdown_telemetry() {
    tracing::info!("sitetrack telemetry shutdown complete");
}
