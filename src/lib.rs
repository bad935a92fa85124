// Sitetrack - Construction Workflow Progression Engine
// This exposes the core components for the (external) HTTP layer and tests

pub mod alerts;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod database;
pub mod error;
pub mod events;
pub mod observability;
pub mod overrides;
pub mod progression;
pub mod service;
pub mod status;
pub mod telemetry;
pub mod tracker;

// Re-export key types for easy access
pub use alerts::{Alert, AlertCoordinator, AlertSink, AlertStatus, LoggingAlertSink, PendingStep};
pub use catalog::{
    seed_catalog, CatalogSpec, LineItem, LineItemSpec, Phase, PhaseSpec, Position, Section,
    SectionSpec, WorkflowCatalog,
};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{config, init_config, SitetrackConfig};
pub use database::{init_database, shutdown_database, DatabaseManager};
pub use error::WorkflowError;
pub use events::{EventBus, EventSubscriber, LoggingSubscriber, WorkflowEvent};
pub use observability::{workflow_metrics, OperationTimer, WorkflowMetrics};
pub use overrides::{OverrideLedger, PhaseOverride};
pub use progression::{compute_next, NextPosition};
pub use service::WorkflowService;
pub use status::{StatusCalculator, WorkflowStatus};
pub use telemetry::{
    create_progression_span, generate_correlation_id, init_telemetry, shutdown_telemetry,
};
pub use tracker::{CompletedItem, CompletionRecorder, CompletionResult, Tracker};
