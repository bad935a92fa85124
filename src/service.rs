// Workflow service: the facade the (excluded) HTTP layer calls into.
// An explicit value constructed with injected dependencies, so tests swap
// the clock and the alert sink freely.

use std::sync::Arc;

use sqlx::SqlitePool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::alerts::{AlertCoordinator, AlertSink, LoggingAlertSink, PendingStep};
use crate::catalog::{Position, WorkflowCatalog};
use crate::clock::{Clock, SystemClock};
use crate::error::WorkflowError;
use crate::events::{EventBus, EventSubscriber, WorkflowEvent};
use crate::observability::{workflow_metrics, OperationTimer};
use crate::overrides::{OverrideLedger, PhaseOverride};
use crate::status::{StatusCalculator, WorkflowStatus};
use crate::tracker::types::TRACKER_COLUMNS;
use crate::tracker::{fetch_tracker, tracker_from_row, CompletionRecorder, CompletionResult, Tracker};

pub struct WorkflowService {
    pool: SqlitePool,
    catalog: Arc<WorkflowCatalog>,
    clock: Arc<dyn Clock>,
    recorder: CompletionRecorder,
    alerts: AlertCoordinator,
    overrides: OverrideLedger,
    status: StatusCalculator,
    events: EventBus,
}

impl WorkflowService {
    pub fn new(
        pool: SqlitePool,
        catalog: Arc<WorkflowCatalog>,
        clock: Arc<dyn Clock>,
        alert_sink: Arc<dyn AlertSink>,
        default_lead_days: i64,
    ) -> Self {
        let recorder = CompletionRecorder::new(pool.clone(), catalog.clone(), clock.clone());
        let alerts =
            AlertCoordinator::new(pool.clone(), clock.clone(), alert_sink, default_lead_days);
        let overrides = OverrideLedger::new(pool.clone(), clock.clone());
        let status = StatusCalculator::new(pool.clone(), catalog.clone());
        Self {
            pool,
            catalog,
            clock,
            recorder,
            alerts,
            overrides,
            status,
            events: EventBus::new(),
        }
    }

    /// Production wiring: system clock, logging alert sink, configured
    /// alert lead-time fallback.
    pub fn from_config(pool: SqlitePool, catalog: Arc<WorkflowCatalog>) -> anyhow::Result<Self> {
        let config = crate::config::config()?;
        Ok(Self::new(
            pool,
            catalog,
            Arc::new(SystemClock),
            Arc::new(LoggingAlertSink),
            config.alerts.default_lead_days,
        ))
    }

    pub fn subscribe(&mut self, subscriber: Arc<dyn EventSubscriber>) {
        self.events.subscribe(subscriber);
    }

    pub fn catalog(&self) -> &WorkflowCatalog {
        &self.catalog
    }

    /// Create a tracker positioned at the catalog's first phase/section/item
    /// and raise the alert for that first step. An empty catalog yields an
    /// already-complete tracker.
    pub async fn initialize_workflow(
        &self,
        project_id: &str,
        workflow_type: &str,
        is_main_workflow: bool,
    ) -> Result<Tracker, WorkflowError> {
        let first = self.catalog.first_position();
        let now = self.clock.now();
        let id = Uuid::new_v4().to_string();
        let started_at = first.map(|_| now);

        sqlx::query(
            "INSERT INTO trackers \
             (id, project_id, workflow_type, is_main_workflow, \
              current_phase_id, current_section_id, current_line_item_id, \
              phase_started_at, section_started_at, item_started_at, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        )
        .bind(&id)
        .bind(project_id)
        .bind(workflow_type)
        .bind(is_main_workflow)
        .bind(first.map(|p| p.phase_id))
        .bind(first.map(|p| p.section_id))
        .bind(first.map(|p| p.line_item_id))
        .bind(started_at)
        .bind(started_at)
        .bind(started_at)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let tracker = fetch_tracker(&self.pool, &id).await?;
        info!(
            tracker_id = %tracker.id,
            project_id = %project_id,
            workflow_type = %workflow_type,
            position = ?tracker.current,
            "Workflow initialized"
        );

        if let Some(step) = first.and_then(|p| self.pending_step(p.line_item_id)) {
            if let Err(e) = self.alerts.raise(project_id, &step).await {
                warn!(
                    tracker_id = %tracker.id,
                    error = %e,
                    "Failed to raise initial alert, tracker stands"
                );
            }
        }

        Ok(tracker)
    }

    /// Complete the tracker's current line item and advance the cursor.
    /// Alert movement and event fan-out run after the commit and never roll
    /// the progression back.
    pub async fn complete_line_item(
        &self,
        tracker_id: &str,
        line_item_id: i64,
        completed_by: &str,
        notes: Option<&str>,
    ) -> Result<CompletionResult, WorkflowError> {
        let timer = OperationTimer::new("complete_line_item");
        let result = match self
            .recorder
            .complete(tracker_id, line_item_id, completed_by, notes)
            .await
        {
            Ok(result) => result,
            Err(e) => {
                match &e {
                    WorkflowError::InvalidTransition { .. } => {
                        workflow_metrics().record_invalid_transition()
                    }
                    WorkflowError::StaleState { .. } => workflow_metrics().record_stale_conflict(),
                    _ => {}
                }
                return Err(e);
            }
        };
        workflow_metrics().record_completion();

        let completed_step = self
            .catalog
            .step_name(line_item_id)
            .unwrap_or_default()
            .to_string();
        let next_step = result
            .tracker
            .current
            .and_then(|p| self.pending_step(p.line_item_id));
        if let Err(e) = self
            .alerts
            .advance(&result.tracker.project_id, &completed_step, next_step.as_ref())
            .await
        {
            warn!(
                tracker_id = %tracker_id,
                error = %e,
                "Alert coordination failed, progression stands"
            );
        }

        self.events.publish(&self.completion_events(&result, &completed_step)).await;
        timer.finish();
        Ok(result)
    }

    /// Tracker's current phase/section/item, or None when complete.
    pub async fn get_current_position(
        &self,
        tracker_id: &str,
    ) -> Result<Option<Position>, WorkflowError> {
        let tracker = fetch_tracker(&self.pool, tracker_id).await?;
        Ok(tracker.current)
    }

    pub async fn get_tracker(&self, tracker_id: &str) -> Result<Tracker, WorkflowError> {
        fetch_tracker(&self.pool, tracker_id).await
    }

    /// All trackers for a project, main workflow first.
    pub async fn trackers_for_project(
        &self,
        project_id: &str,
    ) -> Result<Vec<Tracker>, WorkflowError> {
        let sql = format!(
            "SELECT {TRACKER_COLUMNS} FROM trackers WHERE project_id = ?1 \
             ORDER BY is_main_workflow DESC, created_at"
        );
        let rows = sqlx::query(&sql)
            .bind(project_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(tracker_from_row).collect()
    }

    pub async fn get_status(&self, tracker_id: &str) -> Result<WorkflowStatus, WorkflowError> {
        self.status.get_status(tracker_id).await
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn record_override(
        &self,
        project_id: &str,
        from_phase_id: i64,
        to_phase_id: i64,
        skipped_phase_ids: &[i64],
        reason: &str,
        created_by: &str,
    ) -> Result<PhaseOverride, WorkflowError> {
        self.overrides
            .record_override(
                project_id,
                from_phase_id,
                to_phase_id,
                skipped_phase_ids,
                reason,
                created_by,
            )
            .await
    }

    pub async fn get_active_override(
        &self,
        project_id: &str,
    ) -> Result<Option<PhaseOverride>, WorkflowError> {
        self.overrides.get_active_override(project_id).await
    }

    pub async fn override_history(
        &self,
        project_id: &str,
    ) -> Result<Vec<PhaseOverride>, WorkflowError> {
        self.overrides.history(project_id).await
    }

    pub async fn active_alerts(
        &self,
        project_id: &str,
    ) -> Result<Vec<crate::alerts::Alert>, WorkflowError> {
        self.alerts.active_alerts(project_id).await
    }

    fn pending_step(&self, line_item_id: i64) -> Option<PendingStep> {
        self.catalog.line_item(line_item_id).map(|item| PendingStep {
            step_name: item.name.clone(),
            assigned_to: item.responsible_role.clone(),
            lead_days: item.alert_lead_days,
        })
    }

    fn completion_events(
        &self,
        result: &CompletionResult,
        completed_step: &str,
    ) -> Vec<WorkflowEvent> {
        let tracker_id = result.tracker.id.clone();
        let project_id = result.tracker.project_id.clone();
        let mut events = vec![WorkflowEvent::ItemCompleted {
            tracker_id: tracker_id.clone(),
            project_id: project_id.clone(),
            line_item_id: result.completion.line_item_id,
            step_name: completed_step.to_string(),
        }];
        if result.completed_section {
            events.push(WorkflowEvent::SectionCompleted {
                tracker_id: tracker_id.clone(),
                project_id: project_id.clone(),
                section_id: result.completion.section_id,
            });
        }
        if result.completed_phase {
            events.push(WorkflowEvent::PhaseCompleted {
                tracker_id: tracker_id.clone(),
                project_id: project_id.clone(),
                phase_id: result.completion.phase_id,
            });
        }
        if result.is_complete {
            events.push(WorkflowEvent::WorkflowCompleted {
                tracker_id,
                project_id,
            });
        }
        events
    }
}
