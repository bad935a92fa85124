// Alert coordinator: keeps the single "next action" alert in step with a
// tracker's position. Alerts are derived state, written outside the
// completion transaction; everything here is idempotent and re-derivable.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};

use crate::clock::Clock;
use crate::error::WorkflowError;
use crate::observability::workflow_metrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Active,
    Resolved,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Active => "active",
            AlertStatus::Resolved => "resolved",
        }
    }

    fn parse(s: &str) -> Self {
        match s {
            "resolved" => AlertStatus::Resolved,
            _ => AlertStatus::Active,
        }
    }
}

/// Human-facing notification for the tracker's current pending step.
/// Keyed by `(project_id, step_name)`; never edited by users directly.
#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub id: i64,
    pub project_id: String,
    pub step_name: String,
    pub status: AlertStatus,
    pub assigned_to: String,
    pub due_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

/// Callbacks consumed by the (excluded) notification layer. Implementations
/// must tolerate being called more than once for the same alert.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn on_alert_created(&self, alert: &Alert);
    async fn on_alert_resolved(&self, alert: &Alert);
}

/// Default sink: structured log lines only.
#[derive(Debug, Default)]
pub struct LoggingAlertSink;

#[async_trait]
impl AlertSink for LoggingAlertSink {
    async fn on_alert_created(&self, alert: &Alert) {
        info!(
            project_id = %alert.project_id,
            step_name = %alert.step_name,
            assigned_to = %alert.assigned_to,
            due_at = %alert.due_at,
            "Alert created"
        );
    }

    async fn on_alert_resolved(&self, alert: &Alert) {
        info!(
            project_id = %alert.project_id,
            step_name = %alert.step_name,
            "Alert resolved"
        );
    }
}

/// The step the cursor landed on, as the coordinator needs to see it.
#[derive(Debug, Clone)]
pub struct PendingStep {
    pub step_name: String,
    pub assigned_to: String,
    pub lead_days: i64,
}

pub struct AlertCoordinator {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn AlertSink>,
    default_lead_days: i64,
}

impl AlertCoordinator {
    pub fn new(
        pool: SqlitePool,
        clock: Arc<dyn Clock>,
        sink: Arc<dyn AlertSink>,
        default_lead_days: i64,
    ) -> Self {
        Self {
            pool,
            clock,
            sink,
            default_lead_days,
        }
    }

    /// Move the project's alert from the just-completed step to the new one.
    /// `next` is None when the workflow finished; no alert is raised then.
    pub async fn advance(
        &self,
        project_id: &str,
        completed_step: &str,
        next: Option<&PendingStep>,
    ) -> Result<(), WorkflowError> {
        self.resolve_step(project_id, completed_step).await?;
        if let Some(step) = next {
            self.raise(project_id, step).await?;
        }
        Ok(())
    }

    /// Mark every still-active alert for `(project, step)` resolved.
    /// Resolving zero alerts is not an error.
    pub async fn resolve_step(
        &self,
        project_id: &str,
        step_name: &str,
    ) -> Result<Vec<Alert>, WorkflowError> {
        let rows = sqlx::query(
            "SELECT id, project_id, step_name, status, assigned_to, due_at, created_at, resolved_at \
             FROM alerts WHERE project_id = ?1 AND step_name = ?2 AND status = 'active'",
        )
        .bind(project_id)
        .bind(step_name)
        .fetch_all(&self.pool)
        .await?;

        if rows.is_empty() {
            debug!(
                project_id = %project_id,
                step_name = %step_name,
                "No active alert to resolve"
            );
            return Ok(Vec::new());
        }

        let resolved_at = self.clock.now();
        sqlx::query(
            "UPDATE alerts SET status = 'resolved', resolved_at = ?1 \
             WHERE project_id = ?2 AND step_name = ?3 AND status = 'active'",
        )
        .bind(resolved_at)
        .bind(project_id)
        .bind(step_name)
        .execute(&self.pool)
        .await?;

        let mut resolved = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut alert = alert_from_row(row);
            alert.status = AlertStatus::Resolved;
            alert.resolved_at = Some(resolved_at);
            workflow_metrics().record_alert_resolved();
            self.sink.on_alert_resolved(&alert).await;
            resolved.push(alert);
        }
        Ok(resolved)
    }

    /// Create the alert for a pending step unless an active one already
    /// exists. The existence check makes retries idempotent.
    pub async fn raise(
        &self,
        project_id: &str,
        step: &PendingStep,
    ) -> Result<Option<Alert>, WorkflowError> {
        let existing = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM alerts \
             WHERE project_id = ?1 AND step_name = ?2 AND status = 'active'",
        )
        .bind(project_id)
        .bind(&step.step_name)
        .fetch_one(&self.pool)
        .await?;
        if existing > 0 {
            debug!(
                project_id = %project_id,
                step_name = %step.step_name,
                "Active alert already exists, not raising another"
            );
            return Ok(None);
        }

        let now = self.clock.now();
        let lead_days = if step.lead_days > 0 {
            step.lead_days
        } else {
            self.default_lead_days
        };
        let due_at = now + Duration::days(lead_days);

        let id = sqlx::query(
            "INSERT INTO alerts (project_id, step_name, status, assigned_to, due_at, created_at) \
             VALUES (?1, ?2, 'active', ?3, ?4, ?5)",
        )
        .bind(project_id)
        .bind(&step.step_name)
        .bind(&step.assigned_to)
        .bind(due_at)
        .bind(now)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        let alert = Alert {
            id,
            project_id: project_id.to_string(),
            step_name: step.step_name.clone(),
            status: AlertStatus::Active,
            assigned_to: step.assigned_to.clone(),
            due_at,
            created_at: now,
            resolved_at: None,
        };
        workflow_metrics().record_alert_created();
        self.sink.on_alert_created(&alert).await;
        Ok(Some(alert))
    }

    /// All active alerts for a project, soonest due first.
    pub async fn active_alerts(&self, project_id: &str) -> Result<Vec<Alert>, WorkflowError> {
        let rows = sqlx::query(
            "SELECT id, project_id, step_name, status, assigned_to, due_at, created_at, resolved_at \
             FROM alerts WHERE project_id = ?1 AND status = 'active' ORDER BY due_at",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(alert_from_row).collect())
    }
}

fn alert_from_row(row: &SqliteRow) -> Alert {
    let status: String = row.get("status");
    Alert {
        id: row.get("id"),
        project_id: row.get("project_id"),
        step_name: row.get("step_name"),
        status: AlertStatus::parse(&status),
        assigned_to: row.get("assigned_to"),
        due_at: row.get("due_at"),
        created_at: row.get("created_at"),
        resolved_at: row.get("resolved_at"),
    }
}
