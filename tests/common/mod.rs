// Shared test harness: in-memory store, pinned clock, recording fakes.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use sitetrack::{
    seed_catalog, Alert, AlertSink, CatalogSpec, CompletionResult, DatabaseManager, EventSubscriber,
    FixedClock, LineItemSpec, PhaseSpec, SectionSpec, WorkflowCatalog, WorkflowEvent,
    WorkflowService,
};
use sqlx::SqlitePool;

/// Alert sink that records every callback for assertions.
#[derive(Debug, Default)]
pub struct RecordingAlertSink {
    pub created: Mutex<Vec<Alert>>,
    pub resolved: Mutex<Vec<Alert>>,
}

#[async_trait]
impl AlertSink for RecordingAlertSink {
    async fn on_alert_created(&self, alert: &Alert) {
        self.created.lock().unwrap().push(alert.clone());
    }

    async fn on_alert_resolved(&self, alert: &Alert) {
        self.resolved.lock().unwrap().push(alert.clone());
    }
}

/// Event subscriber that records everything it sees.
#[derive(Debug, Default)]
pub struct RecordingSubscriber {
    pub events: Mutex<Vec<WorkflowEvent>>,
}

#[async_trait]
impl EventSubscriber for RecordingSubscriber {
    async fn on_event(&self, event: &WorkflowEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

pub struct TestHarness {
    pub service: WorkflowService,
    pub pool: SqlitePool,
    pub clock: Arc<FixedClock>,
    pub sink: Arc<RecordingAlertSink>,
    pub subscriber: Arc<RecordingSubscriber>,
}

pub async fn harness(spec: &CatalogSpec) -> TestHarness {
    let db = DatabaseManager::in_memory().await.expect("in-memory db");
    let pool = db.pool().clone();
    seed_catalog(&pool, spec).await.expect("seed catalog");
    let catalog = Arc::new(WorkflowCatalog::load(&pool).await.expect("load catalog"));

    let clock = Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2025, 6, 2, 8, 0, 0).unwrap(),
    ));
    let sink = Arc::new(RecordingAlertSink::default());
    let subscriber = Arc::new(RecordingSubscriber::default());

    let mut service = WorkflowService::new(
        pool.clone(),
        catalog,
        clock.clone(),
        sink.clone(),
        1,
    );
    service.subscribe(subscriber.clone());

    TestHarness {
        service,
        pool,
        clock,
        sink,
        subscriber,
    }
}

/// The spec's end-to-end shape: P1 (S1: A, B), P2 (S2: C).
pub fn two_phase_spec() -> CatalogSpec {
    CatalogSpec::from_toml_str(
        r#"
        [[phases]]
        name = "Pre-Construction"
        display_order = 10

        [[phases.sections]]
        name = "Contract"
        display_order = 10

        [[phases.sections.items]]
        name = "Sign contract"
        display_order = 10

        [[phases.sections.items]]
        name = "Collect deposit"
        display_order = 20
        responsible_role = "accounting"
        alert_lead_days = 3

        [[phases]]
        name = "Execution"
        display_order = 20

        [[phases.sections]]
        name = "Closeout"
        display_order = 10

        [[phases.sections.items]]
        name = "Final walkthrough"
        display_order = 10
        responsible_role = "field"
        "#,
    )
    .expect("valid spec")
}

/// P1 (S1: two items, S2: one item), P2 (S3: one item): exercises a plain
/// section boundary separately from a phase boundary.
pub fn boundary_spec() -> CatalogSpec {
    CatalogSpec::from_toml_str(
        r#"
        [[phases]]
        name = "Prospect"
        display_order = 10

        [[phases.sections]]
        name = "Site Inspection"
        display_order = 10

        [[phases.sections.items]]
        name = "Schedule inspection"
        display_order = 10

        [[phases.sections.items]]
        name = "Complete inspection"
        display_order = 20

        [[phases.sections]]
        name = "Estimate"
        display_order = 20

        [[phases.sections.items]]
        name = "Write estimate"
        display_order = 10

        [[phases]]
        name = "Approved"
        display_order = 20

        [[phases.sections]]
        name = "Permitting"
        display_order = 10

        [[phases.sections.items]]
        name = "Pull permits"
        display_order = 10
        "#,
    )
    .expect("valid spec")
}

/// `phase_count` phases, one section each, `items_per_phase` items per section.
pub fn wide_spec(phase_count: i64, items_per_phase: i64) -> CatalogSpec {
    let phases = (1..=phase_count)
        .map(|p| PhaseSpec {
            name: format!("Phase {p}"),
            display_order: p * 10,
            responsible_role: "office".to_string(),
            sections: vec![SectionSpec {
                name: format!("Section {p}"),
                display_order: 10,
                responsible_role: "office".to_string(),
                items: (1..=items_per_phase)
                    .map(|i| LineItemSpec {
                        name: format!("Item {p}.{i}"),
                        display_order: i * 10,
                        responsible_role: "field".to_string(),
                        alert_lead_days: 1,
                        is_active: true,
                    })
                    .collect(),
            }],
        })
        .collect();
    CatalogSpec { phases }
}

/// Complete whatever item the tracker currently points at.
pub async fn complete_current(service: &WorkflowService, tracker_id: &str) -> CompletionResult {
    let position = service
        .get_current_position(tracker_id)
        .await
        .expect("tracker exists")
        .expect("tracker has an active item");
    service
        .complete_line_item(tracker_id, position.line_item_id, "tester", None)
        .await
        .expect("completion succeeds")
}

pub async fn line_item_id_by_name(pool: &SqlitePool, name: &str) -> i64 {
    sqlx::query_scalar::<_, i64>("SELECT id FROM line_items WHERE name = ?1")
        .bind(name)
        .fetch_one(pool)
        .await
        .expect("line item exists")
}

pub async fn phase_id_by_name(pool: &SqlitePool, name: &str) -> i64 {
    sqlx::query_scalar::<_, i64>("SELECT id FROM phases WHERE name = ?1")
        .bind(name)
        .fetch_one(pool)
        .await
        .expect("phase exists")
}
