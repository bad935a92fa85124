//! Alert lifecycle: exactly one active alert tracks the cursor, moves on
//! completion, and disappears when the workflow finishes.

mod common;

use std::sync::Arc;

use chrono::Duration;
use common::{complete_current, harness, two_phase_spec, RecordingAlertSink};
use sitetrack::{AlertCoordinator, AlertStatus, Clock, PendingStep};

#[tokio::test]
async fn initialization_raises_the_alert_for_the_first_step() {
    let h = harness(&two_phase_spec()).await;
    h.service
        .initialize_workflow("proj-1", "roofing", true)
        .await
        .unwrap();

    let alerts = h.service.active_alerts("proj-1").await.unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].step_name, "Sign contract");
    assert_eq!(alerts[0].status, AlertStatus::Active);
    assert_eq!(h.sink.created.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn completion_resolves_the_old_alert_and_raises_the_new_one() {
    let h = harness(&two_phase_spec()).await;
    let tracker = h
        .service
        .initialize_workflow("proj-1", "roofing", true)
        .await
        .unwrap();

    complete_current(&h.service, &tracker.id).await;

    let alerts = h.service.active_alerts("proj-1").await.unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].step_name, "Collect deposit");
    assert_eq!(alerts[0].assigned_to, "accounting");

    let resolved = h.sink.resolved.lock().unwrap();
    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].step_name, "Sign contract");
    assert_eq!(resolved[0].status, AlertStatus::Resolved);
}

#[tokio::test]
async fn alert_due_date_honors_the_item_lead_time() {
    let h = harness(&two_phase_spec()).await;
    let tracker = h
        .service
        .initialize_workflow("proj-1", "roofing", true)
        .await
        .unwrap();

    // "Collect deposit" carries a three-day lead time.
    complete_current(&h.service, &tracker.id).await;

    let alerts = h.service.active_alerts("proj-1").await.unwrap();
    assert_eq!(alerts[0].due_at, h.clock.now() + Duration::days(3));
}

#[tokio::test]
async fn finishing_the_workflow_leaves_no_active_alerts() {
    let h = harness(&two_phase_spec()).await;
    let tracker = h
        .service
        .initialize_workflow("proj-1", "roofing", true)
        .await
        .unwrap();

    for _ in 0..3 {
        complete_current(&h.service, &tracker.id).await;
    }

    let alerts = h.service.active_alerts("proj-1").await.unwrap();
    assert!(alerts.is_empty());
    // Every created alert was eventually resolved.
    assert_eq!(
        h.sink.created.lock().unwrap().len(),
        h.sink.resolved.lock().unwrap().len()
    );
}

#[tokio::test]
async fn raising_twice_creates_only_one_active_alert() {
    let h = harness(&two_phase_spec()).await;
    let coordinator = AlertCoordinator::new(
        h.pool.clone(),
        h.clock.clone(),
        Arc::new(RecordingAlertSink::default()),
        1,
    );
    let step = PendingStep {
        step_name: "Sign contract".to_string(),
        assigned_to: "office".to_string(),
        lead_days: 2,
    };

    let first = coordinator.raise("proj-9", &step).await.unwrap();
    assert!(first.is_some());
    let second = coordinator.raise("proj-9", &step).await.unwrap();
    assert!(second.is_none());

    let alerts = coordinator.active_alerts("proj-9").await.unwrap();
    assert_eq!(alerts.len(), 1);
}

#[tokio::test]
async fn resolving_a_step_with_no_alert_is_a_quiet_no_op() {
    let h = harness(&two_phase_spec()).await;
    let coordinator = AlertCoordinator::new(
        h.pool.clone(),
        h.clock.clone(),
        Arc::new(RecordingAlertSink::default()),
        1,
    );

    let resolved = coordinator
        .resolve_step("proj-9", "Sign contract")
        .await
        .unwrap();
    assert!(resolved.is_empty());
}

#[tokio::test]
async fn zero_lead_time_falls_back_to_the_coordinator_default() {
    let h = harness(&two_phase_spec()).await;
    let coordinator = AlertCoordinator::new(
        h.pool.clone(),
        h.clock.clone(),
        Arc::new(RecordingAlertSink::default()),
        5,
    );
    let step = PendingStep {
        step_name: "Pull permits".to_string(),
        assigned_to: "office".to_string(),
        lead_days: 0,
    };

    let alert = coordinator.raise("proj-9", &step).await.unwrap().unwrap();
    assert_eq!(alert.due_at, h.clock.now() + Duration::days(5));
}
