// Domain events published after a completion transaction commits. Transport
// fan-out (sockets, email) lives with subscribers outside the core.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// Events emitted by a single completion. A section/phase/workflow boundary
/// emits the corresponding extra events alongside `ItemCompleted`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum WorkflowEvent {
    ItemCompleted {
        tracker_id: String,
        project_id: String,
        line_item_id: i64,
        step_name: String,
    },
    SectionCompleted {
        tracker_id: String,
        project_id: String,
        section_id: i64,
    },
    PhaseCompleted {
        tracker_id: String,
        project_id: String,
        phase_id: i64,
    },
    WorkflowCompleted {
        tracker_id: String,
        project_id: String,
    },
}

#[async_trait]
pub trait EventSubscriber: Send + Sync {
    async fn on_event(&self, event: &WorkflowEvent);
}

/// Default subscriber: structured log lines only.
#[derive(Debug, Default)]
pub struct LoggingSubscriber;

#[async_trait]
impl EventSubscriber for LoggingSubscriber {
    async fn on_event(&self, event: &WorkflowEvent) {
        info!(event = ?event, "Workflow event");
    }
}

/// Post-commit fan-out to registered subscribers, in registration order.
#[derive(Default)]
pub struct EventBus {
    subscribers: Vec<Arc<dyn EventSubscriber>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, subscriber: Arc<dyn EventSubscriber>) {
        self.subscribers.push(subscriber);
    }

    pub async fn publish(&self, events: &[WorkflowEvent]) {
        for event in events {
            for subscriber in &self.subscribers {
                subscriber.on_event(event).await;
            }
        }
    }
}
