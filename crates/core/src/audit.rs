use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditCategory {
    Run,
    Generation,
    Validation,
    Delivery,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditPhase {
    Started,
    Completed,
    Failed,
    RetryScheduled,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_id: String,
    pub run_id: String,
    pub event_type: String,
    pub category: AuditCategory,
    pub phase: AuditPhase,
    pub attempt: Option<u32>,
    pub metadata: BTreeMap<String, String>,
    pub occurred_at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(
        run_id: impl Into<String>,
        event_type: impl Into<String>,
        category: AuditCategory,
        phase: AuditPhase,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            run_id: run_id.into(),
            event_type: event_type.into(),
            category,
            phase,
            attempt: None,
            metadata: BTreeMap::new(),
            occurred_at: Utc::now(),
        }
    }

    pub fn with_attempt(mut self, attempt: u32) -> Self {
        self.attempt = Some(attempt);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

pub trait AuditSink: Send + Sync {
    fn emit(&self, event: AuditEvent);
}

/// Discards events; runs still log through `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn emit(&self, _event: AuditEvent) {}
}

#[derive(Clone, Default)]
pub struct InMemoryAuditSink {
    events: Arc<Mutex<Vec<AuditEvent>>>,
}

impl InMemoryAuditSink {
    pub fn events(&self) -> Vec<AuditEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn count(&self, category: AuditCategory, phase: AuditPhase) -> usize {
        self.events()
            .iter()
            .filter(|event| event.category == category && event.phase == phase)
            .count()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn emit(&self, event: AuditEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::audit::{AuditCategory, AuditEvent, AuditPhase, AuditSink, InMemoryAuditSink};

    #[test]
    fn in_memory_sink_records_events_with_run_fields() {
        let sink = InMemoryAuditSink::default();
        sink.emit(
            AuditEvent::new(
                "run-123",
                "step.generation.retry_scheduled",
                AuditCategory::Generation,
                AuditPhase::RetryScheduled,
            )
            .with_attempt(1)
            .with_metadata("error_kind", "generation.timeout"),
        );

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].run_id, "run-123");
        assert_eq!(events[0].attempt, Some(1));
        assert_eq!(
            events[0].metadata.get("error_kind").map(String::as_str),
            Some("generation.timeout")
        );
        assert_eq!(sink.count(AuditCategory::Generation, AuditPhase::RetryScheduled), 1);
        assert_eq!(sink.count(AuditCategory::Delivery, AuditPhase::RetryScheduled), 0);
    }

    #[test]
    fn events_serialize_with_snake_case_enums() {
        let event = AuditEvent::new(
            "run-9",
            "run.step.retry_scheduled",
            AuditCategory::Run,
            AuditPhase::RetryScheduled,
        );
        let json = serde_json::to_value(&event).expect("event should serialize");

        assert_eq!(json["category"], "run");
        assert_eq!(json["phase"], "retry_scheduled");
        assert_eq!(json["attempt"], serde_json::Value::Null);
        assert!(json["event_id"].as_str().is_some_and(|id| !id.is_empty()));
    }
}
