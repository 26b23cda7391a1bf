//! Operation instrumentation.
//!
//! Every externally-facing feature operation reports one event after it
//! completes. Instrumenters are fire-and-forget: they return nothing
//! and their failures never surface into the operation's result.

use crate::gate::GateName;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::sync::Mutex;
use uuid::Uuid;

/// Event name reported for every feature operation. Kept literal for
/// wire compatibility with flipper-ecosystem telemetry consumers.
pub const FEATURE_OPERATION: &str = "feature_operation.flipper";

/// The reported operation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Enabled,
    Enable,
    Disable,
    Clear,
    Add,
    Remove,
    Exists,
    State,
}

impl Operation {
    /// Snake-case operation name used in payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Enabled => "enabled?",
            Operation::Enable => "enable",
            Operation::Disable => "disable",
            Operation::Clear => "clear",
            Operation::Add => "add",
            Operation::Remove => "remove",
            Operation::Exists => "exists?",
            Operation::State => "state",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Operation {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// One recorded feature operation.
#[derive(Debug, Clone, Serialize)]
pub struct OperationEvent {
    /// Unique event id.
    pub id: Uuid,

    /// When the operation completed.
    pub timestamp: DateTime<Utc>,

    /// Feature the operation ran against.
    pub feature_name: String,

    /// What ran.
    pub operation: Operation,

    /// The operation's return value.
    pub result: Value,

    /// Gate a mutation routed to, when applicable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gate_name: Option<GateName>,

    /// Mutation input, when applicable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thing: Option<Value>,

    /// Actor ids a check ran against, when applicable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actors: Option<Vec<String>>,
}

impl OperationEvent {
    /// Build an event for a completed operation.
    pub fn new(feature_name: impl Into<String>, operation: Operation, result: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            feature_name: feature_name.into(),
            operation,
            result,
            gate_name: None,
            thing: None,
            actors: None,
        }
    }

    /// Attach the gate a mutation routed to.
    pub fn with_gate(mut self, gate: GateName) -> Self {
        self.gate_name = Some(gate);
        self
    }

    /// Attach the mutation input.
    pub fn with_thing(mut self, thing: Value) -> Self {
        self.thing = Some(thing);
        self
    }

    /// Attach the actor ids a check ran against.
    pub fn with_actors(mut self, actors: Vec<String>) -> Self {
        self.actors = Some(actors);
        self
    }

    /// The event name every operation reports under.
    pub fn event_name(&self) -> &'static str {
        FEATURE_OPERATION
    }
}

/// Fire-and-forget event sink.
///
/// Must accept concurrent calls. A sink has no way to fail the
/// operation it observes; anything that can go wrong stays inside the
/// implementation.
pub trait Instrumenter: Send + Sync {
    /// Record one event.
    fn instrument(&self, event: OperationEvent);
}

/// Discards every event. The default sink.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopInstrumenter;

impl Instrumenter for NoopInstrumenter {
    fn instrument(&self, _event: OperationEvent) {}
}

/// Captures events in order. The test double for event assertions.
#[derive(Debug, Default)]
pub struct MemoryInstrumenter {
    events: Mutex<Vec<OperationEvent>>,
}

impl MemoryInstrumenter {
    /// Empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every recorded event, oldest first.
    pub fn events(&self) -> Vec<OperationEvent> {
        self.lock().clone()
    }

    /// The most recent event, if any.
    pub fn last(&self) -> Option<OperationEvent> {
        self.lock().last().cloned()
    }

    /// How many events were recorded.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<OperationEvent>> {
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Instrumenter for MemoryInstrumenter {
    fn instrument(&self, event: OperationEvent) {
        self.lock().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_name_is_literal() {
        let event = OperationEvent::new("search", Operation::Enable, json!(true));
        assert_eq!(event.event_name(), "feature_operation.flipper");
    }

    #[test]
    fn test_memory_instrumenter_records_in_order() {
        let instrumenter = MemoryInstrumenter::new();
        assert!(instrumenter.is_empty());

        instrumenter.instrument(OperationEvent::new("search", Operation::Enable, json!(true)));
        instrumenter.instrument(OperationEvent::new("search", Operation::Enabled, json!(false)));

        let events = instrumenter.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].operation, Operation::Enable);
        assert_eq!(events[1].operation, Operation::Enabled);
        assert_eq!(instrumenter.last().unwrap().operation, Operation::Enabled);
    }

    #[test]
    fn test_event_payload_fields() {
        let event = OperationEvent::new("search", Operation::Enable, json!(true))
            .with_gate(GateName::Actor)
            .with_thing(json!("5"));

        assert_eq!(event.feature_name, "search");
        assert_eq!(event.gate_name, Some(GateName::Actor));
        assert_eq!(event.thing, Some(json!("5")));
        assert_eq!(event.result, json!(true));
    }

    #[test]
    fn test_event_serializes_without_absent_fields() {
        let event = OperationEvent::new("search", Operation::Enabled, json!(true));
        let payload = serde_json::to_value(&event).unwrap();
        assert!(payload.get("gate_name").is_none());
        assert!(payload.get("thing").is_none());
        assert!(payload.get("actors").is_none());
        assert_eq!(payload["operation"], json!("enabled?"));
    }

    #[test]
    fn test_noop_instrumenter() {
        NoopInstrumenter.instrument(OperationEvent::new("search", Operation::Clear, json!(true)));
    }
}
