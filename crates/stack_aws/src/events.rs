use chrono::Utc;
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventLevel {
    Info,
    Error,
}

impl EventLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Error => "ERROR",
        }
    }
}

/// Destination for workflow step events.
pub trait EventSink {
    fn emit(&self, level: EventLevel, event: &str, details: Value);
}

/// Production sink: one JSON line per event on stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrJsonSink;

impl EventSink for StderrJsonSink {
    fn emit(&self, level: EventLevel, event: &str, details: Value) {
        eprintln!(
            "{}",
            json!({
                "component": "stack_demo",
                "level": level.as_str(),
                "event": event,
                "timestamp": Utc::now().to_rfc3339(),
                "details": details,
            })
        );
    }
}
