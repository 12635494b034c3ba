//! Progress sink: an opaque event stream the orchestrator writes to and
//! never aborts on failure.

use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub content: String,
}

impl ProgressEvent {
    pub fn new(kind: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            content: content.into(),
        }
    }
}

/// A writable stream of progress events whose writes may fail. Every
/// implementation must swallow its own I/O errors internally and report
/// success/failure via the return value only — the orchestrator never
/// inspects *why* a write failed, and never aborts because one did.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent) -> bool;
}

pub struct StdoutSink;

impl ProgressSink for StdoutSink {
    fn emit(&self, event: ProgressEvent) -> bool {
        println!("[{}] {}", event.kind, event.content);
        true
    }
}

/// Test/diagnostic sink that records every event it receives.
pub struct CapturingSink {
    events: std::sync::Mutex<Vec<ProgressEvent>>,
}

impl Default for CapturingSink {
    fn default() -> Self {
        Self {
            events: std::sync::Mutex::new(Vec::new()),
        }
    }
}

impl CapturingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

impl ProgressSink for CapturingSink {
    fn emit(&self, event: ProgressEvent) -> bool {
        match self.events.lock() {
            Ok(mut guard) => {
                guard.push(event);
                true
            }
            Err(_) => {
                warn!("progress sink lock poisoned, dropping event");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capturing_sink_records_events_in_order() {
        let sink = CapturingSink::new();
        sink.emit(ProgressEvent::new("progress", "started"));
        sink.emit(ProgressEvent::new("result", "done"));
        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, "progress");
        assert_eq!(events[1].kind, "result");
    }
}
