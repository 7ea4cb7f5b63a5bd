// crates/bootstrap-check-core/src/runtime/events.rs
// ============================================================================
// Module: Harness Event Sinks
// Description: JSON-line event sinks for stderr, files, memory, or nowhere.
// Purpose: Record harness progress without coupling the runtime to a backend.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! Each sink serializes a [`HarnessEvent`] as one JSON line. Write failures
//! are swallowed: event logging must never change a run's outcome.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use crate::interfaces::HarnessEvent;
use crate::interfaces::HarnessEventSink;

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Event sink that logs JSON lines to stderr.
#[derive(Debug, Default)]
pub struct StderrEventSink;

impl HarnessEventSink for StderrEventSink {
    fn record(&self, event: &HarnessEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Event sink that appends JSON lines to a file.
#[derive(Debug)]
pub struct FileEventSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileEventSink {
    /// Opens the event log in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl HarnessEventSink for FileEventSink {
    fn record(&self, event: &HarnessEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// No-op event sink.
#[derive(Debug, Default)]
pub struct NoopEventSink;

impl HarnessEventSink for NoopEventSink {
    fn record(&self, _event: &HarnessEvent) {}
}

/// Event sink that keeps events in memory, for callers that assert on them.
#[derive(Debug, Default)]
pub struct MemoryEventSink {
    /// Recorded events in arrival order.
    events: Mutex<Vec<HarnessEvent>>,
}

impl MemoryEventSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<HarnessEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }

    /// Returns the labels of recorded events in order.
    #[must_use]
    pub fn labels(&self) -> Vec<&'static str> {
        self.events().iter().map(|event| event.event).collect()
    }
}

impl HarnessEventSink for MemoryEventSink {
    fn record(&self, event: &HarnessEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
