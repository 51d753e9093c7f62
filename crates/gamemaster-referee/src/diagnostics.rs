//! Sink for human-readable diagnostics about misbehaving players.
//!
//! Diagnostics are distinct from tracing output: they are the messages a
//! front end shows to whoever is running the match (malformed commands,
//! players that failed to start).

use std::sync::{Arc, Mutex, PoisonError};

use tracing::warn;

/// Append-only destination for diagnostics.
pub trait DiagnosticSink: Send + Sync {
    fn emit(&self, text: &str);
}

/// Forwards diagnostics to the tracing subscriber at `warn` level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn emit(&self, text: &str) {
        warn!(target: "gamemaster::diagnostic", "{text}");
    }
}

/// Keeps every diagnostic in memory. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything emitted so far.
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DiagnosticSink for RecordingSink {
    fn emit(&self, text: &str) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(text.to_string());
    }
}
