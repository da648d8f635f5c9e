// crates/archon-store/src/logfile.rs
// ============================================================================
// Module: Archon JSONL Log Sink
// Description: Append-only JSONL sinks over the state I/O facade.
// Purpose: Persist decision and proposal events one JSON object per line.
// Dependencies: archon-core, crate::io, async-trait, serde_json
// ============================================================================

//! ## Overview
//! Two JSONL logs live in every project: `decisions` and `proposal-events`.
//! Each line is one JSON object carrying a ULID `event_id` and an RFC 3339
//! `timestamp`. Appends go straight through the I/O facade with no buffering
//! that can lose an acknowledged write; readers go through the core
//! dedupe-on-read pass.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use archon_core::DecisionLogEntry;
use archon_core::interfaces::AuditError;
use archon_core::interfaces::DecisionSink;
use archon_core::logread::LogReadOutcome;
use archon_core::logread::read_log;
use async_trait::async_trait;
use serde_json::Value;

use crate::io::StateIo;
use crate::io::StateIoError;

/// Log name for decision records.
pub const DECISIONS_LOG: &str = "decisions";
/// Log name for proposal lifecycle events.
pub const PROPOSAL_EVENTS_LOG: &str = "proposal-events";

// ============================================================================
// SECTION: JSONL Sink
// ============================================================================

/// JSONL sink writing into one project's log directory.
#[derive(Clone)]
pub struct JsonlLogSink {
    /// Project-scoped persistence.
    io: Arc<dyn StateIo>,
    /// Log name the sink appends to.
    log_name: String,
}

impl std::fmt::Debug for JsonlLogSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonlLogSink").field("log_name", &self.log_name).finish_non_exhaustive()
    }
}

impl JsonlLogSink {
    /// Creates a sink for the given log name.
    #[must_use]
    pub fn new(io: Arc<dyn StateIo>, log_name: impl Into<String>) -> Self {
        Self {
            io,
            log_name: log_name.into(),
        }
    }

    /// Creates the decision-log sink for a project.
    #[must_use]
    pub fn decisions(io: Arc<dyn StateIo>) -> Self {
        Self::new(io, DECISIONS_LOG)
    }

    /// Appends an arbitrary event object as one line.
    ///
    /// # Errors
    ///
    /// Returns [`StateIoError`] when serialization or the append fails.
    pub fn append_value(&self, event: &Value) -> Result<(), StateIoError> {
        let line = serde_json::to_string(event).map_err(|err| StateIoError::Serde {
            name: self.log_name.clone(),
            detail: err.to_string(),
        })?;
        self.io.append_line(&self.log_name, &line)
    }

    /// Reads the log through the dedupe-on-read pass.
    ///
    /// # Errors
    ///
    /// Returns [`StateIoError`] when the raw content cannot be read.
    pub fn read(&self) -> Result<LogReadOutcome, StateIoError> {
        let raw = self.io.read_log_raw(&self.log_name)?;
        Ok(read_log(&raw))
    }
}

#[async_trait]
impl DecisionSink for JsonlLogSink {
    async fn append(&self, entry: &DecisionLogEntry) -> Result<(), AuditError> {
        let value =
            serde_json::to_value(entry).map_err(|err| AuditError::Append(err.to_string()))?;
        self.append_value(&value).map_err(|err| AuditError::Append(err.to_string()))
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions may unwrap.")]

    use serde_json::json;

    use super::*;
    use crate::io::MemoryStateIo;

    #[test]
    fn appended_events_read_back_deduplicated() {
        let io = Arc::new(MemoryStateIo::new());
        let sink = JsonlLogSink::new(io, PROPOSAL_EVENTS_LOG);
        let event = json!({"event_id": "01A", "timestamp": "2026-01-01T00:00:00Z"});
        sink.append_value(&event).unwrap();
        sink.append_value(&event).unwrap();
        let outcome = sink.read().unwrap();
        assert_eq!(outcome.events.len(), 1);
        assert_eq!(outcome.stats.duplicates, 1);
    }
}
