// crates/archon-core/src/runtime/gate.rs
// ============================================================================
// Module: Archon Execution Gate
// Description: The single enforcement boundary between actions and execution.
// Purpose: Evaluate, log unconditionally, and dispatch permitted actions.
// Dependencies: crate::core, crate::interfaces, crate::runtime::engine
// ============================================================================

//! ## Overview
//! The gate is the only path from a proposed action to its execution. Every
//! invocation evaluates against the active snapshot, constructs a decision
//! record, optionally invokes the registered handler, and appends the record
//! whether or not the handler succeeded. A missed append is a kernel
//! integrity failure, surfaced as [`GateError::Audit`]. The gate suspends
//! only at the handler call and the sink append; evaluation itself is pure.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::core::action::CapabilityInstance;
use crate::core::action::input_hash;
use crate::core::decision::DecisionLogEntry;
use crate::core::decision::Evaluation;
use crate::core::hashing::DEFAULT_HASH_ALGORITHM;
use crate::core::hashing::HashError;
use crate::core::hashing::hash_canonical_json;
use crate::core::identifiers::AgentId;
use crate::core::identifiers::CapabilityId;
use crate::core::identifiers::EventId;
use crate::core::identifiers::ModuleId;
use crate::core::snapshot::ActiveSnapshot;
use crate::core::time::Clock;
use crate::interfaces::AdapterBundle;
use crate::interfaces::AdapterCallContext;
use crate::interfaces::CapabilityHandler;
use crate::interfaces::DecisionSink;
use crate::runtime::engine::ValidationEngine;

// ============================================================================
// SECTION: Outcome and Errors
// ============================================================================

/// Result of a handler invocation, reported in-band.
///
/// # Invariants
/// - A failure never alters the decision; the log entry is written either way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerOutcome {
    /// Handler completed with a result value.
    Completed(Value),
    /// Handler failed; the message is surfaced to the caller.
    Failed(String),
}

/// Result of a gate invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateOutcome {
    /// The enforcement evaluation.
    pub evaluation: Evaluation,
    /// Handler result when a handler ran.
    pub handler: Option<HandlerOutcome>,
    /// The audit record appended for this invocation.
    pub entry: DecisionLogEntry,
}

/// Gate failures. Decisions are in-band; these are genuinely exceptional.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum GateError {
    /// Canonicalization failed while hashing inputs or outputs.
    #[error(transparent)]
    Hash(#[from] HashError),
    /// The decision log could not be appended; kernel integrity failure.
    #[error("decision log append failed: {0}")]
    Audit(String),
}

// ============================================================================
// SECTION: Execution Gate
// ============================================================================

/// Handler registry key: `"{module_id}:{capability_id}"`.
fn handler_key(module_id: &ModuleId, capability_id: &CapabilityId) -> String {
    format!("{module_id}:{capability_id}")
}

/// The enforcement gate.
///
/// # Invariants
/// - Every invocation that returns produced exactly one decision-log entry
///   (appended to the sink when one is configured, and always present in the
///   returned outcome).
pub struct ExecutionGate {
    /// Pure validation engine.
    engine: ValidationEngine,
    /// Registered handlers keyed by `"{module_id}:{capability_id}"`.
    handlers: BTreeMap<String, Arc<dyn CapabilityHandler>>,
    /// Adapter bundle handed to handlers.
    adapters: Option<AdapterBundle>,
    /// Audit sink for decision records.
    sink: Option<Arc<dyn DecisionSink>>,
    /// Clock stamping decision records.
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for ExecutionGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionGate")
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .field("adapters", &self.adapters)
            .field("sink", &self.sink.is_some())
            .finish_non_exhaustive()
    }
}

impl ExecutionGate {
    /// Creates a gate with no handlers, adapters, or sink.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            engine: ValidationEngine,
            handlers: BTreeMap::new(),
            adapters: None,
            sink: None,
            clock,
        }
    }

    /// Registers a handler for a `(module, capability)` pair.
    #[must_use]
    pub fn with_handler(
        mut self,
        module_id: &ModuleId,
        capability_id: &CapabilityId,
        handler: Arc<dyn CapabilityHandler>,
    ) -> Self {
        self.handlers.insert(handler_key(module_id, capability_id), handler);
        self
    }

    /// Attaches the adapter bundle handed to handlers.
    #[must_use]
    pub fn with_adapters(mut self, adapters: AdapterBundle) -> Self {
        self.adapters = Some(adapters);
        self
    }

    /// Attaches the audit sink.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn DecisionSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Evaluates an action, executes it when permitted, and appends the
    /// audit record unconditionally.
    ///
    /// # Errors
    ///
    /// Returns [`GateError`] on canonicalization failure or when the audit
    /// append fails. Denials and handler failures are in-band.
    pub async fn invoke(
        &self,
        agent_id: &AgentId,
        action: &CapabilityInstance,
        active: &ActiveSnapshot,
    ) -> Result<GateOutcome, GateError> {
        let evaluation = self.engine.evaluate(action, &active.snapshot);
        let action_input_hash = input_hash(agent_id, action)?;

        let mut entry = DecisionLogEntry {
            event_id: EventId::generate(),
            agent_id: agent_id.clone(),
            proposed_action: action.clone(),
            decision: evaluation.decision,
            triggered_rules: evaluation.triggered_rules.clone(),
            rs_hash: active.rs_hash.clone(),
            input_hash: action_input_hash,
            output_hash: None,
            timestamp: self.clock.now(),
        };

        let mut handler_outcome = None;
        if evaluation.decision.permits_execution() {
            let key = handler_key(&action.module_id, &action.capability_id);
            if let (Some(handler), Some(adapters)) = (self.handlers.get(&key), &self.adapters) {
                // Context is built from the gate's own validated state, never
                // from caller-supplied values.
                let ctx = AdapterCallContext {
                    agent_id: agent_id.clone(),
                    capability_instance: action.clone(),
                    rs_hash: active.rs_hash.clone(),
                    resource_config: active.snapshot.resource_config.clone(),
                };
                handler_outcome = Some(match handler.handle(&ctx, adapters).await {
                    // A result that cannot be canonicalized is reported as a
                    // handler failure; the append below must still happen.
                    Ok(value) => match hash_canonical_json(DEFAULT_HASH_ALGORITHM, &value) {
                        Ok(digest) => {
                            entry.output_hash = Some(digest);
                            HandlerOutcome::Completed(value)
                        }
                        Err(err) => HandlerOutcome::Failed(format!("output hash failed: {err}")),
                    },
                    Err(err) => HandlerOutcome::Failed(err.to_string()),
                });
            }
        }

        // The append happens after the handler on every path, success or
        // failure; a sink error is a kernel integrity failure.
        if let Some(sink) = &self.sink {
            sink.append(&entry).await.map_err(|err| GateError::Audit(err.to_string()))?;
        }

        Ok(GateOutcome {
            evaluation,
            handler: handler_outcome,
            entry,
        })
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
