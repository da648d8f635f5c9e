// crates/archon-core/src/core/decision.rs
// ============================================================================
// Module: Archon Decisions
// Description: Decision outcomes and the audit-log entry schema.
// Purpose: Bind every evaluation to a structurally complete audit record.
// Dependencies: crate::core::{action, hashing, identifiers, snapshot, time}, serde
// ============================================================================

//! ## Overview
//! Decisions are in-band values, never errors. Every gate invocation produces
//! exactly one [`DecisionLogEntry`]; a missed entry is a kernel integrity
//! failure. Entries are append-only and never mutated once written.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::action::CapabilityInstance;
use crate::core::hashing::HashDigest;
use crate::core::identifiers::AgentId;
use crate::core::identifiers::EventId;
use crate::core::snapshot::RuleSnapshotHash;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Decision Outcome
// ============================================================================

/// Enforcement decision for a proposed action.
///
/// # Invariants
/// - Variants are stable for serialization and audit matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    /// The action may proceed.
    Permit,
    /// The action is refused.
    Deny,
    /// The action requires operator intervention before it may proceed.
    Escalate,
}

impl Decision {
    /// Returns true when a handler may be invoked for this decision.
    #[must_use]
    pub const fn permits_execution(self) -> bool {
        matches!(self, Self::Permit)
    }
}

/// Evaluation result: a decision plus the rule ids that produced it.
///
/// # Invariants
/// - `triggered_rules` is empty for deny-by-default and allowlist-exhaustion
///   outcomes; the absence of an id is itself a signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Enforcement decision.
    pub decision: Decision,
    /// Identifiers of the rules or resource checks that fired.
    pub triggered_rules: Vec<String>,
}

impl Evaluation {
    /// Permit with the given triggered ids.
    #[must_use]
    pub const fn permit(triggered_rules: Vec<String>) -> Self {
        Self {
            decision: Decision::Permit,
            triggered_rules,
        }
    }

    /// Deny with the given triggered ids.
    #[must_use]
    pub const fn deny(triggered_rules: Vec<String>) -> Self {
        Self {
            decision: Decision::Deny,
            triggered_rules,
        }
    }
}

// ============================================================================
// SECTION: Decision Log Entry
// ============================================================================

/// Append-only audit record for one gate invocation.
///
/// # Invariants
/// - `event_id` is a ULID; `(event_id, timestamp)` drive dedupe-on-read.
/// - `output_hash` is present only when a handler completed successfully.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionLogEntry {
    /// Event identifier.
    pub event_id: EventId,
    /// Agent that proposed the action.
    pub agent_id: AgentId,
    /// The proposed action, verbatim.
    pub proposed_action: CapabilityInstance,
    /// Enforcement decision.
    pub decision: Decision,
    /// Rule ids that fired during evaluation.
    pub triggered_rules: Vec<String>,
    /// Hash of the snapshot the decision was evaluated against.
    pub rs_hash: RuleSnapshotHash,
    /// Canonical hash of the agent-plus-action input.
    pub input_hash: HashDigest,
    /// Canonical hash of the handler output, when one completed.
    pub output_hash: Option<HashDigest>,
    /// Record timestamp.
    pub timestamp: Timestamp,
}
