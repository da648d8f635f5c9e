// crates/archon-core/src/core/action.rs
// ============================================================================
// Module: Archon Proposed Actions
// Description: Capability instances submitted by agents for validation.
// Purpose: Carry an untrusted proposed action plus its canonical input hash.
// Dependencies: crate::core::{hashing, identifiers, taxonomy}, serde
// ============================================================================

//! ## Overview
//! A capability instance is what an agent submits to the gate: a concrete,
//! parameterized request scoped to a project. The `kind` field travels as a
//! raw wire string so taxonomy soundness is a runtime check in the validation
//! engine rather than a deserializer side effect — an action with an unknown
//! kind must still reach the engine and be denied with an audit record.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::hashing::DEFAULT_HASH_ALGORITHM;
use crate::core::hashing::HashDigest;
use crate::core::hashing::HashError;
use crate::core::hashing::hash_canonical_json;
use crate::core::identifiers::AgentId;
use crate::core::identifiers::CapabilityId;
use crate::core::identifiers::ModuleId;
use crate::core::identifiers::ProjectId;
use crate::core::taxonomy::RiskTier;

// ============================================================================
// SECTION: Capability Instance
// ============================================================================

/// Concrete, parameterized action proposed by an agent.
///
/// # Invariants
/// - Owned by the calling agent until the gate accepts it; read-only after.
/// - `kind` is untrusted wire text; the validation engine parses it against
///   the closed taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityInstance {
    /// Project the action is scoped to.
    pub project_id: ProjectId,
    /// Module that declared the capability.
    pub module_id: ModuleId,
    /// Capability identifier within the module.
    pub capability_id: CapabilityId,
    /// Capability kind wire string (untrusted).
    pub kind: String,
    /// Risk tier claimed by the caller.
    pub tier: RiskTier,
    /// Action parameters, keyed deterministically.
    pub params: BTreeMap<String, Value>,
}

impl CapabilityInstance {
    /// Returns a string parameter when present and string-typed.
    #[must_use]
    pub fn string_param(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(Value::as_str)
    }
}

// ============================================================================
// SECTION: Input Hash
// ============================================================================

/// View of an action hashed into every decision-log entry.
///
/// # Invariants
/// - Field set matches the audit contract; `project_id` is scoped by the log
///   file itself and excluded here.
#[derive(Serialize)]
struct InputHashView<'a> {
    /// Submitting agent.
    agent_id: &'a AgentId,
    /// Declaring module.
    module_id: &'a ModuleId,
    /// Capability identifier.
    capability_id: &'a CapabilityId,
    /// Raw kind wire string.
    kind: &'a str,
    /// Claimed risk tier.
    tier: RiskTier,
    /// Action parameters.
    params: &'a BTreeMap<String, Value>,
}

/// Computes the canonical input hash binding an agent to its action.
///
/// # Errors
///
/// Returns [`HashError`] when the params cannot be canonicalized.
pub fn input_hash(agent_id: &AgentId, action: &CapabilityInstance) -> Result<HashDigest, HashError> {
    let view = InputHashView {
        agent_id,
        module_id: &action.module_id,
        capability_id: &action.capability_id,
        kind: &action.kind,
        tier: action.tier,
        params: &action.params,
    };
    hash_canonical_json(DEFAULT_HASH_ALGORITHM, &view)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
