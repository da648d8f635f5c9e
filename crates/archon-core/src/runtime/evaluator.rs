// crates/archon-core/src/runtime/evaluator.rs
// ============================================================================
// Module: Archon DRR Evaluator
// Description: Restriction-rule evaluation for proposed actions.
// Purpose: Convert a rule set and an action into a permit/deny outcome.
// Dependencies: crate::core::{glob, restriction, taxonomy}
// ============================================================================

//! ## Overview
//! Rule evaluation is pure and fail-closed. Deny rules are evaluated first
//! and the first match wins. When any allow rules exist for the action's
//! kind, the evaluator switches to allowlist mode: the action must match at
//! least one allow rule or it is denied with no triggered id (allowlist
//! exhaustion — the absence of an id is the signal). Missing or non-string
//! fields never satisfy a condition.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde_json::Value;

use crate::core::glob;
use crate::core::restriction::CompiledDrr;
use crate::core::restriction::Condition;
use crate::core::restriction::ConditionOp;
use crate::core::restriction::DrrEffect;
use crate::core::restriction::PARAM_FIELD_PREFIX;
use crate::core::taxonomy::CapabilityKind;

// ============================================================================
// SECTION: Outcome
// ============================================================================

/// Result of evaluating an action against a rule set.
///
/// # Invariants
/// - `triggered_rules` holds at most one id in v1 (the matching rule).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrrOutcome {
    /// True when the rules permit the action.
    pub permitted: bool,
    /// Identifier of the rule that decided the outcome, when one did.
    pub triggered_rules: Vec<String>,
}

// ============================================================================
// SECTION: Evaluation
// ============================================================================

/// Resolves a condition field against action params.
///
/// Only `capability.params.<key>` is addressable in v1; anything else, and
/// any non-string value, resolves to nothing.
fn resolve_field<'a>(field: &str, params: &'a BTreeMap<String, Value>) -> Option<&'a str> {
    let key = field.strip_prefix(PARAM_FIELD_PREFIX)?;
    params.get(key).and_then(Value::as_str)
}

/// Returns true when the condition holds for the action params.
fn condition_matches(condition: &Condition, params: &BTreeMap<String, Value>) -> bool {
    let Some(resolved) = resolve_field(&condition.field, params) else {
        return false;
    };
    match condition.op {
        ConditionOp::Matches => glob::matches(&condition.value, resolved).unwrap_or(false),
    }
}

/// Returns true when every condition of the rule holds (conjunction).
fn rule_matches(rule: &CompiledDrr, params: &BTreeMap<String, Value>) -> bool {
    rule.conditions.iter().all(|condition| condition_matches(condition, params))
}

/// Evaluates an action's params against the rule set for its kind.
#[must_use]
pub fn evaluate_drrs(
    kind: CapabilityKind,
    params: &BTreeMap<String, Value>,
    drrs: &[CompiledDrr],
) -> DrrOutcome {
    let applicable: Vec<&CompiledDrr> =
        drrs.iter().filter(|rule| rule.capability_kind == kind).collect();
    if applicable.is_empty() {
        return DrrOutcome {
            permitted: true,
            triggered_rules: Vec::new(),
        };
    }

    for rule in applicable.iter().filter(|rule| rule.effect == DrrEffect::Deny) {
        if rule_matches(rule, params) {
            return DrrOutcome {
                permitted: false,
                triggered_rules: vec![rule.id.as_str().to_string()],
            };
        }
    }

    let allows: Vec<&&CompiledDrr> =
        applicable.iter().filter(|rule| rule.effect == DrrEffect::Allow).collect();
    if allows.is_empty() {
        return DrrOutcome {
            permitted: true,
            triggered_rules: Vec::new(),
        };
    }
    for rule in allows {
        if rule_matches(rule, params) {
            return DrrOutcome {
                permitted: true,
                triggered_rules: vec![rule.id.as_str().to_string()],
            };
        }
    }
    // Allowlist exhaustion: allow rules exist and none matched.
    DrrOutcome {
        permitted: false,
        triggered_rules: Vec::new(),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
