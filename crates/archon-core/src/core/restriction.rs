// crates/archon-core/src/core/restriction.rs
// ============================================================================
// Module: Archon Restriction Rules
// Description: Compiled dynamic restriction rules and the structured compiler.
// Purpose: Lower operator-authored rules into canonical, hashed form.
// Dependencies: crate::core::{hashing, identifiers, taxonomy}, serde, thiserror
// ============================================================================

//! ## Overview
//! A dynamic restriction rule (DRR) is an allow or deny rule over one
//! capability kind with a conjunction of conditions. Compilation sorts
//! conditions by `(field, value)` and stamps `ir_hash`, the canonical hash of
//! the rule content with the operator-assigned id excluded — two
//! syntactically identical rules with different ids share an `ir_hash`.
//! The grammar admits no disjunction between restriction sources, which is
//! what keeps adding rules monotone: a new rule can only narrow the permitted
//! set, never widen it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cmp::Ordering;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::hashing::DEFAULT_HASH_ALGORITHM;
use crate::core::hashing::HashDigest;
use crate::core::hashing::HashError;
use crate::core::hashing::hash_canonical_json;
use crate::core::identifiers::RuleId;
use crate::core::taxonomy::CapabilityKind;

// ============================================================================
// SECTION: Rule Vocabulary
// ============================================================================

/// Rule effect.
///
/// # Invariants
/// - Variants are stable for serialization and audit matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrrEffect {
    /// Membership in the allowlist for the kind.
    Allow,
    /// Unconditional denial when matched.
    Deny,
}

impl DrrEffect {
    /// Returns the stable wire form of the effect.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Deny => "deny",
        }
    }
}

impl fmt::Display for DrrEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Condition operator. Closed set; v1 supports glob matching only.
///
/// # Invariants
/// - Variants are stable for serialization and audit matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOp {
    /// Glob match (`*` within a segment, `**` across segments).
    Matches,
}

/// Single condition over a resolved action field.
///
/// # Invariants
/// - `field` carries the `capability.params.` prefix; compilation rejects
///   anything else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    /// Field selector, e.g. `capability.params.path`.
    pub field: String,
    /// Condition operator.
    pub op: ConditionOp,
    /// Operand value (glob pattern for `matches`).
    pub value: String,
}

/// Field prefix admitted by the v1 condition grammar.
pub const PARAM_FIELD_PREFIX: &str = "capability.params.";

// ============================================================================
// SECTION: Compiled Rule
// ============================================================================

/// Compiled dynamic restriction rule in canonical form.
///
/// # Invariants
/// - `conditions` is sorted by `(field, value)`.
/// - `ir_hash` covers `(capability_kind, effect, conditions)` and excludes
///   `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledDrr {
    /// Operator-assigned rule identifier.
    pub id: RuleId,
    /// Capability kind the rule applies to.
    pub capability_kind: CapabilityKind,
    /// Rule effect.
    pub effect: DrrEffect,
    /// Sorted condition conjunction.
    pub conditions: Vec<Condition>,
    /// Canonical hash of the rule content, id excluded.
    pub ir_hash: HashDigest,
}

impl CompiledDrr {
    /// Canonical ordering key used by the snapshot builder:
    /// `(kind, effect, ir_hash, id)`.
    #[must_use]
    pub fn canonical_cmp(&self, other: &Self) -> Ordering {
        self.capability_kind
            .as_str()
            .cmp(other.capability_kind.as_str())
            .then_with(|| self.effect.cmp(&other.effect))
            .then_with(|| self.ir_hash.value.cmp(&other.ir_hash.value))
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// Hashed view of a rule: everything except the operator-assigned id.
///
/// # Invariants
/// - Field set defines the `ir_hash` contract; changing it is a format break.
#[derive(Serialize)]
struct RuleIrView<'a> {
    /// Capability kind wire string.
    capability_kind: &'a str,
    /// Effect wire string.
    effect: &'a str,
    /// Sorted conditions.
    conditions: &'a [Condition],
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised when compiling a structured rule.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum RestrictionError {
    /// Rule carried no conditions.
    #[error("rule {id} has no conditions")]
    EmptyConditions {
        /// Offending rule identifier.
        id: RuleId,
    },
    /// Condition field is outside the v1 grammar.
    #[error("rule {id} references unknown field {field}")]
    UnknownField {
        /// Offending rule identifier.
        id: RuleId,
        /// Rejected field selector.
        field: String,
    },
    /// Canonicalization of the rule content failed.
    #[error(transparent)]
    Hash(#[from] HashError),
}

// ============================================================================
// SECTION: Structured Compilation
// ============================================================================

/// Compiles a structured rule into canonical form.
///
/// Conditions are sorted by `(field, value)` and `ir_hash` is stamped over
/// the id-free rule content, so semantically equivalent inputs compile to
/// identical hashes regardless of authoring order.
///
/// # Errors
///
/// Returns [`RestrictionError`] on empty condition lists, unknown fields, or
/// canonicalization failure.
pub fn compile_structured(
    id: RuleId,
    capability_kind: CapabilityKind,
    effect: DrrEffect,
    conditions: Vec<Condition>,
) -> Result<CompiledDrr, RestrictionError> {
    if conditions.is_empty() {
        return Err(RestrictionError::EmptyConditions {
            id,
        });
    }
    for condition in &conditions {
        let key = condition.field.strip_prefix(PARAM_FIELD_PREFIX);
        if key.is_none_or(str::is_empty) {
            return Err(RestrictionError::UnknownField {
                id,
                field: condition.field.clone(),
            });
        }
    }
    let mut conditions = conditions;
    conditions.sort_by(|left, right| {
        left.field.cmp(&right.field).then_with(|| left.value.cmp(&right.value))
    });
    let view = RuleIrView {
        capability_kind: capability_kind.as_str(),
        effect: effect.as_str(),
        conditions: &conditions,
    };
    let ir_hash = hash_canonical_json(DEFAULT_HASH_ALGORITHM, &view)?;
    Ok(CompiledDrr {
        id,
        capability_kind,
        effect,
        conditions,
        ir_hash,
    })
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions may unwrap.")]

    use super::*;

    fn condition(field: &str, value: &str) -> Condition {
        Condition {
            field: field.to_string(),
            op: ConditionOp::Matches,
            value: value.to_string(),
        }
    }

    #[test]
    fn id_is_excluded_from_ir_hash() {
        let conditions = vec![condition("capability.params.path", "./docs/**")];
        let first = compile_structured(
            RuleId::new("r1"),
            CapabilityKind::FsRead,
            DrrEffect::Allow,
            conditions.clone(),
        )
        .unwrap();
        let second = compile_structured(
            RuleId::new("r2"),
            CapabilityKind::FsRead,
            DrrEffect::Allow,
            conditions,
        )
        .unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(first.ir_hash, second.ir_hash);
    }

    #[test]
    fn condition_order_does_not_change_ir_hash() {
        let forward = vec![
            condition("capability.params.path", "./a/**"),
            condition("capability.params.path", "./b/**"),
        ];
        let reversed = vec![forward[1].clone(), forward[0].clone()];
        let first = compile_structured(
            RuleId::new("r"),
            CapabilityKind::FsRead,
            DrrEffect::Deny,
            forward,
        )
        .unwrap();
        let second = compile_structured(
            RuleId::new("r"),
            CapabilityKind::FsRead,
            DrrEffect::Deny,
            reversed,
        )
        .unwrap();
        assert_eq!(first.ir_hash, second.ir_hash);
        assert_eq!(first.conditions, second.conditions);
    }

    #[test]
    fn effect_changes_ir_hash() {
        let conditions = vec![condition("capability.params.path", "./docs/**")];
        let allow = compile_structured(
            RuleId::new("r"),
            CapabilityKind::FsRead,
            DrrEffect::Allow,
            conditions.clone(),
        )
        .unwrap();
        let deny = compile_structured(
            RuleId::new("r"),
            CapabilityKind::FsRead,
            DrrEffect::Deny,
            conditions,
        )
        .unwrap();
        assert_ne!(allow.ir_hash, deny.ir_hash);
    }

    #[test]
    fn empty_conditions_are_rejected() {
        let err = compile_structured(
            RuleId::new("r"),
            CapabilityKind::FsRead,
            DrrEffect::Allow,
            Vec::new(),
        )
        .unwrap_err();
        assert!(matches!(err, RestrictionError::EmptyConditions { .. }));
    }

    #[test]
    fn unknown_field_is_rejected() {
        let err = compile_structured(
            RuleId::new("r"),
            CapabilityKind::FsRead,
            DrrEffect::Allow,
            vec![condition("capability.env.path", "./docs/**")],
        )
        .unwrap_err();
        assert!(matches!(err, RestrictionError::UnknownField { .. }));
    }
}
