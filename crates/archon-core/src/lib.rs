// crates/archon-core/src/lib.rs
// ============================================================================
// Module: Archon Core
// Description: Deterministic enforcement engine for agent actions.
// Purpose: Decide permit/deny/escalate against immutable rule snapshots and
//          bind every decision to an append-only audit record.
// Dependencies: async-trait, regex, serde, serde_jcs, serde_json, sha2,
// thiserror, time, ulid, url, uuid
// ============================================================================

//! ## Overview
//! Archon Core is the kernel of a local coordination layer for AI agents:
//! given a proposed action and a rule snapshot, it produces a deterministic
//! decision and an audit record. The invariants live here — deny by default,
//! restriction monotonicity, snapshot determinism, taxonomy soundness, and
//! project isolation — and each is structurally or cryptographically
//! enforced. Hosts supply persistence, adapters, and clocks; the core is
//! pure between its suspension points.
//!
//! Security posture: actions, manifests, rule text, and persisted logs are
//! all untrusted inputs; the engine fails closed on anything it cannot
//! attribute or parse.

// ============================================================================
// SECTION: Modules
// ============================================================================

/// Pure data model: taxonomy, rules, snapshots, decisions, hashing.
pub mod core;
/// Contract surfaces between the gate and the outside world.
pub mod interfaces;
/// Enforcement path: evaluator, validation engine, execution gate.
pub mod runtime;

// ============================================================================
// SECTION: Re-exports
// ============================================================================

pub use crate::core::ALL_CAPABILITY_KINDS;
pub use crate::core::ActiveSnapshot;
pub use crate::core::AgentId;
pub use crate::core::CapabilityDescriptor;
pub use crate::core::CapabilityId;
pub use crate::core::CapabilityInstance;
pub use crate::core::CapabilityKind;
pub use crate::core::Clock;
pub use crate::core::CompiledDrr;
pub use crate::core::Condition;
pub use crate::core::ConditionOp;
pub use crate::core::Decision;
pub use crate::core::DecisionLogEntry;
pub use crate::core::DrrEffect;
pub use crate::core::Evaluation;
pub use crate::core::EventId;
pub use crate::core::FixedClock;
pub use crate::core::FsRoot;
pub use crate::core::HazardPair;
pub use crate::core::ManifestError;
pub use crate::core::ModuleId;
pub use crate::core::ModuleManifest;
pub use crate::core::ProjectId;
pub use crate::core::ProposalId;
pub use crate::core::ResourceConfig;
pub use crate::core::RestrictionError;
pub use crate::core::RiskTier;
pub use crate::core::RootPerm;
pub use crate::core::RuleId;
pub use crate::core::RuleSnapshot;
pub use crate::core::RuleSnapshotHash;
pub use crate::core::SnapshotBuilder;
pub use crate::core::SnapshotInputs;
pub use crate::core::SystemClock;
pub use crate::core::Timestamp;
pub use crate::core::UnknownCapabilityKind;
pub use crate::core::WORKSPACE_ROOT_ID;
pub use crate::core::compile_structured;
pub use crate::core::dsl;
pub use crate::core::glob;
pub use crate::core::hashing;
pub use crate::core::input_hash;
pub use crate::core::logread;
pub use crate::interfaces::AdapterBundle;
pub use crate::interfaces::AdapterCallContext;
pub use crate::interfaces::AdapterError;
pub use crate::interfaces::AuditError;
pub use crate::interfaces::CapabilityHandler;
pub use crate::interfaces::DecisionSink;
pub use crate::interfaces::HandlerError;
pub use crate::runtime::ExecutionGate;
pub use crate::runtime::GateError;
pub use crate::runtime::GateOutcome;
pub use crate::runtime::HandlerOutcome;
pub use crate::runtime::ValidationEngine;
