// crates/archon-core/src/core/mod.rs
// ============================================================================
// Module: Archon Core Data Model
// Description: Taxonomy, rules, snapshots, decisions, and hashing.
// Purpose: Group the pure data model consumed by the runtime.
// Dependencies: submodules only
// ============================================================================

//! ## Overview
//! The core data model is pure: no I/O, no suspension points, no hidden
//! clocks. Everything here is deterministic given its inputs, which is what
//! makes snapshot hashes and audit records replayable.

/// Proposed actions and their canonical input hash.
pub mod action;
/// Decision outcomes and the audit-log entry schema.
pub mod decision;
/// Text form of the restriction DSL.
pub mod dsl;
/// Glob matching and logical path normalization.
pub mod glob;
/// Canonical JSON serialization and SHA-256 digests.
pub mod hashing;
/// Typed opaque identifiers.
pub mod identifiers;
/// Dedupe-on-read for JSONL event logs.
pub mod logread;
/// Module manifests and capability descriptors.
pub mod manifest;
/// Per-project resource configuration.
pub mod resource;
/// Compiled restriction rules and the structured compiler.
pub mod restriction;
/// Rule snapshots and the canonical snapshot hash.
pub mod snapshot;
/// Capability kinds and risk tiers.
pub mod taxonomy;
/// Timestamps and the injectable clock.
pub mod time;

pub use action::CapabilityInstance;
pub use action::input_hash;
pub use decision::Decision;
pub use decision::DecisionLogEntry;
pub use decision::Evaluation;
pub use identifiers::AgentId;
pub use identifiers::CapabilityId;
pub use identifiers::EventId;
pub use identifiers::ModuleId;
pub use identifiers::ProjectId;
pub use identifiers::ProposalId;
pub use identifiers::RuleId;
pub use manifest::CapabilityDescriptor;
pub use manifest::HazardPair;
pub use manifest::ManifestError;
pub use manifest::ModuleManifest;
pub use resource::FsRoot;
pub use resource::ResourceConfig;
pub use resource::RootPerm;
pub use resource::WORKSPACE_ROOT_ID;
pub use restriction::CompiledDrr;
pub use restriction::Condition;
pub use restriction::ConditionOp;
pub use restriction::DrrEffect;
pub use restriction::RestrictionError;
pub use restriction::compile_structured;
pub use snapshot::ActiveSnapshot;
pub use snapshot::RuleSnapshot;
pub use snapshot::RuleSnapshotHash;
pub use snapshot::SnapshotBuilder;
pub use snapshot::SnapshotInputs;
pub use taxonomy::ALL_CAPABILITY_KINDS;
pub use taxonomy::CapabilityKind;
pub use taxonomy::RiskTier;
pub use taxonomy::UnknownCapabilityKind;
pub use time::Clock;
pub use time::FixedClock;
pub use time::SystemClock;
pub use time::Timestamp;
