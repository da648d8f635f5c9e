// crates/archon-core/src/core/snapshot.rs
// ============================================================================
// Module: Archon Rule Snapshots
// Description: Immutable rule-state bundles and the canonical snapshot hash.
// Purpose: Capture the exact rule state a decision was evaluated against.
// Dependencies: crate::core::{hashing, identifiers, manifest, resource,
// restriction, taxonomy, time}, serde
// ============================================================================

//! ## Overview
//! A rule snapshot is an immutable bundle of everything the validation engine
//! consults: enabled manifests, enabled capability kinds, canonical
//! restriction rules, resource configuration, and the acknowledgment epoch.
//! The builder sorts every array before assembly so input ordering never
//! changes `RS_hash`; the hash operation is the sole authorized constructor
//! of [`RuleSnapshotHash`]. Snapshots are shared as `Arc<RuleSnapshot>` and
//! never mutated after construction.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::hashing::DEFAULT_HASH_ALGORITHM;
use crate::core::hashing::HashDigest;
use crate::core::hashing::HashError;
use crate::core::hashing::hash_canonical_json;
use crate::core::identifiers::ProjectId;
use crate::core::manifest::ModuleManifest;
use crate::core::resource::ResourceConfig;
use crate::core::restriction::CompiledDrr;
use crate::core::taxonomy::CapabilityKind;
use crate::core::time::Clock;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Snapshot Hash Brand
// ============================================================================

/// Authenticated snapshot hash.
///
/// # Invariants
/// - The only in-process constructor is [`SnapshotBuilder::hash`]; a plain
///   string cannot be passed where an authenticated hash is required.
/// - Deserialization exists for reading persisted audit records, which are
///   treated as untrusted on load.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleSnapshotHash(String);

impl RuleSnapshotHash {
    /// Brands a freshly computed digest. Module-private by design.
    const fn from_digest_value(value: String) -> Self {
        Self(value)
    }

    /// Returns the lowercase hex digest.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RuleSnapshotHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ============================================================================
// SECTION: Rule Snapshot
// ============================================================================

/// Immutable rule-state bundle.
///
/// # Invariants
/// - All arrays are in canonical (sorted) order as produced by the builder.
/// - Read-only for its lifetime; the builder takes independent ownership of
///   each produced snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSnapshot {
    /// Project the snapshot is scoped to.
    pub project_id: ProjectId,
    /// Enabled module manifests, sorted by module id.
    pub ccm_enabled: Vec<ModuleManifest>,
    /// Enabled capability kinds, sorted by wire string.
    pub enabled_capabilities: Vec<CapabilityKind>,
    /// Restriction rules in canonical `(kind, effect, ir_hash, id)` order.
    pub drr_canonical: Vec<CompiledDrr>,
    /// Canonicalized resource configuration.
    pub resource_config: ResourceConfig,
    /// Engine version string.
    pub engine_version: String,
    /// Opaque configuration hash supplied by the host.
    pub config_hash: HashDigest,
    /// Construction timestamp from the injected clock.
    pub constructed_at: Timestamp,
    /// Count of T3 acknowledgment and hazard-confirmation events.
    pub ack_epoch: u64,
}

impl RuleSnapshot {
    /// Returns true when the kind is enabled in this snapshot.
    #[must_use]
    pub fn capability_enabled(&self, kind: CapabilityKind) -> bool {
        self.enabled_capabilities.contains(&kind)
    }
}

// ============================================================================
// SECTION: Builder Inputs
// ============================================================================

/// Inputs to a snapshot build, in whatever order the registries hold them.
///
/// # Invariants
/// - None; the builder canonicalizes everything.
#[derive(Debug, Clone)]
pub struct SnapshotInputs {
    /// Project the snapshot is scoped to.
    pub project_id: ProjectId,
    /// Enabled module manifests.
    pub manifests: Vec<ModuleManifest>,
    /// Enabled capability kinds.
    pub enabled_capabilities: Vec<CapabilityKind>,
    /// Compiled restriction rules.
    pub drrs: Vec<CompiledDrr>,
    /// Resource configuration as stored.
    pub resource_config: ResourceConfig,
    /// Engine version string.
    pub engine_version: String,
    /// Opaque configuration hash.
    pub config_hash: HashDigest,
    /// Acknowledgment epoch.
    pub ack_epoch: u64,
}

// ============================================================================
// SECTION: Snapshot Builder
// ============================================================================

/// Builds and hashes rule snapshots.
#[derive(Debug, Clone, Copy, Default)]
pub struct SnapshotBuilder;

impl SnapshotBuilder {
    /// Assembles a canonical snapshot from unsorted inputs.
    ///
    /// Sorting happens here, once: manifests by module id, kinds by wire
    /// string, rules by `(kind, effect, ir_hash, id)`, resource arrays by id
    /// and lexicographically. `constructed_at` comes from the injected clock
    /// so replay and tests can hold it fixed.
    #[must_use]
    pub fn build(inputs: SnapshotInputs, clock: &dyn Clock) -> RuleSnapshot {
        let mut manifests = inputs.manifests;
        manifests.sort_by(|left, right| left.module_id.cmp(&right.module_id));
        let mut kinds = inputs.enabled_capabilities;
        kinds.sort_by_key(|kind| kind.as_str());
        kinds.dedup();
        let mut drrs = inputs.drrs;
        drrs.sort_by(CompiledDrr::canonical_cmp);
        RuleSnapshot {
            project_id: inputs.project_id,
            ccm_enabled: manifests,
            enabled_capabilities: kinds,
            drr_canonical: drrs,
            resource_config: inputs.resource_config.canonicalized(),
            engine_version: inputs.engine_version,
            config_hash: inputs.config_hash,
            constructed_at: clock.now(),
            ack_epoch: inputs.ack_epoch,
        }
    }

    /// Hashes a snapshot into its branded `RS_hash`.
    ///
    /// This is the sole authorized path to produce a [`RuleSnapshotHash`].
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] when canonicalization fails.
    pub fn hash(snapshot: &RuleSnapshot) -> Result<RuleSnapshotHash, HashError> {
        let digest = hash_canonical_json(DEFAULT_HASH_ALGORITHM, snapshot)?;
        Ok(RuleSnapshotHash::from_digest_value(digest.value))
    }
}

// ============================================================================
// SECTION: Active Snapshot
// ============================================================================

/// A snapshot paired with its authenticated hash, ready for enforcement.
///
/// # Invariants
/// - `rs_hash` was computed from `snapshot` by [`SnapshotBuilder::hash`].
#[derive(Debug, Clone)]
pub struct ActiveSnapshot {
    /// The immutable snapshot, shared across the gate and evaluator.
    pub snapshot: std::sync::Arc<RuleSnapshot>,
    /// The snapshot's authenticated hash.
    pub rs_hash: RuleSnapshotHash,
}

impl ActiveSnapshot {
    /// Hashes and wraps a freshly built snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] when canonicalization fails.
    pub fn new(snapshot: RuleSnapshot) -> Result<Self, HashError> {
        let rs_hash = SnapshotBuilder::hash(&snapshot)?;
        Ok(Self {
            snapshot: std::sync::Arc::new(snapshot),
            rs_hash,
        })
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
