// crates/archon-store/src/state.rs
// ============================================================================
// Module: Archon Project State
// Description: Facade bundling one project's registries and snapshot build.
// Purpose: Provide the single read path from mutable state to a hashed snapshot.
// Dependencies: archon-core, crate::io, crate::registry, thiserror
// ============================================================================

//! ## Overview
//! `ProjectState` owns one project's registries over a shared `StateIo`
//! handle and turns their current contents into an [`ActiveSnapshot`] on
//! demand. Snapshot builds are lock-free reads of immutable copies; only
//! mutations take the per-project lock. The configuration hash covers the
//! governance protocol constants so a protocol change surfaces as snapshot
//! drift rather than passing silently.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use archon_core::ActiveSnapshot;
use archon_core::Clock;
use archon_core::ProjectId;
use archon_core::RiskTier;
use archon_core::SnapshotBuilder;
use archon_core::SnapshotInputs;
use archon_core::hashing::DEFAULT_HASH_ALGORITHM;
use archon_core::hashing::HashDigest;
use archon_core::hashing::HashError;
use archon_core::hashing::hash_canonical_json;
use thiserror::Error;

use crate::io::StateIo;
use crate::registry::AckStore;
use crate::registry::CapabilityRegistry;
use crate::registry::ModuleRegistry;
use crate::registry::ResourceStore;
use crate::registry::RestrictionRegistry;
use crate::registry::acks::AckStoreError;
use crate::registry::capabilities::CapabilityRegistryError;
use crate::registry::modules::ModuleRegistryError;
use crate::registry::resources::ResourceStoreError;
use crate::registry::restrictions::RestrictionRegistryError;

// ============================================================================
// SECTION: Protocol Constants
// ============================================================================

/// Tiers whose enablement requires a typed acknowledgment.
pub const TYPED_ACK_TIERS: [RiskTier; 1] = [RiskTier::T3];

/// Governance protocol constants folded into the configuration hash.
#[derive(serde::Serialize)]
struct ProtocolConfigView {
    /// Typed-acknowledgment tiers as wire strings.
    typed_ack_tiers: Vec<&'static str>,
}

/// Computes the configuration hash for snapshot builds.
///
/// # Errors
///
/// Returns [`HashError`] when canonicalization fails.
pub fn protocol_config_hash() -> Result<HashDigest, HashError> {
    let view = ProtocolConfigView {
        typed_ack_tiers: TYPED_ACK_TIERS.iter().map(|tier| tier.as_str()).collect(),
    };
    hash_canonical_json(DEFAULT_HASH_ALGORITHM, &view)
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Project state errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum ProjectStateError {
    /// Module registry failed.
    #[error(transparent)]
    Modules(#[from] ModuleRegistryError),
    /// Capability registry failed.
    #[error(transparent)]
    Capabilities(#[from] CapabilityRegistryError),
    /// Restriction registry failed.
    #[error(transparent)]
    Restrictions(#[from] RestrictionRegistryError),
    /// Resource store failed.
    #[error(transparent)]
    Resources(#[from] ResourceStoreError),
    /// Acknowledgment store failed.
    #[error(transparent)]
    Acks(#[from] AckStoreError),
    /// Canonicalization failed.
    #[error(transparent)]
    Hash(#[from] HashError),
}

// ============================================================================
// SECTION: Project State
// ============================================================================

/// One project's registries behind a single facade.
#[derive(Debug, Clone)]
pub struct ProjectState {
    /// Project identifier.
    pub project_id: ProjectId,
    /// Module registry.
    pub modules: ModuleRegistry,
    /// Capability registry.
    pub capabilities: CapabilityRegistry,
    /// Restriction registry.
    pub restrictions: RestrictionRegistry,
    /// Resource store.
    pub resources: ResourceStore,
    /// Acknowledgment store.
    pub acks: AckStore,
}

impl ProjectState {
    /// Opens all registries over one project-scoped I/O handle.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectStateError`] when any persisted document cannot be
    /// read.
    pub fn open(project_id: ProjectId, io: Arc<dyn StateIo>) -> Result<Self, ProjectStateError> {
        Ok(Self {
            project_id,
            modules: ModuleRegistry::open(io.clone())?,
            capabilities: CapabilityRegistry::open(io.clone())?,
            restrictions: RestrictionRegistry::open(io.clone())?,
            resources: ResourceStore::open(io.clone())?,
            acks: AckStore::open(io)?,
        })
    }

    /// Builds and hashes a snapshot of the current rule state.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectStateError`] when canonicalization fails.
    pub fn build_snapshot(
        &self,
        engine_version: &str,
        clock: &dyn Clock,
    ) -> Result<ActiveSnapshot, ProjectStateError> {
        let snapshot = SnapshotBuilder::build(
            SnapshotInputs {
                project_id: self.project_id.clone(),
                manifests: self.modules.enabled_manifests(),
                enabled_capabilities: self.capabilities.enabled_kinds(),
                drrs: self.restrictions.all(),
                resource_config: self.resources.get().clone(),
                engine_version: engine_version.to_string(),
                config_hash: protocol_config_hash()?,
                ack_epoch: self.acks.ack_epoch(),
            },
            clock,
        );
        Ok(ActiveSnapshot::new(snapshot)?)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
