// crates/archon-store/src/registry/acks.rs
// ============================================================================
// Module: Archon Acknowledgment Store
// Description: Append-only stores for typed acks and hazard confirmations.
// Purpose: Count governance acknowledgments into the snapshot ack epoch.
// Dependencies: archon-core, crate::io, serde, thiserror
// ============================================================================

//! ## Overview
//! Acknowledgment events are append-only: once written they are never
//! mutated, with one exception — `rsHashAfter` starts null and is patched
//! once the post-apply snapshot hash is known. The ack epoch is the combined
//! count of typed acks and hazard confirmations and participates in
//! `RS_hash`, so every acknowledgment changes the snapshot identity.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use archon_core::CapabilityKind;
use archon_core::EventId;
use archon_core::HazardPair;
use archon_core::RiskTier;
use archon_core::RuleSnapshotHash;
use archon_core::Timestamp;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::io::StateIo;
use crate::io::StateIoError;
use crate::io::StateIoExt;

/// State document holding typed acknowledgment events.
const ACKNOWLEDGMENTS: &str = "acknowledgments";
/// State document holding hazard confirmation events.
const HAZARD_ACKS: &str = "hazard-acks";

// ============================================================================
// SECTION: Events
// ============================================================================

/// Typed acknowledgment of a tier-elevating enable.
///
/// # Invariants
/// - Append-only; only `rs_hash_after` is patched, once, after apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckEvent {
    /// Event identifier.
    pub id: EventId,
    /// Capability kind that was acknowledged.
    pub capability_kind: CapabilityKind,
    /// Tier that required the acknowledgment.
    pub tier: RiskTier,
    /// The exact phrase the operator typed.
    pub phrase: String,
    /// Operator identity string.
    pub acknowledged_by: String,
    /// Acknowledgment timestamp.
    pub at: Timestamp,
    /// Snapshot hash after apply; null until patched.
    #[serde(rename = "rsHashAfter")]
    pub rs_hash_after: Option<RuleSnapshotHash>,
}

/// Hazard-pair confirmation.
///
/// # Invariants
/// - Append-only; only `rs_hash_after` is patched, once, after apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HazardAckEvent {
    /// Event identifier.
    pub id: EventId,
    /// The confirmed hazard pair, normalized.
    pub pair: HazardPair,
    /// Operator identity string.
    pub confirmed_by: String,
    /// Confirmation timestamp.
    pub at: Timestamp,
    /// Snapshot hash after apply; null until patched.
    #[serde(rename = "rsHashAfter")]
    pub rs_hash_after: Option<RuleSnapshotHash>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Acknowledgment store errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum AckStoreError {
    /// Persistence failed.
    #[error(transparent)]
    Io(#[from] StateIoError),
}

// ============================================================================
// SECTION: Ack Store
// ============================================================================

/// Append-only acknowledgment store for one project.
#[derive(Clone)]
pub struct AckStore {
    /// Project-scoped persistence.
    io: Arc<dyn StateIo>,
    /// Typed acknowledgment events.
    acks: Vec<AckEvent>,
    /// Hazard confirmation events.
    hazard_acks: Vec<HazardAckEvent>,
}

impl std::fmt::Debug for AckStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AckStore")
            .field("acks", &self.acks.len())
            .field("hazard_acks", &self.hazard_acks.len())
            .finish_non_exhaustive()
    }
}

impl AckStore {
    /// Opens the store, loading both persisted arrays.
    ///
    /// # Errors
    ///
    /// Returns [`AckStoreError`] when either array cannot be read.
    pub fn open(io: Arc<dyn StateIo>) -> Result<Self, AckStoreError> {
        let acks: Vec<AckEvent> = io.read_json(ACKNOWLEDGMENTS, Vec::new())?;
        let hazard_acks: Vec<HazardAckEvent> = io.read_json(HAZARD_ACKS, Vec::new())?;
        Ok(Self {
            io,
            acks,
            hazard_acks,
        })
    }

    /// Returns the ack epoch: total count of both event arrays.
    #[must_use]
    pub fn ack_epoch(&self) -> u64 {
        u64::try_from(self.acks.len() + self.hazard_acks.len()).unwrap_or(u64::MAX)
    }

    /// Appends a typed acknowledgment event.
    ///
    /// # Errors
    ///
    /// Returns [`AckStoreError`] when persistence fails.
    pub fn append_ack(&mut self, event: AckEvent) -> Result<(), AckStoreError> {
        self.acks.push(event);
        self.io.write_json(ACKNOWLEDGMENTS, &self.acks)?;
        Ok(())
    }

    /// Appends a hazard confirmation event.
    ///
    /// # Errors
    ///
    /// Returns [`AckStoreError`] when persistence fails.
    pub fn append_hazard_ack(&mut self, event: HazardAckEvent) -> Result<(), AckStoreError> {
        self.hazard_acks.push(event);
        self.io.write_json(HAZARD_ACKS, &self.hazard_acks)?;
        Ok(())
    }

    /// Patches `rsHashAfter` on the single matching record; no-op if absent.
    ///
    /// # Errors
    ///
    /// Returns [`AckStoreError`] when persistence fails.
    pub fn patch_rs_hash(
        &mut self,
        id: &EventId,
        rs_hash: &RuleSnapshotHash,
    ) -> Result<(), AckStoreError> {
        if let Some(ack) = self.acks.iter_mut().find(|ack| &ack.id == id) {
            ack.rs_hash_after = Some(rs_hash.clone());
            self.io.write_json(ACKNOWLEDGMENTS, &self.acks)?;
            return Ok(());
        }
        if let Some(hazard) = self.hazard_acks.iter_mut().find(|hazard| &hazard.id == id) {
            hazard.rs_hash_after = Some(rs_hash.clone());
            self.io.write_json(HAZARD_ACKS, &self.hazard_acks)?;
        }
        Ok(())
    }

    /// Returns the typed acknowledgment events.
    #[must_use]
    pub fn acks(&self) -> &[AckEvent] {
        &self.acks
    }

    /// Returns the hazard confirmation events.
    #[must_use]
    pub fn hazard_acks(&self) -> &[HazardAckEvent] {
        &self.hazard_acks
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions may unwrap.")]

    use super::*;
    use crate::io::MemoryStateIo;

    fn ack(id: &EventId) -> AckEvent {
        AckEvent {
            id: id.clone(),
            capability_kind: CapabilityKind::FsDelete,
            tier: RiskTier::T3,
            phrase: "I ACCEPT T3 RISK (fs.delete)".to_string(),
            acknowledged_by: "operator".to_string(),
            at: Timestamp::from_rfc3339("2026-01-01T00:00:00Z"),
            rs_hash_after: None,
        }
    }

    #[test]
    fn ack_epoch_counts_both_arrays() {
        let io = Arc::new(MemoryStateIo::new());
        let mut store = AckStore::open(io).unwrap();
        assert_eq!(store.ack_epoch(), 0);
        store.append_ack(ack(&EventId::generate())).unwrap();
        store
            .append_hazard_ack(HazardAckEvent {
                id: EventId::generate(),
                pair: HazardPair::new(CapabilityKind::ExecRun, CapabilityKind::SecretsInjectEnv)
                    .normalized(),
                confirmed_by: "operator".to_string(),
                at: Timestamp::from_rfc3339("2026-01-01T00:00:00Z"),
                rs_hash_after: None,
            })
            .unwrap();
        assert_eq!(store.ack_epoch(), 2);
    }

    #[test]
    fn patch_updates_only_the_matching_record() {
        let io = Arc::new(MemoryStateIo::new());
        let mut store = AckStore::open(io.clone() as Arc<dyn StateIo>).unwrap();
        let first = EventId::generate();
        let second = EventId::generate();
        store.append_ack(ack(&first)).unwrap();
        store.append_ack(ack(&second)).unwrap();

        let snapshot = archon_core::SnapshotBuilder::build(
            archon_core::SnapshotInputs {
                project_id: archon_core::ProjectId::new("p1"),
                manifests: Vec::new(),
                enabled_capabilities: Vec::new(),
                drrs: Vec::new(),
                resource_config: archon_core::ResourceConfig::default(),
                engine_version: "0.1.0".to_string(),
                config_hash: archon_core::hashing::hash_bytes(
                    archon_core::hashing::DEFAULT_HASH_ALGORITHM,
                    b"cfg",
                ),
                ack_epoch: 0,
            },
            &archon_core::FixedClock::new("2026-01-01T00:00:00Z"),
        );
        let rs_hash = archon_core::SnapshotBuilder::hash(&snapshot).unwrap();

        store.patch_rs_hash(&first, &rs_hash).unwrap();
        assert_eq!(store.acks()[0].rs_hash_after.as_ref(), Some(&rs_hash));
        assert!(store.acks()[1].rs_hash_after.is_none());

        // Reopen and confirm persistence.
        let reopened = AckStore::open(io as Arc<dyn StateIo>).unwrap();
        assert_eq!(reopened.acks()[0].rs_hash_after.as_ref(), Some(&rs_hash));
    }

    #[test]
    fn patch_of_unknown_id_is_a_no_op() {
        let io = Arc::new(MemoryStateIo::new());
        let mut store = AckStore::open(io).unwrap();
        store.append_ack(ack(&EventId::generate())).unwrap();
        let snapshot = archon_core::SnapshotBuilder::build(
            archon_core::SnapshotInputs {
                project_id: archon_core::ProjectId::new("p1"),
                manifests: Vec::new(),
                enabled_capabilities: Vec::new(),
                drrs: Vec::new(),
                resource_config: archon_core::ResourceConfig::default(),
                engine_version: "0.1.0".to_string(),
                config_hash: archon_core::hashing::hash_bytes(
                    archon_core::hashing::DEFAULT_HASH_ALGORITHM,
                    b"cfg",
                ),
                ack_epoch: 0,
            },
            &archon_core::FixedClock::new("2026-01-01T00:00:00Z"),
        );
        let rs_hash = archon_core::SnapshotBuilder::hash(&snapshot).unwrap();
        store.patch_rs_hash(&EventId::generate(), &rs_hash).unwrap();
        assert!(store.acks()[0].rs_hash_after.is_none());
    }
}
