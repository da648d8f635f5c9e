// crates/archon-store/src/registry/capabilities.rs
// ============================================================================
// Module: Archon Capability Registry
// Description: The per-project set of enabled capability kinds.
// Purpose: Keep capability enablement explicit, declared, and persisted sorted.
// Dependencies: archon-core, crate::io, crate::registry, thiserror
// ============================================================================

//! ## Overview
//! A capability kind can only be enabled when at least one currently enabled
//! module declares a descriptor of that kind — enablement can never grant
//! something nothing provides. The persisted form is a sorted list of wire
//! strings.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::sync::Arc;

use archon_core::CapabilityKind;
use thiserror::Error;

use crate::io::StateIo;
use crate::io::StateIoError;
use crate::io::StateIoExt;
use crate::registry::Confirmation;
use crate::registry::ModuleRegistry;

/// State document holding the sorted enabled capability kinds.
const ENABLED_CAPABILITIES: &str = "enabled-capabilities";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Capability registry errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum CapabilityRegistryError {
    /// No enabled module declares a descriptor of the kind.
    #[error("capability not declared by any enabled module: {kind}")]
    CapabilityNotDeclared {
        /// The undeclared kind.
        kind: CapabilityKind,
    },
    /// Mutation was not confirmed.
    #[error("capability mutation requires explicit confirmation")]
    NotConfirmed,
    /// Persistence failed.
    #[error(transparent)]
    Io(#[from] StateIoError),
}

// ============================================================================
// SECTION: Capability Registry
// ============================================================================

/// Registry of enabled capability kinds for one project.
#[derive(Clone)]
pub struct CapabilityRegistry {
    /// Project-scoped persistence.
    io: Arc<dyn StateIo>,
    /// Enabled kinds, kept sorted by the set ordering.
    enabled: BTreeSet<CapabilityKind>,
}

impl std::fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityRegistry").field("enabled", &self.enabled).finish_non_exhaustive()
    }
}

impl CapabilityRegistry {
    /// Opens the registry, loading the persisted kind list.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityRegistryError`] when the persisted list cannot be
    /// read.
    pub fn open(io: Arc<dyn StateIo>) -> Result<Self, CapabilityRegistryError> {
        let kinds: Vec<CapabilityKind> = io.read_json(ENABLED_CAPABILITIES, Vec::new())?;
        Ok(Self {
            io,
            enabled: kinds.into_iter().collect(),
        })
    }

    /// Enables a capability kind.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityRegistryError::CapabilityNotDeclared`] when no
    /// enabled module declares the kind, and persistence or confirmation
    /// failures otherwise.
    pub fn enable(
        &mut self,
        kind: CapabilityKind,
        opts: Confirmation,
        modules: &ModuleRegistry,
    ) -> Result<(), CapabilityRegistryError> {
        if !opts.confirmed {
            return Err(CapabilityRegistryError::NotConfirmed);
        }
        let declared =
            modules.enabled_manifests().iter().any(|manifest| manifest.declares_kind(kind));
        if !declared {
            return Err(CapabilityRegistryError::CapabilityNotDeclared {
                kind,
            });
        }
        self.enabled.insert(kind);
        self.persist()
    }

    /// Disables a capability kind.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityRegistryError`] on confirmation or persistence
    /// failure.
    pub fn disable(
        &mut self,
        kind: CapabilityKind,
        opts: Confirmation,
    ) -> Result<(), CapabilityRegistryError> {
        if !opts.confirmed {
            return Err(CapabilityRegistryError::NotConfirmed);
        }
        self.enabled.remove(&kind);
        self.persist()
    }

    /// Writes the sorted kind list.
    fn persist(&self) -> Result<(), CapabilityRegistryError> {
        let mut kinds: Vec<CapabilityKind> = self.enabled.iter().copied().collect();
        kinds.sort_by_key(|kind| kind.as_str());
        self.io.write_json(ENABLED_CAPABILITIES, &kinds)?;
        Ok(())
    }

    /// Returns true when the kind is enabled.
    #[must_use]
    pub fn is_enabled(&self, kind: CapabilityKind) -> bool {
        self.enabled.contains(&kind)
    }

    /// Returns the enabled kinds.
    #[must_use]
    pub fn enabled_kinds(&self) -> Vec<CapabilityKind> {
        self.enabled.iter().copied().collect()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions may unwrap.")]

    use archon_core::CapabilityDescriptor;
    use archon_core::CapabilityId;
    use archon_core::ModuleId;
    use archon_core::ModuleManifest;
    use archon_core::RiskTier;

    use super::*;

    use crate::io::MemoryStateIo;

    fn modules_with_enabled_fs_read(io: &Arc<MemoryStateIo>) -> ModuleRegistry {
        let mut modules = ModuleRegistry::open(io.clone() as Arc<dyn StateIo>).unwrap();
        modules
            .register(ModuleManifest {
                module_id: ModuleId::new("filesystem"),
                version: "1.0.0".to_string(),
                description: String::new(),
                author: String::new(),
                license: "Apache-2.0".to_string(),
                content_hash: None,
                capabilities: vec![CapabilityDescriptor {
                    capability_id: CapabilityId::new("read"),
                    kind: CapabilityKind::FsRead,
                    tier: RiskTier::T1,
                    params_schema: None,
                    ack_required: false,
                    default_enabled: false,
                    hazards: Vec::new(),
                }],
                restriction_sources: Vec::new(),
                hazard_pairs: Vec::new(),
                profile_suggestions: Vec::new(),
            })
            .unwrap();
        modules.enable(&ModuleId::new("filesystem"), Confirmation::CONFIRMED).unwrap();
        modules
    }

    #[test]
    fn enable_requires_a_declaring_enabled_module() {
        let io = Arc::new(MemoryStateIo::new());
        let modules = modules_with_enabled_fs_read(&io);
        let mut capabilities =
            CapabilityRegistry::open(io.clone() as Arc<dyn StateIo>).unwrap();

        capabilities.enable(CapabilityKind::FsRead, Confirmation::CONFIRMED, &modules).unwrap();
        assert!(capabilities.is_enabled(CapabilityKind::FsRead));

        let err = capabilities
            .enable(CapabilityKind::ExecRun, Confirmation::CONFIRMED, &modules)
            .unwrap_err();
        assert!(matches!(err, CapabilityRegistryError::CapabilityNotDeclared { .. }));
    }

    #[test]
    fn persisted_list_is_sorted_by_wire_string() {
        let io = Arc::new(MemoryStateIo::new());
        let mut modules = modules_with_enabled_fs_read(&io);
        modules
            .register(ModuleManifest {
                module_id: ModuleId::new("exec"),
                version: "1.0.0".to_string(),
                description: String::new(),
                author: String::new(),
                license: "Apache-2.0".to_string(),
                content_hash: None,
                capabilities: vec![CapabilityDescriptor {
                    capability_id: CapabilityId::new("run"),
                    kind: CapabilityKind::ExecRun,
                    tier: RiskTier::T3,
                    params_schema: None,
                    ack_required: false,
                    default_enabled: false,
                    hazards: Vec::new(),
                }],
                restriction_sources: Vec::new(),
                hazard_pairs: Vec::new(),
                profile_suggestions: Vec::new(),
            })
            .unwrap();
        modules.enable(&ModuleId::new("exec"), Confirmation::CONFIRMED).unwrap();

        let mut capabilities =
            CapabilityRegistry::open(io.clone() as Arc<dyn StateIo>).unwrap();
        capabilities.enable(CapabilityKind::FsRead, Confirmation::CONFIRMED, &modules).unwrap();
        capabilities.enable(CapabilityKind::ExecRun, Confirmation::CONFIRMED, &modules).unwrap();

        let persisted: Vec<String> = io.read_json("enabled-capabilities", Vec::new()).unwrap();
        assert_eq!(persisted, vec!["exec.run".to_string(), "fs.read".to_string()]);
    }

    #[test]
    fn disable_removes_and_persists() {
        let io = Arc::new(MemoryStateIo::new());
        let modules = modules_with_enabled_fs_read(&io);
        let mut capabilities =
            CapabilityRegistry::open(io.clone() as Arc<dyn StateIo>).unwrap();
        capabilities.enable(CapabilityKind::FsRead, Confirmation::CONFIRMED, &modules).unwrap();
        capabilities.disable(CapabilityKind::FsRead, Confirmation::CONFIRMED).unwrap();
        assert!(!capabilities.is_enabled(CapabilityKind::FsRead));
    }
}
