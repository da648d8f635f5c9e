// crates/archon-store/src/registry/modules.rs
// ============================================================================
// Module: Archon Module Registry
// Description: Manifest registration, enablement, and status tracking.
// Purpose: Gate which capability contribution modules participate in a project.
// Dependencies: archon-core, crate::io, serde, thiserror
// ============================================================================

//! ## Overview
//! Modules register as `Disabled`; enablement is always an explicit,
//! confirmed operation whose result is the persisted sorted id list. A
//! manifest that fails validation is kept with `Rejected` status so the
//! operator can inspect why, but it can never be enabled.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use archon_core::ManifestError;
use archon_core::ModuleId;
use archon_core::ModuleManifest;
use archon_core::hashing::HashError;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::io::StateIo;
use crate::io::StateIoError;
use crate::io::StateIoExt;
use crate::registry::Confirmation;

/// State document holding the sorted enabled module ids.
const ENABLED_MODULES: &str = "enabled-modules";

// ============================================================================
// SECTION: Records and Errors
// ============================================================================

/// Lifecycle status of a registered module.
///
/// # Invariants
/// - Variants are stable for serialization and operator tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleStatus {
    /// Manifest parsed but not yet validated into the registry.
    Loaded,
    /// Module participates in snapshots.
    Enabled,
    /// Module is registered but inert.
    Disabled,
    /// Manifest failed validation; module can never be enabled.
    Rejected,
}

/// Registered module with its manifest and status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleRecord {
    /// The registered manifest.
    pub manifest: ModuleManifest,
    /// Current lifecycle status.
    pub status: ModuleStatus,
}

/// Module registry errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum ModuleRegistryError {
    /// Manifest failed validation and was recorded as rejected.
    #[error("manifest invalid: {0}")]
    ManifestInvalid(#[from] ManifestError),
    /// A module with the same id is already registered.
    #[error("duplicate module: {module_id}")]
    DuplicateModule {
        /// Duplicated module identifier.
        module_id: ModuleId,
    },
    /// Module is not registered.
    #[error("unknown module: {module_id}")]
    UnknownModule {
        /// Unknown module identifier.
        module_id: ModuleId,
    },
    /// Module was rejected at registration and cannot change status.
    #[error("module {module_id} was rejected at registration")]
    Rejected {
        /// Rejected module identifier.
        module_id: ModuleId,
    },
    /// Mutation was not confirmed.
    #[error("module mutation requires explicit confirmation")]
    NotConfirmed,
    /// Content hashing failed.
    #[error(transparent)]
    Hash(#[from] HashError),
    /// Persistence failed.
    #[error(transparent)]
    Io(#[from] StateIoError),
}

// ============================================================================
// SECTION: Module Registry
// ============================================================================

/// Registry of capability contribution modules for one project.
#[derive(Clone)]
pub struct ModuleRegistry {
    /// Project-scoped persistence.
    io: Arc<dyn StateIo>,
    /// Registered modules keyed by id.
    records: BTreeMap<ModuleId, ModuleRecord>,
    /// Persisted enabled ids, sorted.
    enabled_ids: Vec<ModuleId>,
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("records", &self.records.keys().collect::<Vec<_>>())
            .field("enabled_ids", &self.enabled_ids)
            .finish_non_exhaustive()
    }
}

impl ModuleRegistry {
    /// Opens the registry, loading the persisted enabled-id list.
    ///
    /// # Errors
    ///
    /// Returns [`ModuleRegistryError`] when the persisted list cannot be read.
    pub fn open(io: Arc<dyn StateIo>) -> Result<Self, ModuleRegistryError> {
        let enabled_ids: Vec<ModuleId> = io.read_json(ENABLED_MODULES, Vec::new())?;
        Ok(Self {
            io,
            records: BTreeMap::new(),
            enabled_ids,
        })
    }

    /// Registers a manifest.
    ///
    /// New modules insert as `Disabled`; a module named in the persisted
    /// enabled-id list (a previously confirmed enable) restores as `Enabled`.
    /// Invalid manifests are recorded as `Rejected` and the error surfaced.
    ///
    /// # Errors
    ///
    /// Returns [`ModuleRegistryError`] on validation failure or duplicates.
    pub fn register(&mut self, mut manifest: ModuleManifest) -> Result<(), ModuleRegistryError> {
        let module_id = manifest.module_id.clone();
        if self.records.contains_key(&module_id) {
            return Err(ModuleRegistryError::DuplicateModule {
                module_id,
            });
        }
        if let Err(err) = manifest.validate() {
            self.records.insert(module_id, ModuleRecord {
                manifest,
                status: ModuleStatus::Rejected,
            });
            return Err(err.into());
        }
        manifest.stamp_content_hash()?;
        let status = if self.enabled_ids.contains(&module_id) {
            ModuleStatus::Enabled
        } else {
            ModuleStatus::Disabled
        };
        self.records.insert(module_id, ModuleRecord {
            manifest,
            status,
        });
        Ok(())
    }

    /// Enables a module and persists the sorted enabled-id list.
    ///
    /// # Errors
    ///
    /// Returns [`ModuleRegistryError`] when unconfirmed, unknown, rejected,
    /// or when persistence fails.
    pub fn enable(
        &mut self,
        module_id: &ModuleId,
        opts: Confirmation,
    ) -> Result<(), ModuleRegistryError> {
        self.set_status(module_id, opts, ModuleStatus::Enabled)
    }

    /// Disables a module and persists the sorted enabled-id list.
    ///
    /// # Errors
    ///
    /// Returns [`ModuleRegistryError`] when unconfirmed, unknown, rejected,
    /// or when persistence fails.
    pub fn disable(
        &mut self,
        module_id: &ModuleId,
        opts: Confirmation,
    ) -> Result<(), ModuleRegistryError> {
        self.set_status(module_id, opts, ModuleStatus::Disabled)
    }

    /// Shared enable/disable path.
    fn set_status(
        &mut self,
        module_id: &ModuleId,
        opts: Confirmation,
        status: ModuleStatus,
    ) -> Result<(), ModuleRegistryError> {
        if !opts.confirmed {
            return Err(ModuleRegistryError::NotConfirmed);
        }
        let record =
            self.records.get_mut(module_id).ok_or_else(|| ModuleRegistryError::UnknownModule {
                module_id: module_id.clone(),
            })?;
        if record.status == ModuleStatus::Rejected {
            return Err(ModuleRegistryError::Rejected {
                module_id: module_id.clone(),
            });
        }
        record.status = status;
        // Ids enabled on disk but not yet registered this process are kept.
        match status {
            ModuleStatus::Enabled => {
                if !self.enabled_ids.contains(module_id) {
                    self.enabled_ids.push(module_id.clone());
                }
            }
            _ => self.enabled_ids.retain(|id| id != module_id),
        }
        self.enabled_ids.sort();
        self.io.write_json(ENABLED_MODULES, &self.enabled_ids)?;
        Ok(())
    }

    /// Returns a registered module record.
    #[must_use]
    pub fn get(&self, module_id: &ModuleId) -> Option<&ModuleRecord> {
        self.records.get(module_id)
    }

    /// Returns all registered records in id order.
    #[must_use]
    pub fn records(&self) -> Vec<&ModuleRecord> {
        self.records.values().collect()
    }

    /// Returns the manifests of all enabled modules.
    #[must_use]
    pub fn enabled_manifests(&self) -> Vec<ModuleManifest> {
        self.records
            .values()
            .filter(|record| record.status == ModuleStatus::Enabled)
            .map(|record| record.manifest.clone())
            .collect()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
