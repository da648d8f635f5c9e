// crates/archon-store/src/registry/resources.rs
// ============================================================================
// Module: Archon Resource Store
// Description: Atomic get/replace for the per-project resource configuration.
// Purpose: Own fs roots, the net allowlist, the exec root, and the secrets epoch.
// Dependencies: archon-core, crate::io, thiserror
// ============================================================================

//! ## Overview
//! The resource store is the authoritative copy of a project's resource
//! boundaries. Replacements are whole-field swaps persisted immediately; the
//! secrets epoch only ever increments, so a rolled-back secrets file is
//! visible as an epoch mismatch in the snapshot hash.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use archon_core::FsRoot;
use archon_core::ResourceConfig;
use thiserror::Error;

use crate::io::StateIo;
use crate::io::StateIoError;
use crate::io::StateIoExt;

/// State document holding the resource configuration.
const RESOURCE_CONFIG: &str = "resource-config";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Resource store errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum ResourceStoreError {
    /// Persistence failed.
    #[error(transparent)]
    Io(#[from] StateIoError),
}

// ============================================================================
// SECTION: Resource Store
// ============================================================================

/// Store for one project's resource configuration.
#[derive(Clone)]
pub struct ResourceStore {
    /// Project-scoped persistence.
    io: Arc<dyn StateIo>,
    /// Current configuration.
    config: ResourceConfig,
}

impl std::fmt::Debug for ResourceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceStore").field("config", &self.config).finish_non_exhaustive()
    }
}

impl ResourceStore {
    /// Opens the store, loading the persisted configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceStoreError`] when the persisted document cannot be
    /// read.
    pub fn open(io: Arc<dyn StateIo>) -> Result<Self, ResourceStoreError> {
        let config: ResourceConfig = io.read_json(RESOURCE_CONFIG, ResourceConfig::default())?;
        Ok(Self {
            io,
            config,
        })
    }

    /// Returns the current configuration.
    #[must_use]
    pub const fn get(&self) -> &ResourceConfig {
        &self.config
    }

    /// Replaces the declared filesystem roots.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceStoreError`] when persistence fails.
    pub fn set_fs_roots(&mut self, fs_roots: Vec<FsRoot>) -> Result<(), ResourceStoreError> {
        self.config.fs_roots = fs_roots;
        self.persist()
    }

    /// Replaces the network allowlist.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceStoreError`] when persistence fails.
    pub fn set_net_allowlist(&mut self, hosts: Vec<String>) -> Result<(), ResourceStoreError> {
        self.config.net_allowlist = hosts;
        self.persist()
    }

    /// Replaces the exec working-directory root id.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceStoreError`] when persistence fails.
    pub fn set_exec_root(&mut self, root_id: Option<String>) -> Result<(), ResourceStoreError> {
        self.config.exec_cwd_root_id = root_id;
        self.persist()
    }

    /// Increments the secrets epoch.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceStoreError`] when persistence fails.
    pub fn increment_secrets_epoch(&mut self) -> Result<u64, ResourceStoreError> {
        self.config.secrets_epoch = self.config.secrets_epoch.saturating_add(1);
        self.persist()?;
        Ok(self.config.secrets_epoch)
    }

    /// Writes the configuration document.
    fn persist(&self) -> Result<(), ResourceStoreError> {
        self.io.write_json(RESOURCE_CONFIG, &self.config)?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
