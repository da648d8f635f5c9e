// crates/archon-core/src/core/manifest.rs
// ============================================================================
// Module: Archon Module Manifests
// Description: Capability contribution module manifests and descriptors.
// Purpose: Declare capabilities, intrinsic restrictions, and hazard pairs.
// Dependencies: crate::core::{hashing, identifiers, taxonomy}, serde, thiserror
// ============================================================================

//! ## Overview
//! A capability contribution module (CCM) declares what it can do through a
//! manifest. Manifests are content; the registry decides whether they are
//! enabled. Validation enforces deny-by-default at load time: a manifest that
//! declares any capability as enabled by default is rejected outright, as is
//! any manifest referencing a kind outside the closed taxonomy.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::hashing::DEFAULT_HASH_ALGORITHM;
use crate::core::hashing::HashDigest;
use crate::core::hashing::HashError;
use crate::core::hashing::hash_canonical_json;
use crate::core::identifiers::CapabilityId;
use crate::core::identifiers::ModuleId;
use crate::core::taxonomy::CapabilityKind;
use crate::core::taxonomy::RiskTier;

// ============================================================================
// SECTION: Capability Descriptors
// ============================================================================

/// Capability declared by a module manifest.
///
/// # Invariants
/// - `default_enabled` is always `false`; validation rejects anything else.
/// - Immutable once the manifest is registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityDescriptor {
    /// Capability identifier scoped within the module.
    pub capability_id: CapabilityId,
    /// Capability kind from the closed taxonomy.
    pub kind: CapabilityKind,
    /// Declared risk tier for this capability.
    pub tier: RiskTier,
    /// JSON schema for action params, opaque to the core.
    pub params_schema: Option<serde_json::Value>,
    /// Module-declared acknowledgment hint. Carried as manifest content;
    /// the typed-acknowledgment requirement itself is driven by tier alone.
    #[serde(default)]
    pub ack_required: bool,
    /// Whether the capability is enabled without operator action. Must be
    /// false; carried on the wire so tampered manifests fail validation.
    #[serde(default)]
    pub default_enabled: bool,
    /// Capability kinds hazardous when co-enabled with this one.
    #[serde(default)]
    pub hazards: Vec<CapabilityKind>,
}

// ============================================================================
// SECTION: Hazard Pairs
// ============================================================================

/// Unordered pair of capability kinds declared dangerous when co-enabled.
///
/// # Invariants
/// - Comparison is order-insensitive; `normalized` renders the canonical
///   `(min, max)` ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HazardPair {
    /// First kind of the pair.
    pub a: CapabilityKind,
    /// Second kind of the pair.
    pub b: CapabilityKind,
}

impl HazardPair {
    /// Creates a hazard pair.
    #[must_use]
    pub const fn new(a: CapabilityKind, b: CapabilityKind) -> Self {
        Self {
            a,
            b,
        }
    }

    /// Returns the pair with its kinds in wire-string order.
    #[must_use]
    pub fn normalized(self) -> Self {
        if self.a.as_str() <= self.b.as_str() {
            self
        } else {
            Self {
                a: self.b,
                b: self.a,
            }
        }
    }

    /// Returns true when the two pairs name the same kinds in any order.
    #[must_use]
    pub fn same_pair(self, other: Self) -> bool {
        self.normalized() == other.normalized()
    }
}

// ============================================================================
// SECTION: Module Manifest
// ============================================================================

/// Module manifest declaring identity, capabilities, and governance metadata.
///
/// # Invariants
/// - `capabilities` all carry `default_enabled = false`.
/// - `content_hash`, once stamped, matches the canonical hash of the manifest
///   with the hash field cleared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleManifest {
    /// Module identifier.
    pub module_id: ModuleId,
    /// Module version string.
    pub version: String,
    /// Human-readable description.
    pub description: String,
    /// Author string.
    pub author: String,
    /// License identifier.
    pub license: String,
    /// Canonical content hash stamped at registration; opaque to consumers.
    #[serde(default)]
    pub content_hash: Option<HashDigest>,
    /// Declared capability descriptors.
    pub capabilities: Vec<CapabilityDescriptor>,
    /// Intrinsic restriction sources in DSL text form.
    #[serde(default)]
    pub restriction_sources: Vec<String>,
    /// Hazard pair declarations.
    #[serde(default)]
    pub hazard_pairs: Vec<HazardPair>,
    /// Non-authoritative profile suggestions for operator tooling.
    #[serde(default)]
    pub profile_suggestions: Vec<String>,
}

impl ModuleManifest {
    /// Returns the descriptor matching a capability identifier, if declared.
    #[must_use]
    pub fn descriptor(&self, capability_id: &CapabilityId) -> Option<&CapabilityDescriptor> {
        self.capabilities.iter().find(|descriptor| &descriptor.capability_id == capability_id)
    }

    /// Returns true when the module declares any descriptor of the kind.
    #[must_use]
    pub fn declares_kind(&self, kind: CapabilityKind) -> bool {
        self.capabilities.iter().any(|descriptor| descriptor.kind == kind)
    }

    /// Validates manifest invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError`] when identity fields are empty, descriptors
    /// are missing, or any descriptor claims default enablement.
    pub fn validate(&self) -> Result<(), ManifestError> {
        if self.module_id.as_str().is_empty() {
            return Err(ManifestError::MissingField {
                field: "module_id",
            });
        }
        if self.version.is_empty() {
            return Err(ManifestError::MissingField {
                field: "version",
            });
        }
        if self.capabilities.is_empty() {
            return Err(ManifestError::NoCapabilities {
                module_id: self.module_id.clone(),
            });
        }
        for descriptor in &self.capabilities {
            if descriptor.capability_id.as_str().is_empty() {
                return Err(ManifestError::MissingField {
                    field: "capability_id",
                });
            }
            if descriptor.default_enabled {
                return Err(ManifestError::DefaultEnabled {
                    module_id: self.module_id.clone(),
                    capability_id: descriptor.capability_id.clone(),
                });
            }
        }
        let mut seen: Vec<&CapabilityId> = Vec::with_capacity(self.capabilities.len());
        for descriptor in &self.capabilities {
            if seen.contains(&&descriptor.capability_id) {
                return Err(ManifestError::DuplicateCapability {
                    module_id: self.module_id.clone(),
                    capability_id: descriptor.capability_id.clone(),
                });
            }
            seen.push(&descriptor.capability_id);
        }
        Ok(())
    }

    /// Computes and stamps the manifest content hash.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] when canonicalization fails.
    pub fn stamp_content_hash(&mut self) -> Result<(), HashError> {
        let mut unstamped = self.clone();
        unstamped.content_hash = None;
        let digest = hash_canonical_json(DEFAULT_HASH_ALGORITHM, &unstamped)?;
        self.content_hash = Some(digest);
        Ok(())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Manifest validation errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ManifestError {
    /// Required identity field was empty.
    #[error("manifest field missing or empty: {field}")]
    MissingField {
        /// Name of the missing field.
        field: &'static str,
    },
    /// Manifest declared no capabilities.
    #[error("manifest {module_id} declares no capabilities")]
    NoCapabilities {
        /// Module identifier.
        module_id: ModuleId,
    },
    /// A descriptor claimed default enablement.
    #[error("manifest {module_id} capability {capability_id} claims default_enabled")]
    DefaultEnabled {
        /// Module identifier.
        module_id: ModuleId,
        /// Offending capability identifier.
        capability_id: CapabilityId,
    },
    /// Two descriptors share a capability identifier.
    #[error("manifest {module_id} declares duplicate capability {capability_id}")]
    DuplicateCapability {
        /// Module identifier.
        module_id: ModuleId,
        /// Duplicated capability identifier.
        capability_id: CapabilityId,
    },
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions may unwrap.")]

    use super::*;

    fn manifest() -> ModuleManifest {
        ModuleManifest {
            module_id: ModuleId::new("filesystem"),
            version: "1.0.0".to_string(),
            description: "Filesystem capabilities".to_string(),
            author: "archon".to_string(),
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
        }
    }

    #[test]
    fn valid_manifest_passes() {
        assert!(manifest().validate().is_ok());
    }

    #[test]
    fn default_enabled_is_rejected() {
        let mut bad = manifest();
        bad.capabilities[0].default_enabled = true;
        let err = bad.validate().unwrap_err();
        assert!(matches!(err, ManifestError::DefaultEnabled { .. }));
    }

    #[test]
    fn duplicate_capability_is_rejected() {
        let mut bad = manifest();
        let dup = bad.capabilities[0].clone();
        bad.capabilities.push(dup);
        let err = bad.validate().unwrap_err();
        assert!(matches!(err, ManifestError::DuplicateCapability { .. }));
    }

    #[test]
    fn content_hash_is_stable_across_restamp() {
        let mut first = manifest();
        first.stamp_content_hash().unwrap();
        let mut second = manifest();
        second.stamp_content_hash().unwrap();
        assert_eq!(first.content_hash, second.content_hash);
    }

    #[test]
    fn hazard_pairs_compare_unordered() {
        let left = HazardPair::new(CapabilityKind::ExecRun, CapabilityKind::SecretsInjectEnv);
        let right = HazardPair::new(CapabilityKind::SecretsInjectEnv, CapabilityKind::ExecRun);
        assert!(left.same_pair(right));
    }
}
