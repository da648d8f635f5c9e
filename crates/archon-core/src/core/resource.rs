// crates/archon-core/src/core/resource.rs
// ============================================================================
// Module: Archon Resource Configuration
// Description: Per-project filesystem roots, network allowlist, and exec root.
// Purpose: Declare the resource boundaries the validation engine enforces.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Resource configuration scopes what a project may touch: filesystem roots
//! with read-only or read-write permission, a hostname allowlist for network
//! egress, and the root a subprocess runs under. Arrays are stored in
//! authoring order; the snapshot builder sorts a deep copy before hashing so
//! storage order never leaks into `RS_hash`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Filesystem Roots
// ============================================================================

/// Permission granted on a filesystem root.
///
/// # Invariants
/// - Variants are stable for serialization and audit matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RootPerm {
    /// Read-only access.
    Ro,
    /// Read-write access.
    Rw,
}

/// Declared filesystem root.
///
/// # Invariants
/// - `abs_path` is an absolute path; logical containment is checked against
///   its normalized form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FsRoot {
    /// Root identifier, unique within the project.
    pub id: String,
    /// Absolute path of the root.
    pub abs_path: String,
    /// Permission granted under the root.
    pub perm: RootPerm,
}

/// Identifier of the default read-write root created with every project.
pub const WORKSPACE_ROOT_ID: &str = "workspace";

// ============================================================================
// SECTION: Resource Config
// ============================================================================

/// Per-project resource configuration.
///
/// # Invariants
/// - `secrets_epoch` is monotonic; it only ever increments.
/// - Empty `fs_roots` means fs checks are skipped; empty `net_allowlist`
///   means all network egress is denied (fail closed).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResourceConfig {
    /// Declared filesystem roots.
    #[serde(default)]
    pub fs_roots: Vec<FsRoot>,
    /// Allowlisted hostnames; `*.domain` admits strict subdomains only.
    #[serde(default)]
    pub net_allowlist: Vec<String>,
    /// Root identifier subprocesses run under, when configured.
    #[serde(default)]
    pub exec_cwd_root_id: Option<String>,
    /// Monotonic count of secret-store mutations.
    #[serde(default)]
    pub secrets_epoch: u64,
}

impl ResourceConfig {
    /// Returns a deep copy with `fs_roots` sorted by id and the allowlist
    /// sorted lexicographically, the form the snapshot builder hashes.
    #[must_use]
    pub fn canonicalized(&self) -> Self {
        let mut copy = self.clone();
        copy.fs_roots.sort_by(|left, right| left.id.cmp(&right.id));
        copy.net_allowlist.sort();
        copy
    }

    /// Returns the root with the given identifier, if declared.
    #[must_use]
    pub fn root(&self, id: &str) -> Option<&FsRoot> {
        self.fs_roots.iter().find(|root| root.id == id)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalized_sorts_without_mutating_source() {
        let config = ResourceConfig {
            fs_roots: vec![
                FsRoot {
                    id: "z".to_string(),
                    abs_path: "/z".to_string(),
                    perm: RootPerm::Ro,
                },
                FsRoot {
                    id: "a".to_string(),
                    abs_path: "/a".to_string(),
                    perm: RootPerm::Rw,
                },
            ],
            net_allowlist: vec!["b.example".to_string(), "a.example".to_string()],
            exec_cwd_root_id: None,
            secrets_epoch: 0,
        };
        let canonical = config.canonicalized();
        assert_eq!(canonical.fs_roots[0].id, "a");
        assert_eq!(canonical.net_allowlist[0], "a.example");
        assert_eq!(config.fs_roots[0].id, "z");
    }
}
