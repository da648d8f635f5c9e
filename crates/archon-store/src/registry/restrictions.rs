// crates/archon-store/src/registry/restrictions.rs
// ============================================================================
// Module: Archon Restriction Registry
// Description: Per-kind restriction rule storage.
// Purpose: Hold the compiled rule set in persisted canonical form.
// Dependencies: archon-core, crate::io, thiserror
// ============================================================================

//! ## Overview
//! Restrictions are keyed by capability kind and replaced wholesale per kind:
//! `set_restrictions` swaps the rule list for one kind without touching any
//! other. The persisted document is the full compiled rule set in canonical
//! `(kind, effect, ir_hash, id)` order.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use archon_core::CapabilityKind;
use archon_core::CompiledDrr;
use thiserror::Error;

use crate::io::StateIo;
use crate::io::StateIoError;
use crate::io::StateIoExt;

/// State document holding the compiled rule set.
const RESTRICTIONS: &str = "restrictions";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Restriction registry errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum RestrictionRegistryError {
    /// Persistence failed.
    #[error(transparent)]
    Io(#[from] StateIoError),
}

// ============================================================================
// SECTION: Restriction Registry
// ============================================================================

/// Registry of compiled restriction rules for one project.
#[derive(Clone)]
pub struct RestrictionRegistry {
    /// Project-scoped persistence.
    io: Arc<dyn StateIo>,
    /// Compiled rules in canonical order.
    rules: Vec<CompiledDrr>,
}

impl std::fmt::Debug for RestrictionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestrictionRegistry")
            .field("rules", &self.rules.len())
            .finish_non_exhaustive()
    }
}

impl RestrictionRegistry {
    /// Opens the registry, loading the persisted rule set.
    ///
    /// # Errors
    ///
    /// Returns [`RestrictionRegistryError`] when the persisted set cannot be
    /// read.
    pub fn open(io: Arc<dyn StateIo>) -> Result<Self, RestrictionRegistryError> {
        let rules: Vec<CompiledDrr> = io.read_json(RESTRICTIONS, Vec::new())?;
        Ok(Self {
            io,
            rules,
        })
    }

    /// Replaces the rule list for one capability kind.
    ///
    /// # Errors
    ///
    /// Returns [`RestrictionRegistryError`] when persistence fails.
    pub fn set_restrictions(
        &mut self,
        kind: CapabilityKind,
        rules: Vec<CompiledDrr>,
    ) -> Result<(), RestrictionRegistryError> {
        self.rules.retain(|rule| rule.capability_kind != kind);
        self.rules.extend(rules.into_iter().filter(|rule| rule.capability_kind == kind));
        self.rules.sort_by(CompiledDrr::canonical_cmp);
        self.io.write_json(RESTRICTIONS, &self.rules)?;
        Ok(())
    }

    /// Returns all rules in canonical order.
    #[must_use]
    pub fn all(&self) -> Vec<CompiledDrr> {
        self.rules.clone()
    }

    /// Returns the rules for one capability kind.
    #[must_use]
    pub fn for_kind(&self, kind: CapabilityKind) -> Vec<&CompiledDrr> {
        self.rules.iter().filter(|rule| rule.capability_kind == kind).collect()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions may unwrap.")]

    use archon_core::RuleId;
    use archon_core::dsl::compile_dsl;

    use super::*;
    use crate::io::MemoryStateIo;

    fn allow_docs(id: &str) -> CompiledDrr {
        compile_dsl(
            RuleId::new(id),
            r#"allow fs.read where capability.params.path matches "./docs/**""#,
        )
        .unwrap()
    }

    fn deny_exec(id: &str) -> CompiledDrr {
        compile_dsl(RuleId::new(id), r#"deny exec.run where capability.params.cmd matches "rm*""#)
            .unwrap()
    }

    #[test]
    fn set_restrictions_replaces_only_the_given_kind() {
        let io = Arc::new(MemoryStateIo::new());
        let mut registry = RestrictionRegistry::open(io).unwrap();
        registry.set_restrictions(CapabilityKind::FsRead, vec![allow_docs("docs")]).unwrap();
        registry.set_restrictions(CapabilityKind::ExecRun, vec![deny_exec("no-rm")]).unwrap();
        registry.set_restrictions(CapabilityKind::FsRead, vec![allow_docs("docs-2")]).unwrap();

        assert_eq!(registry.for_kind(CapabilityKind::FsRead).len(), 1);
        assert_eq!(registry.for_kind(CapabilityKind::FsRead)[0].id.as_str(), "docs-2");
        assert_eq!(registry.for_kind(CapabilityKind::ExecRun).len(), 1);
    }

    #[test]
    fn persisted_rules_survive_reopen_in_canonical_order() {
        let io = Arc::new(MemoryStateIo::new());
        {
            let mut registry = RestrictionRegistry::open(io.clone() as Arc<dyn StateIo>).unwrap();
            registry
                .set_restrictions(CapabilityKind::FsRead, vec![
                    allow_docs("zz"),
                    allow_docs("aa"),
                ])
                .unwrap();
        }
        let reopened = RestrictionRegistry::open(io as Arc<dyn StateIo>).unwrap();
        let all = reopened.all();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id.as_str(), "aa");
        assert_eq!(all[1].id.as_str(), "zz");
    }
}
