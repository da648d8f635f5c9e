// crates/archon-core/src/core/identifiers.rs
// ============================================================================
// Module: Archon Identifiers
// Description: Canonical opaque identifiers for projects, modules, and events.
// Purpose: Provide strongly typed, serializable identifiers with stable wire forms.
// Dependencies: serde, ulid, uuid
// ============================================================================

//! ## Overview
//! This module defines the canonical identifiers used throughout Archon.
//! Identifiers are opaque strings on the wire. Event identifiers are ULIDs
//! (millisecond timestamp + cryptographic randomness, lexicographically
//! sortable by creation time); proposal identifiers are UUID v4 values.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

/// Declares an opaque string identifier newtype with the shared accessors.
macro_rules! opaque_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        ///
        /// # Invariants
        /// - Opaque UTF-8 string; no normalization or validation is applied by this type.
        #[derive(
            Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::new(value)
            }
        }
    };
}

opaque_id! {
    /// Project identifier scoping all per-project state.
    ProjectId
}

opaque_id! {
    /// Module identifier declared by a capability contribution module.
    ModuleId
}

opaque_id! {
    /// Capability identifier scoped within a module manifest.
    CapabilityId
}

opaque_id! {
    /// Agent identifier attributed to proposed actions.
    AgentId
}

opaque_id! {
    /// Operator-assigned restriction rule identifier.
    RuleId
}

// ============================================================================
// SECTION: Event Identifiers
// ============================================================================

/// Event identifier carried by every append-only log record.
///
/// # Invariants
/// - Wire form is a 26-character Crockford-Base32 ULID.
/// - Lexicographic order matches creation order at millisecond granularity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    /// Generates a fresh ULID-backed event identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(ulid::Ulid::new().to_string())
    }

    /// Wraps an existing ULID string without validation.
    #[must_use]
    pub fn from_existing(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ============================================================================
// SECTION: Proposal Identifiers
// ============================================================================

/// Proposal identifier assigned at proposal creation.
///
/// # Invariants
/// - Wire form is a UUID v4 string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProposalId(String);

impl ProposalId {
    /// Generates a fresh UUID v4 proposal identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Wraps an existing UUID string without validation.
    #[must_use]
    pub fn from_existing(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProposalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions may unwrap.")]

    use super::*;

    #[test]
    fn event_ids_are_unique_ulids() {
        let first = EventId::generate();
        let second = EventId::generate();
        assert_ne!(first, second);
        assert_eq!(first.as_str().len(), 26);
        // Crockford Base32: no I, L, O, U.
        assert!(first.as_str().chars().all(|ch| ch.is_ascii_alphanumeric()));
    }

    #[test]
    fn proposal_ids_are_unique() {
        assert_ne!(ProposalId::generate(), ProposalId::generate());
    }

    #[test]
    fn opaque_ids_serialize_transparently() {
        let id = ProjectId::new("proj-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"proj-1\"");
    }
}
