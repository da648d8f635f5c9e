// crates/archon-store/src/registry/mod.rs
// ============================================================================
// Module: Archon Registries
// Description: Per-project registries over the state I/O facade.
// Purpose: Own the mutable rule state the snapshot builder reads from.
// Dependencies: submodules only
// ============================================================================

//! ## Overview
//! Each registry reads from and writes to an injected project-scoped
//! [`crate::io::StateIo`]. Mutating operations require an explicit
//! confirmation so no governance change happens as a side effect, and every
//! persisted list is written in sorted canonical form.

use serde::Deserialize;
use serde::Serialize;

/// Acknowledgment event stores.
pub mod acks;
/// Enabled capability-kind registry.
pub mod capabilities;
/// Module manifest registry.
pub mod modules;
/// Resource configuration store.
pub mod resources;
/// Restriction rule registry.
pub mod restrictions;

pub use acks::AckEvent;
pub use acks::AckStore;
pub use acks::HazardAckEvent;
pub use capabilities::CapabilityRegistry;
pub use modules::ModuleRecord;
pub use modules::ModuleRegistry;
pub use modules::ModuleStatus;
pub use resources::ResourceStore;
pub use restrictions::RestrictionRegistry;

/// Explicit confirmation required by mutating registry operations.
///
/// # Invariants
/// - Operations fail when `confirmed` is false; there is no default-on path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirmation {
    /// True when the caller explicitly confirmed the mutation.
    pub confirmed: bool,
}

impl Confirmation {
    /// A positive confirmation.
    pub const CONFIRMED: Self = Self {
        confirmed: true,
    };
}
