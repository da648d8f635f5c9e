// crates/archon-store/src/lib.rs
// ============================================================================
// Module: Archon Store
// Description: Per-project state, registries, proposals, and secrets.
// Purpose: Persist the mutable rule state the core turns into snapshots.
// Dependencies: aes-gcm, archon-core, async-trait, base64, dirs, rand,
// scrypt, serde, serde_json, thiserror, uuid
// ============================================================================

//! ## Overview
//! Archon Store owns everything mutable: project directories and their
//! isolated I/O handles, the registries that hold rule state, the proposal
//! queue that is the only sanctioned way to change that state, the encrypted
//! secret store, and the JSONL log sinks. The core stays pure; this crate is
//! where the filesystem lives.
//!
//! Security posture: all persisted state is untrusted on load; readers fail
//! closed or fall back to safe defaults, and secret plaintext never reaches
//! disk, logs, or snapshots.

// ============================================================================
// SECTION: Modules
// ============================================================================

/// Archon home directory resolution.
pub mod home;
/// State I/O facade with file and memory backends.
pub mod io;
/// Per-project lock registry.
pub mod locks;
/// JSONL log sinks.
pub mod logfile;
/// Governance proposal queue.
pub mod proposals;
/// Project CRUD and the active-project index.
pub mod project;
/// Per-project registries.
pub mod registry;
/// Encrypted secret store.
pub mod secrets;
/// Project state facade and snapshot wiring.
pub mod state;

// ============================================================================
// SECTION: Re-exports
// ============================================================================

pub use home::resolve_home;
pub use io::FileStateIo;
pub use io::MemoryStateIo;
pub use io::StateIo;
pub use io::StateIoError;
pub use io::StateIoExt;
pub use locks::project_lock;
pub use logfile::DECISIONS_LOG;
pub use logfile::JsonlLogSink;
pub use logfile::PROPOSAL_EVENTS_LOG;
pub use proposals::Actor;
pub use proposals::ActorKind;
pub use proposals::ApproveOptions;
pub use proposals::Proposal;
pub use proposals::ProposalChange;
pub use proposals::ProposalError;
pub use proposals::ProposalPreview;
pub use proposals::ProposalQueue;
pub use proposals::ProposalStatus;
pub use proposals::RuleSpec;
pub use project::ProjectIndex;
pub use project::ProjectRecord;
pub use project::ProjectStore;
pub use project::ProjectStoreError;
pub use registry::AckEvent;
pub use registry::AckStore;
pub use registry::CapabilityRegistry;
pub use registry::Confirmation;
pub use registry::HazardAckEvent;
pub use registry::ModuleRecord;
pub use registry::ModuleRegistry;
pub use registry::ModuleStatus;
pub use registry::ResourceStore;
pub use registry::RestrictionRegistry;
pub use secrets::SecretError;
pub use secrets::SecretMode;
pub use secrets::SecretStore;
pub use state::ProjectState;
pub use state::ProjectStateError;
pub use state::TYPED_ACK_TIERS;
pub use state::protocol_config_hash;
