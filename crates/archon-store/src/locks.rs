// crates/archon-store/src/locks.rs
// ============================================================================
// Module: Archon Project Locks
// Description: Process-wide per-project lock registry.
// Purpose: Serialize mutating registry operations within a process.
// Dependencies: archon-core, std
// ============================================================================

//! ## Overview
//! One lock per project, created on first access and retained for the
//! process lifetime; idle entries are harmless. Read paths, including
//! snapshot builds, do not take the lock. There is no cross-project lock:
//! project isolation is the substitute.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::OnceLock;

use archon_core::ProjectId;

/// Process-wide lock table keyed by project id.
static LOCKS: OnceLock<Mutex<HashMap<ProjectId, Arc<Mutex<()>>>>> = OnceLock::new();

/// Returns the mutation lock for a project, creating it on first access.
#[must_use]
pub fn project_lock(project_id: &ProjectId) -> Arc<Mutex<()>> {
    let table = LOCKS.get_or_init(|| Mutex::new(HashMap::new()));
    let mut table = match table.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    table.entry(project_id.clone()).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
}

// ============================================================================
// SECTION: Tests
// ============================================================================
