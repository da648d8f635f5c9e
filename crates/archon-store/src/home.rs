// crates/archon-store/src/home.rs
// ============================================================================
// Module: Archon Home Resolution
// Description: Resolution chain for the Archon state directory.
// Purpose: Locate per-operator state deterministically across environments.
// Dependencies: dirs, std
// ============================================================================

//! ## Overview
//! The Archon home directory resolves by precedence: explicit argument, then
//! `ARCHON_HOME`, then the legacy `ARCHON_STATE_DIR`, then a persisted
//! OS-config pointer file, then `~/.archon`. Directories are created on
//! demand by their consumers, not here.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::PathBuf;

/// Environment variable naming the Archon home directory.
pub const ARCHON_HOME_ENV: &str = "ARCHON_HOME";
/// Legacy environment variable naming the Archon home directory.
pub const ARCHON_STATE_DIR_ENV: &str = "ARCHON_STATE_DIR";

// ============================================================================
// SECTION: Resolution
// ============================================================================

/// Returns the OS-config pointer file, when the platform has a config dir.
fn config_pointer_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("archon").join("home"))
}

/// Reads the persisted home pointer, when present and non-empty.
fn persisted_home() -> Option<PathBuf> {
    let pointer = config_pointer_path()?;
    let raw = fs::read_to_string(pointer).ok()?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(PathBuf::from(trimmed))
    }
}

/// Resolves the Archon home directory.
///
/// Precedence: `explicit`, `ARCHON_HOME`, `ARCHON_STATE_DIR`, the persisted
/// OS-config pointer, then `~/.archon`. Falls back to a relative `.archon`
/// when no home directory can be determined at all.
#[must_use]
pub fn resolve_home(explicit: Option<PathBuf>) -> PathBuf {
    if let Some(path) = explicit {
        return path;
    }
    if let Ok(path) = env::var(ARCHON_HOME_ENV) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }
    if let Ok(path) = env::var(ARCHON_STATE_DIR_ENV) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }
    if let Some(path) = persisted_home() {
        return path;
    }
    dirs::home_dir().map_or_else(|| PathBuf::from(".archon"), |home| home.join(".archon"))
}

/// Persists the home pointer to the OS-config file.
///
/// # Errors
///
/// Returns an I/O error when the pointer cannot be written.
pub fn persist_home(path: &std::path::Path) -> std::io::Result<()> {
    let Some(pointer) = config_pointer_path() else {
        return Err(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "no OS config directory available",
        ));
    };
    if let Some(parent) = pointer.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(pointer, path.display().to_string())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
