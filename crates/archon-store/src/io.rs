// crates/archon-store/src/io.rs
// ============================================================================
// Module: Archon State I/O
// Description: Project-scoped persistence facade with file and memory backends.
// Purpose: Isolate per-project state behind one narrow, testable surface.
// Dependencies: serde, serde_json, thiserror, std
// ============================================================================

//! ## Overview
//! Every registry reads and writes through a [`StateIo`] handle scoped to one
//! project; two projects' handles are disjoint, which is what enforces
//! project isolation at the storage layer. The file backend keeps state under
//! `state/*.json` and logs under `logs/*.jsonl`, writes best-effort
//! atomically (write-to-temp then rename), and tolerates absent files by
//! returning the caller's default. The memory backend mirrors the same
//! semantics for tests.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// State I/O errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum StateIoError {
    /// Underlying I/O failed.
    #[error("state io error for {name}: {detail}")]
    Io {
        /// State or log name involved.
        name: String,
        /// Failure detail.
        detail: String,
    },
    /// Stored content failed to parse or serialize.
    #[error("state serialization error for {name}: {detail}")]
    Serde {
        /// State or log name involved.
        name: String,
        /// Failure detail.
        detail: String,
    },
}

// ============================================================================
// SECTION: StateIo Trait
// ============================================================================

/// Project-scoped persistence facade.
///
/// Names are bare (no extension); the backend maps state names to
/// `state/<name>.json` and log names to `logs/<name>.jsonl` or their
/// in-memory equivalents.
pub trait StateIo: Send + Sync {
    /// Reads a state document, or `None` when absent.
    ///
    /// # Errors
    ///
    /// Returns [`StateIoError`] on I/O or parse failure.
    fn read_value(&self, name: &str) -> Result<Option<Value>, StateIoError>;

    /// Writes a state document atomically.
    ///
    /// # Errors
    ///
    /// Returns [`StateIoError`] on I/O failure.
    fn write_value(&self, name: &str, value: &Value) -> Result<(), StateIoError>;

    /// Appends one line to a log.
    ///
    /// # Errors
    ///
    /// Returns [`StateIoError`] on I/O failure.
    fn append_line(&self, log_name: &str, line: &str) -> Result<(), StateIoError>;

    /// Reads raw log content, or the empty string when absent.
    ///
    /// # Errors
    ///
    /// Returns [`StateIoError`] on I/O failure.
    fn read_log_raw(&self, log_name: &str) -> Result<String, StateIoError>;
}

/// Typed helpers over any [`StateIo`] backend.
pub trait StateIoExt: StateIo {
    /// Reads a typed state document, falling back to `default` when absent.
    ///
    /// # Errors
    ///
    /// Returns [`StateIoError`] on I/O or deserialization failure.
    fn read_json<T: DeserializeOwned>(&self, name: &str, default: T) -> Result<T, StateIoError> {
        match self.read_value(name)? {
            Some(value) => serde_json::from_value(value).map_err(|err| StateIoError::Serde {
                name: name.to_string(),
                detail: err.to_string(),
            }),
            None => Ok(default),
        }
    }

    /// Writes a typed state document.
    ///
    /// # Errors
    ///
    /// Returns [`StateIoError`] on serialization or I/O failure.
    fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<(), StateIoError> {
        let value = serde_json::to_value(value).map_err(|err| StateIoError::Serde {
            name: name.to_string(),
            detail: err.to_string(),
        })?;
        self.write_value(name, &value)
    }
}

impl<T: StateIo + ?Sized> StateIoExt for T {}

// ============================================================================
// SECTION: Memory Backend
// ============================================================================

/// In-memory backend for tests.
#[derive(Debug, Default)]
pub struct MemoryStateIo {
    /// State documents by name.
    state: Mutex<HashMap<String, Value>>,
    /// Log contents by name.
    logs: Mutex<HashMap<String, String>>,
}

impl MemoryStateIo {
    /// Creates an empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Maps a poisoned-lock failure into a stable error.
fn poisoned(name: &str) -> StateIoError {
    StateIoError::Io {
        name: name.to_string(),
        detail: "state lock poisoned".to_string(),
    }
}

impl StateIo for MemoryStateIo {
    fn read_value(&self, name: &str) -> Result<Option<Value>, StateIoError> {
        Ok(self.state.lock().map_err(|_| poisoned(name))?.get(name).cloned())
    }

    fn write_value(&self, name: &str, value: &Value) -> Result<(), StateIoError> {
        self.state.lock().map_err(|_| poisoned(name))?.insert(name.to_string(), value.clone());
        Ok(())
    }

    fn append_line(&self, log_name: &str, line: &str) -> Result<(), StateIoError> {
        let mut logs = self.logs.lock().map_err(|_| poisoned(log_name))?;
        let content = logs.entry(log_name.to_string()).or_default();
        content.push_str(line);
        content.push('\n');
        Ok(())
    }

    fn read_log_raw(&self, log_name: &str) -> Result<String, StateIoError> {
        Ok(self.logs.lock().map_err(|_| poisoned(log_name))?.get(log_name).cloned().unwrap_or_default())
    }
}

// ============================================================================
// SECTION: File Backend
// ============================================================================

/// File-backed state I/O rooted at one project directory.
#[derive(Debug, Clone)]
pub struct FileStateIo {
    /// Project directory holding `state/` and `logs/`.
    root: PathBuf,
}

impl FileStateIo {
    /// Creates a backend rooted at the project directory.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
        }
    }

    /// Returns the path of a state document.
    fn state_path(&self, name: &str) -> PathBuf {
        self.root.join("state").join(format!("{name}.json"))
    }

    /// Returns the path of a log file.
    fn log_path(&self, name: &str) -> PathBuf {
        self.root.join("logs").join(format!("{name}.jsonl"))
    }

    /// Creates the parent directory of a path on demand.
    fn ensure_parent(path: &Path, name: &str) -> Result<(), StateIoError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| StateIoError::Io {
                name: name.to_string(),
                detail: err.to_string(),
            })?;
        }
        Ok(())
    }
}

impl StateIo for FileStateIo {
    fn read_value(&self, name: &str) -> Result<Option<Value>, StateIoError> {
        let path = self.state_path(name);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(StateIoError::Io {
                    name: name.to_string(),
                    detail: err.to_string(),
                });
            }
        };
        serde_json::from_str(&raw).map(Some).map_err(|err| StateIoError::Serde {
            name: name.to_string(),
            detail: err.to_string(),
        })
    }

    fn write_value(&self, name: &str, value: &Value) -> Result<(), StateIoError> {
        let path = self.state_path(name);
        Self::ensure_parent(&path, name)?;
        let io_err = |err: std::io::Error| StateIoError::Io {
            name: name.to_string(),
            detail: err.to_string(),
        };
        let rendered = serde_json::to_string_pretty(value).map_err(|err| StateIoError::Serde {
            name: name.to_string(),
            detail: err.to_string(),
        })?;
        // Best-effort atomicity: write to a sibling temp file, then rename.
        let temp = path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&temp).map_err(io_err)?;
            file.write_all(rendered.as_bytes()).map_err(io_err)?;
            file.sync_all().map_err(io_err)?;
        }
        fs::rename(&temp, &path).map_err(io_err)
    }

    fn append_line(&self, log_name: &str, line: &str) -> Result<(), StateIoError> {
        let path = self.log_path(log_name);
        Self::ensure_parent(&path, log_name)?;
        let io_err = |err: std::io::Error| StateIoError::Io {
            name: log_name.to_string(),
            detail: err.to_string(),
        };
        let mut file =
            fs::OpenOptions::new().create(true).append(true).open(&path).map_err(io_err)?;
        file.write_all(line.as_bytes()).map_err(io_err)?;
        file.write_all(b"\n").map_err(io_err)?;
        file.flush().map_err(io_err)
    }

    fn read_log_raw(&self, log_name: &str) -> Result<String, StateIoError> {
        match fs::read_to_string(self.log_path(log_name)) {
            Ok(raw) => Ok(raw),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(err) => Err(StateIoError::Io {
                name: log_name.to_string(),
                detail: err.to_string(),
            }),
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions may unwrap.")]

    use serde_json::json;

    use super::*;

    #[test]
    fn memory_backend_round_trips_state() {
        let io = MemoryStateIo::new();
        assert_eq!(io.read_json::<Vec<String>>("missing", Vec::new()).unwrap(), Vec::<String>::new());
        io.write_json("list", &vec!["a".to_string()]).unwrap();
        assert_eq!(io.read_json::<Vec<String>>("list", Vec::new()).unwrap(), vec!["a".to_string()]);
    }

    #[test]
    fn memory_backend_appends_lines() {
        let io = MemoryStateIo::new();
        io.append_line("events", "{\"a\":1}").unwrap();
        io.append_line("events", "{\"b\":2}").unwrap();
        assert_eq!(io.read_log_raw("events").unwrap(), "{\"a\":1}\n{\"b\":2}\n");
    }

    #[test]
    fn file_backend_round_trips_under_project_layout() {
        let dir = tempfile::tempdir().unwrap();
        let io = FileStateIo::new(dir.path());
        io.write_value("enabled-modules", &json!(["m1"])).unwrap();
        assert!(dir.path().join("state/enabled-modules.json").is_file());
        assert_eq!(io.read_value("enabled-modules").unwrap(), Some(json!(["m1"])));

        io.append_line("decisions", "{\"event_id\":\"x\"}").unwrap();
        assert!(dir.path().join("logs/decisions.jsonl").is_file());
        assert_eq!(io.read_log_raw("decisions").unwrap(), "{\"event_id\":\"x\"}\n");
    }

    #[test]
    fn file_backend_tolerates_absent_files() {
        let dir = tempfile::tempdir().unwrap();
        let io = FileStateIo::new(dir.path());
        assert_eq!(io.read_value("missing").unwrap(), None);
        assert_eq!(io.read_log_raw("missing").unwrap(), "");
    }
}
