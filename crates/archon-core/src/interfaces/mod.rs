// crates/archon-core/src/interfaces/mod.rs
// ============================================================================
// Module: Archon Interfaces
// Description: Backend-agnostic interfaces for adapters, handlers, and sinks.
// Purpose: Define the contract surfaces between the gate and the outside world.
// Dependencies: crate::core, async-trait, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The gate talks to the outside world exclusively through these traits.
//! Every adapter call carries an [`AdapterCallContext`] constructed by the
//! gate from its own validated state; handlers must use that context verbatim
//! and never construct their own. Adapters must refuse any call whose context
//! cannot be attributed to a validated action path, and must fail closed on
//! boundary violations the logical pre-checks cannot see (symlink escapes in
//! particular).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::core::action::CapabilityInstance;
use crate::core::decision::DecisionLogEntry;
use crate::core::identifiers::AgentId;
use crate::core::resource::ResourceConfig;
use crate::core::snapshot::RuleSnapshotHash;

// ============================================================================
// SECTION: Adapter Call Context
// ============================================================================

/// Context binding an adapter call to a validated action.
///
/// # Invariants
/// - Constructed only by the gate from its own validated state.
/// - Values are snapshots; adapters must not mutate them.
#[derive(Debug, Clone)]
pub struct AdapterCallContext {
    /// Agent attributed to the action.
    pub agent_id: AgentId,
    /// The validated capability instance.
    pub capability_instance: CapabilityInstance,
    /// Hash of the snapshot the decision was evaluated against.
    pub rs_hash: RuleSnapshotHash,
    /// Resource configuration in force for the action.
    pub resource_config: ResourceConfig,
}

// ============================================================================
// SECTION: Adapter Errors
// ============================================================================

/// Errors raised by concrete adapters.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// A resolved path escaped its declared root (symlink or rename race).
    #[error("path escapes declared root: {path}")]
    RootBoundary {
        /// The offending resolved path.
        path: String,
    },
    /// The call context could not be attributed to a validated action.
    #[error("adapter call refused: {0}")]
    Refused(String),
    /// Underlying I/O failed.
    #[error("adapter io error: {0}")]
    Io(String),
    /// The operation exceeded its timeout.
    #[error("adapter operation timed out after {0:?}")]
    Timeout(Duration),
}

// ============================================================================
// SECTION: Adapter Traits
// ============================================================================

/// Filesystem adapter for fs-family capabilities.
///
/// Implementations must resolve paths physically (`realpath`) and refuse any
/// resolution that leaves the declared roots, even when the logical pre-check
/// passed.
#[async_trait]
pub trait FsAdapter: Send + Sync {
    /// Reads a file within a declared root.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] on boundary violations or I/O failure.
    async fn read(&self, ctx: &AdapterCallContext, path: &str) -> Result<Vec<u8>, AdapterError>;

    /// Lists directory entries within a declared root.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] on boundary violations or I/O failure.
    async fn list(&self, ctx: &AdapterCallContext, path: &str)
    -> Result<Vec<String>, AdapterError>;

    /// Writes a file within a read-write root.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] on boundary violations or I/O failure.
    async fn write(
        &self,
        ctx: &AdapterCallContext,
        path: &str,
        contents: &[u8],
    ) -> Result<(), AdapterError>;

    /// Deletes a file within a read-write root.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] on boundary violations or I/O failure.
    async fn delete(&self, ctx: &AdapterCallContext, path: &str) -> Result<(), AdapterError>;
}

/// Network adapter for net-family capabilities.
#[async_trait]
pub trait NetAdapter: Send + Sync {
    /// Performs an HTTP fetch against an allowlisted host.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] on refusal or transport failure.
    async fn fetch(&self, ctx: &AdapterCallContext, url: &str) -> Result<Vec<u8>, AdapterError>;
}

/// Result of a subprocess run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutcome {
    /// Process exit code.
    pub exit_code: i32,
    /// Captured standard output.
    pub stdout: Vec<u8>,
    /// Captured standard error.
    pub stderr: Vec<u8>,
}

/// Exec adapter for subprocess capabilities.
///
/// The working directory always comes from the configured exec root; a
/// caller-supplied `cwd` param is silently overridden.
#[async_trait]
pub trait ExecAdapter: Send + Sync {
    /// Runs a subprocess under the configured exec root.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] on refusal, spawn failure, or timeout; the
    /// timeout terminates the subprocess.
    async fn run(
        &self,
        ctx: &AdapterCallContext,
        command: &str,
        args: &[String],
        timeout: Option<Duration>,
    ) -> Result<ExecOutcome, AdapterError>;
}

/// Secrets adapter for secret-consuming capabilities.
///
/// Plaintext never reaches logs or snapshots; adapters hand secrets to their
/// consumers without echoing them back through the gate.
#[async_trait]
pub trait SecretsAdapter: Send + Sync {
    /// Resolves a secret for in-process use.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when the key is absent or decryption fails.
    async fn use_secret(&self, ctx: &AdapterCallContext, key: &str)
    -> Result<String, AdapterError>;
}

/// Messaging adapter for agent-to-agent capabilities.
#[async_trait]
pub trait MessagingAdapter: Send + Sync {
    /// Delivers a message to another agent.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when delivery fails.
    async fn send(
        &self,
        ctx: &AdapterCallContext,
        recipient: &AgentId,
        body: &Value,
    ) -> Result<(), AdapterError>;
}

/// UI adapter for operator-facing capabilities.
#[async_trait]
pub trait UiAdapter: Send + Sync {
    /// Presents a notification to the operator.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when the surface is unavailable.
    async fn notify(&self, ctx: &AdapterCallContext, message: &str) -> Result<(), AdapterError>;
}

// ============================================================================
// SECTION: Adapter Bundle
// ============================================================================

/// Capability-kind-grouped adapters handed to every handler.
///
/// # Invariants
/// - Absent adapters simply leave the corresponding kinds without an
///   execution path; the decision log is still written.
#[derive(Default, Clone)]
pub struct AdapterBundle {
    /// Filesystem adapter.
    pub fs: Option<Arc<dyn FsAdapter>>,
    /// Network adapter.
    pub net: Option<Arc<dyn NetAdapter>>,
    /// Exec adapter.
    pub exec: Option<Arc<dyn ExecAdapter>>,
    /// Secrets adapter.
    pub secrets: Option<Arc<dyn SecretsAdapter>>,
    /// Messaging adapter.
    pub messaging: Option<Arc<dyn MessagingAdapter>>,
    /// UI adapter.
    pub ui: Option<Arc<dyn UiAdapter>>,
}

impl std::fmt::Debug for AdapterBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterBundle")
            .field("fs", &self.fs.is_some())
            .field("net", &self.net.is_some())
            .field("exec", &self.exec.is_some())
            .field("secrets", &self.secrets.is_some())
            .field("messaging", &self.messaging.is_some())
            .field("ui", &self.ui.is_some())
            .finish()
    }
}

// ============================================================================
// SECTION: Capability Handlers
// ============================================================================

/// Handler failure reported in-band through the gate outcome.
///
/// # Invariants
/// - A handler failure never suppresses the decision-log append and never
///   changes the decision.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// An adapter call failed.
    #[error(transparent)]
    Adapter(#[from] AdapterError),
    /// The handler rejected its own inputs.
    #[error("handler failed: {0}")]
    Failed(String),
}

/// Executes a permitted capability instance.
#[async_trait]
pub trait CapabilityHandler: Send + Sync {
    /// Executes the action described by the context.
    ///
    /// Handlers must use the provided context verbatim for all adapter calls.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError`] when execution fails; the gate records the
    /// failure without altering the decision.
    async fn handle(
        &self,
        ctx: &AdapterCallContext,
        adapters: &AdapterBundle,
    ) -> Result<Value, HandlerError>;
}

// ============================================================================
// SECTION: Decision Sink
// ============================================================================

/// Errors raised when appending to the audit log.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum AuditError {
    /// The sink could not serialize or persist the record.
    #[error("audit append failed: {0}")]
    Append(String),
}

/// Append-only sink for decision-log entries.
///
/// Implementations must not buffer in a way that can lose an acknowledged
/// append.
#[async_trait]
pub trait DecisionSink: Send + Sync {
    /// Appends one decision-log entry.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError`] when the append fails; the gate escalates this
    /// to a kernel integrity failure.
    async fn append(&self, entry: &DecisionLogEntry) -> Result<(), AuditError>;
}
