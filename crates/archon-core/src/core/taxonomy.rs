// crates/archon-core/src/core/taxonomy.rs
// ============================================================================
// Module: Archon Capability Taxonomy
// Description: Closed capability-kind enum and risk tiers.
// Purpose: Provide the single authoritative vocabulary for governable actions.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! The taxonomy is a closed set: adding a capability kind is a taxonomy
//! change, not a runtime change. Every component that consumes a kind parses
//! it through this module, so an unknown kind can never travel past a parse
//! boundary unnoticed. Risk tiers carry a total order used by the typed
//! acknowledgment protocol.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Capability Kinds
// ============================================================================

/// Closed set of capability kinds governable by Archon.
///
/// # Invariants
/// - Wire forms are stable; adding a variant is a taxonomy change.
/// - Every variant maps to exactly one wire string and back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CapabilityKind {
    /// Read a file within a declared root.
    #[serde(rename = "fs.read")]
    FsRead,
    /// List directory entries within a declared root.
    #[serde(rename = "fs.list")]
    FsList,
    /// Write a file within a declared root.
    #[serde(rename = "fs.write")]
    FsWrite,
    /// Delete a file within a declared root.
    #[serde(rename = "fs.delete")]
    FsDelete,
    /// Perform an HTTP fetch against an allowlisted host.
    #[serde(rename = "net.fetch.http")]
    NetFetchHttp,
    /// Open a raw egress connection to an allowlisted host.
    #[serde(rename = "net.egress.raw")]
    NetEgressRaw,
    /// Run a subprocess under the configured exec root.
    #[serde(rename = "exec.run")]
    ExecRun,
    /// Use a stored secret without revealing it.
    #[serde(rename = "secrets.use")]
    SecretsUse,
    /// Inject a stored secret into a subprocess environment.
    #[serde(rename = "secrets.inject_env")]
    SecretsInjectEnv,
    /// Spawn a delegated agent.
    #[serde(rename = "agent.spawn")]
    AgentSpawn,
    /// Send a message to another agent.
    #[serde(rename = "agent.message")]
    AgentMessage,
    /// Invoke model inference.
    #[serde(rename = "llm.infer")]
    LlmInfer,
    /// Interact with the operator-facing UI surface.
    #[serde(rename = "ui.*")]
    Ui,
}

/// All capability kinds in wire-string order, used for exhaustive iteration.
pub const ALL_CAPABILITY_KINDS: [CapabilityKind; 13] = [
    CapabilityKind::AgentMessage,
    CapabilityKind::AgentSpawn,
    CapabilityKind::ExecRun,
    CapabilityKind::FsDelete,
    CapabilityKind::FsList,
    CapabilityKind::FsRead,
    CapabilityKind::FsWrite,
    CapabilityKind::LlmInfer,
    CapabilityKind::NetEgressRaw,
    CapabilityKind::NetFetchHttp,
    CapabilityKind::SecretsInjectEnv,
    CapabilityKind::SecretsUse,
    CapabilityKind::Ui,
];

impl CapabilityKind {
    /// Returns the stable wire form of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FsRead => "fs.read",
            Self::FsList => "fs.list",
            Self::FsWrite => "fs.write",
            Self::FsDelete => "fs.delete",
            Self::NetFetchHttp => "net.fetch.http",
            Self::NetEgressRaw => "net.egress.raw",
            Self::ExecRun => "exec.run",
            Self::SecretsUse => "secrets.use",
            Self::SecretsInjectEnv => "secrets.inject_env",
            Self::AgentSpawn => "agent.spawn",
            Self::AgentMessage => "agent.message",
            Self::LlmInfer => "llm.infer",
            Self::Ui => "ui.*",
        }
    }

    /// Returns the declared risk tier for the kind.
    #[must_use]
    pub const fn default_tier(self) -> RiskTier {
        match self {
            Self::FsList | Self::Ui => RiskTier::T0,
            Self::FsRead | Self::AgentMessage | Self::LlmInfer => RiskTier::T1,
            Self::FsWrite | Self::NetFetchHttp | Self::SecretsUse | Self::AgentSpawn => {
                RiskTier::T2
            }
            Self::FsDelete | Self::NetEgressRaw | Self::ExecRun | Self::SecretsInjectEnv => {
                RiskTier::T3
            }
        }
    }

    /// Returns true for filesystem-family kinds subject to fs-root checks.
    #[must_use]
    pub const fn is_fs_family(self) -> bool {
        matches!(self, Self::FsRead | Self::FsList | Self::FsWrite | Self::FsDelete)
    }

    /// Returns true for kinds that mutate the filesystem.
    #[must_use]
    pub const fn is_fs_mutation(self) -> bool {
        matches!(self, Self::FsWrite | Self::FsDelete)
    }

    /// Returns true for network-family kinds subject to allowlist checks.
    #[must_use]
    pub const fn is_net_family(self) -> bool {
        matches!(self, Self::NetFetchHttp | Self::NetEgressRaw)
    }

    /// Returns true for exec-family kinds subject to exec-root checks.
    #[must_use]
    pub const fn is_exec_family(self) -> bool {
        matches!(self, Self::ExecRun)
    }
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a wire string is outside the closed taxonomy.
///
/// # Invariants
/// - Carries the rejected input verbatim for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCapabilityKind {
    /// The rejected wire string.
    pub raw: String,
}

impl fmt::Display for UnknownCapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown capability kind: {}", self.raw)
    }
}

impl std::error::Error for UnknownCapabilityKind {}

impl FromStr for CapabilityKind {
    type Err = UnknownCapabilityKind;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        for kind in ALL_CAPABILITY_KINDS {
            if kind.as_str() == raw {
                return Ok(kind);
            }
        }
        Err(UnknownCapabilityKind {
            raw: raw.to_string(),
        })
    }
}

// ============================================================================
// SECTION: Risk Tiers
// ============================================================================

/// Risk tier classification with total order T0 < T1 < T2 < T3.
///
/// # Invariants
/// - `Ord` reflects the risk ordering; T3 is the highest tier.
/// - Wire forms are stable (`"T0"` .. `"T3"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskTier {
    /// Negligible risk.
    T0,
    /// Low risk.
    T1,
    /// Elevated risk.
    T2,
    /// High risk; enabling requires a typed acknowledgment.
    T3,
}

impl RiskTier {
    /// Returns the stable wire form of the tier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::T0 => "T0",
            Self::T1 => "T1",
            Self::T2 => "T2",
            Self::T3 => "T3",
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
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
    fn wire_forms_round_trip() {
        for kind in ALL_CAPABILITY_KINDS {
            let parsed: CapabilityKind = kind.as_str().parse().unwrap();
            assert_eq!(parsed, kind);
        }
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let err = "fs.move".parse::<CapabilityKind>().unwrap_err();
        assert_eq!(err.raw, "fs.move");
    }

    #[test]
    fn tiers_are_totally_ordered() {
        assert!(RiskTier::T0 < RiskTier::T1);
        assert!(RiskTier::T1 < RiskTier::T2);
        assert!(RiskTier::T2 < RiskTier::T3);
    }

    #[test]
    fn serde_uses_wire_forms() {
        let json = serde_json::to_string(&CapabilityKind::NetFetchHttp).unwrap();
        assert_eq!(json, "\"net.fetch.http\"");
        let kind: CapabilityKind = serde_json::from_str("\"ui.*\"").unwrap();
        assert_eq!(kind, CapabilityKind::Ui);
    }
}
