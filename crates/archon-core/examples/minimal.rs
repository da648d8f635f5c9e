// crates/archon-core/examples/minimal.rs
// ============================================================================
// Module: Archon Minimal Example
// Description: Minimal end-to-end enforcement pass using in-memory pieces.
// Purpose: Demonstrate snapshot build, rule compilation, and a gated decision.
// Dependencies: archon-core
// ============================================================================

//! ## Overview
//! Builds a snapshot with one enabled module, one enabled capability, and an
//! allowlist rule, then pushes two actions through the execution gate. No
//! persistence and no adapters; decisions and the audit entries are printed.

#![allow(
    clippy::print_stdout,
    clippy::use_debug,
    reason = "Examples print their results."
)]

use std::collections::BTreeMap;
use std::sync::Arc;

use archon_core::ActiveSnapshot;
use archon_core::AgentId;
use archon_core::CapabilityDescriptor;
use archon_core::CapabilityId;
use archon_core::CapabilityInstance;
use archon_core::CapabilityKind;
use archon_core::ExecutionGate;
use archon_core::FixedClock;
use archon_core::ModuleId;
use archon_core::ModuleManifest;
use archon_core::ProjectId;
use archon_core::ResourceConfig;
use archon_core::RiskTier;
use archon_core::RuleId;
use archon_core::SnapshotBuilder;
use archon_core::SnapshotInputs;
use archon_core::dsl::compile_dsl;
use archon_core::hashing::DEFAULT_HASH_ALGORITHM;
use archon_core::hashing::hash_bytes;
use serde_json::json;

/// Example entry point.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Builder::new_current_thread().build()?;
    runtime.block_on(run())
}

/// Builds the snapshot and pushes two actions through the gate.
async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let manifest = ModuleManifest {
        module_id: ModuleId::new("filesystem"),
        version: "1.0.0".to_string(),
        description: "Filesystem capabilities".to_string(),
        author: "archon".to_string(),
        license: "Apache-2.0".to_string(),
        content_hash: None,
        capabilities: vec![CapabilityDescriptor {
            capability_id: CapabilityId::new("read"),
            kind: CapabilityKind::FsRead,
            tier: RiskTier::T1,
            params_schema: None,
            ack_required: false,
            default_enabled: false,
            hazards: Vec::new(),
        }],
        restriction_sources: Vec::new(),
        hazard_pairs: Vec::new(),
        profile_suggestions: Vec::new(),
    };

    let rule = compile_dsl(
        RuleId::new("docs-allow"),
        r#"allow fs.read where capability.params.path matches "./docs/**""#,
    )?;

    let clock = FixedClock::new("2026-01-01T00:00:00Z");
    let snapshot = SnapshotBuilder::build(
        SnapshotInputs {
            project_id: ProjectId::new("example"),
            manifests: vec![manifest],
            enabled_capabilities: vec![CapabilityKind::FsRead],
            drrs: vec![rule],
            resource_config: ResourceConfig::default(),
            engine_version: "0.1.0".to_string(),
            config_hash: hash_bytes(DEFAULT_HASH_ALGORITHM, b"example"),
            ack_epoch: 0,
        },
        &clock,
    );
    let active = ActiveSnapshot::new(snapshot)?;
    println!("rs_hash: {}", active.rs_hash);

    let gate = ExecutionGate::new(Arc::new(clock));
    let agent = AgentId::new("example-agent");

    for path in ["./docs/spec.md", "./src/main.rs"] {
        let action = CapabilityInstance {
            project_id: ProjectId::new("example"),
            module_id: ModuleId::new("filesystem"),
            capability_id: CapabilityId::new("read"),
            kind: "fs.read".to_string(),
            tier: RiskTier::T1,
            params: BTreeMap::from([("path".to_string(), json!(path))]),
        };
        let outcome = gate.invoke(&agent, &action, &active).await?;
        println!(
            "fs.read {path}: {:?} triggered={:?}",
            outcome.evaluation.decision, outcome.evaluation.triggered_rules
        );
    }
    Ok(())
}
