// crates/archon-store/tests/end_to_end.rs
// ============================================================================
// Module: End-to-End Governance Tests
// Description: Full-stack scenarios from proposal to gated, audited decision.
// Purpose: Exercise the store, snapshot build, gate, and log reader together.
// Dependencies: archon-core, archon-store, tokio
// ============================================================================

//! End-to-end scenarios: a fresh project denies everything; an allowlisted
//! path permits with its rule id; a path outside the allowlist denies with
//! no id (allowlist exhaustion); a deny rule overrides the allow; and every
//! decision lands exactly once in the project's decision log.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::collections::BTreeMap;
use std::sync::Arc;

use archon_core::AgentId;
use archon_core::CapabilityDescriptor;
use archon_core::CapabilityId;
use archon_core::CapabilityInstance;
use archon_core::CapabilityKind;
use archon_core::Decision;
use archon_core::ExecutionGate;
use archon_core::FixedClock;
use archon_core::ModuleId;
use archon_core::ModuleManifest;
use archon_core::ProjectId;
use archon_core::RiskTier;
use archon_core::RuleId;
use archon_store::Actor;
use archon_store::ActorKind;
use archon_store::ApproveOptions;
use archon_store::JsonlLogSink;
use archon_store::MemoryStateIo;
use archon_store::ProjectState;
use archon_store::ProposalChange;
use archon_store::ProposalQueue;
use archon_store::RuleSpec;
use archon_store::SecretStore;
use archon_store::StateIo;
use serde_json::json;

fn operator() -> Actor {
    Actor {
        kind: ActorKind::Human,
        id: "operator".to_string(),
    }
}

fn filesystem_manifest() -> ModuleManifest {
    ModuleManifest {
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
    }
}

fn read_action(project: &str, path: &str) -> CapabilityInstance {
    CapabilityInstance {
        project_id: ProjectId::new(project),
        module_id: ModuleId::new("filesystem"),
        capability_id: CapabilityId::new("read"),
        kind: "fs.read".to_string(),
        tier: RiskTier::T1,
        params: BTreeMap::from([("path".to_string(), json!(path))]),
    }
}

/// Approves a change through the queue, panicking on refusal.
fn apply(
    queue: &ProposalQueue,
    state: &mut ProjectState,
    secrets: &SecretStore,
    change: ProposalChange,
) {
    let proposal = queue.create(change, operator(), state).unwrap();
    let opts = ApproveOptions {
        typed_ack_phrase: proposal.preview.required_ack_phrase.clone(),
        hazard_confirmed_pairs: proposal.preview.hazards_triggered.clone(),
        ..ApproveOptions::default()
    };
    queue.approve(&proposal.id, &opts, &operator(), state, secrets).unwrap();
}

#[tokio::test]
async fn fresh_project_denies_and_logs() {
    let io = Arc::new(MemoryStateIo::new());
    let state = ProjectState::open(ProjectId::new("p1"), io.clone() as Arc<dyn StateIo>).unwrap();
    let clock = Arc::new(FixedClock::new("2026-01-01T00:00:00Z"));
    let active = state.build_snapshot("0.1.0", clock.as_ref()).unwrap();

    let sink = JsonlLogSink::decisions(io.clone() as Arc<dyn StateIo>);
    let gate = ExecutionGate::new(clock).with_sink(Arc::new(sink.clone()));

    let outcome =
        gate.invoke(&AgentId::new("agent-1"), &read_action("p1", "/tmp/x"), &active).await.unwrap();
    assert_eq!(outcome.evaluation.decision, Decision::Deny);
    assert!(outcome.evaluation.triggered_rules.is_empty());

    let logged = sink.read().unwrap();
    assert_eq!(logged.events.len(), 1);
    assert_eq!(
        logged.events[0].get("decision").and_then(|value| value.as_str()),
        Some("Deny")
    );
}

#[tokio::test]
async fn allowlist_permit_exhaustion_and_deny_override() {
    let io = Arc::new(MemoryStateIo::new());
    let mut state =
        ProjectState::open(ProjectId::new("p1"), io.clone() as Arc<dyn StateIo>).unwrap();
    let clock = Arc::new(FixedClock::new("2026-01-01T00:00:00Z"));
    let queue = ProposalQueue::new(io.clone() as Arc<dyn StateIo>, "0.1.0", clock.clone());
    let home = tempfile::tempdir().unwrap();
    let secrets = SecretStore::new(io.clone() as Arc<dyn StateIo>, home.path());

    state.modules.register(filesystem_manifest()).unwrap();
    apply(&queue, &mut state, &secrets, ProposalChange::EnableModule {
        module_id: ModuleId::new("filesystem"),
    });
    apply(&queue, &mut state, &secrets, ProposalChange::EnableCapability {
        capability_kind: CapabilityKind::FsRead,
    });
    apply(&queue, &mut state, &secrets, ProposalChange::SetRestrictions {
        capability_kind: CapabilityKind::FsRead,
        rules: vec![RuleSpec {
            id: RuleId::new("docs-allow"),
            source: r#"allow fs.read where capability.params.path matches "./docs/**""#
                .to_string(),
        }],
    });

    let active = state.build_snapshot("0.1.0", clock.as_ref()).unwrap();
    let sink = JsonlLogSink::decisions(io.clone() as Arc<dyn StateIo>);
    let gate = ExecutionGate::new(clock.clone()).with_sink(Arc::new(sink.clone()));
    let agent = AgentId::new("agent-1");

    // Allowlisted path permits with the matching rule id.
    let permitted =
        gate.invoke(&agent, &read_action("p1", "./docs/spec.md"), &active).await.unwrap();
    assert_eq!(permitted.evaluation.decision, Decision::Permit);
    assert_eq!(permitted.evaluation.triggered_rules, vec!["docs-allow".to_string()]);

    // Outside the allowlist: deny with no triggered id.
    let exhausted =
        gate.invoke(&agent, &read_action("p1", "./src/main.c"), &active).await.unwrap();
    assert_eq!(exhausted.evaluation.decision, Decision::Deny);
    assert!(exhausted.evaluation.triggered_rules.is_empty());

    // Add a deny override and rebuild the snapshot.
    apply(&queue, &mut state, &secrets, ProposalChange::SetRestrictions {
        capability_kind: CapabilityKind::FsRead,
        rules: vec![
            RuleSpec {
                id: RuleId::new("docs-allow"),
                source: r#"allow fs.read where capability.params.path matches "./docs/**""#
                    .to_string(),
            },
            RuleSpec {
                id: RuleId::new("secret-deny"),
                source:
                    r#"deny fs.read where capability.params.path matches "./docs/secret.**""#
                        .to_string(),
            },
        ],
    });
    let rebuilt = state.build_snapshot("0.1.0", clock.as_ref()).unwrap();
    assert_ne!(active.rs_hash, rebuilt.rs_hash);

    let denied =
        gate.invoke(&agent, &read_action("p1", "./docs/secret.txt"), &rebuilt).await.unwrap();
    assert_eq!(denied.evaluation.decision, Decision::Deny);
    assert_eq!(denied.evaluation.triggered_rules, vec!["secret-deny".to_string()]);

    // Exactly one log line per gate invocation.
    let logged = sink.read().unwrap();
    assert_eq!(logged.events.len(), 3);
    assert_eq!(logged.stats.duplicates, 0);
}

#[tokio::test]
async fn cross_project_actions_are_denied_with_project_mismatch() {
    let io = Arc::new(MemoryStateIo::new());
    let state = ProjectState::open(ProjectId::new("p1"), io.clone() as Arc<dyn StateIo>).unwrap();
    let clock = Arc::new(FixedClock::new("2026-01-01T00:00:00Z"));
    let active = state.build_snapshot("0.1.0", clock.as_ref()).unwrap();
    let gate = ExecutionGate::new(clock);

    let outcome = gate
        .invoke(&AgentId::new("agent-1"), &read_action("p2", "./docs/spec.md"), &active)
        .await
        .unwrap();
    assert_eq!(outcome.evaluation.decision, Decision::Deny);
    assert_eq!(outcome.evaluation.triggered_rules, vec!["project_mismatch".to_string()]);
}
