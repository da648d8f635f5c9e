// crates/archon-core/tests/invariants.rs
// ============================================================================
// Module: Kernel Invariant Tests
// Description: Scenario tests for the quantified kernel invariants.
// Purpose: Pin deny-by-default, isolation, determinism, and ack sensitivity.
// Dependencies: archon-core
// ============================================================================

//! Scenario tests covering the kernel's quantified invariants end to end:
//! deny-by-default over every kind, project isolation, snapshot determinism
//! across input reordering, and ack-epoch sensitivity of the snapshot hash.

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

use archon_core::ALL_CAPABILITY_KINDS;
use archon_core::CapabilityDescriptor;
use archon_core::CapabilityId;
use archon_core::CapabilityInstance;
use archon_core::CapabilityKind;
use archon_core::Condition;
use archon_core::ConditionOp;
use archon_core::Decision;
use archon_core::DrrEffect;
use archon_core::FixedClock;
use archon_core::ModuleId;
use archon_core::ModuleManifest;
use archon_core::ProjectId;
use archon_core::ResourceConfig;
use archon_core::RuleId;
use archon_core::RuleSnapshot;
use archon_core::SnapshotBuilder;
use archon_core::SnapshotInputs;
use archon_core::ValidationEngine;
use archon_core::compile_structured;
use archon_core::hashing::DEFAULT_HASH_ALGORITHM;
use archon_core::hashing::hash_bytes;
use serde_json::json;

fn manifest(module: &str, kind: CapabilityKind) -> ModuleManifest {
    ModuleManifest {
        module_id: ModuleId::new(module),
        version: "1.0.0".to_string(),
        description: String::new(),
        author: String::new(),
        license: "Apache-2.0".to_string(),
        content_hash: None,
        capabilities: vec![CapabilityDescriptor {
            capability_id: CapabilityId::new("cap"),
            kind,
            tier: kind.default_tier(),
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

fn empty_snapshot() -> RuleSnapshot {
    SnapshotBuilder::build(
        SnapshotInputs {
            project_id: ProjectId::new("p1"),
            manifests: Vec::new(),
            enabled_capabilities: Vec::new(),
            drrs: Vec::new(),
            resource_config: ResourceConfig::default(),
            engine_version: "0.1.0".to_string(),
            config_hash: hash_bytes(DEFAULT_HASH_ALGORITHM, b"cfg"),
            ack_epoch: 0,
        },
        &FixedClock::new("2026-01-01T00:00:00Z"),
    )
}

fn action_of(kind: CapabilityKind) -> CapabilityInstance {
    CapabilityInstance {
        project_id: ProjectId::new("p1"),
        module_id: ModuleId::new("m"),
        capability_id: CapabilityId::new("cap"),
        kind: kind.as_str().to_string(),
        tier: kind.default_tier(),
        params: BTreeMap::from([("path".to_string(), json!("/tmp/x"))]),
    }
}

#[test]
fn deny_by_default_holds_for_every_kind() {
    let snapshot = empty_snapshot();
    for kind in ALL_CAPABILITY_KINDS {
        let evaluation = ValidationEngine.evaluate(&action_of(kind), &snapshot);
        assert_eq!(evaluation.decision, Decision::Deny, "kind {kind} must deny");
        assert!(evaluation.triggered_rules.is_empty(), "kind {kind} carries no triggered id");
    }
}

#[test]
fn taxonomy_soundness_denies_foreign_kinds() {
    let snapshot = empty_snapshot();
    for raw in ["fs.move", "net.listen", "", "FS.READ", "exec"] {
        let mut action = action_of(CapabilityKind::FsRead);
        action.kind = raw.to_string();
        let evaluation = ValidationEngine.evaluate(&action, &snapshot);
        assert_eq!(evaluation.decision, Decision::Deny, "kind {raw:?} must deny");
        assert_eq!(evaluation.triggered_rules, vec!["unknown_capability_kind".to_string()]);
    }
}

#[test]
fn project_isolation_denies_with_project_mismatch() {
    let snapshot = empty_snapshot();
    let mut action = action_of(CapabilityKind::FsRead);
    action.project_id = ProjectId::new("p2");
    let evaluation = ValidationEngine.evaluate(&action, &snapshot);
    assert_eq!(evaluation.decision, Decision::Deny);
    assert_eq!(evaluation.triggered_rules, vec!["project_mismatch".to_string()]);
}

#[test]
fn snapshot_hash_is_invariant_under_input_reordering() {
    let clock = FixedClock::new("2026-01-01T00:00:00Z");
    let rule_x = compile_structured(
        RuleId::new("x"),
        CapabilityKind::FsRead,
        DrrEffect::Allow,
        vec![Condition {
            field: "capability.params.path".to_string(),
            op: ConditionOp::Matches,
            value: "./a/**".to_string(),
        }],
    )
    .unwrap();
    let rule_y = compile_structured(
        RuleId::new("y"),
        CapabilityKind::FsRead,
        DrrEffect::Deny,
        vec![Condition {
            field: "capability.params.path".to_string(),
            op: ConditionOp::Matches,
            value: "./b/**".to_string(),
        }],
    )
    .unwrap();
    let manifest_a = manifest("alpha", CapabilityKind::FsRead);
    let manifest_b = manifest("beta", CapabilityKind::ExecRun);

    let inputs = |manifests: Vec<ModuleManifest>, drrs, kinds| SnapshotInputs {
        project_id: ProjectId::new("p1"),
        manifests,
        enabled_capabilities: kinds,
        drrs,
        resource_config: ResourceConfig {
            fs_roots: Vec::new(),
            net_allowlist: vec!["b.example".to_string(), "a.example".to_string()],
            exec_cwd_root_id: None,
            secrets_epoch: 0,
        },
        engine_version: "0.1.0".to_string(),
        config_hash: hash_bytes(DEFAULT_HASH_ALGORITHM, b"cfg"),
        ack_epoch: 3,
    };

    let forward = SnapshotBuilder::build(
        inputs(
            vec![manifest_a.clone(), manifest_b.clone()],
            vec![rule_x.clone(), rule_y.clone()],
            vec![CapabilityKind::FsRead, CapabilityKind::ExecRun],
        ),
        &clock,
    );
    let reversed = SnapshotBuilder::build(
        inputs(
            vec![manifest_b, manifest_a],
            vec![rule_y, rule_x],
            vec![CapabilityKind::ExecRun, CapabilityKind::FsRead],
        ),
        &clock,
    );

    assert_eq!(
        SnapshotBuilder::hash(&forward).unwrap(),
        SnapshotBuilder::hash(&reversed).unwrap()
    );
}

#[test]
fn ack_epoch_changes_the_snapshot_hash() {
    let clock = FixedClock::new("2026-01-01T00:00:00Z");
    let build = |ack_epoch| {
        SnapshotBuilder::build(
            SnapshotInputs {
                project_id: ProjectId::new("p1"),
                manifests: Vec::new(),
                enabled_capabilities: Vec::new(),
                drrs: Vec::new(),
                resource_config: ResourceConfig::default(),
                engine_version: "0.1.0".to_string(),
                config_hash: hash_bytes(DEFAULT_HASH_ALGORITHM, b"cfg"),
                ack_epoch,
            },
            &clock,
        )
    };
    for epoch in 0_u64 .. 4 {
        let at_n = SnapshotBuilder::hash(&build(epoch)).unwrap();
        let at_next = SnapshotBuilder::hash(&build(epoch + 1)).unwrap();
        assert_ne!(at_n, at_next, "epoch {epoch} and {} must differ", epoch + 1);
    }
}

#[test]
fn restriction_monotonicity_narrower_permits_subset() {
    let clock = FixedClock::new("2026-01-01T00:00:00Z");
    let broad_rule = compile_structured(
        RuleId::new("docs"),
        CapabilityKind::FsRead,
        DrrEffect::Allow,
        vec![Condition {
            field: "capability.params.path".to_string(),
            op: ConditionOp::Matches,
            value: "./docs/**".to_string(),
        }],
    )
    .unwrap();
    let narrow_rule = compile_structured(
        RuleId::new("docs"),
        CapabilityKind::FsRead,
        DrrEffect::Allow,
        vec![
            Condition {
                field: "capability.params.path".to_string(),
                op: ConditionOp::Matches,
                value: "./docs/**".to_string(),
            },
            Condition {
                field: "capability.params.mode".to_string(),
                op: ConditionOp::Matches,
                value: "text".to_string(),
            },
        ],
    )
    .unwrap();

    let snapshot_with = |rule| {
        SnapshotBuilder::build(
            SnapshotInputs {
                project_id: ProjectId::new("p1"),
                manifests: vec![manifest("m", CapabilityKind::FsRead)],
                enabled_capabilities: vec![CapabilityKind::FsRead],
                drrs: vec![rule],
                resource_config: ResourceConfig::default(),
                engine_version: "0.1.0".to_string(),
                config_hash: hash_bytes(DEFAULT_HASH_ALGORITHM, b"cfg"),
                ack_epoch: 0,
            },
            &clock,
        )
    };
    let broader = snapshot_with(broad_rule);
    let narrower = snapshot_with(narrow_rule);

    let candidates = [
        BTreeMap::from([("path".to_string(), json!("./docs/spec.md"))]),
        BTreeMap::from([
            ("path".to_string(), json!("./docs/spec.md")),
            ("mode".to_string(), json!("text")),
        ]),
        BTreeMap::from([
            ("path".to_string(), json!("./docs/spec.md")),
            ("mode".to_string(), json!("binary")),
        ]),
        BTreeMap::from([("path".to_string(), json!("./src/main.c"))]),
    ];
    for params in candidates {
        let mut action = action_of(CapabilityKind::FsRead);
        action.params = params;
        let narrow_permits =
            ValidationEngine.evaluate(&action, &narrower).decision == Decision::Permit;
        let broad_permits =
            ValidationEngine.evaluate(&action, &broader).decision == Decision::Permit;
        assert!(
            !narrow_permits || broad_permits,
            "narrower snapshot permitted an action the broader one denied"
        );
    }
}

#[test]
fn smaller_capability_set_permits_subset() {
    let clock = FixedClock::new("2026-01-01T00:00:00Z");
    let snapshot_with = |kinds: Vec<CapabilityKind>| {
        SnapshotBuilder::build(
            SnapshotInputs {
                project_id: ProjectId::new("p1"),
                manifests: vec![
                    manifest("m", CapabilityKind::FsRead),
                    manifest("m2", CapabilityKind::FsList),
                ],
                enabled_capabilities: kinds,
                drrs: Vec::new(),
                resource_config: ResourceConfig::default(),
                engine_version: "0.1.0".to_string(),
                config_hash: hash_bytes(DEFAULT_HASH_ALGORITHM, b"cfg"),
                ack_epoch: 0,
            },
            &clock,
        )
    };
    let broader = snapshot_with(vec![CapabilityKind::FsRead, CapabilityKind::FsList]);
    let narrower = snapshot_with(vec![CapabilityKind::FsRead]);

    for kind in [CapabilityKind::FsRead, CapabilityKind::FsList, CapabilityKind::ExecRun] {
        let mut action = action_of(kind);
        action.module_id =
            if kind == CapabilityKind::FsList { ModuleId::new("m2") } else { ModuleId::new("m") };
        let narrow_permits =
            ValidationEngine.evaluate(&action, &narrower).decision == Decision::Permit;
        let broad_permits =
            ValidationEngine.evaluate(&action, &broader).decision == Decision::Permit;
        assert!(!narrow_permits || broad_permits);
    }
}
