// crates/archon-core/src/runtime/engine.rs
// ============================================================================
// Module: Archon Validation Engine
// Description: Ordered enforcement checks for proposed actions.
// Purpose: Decide permit/deny purely from an action and a rule snapshot.
// Dependencies: crate::core, crate::runtime::evaluator, url
// ============================================================================

//! ## Overview
//! The validation engine is a pure function of `(action, snapshot)`. Checks
//! run in a fixed order, short-circuiting on the first failure: project
//! isolation, taxonomy soundness, capability-level containment, module-level
//! containment, resource-boundary pre-checks, and finally restriction rules.
//! Non-configured resources default to safe: no fs roots skips the fs check,
//! while an empty net allowlist denies all egress.
//!
//! Delegation filtering for `agent.spawn`/`agent.message` against the
//! requester's effective capability set is a queue-side concern and not part
//! of this evaluator.

// ============================================================================
// SECTION: Imports
// ============================================================================

use url::Url;

use crate::core::action::CapabilityInstance;
use crate::core::decision::Evaluation;
use crate::core::glob::normalize_path;
use crate::core::resource::FsRoot;
use crate::core::resource::ResourceConfig;
use crate::core::resource::RootPerm;
use crate::core::resource::WORKSPACE_ROOT_ID;
use crate::core::snapshot::RuleSnapshot;
use crate::core::taxonomy::CapabilityKind;
use crate::runtime::evaluator::evaluate_drrs;

// ============================================================================
// SECTION: Triggered-Rule Codes
// ============================================================================

/// Triggered id for a cross-project action.
pub const CODE_PROJECT_MISMATCH: &str = "project_mismatch";
/// Triggered id for an action outside the closed taxonomy.
pub const CODE_UNKNOWN_KIND: &str = "unknown_capability_kind";
/// Triggered id when an fs action carries no string `path` param.
pub const CODE_FS_PATH_MISSING: &str = "fs_path_missing";
/// Triggered id when a path falls outside every declared root.
pub const CODE_FS_PATH_OUTSIDE_ROOTS: &str = "fs_path_outside_roots";
/// Triggered id when a mutation targets only read-only roots.
pub const CODE_FS_WRITE_TO_READONLY_ROOT: &str = "fs_write_to_readonly_root";
/// Triggered id when the net allowlist is empty.
pub const CODE_NET_NO_ALLOWLIST: &str = "net_no_allowlist";
/// Triggered id when `params.url` fails to parse.
pub const CODE_NET_INVALID_URL: &str = "net_invalid_url";
/// Triggered id when `params.host` is absent for raw egress.
pub const CODE_NET_HOST_MISSING: &str = "net_host_missing";
/// Triggered id when the hostname matches no allowlist entry.
pub const CODE_NET_HOST_NOT_ALLOWLISTED: &str = "net_host_not_allowlisted";
/// Triggered id when the configured exec root does not exist.
pub const CODE_EXEC_CWD_ROOT_NOT_FOUND: &str = "exec_cwd_root_not_found";
/// Triggered id when roots exist but no exec cwd can be resolved.
pub const CODE_EXEC_NO_CWD_CONFIGURED: &str = "exec_no_cwd_configured";

// ============================================================================
// SECTION: Validation Engine
// ============================================================================

/// Deterministic enforcement engine.
///
/// # Invariants
/// - `evaluate` is a pure function of `(action, snapshot)`; no I/O, no
///   suspension points.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidationEngine;

impl ValidationEngine {
    /// Evaluates a proposed action against a snapshot.
    #[must_use]
    pub fn evaluate(&self, action: &CapabilityInstance, snapshot: &RuleSnapshot) -> Evaluation {
        // Step 1: project isolation.
        if action.project_id != snapshot.project_id {
            return Evaluation::deny(vec![CODE_PROJECT_MISMATCH.to_string()]);
        }

        // Step 2: taxonomy soundness.
        let Ok(kind) = action.kind.parse::<CapabilityKind>() else {
            return Evaluation::deny(vec![CODE_UNKNOWN_KIND.to_string()]);
        };

        // Steps 3 and 4: deny-by-default containment. No triggered id — the
        // absence of any grant is the finding.
        if !snapshot.capability_enabled(kind) {
            return Evaluation::deny(Vec::new());
        }
        let declared = snapshot.ccm_enabled.iter().any(|manifest| {
            manifest.module_id == action.module_id
                && manifest.descriptor(&action.capability_id).is_some()
        });
        if !declared {
            return Evaluation::deny(Vec::new());
        }

        // Step 5: resource-boundary pre-checks.
        if let Some(code) = resource_check(kind, action, &snapshot.resource_config) {
            return Evaluation::deny(vec![code.to_string()]);
        }

        // Step 6: restriction rules.
        let outcome = evaluate_drrs(kind, &action.params, &snapshot.drr_canonical);
        if outcome.permitted {
            Evaluation::permit(outcome.triggered_rules)
        } else {
            Evaluation::deny(outcome.triggered_rules)
        }
    }
}

// ============================================================================
// SECTION: Resource Checks
// ============================================================================

/// Runs the resource-boundary pre-check for the action's kind family.
fn resource_check(
    kind: CapabilityKind,
    action: &CapabilityInstance,
    config: &ResourceConfig,
) -> Option<&'static str> {
    if kind.is_fs_family() {
        return fs_check(kind, action, config);
    }
    if kind.is_net_family() {
        return net_check(kind, action, config);
    }
    if kind.is_exec_family() {
        return exec_check(config);
    }
    None
}

/// Returns true when `path` is logically within `root`.
fn within_root(path: &str, root: &FsRoot) -> bool {
    let normalized_root = normalize_path(&root.abs_path);
    if path == normalized_root {
        return true;
    }
    let prefix = if normalized_root.ends_with('/') {
        normalized_root
    } else {
        format!("{normalized_root}/")
    };
    path.starts_with(&prefix)
}

/// Filesystem-family check: logical containment and write permission.
fn fs_check(
    kind: CapabilityKind,
    action: &CapabilityInstance,
    config: &ResourceConfig,
) -> Option<&'static str> {
    if config.fs_roots.is_empty() {
        return None;
    }
    let Some(path) = action.string_param("path") else {
        return Some(CODE_FS_PATH_MISSING);
    };
    let normalized = normalize_path(path);
    let matching: Vec<&FsRoot> =
        config.fs_roots.iter().filter(|root| within_root(&normalized, root)).collect();
    if matching.is_empty() {
        return Some(CODE_FS_PATH_OUTSIDE_ROOTS);
    }
    if kind.is_fs_mutation() && !matching.iter().any(|root| root.perm == RootPerm::Rw) {
        return Some(CODE_FS_WRITE_TO_READONLY_ROOT);
    }
    None
}

/// Returns true when `host` matches an allowlist entry.
///
/// `*.<domain>` admits strict subdomains of `<domain>` only; everything else
/// is an exact, case-insensitive comparison.
fn host_allowed(host: &str, entry: &str) -> bool {
    let host = host.to_ascii_lowercase();
    let entry = entry.to_ascii_lowercase();
    entry.strip_prefix("*.").map_or_else(
        || host == entry,
        |domain| host != domain && host.ends_with(&format!(".{domain}")),
    )
}

/// Network-family check: allowlist presence and hostname membership.
fn net_check(
    kind: CapabilityKind,
    action: &CapabilityInstance,
    config: &ResourceConfig,
) -> Option<&'static str> {
    if config.net_allowlist.is_empty() {
        return Some(CODE_NET_NO_ALLOWLIST);
    }
    let host = if kind == CapabilityKind::NetFetchHttp {
        let Some(raw) = action.string_param("url") else {
            return Some(CODE_NET_INVALID_URL);
        };
        match Url::parse(raw) {
            Ok(url) => match url.host_str() {
                Some(host) => host.to_string(),
                None => return Some(CODE_NET_INVALID_URL),
            },
            Err(_) => return Some(CODE_NET_INVALID_URL),
        }
    } else {
        let Some(host) = action.string_param("host") else {
            return Some(CODE_NET_HOST_MISSING);
        };
        host.to_string()
    };
    if config.net_allowlist.iter().any(|entry| host_allowed(&host, entry)) {
        None
    } else {
        Some(CODE_NET_HOST_NOT_ALLOWLISTED)
    }
}

/// Exec-family check: the working-directory root must be resolvable.
fn exec_check(config: &ResourceConfig) -> Option<&'static str> {
    match &config.exec_cwd_root_id {
        Some(id) => {
            if config.root(id).is_none() {
                return Some(CODE_EXEC_CWD_ROOT_NOT_FOUND);
            }
            None
        }
        None => {
            if !config.fs_roots.is_empty() && config.root(WORKSPACE_ROOT_ID).is_none() {
                return Some(CODE_EXEC_NO_CWD_CONFIGURED);
            }
            None
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions may unwrap.")]

    use std::collections::BTreeMap;

    use serde_json::json;

    use super::*;
    use crate::core::decision::Decision;
    use crate::core::hashing::DEFAULT_HASH_ALGORITHM;
    use crate::core::hashing::hash_bytes;
    use crate::core::identifiers::CapabilityId;
    use crate::core::identifiers::ModuleId;
    use crate::core::identifiers::ProjectId;
    use crate::core::manifest::CapabilityDescriptor;
    use crate::core::manifest::ModuleManifest;
    use crate::core::snapshot::SnapshotBuilder;
    use crate::core::snapshot::SnapshotInputs;
    use crate::core::taxonomy::RiskTier;
    use crate::core::time::FixedClock;

    fn manifest(module: &str, capability: &str, kind: CapabilityKind) -> ModuleManifest {
        ModuleManifest {
            module_id: ModuleId::new(module),
            version: "1.0.0".to_string(),
            description: String::new(),
            author: String::new(),
            license: "Apache-2.0".to_string(),
            content_hash: None,
            capabilities: vec![CapabilityDescriptor {
                capability_id: CapabilityId::new(capability),
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

    fn snapshot(
        kinds: Vec<CapabilityKind>,
        manifests: Vec<ModuleManifest>,
        config: ResourceConfig,
    ) -> RuleSnapshot {
        SnapshotBuilder::build(
            SnapshotInputs {
                project_id: ProjectId::new("p1"),
                manifests,
                enabled_capabilities: kinds,
                drrs: Vec::new(),
                resource_config: config,
                engine_version: "0.1.0".to_string(),
                config_hash: hash_bytes(DEFAULT_HASH_ALGORITHM, b"cfg"),
                ack_epoch: 0,
            },
            &FixedClock::new("2026-01-01T00:00:00Z"),
        )
    }

    fn action(kind: &str, params: BTreeMap<String, serde_json::Value>) -> CapabilityInstance {
        CapabilityInstance {
            project_id: ProjectId::new("p1"),
            module_id: ModuleId::new("filesystem"),
            capability_id: CapabilityId::new("read"),
            kind: kind.to_string(),
            tier: RiskTier::T1,
            params,
        }
    }

    #[test]
    fn deny_by_default_on_empty_snapshot() {
        let snap = snapshot(Vec::new(), Vec::new(), ResourceConfig::default());
        let act = action("fs.read", BTreeMap::from([("path".to_string(), json!("/tmp/x"))]));
        let eval = ValidationEngine.evaluate(&act, &snap);
        assert_eq!(eval.decision, Decision::Deny);
        assert!(eval.triggered_rules.is_empty());
    }

    #[test]
    fn project_mismatch_denies_first() {
        let snap = snapshot(Vec::new(), Vec::new(), ResourceConfig::default());
        let mut act = action("fs.read", BTreeMap::new());
        act.project_id = ProjectId::new("other");
        let eval = ValidationEngine.evaluate(&act, &snap);
        assert_eq!(eval.decision, Decision::Deny);
        assert_eq!(eval.triggered_rules, vec![CODE_PROJECT_MISMATCH.to_string()]);
    }

    #[test]
    fn unknown_kind_is_denied() {
        let snap = snapshot(Vec::new(), Vec::new(), ResourceConfig::default());
        let eval = ValidationEngine.evaluate(&action("fs.move", BTreeMap::new()), &snap);
        assert_eq!(eval.decision, Decision::Deny);
        assert_eq!(eval.triggered_rules, vec![CODE_UNKNOWN_KIND.to_string()]);
    }

    #[test]
    fn undeclared_module_capability_is_denied() {
        let snap = snapshot(
            vec![CapabilityKind::FsRead],
            vec![manifest("other-module", "read", CapabilityKind::FsRead)],
            ResourceConfig::default(),
        );
        let act = action("fs.read", BTreeMap::from([("path".to_string(), json!("/tmp/x"))]));
        let eval = ValidationEngine.evaluate(&act, &snap);
        assert_eq!(eval.decision, Decision::Deny);
        assert!(eval.triggered_rules.is_empty());
    }

    #[test]
    fn enabled_capability_with_declaring_module_permits() {
        let snap = snapshot(
            vec![CapabilityKind::FsRead],
            vec![manifest("filesystem", "read", CapabilityKind::FsRead)],
            ResourceConfig::default(),
        );
        let act = action("fs.read", BTreeMap::from([("path".to_string(), json!("/tmp/x"))]));
        let eval = ValidationEngine.evaluate(&act, &snap);
        assert_eq!(eval.decision, Decision::Permit);
    }

    fn fs_config(perm: RootPerm) -> ResourceConfig {
        ResourceConfig {
            fs_roots: vec![FsRoot {
                id: WORKSPACE_ROOT_ID.to_string(),
                abs_path: "/tmp/ws".to_string(),
                perm,
            }],
            net_allowlist: Vec::new(),
            exec_cwd_root_id: None,
            secrets_epoch: 0,
        }
    }

    #[test]
    fn fs_path_outside_roots_is_denied() {
        let snap = snapshot(
            vec![CapabilityKind::FsRead],
            vec![manifest("filesystem", "read", CapabilityKind::FsRead)],
            fs_config(RootPerm::Rw),
        );
        let act = action("fs.read", BTreeMap::from([("path".to_string(), json!("/etc/passwd"))]));
        let eval = ValidationEngine.evaluate(&act, &snap);
        assert_eq!(eval.triggered_rules, vec![CODE_FS_PATH_OUTSIDE_ROOTS.to_string()]);
    }

    #[test]
    fn fs_traversal_cannot_escape_roots() {
        let snap = snapshot(
            vec![CapabilityKind::FsRead],
            vec![manifest("filesystem", "read", CapabilityKind::FsRead)],
            fs_config(RootPerm::Rw),
        );
        let act = action(
            "fs.read",
            BTreeMap::from([("path".to_string(), json!("/tmp/ws/../outside/s.txt"))]),
        );
        let eval = ValidationEngine.evaluate(&act, &snap);
        assert_eq!(eval.triggered_rules, vec![CODE_FS_PATH_OUTSIDE_ROOTS.to_string()]);
    }

    #[test]
    fn fs_write_to_readonly_root_is_denied() {
        let snap = snapshot(
            vec![CapabilityKind::FsWrite],
            vec![manifest("filesystem", "read", CapabilityKind::FsWrite)],
            fs_config(RootPerm::Ro),
        );
        let act = action("fs.write", BTreeMap::from([("path".to_string(), json!("/tmp/ws/a"))]));
        let eval = ValidationEngine.evaluate(&act, &snap);
        assert_eq!(eval.triggered_rules, vec![CODE_FS_WRITE_TO_READONLY_ROOT.to_string()]);
    }

    #[test]
    fn fs_missing_path_is_denied_when_roots_declared() {
        let snap = snapshot(
            vec![CapabilityKind::FsRead],
            vec![manifest("filesystem", "read", CapabilityKind::FsRead)],
            fs_config(RootPerm::Rw),
        );
        let eval = ValidationEngine.evaluate(&action("fs.read", BTreeMap::new()), &snap);
        assert_eq!(eval.triggered_rules, vec![CODE_FS_PATH_MISSING.to_string()]);
    }

    fn net_snapshot(allowlist: Vec<&str>) -> RuleSnapshot {
        snapshot(
            vec![CapabilityKind::NetFetchHttp, CapabilityKind::NetEgressRaw],
            vec![
                manifest("network", "read", CapabilityKind::NetFetchHttp),
                manifest("raw-network", "read", CapabilityKind::NetEgressRaw),
            ],
            ResourceConfig {
                fs_roots: Vec::new(),
                net_allowlist: allowlist.into_iter().map(str::to_string).collect(),
                exec_cwd_root_id: None,
                secrets_epoch: 0,
            },
        )
    }

    fn net_action(kind: &str, module: &str, key: &str, value: &str) -> CapabilityInstance {
        let mut act = action(kind, BTreeMap::from([(key.to_string(), json!(value))]));
        act.module_id = ModuleId::new(module);
        act
    }

    #[test]
    fn empty_allowlist_denies_all_egress() {
        let snap = net_snapshot(Vec::new());
        let act = net_action("net.fetch.http", "network", "url", "https://example.com/x");
        let eval = ValidationEngine.evaluate(&act, &snap);
        assert_eq!(eval.triggered_rules, vec![CODE_NET_NO_ALLOWLIST.to_string()]);
    }

    #[test]
    fn exact_host_match_is_case_insensitive() {
        let snap = net_snapshot(vec!["Example.COM"]);
        let act = net_action("net.fetch.http", "network", "url", "https://example.com/x");
        assert_eq!(ValidationEngine.evaluate(&act, &snap).decision, Decision::Permit);
    }

    #[test]
    fn wildcard_matches_strict_subdomains_only() {
        let snap = net_snapshot(vec!["*.example.com"]);
        let sub = net_action("net.fetch.http", "network", "url", "https://api.example.com/x");
        assert_eq!(ValidationEngine.evaluate(&sub, &snap).decision, Decision::Permit);
        let apex = net_action("net.fetch.http", "network", "url", "https://example.com/x");
        let eval = ValidationEngine.evaluate(&apex, &snap);
        assert_eq!(eval.triggered_rules, vec![CODE_NET_HOST_NOT_ALLOWLISTED.to_string()]);
    }

    #[test]
    fn invalid_url_is_denied() {
        let snap = net_snapshot(vec!["example.com"]);
        let act = net_action("net.fetch.http", "network", "url", "not a url");
        let eval = ValidationEngine.evaluate(&act, &snap);
        assert_eq!(eval.triggered_rules, vec![CODE_NET_INVALID_URL.to_string()]);
    }

    #[test]
    fn raw_egress_requires_host_param() {
        let snap = net_snapshot(vec!["example.com"]);
        let mut act = action("net.egress.raw", BTreeMap::new());
        act.module_id = ModuleId::new("raw-network");
        let eval = ValidationEngine.evaluate(&act, &snap);
        assert_eq!(eval.triggered_rules, vec![CODE_NET_HOST_MISSING.to_string()]);
    }

    #[test]
    fn exec_missing_configured_root_is_denied() {
        let mut config = fs_config(RootPerm::Rw);
        config.exec_cwd_root_id = Some("build".to_string());
        let snap = snapshot(
            vec![CapabilityKind::ExecRun],
            vec![manifest("exec", "read", CapabilityKind::ExecRun)],
            config,
        );
        let mut act = action("exec.run", BTreeMap::new());
        act.module_id = ModuleId::new("exec");
        let eval = ValidationEngine.evaluate(&act, &snap);
        assert_eq!(eval.triggered_rules, vec![CODE_EXEC_CWD_ROOT_NOT_FOUND.to_string()]);
    }

    #[test]
    fn exec_without_workspace_root_is_denied() {
        let config = ResourceConfig {
            fs_roots: vec![FsRoot {
                id: "data".to_string(),
                abs_path: "/data".to_string(),
                perm: RootPerm::Rw,
            }],
            net_allowlist: Vec::new(),
            exec_cwd_root_id: None,
            secrets_epoch: 0,
        };
        let snap = snapshot(
            vec![CapabilityKind::ExecRun],
            vec![manifest("exec", "read", CapabilityKind::ExecRun)],
            config,
        );
        let mut act = action("exec.run", BTreeMap::new());
        act.module_id = ModuleId::new("exec");
        let eval = ValidationEngine.evaluate(&act, &snap);
        assert_eq!(eval.triggered_rules, vec![CODE_EXEC_NO_CWD_CONFIGURED.to_string()]);
    }
}
