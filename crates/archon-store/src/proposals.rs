// crates/archon-store/src/proposals.rs
// ============================================================================
// Module: Archon Proposal Queue
// Description: Governance mutations under the typed-ack / hazard protocol.
// Purpose: Apply rule-state changes only through auditable, acknowledged steps.
// Dependencies: archon-core, crate::{io, logfile, locks, registry, secrets,
// state}, serde, thiserror
// ============================================================================

//! ## Overview
//! Every governance-changing mutation travels through a proposal: created
//! with a preview computed from state-at-that-moment, then approved or
//! rejected by a non-agent actor. Tier-elevating enables demand the exact
//! typed phrase; hazardous co-enables demand per-pair confirmation. Wrong
//! phrase, missing confirmations, and agent approvers are recoverable
//! refusals — the proposal stays pending. An exception during apply marks
//! the proposal failed without rolling back partially applied registry
//! writes; the snapshot hash change is the audit signal for that
//! non-transactional contract.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use archon_core::CapabilityKind;
use archon_core::Clock;
use archon_core::EventId;
use archon_core::FsRoot;
use archon_core::HazardPair;
use archon_core::ModuleId;
use archon_core::ProposalId;
use archon_core::RiskTier;
use archon_core::RuleId;
use archon_core::RuleSnapshotHash;
use archon_core::Timestamp;
use archon_core::dsl::DslError;
use archon_core::dsl::compile_dsl;
use serde::Deserialize;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::io::StateIo;
use crate::io::StateIoError;
use crate::io::StateIoExt;
use crate::locks::project_lock;
use crate::logfile::JsonlLogSink;
use crate::logfile::PROPOSAL_EVENTS_LOG;
use crate::registry::AckEvent;
use crate::registry::Confirmation;
use crate::registry::HazardAckEvent;
use crate::secrets::SecretMode;
use crate::secrets::SecretStore;
use crate::state::ProjectState;
use crate::state::ProjectStateError;
use crate::state::TYPED_ACK_TIERS;

/// State document holding the proposal list.
const PROPOSALS: &str = "proposals";

// ============================================================================
// SECTION: Actors
// ============================================================================

/// Kind of actor creating or resolving proposals.
///
/// # Invariants
/// - Variants are stable for serialization; only non-`Agent` kinds may
///   approve or reject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorKind {
    /// A human operator.
    Human,
    /// An AI agent. May create proposals, never resolve them.
    Agent,
    /// The command-line surface acting for an operator.
    Cli,
    /// The desktop surface acting for an operator.
    Ui,
}

/// Actor identity attached to proposal lifecycle records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Actor kind.
    pub kind: ActorKind,
    /// Opaque actor identifier.
    pub id: String,
}

// ============================================================================
// SECTION: Changes
// ============================================================================

/// Restriction rule source submitted with a `set_restrictions` change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSpec {
    /// Operator-assigned rule identifier.
    pub id: RuleId,
    /// Rule text in the restriction DSL.
    pub source: String,
}

/// Governance-changing mutation carried by a proposal.
///
/// # Invariants
/// - Variants are stable for serialization; `apply` pattern-matches
///   exhaustively on this union.
/// - Secret plaintext is never carried here; it is supplied at approval time
///   and held in memory only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProposalChange {
    /// Enable a capability kind.
    EnableCapability {
        /// Kind to enable.
        capability_kind: CapabilityKind,
    },
    /// Disable a capability kind.
    DisableCapability {
        /// Kind to disable.
        capability_kind: CapabilityKind,
    },
    /// Enable a registered module.
    EnableModule {
        /// Module to enable.
        module_id: ModuleId,
    },
    /// Disable a registered module.
    DisableModule {
        /// Module to disable.
        module_id: ModuleId,
    },
    /// Replace the restriction rules for one kind.
    SetRestrictions {
        /// Kind whose rules are replaced.
        capability_kind: CapabilityKind,
        /// Replacement rule sources.
        rules: Vec<RuleSpec>,
    },
    /// Replace the declared filesystem roots.
    SetProjectFsRoots {
        /// Replacement roots.
        fs_roots: Vec<FsRoot>,
    },
    /// Replace the network allowlist.
    SetProjectNetAllowlist {
        /// Replacement hostnames.
        hosts: Vec<String>,
    },
    /// Replace the exec working-directory root.
    SetProjectExecRoot {
        /// Replacement root id, or none.
        root_id: Option<String>,
    },
    /// Store a secret; plaintext arrives at approval time.
    SetSecret {
        /// Secret key.
        key: String,
    },
    /// Delete a secret.
    DeleteSecret {
        /// Secret key.
        key: String,
    },
    /// Switch the secret-store key mode.
    SetSecretMode {
        /// Target mode.
        mode: SecretMode,
    },
}

impl ProposalChange {
    /// Stable kind tag for event records.
    #[must_use]
    pub const fn kind_tag(&self) -> &'static str {
        match self {
            Self::EnableCapability {
                ..
            } => "enable_capability",
            Self::DisableCapability {
                ..
            } => "disable_capability",
            Self::EnableModule {
                ..
            } => "enable_module",
            Self::DisableModule {
                ..
            } => "disable_module",
            Self::SetRestrictions {
                ..
            } => "set_restrictions",
            Self::SetProjectFsRoots {
                ..
            } => "set_project_fs_roots",
            Self::SetProjectNetAllowlist {
                ..
            } => "set_project_net_allowlist",
            Self::SetProjectExecRoot {
                ..
            } => "set_project_exec_root",
            Self::SetSecret {
                ..
            } => "set_secret",
            Self::DeleteSecret {
                ..
            } => "delete_secret",
            Self::SetSecretMode {
                ..
            } => "set_secret_mode",
        }
    }
}

// ============================================================================
// SECTION: Preview and Proposal
// ============================================================================

/// Preview computed at proposal creation from state-at-that-moment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalPreview {
    /// One-line human summary.
    pub summary: String,
    /// True when approval requires the typed acknowledgment phrase.
    pub requires_typed_ack: bool,
    /// The exact phrase the approver must type, when required.
    pub required_ack_phrase: Option<String>,
    /// Hazard pairs this change would newly co-enable.
    pub hazards_triggered: Vec<HazardPair>,
    /// True when approval requires per-pair hazard confirmation.
    pub requires_hazard_confirm: bool,
}

/// Proposal lifecycle status.
///
/// # Invariants
/// - Transitions: `pending → applied | rejected | failed`; recoverable
///   refusals stay `pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    /// Awaiting resolution.
    Pending,
    /// Approved and committed.
    Applied,
    /// Explicitly rejected.
    Rejected,
    /// Apply raised an exception; registry writes are not rolled back.
    Failed,
}

/// Governance proposal record.
///
/// # Invariants
/// - Append-only apart from its own resolution fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    /// Proposal identifier.
    pub id: ProposalId,
    /// Creation timestamp.
    #[serde(rename = "createdAt")]
    pub created_at: Timestamp,
    /// Creating actor.
    #[serde(rename = "createdBy")]
    pub created_by: Actor,
    /// Lifecycle status.
    pub status: ProposalStatus,
    /// Stable change kind tag.
    pub kind: String,
    /// The proposed change.
    pub change: ProposalChange,
    /// Preview computed at creation.
    pub preview: ProposalPreview,
    /// Resolving actor, once approved.
    #[serde(rename = "approvedBy", default, skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<Actor>,
    /// Approval timestamp, taken before the mutation block.
    #[serde(rename = "approvedAt", default, skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<Timestamp>,
    /// Apply timestamp, taken after the mutation block.
    #[serde(rename = "appliedAt", default, skip_serializing_if = "Option::is_none")]
    pub applied_at: Option<Timestamp>,
    /// Snapshot hash after apply.
    #[serde(rename = "rsHashAfter", default, skip_serializing_if = "Option::is_none")]
    pub rs_hash_after: Option<RuleSnapshotHash>,
    /// Rejecting actor, once rejected.
    #[serde(rename = "rejectedBy", default, skip_serializing_if = "Option::is_none")]
    pub rejected_by: Option<Actor>,
    /// Rejection reason.
    #[serde(rename = "rejectionReason", default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    /// Failure reason when apply raised.
    #[serde(rename = "failureReason", default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

/// Options supplied at approval time.
///
/// # Invariants
/// - `secret_value` and passphrases live in memory only; they are never
///   persisted with the proposal.
#[derive(Debug, Clone, Default)]
pub struct ApproveOptions {
    /// Typed acknowledgment phrase.
    pub typed_ack_phrase: Option<String>,
    /// Hazard pairs the approver confirmed.
    pub hazard_confirmed_pairs: Vec<HazardPair>,
    /// Secret plaintext for `set_secret` changes.
    pub secret_value: Option<String>,
    /// Passphrase for portable-mode secret operations.
    pub passphrase: Option<String>,
    /// New passphrase when switching to portable mode.
    pub new_passphrase: Option<String>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Proposal queue errors.
///
/// # Invariants
/// - `AckPhraseMismatch`, `MissingHazardConfirm`, and `NonHumanApprover` are
///   recoverable: the proposal remains pending and the approver may retry.
#[derive(Debug, Error)]
pub enum ProposalError {
    /// Proposal id is not in the queue.
    #[error("unknown proposal: {id}")]
    UnknownProposal {
        /// Unknown proposal identifier.
        id: ProposalId,
    },
    /// Proposal is not pending.
    #[error("proposal {id} is not pending")]
    NotPending {
        /// Proposal identifier.
        id: ProposalId,
    },
    /// Agents cannot approve or reject proposals.
    #[error("proposal resolution requires a non-agent actor")]
    NonHumanApprover,
    /// The typed phrase did not match byte-for-byte.
    #[error("typed acknowledgment phrase mismatch")]
    AckPhraseMismatch,
    /// A triggered hazard pair was not confirmed.
    #[error("hazard pair not confirmed: ({a}, {b})")]
    MissingHazardConfirm {
        /// First kind of the unconfirmed pair.
        a: CapabilityKind,
        /// Second kind of the unconfirmed pair.
        b: CapabilityKind,
    },
    /// Rule text failed to compile; the proposal never entered the queue.
    #[error("restriction rule failed to compile: {0}")]
    Dsl(#[from] DslError),
    /// A secret change was approved without its required plaintext.
    #[error("set_secret approval requires the secret value")]
    MissingSecretValue,
    /// Apply raised; the proposal is marked failed.
    #[error("proposal apply failed: {reason}")]
    ApplyFailed {
        /// Failure detail recorded on the proposal.
        reason: String,
    },
    /// Registry or snapshot interaction failed outside the apply block.
    #[error(transparent)]
    State(#[from] ProjectStateError),
    /// Persistence failed.
    #[error(transparent)]
    Io(#[from] StateIoError),
}

// ============================================================================
// SECTION: Proposal Queue
// ============================================================================

/// Per-project proposal queue.
#[derive(Clone)]
pub struct ProposalQueue {
    /// Project-scoped persistence.
    io: Arc<dyn StateIo>,
    /// Proposal lifecycle event log.
    events: JsonlLogSink,
    /// Engine version stamped into rebuilt snapshots.
    engine_version: String,
    /// Clock stamping lifecycle records.
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for ProposalQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProposalQueue")
            .field("engine_version", &self.engine_version)
            .finish_non_exhaustive()
    }
}

impl ProposalQueue {
    /// Creates a queue over one project's I/O handle.
    #[must_use]
    pub fn new(io: Arc<dyn StateIo>, engine_version: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            events: JsonlLogSink::new(io.clone(), PROPOSAL_EVENTS_LOG),
            io,
            engine_version: engine_version.into(),
            clock,
        }
    }

    /// Loads the persisted proposal list.
    fn load(&self) -> Result<Vec<Proposal>, ProposalError> {
        Ok(self.io.read_json(PROPOSALS, Vec::new())?)
    }

    /// Persists the proposal list.
    fn persist(&self, proposals: &[Proposal]) -> Result<(), ProposalError> {
        self.io.write_json(PROPOSALS, &proposals)?;
        Ok(())
    }

    /// Appends one lifecycle event line.
    fn append_event(
        &self,
        proposal: &Proposal,
        event: &str,
        rs_hash_after: Option<&RuleSnapshotHash>,
    ) -> Result<(), ProposalError> {
        let record = json!({
            "event_id": EventId::generate(),
            "timestamp": self.clock.now(),
            "proposal_id": proposal.id,
            "event": event,
            "change_kind": proposal.kind,
            "rsHashAfter": rs_hash_after,
        });
        self.events.append_value(&record)?;
        Ok(())
    }

    /// Lists all proposals.
    ///
    /// # Errors
    ///
    /// Returns [`ProposalError`] when the persisted list cannot be read.
    pub fn list(&self) -> Result<Vec<Proposal>, ProposalError> {
        self.load()
    }

    /// Returns one proposal by id.
    ///
    /// # Errors
    ///
    /// Returns [`ProposalError::UnknownProposal`] when absent.
    pub fn get(&self, id: &ProposalId) -> Result<Proposal, ProposalError> {
        self.load()?.into_iter().find(|proposal| &proposal.id == id).ok_or_else(|| {
            ProposalError::UnknownProposal {
                id: id.clone(),
            }
        })
    }

    /// Creates a proposal with its preview and appends the created event.
    ///
    /// # Errors
    ///
    /// Returns [`ProposalError::Dsl`] when restriction rule text fails to
    /// compile (the proposal never enters the queue), and persistence errors
    /// otherwise.
    pub fn create(
        &self,
        change: ProposalChange,
        created_by: Actor,
        state: &ProjectState,
    ) -> Result<Proposal, ProposalError> {
        if let ProposalChange::SetRestrictions {
            rules,
            ..
        } = &change
        {
            for rule in rules {
                compile_dsl(rule.id.clone(), &rule.source)?;
            }
        }
        let preview = compute_preview(&change, state);
        let proposal = Proposal {
            id: ProposalId::generate(),
            created_at: self.clock.now(),
            created_by,
            status: ProposalStatus::Pending,
            kind: change.kind_tag().to_string(),
            change,
            preview,
            approved_by: None,
            approved_at: None,
            applied_at: None,
            rs_hash_after: None,
            rejected_by: None,
            rejection_reason: None,
            failure_reason: None,
        };
        let mut proposals = self.load()?;
        proposals.push(proposal.clone());
        self.persist(&proposals)?;
        self.append_event(&proposal, "created", None)?;
        Ok(proposal)
    }

    /// Approves a proposal, applying its change under the project lock.
    ///
    /// # Errors
    ///
    /// Recoverable refusals (`NonHumanApprover`, `AckPhraseMismatch`,
    /// `MissingHazardConfirm`) leave the proposal pending. An apply exception
    /// transitions it to failed without rolling back registry writes.
    pub fn approve(
        &self,
        id: &ProposalId,
        opts: &ApproveOptions,
        approver: &Actor,
        state: &mut ProjectState,
        secrets: &SecretStore,
    ) -> Result<Proposal, ProposalError> {
        let mut proposals = self.load()?;
        let index = proposals.iter().position(|proposal| &proposal.id == id).ok_or_else(|| {
            ProposalError::UnknownProposal {
                id: id.clone(),
            }
        })?;
        if proposals[index].status != ProposalStatus::Pending {
            return Err(ProposalError::NotPending {
                id: id.clone(),
            });
        }
        if approver.kind == ActorKind::Agent {
            return Err(ProposalError::NonHumanApprover);
        }
        let preview = proposals[index].preview.clone();
        if preview.requires_typed_ack {
            // Exact byte equality against the phrase computed at creation.
            if opts.typed_ack_phrase.as_deref() != preview.required_ack_phrase.as_deref() {
                return Err(ProposalError::AckPhraseMismatch);
            }
        }
        for pair in &preview.hazards_triggered {
            let confirmed =
                opts.hazard_confirmed_pairs.iter().any(|candidate| candidate.same_pair(*pair));
            if !confirmed {
                return Err(ProposalError::MissingHazardConfirm {
                    a: pair.a,
                    b: pair.b,
                });
            }
        }

        let lock = project_lock(&state.project_id);
        let _guard = match lock.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let approved_at = self.clock.now();
        let apply = self.apply_change(&proposals[index], opts, approver, state, secrets);
        match apply {
            Ok((rs_hash, applied_at)) => {
                let proposal = &mut proposals[index];
                proposal.status = ProposalStatus::Applied;
                proposal.approved_by = Some(approver.clone());
                proposal.approved_at = Some(approved_at);
                proposal.applied_at = Some(applied_at);
                proposal.rs_hash_after = Some(rs_hash);
                let resolved = proposal.clone();
                self.persist(&proposals)?;
                self.append_event(&resolved, "applied", resolved.rs_hash_after.as_ref())?;
                Ok(resolved)
            }
            Err(reason) => {
                let proposal = &mut proposals[index];
                proposal.status = ProposalStatus::Failed;
                proposal.approved_by = Some(approver.clone());
                proposal.approved_at = Some(approved_at);
                proposal.failure_reason = Some(reason.clone());
                let resolved = proposal.clone();
                self.persist(&proposals)?;
                self.append_event(&resolved, "failed", None)?;
                Err(ProposalError::ApplyFailed {
                    reason,
                })
            }
        }
    }

    /// Applies the change and returns the post-apply snapshot hash and stamp.
    ///
    /// Registry writes that land before an error are not rolled back; the
    /// caller records the failure and the snapshot hash divergence carries
    /// the audit trail.
    fn apply_change(
        &self,
        proposal: &Proposal,
        opts: &ApproveOptions,
        approver: &Actor,
        state: &mut ProjectState,
        secrets: &SecretStore,
    ) -> Result<(RuleSnapshotHash, Timestamp), String> {
        let mut ack_event_ids: Vec<EventId> = Vec::new();

        match &proposal.change {
            ProposalChange::EnableCapability {
                capability_kind,
            } => {
                state
                    .capabilities
                    .enable(*capability_kind, Confirmation::CONFIRMED, &state.modules)
                    .map_err(|err| err.to_string())?;
                if proposal.preview.requires_typed_ack {
                    let event = AckEvent {
                        id: EventId::generate(),
                        capability_kind: *capability_kind,
                        tier: declared_tier(state, *capability_kind),
                        phrase: proposal.preview.required_ack_phrase.clone().unwrap_or_default(),
                        acknowledged_by: approver.id.clone(),
                        at: self.clock.now(),
                        rs_hash_after: None,
                    };
                    ack_event_ids.push(event.id.clone());
                    state.acks.append_ack(event).map_err(|err| err.to_string())?;
                }
            }
            ProposalChange::DisableCapability {
                capability_kind,
            } => {
                state
                    .capabilities
                    .disable(*capability_kind, Confirmation::CONFIRMED)
                    .map_err(|err| err.to_string())?;
            }
            ProposalChange::EnableModule {
                module_id,
            } => {
                state
                    .modules
                    .enable(module_id, Confirmation::CONFIRMED)
                    .map_err(|err| err.to_string())?;
            }
            ProposalChange::DisableModule {
                module_id,
            } => {
                state
                    .modules
                    .disable(module_id, Confirmation::CONFIRMED)
                    .map_err(|err| err.to_string())?;
            }
            ProposalChange::SetRestrictions {
                capability_kind,
                rules,
            } => {
                let mut compiled = Vec::with_capacity(rules.len());
                for rule in rules {
                    compiled.push(
                        compile_dsl(rule.id.clone(), &rule.source).map_err(|err| err.to_string())?,
                    );
                }
                state
                    .restrictions
                    .set_restrictions(*capability_kind, compiled)
                    .map_err(|err| err.to_string())?;
            }
            ProposalChange::SetProjectFsRoots {
                fs_roots,
            } => {
                state.resources.set_fs_roots(fs_roots.clone()).map_err(|err| err.to_string())?;
            }
            ProposalChange::SetProjectNetAllowlist {
                hosts,
            } => {
                state.resources.set_net_allowlist(hosts.clone()).map_err(|err| err.to_string())?;
            }
            ProposalChange::SetProjectExecRoot {
                root_id,
            } => {
                state.resources.set_exec_root(root_id.clone()).map_err(|err| err.to_string())?;
            }
            ProposalChange::SetSecret {
                key,
            } => {
                let value = opts
                    .secret_value
                    .as_deref()
                    .ok_or_else(|| ProposalError::MissingSecretValue.to_string())?;
                secrets
                    .set(key, value, opts.passphrase.as_deref())
                    .map_err(|err| err.to_string())?;
                state.resources.increment_secrets_epoch().map_err(|err| err.to_string())?;
            }
            ProposalChange::DeleteSecret {
                key,
            } => {
                secrets.delete(key).map_err(|err| err.to_string())?;
                state.resources.increment_secrets_epoch().map_err(|err| err.to_string())?;
            }
            ProposalChange::SetSecretMode {
                mode,
            } => {
                secrets
                    .set_mode(*mode, opts.passphrase.as_deref(), opts.new_passphrase.as_deref())
                    .map_err(|err| err.to_string())?;
                state.resources.increment_secrets_epoch().map_err(|err| err.to_string())?;
            }
        }

        for pair in &proposal.preview.hazards_triggered {
            let event = HazardAckEvent {
                id: EventId::generate(),
                pair: pair.normalized(),
                confirmed_by: approver.id.clone(),
                at: self.clock.now(),
                rs_hash_after: None,
            };
            ack_event_ids.push(event.id.clone());
            state.acks.append_hazard_ack(event).map_err(|err| err.to_string())?;
        }

        let applied_at = self.clock.now();
        let active = state
            .build_snapshot(&self.engine_version, self.clock.as_ref())
            .map_err(|err| err.to_string())?;
        for event_id in &ack_event_ids {
            state.acks.patch_rs_hash(event_id, &active.rs_hash).map_err(|err| err.to_string())?;
        }
        Ok((active.rs_hash, applied_at))
    }

    /// Rejects a pending proposal.
    ///
    /// # Errors
    ///
    /// Returns [`ProposalError::NonHumanApprover`] for agent actors and
    /// status errors otherwise.
    pub fn reject(
        &self,
        id: &ProposalId,
        approver: &Actor,
        reason: &str,
    ) -> Result<Proposal, ProposalError> {
        if approver.kind == ActorKind::Agent {
            return Err(ProposalError::NonHumanApprover);
        }
        let mut proposals = self.load()?;
        let index = proposals.iter().position(|proposal| &proposal.id == id).ok_or_else(|| {
            ProposalError::UnknownProposal {
                id: id.clone(),
            }
        })?;
        if proposals[index].status != ProposalStatus::Pending {
            return Err(ProposalError::NotPending {
                id: id.clone(),
            });
        }
        let proposal = &mut proposals[index];
        proposal.status = ProposalStatus::Rejected;
        proposal.rejected_by = Some(approver.clone());
        proposal.rejection_reason = Some(reason.to_string());
        let resolved = proposal.clone();
        self.persist(&proposals)?;
        self.append_event(&resolved, "rejected", None)?;
        Ok(resolved)
    }
}

// ============================================================================
// SECTION: Preview Computation
// ============================================================================

/// Highest tier any enabled module declares for the kind, falling back to
/// the taxonomy default when nothing declares it.
fn declared_tier(state: &ProjectState, kind: CapabilityKind) -> RiskTier {
    state
        .modules
        .enabled_manifests()
        .iter()
        .flat_map(|manifest| &manifest.capabilities)
        .filter(|descriptor| descriptor.kind == kind)
        .map(|descriptor| descriptor.tier)
        .max()
        .unwrap_or_else(|| kind.default_tier())
}

/// Collects the hazard matrix declared by enabled modules.
fn hazard_matrix(state: &ProjectState) -> Vec<HazardPair> {
    let mut matrix: Vec<HazardPair> = Vec::new();
    for manifest in state.modules.enabled_manifests() {
        for pair in &manifest.hazard_pairs {
            let normalized = pair.normalized();
            if !matrix.iter().any(|existing| existing.same_pair(normalized)) {
                matrix.push(normalized);
            }
        }
        for descriptor in &manifest.capabilities {
            for hazard in &descriptor.hazards {
                let normalized = HazardPair::new(descriptor.kind, *hazard).normalized();
                if !matrix.iter().any(|existing| existing.same_pair(normalized)) {
                    matrix.push(normalized);
                }
            }
        }
    }
    matrix
}

/// Computes the preview for a change against state-at-this-moment.
fn compute_preview(change: &ProposalChange, state: &ProjectState) -> ProposalPreview {
    let mut requires_typed_ack = false;
    let mut required_ack_phrase = None;
    let mut hazards_triggered: Vec<HazardPair> = Vec::new();

    if let ProposalChange::EnableCapability {
        capability_kind,
    } = change
    {
        let tier = declared_tier(state, *capability_kind);
        requires_typed_ack = TYPED_ACK_TIERS.contains(&tier);
        if requires_typed_ack {
            required_ack_phrase = Some(format!("I ACCEPT {tier} RISK ({capability_kind})"));
        }

        let current = state.capabilities.enabled_kinds();
        for pair in hazard_matrix(state) {
            let would_have_a = pair.a == *capability_kind || current.contains(&pair.a);
            let would_have_b = pair.b == *capability_kind || current.contains(&pair.b);
            let already = current.contains(&pair.a) && current.contains(&pair.b);
            if would_have_a && would_have_b && !already {
                hazards_triggered.push(pair);
            }
        }
    }

    let summary = match change {
        ProposalChange::EnableCapability {
            capability_kind,
        } => format!("enable capability {capability_kind}"),
        ProposalChange::DisableCapability {
            capability_kind,
        } => format!("disable capability {capability_kind}"),
        ProposalChange::EnableModule {
            module_id,
        } => format!("enable module {module_id}"),
        ProposalChange::DisableModule {
            module_id,
        } => format!("disable module {module_id}"),
        ProposalChange::SetRestrictions {
            capability_kind,
            rules,
        } => format!("replace {} restriction rule(s) for {capability_kind}", rules.len()),
        ProposalChange::SetProjectFsRoots {
            fs_roots,
        } => format!("replace filesystem roots ({} declared)", fs_roots.len()),
        ProposalChange::SetProjectNetAllowlist {
            hosts,
        } => format!("replace network allowlist ({} host(s))", hosts.len()),
        ProposalChange::SetProjectExecRoot {
            root_id,
        } => match root_id {
            Some(id) => format!("set exec root to {id}"),
            None => "clear exec root".to_string(),
        },
        ProposalChange::SetSecret {
            key,
        } => format!("set secret {key}"),
        ProposalChange::DeleteSecret {
            key,
        } => format!("delete secret {key}"),
        ProposalChange::SetSecretMode {
            mode,
        } => match mode {
            SecretMode::Device => "switch secrets to device mode".to_string(),
            SecretMode::Portable => "switch secrets to portable mode".to_string(),
        },
    };

    ProposalPreview {
        summary,
        requires_typed_ack,
        required_ack_phrase,
        requires_hazard_confirm: !hazards_triggered.is_empty(),
        hazards_triggered,
    }
}
