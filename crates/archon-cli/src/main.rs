// crates/archon-cli/src/main.rs
// ============================================================================
// Module: Archon CLI Entry Point
// Description: Command dispatcher for project governance and audit workflows.
// Purpose: Drive the core through its exported operations only.
// Dependencies: archon-core, archon-store, clap, serde_json, thiserror, tokio
// ============================================================================

//! ## Overview
//! The Archon CLI is an external collaborator of the kernel: every mutation
//! travels through the proposal queue, every decision through the gate, and
//! everything it prints is derived from exported core state. Exit code 0 on
//! success, 1 on any error reported to stderr. Environment: `ARCHON_HOME`,
//! `ARCHON_STATE_DIR` (legacy), `ARCHON_NO_TUI` (accepted for interface
//! compatibility; this surface is plain-text only).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use archon_core::AgentId;
use archon_core::CapabilityInstance;
use archon_core::CapabilityKind;
use archon_core::Clock;
use archon_core::ExecutionGate;
use archon_core::HazardPair;
use archon_core::ModuleId;
use archon_core::ModuleManifest;
use archon_core::ProjectId;
use archon_core::ProposalId;
use archon_core::RuleId;
use archon_core::SystemClock;
use archon_core::dsl::compile_dsl;
use archon_store::Actor;
use archon_store::ActorKind;
use archon_store::ApproveOptions;
use archon_store::JsonlLogSink;
use archon_store::ProjectState;
use archon_store::ProjectStore;
use archon_store::ProposalChange;
use archon_store::ProposalQueue;
use archon_store::ProposalStatus;
use archon_store::RuleSpec;
use archon_store::SecretStore;
use archon_store::StateIo;
use archon_store::resolve_home;
use clap::Parser;
use clap::Subcommand;
use thiserror::Error;

/// Engine version stamped into snapshots built by this binary.
const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// SECTION: CLI Definition
// ============================================================================

/// Archon: local coordination kernel for AI agent actions.
#[derive(Debug, Parser)]
#[command(name = "archon", version, about)]
struct Cli {
    /// Override the Archon home directory.
    #[arg(long, global = true)]
    home: Option<PathBuf>,
    /// Command to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Top-level commands.
#[derive(Debug, Subcommand)]
enum Commands {
    /// Show the active project's governance state and snapshot hash.
    Status,
    /// Enable a module or capability through the proposal queue.
    Enable {
        /// What to enable.
        #[command(subcommand)]
        target: EnableTarget,
    },
    /// Disable a module or capability through the proposal queue.
    Disable {
        /// What to disable.
        #[command(subcommand)]
        target: DisableTarget,
    },
    /// Manage restriction rules.
    Rules {
        /// Rule operation.
        #[command(subcommand)]
        action: RulesAction,
    },
    /// Replace all restriction rules for one capability kind.
    Restrict {
        /// Capability kind wire string.
        kind: String,
        /// Rule sources as `id=dsl-text` pairs.
        #[arg(long = "rule", value_name = "ID=SOURCE")]
        rules: Vec<String>,
        /// Approval options.
        #[command(flatten)]
        approval: ApprovalArgs,
    },
    /// Read the decision log with dedupe-on-read statistics.
    Log,
    /// Create a proposal without approving it.
    Propose {
        /// The proposed change.
        #[command(subcommand)]
        change: ProposeChange,
    },
    /// Inspect and resolve proposals.
    Proposals {
        /// Proposal operation.
        #[command(subcommand)]
        action: ProposalsAction,
    },
    /// Manage projects.
    Project {
        /// Project operation.
        #[command(subcommand)]
        action: ProjectAction,
    },
    /// Run an in-memory demonstration scenario.
    Demo,
}

/// Targets of `enable`.
#[derive(Debug, Subcommand)]
enum EnableTarget {
    /// Enable a registered module.
    Module {
        /// Module identifier.
        id: String,
        /// Approval options.
        #[command(flatten)]
        approval: ApprovalArgs,
    },
    /// Enable a capability kind.
    Capability {
        /// Capability kind wire string.
        kind: String,
        /// Approval options.
        #[command(flatten)]
        approval: ApprovalArgs,
    },
}

/// Targets of `disable`.
#[derive(Debug, Subcommand)]
enum DisableTarget {
    /// Disable a registered module.
    Module {
        /// Module identifier.
        id: String,
    },
    /// Disable a capability kind.
    Capability {
        /// Capability kind wire string.
        kind: String,
    },
}

/// Rule operations.
#[derive(Debug, Subcommand)]
enum RulesAction {
    /// Add one rule, keeping existing rules for the kind.
    Add {
        /// Operator-assigned rule identifier.
        #[arg(long)]
        id: String,
        /// Rule text in the restriction DSL.
        source: String,
        /// Approval options.
        #[command(flatten)]
        approval: ApprovalArgs,
    },
    /// Remove one rule by identifier.
    Remove {
        /// Rule identifier to remove.
        #[arg(long)]
        id: String,
        /// Approval options.
        #[command(flatten)]
        approval: ApprovalArgs,
    },
    /// List the compiled rule set.
    List,
}

/// Changes creatable through `propose`.
#[derive(Debug, Subcommand)]
enum ProposeChange {
    /// Enable a capability kind.
    EnableCapability {
        /// Capability kind wire string.
        kind: String,
    },
    /// Disable a capability kind.
    DisableCapability {
        /// Capability kind wire string.
        kind: String,
    },
    /// Enable a module.
    EnableModule {
        /// Module identifier.
        id: String,
    },
    /// Disable a module.
    DisableModule {
        /// Module identifier.
        id: String,
    },
    /// Replace the network allowlist.
    SetNetAllowlist {
        /// Allowlisted hostnames.
        hosts: Vec<String>,
    },
    /// Store a secret (value supplied at approval).
    SetSecret {
        /// Secret key.
        key: String,
    },
    /// Delete a secret.
    DeleteSecret {
        /// Secret key.
        key: String,
    },
}

/// Proposal operations.
#[derive(Debug, Subcommand)]
enum ProposalsAction {
    /// List proposals with status.
    List,
    /// Show one proposal in full.
    Show {
        /// Proposal identifier.
        id: String,
    },
    /// Approve a pending proposal.
    Approve {
        /// Proposal identifier.
        id: String,
        /// Approval options.
        #[command(flatten)]
        approval: ApprovalArgs,
    },
    /// Reject a pending proposal.
    Reject {
        /// Proposal identifier.
        id: String,
        /// Rejection reason.
        #[arg(long)]
        reason: String,
    },
}

/// Project operations.
#[derive(Debug, Subcommand)]
enum ProjectAction {
    /// Create a project and its directory scaffold.
    Create {
        /// Project name.
        name: String,
    },
    /// List registered projects.
    List,
    /// Select the active project.
    Select {
        /// Project identifier.
        id: String,
    },
    /// Show the active project identifier.
    Current,
    /// Show the active project's metadata and resource configuration.
    Show,
    /// Report portability-relevant state (secret mode, epochs, counts).
    Portability,
}

/// Shared approval flags.
#[derive(Debug, Clone, clap::Args)]
struct ApprovalArgs {
    /// Typed acknowledgment phrase for tier-elevating enables.
    #[arg(long)]
    ack_phrase: Option<String>,
    /// Hazard pair confirmations as `kindA,kindB`.
    #[arg(long = "confirm-hazard", value_name = "A,B")]
    confirm_hazards: Vec<String>,
    /// Secret plaintext for `set_secret` approvals.
    #[arg(long)]
    secret_value: Option<String>,
    /// Passphrase for portable-mode secret operations.
    #[arg(long)]
    passphrase: Option<String>,
}

// ============================================================================
// SECTION: Errors and Output
// ============================================================================

/// CLI errors surfaced to stderr.
#[derive(Debug, Error)]
enum CliError {
    /// No project is selected.
    #[error("no active project; run `archon project create <name>` first")]
    NoActiveProject,
    /// An argument failed to parse.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// A core or store operation failed.
    #[error("{0}")]
    Operation(String),
    /// Writing output failed.
    #[error("output error: {0}")]
    Output(String),
}

/// Shorthand result for command handlers.
type CliResult<T> = Result<T, CliError>;

/// Wraps any displayable failure into an operation error.
fn operation(err: impl std::fmt::Display) -> CliError {
    CliError::Operation(err.to_string())
}

/// Writes one line to stdout.
fn out(message: &str) -> CliResult<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}").map_err(|err| CliError::Output(err.to_string()))
}

/// Writes one line to stderr.
fn err_line(message: &str) {
    let mut stderr = std::io::stderr();
    let _ = writeln!(&mut stderr, "{message}");
}

// ============================================================================
// SECTION: Context
// ============================================================================

/// Resolved per-invocation context for the active project.
struct Context {
    /// Project store over the resolved home.
    store: ProjectStore,
    /// Active project id.
    project_id: ProjectId,
    /// Project state facade.
    state: ProjectState,
    /// Proposal queue.
    queue: ProposalQueue,
    /// Secret store.
    secrets: SecretStore,
    /// Project-scoped I/O handle.
    io: Arc<dyn StateIo>,
    /// Clock shared across operations.
    clock: Arc<dyn Clock>,
}

impl Context {
    /// Opens the active project, registering no modules.
    fn open(home: Option<PathBuf>) -> CliResult<Self> {
        let store = ProjectStore::new(resolve_home(home));
        let record = store.get_active().map_err(operation)?.ok_or(CliError::NoActiveProject)?;
        let io = store.io_for(&record.id);
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let state = ProjectState::open(record.id.clone(), io.clone()).map_err(operation)?;
        let queue = ProposalQueue::new(io.clone(), ENGINE_VERSION, clock.clone());
        let secrets = SecretStore::new(io.clone(), store.home());
        Ok(Self {
            store,
            project_id: record.id,
            state,
            queue,
            secrets,
            io,
            clock,
        })
    }

    /// The actor identity this surface resolves proposals as.
    fn actor() -> Actor {
        Actor {
            kind: ActorKind::Cli,
            id: "archon-cli".to_string(),
        }
    }

    /// Creates and immediately approves a change through the queue.
    fn apply(&mut self, change: ProposalChange, approval: &ApprovalArgs) -> CliResult<()> {
        let proposal =
            self.queue.create(change, Self::actor(), &self.state).map_err(operation)?;
        let opts = approve_options(approval)?;
        let applied = self
            .queue
            .approve(&proposal.id, &opts, &Self::actor(), &mut self.state, &self.secrets)
            .map_err(operation)?;
        if let Some(rs_hash) = &applied.rs_hash_after {
            out(&format!("applied {} (rs_hash {rs_hash})", applied.preview.summary))?;
        }
        Ok(())
    }
}

/// Parses approval flags into approve options.
fn approve_options(approval: &ApprovalArgs) -> CliResult<ApproveOptions> {
    let mut pairs = Vec::with_capacity(approval.confirm_hazards.len());
    for raw in &approval.confirm_hazards {
        let Some((left, right)) = raw.split_once(',') else {
            return Err(CliError::InvalidArgument(format!(
                "hazard confirmation must be `kindA,kindB`, got {raw}"
            )));
        };
        pairs.push(HazardPair::new(parse_kind(left.trim())?, parse_kind(right.trim())?));
    }
    Ok(ApproveOptions {
        typed_ack_phrase: approval.ack_phrase.clone(),
        hazard_confirmed_pairs: pairs,
        secret_value: approval.secret_value.clone(),
        passphrase: approval.passphrase.clone(),
        new_passphrase: None,
    })
}

/// Parses a capability kind wire string.
fn parse_kind(raw: &str) -> CliResult<CapabilityKind> {
    raw.parse().map_err(|err: archon_core::UnknownCapabilityKind| {
        CliError::InvalidArgument(err.to_string())
    })
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// Process entry point: dispatch, then map errors to exit code 1.
#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            err_line(&err.to_string());
            ExitCode::FAILURE
        }
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Status => command_status(cli.home),
        Commands::Enable {
            target,
        } => command_enable(cli.home, target),
        Commands::Disable {
            target,
        } => command_disable(cli.home, target),
        Commands::Rules {
            action,
        } => command_rules(cli.home, action),
        Commands::Restrict {
            kind,
            rules,
            approval,
        } => command_restrict(cli.home, &kind, &rules, &approval),
        Commands::Log => command_log(cli.home),
        Commands::Propose {
            change,
        } => command_propose(cli.home, change),
        Commands::Proposals {
            action,
        } => command_proposals(cli.home, action),
        Commands::Project {
            action,
        } => command_project(cli.home, action),
        Commands::Demo => command_demo().await,
    }
}

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Executes the `status` command.
fn command_status(home: Option<PathBuf>) -> CliResult<()> {
    let ctx = Context::open(home)?;
    let active = ctx.state.build_snapshot(ENGINE_VERSION, ctx.clock.as_ref()).map_err(operation)?;
    out(&format!("project: {}", ctx.project_id))?;
    out(&format!("rs_hash: {}", active.rs_hash))?;
    out(&format!("ack_epoch: {}", active.snapshot.ack_epoch))?;
    out(&format!(
        "enabled modules: {}",
        active
            .snapshot
            .ccm_enabled
            .iter()
            .map(|manifest| manifest.module_id.as_str().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    ))?;
    out(&format!(
        "enabled capabilities: {}",
        active
            .snapshot
            .enabled_capabilities
            .iter()
            .map(|kind| kind.as_str().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    ))?;
    out(&format!("restriction rules: {}", active.snapshot.drr_canonical.len()))?;
    Ok(())
}

/// Executes the `enable` command.
fn command_enable(home: Option<PathBuf>, target: EnableTarget) -> CliResult<()> {
    let mut ctx = Context::open(home)?;
    match target {
        EnableTarget::Module {
            id,
            approval,
        } => ctx.apply(
            ProposalChange::EnableModule {
                module_id: ModuleId::new(id),
            },
            &approval,
        ),
        EnableTarget::Capability {
            kind,
            approval,
        } => {
            let kind = parse_kind(&kind)?;
            ctx.apply(
                ProposalChange::EnableCapability {
                    capability_kind: kind,
                },
                &approval,
            )
        }
    }
}

/// Executes the `disable` command.
fn command_disable(home: Option<PathBuf>, target: DisableTarget) -> CliResult<()> {
    let mut ctx = Context::open(home)?;
    let approval = ApprovalArgs {
        ack_phrase: None,
        confirm_hazards: Vec::new(),
        secret_value: None,
        passphrase: None,
    };
    match target {
        DisableTarget::Module {
            id,
        } => ctx.apply(
            ProposalChange::DisableModule {
                module_id: ModuleId::new(id),
            },
            &approval,
        ),
        DisableTarget::Capability {
            kind,
        } => {
            let kind = parse_kind(&kind)?;
            ctx.apply(
                ProposalChange::DisableCapability {
                    capability_kind: kind,
                },
                &approval,
            )
        }
    }
}

/// Executes the `rules` command.
fn command_rules(home: Option<PathBuf>, action: RulesAction) -> CliResult<()> {
    let mut ctx = Context::open(home)?;
    match action {
        RulesAction::Add {
            id,
            source,
            approval,
        } => {
            let compiled = compile_dsl(RuleId::new(id.clone()), &source).map_err(operation)?;
            let kind = compiled.capability_kind;
            let mut specs: Vec<RuleSpec> = existing_rule_specs(&ctx, kind);
            specs.retain(|spec| spec.id.as_str() != id);
            specs.push(RuleSpec {
                id: RuleId::new(id),
                source,
            });
            ctx.apply(
                ProposalChange::SetRestrictions {
                    capability_kind: kind,
                    rules: specs,
                },
                &approval,
            )
        }
        RulesAction::Remove {
            id,
            approval,
        } => {
            let target =
                ctx.state.restrictions.all().into_iter().find(|rule| rule.id.as_str() == id);
            let Some(target) = target else {
                return Err(CliError::InvalidArgument(format!("unknown rule id: {id}")));
            };
            let kind = target.capability_kind;
            let mut specs = existing_rule_specs(&ctx, kind);
            specs.retain(|spec| spec.id.as_str() != id);
            ctx.apply(
                ProposalChange::SetRestrictions {
                    capability_kind: kind,
                    rules: specs,
                },
                &approval,
            )
        }
        RulesAction::List => {
            for rule in ctx.state.restrictions.all() {
                out(&format!(
                    "{} {} {} ({} condition(s), ir {})",
                    rule.id,
                    rule.effect,
                    rule.capability_kind,
                    rule.conditions.len(),
                    rule.ir_hash
                ))?;
            }
            Ok(())
        }
    }
}

/// Renders the stored rules for a kind back into rule specs.
///
/// Stored rules are canonical and carry no source text, so the spec is
/// reconstructed from the compiled condition list.
fn existing_rule_specs(ctx: &Context, kind: CapabilityKind) -> Vec<RuleSpec> {
    ctx.state
        .restrictions
        .for_kind(kind)
        .into_iter()
        .map(|rule| {
            let conditions: Vec<String> = rule
                .conditions
                .iter()
                .map(|condition| format!("{} matches \"{}\"", condition.field, condition.value))
                .collect();
            RuleSpec {
                id: rule.id.clone(),
                source: format!(
                    "{} {} where {}",
                    rule.effect,
                    rule.capability_kind,
                    conditions.join(" and ")
                ),
            }
        })
        .collect()
}

/// Executes the `restrict` command.
fn command_restrict(
    home: Option<PathBuf>,
    kind: &str,
    rules: &[String],
    approval: &ApprovalArgs,
) -> CliResult<()> {
    let mut ctx = Context::open(home)?;
    let kind = parse_kind(kind)?;
    let mut specs = Vec::with_capacity(rules.len());
    for raw in rules {
        let Some((id, source)) = raw.split_once('=') else {
            return Err(CliError::InvalidArgument(format!(
                "rule must be `id=dsl-text`, got {raw}"
            )));
        };
        specs.push(RuleSpec {
            id: RuleId::new(id.trim()),
            source: source.trim().to_string(),
        });
    }
    ctx.apply(
        ProposalChange::SetRestrictions {
            capability_kind: kind,
            rules: specs,
        },
        approval,
    )
}

/// Executes the `log` command.
fn command_log(home: Option<PathBuf>) -> CliResult<()> {
    let ctx = Context::open(home)?;
    let sink = JsonlLogSink::decisions(ctx.io.clone());
    let outcome = sink.read().map_err(operation)?;
    for event in &outcome.events {
        out(&serde_json::to_string(event).map_err(operation)?)?;
    }
    out(&format!(
        "-- {} event(s), {} duplicate(s), {} parse error(s){}{}",
        outcome.events.len(),
        outcome.stats.duplicates,
        outcome.stats.parse_errors,
        if outcome.stats.partial_trailing_line { ", partial trailing line" } else { "" },
        if outcome.stats.out_of_order { ", out of order" } else { "" },
    ))
}

/// Executes the `propose` command.
fn command_propose(home: Option<PathBuf>, change: ProposeChange) -> CliResult<()> {
    let ctx = Context::open(home)?;
    let change = match change {
        ProposeChange::EnableCapability {
            kind,
        } => ProposalChange::EnableCapability {
            capability_kind: parse_kind(&kind)?,
        },
        ProposeChange::DisableCapability {
            kind,
        } => ProposalChange::DisableCapability {
            capability_kind: parse_kind(&kind)?,
        },
        ProposeChange::EnableModule {
            id,
        } => ProposalChange::EnableModule {
            module_id: ModuleId::new(id),
        },
        ProposeChange::DisableModule {
            id,
        } => ProposalChange::DisableModule {
            module_id: ModuleId::new(id),
        },
        ProposeChange::SetNetAllowlist {
            hosts,
        } => ProposalChange::SetProjectNetAllowlist {
            hosts,
        },
        ProposeChange::SetSecret {
            key,
        } => ProposalChange::SetSecret {
            key,
        },
        ProposeChange::DeleteSecret {
            key,
        } => ProposalChange::DeleteSecret {
            key,
        },
    };
    let proposal = ctx.queue.create(change, Context::actor(), &ctx.state).map_err(operation)?;
    out(&format!("created proposal {} ({})", proposal.id, proposal.preview.summary))?;
    if proposal.preview.requires_typed_ack {
        if let Some(phrase) = &proposal.preview.required_ack_phrase {
            out(&format!("approval requires typed phrase: {phrase}"))?;
        }
    }
    for pair in &proposal.preview.hazards_triggered {
        out(&format!("approval requires hazard confirmation: {},{}", pair.a, pair.b))?;
    }
    Ok(())
}

/// Executes the `proposals` command.
fn command_proposals(home: Option<PathBuf>, action: ProposalsAction) -> CliResult<()> {
    let mut ctx = Context::open(home)?;
    match action {
        ProposalsAction::List => {
            for proposal in ctx.queue.list().map_err(operation)? {
                out(&format!(
                    "{} [{}] {}",
                    proposal.id,
                    status_label(proposal.status),
                    proposal.preview.summary
                ))?;
            }
            Ok(())
        }
        ProposalsAction::Show {
            id,
        } => {
            let proposal =
                ctx.queue.get(&ProposalId::from_existing(id)).map_err(operation)?;
            out(&serde_json::to_string_pretty(&proposal).map_err(operation)?)
        }
        ProposalsAction::Approve {
            id,
            approval,
        } => {
            let opts = approve_options(&approval)?;
            let applied = ctx
                .queue
                .approve(
                    &ProposalId::from_existing(id),
                    &opts,
                    &Context::actor(),
                    &mut ctx.state,
                    &ctx.secrets,
                )
                .map_err(operation)?;
            out(&format!(
                "applied {} (rs_hash {})",
                applied.preview.summary,
                applied.rs_hash_after.map_or_else(|| "-".to_string(), |hash| hash.to_string())
            ))
        }
        ProposalsAction::Reject {
            id,
            reason,
        } => {
            let rejected = ctx
                .queue
                .reject(&ProposalId::from_existing(id), &Context::actor(), &reason)
                .map_err(operation)?;
            out(&format!("rejected {}", rejected.id))
        }
    }
}

/// Stable status label for listings.
const fn status_label(status: ProposalStatus) -> &'static str {
    match status {
        ProposalStatus::Pending => "pending",
        ProposalStatus::Applied => "applied",
        ProposalStatus::Rejected => "rejected",
        ProposalStatus::Failed => "failed",
    }
}

/// Executes the `project` command.
fn command_project(home: Option<PathBuf>, action: ProjectAction) -> CliResult<()> {
    let store = ProjectStore::new(resolve_home(home.clone()));
    match action {
        ProjectAction::Create {
            name,
        } => {
            let record = store.create(&name, &SystemClock).map_err(operation)?;
            out(&format!("created project {} ({})", record.name, record.id))
        }
        ProjectAction::List => {
            let active = store.get_active().map_err(operation)?.map(|record| record.id);
            for record in store.list().map_err(operation)? {
                let marker = if active.as_ref() == Some(&record.id) { "*" } else { " " };
                out(&format!("{marker} {} ({})", record.name, record.id))?;
            }
            Ok(())
        }
        ProjectAction::Select {
            id,
        } => {
            store.select(&ProjectId::new(id.clone())).map_err(operation)?;
            out(&format!("selected {id}"))
        }
        ProjectAction::Current => {
            let record =
                store.get_active().map_err(operation)?.ok_or(CliError::NoActiveProject)?;
            out(record.id.as_str())
        }
        ProjectAction::Show => {
            let ctx = Context::open(home)?;
            let record = ctx.store.get(&ctx.project_id).map_err(operation)?;
            out(&format!("project: {} ({})", record.name, record.id))?;
            out(&format!("created: {}", record.created_at))?;
            let config = ctx.state.resources.get();
            for root in &config.fs_roots {
                let perm = match root.perm {
                    archon_core::RootPerm::Ro => "ro",
                    archon_core::RootPerm::Rw => "rw",
                };
                out(&format!("fs root {} [{perm}] {}", root.id, root.abs_path))?;
            }
            out(&format!("net allowlist: {}", config.net_allowlist.join(", ")))?;
            out(&format!("secrets epoch: {}", config.secrets_epoch))
        }
        ProjectAction::Portability => {
            let ctx = Context::open(home)?;
            let mode = ctx.secrets.mode().map_err(operation)?;
            let mode_label = match mode {
                archon_store::SecretMode::Device => "device (machine-bound)",
                archon_store::SecretMode::Portable => "portable (passphrase-derived)",
            };
            out(&format!("secret mode: {mode_label}"))?;
            out(&format!("secrets epoch: {}", ctx.state.resources.get().secrets_epoch))?;
            out(&format!("ack epoch: {}", ctx.state.acks.ack_epoch()))?;
            out(&format!("stored secrets: {}", ctx.secrets.list_keys().map_err(operation)?.len()))
        }
    }
}

/// Executes the `demo` command: an in-memory governance walk-through.
async fn command_demo() -> CliResult<()> {
    let io: Arc<dyn StateIo> = Arc::new(archon_store::MemoryStateIo::new());
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let mut state =
        ProjectState::open(ProjectId::new("demo"), io.clone()).map_err(operation)?;
    let queue = ProposalQueue::new(io.clone(), ENGINE_VERSION, clock.clone());
    let home = std::env::temp_dir().join("archon-demo");
    let secrets = SecretStore::new(io.clone(), &home);

    state
        .modules
        .register(demo_manifest())
        .map_err(operation)?;

    let actor = Context::actor();
    for change in [
        ProposalChange::EnableModule {
            module_id: ModuleId::new("filesystem"),
        },
        ProposalChange::EnableCapability {
            capability_kind: CapabilityKind::FsRead,
        },
        ProposalChange::SetRestrictions {
            capability_kind: CapabilityKind::FsRead,
            rules: vec![RuleSpec {
                id: RuleId::new("docs-allow"),
                source: r#"allow fs.read where capability.params.path matches "./docs/**""#
                    .to_string(),
            }],
        },
    ] {
        let proposal = queue.create(change, actor.clone(), &state).map_err(operation)?;
        let opts = ApproveOptions {
            typed_ack_phrase: proposal.preview.required_ack_phrase.clone(),
            hazard_confirmed_pairs: proposal.preview.hazards_triggered.clone(),
            ..ApproveOptions::default()
        };
        queue.approve(&proposal.id, &opts, &actor, &mut state, &secrets).map_err(operation)?;
        out(&format!("applied: {}", proposal.preview.summary))?;
    }

    let active = state.build_snapshot(ENGINE_VERSION, clock.as_ref()).map_err(operation)?;
    out(&format!("rs_hash: {}", active.rs_hash))?;

    let sink = JsonlLogSink::decisions(io);
    let gate = ExecutionGate::new(clock).with_sink(Arc::new(sink.clone()));
    let agent = AgentId::new("demo-agent");

    for path in ["./docs/spec.md", "./src/main.rs"] {
        let action = CapabilityInstance {
            project_id: ProjectId::new("demo"),
            module_id: ModuleId::new("filesystem"),
            capability_id: archon_core::CapabilityId::new("read"),
            kind: "fs.read".to_string(),
            tier: archon_core::RiskTier::T1,
            params: BTreeMap::from([("path".to_string(), serde_json::json!(path))]),
        };
        let outcome = gate.invoke(&agent, &action, &active).await.map_err(operation)?;
        let decision = match outcome.evaluation.decision {
            archon_core::Decision::Permit => "permit",
            archon_core::Decision::Deny => "deny",
            archon_core::Decision::Escalate => "escalate",
        };
        out(&format!(
            "fs.read {path}: {decision} (triggered: {})",
            outcome.evaluation.triggered_rules.join(", ")
        ))?;
    }

    let logged = sink.read().map_err(operation)?;
    out(&format!("decision log entries: {}", logged.events.len()))
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod main_tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions may unwrap.")]

    use super::*;

    #[test]
    fn hazard_confirmations_parse_as_pairs() {
        let approval = ApprovalArgs {
            ack_phrase: Some("I ACCEPT T3 RISK (exec.run)".to_string()),
            confirm_hazards: vec!["exec.run, secrets.inject_env".to_string()],
            secret_value: None,
            passphrase: None,
        };
        let opts = approve_options(&approval).unwrap();
        assert_eq!(opts.hazard_confirmed_pairs.len(), 1);
        assert_eq!(opts.hazard_confirmed_pairs[0].a, CapabilityKind::ExecRun);
        assert_eq!(opts.hazard_confirmed_pairs[0].b, CapabilityKind::SecretsInjectEnv);
    }

    #[test]
    fn malformed_hazard_confirmation_is_rejected() {
        let approval = ApprovalArgs {
            ack_phrase: None,
            confirm_hazards: vec!["exec.run".to_string()],
            secret_value: None,
            passphrase: None,
        };
        assert!(matches!(
            approve_options(&approval),
            Err(CliError::InvalidArgument(_))
        ));
    }

    #[test]
    fn unknown_kind_is_an_argument_error() {
        assert!(matches!(parse_kind("fs.move"), Err(CliError::InvalidArgument(_))));
        assert!(parse_kind("fs.read").is_ok());
    }

    #[test]
    fn status_labels_are_stable() {
        assert_eq!(status_label(ProposalStatus::Pending), "pending");
        assert_eq!(status_label(ProposalStatus::Applied), "applied");
        assert_eq!(status_label(ProposalStatus::Rejected), "rejected");
        assert_eq!(status_label(ProposalStatus::Failed), "failed");
    }
}

/// Manifest used by the demo scenario.
fn demo_manifest() -> ModuleManifest {
    ModuleManifest {
        module_id: ModuleId::new("filesystem"),
        version: "1.0.0".to_string(),
        description: "Demo filesystem module".to_string(),
        author: "archon".to_string(),
        license: "Apache-2.0".to_string(),
        content_hash: None,
        capabilities: vec![archon_core::CapabilityDescriptor {
            capability_id: archon_core::CapabilityId::new("read"),
            kind: CapabilityKind::FsRead,
            tier: archon_core::RiskTier::T1,
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
