// crates/archon-core/src/runtime/mod.rs
// ============================================================================
// Module: Archon Runtime
// Description: DRR evaluation, the validation engine, and the execution gate.
// Purpose: Group the enforcement path from action to audited outcome.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! The runtime is the enforcement path: pure rule evaluation, the ordered
//! validation checks, and the gate that binds evaluation to a mandatory audit
//! record. Only the gate suspends (at handler calls and sink appends);
//! everything else is synchronous and pure.

/// Ordered enforcement checks.
pub mod engine;
/// Restriction-rule evaluation.
pub mod evaluator;
/// The execution gate.
pub mod gate;

pub use engine::ValidationEngine;
pub use evaluator::DrrOutcome;
pub use evaluator::evaluate_drrs;
pub use gate::ExecutionGate;
pub use gate::GateError;
pub use gate::GateOutcome;
pub use gate::HandlerOutcome;
