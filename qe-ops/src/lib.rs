#![deny(missing_docs)]
//! # qe-ops — the operator registry and the operators themselves
//!
//! Eleven Tier-1 (deterministic, free) operators, two Tier-3 (LLM-backed,
//! priced) operators, the thread grouper they share, and the
//! `filter_by_label` condition grammar. `qe-exec` drives this crate;
//! `qe-ops` has no opinion on plans, budgets, or step ordering.

/// The `filter_by_label` condition grammar.
pub mod condition;
/// `OperatorError`, this crate's error taxonomy.
pub mod error;
/// The operator dispatch table.
pub mod registry;
/// The thread grouper.
pub mod thread;
/// Tier-1 deterministic operators.
pub mod tier1;
/// Tier-3 LLM-backed operators.
pub mod tier3;

pub use condition::Condition;
pub use error::OperatorError;
pub use registry::{ExecContext, OpMeta, OpResult, OperatorImpl, OperatorRegistry, Tier};
pub use thread::{group_by_thread, ThreadGroup};
pub use tier3::ModelSelection;
