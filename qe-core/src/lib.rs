#![deny(missing_docs)]
//! # qe-core — document, docset, budget, and plan types
//!
//! The shared data model for the query engine: [`Document`]/[`Corpus`],
//! the [`DocSet`] algebra, [`Label`] polymorphism, [`Budget`] and
//! [`AuditEntry`], and [`Plan`]/[`PlanStep`] (the planner's output, the
//! executor's input).
//!
//! This crate has no opinion on *how* operators run or *how* an LLM call is
//! made — those are `qe-ops`, `qe-exec`, and `qe-provider`'s concerns. It
//! only defines the values that flow between them.

/// The append-only audit trail.
pub mod audit;
/// The monetary budget type.
pub mod budget;
/// The DocSet algebra.
pub mod docset;
/// Document and Corpus types.
pub mod document;
/// Core error taxonomy.
pub mod error;
/// Typed id wrappers.
pub mod id;
/// Label polymorphism.
pub mod label;
/// Plan and PlanStep types.
pub mod plan;
/// Per-step telemetry types.
pub mod trace;

pub use audit::AuditEntry;
pub use budget::Budget;
pub use docset::DocSet;
pub use document::{Corpus, Document, DocumentMetadata};
pub use error::CoreError;
pub use id::{DocId, StepKey, ThreadId};
pub use label::{ExtractionItem, Label, LabelMap, LabelValue, Span, ThreadMeta, ThreadUnit};
pub use plan::{Plan, PlanStep, StepInput};
pub use trace::{ExecutionResult, StepStatus, StepTrace, TraceError};
