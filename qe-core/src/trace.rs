//! Per-step telemetry and the executor's caller-visible result.

use crate::docset::DocSet;
use crate::plan::PlanStep;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Outcome of a single step's attempted execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// The operator ran and its result was committed.
    Complete,
    /// The operator failed non-fatally; the input passed through unchanged.
    Error,
}

/// A non-fatal or fatal error surfaced on a [`StepTrace`] or in an
/// [`ExecutionResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceError {
    /// Short machine-readable error class, e.g. `"UnknownOperator"`.
    pub name: String,
    /// Human-readable message.
    pub message: String,
    /// Optional machine-readable code for programmatic handling.
    pub code: Option<String>,
    /// Optional structured detail.
    pub detail: Option<serde_json::Value>,
}

/// Per-step telemetry recorded for every attempted plan step, whether or
/// not it succeeded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepTrace {
    /// The step as it appeared in the plan.
    pub step: PlanStep,
    /// Documents the step received.
    pub input_count: usize,
    /// Documents the step returned.
    pub output_count: usize,
    /// Wall-clock time the step took.
    pub duration_ms: u64,
    /// Cost incurred by this step.
    pub cost_usd: Decimal,
    /// Whether the step completed or errored.
    pub status: StepStatus,
    /// Operator-specific detail (e.g. `matched_terms`, `groups`, `points`).
    pub detail: serde_json::Value,
    /// Present only when `status == Error`.
    pub error: Option<TraceError>,
}

/// The executor's caller-visible result for a whole plan run.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    /// The DocSet produced by the last successfully committed step (or the
    /// full corpus if no step ever committed).
    pub final_docset: DocSet,
    /// One trace entry per attempted step, in plan order.
    pub trace: Vec<StepTrace>,
    /// Sum of every committed step's cost.
    pub total_cost: Decimal,
    /// Whether a fatal error stopped the plan before it finished.
    pub stopped_early: bool,
    /// Present only when `stopped_early` is true.
    pub error: Option<TraceError>,
}
