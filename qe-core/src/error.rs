//! Error types for the query-engine core.
//!
//! Structural plan errors and budget errors are fatal (they stop
//! execution); operator runtime errors are non-fatal and surface only
//! through the trace.

use thiserror::Error;

/// Fatal errors raised while resolving or executing a plan.
///
/// Every variant here corresponds to one of the "fatal classes" in the
/// executor's error taxonomy: an unknown operator, a missing or forward
/// input reference, a duplicate step key, or a budget violation.
#[non_exhaustive]
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoreError {
    /// The plan referenced an operator not present in the registry.
    #[error("unknown operator: {0}")]
    UnknownOperator(String),

    /// A step's `input` referenced a step id that produced no output.
    #[error("missing input reference: {0}")]
    MissingInput(String),

    /// A step's `input` referenced a step id that has not executed yet.
    #[error("forward input reference: {0}")]
    ForwardReference(String),

    /// Two steps in the same plan resolved to the same step key.
    #[error("duplicate step key: {0}")]
    DuplicateStepKey(String),

    /// The step's cost would have pushed `spent_usd` above `limit_usd`.
    #[error("budget exceeded: spent {spent} + step {step_cost} > limit {limit}")]
    BudgetExceeded {
        /// Amount already committed before this step.
        spent: rust_decimal::Decimal,
        /// The cost this step would have incurred.
        step_cost: rust_decimal::Decimal,
        /// The budget ceiling.
        limit: rust_decimal::Decimal,
    },

    /// The plan itself is malformed independent of any single step
    /// (e.g. empty step list when the caller requires at least one step).
    #[error("malformed plan: {0}")]
    MalformedPlan(String),

    /// An external caller cancelled the execution mid-flight.
    #[error("cancelled")]
    Cancelled,
}

impl CoreError {
    /// Short machine-readable name, used to populate `StepTrace.error.name`.
    pub fn name(&self) -> &'static str {
        match self {
            CoreError::UnknownOperator(_) => "UnknownOperator",
            CoreError::MissingInput(_) => "MissingInput",
            CoreError::ForwardReference(_) => "ForwardReference",
            CoreError::DuplicateStepKey(_) => "DuplicateStepKey",
            CoreError::BudgetExceeded { .. } => "BudgetExceeded",
            CoreError::MalformedPlan(_) => "MalformedPlan",
            CoreError::Cancelled => "Cancelled",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn error_names_are_stable() {
        assert_eq!(CoreError::UnknownOperator("x".into()).name(), "UnknownOperator");
        assert_eq!(
            CoreError::BudgetExceeded {
                spent: Decimal::ZERO,
                step_cost: Decimal::ONE,
                limit: Decimal::ZERO
            }
            .name(),
            "BudgetExceeded"
        );
        assert_eq!(CoreError::Cancelled.name(), "Cancelled");
    }

    #[test]
    fn budget_exceeded_display() {
        let err = CoreError::BudgetExceeded {
            spent: Decimal::new(150, 2),
            step_cost: Decimal::new(100, 2),
            limit: Decimal::new(200, 2),
        };
        assert_eq!(
            err.to_string(),
            "budget exceeded: spent 1.50 + step 1.00 > limit 2.00"
        );
    }
}
