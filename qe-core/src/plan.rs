//! Plan and PlanStep — the planner's output, the executor's input.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Where a step's input DocSet comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StepInput {
    /// Use the full corpus.
    Corpus,
    /// Use a single prior step's output.
    Step(String),
    /// Union (or, for `op: "intersect"`, intersect) multiple prior steps' outputs.
    Steps(Vec<String>),
}

/// One operator application within a plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanStep {
    /// Name of the operator to invoke; must be in the registry.
    pub op: String,
    /// Operator-specific arguments.
    pub args: serde_json::Value,
    /// Optional label for cross-reference by later steps. When absent the
    /// executor assigns the synthetic key `_step_<index>`.
    pub id: Option<String>,
    /// Where this step's input DocSet comes from. `None` means "the literal
    /// tag `corpus` if this is the first step, else the previous step's
    /// output."
    pub input: Option<StepInput>,
    /// Free-text explanation from the planner, carried through for
    /// debugging/audit but never interpreted by the executor.
    pub rationale: Option<String>,
    /// The planner's cost estimate for this step, informational only.
    pub estimated_cost: Option<rust_decimal::Decimal>,
}

impl PlanStep {
    /// The stable key this step is addressed by: its `id` if present, else
    /// the synthetic `_step_<index>`.
    pub fn key(&self, index: usize) -> String {
        self.id.clone().unwrap_or_else(|| format!("_step_{index}"))
    }
}

/// An ordered sequence of [`PlanStep`]s. Any `input` reference must name a
/// step appearing earlier in the sequence, or the literal tag `corpus`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    /// The planner's restatement of what it understood the query to mean.
    pub query_interpretation: String,
    /// The steps to execute, in order.
    pub steps: Vec<PlanStep>,
    /// Sum of each step's `estimated_cost`, informational only.
    pub total_estimated_cost: rust_decimal::Decimal,
    /// The planner's explanation of why it chose this shape of plan.
    pub reasoning_summary: String,
}

impl Plan {
    /// Validate that every `input` reference is either `corpus` or an
    /// earlier step, and that no two steps share a key. This is a
    /// static check the executor also performs incrementally as it runs;
    /// exposing it standalone lets callers reject a malformed plan before
    /// spending any budget.
    pub fn validate(&self) -> Result<(), CoreError> {
        let mut seen_keys: HashSet<String> = HashSet::new();
        for (index, step) in self.steps.iter().enumerate() {
            let key = step.key(index);
            if !seen_keys.insert(key.clone()) {
                return Err(CoreError::DuplicateStepKey(key));
            }
            match &step.input {
                None | Some(StepInput::Corpus) => {}
                Some(StepInput::Step(id)) => {
                    if !seen_keys.contains(id) || id == &key {
                        return Err(CoreError::ForwardReference(id.clone()));
                    }
                }
                Some(StepInput::Steps(ids)) => {
                    for id in ids {
                        if !seen_keys.contains(id) || id == &key {
                            return Err(CoreError::ForwardReference(id.clone()));
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use serde_json::json;

    fn step(op: &str, id: Option<&str>, input: Option<StepInput>) -> PlanStep {
        PlanStep {
            op: op.into(),
            args: json!({}),
            id: id.map(String::from),
            input,
            rationale: None,
            estimated_cost: None,
        }
    }

    fn plan(steps: Vec<PlanStep>) -> Plan {
        Plan {
            query_interpretation: "test".into(),
            steps,
            total_estimated_cost: Decimal::ZERO,
            reasoning_summary: "test".into(),
        }
    }

    #[test]
    fn step_key_falls_back_to_synthetic() {
        let s = step("search_lex", None, None);
        assert_eq!(s.key(2), "_step_2");
        let s2 = step("search_lex", Some("lex"), None);
        assert_eq!(s2.key(2), "lex");
    }

    #[test]
    fn valid_plan_with_backward_reference_passes() {
        let p = plan(vec![
            step("search_lex", Some("lex"), None),
            step("search_regex", Some("rx"), None),
            step(
                "union",
                None,
                Some(StepInput::Steps(vec!["lex".into(), "rx".into()])),
            ),
        ]);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn forward_reference_is_rejected() {
        let p = plan(vec![step(
            "union",
            None,
            Some(StepInput::Steps(vec!["later".into()])),
        )]);
        assert!(matches!(
            p.validate(),
            Err(CoreError::ForwardReference(_))
        ));
    }

    #[test]
    fn duplicate_step_key_is_rejected() {
        let p = plan(vec![
            step("search_lex", Some("dup"), None),
            step("search_regex", Some("dup"), None),
        ]);
        assert!(matches!(p.validate(), Err(CoreError::DuplicateStepKey(_))));
    }
}
