//! The planner: one structured LLM call turning a query into a [`Plan`].

use qe_core::{Plan, PlanStep, StepInput};
use qe_provider::{GenerateRequest, Provider, ReasoningEffort};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::corpus_summary::CorpusSummary;
use crate::error::PlannerError;

const INSTRUCTIONS: &str = r#"You turn a natural-language question about a corpus of conversational
messages into an execution plan: a JSON object with `query_interpretation`,
`steps`, `total_estimated_cost`, and `reasoning_summary`.

Rules:
1. Narrow with deterministic Tier-1 operators first, but only when a
   deterministic filter has high recall for the target concept. Fuzzy,
   conversational, or indirect concepts must skip Tier 1 and go straight to
   thread-level Tier 3 classification.
2. Default to `unit: "thread"` for conversational corpora.
3. Prefer a single compound thread-level `label` call over a multi-step
   chain of narrower deterministic operators.
4. Label before filter: classify with `label`, then narrow with
   `filter_by_label`. Never conflate the two into one step.
5. Produce a linear plan unless branching is genuinely required; use
   explicit `id` and `input` only where a later step references a
   non-previous output.

The operator registry is closed: filter_metadata, search_lex, search_regex,
top_k, sample, get_context, count, trend, filter_by_label, union, intersect,
label, extract. The `filter_by_label` condition grammar supports AND only —
never claim OR support.

Each step is `{op, args_json, id, input, rationale, estimated_cost}`.
`args_json` is a JSON object encoded as a string. `input` is the empty
string (previous step), `"corpus"`, a single step id, or a comma-separated
list of step ids."#;

#[derive(Debug, Deserialize)]
struct RawStep {
    op: String,
    args_json: String,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    input: Option<String>,
    #[serde(default)]
    rationale: Option<String>,
    #[serde(default)]
    estimated_cost: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
struct RawPlan {
    query_interpretation: String,
    steps: Vec<RawStep>,
    total_estimated_cost: Decimal,
    reasoning_summary: String,
}

fn plan_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "query_interpretation": { "type": "string" },
            "steps": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "op": { "type": "string" },
                        "args_json": { "type": "string" },
                        "id": { "type": "string" },
                        "input": { "type": "string" },
                        "rationale": { "type": "string" },
                        "estimated_cost": { "type": "number" },
                    },
                    "required": ["op", "args_json"],
                },
            },
            "total_estimated_cost": { "type": "number" },
            "reasoning_summary": { "type": "string" },
        },
        "required": ["query_interpretation", "steps", "total_estimated_cost", "reasoning_summary"],
    })
}

fn parse_input(raw: Option<&str>) -> Option<StepInput> {
    match raw {
        None => None,
        Some(s) if s.is_empty() => None,
        Some("corpus") => Some(StepInput::Corpus),
        Some(s) if s.contains(',') => {
            Some(StepInput::Steps(s.split(',').map(|id| id.trim().to_string()).collect()))
        }
        Some(s) => Some(StepInput::Step(s.to_string())),
    }
}

fn into_plan(raw: RawPlan) -> Result<Plan, PlannerError> {
    let steps = raw
        .steps
        .into_iter()
        .map(|raw_step| {
            let args = serde_json::from_str(&raw_step.args_json)
                .map_err(|e| PlannerError::InvalidResponse(format!("args_json for {}: {e}", raw_step.op)))?;
            Ok(PlanStep {
                op: raw_step.op,
                args,
                id: raw_step.id,
                input: parse_input(raw_step.input.as_deref()),
                rationale: raw_step.rationale,
                estimated_cost: raw_step.estimated_cost,
            })
        })
        .collect::<Result<Vec<_>, PlannerError>>()?;

    let plan = Plan {
        query_interpretation: raw.query_interpretation,
        steps,
        total_estimated_cost: raw.total_estimated_cost,
        reasoning_summary: raw.reasoning_summary,
    };
    plan.validate().map_err(|e| PlannerError::InvalidResponse(e.to_string()))?;
    Ok(plan)
}

/// Compiles a natural-language query into a [`Plan`] via a single structured
/// LLM call.
pub struct Planner<P: Provider> {
    provider: P,
    model: String,
}

impl<P: Provider> Planner<P> {
    /// Build a planner backed by `provider`, using `model` for its one call.
    pub fn new(provider: P, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    /// Produce a plan for `query` against `summary`.
    pub async fn plan(&self, query: &str, summary: &CorpusSummary) -> Result<Plan, PlannerError> {
        let input = serde_json::json!({
            "query": query,
            "corpus_summary": summary,
        })
        .to_string();

        let request = GenerateRequest {
            model: self.model.clone(),
            instructions: INSTRUCTIONS.to_string(),
            input,
            reasoning_effort: ReasoningEffort::Medium,
            json_schema: plan_schema(),
        };

        tracing::debug!(model = %self.model, query_len = query.len(), "requesting plan");
        let response = self.provider.generate_structured(request).await?;
        let raw: RawPlan = serde_json::from_str(&response.output_text).map_err(|e| {
            tracing::warn!(error = %e, "planner response did not parse");
            PlannerError::InvalidResponse(e.to_string())
        })?;
        let plan = into_plan(raw)?;
        tracing::debug!(steps = plan.steps.len(), "plan compiled");
        Ok(plan)
    }
}
