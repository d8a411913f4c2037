//! The plan executor's state machine.
//!
//! One `async fn` loop, no spawned tasks — plan steps never run
//! concurrently with each other, only the LLM calls inside a single
//! Tier-3 step fan out (that happens inside `qe-ops`, not here).

use std::collections::HashMap;

use chrono::Utc;
use qe_core::{
    AuditEntry, Corpus, CoreError, DocSet, ExecutionResult, Plan, PlanStep, StepInput, StepStatus,
    StepTrace, TraceError,
};
use qe_ops::{ExecContext, ModelSelection, OperatorRegistry};
use qe_provider::PriceTable;
use rust_decimal::Decimal;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Runs `plan` against `corpus`, charging costs against `budget` as steps
/// complete. `rng_seed` is forwarded to operators (`sample`) that need
/// reproducible randomness; `concurrency_cap` and `model_selection` are
/// forwarded to Tier-3 operators as their configured defaults. `cancellation`
/// is checked between steps; a caller that cancels it mid-run gets back a
/// `CoreError::Cancelled` trace instead of the plan running to completion.
#[allow(clippy::too_many_arguments)]
pub async fn execute(
    plan: &Plan,
    corpus: &Corpus,
    registry: &OperatorRegistry,
    budget: &mut qe_core::Budget,
    price_table: &PriceTable,
    rng_seed: Option<u64>,
    concurrency_cap: usize,
    model_selection: &ModelSelection,
    cancellation: &CancellationToken,
) -> ExecutionResult {
    if let Err(core_err) = plan.validate() {
        return ExecutionResult {
            final_docset: DocSet::from_corpus(corpus),
            trace: Vec::new(),
            total_cost: Decimal::ZERO,
            stopped_early: true,
            error: Some(trace_error(&core_err)),
        };
    }

    let mut step_outputs: HashMap<String, DocSet> = HashMap::new();
    let mut current_docset = DocSet::from_corpus(corpus);
    let mut trace = Vec::with_capacity(plan.steps.len());
    let mut total_cost = Decimal::ZERO;

    for (index, step) in plan.steps.iter().enumerate() {
        let key = step.key(index);

        if cancellation.is_cancelled() {
            let core_err = CoreError::Cancelled;
            trace.push(fatal_trace(step, current_docset.len(), &core_err));
            return ExecutionResult {
                final_docset: current_docset,
                trace,
                total_cost,
                stopped_early: true,
                error: Some(trace_error(&core_err)),
            };
        }

        let input_docset = match resolve_input(step, index, corpus, &current_docset, &step_outputs) {
            Ok(docset) => docset,
            Err(core_err) => {
                trace.push(fatal_trace(step, current_docset.len(), &core_err));
                return ExecutionResult {
                    final_docset: current_docset,
                    trace,
                    total_cost,
                    stopped_early: true,
                    error: Some(trace_error(&core_err)),
                };
            }
        };

        let Some((_tier, operator)) = registry.get(&step.op) else {
            let core_err = CoreError::UnknownOperator(step.op.clone());
            trace.push(fatal_trace(step, input_docset.len(), &core_err));
            return ExecutionResult {
                final_docset: current_docset,
                trace,
                total_cost,
                stopped_early: true,
                error: Some(trace_error(&core_err)),
            };
        };

        let ctx = ExecContext {
            corpus,
            price_table,
            rng_seed,
            concurrency_cap,
            model_selection,
        };

        let span = tracing::info_span!("plan_step", index, op = %step.op, key = %key);
        let outcome = operator
            .apply(&input_docset, &step.args, &ctx)
            .instrument(span)
            .await;

        match outcome {
            Ok(result) => {
                match budget.charge(result.meta.cost_usd) {
                    Ok(_) => {
                        tracing::debug!(op = %step.op, cost = %result.meta.cost_usd, "operator committed");
                        total_cost += result.meta.cost_usd;
                        let committed = result.docset.with_audit(AuditEntry {
                            op: step.op.clone(),
                            args: step.args.clone(),
                            timestamp: Utc::now(),
                            input_count: input_docset.len(),
                            output_count: result.meta.result_count,
                            duration_ms: result.meta.duration_ms,
                            cost_usd: result.meta.cost_usd,
                        });
                        trace.push(StepTrace {
                            step: step.clone(),
                            input_count: input_docset.len(),
                            output_count: result.meta.result_count,
                            duration_ms: result.meta.duration_ms,
                            cost_usd: result.meta.cost_usd,
                            status: StepStatus::Complete,
                            detail: result.meta.detail,
                            error: None,
                        });
                        step_outputs.insert(key, committed.clone());
                        current_docset = committed;
                    }
                    Err(core_err) => {
                        tracing::warn!(op = %step.op, "budget exceeded, halting plan");
                        trace.push(fatal_trace(step, input_docset.len(), &core_err));
                        return ExecutionResult {
                            final_docset: current_docset,
                            trace,
                            total_cost,
                            stopped_early: true,
                            error: Some(trace_error(&core_err)),
                        };
                    }
                }
            }
            Err(op_err) => {
                tracing::warn!(op = %step.op, error = %op_err, "operator failed non-fatally, passing input through");
                let passthrough = input_docset.with_audit(AuditEntry::passthrough(
                    step.op.clone(),
                    input_docset.len(),
                    Utc::now(),
                ));
                trace.push(StepTrace {
                    step: step.clone(),
                    input_count: input_docset.len(),
                    output_count: passthrough.len(),
                    duration_ms: 0,
                    cost_usd: Decimal::ZERO,
                    status: StepStatus::Error,
                    detail: serde_json::json!({}),
                    error: Some(TraceError {
                        name: "OperatorError".to_string(),
                        message: op_err.to_string(),
                        code: None,
                        detail: None,
                    }),
                });
                step_outputs.insert(key, passthrough.clone());
                current_docset = passthrough;
            }
        }
    }

    ExecutionResult {
        final_docset: current_docset,
        trace,
        total_cost,
        stopped_early: false,
        error: None,
    }
}

fn resolve_input(
    step: &PlanStep,
    index: usize,
    corpus: &Corpus,
    previous: &DocSet,
    step_outputs: &HashMap<String, DocSet>,
) -> Result<DocSet, CoreError> {
    match &step.input {
        None if index == 0 => Ok(DocSet::from_corpus(corpus)),
        None => Ok(previous.clone()),
        Some(StepInput::Corpus) => Ok(DocSet::from_corpus(corpus)),
        Some(StepInput::Step(id)) => step_outputs
            .get(id)
            .cloned()
            .ok_or_else(|| CoreError::MissingInput(id.clone())),
        Some(StepInput::Steps(ids)) => {
            let resolved: Vec<&DocSet> = ids
                .iter()
                .map(|id| step_outputs.get(id).ok_or_else(|| CoreError::MissingInput(id.clone())))
                .collect::<Result<_, _>>()?;
            if step.op == "intersect" {
                Ok(DocSet::intersect(&resolved))
            } else {
                Ok(DocSet::union(&resolved))
            }
        }
    }
}

fn fatal_trace(step: &PlanStep, count: usize, err: &CoreError) -> StepTrace {
    StepTrace {
        step: step.clone(),
        input_count: count,
        output_count: count,
        duration_ms: 0,
        cost_usd: Decimal::ZERO,
        status: StepStatus::Error,
        detail: serde_json::json!({}),
        error: Some(trace_error(err)),
    }
}

fn trace_error(err: &CoreError) -> TraceError {
    TraceError {
        name: err.name().to_string(),
        message: err.to_string(),
        code: None,
        detail: None,
    }
}
