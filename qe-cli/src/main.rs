//! `qe` — plans a query, executes it against a sample corpus, and prints a
//! cited answer. There is no concrete LLM provider wired in; the planner
//! and synthesizer calls are served by a `FakeProvider` loaded with
//! responses appropriate to the demo corpus, standing in for wherever a
//! real `qe_provider::Provider` implementation would be plugged in.

mod config;
mod error;
mod fixtures;

use config::EngineConfig;
use error::CliError;
use qe_core::Budget;
use qe_ops::OperatorRegistry;
use qe_provider::FakeProvider;
use rust_decimal::Decimal;
use std::io::Read;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();
    if let Err(err) = run_cli().await {
        eprintln!("qe error: {err}");
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<(), CliError> {
    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let mut command = "run".to_string();
    if let Some(first) = args.first().cloned() {
        if first == "run" || first == "--help" || first == "-h" {
            command = first;
            args.remove(0);
        } else if first.starts_with('-') {
            // bare flags default to `run`
        } else {
            return Err(CliError::Usage(format!("unknown subcommand: {first}")));
        }
    }

    if command == "--help" || command == "-h" {
        print_usage();
        return Ok(());
    }

    let mut query: Option<String> = None;
    let mut budget_usd: Option<Decimal> = None;
    let mut config_path: Option<PathBuf> = None;

    let mut remaining = args;
    while let Some(flag) = remaining.first().cloned() {
        remaining.remove(0);
        match flag.as_str() {
            "--query" => query = Some(take_arg("--query", &mut remaining)?),
            "--budget" => {
                let raw = take_arg("--budget", &mut remaining)?;
                budget_usd = Some(
                    Decimal::from_str(&raw)
                        .map_err(|e| CliError::Usage(format!("invalid --budget value {raw:?}: {e}")))?,
                );
            }
            "--config" => config_path = Some(PathBuf::from(take_arg("--config", &mut remaining)?)),
            other => return Err(CliError::Usage(format!("unknown flag: {other}"))),
        }
    }

    let query = match query {
        Some(text) => text,
        None => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            let trimmed = buffer.trim().to_string();
            if trimmed.is_empty() {
                "Is there a dispute about money in these messages?".to_string()
            } else {
                trimmed
            }
        }
    };

    let config = match &config_path {
        Some(path) => EngineConfig::load_from_file(path)?,
        None => EngineConfig::default(),
    };
    let budget_usd = budget_usd.unwrap_or(config.default_budget_usd);

    run_pipeline(&query, budget_usd, &config).await
}

async fn run_pipeline(query: &str, budget_usd: Decimal, config: &EngineConfig) -> Result<(), CliError> {
    let corpus = fixtures::sample_corpus();
    let summary = qe_planner::summarize(&corpus, false);

    let planner_provider = FakeProvider::constant(demo_plan_response(), 1);
    let planner = qe_planner::Planner::new(planner_provider, "general-reasoner");
    let plan = planner.plan(query, &summary).await?;

    println!("query interpretation: {}", plan.query_interpretation);
    println!("reasoning: {}", plan.reasoning_summary);

    let registry = OperatorRegistry::new(Arc::new(FakeProvider::new(demo_label_responses())));
    let price_table = config.price_table.resolve()?;
    let mut budget = Budget::new(budget_usd);

    let result = qe_exec::execute(
        &plan,
        &corpus,
        &registry,
        &mut budget,
        &price_table,
        Some(7),
        config.concurrency,
        &config.default_model,
        &tokio_util::sync::CancellationToken::new(),
    )
    .await;

    println!("\ntrace:");
    for step in &result.trace {
        println!(
            "  [{}] {:?} in={} out={} cost=${} {}ms",
            step.step.op, step.status, step.input_count, step.output_count, step.cost_usd, step.duration_ms
        );
    }
    if result.stopped_early {
        println!("(plan halted early)");
    }

    let synth_provider = FakeProvider::constant(demo_answer_response(), 1);
    let synthesizer = qe_planner::Synthesizer::new(synth_provider, "general-reasoner");
    let synthesis = synthesizer.synthesize(query, &result.final_docset, &result.trace, &corpus).await;

    println!("\nanswer:\n{}", synthesis.answer);
    for citation in &synthesis.citations {
        println!("  [{}] {}", citation.doc_id, citation.preview);
    }

    Ok(())
}

/// A canned plan: classify each thread for an expense dispute, then keep
/// only the threads where it found one.
fn demo_plan_response() -> String {
    serde_json::json!({
        "query_interpretation": "messages discussing a disagreement over money",
        "steps": [
            {
                "op": "label",
                "args_json": "{\"schema\":\"Does this thread contain a disagreement about money?\",\"unit\":\"thread\"}",
                "id": "classify",
                "input": "corpus",
                "rationale": "fuzzy concept, skip Tier 1 and classify per thread"
            },
            {
                "op": "filter_by_label",
                "args_json": "{\"condition\":\"matches == true AND confidence > 0.6\"}",
                "input": "classify",
                "rationale": "keep only threads the model flagged"
            }
        ],
        "total_estimated_cost": 0.01,
        "reasoning_summary": "Thread-level classification finds the disagreement directly; deterministic keyword search would miss indirect phrasing."
    })
    .to_string()
}

/// One classification response per thread, in first-seen order:
/// `t-pickup`, `t-expense`, `t-school`.
fn demo_label_responses() -> Vec<Result<qe_provider::GenerateResponse, qe_provider::ProviderError>> {
    let response = |label: &str, confidence: f64, cited: &[&str]| {
        Ok(qe_provider::GenerateResponse {
            output_text: serde_json::json!({
                "label": label,
                "confidence": confidence,
                "cited_messages": cited,
            })
            .to_string(),
            usage: None,
        })
    };
    vec![
        response("false", 0.9, &[]),
        response("true", 0.88, &["doc-004", "doc-005", "doc-006"]),
        response("false", 0.95, &[]),
    ]
}

fn demo_answer_response() -> String {
    serde_json::json!({
        "answer": "Yes. In the orthodontist-bill thread, Tom asked Sarah to split a $250 charge [doc-004], Sarah disagreed that she still owed her share [doc-005], and Tom proposed splitting future expenses evenly [doc-006].",
        "citations": [
            {"doc_id": "doc-004", "message_number": 4, "preview": "orthodontist bill came to $250"},
            {"doc_id": "doc-005", "message_number": 5, "preview": "I disagree this is owed"},
            {"doc_id": "doc-006", "message_number": 6, "preview": "split the $250 evenly"}
        ],
        "thread_grouped": true
    })
    .to_string()
}

fn take_arg(flag: &str, remaining: &mut Vec<String>) -> Result<String, CliError> {
    if remaining.is_empty() {
        return Err(CliError::Usage(format!("missing value for {flag}")));
    }
    Ok(remaining.remove(0))
}

fn print_usage() {
    println!(
        "qe run [--query TEXT] [--budget USD] [--config PATH]\n\
Plans the query, executes it against a built-in sample corpus, and prints a cited answer.\n\
If --query is omitted, the query is read from stdin (or a default demo query is used).\n\
If --budget is omitted, the configured default_budget_usd is used.\n\
--config loads a TOML or JSON file overriding concurrency, default_budget_usd, price_table, and default_model."
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_arg_consumes_the_next_token() {
        let mut remaining = vec!["1.50".to_string(), "--query".to_string()];
        let value = take_arg("--budget", &mut remaining).unwrap();
        assert_eq!(value, "1.50");
        assert_eq!(remaining, vec!["--query".to_string()]);
    }

    #[test]
    fn take_arg_errors_when_exhausted() {
        let mut remaining = Vec::new();
        assert!(take_arg("--budget", &mut remaining).is_err());
    }

    #[test]
    fn demo_plan_response_parses_as_valid_json() {
        let parsed: serde_json::Value = serde_json::from_str(&demo_plan_response()).unwrap();
        assert!(parsed["steps"].is_array());
    }
}
