//! End-to-end plan execution scenarios: one test per documented scenario,
//! each built directly against a [`qe_core::Plan`] so the executor's
//! behavior is tested independently of planner output parsing.

use chrono::{DateTime, Utc};
use qe_core::{Budget, Corpus, DocId, Document, DocumentMetadata, Plan, PlanStep, StepInput, StepStatus, ThreadId};
use qe_ops::OperatorRegistry;
use qe_provider::{FakeProvider, PriceTable};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::str::FromStr;
use std::sync::Arc;

fn doc(id: &str, sender: &str, thread: Option<&str>, ts: &str, text: &str) -> Document {
    Document {
        id: DocId::from(id),
        source: "vendor-report".into(),
        timestamp: DateTime::parse_from_rfc3339(ts).unwrap().with_timezone(&Utc),
        text: text.into(),
        metadata: DocumentMetadata {
            sender: sender.into(),
            recipient: "other".into(),
            thread_id: thread.map(ThreadId::from),
            subject: None,
            word_count: text.split_whitespace().count() as u32,
            message_number: None,
        },
    }
}

/// A 59-document corpus where `doc-026` is the only message mentioning a
/// lawyer; every other document is unrelated filler.
fn fifty_nine_doc_corpus() -> Corpus {
    let docs = (0..59)
        .map(|i| {
            let id = format!("doc-{i:03}");
            let sender = if i % 2 == 0 { "Sarah Mitchell" } else { "Tom Mitchell" };
            let ts = format!("2024-01-{:02}T08:00:00Z", (i % 28) + 1);
            let text = if id == "doc-026" {
                "I spoke with my lawyer about the custody schedule.".to_string()
            } else {
                format!("Just checking in about pickup, message {i}.")
            };
            doc(&id, sender, None, &ts, &text)
        })
        .collect();
    Corpus::new(docs)
}

fn step(op: &str, args: serde_json::Value, id: Option<&str>, input: Option<StepInput>) -> PlanStep {
    PlanStep {
        op: op.to_string(),
        args,
        id: id.map(String::from),
        input,
        rationale: None,
        estimated_cost: None,
    }
}

fn linear_plan(steps: Vec<PlanStep>) -> Plan {
    Plan {
        query_interpretation: "test plan".to_string(),
        steps,
        total_estimated_cost: Decimal::ZERO,
        reasoning_summary: "test".to_string(),
    }
}

fn empty_registry() -> OperatorRegistry {
    OperatorRegistry::new(Arc::new(FakeProvider::new(vec![])))
}

#[tokio::test]
async fn s1_simple_keyword_narrowing() {
    let corpus = fifty_nine_doc_corpus();
    let plan = linear_plan(vec![step(
        "search_lex",
        serde_json::json!({"terms": ["lawyer"], "mode": "any"}),
        None,
        None,
    )]);
    let registry = empty_registry();
    let price_table = PriceTable::empty();
    let mut budget = Budget::new(dec!(100));

    let result = qe_exec::execute(&plan, &corpus, &registry, &mut budget, &price_table, None, 10, &qe_ops::ModelSelection::default(), &tokio_util::sync::CancellationToken::new()).await;

    assert!(!result.stopped_early);
    assert_eq!(result.total_cost, Decimal::ZERO);
    assert_eq!(result.trace.len(), 1);
    assert_eq!(result.trace[0].output_count, 1);
    assert_eq!(result.final_docset.documents()[0].id, DocId::from("doc-026"));
}

#[tokio::test]
async fn s2_metadata_filter_then_top_k() {
    let docs = (0..6)
        .map(|i| {
            let sender = if i % 2 == 0 { "Sarah Mitchell" } else { "Tom Mitchell" };
            doc(
                &format!("doc-{i}"),
                sender,
                None,
                &format!("2024-01-{:02}T08:00:00Z", i + 1),
                "hello",
            )
        })
        .collect();
    let corpus = Corpus::new(docs);
    let plan = linear_plan(vec![
        step(
            "filter_metadata",
            serde_json::json!({"sender": "Sarah Mitchell"}),
            Some("by_sender"),
            Some(StepInput::Corpus),
        ),
        step(
            "top_k",
            serde_json::json!({"k": 3, "by": "timestamp", "order": "desc"}),
            None,
            Some(StepInput::Step("by_sender".to_string())),
        ),
    ]);
    let registry = empty_registry();
    let price_table = PriceTable::empty();
    let mut budget = Budget::new(dec!(100));

    let result = qe_exec::execute(&plan, &corpus, &registry, &mut budget, &price_table, None, 10, &qe_ops::ModelSelection::default(), &tokio_util::sync::CancellationToken::new()).await;

    assert!(!result.stopped_early);
    let docs = result.final_docset.documents();
    assert_eq!(docs.len(), 3);
    assert!(docs.iter().all(|d| d.metadata.sender == "Sarah Mitchell"));
    assert!(docs.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
}

#[tokio::test]
async fn s3_branching_union() {
    let corpus = Corpus::new(vec![
        doc("a", "Sarah Mitchell", None, "2024-01-01T00:00:00Z", "let's do pickup at 5"),
        doc("b", "Tom Mitchell", None, "2024-01-02T00:00:00Z", "the bill was $45 today"),
        doc("c", "Sarah Mitchell", None, "2024-01-03T00:00:00Z", "see you tomorrow"),
    ]);
    let plan = linear_plan(vec![
        step(
            "search_lex",
            serde_json::json!({"terms": ["pickup"], "mode": "any"}),
            Some("lex"),
            Some(StepInput::Corpus),
        ),
        step(
            "search_regex",
            serde_json::json!({"pattern": "\\$\\d+"}),
            Some("rx"),
            Some(StepInput::Corpus),
        ),
        step(
            "union",
            serde_json::json!({}),
            None,
            Some(StepInput::Steps(vec!["lex".to_string(), "rx".to_string()])),
        ),
    ]);
    let registry = empty_registry();
    let price_table = PriceTable::empty();
    let mut budget = Budget::new(dec!(100));

    let result = qe_exec::execute(&plan, &corpus, &registry, &mut budget, &price_table, None, 10, &qe_ops::ModelSelection::default(), &tokio_util::sync::CancellationToken::new()).await;

    assert!(!result.stopped_early);
    let mut ids: Vec<_> = result.final_docset.documents().iter().map(|d| d.id.as_str().to_string()).collect();
    ids.sort();
    assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
    assert_eq!(result.trace.len(), 3);
}

#[tokio::test]
async fn s4_thread_level_label_then_filter() {
    let corpus = Corpus::new(vec![
        doc("a", "Sarah Mitchell", Some("t1"), "2024-01-01T00:00:00Z", "the bill was $250"),
        doc("b", "Tom Mitchell", Some("t1"), "2024-01-02T00:00:00Z", "I don't think I owe that"),
        doc("c", "Sarah Mitchell", Some("t2"), "2024-01-03T00:00:00Z", "see you tomorrow"),
    ]);
    let plan = linear_plan(vec![
        step(
            "label",
            serde_json::json!({
                "schema": "Does this thread contain an expense disagreement over $200?",
                "unit": "thread"
            }),
            Some("classify"),
            Some(StepInput::Corpus),
        ),
        step(
            "filter_by_label",
            serde_json::json!({"condition": "matches == true AND confidence > 0.6"}),
            None,
            Some(StepInput::Step("classify".to_string())),
        ),
    ]);

    // group_by_thread visits threads in first-seen document order: t1, t2.
    let provider = Arc::new(FakeProvider::new(vec![
        Ok(qe_provider::GenerateResponse {
            output_text: serde_json::json!({"label": "true", "confidence": 0.9, "cited_messages": ["a", "b"]})
                .to_string(),
            usage: None,
        }),
        Ok(qe_provider::GenerateResponse {
            output_text: serde_json::json!({"label": "false", "confidence": 0.8, "cited_messages": []}).to_string(),
            usage: None,
        }),
    ]));
    let registry = OperatorRegistry::new(provider);
    let price_table = PriceTable::empty();
    let mut budget = Budget::new(dec!(100));

    let result = qe_exec::execute(&plan, &corpus, &registry, &mut budget, &price_table, None, 10, &qe_ops::ModelSelection::default(), &tokio_util::sync::CancellationToken::new()).await;

    assert!(!result.stopped_early);
    let mut ids: Vec<_> = result.final_docset.documents().iter().map(|d| d.id.as_str().to_string()).collect();
    ids.sort();
    assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
    for id in ["a", "b"] {
        let labels = result.final_docset.labels_for(&DocId::from(id)).unwrap();
        assert_eq!(labels["label"].thread_meta.as_ref().unwrap().unit, qe_core::ThreadUnit::Thread);
    }
}

#[tokio::test]
async fn s5_budget_stop_halts_before_next_step() {
    let corpus = Corpus::new(vec![doc("a", "Sarah Mitchell", Some("t1"), "2024-01-01T00:00:00Z", "hello there")]);
    let plan = linear_plan(vec![
        step(
            "label",
            serde_json::json!({"schema": "tone", "unit": "message"}),
            Some("classify"),
            Some(StepInput::Corpus),
        ),
        step(
            "count",
            serde_json::json!({"by": "sender"}),
            None,
            Some(StepInput::Step("classify".to_string())),
        ),
    ]);
    let provider = Arc::new(FakeProvider::constant(
        serde_json::json!({"label": "friendly", "confidence": 0.9}).to_string(),
        1,
    ));
    let registry = OperatorRegistry::new(provider);
    let price_table = PriceTable::empty();
    let mut budget = Budget::new(Decimal::ZERO);

    let result = qe_exec::execute(&plan, &corpus, &registry, &mut budget, &price_table, None, 10, &qe_ops::ModelSelection::default(), &tokio_util::sync::CancellationToken::new()).await;

    assert!(result.stopped_early);
    assert_eq!(result.trace.len(), 1);
    assert_eq!(result.trace[0].status, StepStatus::Error);
    assert_eq!(result.final_docset.documents().len(), 1);
}

#[tokio::test]
async fn s6_non_fatal_passthrough() {
    let corpus = Corpus::new(vec![
        doc("a", "Sarah Mitchell", None, "2024-01-01T00:00:00Z", "hello"),
        doc("b", "Tom Mitchell", None, "2024-01-02T00:00:00Z", "hi"),
    ]);
    let plan = linear_plan(vec![
        step("search_regex", serde_json::json!({"pattern": "["}), Some("bad_rx"), Some(StepInput::Corpus)),
        step(
            "count",
            serde_json::json!({"by": "sender"}),
            None,
            Some(StepInput::Step("bad_rx".to_string())),
        ),
    ]);
    let registry = empty_registry();
    let price_table = PriceTable::empty();
    let mut budget = Budget::new(dec!(100));

    let result = qe_exec::execute(&plan, &corpus, &registry, &mut budget, &price_table, None, 10, &qe_ops::ModelSelection::default(), &tokio_util::sync::CancellationToken::new()).await;

    assert!(!result.stopped_early);
    assert_eq!(result.trace.len(), 2);
    assert_eq!(result.trace[0].status, StepStatus::Error);
    assert_eq!(result.trace[1].status, StepStatus::Complete);
    assert_eq!(result.final_docset.documents().len(), 2);
}

#[test]
fn decimal_parses_cleanly_for_cli_budget_flag() {
    assert_eq!(Decimal::from_str("1.50").unwrap(), dec!(1.50));
}
