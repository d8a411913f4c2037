//! Tier-3 operators: LLM-backed, priced per call.
//!
//! Both operators fan out across their concurrency unit (one call per
//! document or one call per thread) with a configurable concurrency cap,
//! mirroring `LocalOrch::dispatch_many`'s `tokio::spawn`-per-task shape but
//! bounded by a `Semaphore` rather than spawning everything at once.

use async_trait::async_trait;
use qe_core::{DocId, ExtractionItem, Label, LabelMap, LabelValue, Span, ThreadMeta, ThreadUnit};
use qe_provider::{GenerateRequest, Provider, ReasoningEffort, TokenUsage};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;

use crate::error::OperatorError;
use crate::registry::{ExecContext, OpMeta, OpResult, OperatorImpl};
use crate::thread::{group_by_thread, ThreadGroup};

const MIN_CONCURRENCY: usize = 1;
const MAX_CONCURRENCY: usize = 32;

/// Which model a `label`/`extract` call uses, by schema class. Configurable
/// so a deployment can swap in cheaper or stronger models without a code
/// change; `Default` reproduces the hardcoded pre-configuration behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSelection {
    /// Model used for the well-known, cheap-to-classify schemas (`tone`,
    /// `topic`).
    pub well_known: String,
    /// Model used for everything else — free-form custom schemas.
    pub custom: String,
}

impl Default for ModelSelection {
    fn default() -> Self {
        Self {
            well_known: "fast-classifier".to_string(),
            custom: "general-reasoner".to_string(),
        }
    }
}

fn clamp_concurrency(requested: Option<usize>, default_concurrency: usize) -> usize {
    requested.unwrap_or(default_concurrency).clamp(MIN_CONCURRENCY, MAX_CONCURRENCY)
}

fn invalid(op: &str, message: impl Into<String>) -> OperatorError {
    OperatorError::InvalidArgs {
        op: op.to_string(),
        message: message.into(),
    }
}

/// `tone`/`topic` are well-known, cheap-to-classify schemas; anything else
/// is a free-form custom schema that gets a higher-tier model and more
/// reasoning effort.
fn select_model<'a>(schema: &str, selection: &'a ModelSelection) -> (&'a str, ReasoningEffort) {
    match schema {
        "tone" | "topic" => (selection.well_known.as_str(), ReasoningEffort::Low),
        _ => (selection.custom.as_str(), ReasoningEffort::Medium),
    }
}

/// The label schema key a classification result is stored under: the
/// well-known tags use themselves, custom schemas collapse to `"label"`.
fn storage_key(schema: &str) -> String {
    match schema {
        "tone" | "topic" => schema.to_string(),
        _ => "label".to_string(),
    }
}

fn estimate_usage(prompt_tokens: usize) -> TokenUsage {
    TokenUsage {
        input_tokens: prompt_tokens as u64,
        output_tokens: 128,
    }
}

// ---------------------------------------------------------------- label

#[derive(Deserialize)]
struct LabelArgs {
    schema: String,
    #[serde(default)]
    unit: Option<String>,
    #[serde(default)]
    concurrency: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct LabelCallResponse {
    label: String,
    confidence: f64,
    #[serde(default)]
    rationale: Option<String>,
    #[serde(default)]
    cited_messages: Vec<String>,
}

/// LLM-backed classification, one call per document or per thread.
pub struct LabelOp<P: Provider> {
    provider: Arc<P>,
}

impl<P: Provider> LabelOp<P> {
    /// Build a `label` operator backed by `provider`.
    pub fn new(provider: Arc<P>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<P: Provider + 'static> OperatorImpl for LabelOp<P> {
    async fn apply(
        &self,
        input: &qe_core::DocSet,
        args: &serde_json::Value,
        ctx: &ExecContext<'_>,
    ) -> Result<OpResult, OperatorError> {
        let start = Instant::now();
        let args: LabelArgs = serde_json::from_value(args.clone()).map_err(|e| invalid("label", e.to_string()))?;
        let unit = args.unit.as_deref().unwrap_or("message");
        let key = storage_key(&args.schema);
        let (model, effort) = select_model(&args.schema, ctx.model_selection);
        let concurrency = clamp_concurrency(args.concurrency, ctx.concurrency_cap);
        tracing::debug!(schema = %args.schema, unit, model, concurrency, "dispatching label calls");

        let (updates, failed_units, total_cost) = match unit {
            "thread" => self.label_by_thread(input, ctx, &args.schema, &key, model, effort, concurrency).await?,
            "message" => self.label_by_message(input, ctx, &args.schema, &key, model, effort, concurrency).await?,
            other => return Err(invalid("label", format!("unknown unit {other:?}"))),
        };

        let total_units = if unit == "thread" {
            group_by_thread(input, ctx.corpus).len()
        } else {
            input.len()
        };

        let docset = input.merge_labels(updates);
        let mut detail = serde_json::json!({ "unit": unit });
        if failed_units > 0 {
            detail["failed_units"] = serde_json::json!({
                "count": failed_units,
                "total": total_units,
            });
        }

        if failed_units > 0 {
            tracing::warn!(schema = %args.schema, failed_units, total_units, "label call failures");
        }

        let count = docset.len();
        Ok(OpResult {
            docset,
            meta: OpMeta::new(start.elapsed().as_millis() as u64, total_cost, count).with_detail(detail),
        })
    }
}

impl<P: Provider + 'static> LabelOp<P> {
    #[allow(clippy::too_many_arguments)]
    async fn label_by_thread(
        &self,
        input: &qe_core::DocSet,
        ctx: &ExecContext<'_>,
        schema: &str,
        key: &str,
        model: &str,
        effort: ReasoningEffort,
        concurrency: usize,
    ) -> Result<(HashMap<DocId, LabelMap>, usize, Decimal), OperatorError> {
        let groups = group_by_thread(input, ctx.corpus);
        let semaphore = Arc::new(Semaphore::new(concurrency));
        let mut handles = Vec::with_capacity(groups.len());

        for group in groups {
            let provider = Arc::clone(&self.provider);
            let semaphore = Arc::clone(&semaphore);
            let instructions = label_instructions(schema);
            let model = model.to_string();
            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore closed");
                let request = GenerateRequest {
                    model,
                    instructions,
                    input: group.rendered.clone(),
                    reasoning_effort: effort,
                    json_schema: label_schema(),
                };
                let outcome = provider.generate_structured(request).await;
                (group, outcome)
            }));
        }

        let mut updates: HashMap<DocId, LabelMap> = HashMap::new();
        let mut failed = 0usize;
        let mut total_cost = Decimal::ZERO;

        for handle in handles {
            let (group, outcome) = handle.await.map_err(|e| OperatorError::ProviderFailed(e.to_string()))?;
            match parse_label_response(outcome, &group) {
                Ok((parsed, usage)) => {
                    total_cost += ctx.price_table.cost(model, usage);
                    let label = thread_label(schema, &parsed, &group);
                    for doc_id in &group.docset_message_ids {
                        let mut map = LabelMap::new();
                        map.insert(key.to_string(), label.clone());
                        updates.insert(DocId::from(doc_id.as_str()), map);
                    }
                }
                Err(_) => failed += 1,
            }
        }

        Ok((updates, failed, total_cost))
    }

    #[allow(clippy::too_many_arguments)]
    async fn label_by_message(
        &self,
        input: &qe_core::DocSet,
        ctx: &ExecContext<'_>,
        schema: &str,
        key: &str,
        model: &str,
        effort: ReasoningEffort,
        concurrency: usize,
    ) -> Result<(HashMap<DocId, LabelMap>, usize, Decimal), OperatorError> {
        let semaphore = Arc::new(Semaphore::new(concurrency));
        let mut handles = Vec::with_capacity(input.len());

        for doc in input.documents() {
            let provider = Arc::clone(&self.provider);
            let semaphore = Arc::clone(&semaphore);
            let instructions = label_instructions(schema);
            let model = model.to_string();
            let doc = Arc::clone(doc);
            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore closed");
                let request = GenerateRequest {
                    model,
                    instructions,
                    input: doc.text.clone(),
                    reasoning_effort: effort,
                    json_schema: label_schema(),
                };
                let outcome = provider.generate_structured(request).await;
                (doc, outcome)
            }));
        }

        let mut updates: HashMap<DocId, LabelMap> = HashMap::new();
        let mut failed = 0usize;
        let mut total_cost = Decimal::ZERO;

        for handle in handles {
            let (doc, outcome) = handle.await.map_err(|e| OperatorError::ProviderFailed(e.to_string()))?;
            match parse_label_call(outcome, doc.text.len()) {
                Ok((parsed, usage)) => {
                    total_cost += ctx.price_table.cost(model, usage);
                    let label = Label {
                        value: label_value(schema, &parsed.label),
                        confidence: parsed.confidence,
                        rationale: parsed.rationale.clone(),
                        spans: None,
                        thread_meta: None,
                    };
                    let mut map = LabelMap::new();
                    map.insert(key.to_string(), label);
                    updates.insert(doc.id.clone(), map);
                }
                Err(_) => failed += 1,
            }
        }

        Ok((updates, failed, total_cost))
    }
}

fn label_instructions(schema: &str) -> String {
    match schema {
        "tone" => "Classify the emotional tone of this message. Respond with the uniform label JSON shape.".to_string(),
        "topic" => "Classify the primary topic of this message. Respond with the uniform label JSON shape.".to_string(),
        other => format!(
            "Evaluate the following instruction against the given text: {other}. Respond with the uniform label JSON shape; `label` should be \"true\" or \"false\"."
        ),
    }
}

fn label_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "label": { "type": "string" },
            "confidence": { "type": "number" },
            "rationale": { "type": "string" },
            "cited_messages": { "type": "array", "items": { "type": "string" } },
        },
        "required": ["label", "confidence"],
    })
}

fn label_value(schema: &str, raw_label: &str) -> LabelValue {
    match schema {
        "tone" | "topic" => LabelValue::Simple(raw_label.to_string()),
        _ => LabelValue::Compound {
            matches: raw_label.eq_ignore_ascii_case("true"),
            details: HashMap::new(),
        },
    }
}

fn thread_label(schema: &str, parsed: &LabelCallResponse, group: &ThreadGroup) -> Label {
    Label {
        value: label_value(schema, &parsed.label),
        confidence: parsed.confidence,
        rationale: parsed.rationale.clone(),
        spans: None,
        thread_meta: Some(ThreadMeta {
            unit: ThreadUnit::Thread,
            thread_id: group.thread_id.clone(),
            cited_messages: parsed.cited_messages.iter().map(|s| DocId::from(s.as_str())).collect(),
        }),
    }
}

type ProviderOutcome = Result<qe_provider::GenerateResponse, qe_provider::ProviderError>;

fn parse_label_response(
    outcome: ProviderOutcome,
    group: &ThreadGroup,
) -> Result<(LabelCallResponse, TokenUsage), ()> {
    parse_label_call(outcome, group.token_estimate * 4)
}

fn parse_label_call(outcome: ProviderOutcome, prompt_chars: usize) -> Result<(LabelCallResponse, TokenUsage), ()> {
    let response = outcome.map_err(|_| ())?;
    let parsed: LabelCallResponse = serde_json::from_str(&response.output_text).map_err(|_| ())?;
    let usage = response.usage.unwrap_or_else(|| estimate_usage(prompt_chars / 4));
    Ok((parsed, usage))
}

// ---------------------------------------------------------------- extract

#[derive(Deserialize)]
struct ExtractArgs {
    schema: String,
    #[serde(default)]
    unit: Option<String>,
    #[serde(default)]
    concurrency: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct ExtractItemResponse {
    message_id: String,
    field: String,
    value: String,
    span: SpanResponse,
    confidence: f64,
    #[serde(default)]
    context: String,
}

#[derive(Debug, Deserialize)]
struct SpanResponse {
    start: usize,
    end: usize,
}

#[derive(Debug, Deserialize)]
struct ExtractCallResponse {
    items: Vec<ExtractItemResponse>,
}

/// LLM-backed extraction, one call per document or per thread.
pub struct ExtractOp<P: Provider> {
    provider: Arc<P>,
}

impl<P: Provider> ExtractOp<P> {
    /// Build an `extract` operator backed by `provider`.
    pub fn new(provider: Arc<P>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<P: Provider + 'static> OperatorImpl for ExtractOp<P> {
    async fn apply(
        &self,
        input: &qe_core::DocSet,
        args: &serde_json::Value,
        ctx: &ExecContext<'_>,
    ) -> Result<OpResult, OperatorError> {
        let start = Instant::now();
        let args: ExtractArgs = serde_json::from_value(args.clone()).map_err(|e| invalid("extract", e.to_string()))?;
        let unit = args.unit.as_deref().unwrap_or("message");
        let concurrency = clamp_concurrency(args.concurrency, ctx.concurrency_cap);
        let key = format!("extract:{}", args.schema);
        let model = ctx.model_selection.custom.as_str();
        let effort = ReasoningEffort::Medium;

        let (raw_items, failed, total_cost) = match unit {
            "thread" => self.extract_by_thread(input, ctx, &args.schema, model, effort, concurrency).await?,
            "message" => self.extract_by_message(input, ctx, &args.schema, model, effort, concurrency).await?,
            other => return Err(invalid("extract", format!("unknown unit {other:?}"))),
        };

        let updates = aggregate_items(raw_items, &key, ctx);
        let docset = input.merge_labels(updates);
        let mut detail = serde_json::json!({ "unit": unit });
        if failed > 0 {
            tracing::warn!(schema = %args.schema, failed, "extract call failures");
            detail["failed_units"] = serde_json::json!({ "count": failed });
        }

        let count = docset.len();
        Ok(OpResult {
            docset,
            meta: OpMeta::new(start.elapsed().as_millis() as u64, total_cost, count).with_detail(detail),
        })
    }
}

impl<P: Provider + 'static> ExtractOp<P> {
    #[allow(clippy::too_many_arguments)]
    async fn extract_by_message(
        &self,
        input: &qe_core::DocSet,
        ctx: &ExecContext<'_>,
        schema: &str,
        model: &str,
        effort: ReasoningEffort,
        concurrency: usize,
    ) -> Result<(Vec<ExtractItemResponse>, usize, Decimal), OperatorError> {
        let semaphore = Arc::new(Semaphore::new(concurrency));
        let mut handles = Vec::with_capacity(input.len());

        for doc in input.documents() {
            let provider = Arc::clone(&self.provider);
            let semaphore = Arc::clone(&semaphore);
            let instructions = extract_instructions(schema);
            let model = model.to_string();
            let doc = Arc::clone(doc);
            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore closed");
                let request = GenerateRequest {
                    model,
                    instructions,
                    input: doc.text.clone(),
                    reasoning_effort: effort,
                    json_schema: extract_schema(),
                };
                (doc.text.len(), provider.generate_structured(request).await)
            }));
        }

        let mut items = Vec::new();
        let mut failed = 0usize;
        let mut total_cost = Decimal::ZERO;
        for handle in handles {
            let (len, outcome) = handle.await.map_err(|e| OperatorError::ProviderFailed(e.to_string()))?;
            match parse_extract_call(outcome, len) {
                Ok((parsed, usage)) => {
                    total_cost += ctx.price_table.cost(model, usage);
                    items.extend(parsed.items);
                }
                Err(_) => failed += 1,
            }
        }
        Ok((items, failed, total_cost))
    }

    #[allow(clippy::too_many_arguments)]
    async fn extract_by_thread(
        &self,
        input: &qe_core::DocSet,
        ctx: &ExecContext<'_>,
        schema: &str,
        model: &str,
        effort: ReasoningEffort,
        concurrency: usize,
    ) -> Result<(Vec<ExtractItemResponse>, usize, Decimal), OperatorError> {
        let groups = group_by_thread(input, ctx.corpus);
        let semaphore = Arc::new(Semaphore::new(concurrency));
        let mut handles = Vec::with_capacity(groups.len());

        for group in groups {
            let provider = Arc::clone(&self.provider);
            let semaphore = Arc::clone(&semaphore);
            let instructions = extract_instructions(schema);
            let model = model.to_string();
            let prompt_chars = group.rendered.len();
            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore closed");
                let request = GenerateRequest {
                    model,
                    instructions,
                    input: group.rendered,
                    reasoning_effort: effort,
                    json_schema: extract_schema(),
                };
                (prompt_chars, provider.generate_structured(request).await)
            }));
        }

        let mut items = Vec::new();
        let mut failed = 0usize;
        let mut total_cost = Decimal::ZERO;
        for handle in handles {
            let (len, outcome) = handle.await.map_err(|e| OperatorError::ProviderFailed(e.to_string()))?;
            match parse_extract_call(outcome, len) {
                Ok((parsed, usage)) => {
                    total_cost += ctx.price_table.cost(model, usage);
                    items.extend(parsed.items);
                }
                Err(_) => failed += 1,
            }
        }
        Ok((items, failed, total_cost))
    }
}

fn extract_instructions(schema: &str) -> String {
    format!("Extract structured data matching this schema from the text: {schema}. Quote the exact message containing each value as its message_id.")
}

fn extract_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "items": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "message_id": { "type": "string" },
                        "field": { "type": "string" },
                        "value": { "type": "string" },
                        "span": {
                            "type": "object",
                            "properties": { "start": { "type": "integer" }, "end": { "type": "integer" } },
                        },
                        "confidence": { "type": "number" },
                        "context": { "type": "string" },
                    },
                    "required": ["message_id", "field", "value", "span", "confidence"],
                },
            },
        },
        "required": ["items"],
    })
}

fn parse_extract_call(outcome: ProviderOutcome, prompt_chars: usize) -> Result<(ExtractCallResponse, TokenUsage), ()> {
    let response = outcome.map_err(|_| ())?;
    let parsed: ExtractCallResponse = serde_json::from_str(&response.output_text).map_err(|_| ())?;
    let usage = response.usage.unwrap_or_else(|| estimate_usage(prompt_chars / 4));
    Ok((parsed, usage))
}

/// Groups raw items by the document they cite, drops invalid spans, and
/// aggregates confidence as the arithmetic mean of its items' confidences.
fn aggregate_items(
    raw_items: Vec<ExtractItemResponse>,
    key: &str,
    ctx: &ExecContext<'_>,
) -> HashMap<DocId, LabelMap> {
    let mut by_doc: HashMap<DocId, Vec<ExtractionItem>> = HashMap::new();

    for raw in raw_items {
        let doc_id = DocId::from(raw.message_id.as_str());
        let Some(doc) = ctx.corpus.get(&doc_id) else {
            continue;
        };
        let span = Span {
            start: raw.span.start,
            end: raw.span.end,
        };
        if !span.is_valid(doc.text.len()) {
            continue;
        }
        by_doc.entry(doc_id).or_default().push(ExtractionItem {
            message_id: DocId::from(raw.message_id.as_str()),
            field: raw.field,
            value: raw.value,
            span,
            confidence: raw.confidence,
            context: raw.context,
        });
    }

    by_doc
        .into_iter()
        .map(|(doc_id, items)| {
            let confidence = items.iter().map(|i| i.confidence).sum::<f64>() / items.len() as f64;
            let label = Label {
                value: LabelValue::Extractions(items),
                confidence,
                rationale: None,
                spans: None,
                thread_meta: None,
            };
            let mut map = LabelMap::new();
            map.insert(key.to_string(), label);
            (doc_id, map)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use qe_core::{Corpus, DocSet, Document, DocumentMetadata};
    use qe_provider::{FakeProvider, PriceTable};
    use chrono::{DateTime, Utc};

    fn doc(id: &str, thread: Option<&str>, ts: &str, text: &str) -> Document {
        Document {
            id: DocId::from(id),
            source: "vendor-report".into(),
            timestamp: DateTime::parse_from_rfc3339(ts).unwrap().with_timezone(&Utc),
            text: text.into(),
            metadata: DocumentMetadata {
                sender: "Sarah".into(),
                recipient: "Tom".into(),
                thread_id: thread.map(qe_core::ThreadId::from),
                subject: None,
                word_count: text.split_whitespace().count() as u32,
                message_number: None,
            },
        }
    }

    #[tokio::test]
    async fn message_unit_label_attaches_schema_key() {
        let corpus = Corpus::new(vec![doc("a", None, "2024-01-01T00:00:00Z", "hello there")]);
        let docset = DocSet::from_corpus(&corpus);
        let provider = Arc::new(FakeProvider::constant(
            r#"{"label":"friendly","confidence":0.9,"rationale":"warm greeting"}"#,
            1,
        ));
        let price_table = PriceTable::empty();
        let ctx = ExecContext {
            corpus: &corpus,
            price_table: &price_table,
            rng_seed: None,
            concurrency_cap: 10,
            model_selection: &ModelSelection::default(),
        };
        let op = LabelOp::new(provider);
        let result = op
            .apply(&docset, &serde_json::json!({ "schema": "tone" }), &ctx)
            .await
            .unwrap();
        let labels = result.docset.labels_for(&DocId::from("a")).unwrap();
        assert_eq!(labels["tone"].value.as_string(), Some("friendly"));
    }

    #[tokio::test]
    async fn thread_unit_label_propagates_to_every_doc_in_thread() {
        let corpus = Corpus::new(vec![
            doc("a", Some("t1"), "2024-01-01T00:00:00Z", "the expense is $250"),
            doc("b", Some("t1"), "2024-01-02T00:00:00Z", "I disagree"),
        ]);
        let docset = DocSet::from_corpus(&corpus);
        let provider = Arc::new(FakeProvider::constant(
            r#"{"label":"true","confidence":0.8,"cited_messages":["a","b"]}"#,
            1,
        ));
        let price_table = PriceTable::empty();
        let ctx = ExecContext {
            corpus: &corpus,
            price_table: &price_table,
            rng_seed: None,
            concurrency_cap: 10,
            model_selection: &ModelSelection::default(),
        };
        let op = LabelOp::new(provider);
        let result = op
            .apply(
                &docset,
                &serde_json::json!({ "schema": "Does this mention an expense dispute?", "unit": "thread" }),
                &ctx,
            )
            .await
            .unwrap();

        for id in ["a", "b"] {
            let labels = result.docset.labels_for(&DocId::from(id)).unwrap();
            let label = &labels["label"];
            assert_eq!(label.value.as_bool(), Some(true));
            assert_eq!(label.thread_meta.as_ref().unwrap().thread_id.as_str(), "t1");
        }
    }

    #[tokio::test]
    async fn all_units_failing_still_completes_with_failed_units_detail() {
        let corpus = Corpus::new(vec![doc("a", None, "2024-01-01T00:00:00Z", "hi")]);
        let docset = DocSet::from_corpus(&corpus);
        let provider = Arc::new(FakeProvider::constant("not json", 1));
        let price_table = PriceTable::empty();
        let ctx = ExecContext {
            corpus: &corpus,
            price_table: &price_table,
            rng_seed: None,
            concurrency_cap: 10,
            model_selection: &ModelSelection::default(),
        };
        let op = LabelOp::new(provider);
        let result = op
            .apply(&docset, &serde_json::json!({ "schema": "tone" }), &ctx)
            .await
            .unwrap();
        assert!(result.docset.labels_for(&DocId::from("a")).is_none());
        assert_eq!(result.meta.detail["failed_units"]["count"], 1);
    }

    #[tokio::test]
    async fn extract_drops_invalid_spans_and_averages_confidence() {
        let corpus = Corpus::new(vec![doc("a", None, "2024-01-01T00:00:00Z", "pay $200 now")]);
        let docset = DocSet::from_corpus(&corpus);
        let provider = Arc::new(FakeProvider::constant(
            r#"{"items":[
                {"message_id":"a","field":"amount","value":"200","span":{"start":4,"end":8},"confidence":0.9,"context":"pay $200"},
                {"message_id":"a","field":"amount","value":"junk","span":{"start":0,"end":999},"confidence":0.1,"context":""}
            ]}"#,
            1,
        ));
        let price_table = PriceTable::empty();
        let ctx = ExecContext {
            corpus: &corpus,
            price_table: &price_table,
            rng_seed: None,
            concurrency_cap: 10,
            model_selection: &ModelSelection::default(),
        };
        let op = ExtractOp::new(provider);
        let result = op
            .apply(&docset, &serde_json::json!({ "schema": "amount" }), &ctx)
            .await
            .unwrap();
        let labels = result.docset.labels_for(&DocId::from("a")).unwrap();
        let items = labels["extract:amount"].value.as_items().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(labels["extract:amount"].confidence, 0.9);
    }
}
