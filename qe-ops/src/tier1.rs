//! Tier-1 operators: deterministic, zero-cost.

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};
use qe_core::{Document, DocId};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use regex::RegexBuilder;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use crate::condition::Condition;
use crate::error::OperatorError;
use crate::registry::{ExecContext, OpMeta, OpResult, OperatorImpl};

fn invalid(op: &str, message: impl Into<String>) -> OperatorError {
    OperatorError::InvalidArgs {
        op: op.to_string(),
        message: message.into(),
    }
}

fn parse_args<T: for<'de> Deserialize<'de>>(op: &str, args: &serde_json::Value) -> Result<T, OperatorError> {
    serde_json::from_value(args.clone()).map_err(|e| invalid(op, e.to_string()))
}

// ---------------------------------------------------------------- filter_metadata

#[derive(Deserialize, Default)]
struct FilterMetadataArgs {
    sender: Option<String>,
    recipient: Option<String>,
    thread_id: Option<String>,
    after: Option<String>,
    before: Option<String>,
    min_words: Option<u32>,
    max_words: Option<u32>,
}

/// Keeps documents matching every provided metadata predicate.
pub struct FilterMetadata;

#[async_trait]
impl OperatorImpl for FilterMetadata {
    async fn apply(
        &self,
        input: &qe_core::DocSet,
        args: &serde_json::Value,
        _ctx: &ExecContext<'_>,
    ) -> Result<OpResult, OperatorError> {
        let start = Instant::now();
        let args: FilterMetadataArgs = parse_args("filter_metadata", args)?;

        let after = args
            .after
            .as_deref()
            .map(parse_rfc3339)
            .transpose()
            .map_err(|e| invalid("filter_metadata", e))?;
        let before = args
            .before
            .as_deref()
            .map(parse_rfc3339)
            .transpose()
            .map_err(|e| invalid("filter_metadata", e))?;

        let filtered = input.filter(|doc| {
            matches_sender(doc, &args.sender)
                && matches_recipient(doc, &args.recipient)
                && matches_thread(doc, &args.thread_id)
                && after.is_none_or(|a| doc.timestamp >= a)
                && before.is_none_or(|b| doc.timestamp < b)
                && args.min_words.is_none_or(|m| doc.metadata.word_count >= m)
                && args.max_words.is_none_or(|m| doc.metadata.word_count <= m)
        });

        let count = filtered.len();
        Ok(OpResult {
            docset: filtered,
            meta: OpMeta::new(elapsed_ms(start), Decimal::ZERO, count),
        })
    }
}

fn matches_sender(doc: &Document, sender: &Option<String>) -> bool {
    sender
        .as_ref()
        .is_none_or(|s| doc.metadata.sender.eq_ignore_ascii_case(s))
}

fn matches_recipient(doc: &Document, recipient: &Option<String>) -> bool {
    recipient
        .as_ref()
        .is_none_or(|r| doc.metadata.recipient.eq_ignore_ascii_case(r))
}

fn matches_thread(doc: &Document, thread_id: &Option<String>) -> bool {
    thread_id.as_ref().is_none_or(|t| {
        doc.metadata
            .thread_id
            .as_ref()
            .is_some_and(|dt| dt.as_str().eq_ignore_ascii_case(t))
    })
}

fn parse_rfc3339(s: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("invalid timestamp {s:?}: {e}"))
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

// ---------------------------------------------------------------- search_lex

#[derive(Deserialize)]
struct SearchLexArgs {
    terms: Vec<String>,
    mode: String,
    #[serde(default)]
    case_sensitive: bool,
}

/// Keyword search over document text.
pub struct SearchLex;

#[async_trait]
impl OperatorImpl for SearchLex {
    async fn apply(
        &self,
        input: &qe_core::DocSet,
        args: &serde_json::Value,
        _ctx: &ExecContext<'_>,
    ) -> Result<OpResult, OperatorError> {
        let start = Instant::now();
        let args: SearchLexArgs = parse_args("search_lex", args)?;

        let needles: Vec<String> = match args.mode.as_str() {
            "phrase" => vec![args.terms.join(" ")],
            "any" | "all" => args.terms.clone(),
            other => return Err(invalid("search_lex", format!("unknown mode {other:?}"))),
        };

        let keep = |text: &str| -> bool {
            match args.mode.as_str() {
                "all" => needles.iter().all(|t| contains(text, t, args.case_sensitive)),
                _ => needles.iter().any(|t| contains(text, t, args.case_sensitive)),
            }
        };

        let filtered = input.filter(|doc| keep(&doc.text));

        let mut matched_terms: HashMap<String, usize> = HashMap::new();
        for doc in filtered.documents() {
            for needle in &needles {
                let n = count_occurrences(&doc.text, needle, args.case_sensitive);
                if n > 0 {
                    *matched_terms.entry(needle.clone()).or_insert(0) += n;
                }
            }
        }

        let count = filtered.len();
        Ok(OpResult {
            docset: filtered,
            meta: OpMeta::new(elapsed_ms(start), Decimal::ZERO, count)
                .with_detail(serde_json::json!({ "matched_terms": matched_terms })),
        })
    }
}

fn contains(haystack: &str, needle: &str, case_sensitive: bool) -> bool {
    if case_sensitive {
        haystack.contains(needle)
    } else {
        haystack.to_lowercase().contains(&needle.to_lowercase())
    }
}

fn count_occurrences(haystack: &str, needle: &str, case_sensitive: bool) -> usize {
    if needle.is_empty() {
        return 0;
    }
    if case_sensitive {
        haystack.matches(needle).count()
    } else {
        haystack.to_lowercase().matches(&needle.to_lowercase()).count()
    }
}

// ---------------------------------------------------------------- search_regex

#[derive(Deserialize)]
struct SearchRegexArgs {
    pattern: String,
    flags: Option<String>,
}

/// Regex search over document text.
pub struct SearchRegex;

#[async_trait]
impl OperatorImpl for SearchRegex {
    async fn apply(
        &self,
        input: &qe_core::DocSet,
        args: &serde_json::Value,
        _ctx: &ExecContext<'_>,
    ) -> Result<OpResult, OperatorError> {
        let start = Instant::now();
        let args: SearchRegexArgs = parse_args("search_regex", args)?;
        let flags = args.flags.unwrap_or_default();

        let regex = RegexBuilder::new(&args.pattern)
            .case_insensitive(flags.contains('i'))
            .multi_line(flags.contains('m'))
            .dot_matches_new_line(flags.contains('s'))
            .build()
            .map_err(|e| OperatorError::RegexCompile(e.to_string()))?;

        let mut matches = Vec::new();
        let filtered = input.filter(|doc| regex.is_match(&doc.text));

        // `Regex::find_iter` already advances past zero-length matches by one
        // byte, so this can't loop forever on a pattern like `a*`.
        for doc in filtered.documents() {
            for m in regex.find_iter(&doc.text) {
                matches.push(serde_json::json!({
                    "doc_id": doc.id.as_str(),
                    "match": m.as_str(),
                    "index": m.start(),
                }));
            }
        }

        let count = filtered.len();
        Ok(OpResult {
            docset: filtered,
            meta: OpMeta::new(elapsed_ms(start), Decimal::ZERO, count)
                .with_detail(serde_json::json!({ "matches": matches })),
        })
    }
}

// ---------------------------------------------------------------- top_k

#[derive(Deserialize)]
struct TopKArgs {
    k: usize,
    by: String,
    order: String,
}

/// Keeps the first `k` documents after sorting by the given key.
pub struct TopK;

#[async_trait]
impl OperatorImpl for TopK {
    async fn apply(
        &self,
        input: &qe_core::DocSet,
        args: &serde_json::Value,
        _ctx: &ExecContext<'_>,
    ) -> Result<OpResult, OperatorError> {
        let start = Instant::now();
        let args: TopKArgs = parse_args("top_k", args)?;

        let mut docs: Vec<Arc<Document>> = input.documents().to_vec();
        match args.by.as_str() {
            "timestamp" => docs.sort_by_key(|d| d.timestamp),
            "word_count" => docs.sort_by_key(|d| d.metadata.word_count),
            "relevance" => {} // preserves current order
            other => return Err(invalid("top_k", format!("unknown sort key {other:?}"))),
        }
        if args.by != "relevance" && args.order == "desc" {
            docs.reverse();
        }
        docs.truncate(args.k);

        let kept = input.with_documents(docs);
        let count = kept.len();
        Ok(OpResult {
            docset: kept,
            meta: OpMeta::new(elapsed_ms(start), Decimal::ZERO, count),
        })
    }
}

// ---------------------------------------------------------------- sample

#[derive(Deserialize)]
struct SampleArgs {
    n: usize,
    strategy: String,
}

/// Draws a sample of `n` documents under one of three strategies.
pub struct Sample;

#[async_trait]
impl OperatorImpl for Sample {
    async fn apply(
        &self,
        input: &qe_core::DocSet,
        args: &serde_json::Value,
        ctx: &ExecContext<'_>,
    ) -> Result<OpResult, OperatorError> {
        let start = Instant::now();
        let args: SampleArgs = parse_args("sample", args)?;
        let mut rng = make_rng(ctx.rng_seed);

        let docs: Vec<Arc<Document>> = input.documents().to_vec();
        let n = args.n.min(docs.len());

        let selected = match args.strategy.as_str() {
            "recent" => {
                let mut sorted = docs.clone();
                sorted.sort_by_key(|d| std::cmp::Reverse(d.timestamp));
                sorted.truncate(n);
                sorted
            }
            "random" => {
                let mut shuffled = docs.clone();
                shuffled.shuffle(&mut rng);
                shuffled.truncate(n);
                shuffled
            }
            "stratified" => stratified_sample(&docs, n, &mut rng),
            other => return Err(invalid("sample", format!("unknown strategy {other:?}"))),
        };

        let kept = input.with_documents(selected);
        let count = kept.len();
        Ok(OpResult {
            docset: kept,
            meta: OpMeta::new(elapsed_ms(start), Decimal::ZERO, count),
        })
    }
}

fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    }
}

/// Largest-remainder allocation across senders, topped up by random draw
/// from the remainder pool when a sender's quota exceeds its availability.
fn stratified_sample(docs: &[Arc<Document>], n: usize, rng: &mut StdRng) -> Vec<Arc<Document>> {
    if n == 0 || docs.is_empty() {
        return Vec::new();
    }

    let mut by_sender: HashMap<String, Vec<Arc<Document>>> = HashMap::new();
    let mut order: Vec<String> = Vec::new();
    for doc in docs {
        let entry = by_sender.entry(doc.metadata.sender.clone()).or_default();
        if entry.is_empty() {
            order.push(doc.metadata.sender.clone());
        }
        entry.push(Arc::clone(doc));
    }

    let total = docs.len();
    let mut quotas: HashMap<String, usize> = HashMap::new();
    let mut remainders: Vec<(String, f64)> = Vec::new();
    let mut allocated = 0usize;
    for sender in &order {
        let count = by_sender[sender].len();
        let raw = n as f64 * (count as f64 / total as f64);
        let floor = raw.floor() as usize;
        quotas.insert(sender.clone(), floor);
        remainders.push((sender.clone(), raw - floor as f64));
        allocated += floor;
    }
    remainders.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    let mut remaining_to_allocate = n.saturating_sub(allocated);
    for (sender, _) in remainders {
        if remaining_to_allocate == 0 {
            break;
        }
        *quotas.get_mut(&sender).unwrap() += 1;
        remaining_to_allocate -= 1;
    }

    let mut selected: Vec<Arc<Document>> = Vec::new();
    let mut selected_ids: std::collections::HashSet<DocId> = std::collections::HashSet::new();
    for sender in &order {
        let pool = &by_sender[sender];
        let quota = quotas[sender].min(pool.len());
        let mut shuffled = pool.clone();
        shuffled.shuffle(rng);
        for doc in shuffled.into_iter().take(quota) {
            selected_ids.insert(doc.id.clone());
            selected.push(doc);
        }
    }

    let shortfall = n.saturating_sub(selected.len());
    if shortfall > 0 {
        let mut remainder_pool: Vec<Arc<Document>> = docs
            .iter()
            .filter(|d| !selected_ids.contains(&d.id))
            .cloned()
            .collect();
        remainder_pool.shuffle(rng);
        selected.extend(remainder_pool.into_iter().take(shortfall));
    }

    selected
}

// ---------------------------------------------------------------- get_context

#[derive(Deserialize)]
struct GetContextArgs {
    doc_id: String,
    window: usize,
}

/// Returns the contiguous chronological slice around a document within its
/// thread, hydrated from the corpus.
pub struct GetContext;

#[async_trait]
impl OperatorImpl for GetContext {
    async fn apply(
        &self,
        input: &qe_core::DocSet,
        args: &serde_json::Value,
        ctx: &ExecContext<'_>,
    ) -> Result<OpResult, OperatorError> {
        let start = Instant::now();
        let args: GetContextArgs = parse_args("get_context", args)?;
        let doc_id = DocId::from(args.doc_id.as_str());

        let doc = ctx
            .corpus
            .get(&doc_id)
            .ok_or_else(|| OperatorError::DocNotFound(args.doc_id.clone()))?;
        let thread_id = doc
            .metadata
            .thread_id
            .clone()
            .ok_or_else(|| OperatorError::DocNotFound(args.doc_id.clone()))?;

        let mut thread: Vec<&Document> = ctx.corpus.thread_documents(&thread_id);
        thread.sort_by_key(|d| d.timestamp);
        let idx = thread
            .iter()
            .position(|d| d.id == doc_id)
            .ok_or_else(|| OperatorError::DocNotFound(args.doc_id.clone()))?;

        let lo = idx.saturating_sub(args.window);
        let hi = (idx + args.window + 1).min(thread.len());
        let slice: Vec<Arc<Document>> = thread[lo..hi].iter().map(|d| Arc::new((*d).clone())).collect();

        let kept = input.with_documents(slice);
        let count = kept.len();
        Ok(OpResult {
            docset: kept,
            meta: OpMeta::new(elapsed_ms(start), Decimal::ZERO, count),
        })
    }
}

// ---------------------------------------------------------------- count

#[derive(Deserialize, Default)]
struct CountArgs {
    by: Option<String>,
}

/// Groups the current DocSet without modifying it, reporting counts per
/// group in `detail.groups`.
pub struct Count;

#[async_trait]
impl OperatorImpl for Count {
    async fn apply(
        &self,
        input: &qe_core::DocSet,
        args: &serde_json::Value,
        _ctx: &ExecContext<'_>,
    ) -> Result<OpResult, OperatorError> {
        let start = Instant::now();
        let args: CountArgs = parse_args("count", args)?;

        let mut groups: HashMap<String, usize> = HashMap::new();
        match args.by.as_deref() {
            None => {
                groups.insert("total".to_string(), input.len());
            }
            Some(by) => {
                for doc in input.documents() {
                    let key = group_key(by, doc, input.labels_for(&doc.id))?;
                    *groups.entry(key).or_insert(0) += 1;
                }
            }
        }

        Ok(OpResult {
            docset: input.clone(),
            meta: OpMeta::new(elapsed_ms(start), Decimal::ZERO, input.len())
                .with_detail(serde_json::json!({ "groups": groups })),
        })
    }
}

fn group_key(by: &str, doc: &Document, labels: Option<&qe_core::LabelMap>) -> Result<String, OperatorError> {
    Ok(match by {
        "sender" => doc.metadata.sender.clone(),
        "thread" => doc
            .metadata
            .thread_id
            .as_ref()
            .map(|t| t.to_string())
            .unwrap_or_else(|| "none".to_string()),
        "month" => format!("{:04}-{:02}", doc.timestamp.year(), doc.timestamp.month()),
        "week" => {
            let iso = doc.timestamp.iso_week();
            format!("{:04}-W{:02}", iso.year(), iso.week())
        }
        "tone" | "topic" => labels
            .and_then(|l| l.get(by))
            .and_then(|l| l.value.as_string())
            .map(str::to_string)
            .unwrap_or_else(|| "unlabeled".to_string()),
        other => return Err(invalid("count", format!("unknown grouping {other:?}"))),
    })
}

// ---------------------------------------------------------------- trend

#[derive(Deserialize)]
struct TrendArgs {
    metric: String,
    interval: String,
}

/// Reports a time series over the current DocSet without modifying it.
pub struct Trend;

#[async_trait]
impl OperatorImpl for Trend {
    async fn apply(
        &self,
        input: &qe_core::DocSet,
        args: &serde_json::Value,
        _ctx: &ExecContext<'_>,
    ) -> Result<OpResult, OperatorError> {
        let start = Instant::now();
        let args: TrendArgs = parse_args("trend", args)?;

        let mut sums: HashMap<String, f64> = HashMap::new();
        let mut counts: HashMap<String, usize> = HashMap::new();

        for doc in input.documents() {
            let period = period_key(&args.interval, doc)?;
            let value = match args.metric.as_str() {
                "count" => 1.0,
                "hostile_count" => {
                    let is_hostile = input
                        .labels_for(&doc.id)
                        .and_then(|l| l.get("tone"))
                        .and_then(|l| l.value.as_string())
                        .map(|v| v.eq_ignore_ascii_case("hostile"))
                        .unwrap_or(false);
                    if is_hostile {
                        1.0
                    } else {
                        0.0
                    }
                }
                "avg_word_count" => doc.metadata.word_count as f64,
                other => return Err(invalid("trend", format!("unknown metric {other:?}"))),
            };
            *sums.entry(period.clone()).or_insert(0.0) += value;
            *counts.entry(period).or_insert(0) += 1;
        }

        let mut periods: Vec<&String> = sums.keys().collect();
        periods.sort();
        let points: Vec<serde_json::Value> = periods
            .into_iter()
            .map(|period| {
                let value = if args.metric == "avg_word_count" {
                    sums[period] / counts[period] as f64
                } else {
                    sums[period]
                };
                serde_json::json!({ "period": period, "value": value })
            })
            .collect();

        Ok(OpResult {
            docset: input.clone(),
            meta: OpMeta::new(elapsed_ms(start), Decimal::ZERO, input.len())
                .with_detail(serde_json::json!({ "points": points })),
        })
    }
}

fn period_key(interval: &str, doc: &Document) -> Result<String, OperatorError> {
    Ok(match interval {
        "day" => doc.timestamp.format("%Y-%m-%d").to_string(),
        "week" => {
            let iso = doc.timestamp.iso_week();
            format!("{:04}-W{:02}", iso.year(), iso.week())
        }
        "month" => format!("{:04}-{:02}", doc.timestamp.year(), doc.timestamp.month()),
        other => return Err(invalid("trend", format!("unknown interval {other:?}"))),
    })
}

// ---------------------------------------------------------------- filter_by_label

#[derive(Deserialize)]
struct FilterByLabelArgs {
    condition: String,
}

/// Reduces the DocSet by evaluating a condition against each document's
/// label map.
pub struct FilterByLabel;

#[async_trait]
impl OperatorImpl for FilterByLabel {
    async fn apply(
        &self,
        input: &qe_core::DocSet,
        args: &serde_json::Value,
        _ctx: &ExecContext<'_>,
    ) -> Result<OpResult, OperatorError> {
        let start = Instant::now();
        let args: FilterByLabelArgs = parse_args("filter_by_label", args)?;
        let condition = Condition::parse(&args.condition)?;

        let filtered = input.filter(|doc| {
            let empty = qe_core::LabelMap::new();
            let labels = input.labels_for(&doc.id).unwrap_or(&empty);
            condition.matches(labels)
        });

        let count = filtered.len();
        Ok(OpResult {
            docset: filtered,
            meta: OpMeta::new(elapsed_ms(start), Decimal::ZERO, count),
        })
    }
}

// ---------------------------------------------------------------- union / intersect

/// Structural identity operator: the executor already merged its inputs by
/// union while resolving this step's input; this operator just commits the
/// merged set.
pub struct Union;

#[async_trait]
impl OperatorImpl for Union {
    async fn apply(
        &self,
        input: &qe_core::DocSet,
        _args: &serde_json::Value,
        _ctx: &ExecContext<'_>,
    ) -> Result<OpResult, OperatorError> {
        let start = Instant::now();
        let count = input.len();
        Ok(OpResult {
            docset: input.clone(),
            meta: OpMeta::new(elapsed_ms(start), Decimal::ZERO, count),
        })
    }
}

/// Structural identity operator: the executor already merged its inputs by
/// intersection during `ResolveInput`; this operator just commits the
/// merged set.
pub struct Intersect;

#[async_trait]
impl OperatorImpl for Intersect {
    async fn apply(
        &self,
        input: &qe_core::DocSet,
        _args: &serde_json::Value,
        _ctx: &ExecContext<'_>,
    ) -> Result<OpResult, OperatorError> {
        let start = Instant::now();
        let count = input.len();
        Ok(OpResult {
            docset: input.clone(),
            meta: OpMeta::new(elapsed_ms(start), Decimal::ZERO, count),
        })
    }
}
