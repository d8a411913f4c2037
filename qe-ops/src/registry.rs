//! The operator dispatch table.
//!
//! A name-keyed table of `Arc<dyn OperatorImpl>` trait objects.
//! `OperatorImpl` is deliberately object-safe even though Tier-3 operators
//! are generic over `P: Provider` internally — the registry only ever sees
//! the object-safe boundary, monomorphized once at construction.

use async_trait::async_trait;
use qe_core::{Corpus, DocSet};
use qe_provider::PriceTable;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::OperatorError;

/// Cost class of an operator. Tier 1 is free and deterministic; Tier 3 is
/// LLM-backed and priced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// Deterministic, zero-cost.
    One,
    /// LLM-backed, priced per call.
    Three,
}

/// Per-call telemetry an operator returns alongside its output `DocSet`.
#[derive(Debug, Clone)]
pub struct OpMeta {
    /// Wall-clock duration of the operator's own work, in milliseconds.
    pub duration_ms: u64,
    /// Dollar cost incurred by this call (zero for Tier-1 operators).
    pub cost_usd: Decimal,
    /// Number of documents in the returned `DocSet`.
    pub result_count: usize,
    /// Operator-specific detail (matched terms, group counts, failed
    /// units, …), rendered into `StepTrace.detail` by the executor.
    pub detail: serde_json::Value,
}

impl OpMeta {
    /// Build a metadata record with an empty `detail` object.
    pub fn new(duration_ms: u64, cost_usd: Decimal, result_count: usize) -> Self {
        Self {
            duration_ms,
            cost_usd,
            result_count,
            detail: serde_json::json!({}),
        }
    }

    /// Attach a detail payload.
    pub fn with_detail(mut self, detail: serde_json::Value) -> Self {
        self.detail = detail;
        self
    }
}

/// The result of one operator application.
#[derive(Debug, Clone)]
pub struct OpResult {
    /// The operator's output `DocSet`.
    pub docset: DocSet,
    /// Telemetry for this call.
    pub meta: OpMeta,
}

/// Everything an operator needs beyond its own `DocSet` and arguments.
///
/// Read-only: operators never mutate the budget directly. An operator
/// reports `cost_usd` in its `OpMeta` and the executor charges the budget.
pub struct ExecContext<'a> {
    /// The full, read-only corpus backing this execution.
    pub corpus: &'a Corpus,
    /// Price table used to cost Tier-3 provider calls.
    pub price_table: &'a PriceTable,
    /// Seed for operators that need reproducible randomness (`sample`).
    /// `None` means "use real entropy".
    pub rng_seed: Option<u64>,
    /// Default concurrency for Tier-3 fan-out when a plan step doesn't
    /// request its own via `args.concurrency`.
    pub concurrency_cap: usize,
    /// Which model `label`/`extract` use per schema class.
    pub model_selection: &'a crate::tier3::ModelSelection,
}

/// Object-safe operator implementation boundary.
///
/// Tier-1 operators implement this directly. Tier-3 operators are generic
/// structs parameterized over `P: Provider` that implement this trait for
/// a concrete `P`, erasing the type parameter once and for all at
/// construction time.
#[async_trait]
pub trait OperatorImpl: Send + Sync {
    /// Apply this operator to `input` with `args`, returning a fresh
    /// `DocSet` and call telemetry.
    async fn apply(
        &self,
        input: &DocSet,
        args: &serde_json::Value,
        ctx: &ExecContext<'_>,
    ) -> Result<OpResult, OperatorError>;
}

/// The closed set of operator names. Unknown names are fatal at the
/// executor's dispatch stage.
pub struct OperatorRegistry {
    ops: HashMap<String, (Tier, Arc<dyn OperatorImpl>)>,
}

impl OperatorRegistry {
    /// Build the full registry: all Tier-1 operators plus Tier-3 `label`
    /// and `extract`, both backed by `provider`.
    pub fn new<P>(provider: Arc<P>) -> Self
    where
        P: qe_provider::Provider + 'static,
    {
        let mut ops: HashMap<String, (Tier, Arc<dyn OperatorImpl>)> = HashMap::new();

        macro_rules! tier1 {
            ($name:expr, $op:expr) => {
                ops.insert($name.to_string(), (Tier::One, Arc::new($op) as Arc<dyn OperatorImpl>));
            };
        }

        tier1!("filter_metadata", crate::tier1::FilterMetadata);
        tier1!("search_lex", crate::tier1::SearchLex);
        tier1!("search_regex", crate::tier1::SearchRegex);
        tier1!("top_k", crate::tier1::TopK);
        tier1!("sample", crate::tier1::Sample);
        tier1!("get_context", crate::tier1::GetContext);
        tier1!("count", crate::tier1::Count);
        tier1!("trend", crate::tier1::Trend);
        tier1!("filter_by_label", crate::tier1::FilterByLabel);
        tier1!("union", crate::tier1::Union);
        tier1!("intersect", crate::tier1::Intersect);

        ops.insert(
            "label".to_string(),
            (
                Tier::Three,
                Arc::new(crate::tier3::LabelOp::new(Arc::clone(&provider))) as Arc<dyn OperatorImpl>,
            ),
        );
        ops.insert(
            "extract".to_string(),
            (
                Tier::Three,
                Arc::new(crate::tier3::ExtractOp::new(provider)) as Arc<dyn OperatorImpl>,
            ),
        );

        Self { ops }
    }

    /// Look up an operator and its tier by name.
    pub fn get(&self, name: &str) -> Option<(Tier, &Arc<dyn OperatorImpl>)> {
        self.ops.get(name).map(|(tier, op)| (*tier, op))
    }

    /// Whether `name` is a known operator.
    pub fn contains(&self, name: &str) -> bool {
        self.ops.contains_key(name)
    }

    /// Whether `name` is one of the structural operators the executor
    /// special-cases during input resolution (`union`, `intersect`).
    pub fn is_structural(name: &str) -> bool {
        matches!(name, "union" | "intersect")
    }

    /// All registered operator names.
    pub fn names(&self) -> Vec<&str> {
        self.ops.keys().map(String::as_str).collect()
    }
}
