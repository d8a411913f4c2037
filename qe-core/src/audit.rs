//! The append-only audit trail carried by every [`crate::docset::DocSet`].

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One record of a successful operator application.
///
/// Audit entries are never mutated or removed — they accumulate for the
/// lifetime of one execution and are carried forward by every DocSet
/// derived from the one that recorded them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Name of the operator that ran.
    pub op: String,
    /// A snapshot of the arguments it ran with.
    pub args: serde_json::Value,
    /// When the operator finished.
    pub timestamp: DateTime<Utc>,
    /// Number of documents the operator received.
    pub input_count: usize,
    /// Number of documents the operator returned.
    pub output_count: usize,
    /// Wall-clock time the operator took.
    pub duration_ms: u64,
    /// Cost incurred, zero for Tier-1 operators.
    pub cost_usd: Decimal,
}

impl AuditEntry {
    /// Build an audit entry for a step that errored non-fatally. Carries a
    /// synthetic zero-cost record so the trail still shows the attempt.
    pub fn passthrough(op: impl Into<String>, count: usize, now: DateTime<Utc>) -> Self {
        Self {
            op: op.into(),
            args: serde_json::Value::Null,
            timestamp: now,
            input_count: count,
            output_count: count,
            duration_ms: 0,
            cost_usd: Decimal::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passthrough_entry_has_zero_cost_and_equal_counts() {
        let now = Utc::now();
        let entry = AuditEntry::passthrough("search_regex", 12, now);
        assert_eq!(entry.input_count, entry.output_count);
        assert_eq!(entry.cost_usd, Decimal::ZERO);
        assert_eq!(entry.op, "search_regex");
    }
}
