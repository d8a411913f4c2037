//! A monetary ceiling enforced across one execution.

use crate::error::CoreError;
use rust_decimal::Decimal;

/// Running cost accumulator with a hard upper bound.
///
/// `Budget` is the only mutable per-execution resource. All increments
/// happen on the orchestrator thread between operator returns,
/// so no locking is required even though Tier-3 operators run concurrent
/// LLM calls internally — those calls report a single aggregate cost back
/// to the executor, which is the only thing that ever calls [`Budget::charge`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Budget {
    limit_usd: Decimal,
    spent_usd: Decimal,
}

impl Budget {
    /// Create a new budget with nothing spent yet.
    pub fn new(limit_usd: Decimal) -> Self {
        Self {
            limit_usd,
            spent_usd: Decimal::ZERO,
        }
    }

    /// The budget ceiling.
    pub fn limit_usd(&self) -> Decimal {
        self.limit_usd
    }

    /// Amount committed so far.
    pub fn spent_usd(&self) -> Decimal {
        self.spent_usd
    }

    /// Amount still available.
    pub fn remaining_usd(&self) -> Decimal {
        (self.limit_usd - self.spent_usd).max(Decimal::ZERO)
    }

    /// Attempt to charge `cost` against the budget.
    ///
    /// On success, `spent_usd` increases by exactly `cost` and the new
    /// total is returned. On failure, `spent_usd` is left untouched — the
    /// offending step is recorded as errored but its cost is never
    /// committed, preserving the invariant `spent_usd <= limit_usd` at the
    /// end of any execution.
    pub fn charge(&mut self, cost: Decimal) -> Result<Decimal, CoreError> {
        let projected = self.spent_usd + cost;
        if projected > self.limit_usd {
            return Err(CoreError::BudgetExceeded {
                spent: self.spent_usd,
                step_cost: cost,
                limit: self.limit_usd,
            });
        }
        self.spent_usd = projected;
        Ok(self.spent_usd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn charge_within_limit_succeeds() {
        let mut budget = Budget::new(dec!(10.00));
        assert_eq!(budget.charge(dec!(3.00)).unwrap(), dec!(3.00));
        assert_eq!(budget.spent_usd(), dec!(3.00));
        assert_eq!(budget.remaining_usd(), dec!(7.00));
    }

    #[test]
    fn charge_exceeding_limit_fails_without_mutating_spent() {
        let mut budget = Budget::new(dec!(1.00));
        let err = budget.charge(dec!(2.00)).unwrap_err();
        assert!(matches!(err, crate::error::CoreError::BudgetExceeded { .. }));
        assert_eq!(budget.spent_usd(), Decimal::ZERO);
    }

    #[test]
    fn charge_exactly_at_limit_succeeds() {
        let mut budget = Budget::new(dec!(5.00));
        assert!(budget.charge(dec!(5.00)).is_ok());
        assert_eq!(budget.remaining_usd(), Decimal::ZERO);
    }

    #[test]
    fn spent_never_exceeds_limit_across_mixed_charges() {
        let mut budget = Budget::new(dec!(5.00));
        assert!(budget.charge(dec!(4.00)).is_ok());
        assert!(budget.charge(dec!(4.00)).is_err());
        assert!(budget.spent_usd() <= budget.limit_usd());
        assert_eq!(budget.spent_usd(), dec!(4.00));
    }
}
