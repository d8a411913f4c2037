//! Static per-model pricing used to turn token usage into a dollar cost.

use crate::types::TokenUsage;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-token price for a single model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelPrice {
    /// USD per input token.
    pub input_usd_per_token: Decimal,
    /// USD per output token.
    pub output_usd_per_token: Decimal,
}

/// A static `model -> price` mapping. Models with no entry cost nothing —
/// this is "dev mode", used freely in tests and by any caller that hasn't
/// configured real pricing yet.
#[derive(Debug, Clone, Default)]
pub struct PriceTable {
    prices: HashMap<String, ModelPrice>,
}

impl PriceTable {
    /// An empty table — every model is free.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a table from an already-assembled `model -> price` map, e.g.
    /// one deserialized from a config file.
    pub fn from_prices(prices: HashMap<String, ModelPrice>) -> Self {
        Self { prices }
    }

    /// Register or overwrite a model's price.
    pub fn set(&mut self, model: impl Into<String>, price: ModelPrice) -> &mut Self {
        self.prices.insert(model.into(), price);
        self
    }

    /// The dollar cost of `usage` against `model`'s price, or zero if the
    /// model has no registered price.
    pub fn cost(&self, model: &str, usage: TokenUsage) -> Decimal {
        match self.prices.get(model) {
            Some(price) => {
                Decimal::from(usage.input_tokens) * price.input_usd_per_token
                    + Decimal::from(usage.output_tokens) * price.output_usd_per_token
            }
            None => Decimal::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn unknown_model_costs_nothing() {
        let table = PriceTable::empty();
        let usage = TokenUsage {
            input_tokens: 1000,
            output_tokens: 500,
        };
        assert_eq!(table.cost("ghost-model", usage), Decimal::ZERO);
    }

    #[test]
    fn known_model_computes_weighted_cost() {
        let mut table = PriceTable::empty();
        table.set(
            "cheap-model",
            ModelPrice {
                input_usd_per_token: dec!(0.000001),
                output_usd_per_token: dec!(0.000005),
            },
        );
        let usage = TokenUsage {
            input_tokens: 1000,
            output_tokens: 200,
        };
        // 1000 * 0.000001 + 200 * 0.000005 = 0.001 + 0.001 = 0.002
        assert_eq!(table.cost("cheap-model", usage), dec!(0.002));
    }
}
