//! Static per-model prices.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use conduit_core::TokenUsage;

/// USD per million tokens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelPrice {
    pub input_per_mtok: f64,
    pub output_per_mtok: f64,
    /// Price for cache-read input tokens; falls back to the input price.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_read_per_mtok: Option<f64>,
}

impl ModelPrice {
    pub fn new(input_per_mtok: f64, output_per_mtok: f64) -> Self {
        Self {
            input_per_mtok,
            output_per_mtok,
            cache_read_per_mtok: None,
        }
    }

    pub fn cost(&self, usage: &TokenUsage) -> f64 {
        let cached = usage.cache_read_tokens.unwrap_or(0).min(usage.input_tokens);
        let uncached = usage.input_tokens - cached;
        let cache_price = self.cache_read_per_mtok.unwrap_or(self.input_per_mtok);
        (uncached as f64 * self.input_per_mtok
            + cached as f64 * cache_price
            + usage.output_tokens as f64 * self.output_per_mtok)
            / 1_000_000.0
    }
}

/// Price table keyed by model id.
pub type PriceTable = BTreeMap<String, ModelPrice>;

/// Cost of `usage` for `model`, or `None` when the model has no price.
pub fn estimate_cost(prices: &PriceTable, model: &str, usage: &TokenUsage) -> Option<f64> {
    prices.get(model).map(|price| price.cost(usage))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_cost_per_million() {
        let price = ModelPrice::new(3.0, 15.0);
        let cost = price.cost(&TokenUsage::new(1_000_000, 100_000));
        assert!(close(cost, 4.5));
    }

    #[test]
    fn test_cache_read_discount() {
        let price = ModelPrice {
            cache_read_per_mtok: Some(0.3),
            ..ModelPrice::new(3.0, 15.0)
        };
        let usage = TokenUsage::new(1_000_000, 0).with_cache_read(500_000);
        assert!(close(price.cost(&usage), 1.65));
    }

    #[test]
    fn test_unknown_model() {
        let mut prices = PriceTable::new();
        prices.insert("m".into(), ModelPrice::new(1.0, 2.0));
        assert!(estimate_cost(&prices, "other", &TokenUsage::new(10, 10)).is_none());
        assert!(estimate_cost(&prices, "m", &TokenUsage::new(10, 10)).is_some());
    }
}
