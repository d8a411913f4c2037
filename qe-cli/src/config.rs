//! A small typed configuration surface: concurrency cap, default budget,
//! price table, and default model per schema class. Loaded from an
//! optional TOML or JSON file; anything the file omits falls back to the
//! code defaults below.

use qe_ops::ModelSelection;
use qe_provider::{ModelPrice, PriceTable};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::error::CliError;

/// Where the price table comes from: an inline map in the config file, a
/// path to a separate file holding the same map, or neither (everything's
/// free, the `PriceTable::empty()` default).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PriceTableConfig {
    /// Path to a TOML or JSON file containing a `model -> price` map.
    pub path: Option<String>,
    /// A `model -> price` map given directly in the config file.
    pub inline: Option<HashMap<String, ModelPrice>>,
}

impl PriceTableConfig {
    /// Resolves this into a `PriceTable`, preferring `inline` over `path`
    /// when both are set. Reading `path` uses the same TOML/JSON dispatch
    /// as the top-level config file.
    pub fn resolve(&self) -> Result<PriceTable, CliError> {
        if let Some(inline) = &self.inline {
            return Ok(PriceTable::from_prices(inline.clone()));
        }
        let Some(path) = &self.path else {
            return Ok(PriceTable::empty());
        };
        let prices: HashMap<String, ModelPrice> = load_typed(Path::new(path))?;
        Ok(PriceTable::from_prices(prices))
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Default Tier-3 fan-out concurrency when a plan step doesn't request
    /// its own.
    pub concurrency: usize,
    /// Default dollar budget for a run when `--budget` isn't given.
    pub default_budget_usd: Decimal,
    /// Where Tier-3 call pricing comes from.
    pub price_table: PriceTableConfig,
    /// Model names `label`/`extract` use per schema class.
    pub default_model: ModelSelection,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            concurrency: 10,
            default_budget_usd: Decimal::new(100, 2),
            price_table: PriceTableConfig::default(),
            default_model: ModelSelection::default(),
        }
    }
}

impl EngineConfig {
    /// Loads config from `path` (TOML or JSON, by extension), falling back
    /// to field-level defaults for anything the file omits. A missing file
    /// extension is treated as TOML.
    pub fn load_from_file(path: &Path) -> Result<Self, CliError> {
        load_typed(path)
    }
}

fn load_typed<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| CliError::Config(format!("failed to read config file {path:?}: {e}")))?;
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => serde_json::from_str(&raw)
            .map_err(|e| CliError::Config(format!("failed to parse {path:?} as JSON: {e}"))),
        _ => toml::from_str(&raw)
            .map_err(|e| CliError::Config(format!("failed to parse {path:?} as TOML: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_an_empty_price_table_and_sane_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.concurrency, 10);
        assert_eq!(config.default_budget_usd, Decimal::new(100, 2));
        let table = config.price_table.resolve().unwrap();
        assert_eq!(table.cost("anything", qe_provider::TokenUsage { input_tokens: 100, output_tokens: 100 }), Decimal::ZERO);
    }

    #[test]
    fn loads_toml_with_partial_overrides() {
        let dir = std::env::temp_dir().join(format!("qe-config-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "concurrency = 4\n").unwrap();

        let config = EngineConfig::load_from_file(&path).unwrap();
        assert_eq!(config.concurrency, 4);
        // everything else falls back to field defaults
        assert_eq!(config.default_budget_usd, Decimal::new(100, 2));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn loads_inline_price_table_from_json() {
        let dir = std::env::temp_dir().join(format!("qe-config-test-inline-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");
        std::fs::write(
            &path,
            serde_json::json!({
                "price_table": {
                    "inline": {
                        "general-reasoner": {
                            "input_usd_per_token": "0.000001",
                            "output_usd_per_token": "0.000005"
                        }
                    }
                }
            })
            .to_string(),
        )
        .unwrap();

        let config = EngineConfig::load_from_file(&path).unwrap();
        let table = config.price_table.resolve().unwrap();
        let cost = table.cost(
            "general-reasoner",
            qe_provider::TokenUsage { input_tokens: 1000, output_tokens: 0 },
        );
        assert_eq!(cost, Decimal::new(1, 3));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let err = EngineConfig::load_from_file(Path::new("/nonexistent/qe-config.toml"));
        assert!(err.is_err());
    }
}
