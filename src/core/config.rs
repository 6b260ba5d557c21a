use crate::core::currency::{Currency, RateTable};
use crate::core::holdings::SellPolicy;
use crate::core::ledger::{AssetRegistry, Ledger, Transaction};
use crate::core::price::PriceTable;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::{fs, path::PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AssetConfig {
    pub id: String,
    /// Ticker used to fetch a live price. Assets without one keep the seed price.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ExchangeRateProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct YahooProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub exchange_rate: Option<ExchangeRateProviderConfig>,
    pub yahoo: Option<YahooProviderConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            exchange_rate: Some(ExchangeRateProviderConfig {
                base_url: "https://api.exchangerate-api.com".to_string(),
            }),
            yahoo: Some(YahooProviderConfig {
                base_url: "https://query1.finance.yahoo.com".to_string(),
            }),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub base_currency: Currency,
    #[serde(default)]
    pub assets: Vec<AssetConfig>,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    /// Seed conversion factors into the base currency, used until a fetch
    /// succeeds and whenever it fails.
    #[serde(default)]
    pub rates: BTreeMap<Currency, f64>,
    /// Seed unit prices in each asset's native currency.
    #[serde(default)]
    pub prices: BTreeMap<String, f64>,
    #[serde(default)]
    pub sell_policy: SellPolicy,
    #[serde(default)]
    pub providers: ProvidersConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("io", "pfreturns", "pfreturns")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn save_to_path<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        let config_str =
            serde_yaml::to_string(self).context("Failed to serialize configuration")?;
        fs::write(path.as_ref(), config_str)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;
        debug!("Saved config to {}", path.as_ref().display());
        Ok(())
    }

    pub fn registry(&self) -> AssetRegistry {
        AssetRegistry::new(self.assets.iter().map(|a| a.id.clone()))
    }

    pub fn ledger(&self) -> Result<Ledger> {
        Ledger::from_transactions(self.registry(), self.transactions.iter().cloned())
            .context("Invalid transaction in configuration")
    }

    pub fn seed_rates(&self) -> Result<RateTable> {
        RateTable::from_map(self.base_currency, &self.rates)
            .context("Invalid seed rate in configuration")
    }

    pub fn seed_prices(&self) -> Result<PriceTable> {
        PriceTable::from_map(&self.prices).context("Invalid seed price in configuration")
    }

    /// (asset id, ticker) pairs for assets that can be priced live.
    pub fn symbols(&self) -> Vec<(String, String)> {
        self.assets
            .iter()
            .filter_map(|a| a.symbol.as_ref().map(|s| (a.id.clone(), s.clone())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ledger::{Asset, TransactionType};

    const YAML: &str = r#"
base_currency: CNY
assets:
  - id: "Kweichow Moutai"
    symbol: "600519.SS"
  - id: "Xiaomi"
    symbol: "1810.HK"
  - id: "Private Fund"
transactions:
  - id: 1
    date: 2024-01-15
    type: buy
    asset: "Kweichow Moutai"
    shares: 10
    price: 1650
    currency: CNY
  - id: 2
    date: 2024-03-20
    type: 买入
    asset: "Xiaomi"
    shares: 1000
    price: 18.5
    currency: HKD
  - id: 3
    date: 2024-06-10
    type: subscribe
    asset: Cash
    price: 50000
    currency: CNY
rates:
  HKD: 0.91
  USD: 7.25
prices:
  "Kweichow Moutai": 1580
  "Xiaomi": 22.5
sell_policy: reduce
"#;

    #[test]
    fn test_config_deserialization() {
        let config: AppConfig = serde_yaml::from_str(YAML).expect("Failed to deserialize");
        assert_eq!(config.base_currency, Currency::Cny);
        assert_eq!(config.assets.len(), 3);
        assert_eq!(config.transactions.len(), 3);
        assert_eq!(config.transactions[1].kind, TransactionType::Buy);
        assert_eq!(config.transactions[2].asset, Asset::Cash);
        assert_eq!(config.sell_policy, SellPolicy::Reduce);
        assert_eq!(config.rates.get(&Currency::Usd), Some(&7.25));
        assert_eq!(
            config.symbols(),
            vec![
                ("Kweichow Moutai".to_string(), "600519.SS".to_string()),
                ("Xiaomi".to_string(), "1810.HK".to_string()),
            ]
        );

        // Providers fall back to the public endpoints.
        assert_eq!(
            config.providers.exchange_rate.unwrap().base_url,
            "https://api.exchangerate-api.com"
        );
        assert_eq!(
            config.providers.yahoo.unwrap().base_url,
            "https://query1.finance.yahoo.com"
        );
    }

    #[test]
    fn test_builds_engine_inputs() {
        let config: AppConfig = serde_yaml::from_str(YAML).unwrap();
        let ledger = config.ledger().unwrap();
        assert_eq!(ledger.len(), 3);
        let rates = config.seed_rates().unwrap();
        assert_eq!(rates.get(Currency::Cny), Some(1.0));
        assert_eq!(rates.get(Currency::Hkd), Some(0.91));
        let prices = config.seed_prices().unwrap();
        assert_eq!(prices.get("Xiaomi"), Some(22.5));
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: AppConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.base_currency, Currency::Cny);
        assert_eq!(config.sell_policy, SellPolicy::Ignore);
        assert!(config.ledger().unwrap().is_empty());
    }

    #[test]
    fn test_unknown_asset_in_ledger_is_rejected() {
        let yaml = r#"
assets:
  - id: "Xiaomi"
transactions:
  - id: 1
    date: 2024-01-15
    type: buy
    asset: "Tencent"
    shares: 1
    price: 300
    currency: HKD
"#;
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        let err = config.ledger().unwrap_err();
        assert!(format!("{err:#}").contains("Unknown asset: Tencent"));
    }

    #[test]
    fn test_unknown_type_is_rejected_at_load() {
        let yaml = r#"
transactions:
  - id: 1
    date: 2024-01-15
    type: transfer
    asset: Cash
    price: 300
    currency: CNY
"#;
        assert!(serde_yaml::from_str::<AppConfig>(yaml).is_err());
    }

    #[test]
    fn test_save_and_reload() -> Result<()> {
        let dir = tempfile::TempDir::new()?;
        let path = dir.path().join("config.yaml");
        let config: AppConfig = serde_yaml::from_str(YAML)?;
        config.save_to_path(&path)?;

        let reloaded = AppConfig::load_from_path(&path)?;
        assert_eq!(reloaded.transactions, config.transactions);
        assert_eq!(reloaded.assets, config.assets);
        assert_eq!(reloaded.rates, config.rates);
        Ok(())
    }
}
