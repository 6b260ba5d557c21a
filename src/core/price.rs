//! Pricing abstractions and core types

use crate::core::error::{Result, ReturnsError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Latest unit prices keyed by asset id, each in the asset's native currency.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceTable {
    prices: BTreeMap<String, f64>,
}

impl PriceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(prices: &BTreeMap<String, f64>) -> Result<Self> {
        prices
            .iter()
            .try_fold(Self::new(), |table, (asset, price)| {
                table.with_price(asset, *price)
            })
    }

    pub fn with_price(mut self, asset: &str, price: f64) -> Result<Self> {
        if !price.is_finite() || price < 0.0 {
            return Err(ReturnsError::InvalidPrice {
                asset: asset.to_string(),
                price,
            });
        }
        self.prices.insert(asset.to_string(), price);
        Ok(self)
    }

    pub fn get(&self, asset: &str) -> Option<f64> {
        self.prices.get(asset).copied()
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceQuote {
    pub price: f64,
    pub currency: String,
}

#[async_trait]
pub trait PriceProvider: Send + Sync {
    async fn fetch_price(&self, symbol: &str) -> anyhow::Result<PriceQuote>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_table_lookup() {
        let table = PriceTable::new()
            .with_price("Moutai", 1580.0)
            .and_then(|t| t.with_price("Xiaomi", 22.5))
            .unwrap();
        assert_eq!(table.get("Moutai"), Some(1580.0));
        assert_eq!(table.get("Tencent"), None);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_invalid_prices_rejected() {
        assert!(PriceTable::new().with_price("A", -1.0).is_err());
        assert!(PriceTable::new().with_price("A", f64::INFINITY).is_err());
        assert!(PriceTable::new().with_price("A", 0.0).is_ok());
    }
}
