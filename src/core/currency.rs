//! Currency conversion abstractions

use crate::core::error::{Result, ReturnsError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize,
)]
pub enum Currency {
    #[default]
    #[serde(rename = "CNY")]
    Cny,
    #[serde(rename = "HKD")]
    Hkd,
    #[serde(rename = "USD")]
    Usd,
}

impl Currency {
    pub const ALL: [Currency; 3] = [Currency::Cny, Currency::Hkd, Currency::Usd];

    pub fn code(&self) -> &'static str {
        match self {
            Currency::Cny => "CNY",
            Currency::Hkd => "HKD",
            Currency::Usd => "USD",
        }
    }
}

impl Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Currency {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "CNY" => Ok(Currency::Cny),
            "HKD" => Ok(Currency::Hkd),
            "USD" => Ok(Currency::Usd),
            _ => Err(anyhow::anyhow!("Unsupported currency: {}", s)),
        }
    }
}

/// Conversion factors from each currency into a single base currency.
///
/// The base currency always maps to exactly 1. A table is an immutable
/// snapshot: refreshing rates builds a new table instead of mutating one
/// that a calculation may be reading.
#[derive(Debug, Clone, PartialEq)]
pub struct RateTable {
    base: Currency,
    rates: BTreeMap<Currency, f64>,
}

impl RateTable {
    pub fn new(base: Currency) -> Self {
        let mut rates = BTreeMap::new();
        rates.insert(base, 1.0);
        Self { base, rates }
    }

    /// Builds a table from a currency -> factor mapping. The base entry, if
    /// present, must be 1.
    pub fn from_map(base: Currency, rates: &BTreeMap<Currency, f64>) -> Result<Self> {
        rates
            .iter()
            .try_fold(Self::new(base), |table, (currency, rate)| {
                table.with_rate(*currency, *rate)
            })
    }

    pub fn with_rate(mut self, currency: Currency, rate: f64) -> Result<Self> {
        let invalid = !rate.is_finite() || rate <= 0.0 || (currency == self.base && rate != 1.0);
        if invalid {
            return Err(ReturnsError::InvalidRate { currency, rate });
        }
        self.rates.insert(currency, rate);
        Ok(self)
    }

    pub fn base(&self) -> Currency {
        self.base
    }

    pub fn get(&self, currency: Currency) -> Option<f64> {
        self.rates.get(&currency).copied()
    }

    pub fn contains(&self, currency: Currency) -> bool {
        self.rates.contains_key(&currency)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Currency, f64)> + '_ {
        self.rates.iter().map(|(c, r)| (*c, *r))
    }
}

/// Converts `amount` in `currency` into the base currency of `rates`.
///
/// Fails with [`ReturnsError::MissingRate`] when the table has no entry for
/// `currency`; callers propagate it so a computation never mixes a partial
/// conversion into its totals.
pub fn to_base(amount: f64, currency: Currency, rates: &RateTable) -> Result<f64> {
    rates
        .get(currency)
        .map(|rate| amount * rate)
        .ok_or(ReturnsError::MissingRate(currency))
}

#[async_trait]
pub trait RateProvider: Send + Sync {
    async fn fetch_rates(&self, base: Currency) -> anyhow::Result<RateTable>;
}
