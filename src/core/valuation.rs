//! Values current holdings against a price snapshot.
//!
//! An asset's native currency is taken from the first ledger row (insertion
//! order) that references it. If the same asset was later traded in another
//! currency those rows are still valued in the first one.

use crate::core::currency::{Currency, RateTable, to_base};
use crate::core::error::Result;
use crate::core::holdings::Holdings;
use crate::core::ledger::{Asset, Ledger};
use crate::core::price::PriceTable;
use tracing::{debug, warn};

/// Market value of one position.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetValuation {
    pub asset: Asset,
    pub shares: f64,
    /// `None` when the price table had no entry; the value is then zero.
    pub price: Option<f64>,
    pub currency: Currency,
    pub cost: f64,
    pub value: f64,
}

impl AssetValuation {
    pub fn gain(&self) -> f64 {
        self.value - self.cost
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Valuation {
    pub lines: Vec<AssetValuation>,
    /// Sum of position values in base currency.
    pub holdings_value: f64,
    /// Cash counted as part of the portfolio, in base currency.
    pub cash_value: f64,
    /// Assets valued at zero because the price table had no entry.
    pub missing_prices: Vec<String>,
}

impl Valuation {
    pub fn total(&self) -> f64 {
        self.holdings_value + self.cash_value
    }

    pub fn is_degraded(&self) -> bool {
        !self.missing_prices.is_empty()
    }
}

/// Positions at current prices plus any retained sale proceeds. Subscribed
/// and redeemed cash is left out.
pub fn value_holdings(
    holdings: &Holdings,
    prices: &PriceTable,
    ledger: &Ledger,
    rates: &RateTable,
) -> Result<Valuation> {
    let mut valuation = Valuation {
        cash_value: holdings.sale_proceeds,
        ..Valuation::default()
    };

    for (asset, holding) in &holdings.positions {
        if asset.is_cash() {
            continue;
        }

        let currency = ledger.first_currency_of(asset).unwrap_or(rates.base());
        let price = prices.get(asset.id());
        if price.is_none() {
            warn!("No price for {}, valuing it at zero", asset);
            valuation.missing_prices.push(asset.id().to_string());
        }

        let value = to_base(holding.shares * price.unwrap_or(0.0), currency, rates)?;
        debug!(
            "Valued {} {} at {:?} {} => {:.2} {}",
            holding.shares,
            asset,
            price,
            currency,
            value,
            rates.base()
        );

        valuation.holdings_value += value;
        valuation.lines.push(AssetValuation {
            asset: asset.clone(),
            shares: holding.shares,
            price,
            currency,
            cost: holding.cost,
            value,
        });
    }

    Ok(valuation)
}

/// Current portfolio value: positions at current prices plus the net of all
/// subscriptions and redemptions, as if that cash were still held.
pub fn current_value(
    holdings: &Holdings,
    prices: &PriceTable,
    ledger: &Ledger,
    rates: &RateTable,
) -> Result<Valuation> {
    let mut valuation = value_holdings(holdings, prices, ledger, rates)?;
    valuation.cash_value += holdings.net_cash_flow();
    Ok(valuation)
}
