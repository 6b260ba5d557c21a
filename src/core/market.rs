//! Refreshes the rate and price snapshot from the fetch collaborators.
//!
//! A refresh never fails. Whatever cannot be fetched keeps its last-known
//! value, so the calculator always has a complete snapshot to work with.

use crate::core::currency::{Currency, RateProvider, RateTable};
use crate::core::ledger::{Asset, Ledger};
use crate::core::price::{PriceProvider, PriceTable};
use anyhow::anyhow;
use futures::future::join_all;
use tracing::{debug, error, info, warn};

/// One consistent set of inputs for a calculation.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketSnapshot {
    pub rates: RateTable,
    pub prices: PriceTable,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RefreshReport {
    pub rates_updated: bool,
    pub prices_updated: Vec<String>,
    pub failures: Vec<String>,
}

/// An asset to price live: its ticker and the currency the ledger values it in.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceTarget {
    pub asset: String,
    pub symbol: String,
    pub currency: Currency,
}

/// Resolves each (asset id, ticker) pair to the currency valuation will
/// convert its price from: the asset's first ledger currency, else the base.
pub fn price_targets(
    ledger: &Ledger,
    base: Currency,
    symbols: &[(String, String)],
) -> Vec<PriceTarget> {
    symbols
        .iter()
        .map(|(asset, symbol)| PriceTarget {
            asset: asset.clone(),
            symbol: symbol.clone(),
            currency: ledger
                .first_currency_of(&Asset::from(asset.as_str()))
                .unwrap_or(base),
        })
        .collect()
}

/// Fetches rates and prices concurrently and builds the next snapshot on top
/// of `last`. A quote in a currency other than the target's is rejected and
/// the last-known price kept.
pub async fn refresh(
    last: &MarketSnapshot,
    rate_provider: Option<&(dyn RateProvider + Send + Sync)>,
    price_provider: Option<&(dyn PriceProvider + Send + Sync)>,
    targets: &[PriceTarget],
    update_callback: &(dyn Fn() + Send + Sync),
) -> (MarketSnapshot, RefreshReport) {
    let mut report = RefreshReport::default();
    let base = last.rates.base();

    let rates_future = async {
        match rate_provider {
            Some(provider) => Some(provider.fetch_rates(base).await),
            None => None,
        }
    };

    let prices_future = async {
        match price_provider {
            Some(provider) => {
                let futures = targets.iter().map(|target| async move {
                    let result = provider.fetch_price(&target.symbol).await;
                    update_callback();
                    (target, result)
                });
                join_all(futures).await
            }
            None => Vec::new(),
        }
    };

    let (rates_result, price_results) = futures::join!(rates_future, prices_future);

    let rates = match rates_result {
        Some(Ok(fetched)) => {
            report.rates_updated = true;
            let mut rates = fetched;
            for (currency, rate) in last.rates.iter() {
                if rates.contains(currency) {
                    continue;
                }
                debug!("Keeping last-known rate for {currency}: {rate}");
                if let Ok(merged) = rates.clone().with_rate(currency, rate) {
                    rates = merged;
                }
            }
            rates
        }
        Some(Err(e)) => {
            error!("Failed to fetch exchange rates, keeping last-known table: {e:#}");
            report.failures.push(format!("exchange rates: {e}"));
            last.rates.clone()
        }
        None => last.rates.clone(),
    };

    let mut prices = last.prices.clone();
    for (target, result) in price_results {
        let PriceTarget {
            asset,
            symbol,
            currency,
        } = target;
        let updated = result.and_then(|quote| {
            if !quote.currency.eq_ignore_ascii_case(currency.code()) {
                warn!(
                    "{symbol} is quoted in {}, but {asset} is valued in {currency}",
                    quote.currency
                );
                return Err(anyhow!(
                    "quoted in {}, expected {}",
                    quote.currency,
                    currency
                ));
            }
            prices
                .clone()
                .with_price(asset, quote.price)
                .map_err(anyhow::Error::from)
        });
        match updated {
            Ok(updated) => {
                debug!("Updated price for {asset} from {symbol}");
                prices = updated;
                report.prices_updated.push(asset.clone());
            }
            Err(e) => {
                error!("Failed to fetch price for {asset} ({symbol}), keeping last-known: {e:#}");
                report.failures.push(format!("{asset}: {e}"));
            }
        }
    }

    info!(
        "Market data refreshed: rates updated {}, {} prices updated, {} failures",
        report.rates_updated,
        report.prices_updated.len(),
        report.failures.len()
    );
    (MarketSnapshot { rates, prices }, report)
}
