//! Reduces a transaction ledger into per-asset positions and cash totals.
use crate::core::currency::{RateTable, to_base};
use crate::core::error::{Result, ReturnsError};
use crate::core::ledger::{Asset, Ledger, Transaction, TransactionType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// How Sell rows are treated when aggregating a ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SellPolicy {
    /// Sell rows are accepted by the ledger but leave holdings, cash and
    /// both return figures untouched.
    #[default]
    Ignore,
    /// Sell rows decrement shares, release cost at average cost and keep the
    /// proceeds in the portfolio as cash.
    Reduce,
}

/// A derived position. Never stored; rebuilt from the ledger on every pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Holding {
    pub asset: Asset,
    pub shares: f64,
    /// Cumulative cost in base currency.
    pub cost: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Holdings {
    pub positions: BTreeMap<Asset, Holding>,
    /// Sum of Buy costs in base currency.
    pub buy_cost: f64,
    pub subscribed: f64,
    pub redeemed: f64,
    /// Base-currency proceeds of Sell rows; always zero under `SellPolicy::Ignore`.
    pub sale_proceeds: f64,
}

impl Holdings {
    /// Buy costs plus subscriptions minus redemptions.
    pub fn total_investment(&self) -> f64 {
        self.buy_cost + self.subscribed - self.redeemed
    }

    /// Subscriptions minus redemptions, regardless of date.
    pub fn net_cash_flow(&self) -> f64 {
        self.subscribed - self.redeemed
    }

    pub fn get(&self, asset: &Asset) -> Option<&Holding> {
        self.positions.get(asset)
    }
}

/// Accumulates holdings from the ledger.
///
/// Cash totals and Buy costs are summed in insertion order. Positions are
/// built in insertion order too, except under [`SellPolicy::Reduce`], where
/// they are replayed by date so a Sell only draws on shares bought on or
/// before its own date.
pub fn aggregate(ledger: &Ledger, rates: &RateTable, policy: SellPolicy) -> Result<Holdings> {
    let mut holdings = Holdings::default();

    for t in ledger.iter() {
        match t.kind {
            TransactionType::Buy => {
                holdings.buy_cost += to_base(t.gross(), t.currency, rates)?;
            }
            TransactionType::Subscribe => {
                holdings.subscribed += to_base(t.price, t.currency, rates)?;
            }
            TransactionType::Redeem => {
                holdings.redeemed += to_base(t.price, t.currency, rates)?;
            }
            TransactionType::Sell => {}
        }
    }

    let rows: Vec<&Transaction> = match policy {
        SellPolicy::Ignore => ledger.iter().collect(),
        SellPolicy::Reduce => ledger.sorted_by_date(),
    };
    for t in rows {
        match t.kind {
            TransactionType::Buy => {
                let cost = to_base(t.gross(), t.currency, rates)?;
                let holding = holdings
                    .positions
                    .entry(t.asset.clone())
                    .or_insert_with(|| Holding {
                        asset: t.asset.clone(),
                        shares: 0.0,
                        cost: 0.0,
                    });
                holding.shares += t.shares;
                holding.cost += cost;
            }
            TransactionType::Sell => match policy {
                SellPolicy::Ignore => {
                    debug!("Ignoring sell transaction {} of {}", t.id, t.asset);
                }
                SellPolicy::Reduce => {
                    let proceeds = to_base(t.gross(), t.currency, rates)?;
                    let held = holdings.get(&t.asset).map_or(0.0, |h| h.shares);
                    if t.shares > held {
                        return Err(ReturnsError::InsufficientShares {
                            id: t.id,
                            asset: t.asset.id().to_string(),
                            held,
                            sold: t.shares,
                        });
                    }
                    if let Some(holding) = holdings.positions.get_mut(&t.asset) {
                        if holding.shares > 0.0 {
                            holding.cost -= holding.cost * (t.shares / holding.shares);
                        }
                        holding.shares -= t.shares;
                    }
                    holdings.sale_proceeds += proceeds;
                }
            },
            TransactionType::Subscribe | TransactionType::Redeem => {}
        }
    }

    debug!(
        "Aggregated {} transactions into {} positions, total investment {:.2}",
        ledger.len(),
        holdings.positions.len(),
        holdings.total_investment()
    );
    Ok(holdings)
}
