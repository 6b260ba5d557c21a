//! Time-weighted and money-weighted return figures for a ledger.
//!
//! Both figures are cheap approximations computed synchronously from one
//! rate/price snapshot:
//!
//! * "TWR" is a fund net-asset-value style cumulative return,
//!   `(value - invested) / invested`. There is no sub-period chaining, so it
//!   is not a true time-weighted return despite the name.
//! * "MWR" weights each cash flow linearly by `days_held / 365` and divides
//!   the gain by that exposure. There is no root finding, so it is not a
//!   solved internal rate of return.

use crate::core::currency::{RateTable, to_base};
use crate::core::error::Result;
use crate::core::holdings::{SellPolicy, aggregate};
use crate::core::ledger::{Ledger, Transaction, TransactionType};
use crate::core::price::PriceTable;
use crate::core::valuation::{current_value, value_holdings};
use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

const DAYS_PER_YEAR: f64 = 365.0;

/// Return figures in percent, rounded to two decimals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Returns {
    pub twr: f64,
    pub mwr: f64,
}

pub struct ReturnCalculator<'a> {
    ledger: &'a Ledger,
    rates: &'a RateTable,
    prices: &'a PriceTable,
    sell_policy: SellPolicy,
}

impl<'a> ReturnCalculator<'a> {
    pub fn new(ledger: &'a Ledger, rates: &'a RateTable, prices: &'a PriceTable) -> Self {
        Self {
            ledger,
            rates,
            prices,
            sell_policy: SellPolicy::default(),
        }
    }

    pub fn with_sell_policy(mut self, sell_policy: SellPolicy) -> Self {
        self.sell_policy = sell_policy;
        self
    }

    /// Both figures, rounded for display.
    pub fn compute(&self, as_of: NaiveDate) -> Result<Returns> {
        Ok(Returns {
            twr: round2(self.compute_twr()?),
            mwr: round2(self.compute_mwr(as_of)?),
        })
    }

    /// Cumulative return in percent. Zero when nothing has been invested.
    pub fn compute_twr(&self) -> Result<f64> {
        let holdings = aggregate(self.ledger, self.rates, self.sell_policy)?;
        let invested = holdings.total_investment();
        let value = current_value(&holdings, self.prices, self.ledger, self.rates)?.total();

        debug!("TWR inputs: invested {invested:.2}, value {value:.2}");
        if invested > 0.0 {
            Ok((value - invested) / invested * 100.0)
        } else {
            Ok(0.0)
        }
    }

    /// Day-weighted return in percent as of `as_of`. Zero when the weighted
    /// exposure is not positive, e.g. an empty ledger or only same-day rows.
    pub fn compute_mwr(&self, as_of: NaiveDate) -> Result<f64> {
        let mut total_cash_flow = 0.0;
        let mut weighted = 0.0;

        for t in self.ledger.sorted_by_date() {
            let sign = match t.kind {
                TransactionType::Buy | TransactionType::Subscribe => 1.0,
                TransactionType::Redeem => -1.0,
                TransactionType::Sell => continue,
            };
            let amount = to_base(flow_amount(t), t.currency, self.rates)?;
            let years_held = (as_of - t.date).num_days() as f64 / DAYS_PER_YEAR;

            total_cash_flow += sign * amount;
            weighted += sign * amount * years_held;
        }

        let holdings = aggregate(self.ledger, self.rates, self.sell_policy)?;
        let value = value_holdings(&holdings, self.prices, self.ledger, self.rates)?.total();

        debug!(
            "MWR inputs: cash flow {total_cash_flow:.2}, weighted {weighted:.2}, value {value:.2}"
        );
        if weighted > 0.0 {
            Ok((value - total_cash_flow) / weighted * 100.0)
        } else {
            Ok(0.0)
        }
    }
}

/// `shares * price`, or the bare price when that product is zero. Cash rows
/// carry their amount in `price` with no shares.
fn flow_amount(t: &Transaction) -> f64 {
    let gross = t.gross();
    if gross != 0.0 { gross } else { t.price }
}

/// Rounds to two decimals. Negative values that round to zero come back as
/// `0.0`, not `-0.0`.
pub fn round2(value: f64) -> f64 {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded == 0.0 { 0.0 } else { rounded }
}
