//! Caller-owned container for the calculator inputs.
//!
//! The state holds inputs only. Every query aggregates the ledger again from
//! scratch against the current rate and price snapshot.

use crate::core::currency::{Currency, RateTable};
use crate::core::error::Result;
use crate::core::holdings::{Holdings, SellPolicy, aggregate};
use crate::core::ledger::Ledger;
use crate::core::price::PriceTable;
use crate::core::returns::{ReturnCalculator, Returns};
use crate::core::valuation::{Valuation, current_value};
use chrono::NaiveDate;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct PortfolioState {
    ledger: Ledger,
    rates: RateTable,
    prices: PriceTable,
    sell_policy: SellPolicy,
    as_of: NaiveDate,
}

impl PortfolioState {
    pub fn new(ledger: Ledger, rates: RateTable, prices: PriceTable, as_of: NaiveDate) -> Self {
        Self {
            ledger,
            rates,
            prices,
            sell_policy: SellPolicy::default(),
            as_of,
        }
    }

    pub fn with_sell_policy(mut self, sell_policy: SellPolicy) -> Self {
        self.sell_policy = sell_policy;
        self
    }

    pub fn set_ledger(&mut self, ledger: Ledger) {
        debug!("Replacing ledger with {} transactions", ledger.len());
        self.ledger = ledger;
        self.warn_missing_rates();
    }

    pub fn set_rates(&mut self, rates: RateTable) {
        debug!("Replacing rate table: {:?}", rates);
        self.rates = rates;
        self.warn_missing_rates();
    }

    pub fn set_prices(&mut self, prices: PriceTable) {
        debug!("Replacing price table with {} prices", prices.len());
        self.prices = prices;
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut Ledger {
        &mut self.ledger
    }

    pub fn rates(&self) -> &RateTable {
        &self.rates
    }

    pub fn prices(&self) -> &PriceTable {
        &self.prices
    }

    pub fn as_of(&self) -> NaiveDate {
        self.as_of
    }

    pub fn get_returns(&self) -> Result<Returns> {
        ReturnCalculator::new(&self.ledger, &self.rates, &self.prices)
            .with_sell_policy(self.sell_policy)
            .compute(self.as_of)
    }

    pub fn holdings(&self) -> Result<Holdings> {
        aggregate(&self.ledger, &self.rates, self.sell_policy)
    }

    pub fn valuation(&self) -> Result<Valuation> {
        let holdings = self.holdings()?;
        current_value(&holdings, &self.prices, &self.ledger, &self.rates)
    }

    /// Currencies used by the ledger that the rate table cannot convert.
    pub fn missing_rates(&self) -> Vec<Currency> {
        self.ledger
            .currencies()
            .into_iter()
            .filter(|c| !self.rates.contains(*c))
            .collect()
    }

    fn warn_missing_rates(&self) {
        for currency in self.missing_rates() {
            warn!("Rate table has no entry for {}, which the ledger uses", currency);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ReturnsError;
    use crate::core::ledger::tests::{date, tx};
    use crate::core::ledger::{AssetRegistry, TransactionType};

    fn state() -> PortfolioState {
        let ledger = Ledger::from_transactions(
            AssetRegistry::new(["Moutai"]),
            vec![tx(1, "2024-01-01", TransactionType::Buy, "Moutai", 10.0, 100.0, Currency::Cny)],
        )
        .unwrap();
        let prices = PriceTable::new().with_price("Moutai", 100.0).unwrap();
        PortfolioState::new(ledger, RateTable::new(Currency::Cny), prices, date("2025-01-01"))
    }

    #[test]
    fn test_recomputes_after_price_change() {
        let mut state = state();
        assert_eq!(state.get_returns().unwrap().twr, 0.0);

        state.set_prices(PriceTable::new().with_price("Moutai", 150.0).unwrap());
        assert_eq!(state.get_returns().unwrap().twr, 50.0);
    }

    #[test]
    fn test_recomputes_after_ledger_edit() {
        let mut state = state();
        state
            .ledger_mut()
            .add(tx(2, "2024-06-01", TransactionType::Buy, "Moutai", 10.0, 50.0, Currency::Cny))
            .unwrap();
        // 20 shares at 100 against 1500 invested.
        assert_eq!(state.get_returns().unwrap().twr, 33.33);
        assert_eq!(state.holdings().unwrap().buy_cost, 1500.0);

        state.ledger_mut().remove(2).unwrap();
        assert_eq!(state.get_returns().unwrap().twr, 0.0);
    }

    #[test]
    fn test_rates_replaced_wholesale() {
        let mut state = state();
        let mut ledger = state.ledger().clone();
        ledger
            .add(tx(2, "2024-06-01", TransactionType::Subscribe, "Cash", 0.0, 100.0, Currency::Usd))
            .unwrap();
        state.set_ledger(ledger);
        assert_eq!(state.missing_rates(), vec![Currency::Usd]);
        assert_eq!(
            state.get_returns(),
            Err(ReturnsError::MissingRate(Currency::Usd))
        );

        state.set_rates(RateTable::new(Currency::Cny).with_rate(Currency::Usd, 7.0).unwrap());
        assert!(state.missing_rates().is_empty());
        let valuation = state.valuation().unwrap();
        assert_eq!(valuation.total(), 1000.0 + 700.0);
    }
}
