use super::{holdings::degraded_notice, ui};
use crate::core::state::PortfolioState;
use anyhow::Result;
use comfy_table::Cell;
use tracing::debug;

pub fn render(state: &PortfolioState) -> Result<String> {
    let base = state.rates().base();
    let returns = state.get_returns()?;
    let holdings = state.holdings()?;
    let valuation = state.valuation()?;
    debug!("Rendering returns {:?}", returns);

    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Metric"), ui::header_cell("Value")]);
    table.add_row(vec![
        Cell::new("Time-weighted return"),
        ui::change_cell(returns.twr),
    ]);
    table.add_row(vec![
        Cell::new("Money-weighted return"),
        ui::change_cell(returns.mwr),
    ]);
    table.add_row(vec![
        Cell::new(format!("Total invested ({base})")),
        ui::amount_cell(holdings.total_investment()),
    ]);
    table.add_row(vec![
        Cell::new(format!("Current value ({base})")),
        ui::amount_cell(valuation.total()),
    ]);

    let mut output = format!(
        "Portfolio returns as of {}\n\n",
        ui::style_text(&state.as_of().to_string(), ui::StyleType::Title)
    );
    output.push_str(&table.to_string());
    if let Some(notice) = degraded_notice(&valuation) {
        output.push_str(&format!("\n{notice}"));
    }
    Ok(output)
}

pub fn run(state: &PortfolioState) -> Result<()> {
    println!("{}", render(state)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::currency::{Currency, RateTable};
    use crate::core::ledger::tests::{date, tx};
    use crate::core::ledger::{AssetRegistry, Ledger, TransactionType};
    use crate::core::price::PriceTable;

    #[test]
    fn test_renders_both_returns() {
        let ledger = Ledger::from_transactions(
            AssetRegistry::new(["Moutai"]),
            vec![tx(1, "2024-01-01", TransactionType::Buy, "Moutai", 10.0, 100.0, Currency::Cny)],
        )
        .unwrap();
        let prices = PriceTable::new().with_price("Moutai", 150.0).unwrap();
        let state = PortfolioState::new(
            ledger,
            RateTable::new(Currency::Cny),
            prices,
            date("2025-01-01"),
        );

        let output = render(&state).unwrap();
        assert!(output.contains("50.00%"));
        assert!(output.contains("49.86%"));
        assert!(output.contains("Total invested (CNY)"));
        assert!(output.contains("1500.00"));
    }

    #[test]
    fn test_missing_rate_is_an_error() {
        let ledger = Ledger::from_transactions(
            AssetRegistry::new(["Xiaomi"]),
            vec![tx(1, "2024-01-01", TransactionType::Buy, "Xiaomi", 10.0, 20.0, Currency::Hkd)],
        )
        .unwrap();
        let state = PortfolioState::new(
            ledger,
            RateTable::new(Currency::Cny),
            PriceTable::new(),
            date("2025-01-01"),
        );

        let err = render(&state).unwrap_err();
        assert!(err.to_string().contains("HKD"));
    }
}
