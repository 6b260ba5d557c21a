use super::ui;
use crate::core::state::PortfolioState;
use crate::core::valuation::Valuation;
use anyhow::Result;
use comfy_table::Cell;

/// One warning line per asset that was valued at zero for lack of a price.
pub fn degraded_notice(valuation: &Valuation) -> Option<String> {
    if !valuation.is_degraded() {
        return None;
    }
    let text = format!(
        "Warning: no price for {}; valued at zero",
        valuation.missing_prices.join(", ")
    );
    Some(ui::style_text(&text, ui::StyleType::Warning))
}

pub fn render(state: &PortfolioState) -> Result<String> {
    let base = state.rates().base();
    let valuation = state.valuation()?;

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Asset"),
        ui::header_cell("Shares"),
        ui::header_cell("Price"),
        ui::header_cell(&format!("Cost ({base})")),
        ui::header_cell(&format!("Value ({base})")),
        ui::header_cell("Gain"),
    ]);

    for line in &valuation.lines {
        let currency = line.currency;
        table.add_row(vec![
            Cell::new(line.asset.id()),
            ui::amount_cell(line.shares),
            ui::format_optional_cell(line.price, |p| format!("{p:.2} {currency}")),
            ui::amount_cell(line.cost),
            ui::amount_cell(line.value),
            ui::gain_cell(line.gain()),
        ]);
    }
    table.add_row(vec![
        Cell::new("Cash"),
        Cell::new(""),
        Cell::new(""),
        Cell::new(""),
        ui::amount_cell(valuation.cash_value),
        Cell::new(""),
    ]);

    let mut output = format!(
        "Holdings as of {}\n\n",
        ui::style_text(&state.as_of().to_string(), ui::StyleType::Title)
    );
    output.push_str(&table.to_string());
    output.push_str(&format!(
        "\n\nTotal Value ({}): {}",
        ui::style_text(base.code(), ui::StyleType::TotalLabel),
        ui::style_text(&format!("{:.2}", valuation.total()), ui::StyleType::TotalValue)
    ));
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

    fn state(prices: PriceTable) -> PortfolioState {
        let ledger = Ledger::from_transactions(
            AssetRegistry::new(["Moutai", "Xiaomi"]),
            vec![
                tx(1, "2024-01-15", TransactionType::Buy, "Moutai", 10.0, 1650.0, Currency::Cny),
                tx(2, "2024-03-20", TransactionType::Buy, "Xiaomi", 1000.0, 18.5, Currency::Hkd),
            ],
        )
        .unwrap();
        let rates = RateTable::new(Currency::Cny).with_rate(Currency::Hkd, 0.9).unwrap();
        PortfolioState::new(ledger, rates, prices, date("2025-01-01"))
    }

    #[test]
    fn test_renders_each_position() {
        let prices = PriceTable::new()
            .with_price("Moutai", 1580.0)
            .and_then(|t| t.with_price("Xiaomi", 20.0))
            .unwrap();
        let output = render(&state(prices)).unwrap();
        assert!(output.contains("Moutai"));
        assert!(output.contains("Xiaomi"));
        assert!(output.contains("15800.00"));
        assert!(output.contains("18000.00"));
        assert!(output.contains("33800.00"));
        assert!(!output.contains("Warning"));
    }

    #[test]
    fn test_missing_price_is_flagged() {
        let prices = PriceTable::new().with_price("Moutai", 1580.0).unwrap();
        let output = render(&state(prices)).unwrap();
        assert!(output.contains("N/A"));
        assert!(output.contains("Warning: no price for Xiaomi"));
    }
}
