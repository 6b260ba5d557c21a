use super::ui;
use crate::core::ledger::Ledger;
use comfy_table::Cell;

/// Lists the ledger in date order.
pub fn render(ledger: &Ledger) -> String {
    if ledger.is_empty() {
        return ui::style_text("No transactions recorded", ui::StyleType::Subtle);
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("ID"),
        ui::header_cell("Date"),
        ui::header_cell("Type"),
        ui::header_cell("Asset"),
        ui::header_cell("Shares"),
        ui::header_cell("Price"),
        ui::header_cell("Currency"),
        ui::header_cell("Amount"),
    ]);

    for tx in ledger.sorted_by_date() {
        let shares = if tx.kind.is_cash_flow() {
            Cell::new("")
        } else {
            ui::amount_cell(tx.shares)
        };
        let amount = if tx.kind.is_cash_flow() {
            tx.price
        } else {
            tx.gross()
        };
        table.add_row(vec![
            Cell::new(tx.id),
            Cell::new(tx.date),
            Cell::new(tx.kind),
            Cell::new(&tx.asset),
            shares,
            ui::amount_cell(tx.price),
            Cell::new(tx.currency),
            ui::amount_cell(amount),
        ]);
    }

    format!(
        "{}\n\n{}",
        ui::style_text(&format!("{} transactions", ledger.len()), ui::StyleType::Title),
        table
    )
}

pub fn run(ledger: &Ledger) {
    println!("{}", render(ledger));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::currency::Currency;
    use crate::core::ledger::tests::tx;
    use crate::core::ledger::{AssetRegistry, TransactionType};

    #[test]
    fn test_lists_rows_in_date_order() {
        let ledger = Ledger::from_transactions(
            AssetRegistry::new(["Moutai"]),
            vec![
                tx(2, "2024-06-10", TransactionType::Subscribe, "Cash", 0.0, 50000.0, Currency::Cny),
                tx(1, "2024-01-15", TransactionType::Buy, "Moutai", 10.0, 1650.0, Currency::Cny),
            ],
        )
        .unwrap();

        let output = render(&ledger);
        let buy = output.find("2024-01-15").unwrap();
        let subscribe = output.find("2024-06-10").unwrap();
        assert!(buy < subscribe);
        assert!(output.contains("16500.00"));
        assert!(output.contains("50000.00"));
        assert!(output.contains("Subscribe"));
    }

    #[test]
    fn test_empty_ledger() {
        let ledger = Ledger::new(AssetRegistry::default());
        assert!(render(&ledger).contains("No transactions recorded"));
    }
}
