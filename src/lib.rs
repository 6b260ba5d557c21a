pub mod cli;
pub mod core;
pub mod providers;

use crate::core::config::AppConfig;
use crate::core::currency::{Currency, RateProvider};
use crate::core::error::ReturnsError;
use crate::core::ledger::{Asset, Ledger, Transaction, TransactionType};
use crate::core::market::{MarketSnapshot, RefreshReport, price_targets, refresh};
use crate::core::price::PriceProvider;
use crate::core::state::PortfolioState;
use crate::providers::exchange_rate::ExchangeRateApiProvider;
use crate::providers::yahoo_finance::YahooFinanceProvider;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Fields of a ledger row entered on the command line. The id is assigned
/// when the row is appended.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub date: NaiveDate,
    pub kind: TransactionType,
    pub asset: String,
    pub shares: f64,
    pub price: f64,
    pub currency: Currency,
}

/// Replacement fields for an existing row. `None` keeps the current value.
#[derive(Debug, Clone, Default)]
pub struct TransactionEdit {
    pub date: Option<NaiveDate>,
    pub kind: Option<TransactionType>,
    pub asset: Option<String>,
    pub shares: Option<f64>,
    pub price: Option<f64>,
    pub currency: Option<Currency>,
}

pub enum AppCommand {
    Returns,
    Holdings,
    Transactions,
    Add(NewTransaction),
    Edit(u64, TransactionEdit),
    Remove(u64),
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Skip fetching and use the seed tables from the configuration.
    pub offline: bool,
    /// Valuation date for the money-weighted return. Defaults to today.
    pub as_of: Option<NaiveDate>,
}

pub async fn run_command(
    command: AppCommand,
    config_path: Option<&str>,
    options: &RunOptions,
) -> Result<()> {
    info!("pfreturns starting...");
    let path = resolve_config_path(config_path)?;
    let config = AppConfig::load_from_path(&path)?;
    debug!("Loaded config: {config:#?}");

    match command {
        AppCommand::Returns => {
            let (state, report) = load_state(&config, options).await?;
            print_refresh_failures(&report);
            cli::returns::run(&state)
        }
        AppCommand::Holdings => {
            let (state, report) = load_state(&config, options).await?;
            print_refresh_failures(&report);
            cli::holdings::run(&state)
        }
        AppCommand::Transactions => {
            cli::transactions::run(&config.ledger()?);
            Ok(())
        }
        AppCommand::Add(new) => {
            let transaction = add_transaction(config, &path, new)?;
            println!("Added transaction {}", transaction.id);
            Ok(())
        }
        AppCommand::Edit(id, edit) => {
            let transaction = edit_transaction(config, &path, id, edit)?;
            println!(
                "Updated transaction {} ({} {} on {})",
                transaction.id, transaction.kind, transaction.asset, transaction.date
            );
            Ok(())
        }
        AppCommand::Remove(id) => {
            let transaction = remove_transaction(config, &path, id)?;
            println!(
                "Removed transaction {} ({} {} on {})",
                transaction.id, transaction.kind, transaction.asset, transaction.date
            );
            Ok(())
        }
    }
}

fn resolve_config_path(config_path: Option<&str>) -> Result<PathBuf> {
    match config_path {
        Some(path) => Ok(PathBuf::from(path)),
        None => AppConfig::default_config_path(),
    }
}

/// Builds the calculator state from the configuration, refreshing rates and
/// prices first unless running offline.
pub async fn load_state(
    config: &AppConfig,
    options: &RunOptions,
) -> Result<(PortfolioState, RefreshReport)> {
    let ledger = config.ledger()?;
    let seed = MarketSnapshot {
        rates: config.seed_rates()?,
        prices: config.seed_prices()?,
    };

    let (snapshot, report) = if options.offline {
        debug!("Offline run, using seed rates and prices");
        (seed, RefreshReport::default())
    } else {
        fetch_market_data(config, &ledger, &seed).await
    };

    let as_of = options
        .as_of
        .unwrap_or_else(|| chrono::Local::now().date_naive());
    let state = PortfolioState::new(ledger, snapshot.rates, snapshot.prices, as_of)
        .with_sell_policy(config.sell_policy);
    for currency in state.missing_rates() {
        warn!("No conversion rate for {currency}; returns cannot be computed");
    }
    Ok((state, report))
}

async fn fetch_market_data(
    config: &AppConfig,
    ledger: &Ledger,
    seed: &MarketSnapshot,
) -> (MarketSnapshot, RefreshReport) {
    let rate_provider = config
        .providers
        .exchange_rate
        .as_ref()
        .map(|p| ExchangeRateApiProvider::new(&p.base_url));
    let price_provider = config
        .providers
        .yahoo
        .as_ref()
        .map(|p| YahooFinanceProvider::new(&p.base_url));
    let targets = price_targets(ledger, seed.rates.base(), &config.symbols());

    let pb = cli::ui::new_progress_bar(targets.len() as u64, true);
    pb.set_message("Fetching prices...");
    let result = refresh(
        seed,
        rate_provider
            .as_ref()
            .map(|p| p as &(dyn RateProvider + Send + Sync)),
        price_provider
            .as_ref()
            .map(|p| p as &(dyn PriceProvider + Send + Sync)),
        &targets,
        &|| pb.inc(1),
    )
    .await;
    pb.finish_and_clear();
    result
}

fn print_refresh_failures(report: &RefreshReport) {
    for failure in &report.failures {
        let text = format!("Using last-known value after fetch failure: {failure}");
        eprintln!(
            "{}",
            cli::ui::style_text(&text, cli::ui::StyleType::Warning)
        );
    }
}

/// Appends a row to the configured ledger and writes the configuration back.
pub fn add_transaction(
    mut config: AppConfig,
    path: &std::path::Path,
    new: NewTransaction,
) -> Result<Transaction> {
    let mut ledger = config.ledger()?;
    let transaction = Transaction {
        id: ledger.next_id(),
        date: new.date,
        kind: new.kind,
        asset: Asset::from(new.asset),
        shares: new.shares,
        price: new.price,
        currency: new.currency,
    };
    ledger.add(transaction.clone()).with_context(|| {
        format!(
            "Failed to add transaction (known assets: {})",
            known_assets(&ledger)
        )
    })?;

    config.transactions = ledger.transactions().to_vec();
    config.save_to_path(path)?;
    info!("Added transaction {}", transaction.id);
    Ok(transaction)
}

/// Replaces the fields given in `edit` on row `id`, keeping its id and
/// position, and writes the configuration back.
pub fn edit_transaction(
    mut config: AppConfig,
    path: &std::path::Path,
    id: u64,
    edit: TransactionEdit,
) -> Result<Transaction> {
    let mut ledger = config.ledger()?;
    let current = ledger
        .get(id)
        .cloned()
        .ok_or(ReturnsError::TransactionNotFound(id))
        .context("Failed to edit transaction")?;
    let transaction = Transaction {
        id,
        date: edit.date.unwrap_or(current.date),
        kind: edit.kind.unwrap_or(current.kind),
        asset: edit.asset.map_or(current.asset, Asset::from),
        shares: edit.shares.unwrap_or(current.shares),
        price: edit.price.unwrap_or(current.price),
        currency: edit.currency.unwrap_or(current.currency),
    };
    ledger
        .update(id, transaction.clone())
        .with_context(|| {
            format!(
                "Failed to edit transaction (known assets: {})",
                known_assets(&ledger)
            )
        })?;

    config.transactions = ledger.transactions().to_vec();
    config.save_to_path(path)?;
    info!("Updated transaction {}", id);
    Ok(transaction)
}

fn known_assets(ledger: &Ledger) -> String {
    ledger.registry().ids().collect::<Vec<_>>().join(", ")
}

/// Removes a row by id and writes the configuration back.
pub fn remove_transaction(
    mut config: AppConfig,
    path: &std::path::Path,
    id: u64,
) -> Result<Transaction> {
    let mut ledger = config.ledger()?;
    let removed = ledger.remove(id).context("Failed to remove transaction")?;

    config.transactions = ledger.transactions().to_vec();
    config.save_to_path(path)?;
    info!("Removed transaction {}", removed.id);
    Ok(removed)
}
