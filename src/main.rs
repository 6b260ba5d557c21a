use anyhow::Result;
use chrono::NaiveDate;
use clap::{CommandFactory, Parser, Subcommand};
use pfreturns::core::currency::Currency;
use pfreturns::core::ledger::TransactionType;
use pfreturns::core::log::init_logging;
use pfreturns::{AppCommand, NewTransaction, RunOptions, TransactionEdit};

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    /// Use the seed rates and prices from the configuration
    #[arg(long, global = true)]
    offline: bool,

    /// Valuation date (YYYY-MM-DD), defaults to today
    #[arg(long, global = true)]
    as_of: Option<NaiveDate>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Display time-weighted and money-weighted returns
    Returns,
    /// Display per-asset holdings and their current value
    Holdings,
    /// List ledger transactions
    Transactions,
    /// Append a transaction to the ledger
    Add {
        #[arg(long)]
        date: NaiveDate,
        /// buy, sell, subscribe or redeem
        #[arg(long = "type")]
        kind: TransactionType,
        /// Asset id, or Cash for subscribe/redeem
        #[arg(long)]
        asset: String,
        #[arg(long, default_value_t = 0.0)]
        shares: f64,
        /// Unit price, or the amount for subscribe/redeem
        #[arg(long)]
        price: f64,
        #[arg(long)]
        currency: Currency,
    },
    /// Change fields of a transaction in place
    Edit {
        id: u64,
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long = "type")]
        kind: Option<TransactionType>,
        #[arg(long)]
        asset: Option<String>,
        #[arg(long)]
        shares: Option<f64>,
        #[arg(long)]
        price: Option<f64>,
        #[arg(long)]
        currency: Option<Currency>,
    },
    /// Remove a transaction by id
    Remove { id: u64 },
}

impl From<Commands> for AppCommand {
    fn from(cmd: Commands) -> AppCommand {
        match cmd {
            Commands::Returns => AppCommand::Returns,
            Commands::Holdings => AppCommand::Holdings,
            Commands::Transactions => AppCommand::Transactions,
            Commands::Add {
                date,
                kind,
                asset,
                shares,
                price,
                currency,
            } => AppCommand::Add(NewTransaction {
                date,
                kind,
                asset,
                shares,
                price,
                currency,
            }),
            Commands::Edit {
                id,
                date,
                kind,
                asset,
                shares,
                price,
                currency,
            } => AppCommand::Edit(
                id,
                TransactionEdit {
                    date,
                    kind,
                    asset,
                    shares,
                    price,
                    currency,
                },
            ),
            Commands::Remove { id } => AppCommand::Remove(id),
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let options = RunOptions {
        offline: cli.offline,
        as_of: cli.as_of,
    };
    let result = match cli.command {
        Some(Commands::Setup) => match cli.config_path.as_deref() {
            Some(path) => pfreturns::cli::setup::setup_at_path(path),
            None => pfreturns::cli::setup::setup(),
        },
        Some(cmd) => pfreturns::run_command(cmd.into(), cli.config_path.as_deref(), &options).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
