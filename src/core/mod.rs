//! Core business logic: the return calculation engine and its inputs

pub mod config;
pub mod currency;
pub mod error;
pub mod holdings;
pub mod ledger;
pub mod log;
pub mod market;
pub mod price;
pub mod returns;
pub mod state;
pub mod valuation;

// Re-export main types for cleaner imports
pub use currency::{Currency, RateProvider, RateTable, to_base};
pub use error::ReturnsError;
pub use holdings::{Holding, Holdings, SellPolicy, aggregate};
pub use ledger::{Asset, AssetRegistry, Ledger, Transaction, TransactionType};
pub use price::{PriceProvider, PriceQuote, PriceTable};
pub use returns::{ReturnCalculator, Returns};
pub use state::PortfolioState;
pub use valuation::{Valuation, current_value};
