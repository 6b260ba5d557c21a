//! Errors raised by the return calculation engine.

use crate::core::currency::Currency;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReturnsError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReturnsError {
    #[error("No conversion rate for {0} in the rate table")]
    MissingRate(Currency),
    #[error("Invalid conversion rate for {currency}: {rate}")]
    InvalidRate { currency: Currency, rate: f64 },
    #[error("Invalid price for {asset}: {price}")]
    InvalidPrice { asset: String, price: f64 },
    #[error("Unknown asset: {0}")]
    UnknownAsset(String),
    #[error("Invalid transaction {id}: {reason}")]
    InvalidTransaction { id: u64, reason: String },
    #[error("Duplicate transaction id: {0}")]
    DuplicateTransactionId(u64),
    #[error("Transaction not found: {0}")]
    TransactionNotFound(u64),
    #[error("Insufficient shares of {asset} in transaction {id}: held {held}, sold {sold}")]
    InsufficientShares {
        id: u64,
        asset: String,
        held: f64,
        sold: f64,
    },
}
