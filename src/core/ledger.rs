//! The transaction ledger and its ingestion rules.

use crate::core::currency::Currency;
use crate::core::error::{Result, ReturnsError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::Display;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    #[serde(alias = "Buy", alias = "买入")]
    Buy,
    #[serde(alias = "Sell", alias = "卖出")]
    Sell,
    #[serde(alias = "Subscribe", alias = "申购")]
    Subscribe,
    #[serde(alias = "Redeem", alias = "赎回")]
    Redeem,
}

impl TransactionType {
    /// Subscribe and Redeem move cash in and out of the portfolio without
    /// touching any asset's share count.
    pub fn is_cash_flow(&self) -> bool {
        matches!(self, TransactionType::Subscribe | TransactionType::Redeem)
    }
}

impl Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                TransactionType::Buy => "Buy",
                TransactionType::Sell => "Sell",
                TransactionType::Subscribe => "Subscribe",
                TransactionType::Redeem => "Redeem",
            }
        )
    }
}

impl FromStr for TransactionType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "buy" | "买入" => Ok(TransactionType::Buy),
            "sell" | "卖出" => Ok(TransactionType::Sell),
            "subscribe" | "申购" => Ok(TransactionType::Subscribe),
            "redeem" | "赎回" => Ok(TransactionType::Redeem),
            _ => Err(anyhow::anyhow!("Invalid transaction type: {}", s)),
        }
    }
}

pub const CASH: &str = "Cash";
const CASH_ALIAS: &str = "现金";

/// What a transaction refers to: the portfolio's cash or a named security.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Asset {
    Cash,
    Security(String),
}

impl Asset {
    pub fn id(&self) -> &str {
        match self {
            Asset::Cash => CASH,
            Asset::Security(id) => id,
        }
    }

    pub fn is_cash(&self) -> bool {
        matches!(self, Asset::Cash)
    }
}

impl From<&str> for Asset {
    fn from(s: &str) -> Self {
        match s.trim() {
            CASH | CASH_ALIAS => Asset::Cash,
            id => Asset::Security(id.to_string()),
        }
    }
}

impl From<String> for Asset {
    fn from(s: String) -> Self {
        Asset::from(s.as_str())
    }
}

impl From<Asset> for String {
    fn from(asset: Asset) -> Self {
        asset.id().to_string()
    }
}

impl Display for Asset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: u64,
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub asset: Asset,
    #[serde(default)]
    pub shares: f64,
    pub price: f64,
    pub currency: Currency,
}

impl Transaction {
    /// Native-currency value of the row: shares times unit price.
    pub fn gross(&self) -> f64 {
        self.shares * self.price
    }
}

/// The set of security ids a ledger may reference. `Cash` is always allowed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssetRegistry {
    ids: BTreeSet<String>,
}

impl AssetRegistry {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ids: ids.into_iter().map(|s| s.into().trim().to_string()).collect(),
        }
    }

    pub fn contains(&self, asset: &Asset) -> bool {
        match asset {
            Asset::Cash => true,
            Asset::Security(id) => self.ids.contains(id),
        }
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }
}

/// Insertion-ordered collection of validated transactions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ledger {
    registry: AssetRegistry,
    transactions: Vec<Transaction>,
}

impl Ledger {
    pub fn new(registry: AssetRegistry) -> Self {
        Self {
            registry,
            transactions: Vec::new(),
        }
    }

    pub fn from_transactions(
        registry: AssetRegistry,
        transactions: impl IntoIterator<Item = Transaction>,
    ) -> Result<Self> {
        let mut ledger = Self::new(registry);
        for transaction in transactions {
            ledger.add(transaction)?;
        }
        Ok(ledger)
    }

    pub fn add(&mut self, transaction: Transaction) -> Result<()> {
        self.validate(&transaction)?;
        if self.get(transaction.id).is_some() {
            return Err(ReturnsError::DuplicateTransactionId(transaction.id));
        }
        self.transactions.push(transaction);
        Ok(())
    }

    /// Replaces the transaction with `id` in place, keeping its position.
    pub fn update(&mut self, id: u64, transaction: Transaction) -> Result<()> {
        self.validate(&transaction)?;
        if transaction.id != id && self.get(transaction.id).is_some() {
            return Err(ReturnsError::DuplicateTransactionId(transaction.id));
        }
        let slot = self
            .transactions
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(ReturnsError::TransactionNotFound(id))?;
        *slot = transaction;
        Ok(())
    }

    pub fn remove(&mut self, id: u64) -> Result<Transaction> {
        let index = self
            .transactions
            .iter()
            .position(|t| t.id == id)
            .ok_or(ReturnsError::TransactionNotFound(id))?;
        Ok(self.transactions.remove(index))
    }

    pub fn get(&self, id: u64) -> Option<&Transaction> {
        self.transactions.iter().find(|t| t.id == id)
    }

    pub fn next_id(&self) -> u64 {
        self.transactions.iter().map(|t| t.id).max().map_or(1, |id| id + 1)
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn iter(&self) -> impl Iterator<Item = &Transaction> {
        self.transactions.iter()
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn registry(&self) -> &AssetRegistry {
        &self.registry
    }

    /// Transactions ordered by date. Rows on the same date keep their
    /// insertion order.
    pub fn sorted_by_date(&self) -> Vec<&Transaction> {
        let mut sorted: Vec<&Transaction> = self.transactions.iter().collect();
        sorted.sort_by_key(|t| t.date);
        sorted
    }

    /// Currency of the first transaction (insertion order) that references
    /// `asset`. Later rows in a different currency are not considered.
    pub fn first_currency_of(&self, asset: &Asset) -> Option<Currency> {
        self.transactions
            .iter()
            .find(|t| &t.asset == asset)
            .map(|t| t.currency)
    }

    pub fn currencies(&self) -> BTreeSet<Currency> {
        self.transactions.iter().map(|t| t.currency).collect()
    }

    fn validate(&self, transaction: &Transaction) -> Result<()> {
        let invalid = |reason: &str| ReturnsError::InvalidTransaction {
            id: transaction.id,
            reason: reason.to_string(),
        };

        if !transaction.shares.is_finite() || transaction.shares < 0.0 {
            return Err(invalid("shares must be a non-negative number"));
        }
        if !transaction.price.is_finite() || transaction.price < 0.0 {
            return Err(invalid("price must be a non-negative number"));
        }
        if !transaction.kind.is_cash_flow() && transaction.asset.is_cash() {
            return Err(invalid("cash cannot be bought or sold"));
        }
        if !self.registry.contains(&transaction.asset) {
            return Err(ReturnsError::UnknownAsset(
                transaction.asset.id().to_string(),
            ));
        }
        Ok(())
    }
}
