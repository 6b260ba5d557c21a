pub mod holdings;
pub mod returns;
pub mod setup;
pub mod transactions;
pub mod ui;
