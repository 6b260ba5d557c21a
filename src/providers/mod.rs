pub mod exchange_rate;
pub mod util;
pub mod yahoo_finance;
