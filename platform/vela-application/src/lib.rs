pub mod backtesting;
pub mod config;
pub mod paper_trading;
mod shared;
pub mod validation;
