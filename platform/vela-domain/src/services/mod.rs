pub mod backtest;
pub mod ohlcv;
pub mod round_trips;
pub mod signals;
pub mod simulator;
pub mod stats;
