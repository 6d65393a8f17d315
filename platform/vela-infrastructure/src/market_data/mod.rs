pub mod ohlcv;

pub use ohlcv::CsvMarketDataRepository;
