use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Instant;
use vela_domain::repositories::market_data::{BarQuery, MarketDataRepository};
use vela_domain::services::ohlcv::filter_range;
use vela_domain::value_objects::bar::Bar;

#[derive(Debug, Deserialize)]
pub struct OhlcvRecord {
    #[serde(alias = "date", alias = "Date", alias = "timestamp")]
    pub timestamp_utc: String,
    #[serde(default, alias = "Symbol")]
    pub symbol: Option<String>,
    #[serde(alias = "Open")]
    pub open: f64,
    #[serde(alias = "High")]
    pub high: f64,
    #[serde(alias = "Low")]
    pub low: f64,
    #[serde(alias = "Close")]
    pub close: f64,
    #[serde(alias = "Volume")]
    pub volume: f64,
}

/// Daily bars from a single CSV file. Rows are returned in file order; the
/// simulator and the validation use case decide what to do with bad rows.
#[derive(Debug, Clone)]
pub struct CsvMarketDataRepository {
    path: PathBuf,
}

impl CsvMarketDataRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MarketDataRepository for CsvMarketDataRepository {
    fn load_bars(&self, query: &BarQuery) -> Result<Vec<Bar>, String> {
        let start = Instant::now();
        let result = load_csv(&self.path, &query.symbol)
            .map(|bars| filter_range(bars, query.start, query.end));
        let result_label = if result.is_ok() { "ok" } else { "err" };
        metrics::histogram!("vela.infra.market_data.load_ms", "result" => result_label)
            .record(start.elapsed().as_millis() as f64);
        if let Ok(bars) = &result {
            tracing::debug!(
                path = %self.path.display(),
                symbol = %query.symbol,
                rows = bars.len(),
                "loaded bars"
            );
        }
        result
    }
}

/// Rows carrying a `symbol` column that names another instrument are skipped;
/// rows without one are attributed to `symbol`.
pub fn load_csv(path: &Path, symbol: &str) -> Result<Vec<Bar>, String> {
    let file = File::open(path)
        .map_err(|err| format!("failed to open OHLCV CSV {}: {}", path.display(), err))?;
    let mut reader = csv::Reader::from_reader(file);

    let mut bars = Vec::new();
    for result in reader.deserialize::<OhlcvRecord>() {
        let record = result.map_err(|err| format!("failed to parse CSV row: {}", err))?;
        if let Some(row_symbol) = record.symbol.as_deref() {
            if !row_symbol.eq_ignore_ascii_case(symbol) {
                continue;
            }
        }
        let timestamp = parse_timestamp(record.timestamp_utc.trim())?;
        bars.push(Bar {
            symbol: symbol.to_string(),
            timestamp,
            open: record.open,
            high: record.high,
            low: record.low,
            close: record.close,
            volume: record.volume,
        });
    }
    Ok(bars)
}

pub fn parse_timestamp(value: &str) -> Result<i64, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.timestamp());
    }
    if let Ok(dt) = DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%z") {
        return Ok(dt.timestamp());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Ok(Utc.from_utc_datetime(&naive).timestamp());
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(Utc.from_utc_datetime(&naive).timestamp());
        }
    }

    Err(format!("unsupported timestamp format: {}", value))
}
