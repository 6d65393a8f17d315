use crate::config::Config;
use sha2::{Digest, Sha256};
use std::time::Instant;
use vela_domain::repositories::market_data::{BarQuery, MarketDataRepository};
use vela_domain::services::backtest::{run_backtest, BacktestResult};
use vela_domain::services::signals::generate_signals;
use vela_domain::value_objects::bar::Bar;
use vela_domain::BacktestError;

pub fn config_hash(contents: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(contents.as_bytes());
    let bytes = hasher.finalize();
    to_hex(&bytes[..])
}

fn to_hex(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push(HEX[(b >> 4) as usize] as char);
        out.push(HEX[(b & 0x0f) as usize] as char);
    }
    out
}

pub fn bar_query(config: &Config) -> Result<BarQuery, String> {
    let (start, end) = config.data.range()?;
    Ok(BarQuery {
        symbol: config.run.symbol.clone(),
        start,
        end,
    })
}

pub fn load_bars(
    config: &Config,
    market_data: &dyn MarketDataRepository,
    metric_prefix: &'static str,
) -> Result<Vec<Bar>, String> {
    let query = bar_query(config)?;
    let stage_start = Instant::now();
    let bars = market_data.load_bars(&query)?;
    metrics::histogram!(format!("{metric_prefix}.load_bars_ms"))
        .record(stage_start.elapsed().as_millis() as f64);
    Ok(bars)
}

pub fn no_data_message(config: &Config) -> String {
    format!(
        "no data for {} in [{} .. {}]: {}",
        config.run.symbol,
        config.data.start.as_deref().unwrap_or("-"),
        config.data.end.as_deref().unwrap_or("-"),
        BacktestError::EmptyInput
    )
}

/// Bars -> signals -> simulation -> metrics, with stage timings.
pub fn simulate_bars(
    config: &Config,
    bars: &[Bar],
    metric_prefix: &'static str,
) -> Result<BacktestResult, String> {
    if bars.is_empty() {
        return Err(no_data_message(config));
    }

    let stage_start = Instant::now();
    let signals = generate_signals(bars, &config.strategy)
        .map_err(|err| format!("failed to generate signals: {err}"))?;
    metrics::histogram!(format!("{metric_prefix}.signals_ms"))
        .record(stage_start.elapsed().as_millis() as f64);

    let stage_start = Instant::now();
    let result = run_backtest(&signals, config.run.initial_capital).map_err(|err| {
        if err.is_no_data() {
            no_data_message(config)
        } else {
            format!("simulation failed: {err}")
        }
    })?;
    metrics::histogram!(format!("{metric_prefix}.simulate_ms"))
        .record(stage_start.elapsed().as_millis() as f64);

    if result.portfolio().cash_went_negative() {
        tracing::warn!(
            min_cash = result.portfolio().min_cash(),
            "cash went negative; position sizes are not capped by capital"
        );
    }
    Ok(result)
}
