use crate::config::Config;
use crate::shared::load_bars;
use tracing::info_span;
use vela_domain::repositories::market_data::MarketDataRepository;
use vela_domain::services::ohlcv::{data_quality_from_bars, DataQualityReport};
use vela_domain::services::stats::SECONDS_PER_DAY;

/// Daily bars skip weekends and single holidays; anything longer is a gap.
pub const DAILY_GAP_TOLERANCE_SECONDS: i64 = 4 * SECONDS_PER_DAY;

pub fn validate(
    config: &Config,
    strict: bool,
    market_data: &dyn MarketDataRepository,
) -> Result<serde_json::Value, String> {
    let _span = info_span!(
        "validate",
        strict = strict,
        run_id = %config.run.run_id,
        symbol = %config.run.symbol
    )
    .entered();

    config.validate()?;

    let bars = load_bars(config, market_data, "vela.validate")?;
    let report = data_quality_from_bars(&bars, Some(DAILY_GAP_TOLERANCE_SECONDS));

    metrics::gauge!("vela.validate.ohlcv.rows").set(report.rows as f64);
    metrics::gauge!("vela.validate.ohlcv.gaps").set(report.gaps as f64);
    metrics::gauge!("vela.validate.ohlcv.duplicates").set(report.duplicates as f64);
    metrics::gauge!("vela.validate.ohlcv.out_of_order").set(report.out_of_order as f64);
    metrics::gauge!("vela.validate.ohlcv.invalid_close").set(report.invalid_close as f64);

    if strict {
        if report.rows == 0 {
            return Err(format!(
                "strict validation failed: no data for {}",
                config.run.symbol
            ));
        }
        if !report.is_clean() {
            return Err(format!(
                "strict validation failed: {} duplicate, {} out-of-order, {} invalid-close rows",
                report.duplicates, report.out_of_order, report.invalid_close
            ));
        }
    }

    if !report.is_clean() {
        tracing::warn!(
            duplicates = report.duplicates,
            out_of_order = report.out_of_order,
            invalid_close = report.invalid_close,
            "bars would be rejected by the simulator"
        );
    }

    Ok(serde_json::json!({
        "run_id": config.run.run_id,
        "symbol": config.run.symbol,
        "strategy": config.strategy.name(),
        "ohlcv": data_quality_json(&report),
        "simulatable": report.rows > 0 && report.is_clean(),
    }))
}

fn data_quality_json(report: &DataQualityReport) -> serde_json::Value {
    serde_json::json!({
        "rows": report.rows,
        "first_timestamp": report.first_timestamp,
        "last_timestamp": report.last_timestamp,
        "duplicates": report.duplicates,
        "first_duplicate": report.first_duplicate,
        "out_of_order": report.out_of_order,
        "first_out_of_order": report.first_out_of_order,
        "invalid_close": report.invalid_close,
        "first_invalid_close": report.first_invalid_close,
        "gaps": report.gaps,
        "max_gap_seconds": report.max_gap_seconds,
    })
}
