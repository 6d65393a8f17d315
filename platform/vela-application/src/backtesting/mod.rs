use crate::config::Config;
use crate::shared::{config_hash, load_bars, simulate_bars};
use std::path::PathBuf;
use std::time::Instant;
use tracing::info_span;
use vela_domain::repositories::artifacts::ArtifactWriter;
use vela_domain::repositories::market_data::MarketDataRepository;
use vela_domain::services::backtest::BacktestResult;

#[derive(Debug, Clone)]
pub struct BacktestRun {
    pub run_dir: PathBuf,
    pub config_hash: String,
    pub result: BacktestResult,
}

pub fn run_backtest(
    config: &Config,
    config_toml: &str,
    out: Option<PathBuf>,
    market_data: &dyn MarketDataRepository,
    artifacts: &dyn ArtifactWriter,
) -> Result<BacktestRun, String> {
    let _span = info_span!(
        "run_backtest",
        run_id = %config.run.run_id,
        symbol = %config.run.symbol,
        strategy = %config.strategy.name()
    )
    .entered();

    config.validate()?;

    let bars = load_bars(config, market_data, "vela.backtest")?;
    tracing::info!(rows = bars.len(), "bars loaded");

    let stage_start = Instant::now();
    let result = simulate_bars(config, &bars, "vela.backtest")?;
    let engine_ms = stage_start.elapsed().as_millis() as f64;
    metrics::gauge!("vela.backtest.bars_processed").set(result.points().len() as f64);
    metrics::gauge!("vela.backtest.trades").set(result.metrics().total_trades() as f64);
    metrics::gauge!("vela.backtest.bars_per_sec").set(if engine_ms > 0.0 {
        (result.points().len() as f64) / (engine_ms / 1000.0)
    } else {
        0.0
    });

    let hash = config_hash(config_toml);
    let stage_start = Instant::now();
    let run_dir = write_outputs(config, config_toml, &hash, out, &result, artifacts)?;
    metrics::histogram!("vela.backtest.write_artifacts_ms")
        .record(stage_start.elapsed().as_millis() as f64);

    tracing::info!(
        run_dir = %run_dir.display(),
        total_return = result.metrics().total_return(),
        trades = result.metrics().total_trades(),
        decision = %result.final_decision(),
        "backtest complete"
    );

    Ok(BacktestRun {
        run_dir,
        config_hash: hash,
        result,
    })
}

pub fn summary_json(
    config: &Config,
    config_hash: &str,
    result: &BacktestResult,
) -> serde_json::Value {
    let first = result.points().first();
    let last = result.final_point();
    serde_json::json!({
        "meta": {
            "run_id": config.run.run_id,
            "symbol": config.run.symbol,
            "strategy": config.strategy.name(),
            "start": first.map(|p| p.timestamp),
            "end": last.timestamp,
            "bars": result.points().len(),
            "engine_version": env!("CARGO_PKG_VERSION"),
            "config_hash": config_hash,
        },
        "portfolio": {
            "initial_capital": result.portfolio().initial_capital(),
            "final_equity": last.total_equity,
            "final_cash": last.cash,
            "final_position": last.net_position,
            "min_cash": result.portfolio().min_cash(),
        },
        "final_decision": result.final_decision().to_string(),
        "last_actionable_timestamp": result.last_actionable_signal().map(|p| p.timestamp),
        "metrics": result.metrics().to_json(),
        "strategy_definition": config.strategy,
    })
}

fn write_outputs(
    config: &Config,
    config_toml: &str,
    config_hash: &str,
    out: Option<PathBuf>,
    result: &BacktestResult,
    artifacts: &dyn ArtifactWriter,
) -> Result<PathBuf, String> {
    let base_dir = out.unwrap_or_else(|| PathBuf::from(&config.paths.out_dir));
    let run_dir = base_dir.join(&config.run.run_id);
    artifacts.ensure_dir(&run_dir)?;

    artifacts.write_equity_csv(run_dir.join("equity.csv").as_path(), result.points())?;
    artifacts.write_trades_csv(run_dir.join("trades.csv").as_path(), result.round_trips())?;
    artifacts.write_summary_json(
        run_dir.join("summary.json").as_path(),
        &summary_json(config, config_hash, result),
    )?;
    artifacts
        .write_config_snapshot_toml(run_dir.join("config_snapshot.toml").as_path(), config_toml)?;

    Ok(run_dir)
}
