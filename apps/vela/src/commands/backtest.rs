use std::path::PathBuf;

pub(super) fn run_backtest(config_path: PathBuf, out: Option<PathBuf>) -> Result<(), String> {
    let (config, config_toml) =
        vela_application::config::load_config_with_source(&config_path)?;
    super::common::print_config_summary("backtest", &config, out.as_ref());

    let overall_start = std::time::Instant::now();

    let crate::infra::EngineDeps {
        market_data,
        artifacts,
    } = crate::infra::build_engine_deps(&config)?;

    let run = vela_application::backtesting::run_backtest(
        &config,
        &config_toml,
        out,
        market_data.as_ref(),
        artifacts.as_ref(),
    )?;

    println!("metrics:");
    super::common::print_metrics(run.result.metrics());
    println!("final decision: {}", run.result.final_decision());
    println!("run output: {}", run.run_dir.display());
    println!(
        "vela cli: backtest total_ms={}",
        overall_start.elapsed().as_millis()
    );
    Ok(())
}
