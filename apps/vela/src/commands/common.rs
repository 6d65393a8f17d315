use std::path::PathBuf;
use vela_application::config::Config;
use vela_domain::entities::metrics::MetricsBundle;

pub(super) fn print_config_summary(command: &str, config: &Config, out: Option<&PathBuf>) {
    println!(
        "vela cli: {} (run_id={}, symbol={}, initial_capital={})",
        command, config.run.run_id, config.run.symbol, config.run.initial_capital
    );
    println!(
        "data: path={}, start={}, end={}, out_dir={}",
        config.data.path,
        config.data.start.as_deref().unwrap_or("-"),
        config.data.end.as_deref().unwrap_or("-"),
        config.paths.out_dir
    );
    println!("strategy: {}", config.strategy.name());
    if let Some(out_dir) = out {
        println!("output dir: {}", out_dir.display());
    }
}

pub(super) fn print_metrics(metrics: &MetricsBundle) {
    let rows = metrics.display_rows();
    let width = rows.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
    for (label, value) in rows {
        println!("  {label:<width$}  {value}");
    }
    for degenerate in metrics.degenerate() {
        println!("  note: {degenerate}");
    }
}
