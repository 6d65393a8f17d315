use crate::reporting;
use std::fs;
use std::path::Path;
use std::time::Instant;
use vela_domain::repositories::artifacts::ArtifactWriter;
use vela_domain::value_objects::portfolio_point::PortfolioPoint;
use vela_domain::value_objects::round_trip::RoundTrip;

#[derive(Debug, Default, Clone, Copy)]
pub struct FilesystemArtifactWriter;

impl FilesystemArtifactWriter {
    pub fn new() -> Self {
        Self
    }
}

fn record_write_metrics(kind: &'static str, start: Instant, result: &Result<(), String>) {
    let result_label = if result.is_ok() { "ok" } else { "err" };
    metrics::counter!(
        "vela.infra.artifacts.write.calls_total",
        "kind" => kind,
        "result" => result_label
    )
    .increment(1);
    metrics::histogram!("vela.infra.artifacts.write_ms", "kind" => kind, "result" => result_label)
        .record(start.elapsed().as_millis() as f64);
}

impl ArtifactWriter for FilesystemArtifactWriter {
    fn ensure_dir(&self, path: &Path) -> Result<(), String> {
        let start = Instant::now();
        let result = fs::create_dir_all(path)
            .map_err(|err| format!("failed to create dir {}: {}", path.display(), err));
        record_write_metrics("ensure_dir", start, &result);
        result
    }

    fn write_equity_csv(&self, path: &Path, points: &[PortfolioPoint]) -> Result<(), String> {
        let start = Instant::now();
        let result = reporting::write_equity_csv(path, points);
        record_write_metrics("equity_csv", start, &result);
        result
    }

    fn write_trades_csv(&self, path: &Path, trips: &[RoundTrip]) -> Result<(), String> {
        let start = Instant::now();
        let result = reporting::write_trades_csv(path, trips);
        record_write_metrics("trades_csv", start, &result);
        result
    }

    fn write_summary_json(&self, path: &Path, summary: &serde_json::Value) -> Result<(), String> {
        let start = Instant::now();
        let result = reporting::write_summary_json(path, summary);
        record_write_metrics("summary_json", start, &result);
        result
    }

    fn write_config_snapshot_toml(&self, path: &Path, contents: &str) -> Result<(), String> {
        let start = Instant::now();
        let result = fs::write(path, contents).map_err(|err| {
            format!(
                "failed to write config snapshot {}: {}",
                path.display(),
                err
            )
        });
        record_write_metrics("config_snapshot", start, &result);
        result
    }
}
