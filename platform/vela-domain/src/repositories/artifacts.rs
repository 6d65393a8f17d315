use crate::value_objects::portfolio_point::PortfolioPoint;
use crate::value_objects::round_trip::RoundTrip;
use std::path::Path;

pub trait ArtifactWriter {
    fn ensure_dir(&self, path: &Path) -> Result<(), String>;
    fn write_equity_csv(&self, path: &Path, points: &[PortfolioPoint]) -> Result<(), String>;
    fn write_trades_csv(&self, path: &Path, trips: &[RoundTrip]) -> Result<(), String>;
    fn write_summary_json(&self, path: &Path, summary: &serde_json::Value) -> Result<(), String>;
    fn write_config_snapshot_toml(&self, path: &Path, contents: &str) -> Result<(), String>;
}
