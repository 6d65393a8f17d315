use chrono::{SecondsFormat, TimeZone, Utc};
use std::fs;
use std::io::Write;
use std::path::Path;
use vela_domain::value_objects::portfolio_point::PortfolioPoint;
use vela_domain::value_objects::round_trip::RoundTrip;

pub fn format_timestamp(timestamp: i64) -> String {
    Utc.timestamp_opt(timestamp, 0)
        .single()
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| timestamp.to_string())
}

pub fn write_equity_csv(path: &Path, points: &[PortfolioPoint]) -> Result<(), String> {
    let mut wtr = csv::Writer::from_path(path)
        .map_err(|err| format!("failed to create equity csv {}: {}", path.display(), err))?;
    wtr.write_record([
        "timestamp_utc",
        "close",
        "position_delta",
        "net_position",
        "cash",
        "holdings_value",
        "total_equity",
        "returns",
    ])
    .map_err(|err| format!("failed to write equity csv header: {}", err))?;

    for point in points {
        wtr.write_record([
            format_timestamp(point.timestamp),
            point.close.to_string(),
            point.position_delta.to_string(),
            point.net_position.to_string(),
            point.cash.to_string(),
            point.holdings_value.to_string(),
            point.total_equity.to_string(),
            point.returns.to_string(),
        ])
        .map_err(|err| format!("failed to write equity row: {}", err))?;
    }

    wtr.flush()
        .map_err(|err| format!("failed to flush equity csv: {}", err))
}

pub fn write_trades_csv(path: &Path, trips: &[RoundTrip]) -> Result<(), String> {
    let mut wtr = csv::Writer::from_path(path)
        .map_err(|err| format!("failed to create trades csv {}: {}", path.display(), err))?;
    wtr.write_record([
        "entry_utc",
        "exit_utc",
        "entry_price",
        "exit_price",
        "quantity",
        "pnl",
    ])
    .map_err(|err| format!("failed to write trades csv header: {}", err))?;

    for trip in trips {
        wtr.write_record([
            format_timestamp(trip.entry_timestamp),
            format_timestamp(trip.exit_timestamp),
            trip.entry_price.to_string(),
            trip.exit_price.to_string(),
            trip.quantity.to_string(),
            trip.pnl.to_string(),
        ])
        .map_err(|err| format!("failed to write trades row: {}", err))?;
    }

    wtr.flush()
        .map_err(|err| format!("failed to flush trades csv: {}", err))
}

pub fn write_summary_json(path: &Path, summary: &serde_json::Value) -> Result<(), String> {
    let json = serde_json::to_string_pretty(summary)
        .map_err(|err| format!("failed to serialize summary: {}", err))?;
    let mut file =
        fs::File::create(path).map_err(|err| format!("failed to create summary: {}", err))?;
    file.write_all(json.as_bytes())
        .map_err(|err| format!("failed to write summary: {}", err))
}

#[cfg(test)]
mod tests {
    use super::{format_timestamp, write_equity_csv, write_summary_json, write_trades_csv};
    use std::fs;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};
    use vela_domain::value_objects::portfolio_point::PortfolioPoint;
    use vela_domain::value_objects::round_trip::RoundTrip;

    fn unique_tmp_dir(prefix: &str) -> PathBuf {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        std::env::temp_dir().join(format!("vela_{prefix}_{}_{}", std::process::id(), now))
    }

    #[test]
    fn timestamps_render_as_utc() {
        assert_eq!(format_timestamp(1_704_153_600), "2024-01-02T00:00:00Z");
    }

    #[test]
    fn writes_report_files() {
        let dir = unique_tmp_dir("report_test");
        fs::create_dir_all(&dir).expect("dir");

        let points = vec![PortfolioPoint {
            timestamp: 1_704_153_600,
            close: 100.0,
            position_delta: 1.0,
            net_position: 1.0,
            cash: 900.0,
            holdings_value: 100.0,
            total_equity: 1000.0,
            returns: 0.0,
        }];
        let trips = vec![RoundTrip {
            entry_timestamp: 1_704_153_600,
            exit_timestamp: 1_704_240_000,
            entry_price: 100.0,
            exit_price: 110.0,
            quantity: 1.0,
            pnl: 10.0,
        }];

        write_equity_csv(dir.join("equity.csv").as_path(), &points).expect("equity");
        write_trades_csv(dir.join("trades.csv").as_path(), &trips).expect("trades");
        write_summary_json(
            dir.join("summary.json").as_path(),
            &serde_json::json!({"run_id": "r1"}),
        )
        .expect("summary");

        let equity = fs::read_to_string(dir.join("equity.csv")).expect("read equity");
        let mut lines = equity.lines();
        assert_eq!(
            lines.next(),
            Some("timestamp_utc,close,position_delta,net_position,cash,holdings_value,total_equity,returns")
        );
        assert_eq!(
            lines.next(),
            Some("2024-01-02T00:00:00Z,100,1,1,900,100,1000,0")
        );

        let trades = fs::read_to_string(dir.join("trades.csv")).expect("read trades");
        assert!(trades.contains("2024-01-03T00:00:00Z,100,110,1,10"));

        let summary: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(dir.join("summary.json")).expect("read summary"),
        )
        .expect("parse summary");
        assert_eq!(summary["run_id"], "r1");
    }
}
