use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

fn unique_tmp_dir(label: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let dir = std::env::temp_dir().join(format!("vela_cli_{label}_{}_{nanos}", std::process::id()));
    fs::create_dir_all(&dir).expect("create tmp dir");
    dir
}

const BARS: &str = "date,open,high,low,close,volume\n\
2024-01-02,10,10,10,10,100\n\
2024-01-03,10,10,10,10,100\n\
2024-01-04,10,10,10,10,100\n\
2024-01-05,11,11,11,11,100\n\
2024-01-08,12,12,12,12,100\n\
2024-01-09,13,13,13,13,100\n\
2024-01-10,9,9,9,9,100\n\
2024-01-11,8,8,8,8,100\n\
2024-01-12,7,7,7,7,100\n";

fn write_fixture(dir: &Path, bars: &str, range: &str) -> PathBuf {
    let csv_path = dir.join("bars.csv");
    fs::write(&csv_path, bars).expect("write bars");
    let config_path = dir.join("config.toml");
    let config = format!(
        "[run]\nrun_id = \"cli_run\"\nsymbol = \"AAPL\"\ninitial_capital = 1000.0\n\n\
[data]\npath = \"{}\"\n{range}\n\n\
[strategy]\nkind = \"moving_average_crossover\"\nshort_window = 2\nlong_window = 4\n\n\
[paths]\nout_dir = \"{}\"\n",
        csv_path.display(),
        dir.join("runs").display()
    );
    fs::write(&config_path, config).expect("write config");
    config_path
}

fn vela(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_vela"))
        .args(args)
        .env("VELA_LOG", "warn")
        .output()
        .expect("run vela")
}

#[test]
fn backtest_writes_run_directory() {
    let dir = unique_tmp_dir("backtest");
    let config = write_fixture(&dir, BARS, "");
    let output = vela(&["backtest", "--config", config.to_str().expect("utf8")]);
    assert!(output.status.success(), "{output:?}");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Total Trades"), "{stdout}");
    assert!(stdout.contains("final decision: hold"), "{stdout}");

    let run_dir = dir.join("runs").join("cli_run");
    for name in [
        "equity.csv",
        "trades.csv",
        "summary.json",
        "config_snapshot.toml",
    ] {
        assert!(run_dir.join(name).exists(), "missing {name}");
    }
    let equity = fs::read_to_string(run_dir.join("equity.csv")).expect("equity");
    assert_eq!(equity.lines().count(), 10);
    let summary: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(run_dir.join("summary.json")).expect("summary"))
            .expect("json");
    assert_eq!(summary["portfolio"]["final_equity"], 998.0);
}

#[test]
fn backtest_out_flag_overrides_out_dir() {
    let dir = unique_tmp_dir("backtest_out");
    let config = write_fixture(&dir, BARS, "");
    let out = dir.join("elsewhere");
    let output = vela(&[
        "backtest",
        "--config",
        config.to_str().expect("utf8"),
        "--out",
        out.to_str().expect("utf8"),
    ]);
    assert!(output.status.success(), "{output:?}");
    assert!(out.join("cli_run").join("summary.json").exists());
}

#[test]
fn empty_range_exits_with_no_data() {
    let dir = unique_tmp_dir("no_data");
    let config = write_fixture(&dir, BARS, "start = \"2030-01-01\"");
    let output = vela(&["backtest", "--config", config.to_str().expect("utf8")]);
    assert_eq!(output.status.code(), Some(3));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error: no data for AAPL"), "{stderr}");
}

#[test]
fn strict_validate_fails_on_duplicates() {
    let dir = unique_tmp_dir("validate");
    let bars = format!("{BARS}2024-01-12,7,7,7,7,100\n");
    let config = write_fixture(&dir, &bars, "");

    let lenient = vela(&["validate", "--config", config.to_str().expect("utf8")]);
    assert!(lenient.status.success(), "{lenient:?}");
    let report = String::from_utf8_lossy(&lenient.stdout);
    assert!(report.contains("\"duplicates\": 1"), "{report}");

    let strict = vela(&[
        "validate",
        "--config",
        config.to_str().expect("utf8"),
        "--strict",
    ]);
    assert_eq!(strict.status.code(), Some(2));
}

#[test]
fn paper_dry_run_against_memory_broker() {
    let dir = unique_tmp_dir("paper");
    let bars: String = BARS
        .lines()
        .take(5)
        .map(|line| format!("{line}\n"))
        .collect();
    let config = write_fixture(&dir, &bars, "");
    let output = vela(&[
        "paper",
        "--config",
        config.to_str().expect("utf8"),
        "--dry-run",
    ]);
    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("decision: buy"), "{stdout}");
    assert!(stdout.contains("order (dry run): buy 1 AAPL"), "{stdout}");
}

#[test]
fn unknown_config_keys_are_rejected() {
    let dir = unique_tmp_dir("bad_config");
    let config = write_fixture(&dir, BARS, "timeframe = \"1d\"");
    let output = vela(&["backtest", "--config", config.to_str().expect("utf8")]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn bundled_sample_configs_run() {
    let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("../..");
    let out = unique_tmp_dir("samples");
    for sample in ["configs/sample.toml", "configs/rule.toml"] {
        let output = Command::new(env!("CARGO_BIN_EXE_vela"))
            .current_dir(&root)
            .args(["backtest", "--config", sample, "--out"])
            .arg(&out)
            .env("VELA_LOG", "warn")
            .output()
            .expect("run vela");
        assert!(output.status.success(), "{sample}: {output:?}");
    }
    assert!(out.join("aapl_ma_5_20").join("summary.json").exists());
    assert!(out.join("aapl_close_above_sma").join("summary.json").exists());
}
