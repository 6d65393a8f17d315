use chrono::{NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use vela_domain::services::signals::StrategyDefinition;
use vela_domain::services::simulator::DEFAULT_INITIAL_CAPITAL;
use vela_domain::services::stats::SECONDS_PER_DAY;
use vela_domain::value_objects::order::TimeInForce;

pub const BROKER_KEY_ENV: &str = "VELA_BROKER_KEY";
pub const BROKER_SECRET_ENV: &str = "VELA_BROKER_SECRET";

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub run: RunConfig,
    pub data: DataConfig,
    pub strategy: StrategyDefinition,
    pub paths: PathsConfig,
    pub paper: Option<PaperConfig>,
    pub broker: Option<BrokerConfig>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    pub run_id: String,
    pub symbol: String,
    #[serde(default = "default_initial_capital")]
    pub initial_capital: f64,
}

/// `start`/`end` are `YYYY-MM-DD`, both inclusive.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct DataConfig {
    pub path: String,
    pub start: Option<String>,
    pub end: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct PathsConfig {
    pub out_dir: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BrokerKind {
    #[default]
    Memory,
    Rest,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct PaperConfig {
    #[serde(default)]
    pub broker: BrokerKind,
    #[serde(default = "default_order_quantity")]
    pub quantity: f64,
    #[serde(default = "default_time_in_force")]
    pub time_in_force: TimeInForce,
    /// Starting cash of the in-memory broker.
    pub cash: Option<f64>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct BrokerConfig {
    pub base_url: Option<String>,
    pub key_id: Option<String>,
    pub secret_key: Option<String>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_retries")]
    pub retries: u32,
}

fn default_initial_capital() -> f64 {
    DEFAULT_INITIAL_CAPITAL
}

fn default_order_quantity() -> f64 {
    1.0
}

fn default_time_in_force() -> TimeInForce {
    TimeInForce::Gtc
}

fn default_timeout_ms() -> u64 {
    5_000
}

fn default_retries() -> u32 {
    2
}

impl DataConfig {
    /// Epoch-second bounds; `end` covers the whole final day.
    pub fn range(&self) -> Result<(Option<i64>, Option<i64>), String> {
        let start = self
            .start
            .as_deref()
            .map(|value| parse_date("data.start", value))
            .transpose()?;
        let end = self
            .end
            .as_deref()
            .map(|value| parse_date("data.end", value).map(|ts| ts + SECONDS_PER_DAY - 1))
            .transpose()?;
        if let (Some(start), Some(end)) = (start, end) {
            if start > end {
                return Err("data.start must not be after data.end".to_string());
            }
        }
        Ok((start, end))
    }
}

impl BrokerConfig {
    pub fn credentials(&self) -> Result<(String, String), String> {
        self.credentials_with(|name| std::env::var(name).ok())
    }

    /// Values in the file win; missing ones fall back to `lookup` (the
    /// environment in production).
    pub fn credentials_with(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(String, String), String> {
        let key = self
            .key_id
            .clone()
            .or_else(|| lookup(BROKER_KEY_ENV))
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| format!("broker.key_id is not set (or set {BROKER_KEY_ENV})"))?;
        let secret = self
            .secret_key
            .clone()
            .or_else(|| lookup(BROKER_SECRET_ENV))
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| format!("broker.secret_key is not set (or set {BROKER_SECRET_ENV})"))?;
        Ok((key, secret))
    }
}

impl Config {
    /// Checks that need more than the TOML shape.
    pub fn validate(&self) -> Result<(), String> {
        if self.run.run_id.trim().is_empty() {
            return Err("run.run_id must not be empty".to_string());
        }
        if self.run.symbol.trim().is_empty() {
            return Err("run.symbol must not be empty".to_string());
        }
        if !self.run.initial_capital.is_finite() || self.run.initial_capital <= 0.0 {
            return Err("run.initial_capital must be finite and > 0".to_string());
        }
        self.strategy
            .validate()
            .map_err(|err| format!("invalid [strategy]: {err}"))?;
        self.data.range()?;
        if let Some(paper) = &self.paper {
            if !paper.quantity.is_finite() || paper.quantity <= 0.0 {
                return Err("paper.quantity must be finite and > 0".to_string());
            }
        }
        Ok(())
    }

    pub fn paper_or_default(&self) -> PaperConfig {
        self.paper.clone().unwrap_or(PaperConfig {
            broker: BrokerKind::Memory,
            quantity: default_order_quantity(),
            time_in_force: default_time_in_force(),
            cash: None,
        })
    }
}

fn parse_date(field: &str, value: &str) -> Result<i64, String> {
    let date = NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|err| format!("{field} must be YYYY-MM-DD ({value}): {err}"))?;
    date.and_hms_opt(0, 0, 0)
        .map(|dt| Utc.from_utc_datetime(&dt).timestamp())
        .ok_or_else(|| format!("{field} is out of range: {value}"))
}

pub fn load_config(path: &Path) -> Result<Config, String> {
    let (config, _source) = load_config_with_source(path)?;
    Ok(config)
}

pub fn load_config_with_source(path: &Path) -> Result<(Config, String), String> {
    let contents = fs::read_to_string(path)
        .map_err(|err| format!("failed to read config {}: {}", path.display(), err))?;
    let config = parse_config(&contents)
        .map_err(|err| format!("failed to parse TOML {}: {}", path.display(), err))?;
    Ok((config, contents))
}

pub fn parse_config(contents: &str) -> Result<Config, String> {
    toml::from_str(contents).map_err(|err| err.to_string())
}

#[cfg(test)]
mod tests {
    use super::{parse_config, BrokerConfig, BrokerKind, Config};
    use vela_domain::services::signals::indicators::Indicator;
    use vela_domain::services::signals::{Operator, StrategyDefinition};

    const MINIMAL: &str = r#"
[run]
run_id = "aapl_sma"
symbol = "AAPL"

[data]
path = "data/sample_daily.csv"
start = "2024-01-02"
end = "2024-01-05"

[strategy]
kind = "moving_average_crossover"
short_window = 5
long_window = 20

[paths]
out_dir = "runs/"
"#;

    fn minimal() -> Config {
        parse_config(MINIMAL).expect("config should parse")
    }

    #[test]
    fn parse_minimal_config_applies_defaults() {
        let config = minimal();
        assert_eq!(config.run.initial_capital, 100_000.0);
        assert_eq!(
            config.strategy,
            StrategyDefinition::MovingAverageCrossover {
                short_window: 5,
                long_window: 20
            }
        );
        assert!(config.paper.is_none());
        assert_eq!(config.paper_or_default().broker, BrokerKind::Memory);
        assert_eq!(config.paper_or_default().quantity, 1.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parse_rule_strategy_with_inline_indicators() {
        let toml_str = MINIMAL.replace(
            "kind = \"moving_average_crossover\"\nshort_window = 5\nlong_window = 20",
            "kind = \"rule\"\nlhs = { name = \"close\" }\noperator = \"greater_than\"\nrhs = { name = \"sma\", length = 10 }",
        );
        let config = parse_config(&toml_str).expect("config should parse");
        match config.strategy {
            StrategyDefinition::Rule(rule) => {
                assert_eq!(rule.lhs, Indicator::Close);
                assert_eq!(rule.operator, Operator::GreaterThan);
                assert_eq!(rule.rhs, Indicator::Sma { length: 10 });
            }
            other => panic!("expected rule, got {other:?}"),
        }
    }

    #[test]
    fn parse_config_rejects_unknown_fields() {
        let toml_str = MINIMAL.replace("[paths]", "[paths]\nsentiment_path = \"x.csv\"");
        assert!(parse_config(&toml_str).is_err());
    }

    #[test]
    fn parse_config_rejects_malformed_toml() {
        let err = parse_config("[run\nrun_id = 1").expect_err("malformed");
        assert!(!err.is_empty());
    }

    #[test]
    fn data_range_is_inclusive_of_end_day() {
        let (start, end) = minimal().data.range().expect("range");
        assert_eq!(start, Some(1_704_153_600));
        assert_eq!(end, Some(1_704_412_800 + 86_399));
    }

    #[test]
    fn validate_rejects_bad_windows_and_reversed_dates() {
        let mut config = minimal();
        config.strategy = StrategyDefinition::MovingAverageCrossover {
            short_window: 20,
            long_window: 5,
        };
        assert!(config.validate().unwrap_err().contains("[strategy]"));

        let mut config = minimal();
        config.data.start = Some("2024-02-01".to_string());
        assert!(config.validate().is_err());

        let mut config = minimal();
        config.run.initial_capital = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn broker_credentials_fall_back_to_lookup() {
        let broker = BrokerConfig {
            base_url: None,
            key_id: None,
            secret_key: Some("from-file".to_string()),
            timeout_ms: 1_000,
            retries: 0,
        };
        let (key, secret) = broker
            .credentials_with(|name| (name == "VELA_BROKER_KEY").then(|| "from-env".to_string()))
            .expect("credentials");
        assert_eq!(key, "from-env");
        assert_eq!(secret, "from-file");

        let err = broker.credentials_with(|_| None).expect_err("missing key");
        assert!(err.contains("VELA_BROKER_KEY"));
    }
}
