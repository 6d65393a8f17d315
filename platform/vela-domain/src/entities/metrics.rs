//! Return- and trade-level statistics of a completed simulation.

use crate::services::simulator::EquityCurve;
use crate::services::stats;
use crate::value_objects::round_trip::RoundTrip;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A metric whose denominator vanished. The bundle still carries a value for
/// it (the sentinel listed here) so callers never see `NaN`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegenerateMetric {
    /// Annualized return is `0` (first and last timestamps within one day).
    ZeroElapsedDays,
    /// Sharpe ratio is `0`; it is not a measured ratio.
    ZeroVolatility,
    /// Sortino ratio is `+inf` (fewer than two losing periods).
    ZeroDownsideDeviation,
    /// Win rate and profit factor are `0`.
    NoTrades,
    /// Profit factor is `+inf` or `0` with no losing trades.
    NoLosingTrades,
}

impl fmt::Display for DegenerateMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DegenerateMetric::ZeroElapsedDays => {
                "elapsed time under one day; annualized return is 0"
            }
            DegenerateMetric::ZeroVolatility => "zero volatility; sharpe ratio is 0",
            DegenerateMetric::ZeroDownsideDeviation => {
                "fewer than two losing periods; sortino ratio is unbounded"
            }
            DegenerateMetric::NoTrades => "no closed trades",
            DegenerateMetric::NoLosingTrades => "no losing trades",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricKey {
    TotalReturn,
    AnnualizedReturn,
    SharpeRatio,
    SortinoRatio,
    MaxDrawdown,
    ProfitFactor,
    TotalTrades,
    WinRate,
}

impl MetricKey {
    /// Stable presentation order.
    pub const ALL: [MetricKey; 8] = [
        MetricKey::TotalReturn,
        MetricKey::AnnualizedReturn,
        MetricKey::SharpeRatio,
        MetricKey::SortinoRatio,
        MetricKey::MaxDrawdown,
        MetricKey::ProfitFactor,
        MetricKey::TotalTrades,
        MetricKey::WinRate,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            MetricKey::TotalReturn => "Total Return",
            MetricKey::AnnualizedReturn => "Annualized Return",
            MetricKey::SharpeRatio => "Sharpe Ratio",
            MetricKey::SortinoRatio => "Sortino Ratio",
            MetricKey::MaxDrawdown => "Max Drawdown",
            MetricKey::ProfitFactor => "Profit Factor",
            MetricKey::TotalTrades => "Total Trades",
            MetricKey::WinRate => "Win Rate",
        }
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Immutable once computed. Fractions (`total_return`, `annualized_return`,
/// `max_drawdown`) are stored as fractions; `win_rate` is already a
/// percentage in `0..=100`.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsBundle {
    total_return: f64,
    annualized_return: f64,
    annualized_volatility: f64,
    sharpe_ratio: f64,
    downside_deviation: f64,
    sortino_ratio: f64,
    max_drawdown: f64,
    gross_profit: f64,
    gross_loss: f64,
    profit_factor: f64,
    total_trades: usize,
    winning_trades: usize,
    win_rate: f64,
    elapsed_days: i64,
    degenerate: Vec<DegenerateMetric>,
}

impl MetricsBundle {
    pub fn from_parts(curve: &EquityCurve, trips: &[RoundTrip]) -> Self {
        let mut degenerate = Vec::new();
        let initial_capital = curve.initial_capital();
        let returns = curve.returns();

        let total_return = curve
            .last()
            .map(|p| p.total_equity / initial_capital - 1.0)
            .unwrap_or(0.0);

        let elapsed_days = match (curve.first(), curve.last()) {
            (Some(first), Some(last)) => stats::elapsed_days(first.timestamp, last.timestamp),
            _ => 0,
        };
        let annualized_return = match stats::annualized_return(total_return, elapsed_days) {
            Some(value) => value,
            None => {
                degenerate.push(DegenerateMetric::ZeroElapsedDays);
                0.0
            }
        };

        let annualized_volatility = stats::annualized_volatility(&returns);
        let sharpe_ratio = if annualized_volatility == 0.0 {
            degenerate.push(DegenerateMetric::ZeroVolatility);
            0.0
        } else {
            annualized_return / annualized_volatility
        };

        let downside_deviation = stats::downside_deviation(&returns);
        let sortino_ratio = if downside_deviation == 0.0 {
            degenerate.push(DegenerateMetric::ZeroDownsideDeviation);
            f64::INFINITY
        } else {
            annualized_return / downside_deviation
        };

        let max_drawdown = stats::max_drawdown(&returns);

        let total_trades = trips.len();
        let winning_trades = trips.iter().filter(|t| t.is_win()).count();
        let gross_profit: f64 = trips.iter().filter(|t| t.is_win()).map(|t| t.pnl).sum();
        let gross_loss: f64 = trips.iter().filter(|t| t.is_loss()).map(|t| t.pnl).sum();

        let win_rate = if total_trades == 0 {
            0.0
        } else {
            winning_trades as f64 / total_trades as f64 * 100.0
        };

        let profit_factor = if total_trades == 0 {
            degenerate.push(DegenerateMetric::NoTrades);
            0.0
        } else if gross_loss == 0.0 {
            degenerate.push(DegenerateMetric::NoLosingTrades);
            if gross_profit > 0.0 {
                f64::INFINITY
            } else {
                0.0
            }
        } else {
            gross_profit / gross_loss.abs()
        };

        Self {
            total_return,
            annualized_return,
            annualized_volatility,
            sharpe_ratio,
            downside_deviation,
            sortino_ratio,
            max_drawdown,
            gross_profit,
            gross_loss,
            profit_factor,
            total_trades,
            winning_trades,
            win_rate,
            elapsed_days,
            degenerate,
        }
    }

    pub fn total_return(&self) -> f64 {
        self.total_return
    }

    pub fn annualized_return(&self) -> f64 {
        self.annualized_return
    }

    pub fn annualized_volatility(&self) -> f64 {
        self.annualized_volatility
    }

    pub fn sharpe_ratio(&self) -> f64 {
        self.sharpe_ratio
    }

    pub fn downside_deviation(&self) -> f64 {
        self.downside_deviation
    }

    pub fn sortino_ratio(&self) -> f64 {
        self.sortino_ratio
    }

    pub fn max_drawdown(&self) -> f64 {
        self.max_drawdown
    }

    pub fn gross_profit(&self) -> f64 {
        self.gross_profit
    }

    pub fn gross_loss(&self) -> f64 {
        self.gross_loss
    }

    pub fn profit_factor(&self) -> f64 {
        self.profit_factor
    }

    pub fn total_trades(&self) -> usize {
        self.total_trades
    }

    pub fn winning_trades(&self) -> usize {
        self.winning_trades
    }

    pub fn win_rate(&self) -> f64 {
        self.win_rate
    }

    pub fn elapsed_days(&self) -> i64 {
        self.elapsed_days
    }

    pub fn degenerate(&self) -> &[DegenerateMetric] {
        &self.degenerate
    }

    pub fn is_degenerate(&self, metric: DegenerateMetric) -> bool {
        self.degenerate.contains(&metric)
    }

    pub fn formatted(&self, key: MetricKey) -> String {
        match key {
            MetricKey::TotalReturn => format_pct(self.total_return),
            MetricKey::AnnualizedReturn => format_pct(self.annualized_return),
            MetricKey::SharpeRatio => format_ratio(self.sharpe_ratio),
            MetricKey::SortinoRatio => format_ratio(self.sortino_ratio),
            MetricKey::MaxDrawdown => format_pct(self.max_drawdown),
            MetricKey::ProfitFactor => format_ratio(self.profit_factor),
            MetricKey::TotalTrades => self.total_trades.to_string(),
            MetricKey::WinRate => format!("{:.2}%", self.win_rate),
        }
    }

    /// Ordered `(label, formatted value)` pairs for presentation.
    pub fn display_rows(&self) -> Vec<(&'static str, String)> {
        MetricKey::ALL
            .iter()
            .map(|key| (key.label(), self.formatted(*key)))
            .collect()
    }

    /// JSON view; non-finite values become `null` under `raw`, the display
    /// strings keep the sentinel visible.
    pub fn to_json(&self) -> serde_json::Value {
        let display: serde_json::Map<String, serde_json::Value> = self
            .display_rows()
            .into_iter()
            .map(|(label, value)| (label.to_string(), serde_json::Value::String(value)))
            .collect();
        serde_json::json!({
            "display": display,
            "raw": {
                "total_return": finite_or_null(self.total_return),
                "annualized_return": finite_or_null(self.annualized_return),
                "annualized_volatility": finite_or_null(self.annualized_volatility),
                "sharpe_ratio": finite_or_null(self.sharpe_ratio),
                "downside_deviation": finite_or_null(self.downside_deviation),
                "sortino_ratio": finite_or_null(self.sortino_ratio),
                "max_drawdown": finite_or_null(self.max_drawdown),
                "gross_profit": finite_or_null(self.gross_profit),
                "gross_loss": finite_or_null(self.gross_loss),
                "profit_factor": finite_or_null(self.profit_factor),
                "total_trades": self.total_trades,
                "winning_trades": self.winning_trades,
                "win_rate": finite_or_null(self.win_rate),
                "elapsed_days": self.elapsed_days,
            },
            "degenerate": self.degenerate,
        })
    }
}

fn format_pct(fraction: f64) -> String {
    format!("{:.2}%", fraction * 100.0)
}

fn format_ratio(value: f64) -> String {
    format!("{value:.2}")
}

fn finite_or_null(value: f64) -> serde_json::Value {
    if value.is_finite() {
        serde_json::json!(value)
    } else {
        serde_json::Value::Null
    }
}
