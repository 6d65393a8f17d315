//! Turns daily bars into a signal series.
//!
//! Strategies are a closed set resolved when the definition is built, so a
//! bad parameter fails before any bar is read.

pub mod indicators;

use crate::error::BacktestError;
use crate::value_objects::bar::Bar;
use crate::value_objects::signal::Signal;
use indicators::{Indicator, RollingSma};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    CrossesAbove,
    GreaterThan,
    LessThan,
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Operator::CrossesAbove => "crosses_above",
            Operator::GreaterThan => "greater_than",
            Operator::LessThan => "less_than",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryRule {
    pub lhs: Indicator,
    pub operator: Operator,
    pub rhs: Indicator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StrategyDefinition {
    MovingAverageCrossover {
        short_window: usize,
        long_window: usize,
    },
    Rule(EntryRule),
}

impl StrategyDefinition {
    pub fn validate(&self) -> Result<(), BacktestError> {
        match self {
            StrategyDefinition::MovingAverageCrossover {
                short_window,
                long_window,
            } => {
                if *short_window == 0 {
                    return Err(BacktestError::InvalidStrategy(
                        "short_window must be >= 1".to_string(),
                    ));
                }
                if long_window <= short_window {
                    return Err(BacktestError::InvalidStrategy(format!(
                        "long_window ({long_window}) must be greater than short_window ({short_window})"
                    )));
                }
                Ok(())
            }
            StrategyDefinition::Rule(rule) => {
                rule.lhs.validate()?;
                rule.rhs.validate()
            }
        }
    }

    pub fn name(&self) -> String {
        match self {
            StrategyDefinition::MovingAverageCrossover {
                short_window,
                long_window,
            } => format!("ma_crossover({short_window},{long_window})"),
            StrategyDefinition::Rule(rule) => {
                format!("{} {} {}", rule.lhs, rule.operator, rule.rhs)
            }
        }
    }

    /// Desired exposure per bar, `0.0` (flat) or `1.0` (long).
    pub fn target_positions(&self, closes: &[f64]) -> Result<Vec<f64>, BacktestError> {
        self.validate()?;
        Ok(match self {
            StrategyDefinition::MovingAverageCrossover {
                short_window,
                long_window,
            } => crossover_targets(closes, *short_window, *long_window),
            StrategyDefinition::Rule(rule) => rule_targets(closes, rule),
        })
    }
}

/// Emits one signal per bar, the delta being the change in target exposure
/// (the first bar never trades).
pub fn generate_signals(
    bars: &[Bar],
    strategy: &StrategyDefinition,
) -> Result<Vec<Signal>, BacktestError> {
    if bars.is_empty() {
        return Err(BacktestError::EmptyInput);
    }
    let closes: Vec<f64> = bars.iter().map(|bar| bar.close).collect();
    let targets = strategy.target_positions(&closes)?;

    let mut prev_target: Option<f64> = None;
    Ok(bars
        .iter()
        .zip(targets)
        .map(|(bar, target)| {
            let delta = prev_target.map_or(0.0, |prev| target - prev);
            prev_target = Some(target);
            Signal::new(bar.timestamp, delta, bar.close)
        })
        .collect())
}

fn crossover_targets(closes: &[f64], short_window: usize, long_window: usize) -> Vec<f64> {
    let mut short = RollingSma::new(short_window);
    let mut long = RollingSma::new(long_window);
    closes
        .iter()
        .enumerate()
        .map(|(idx, close)| {
            let short_mavg = short.update_partial(*close);
            let long_mavg = long.update_partial(*close);
            if idx >= short_window && short_mavg > long_mavg {
                1.0
            } else {
                0.0
            }
        })
        .collect()
}

fn rule_targets(closes: &[f64], rule: &EntryRule) -> Vec<f64> {
    let lhs = rule.lhs.series(closes);
    let rhs = rule.rhs.series(closes);

    let mut state = 0.0f64;
    let mut prev: Option<(f64, f64)> = None;
    let mut targets = Vec::with_capacity(closes.len());
    for (l, r) in lhs.into_iter().zip(rhs) {
        let (Some(l), Some(r)) = (l, r) else {
            prev = None;
            targets.push(state);
            continue;
        };
        state = match rule.operator {
            Operator::GreaterThan => bool_target(l > r),
            Operator::LessThan => bool_target(l < r),
            Operator::CrossesAbove => match prev {
                Some((pl, pr)) if pl <= pr && l > r => 1.0,
                _ if l < r => 0.0,
                _ => state,
            },
        };
        prev = Some((l, r));
        targets.push(state);
    }
    targets
}

fn bool_target(holds: bool) -> f64 {
    if holds {
        1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::indicators::Indicator;
    use super::{generate_signals, EntryRule, Operator, StrategyDefinition};
    use crate::error::BacktestError;
    use crate::value_objects::bar::Bar;

    fn bars(closes: &[f64]) -> Vec<Bar> {
        closes
            .iter()
            .enumerate()
            .map(|(idx, close)| Bar {
                symbol: "AAPL".to_string(),
                timestamp: idx as i64 * 86_400,
                open: *close,
                high: *close,
                low: *close,
                close: *close,
                volume: 1_000.0,
            })
            .collect()
    }

    #[test]
    fn crossover_enters_and_exits_once() {
        let closes = [10.0, 10.0, 10.0, 11.0, 12.0, 13.0, 9.0, 8.0, 7.0];
        let strategy = StrategyDefinition::MovingAverageCrossover {
            short_window: 2,
            long_window: 4,
        };
        let signals = generate_signals(&bars(&closes), &strategy).expect("signals");
        let deltas: Vec<f64> = signals.iter().map(|s| s.position_delta).collect();

        assert_eq!(deltas[0], 0.0);
        assert_eq!(deltas.iter().filter(|d| **d > 0.0).count(), 1);
        assert_eq!(deltas.iter().filter(|d| **d < 0.0).count(), 1);
        assert_eq!(deltas[3], 1.0);
        assert_eq!(deltas.iter().sum::<f64>(), 0.0);
    }

    #[test]
    fn crossover_first_trades_at_short_window() {
        let closes = [1.0, 2.0, 3.0, 4.0, 5.0];
        let strategy = StrategyDefinition::MovingAverageCrossover {
            short_window: 2,
            long_window: 4,
        };
        let signals = generate_signals(&bars(&closes), &strategy).expect("signals");
        let first_buy = signals.iter().position(|s| s.position_delta > 0.0);
        assert_eq!(first_buy, Some(2));
        assert_eq!(signals[2].close, 3.0);
    }

    #[test]
    fn rule_crosses_above_waits_for_fresh_cross() {
        let rule = StrategyDefinition::Rule(EntryRule {
            lhs: Indicator::Close,
            operator: Operator::CrossesAbove,
            rhs: Indicator::Sma { length: 2 },
        });
        // close is above its SMA on bar 1 already (no cross), falls below on
        // bar 3 and crosses back above on bar 4.
        let closes = [10.0, 12.0, 13.0, 9.0, 12.0];
        let signals = generate_signals(&bars(&closes), &rule).expect("signals");
        let deltas: Vec<f64> = signals.iter().map(|s| s.position_delta).collect();
        assert_eq!(deltas, vec![0.0, 0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn rule_greater_than_tracks_condition() {
        let rule = StrategyDefinition::Rule(EntryRule {
            lhs: Indicator::Close,
            operator: Operator::GreaterThan,
            rhs: Indicator::Sma { length: 2 },
        });
        let closes = [10.0, 12.0, 13.0, 9.0, 12.0];
        let signals = generate_signals(&bars(&closes), &rule).expect("signals");
        let deltas: Vec<f64> = signals.iter().map(|s| s.position_delta).collect();
        assert_eq!(deltas, vec![0.0, 1.0, 0.0, -1.0, 1.0]);
    }

    #[test]
    fn invalid_definitions_are_rejected() {
        let strategy = StrategyDefinition::MovingAverageCrossover {
            short_window: 5,
            long_window: 5,
        };
        assert!(matches!(
            generate_signals(&bars(&[1.0, 2.0]), &strategy),
            Err(BacktestError::InvalidStrategy(_))
        ));
        assert_eq!(
            generate_signals(&[], &strategy),
            Err(BacktestError::EmptyInput)
        );
    }

    #[test]
    fn definition_parses_from_tagged_toml_like_json() {
        let json = r#"{"kind":"rule","lhs":{"name":"sma","length":20},"operator":"crosses_above","rhs":{"name":"sma","length":50}}"#;
        let parsed: StrategyDefinition = serde_json::from_str(json).expect("parse");
        assert_eq!(parsed.name(), "sma(20) crosses_above sma(50)");
    }
}
