//! Replays a signal series into cash / holdings / equity under a fixed-capital,
//! single-asset, long-only policy.
//!
//! The simulation is expressed as cumulative sums over the (read-only) input,
//! so every row depends only on the signals up to and including it. The
//! input slice is never modified and a fresh [`EquityCurve`] is returned.

use crate::error::BacktestError;
use crate::services::stats::cumulative_sum;
use crate::value_objects::portfolio_point::PortfolioPoint;
use crate::value_objects::signal::Signal;

pub const DEFAULT_INITIAL_CAPITAL: f64 = 100_000.0;

/// Net positions within this distance of zero are considered flat.
pub const POSITION_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq)]
pub struct EquityCurve {
    initial_capital: f64,
    points: Vec<PortfolioPoint>,
}

impl EquityCurve {
    pub fn initial_capital(&self) -> f64 {
        self.initial_capital
    }

    pub fn points(&self) -> &[PortfolioPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&PortfolioPoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&PortfolioPoint> {
        self.points.last()
    }

    pub fn returns(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.returns).collect()
    }

    pub fn min_cash(&self) -> f64 {
        self.points
            .iter()
            .map(|p| p.cash)
            .fold(self.initial_capital, f64::min)
    }

    /// Position sizing is not capped by available capital, so cash can be
    /// overdrawn. Callers decide whether to surface that.
    pub fn cash_went_negative(&self) -> bool {
        self.min_cash() < 0.0
    }
}

pub fn simulate(signals: &[Signal], initial_capital: f64) -> Result<EquityCurve, BacktestError> {
    validate(signals, initial_capital)?;

    let deltas: Vec<f64> = signals.iter().map(Signal::effective_delta).collect();
    let net_positions = cumulative_sum(deltas.iter().copied());
    let traded_value = cumulative_sum(
        signals
            .iter()
            .zip(&deltas)
            .map(|(signal, delta)| delta * signal.close),
    );

    let mut points: Vec<PortfolioPoint> = Vec::with_capacity(signals.len());
    for (idx, signal) in signals.iter().enumerate() {
        let net_position = net_positions[idx];
        let holdings_value = net_position * signal.close;
        let cash = initial_capital - traded_value[idx];
        let total_equity = cash + holdings_value;
        let returns = match points.last() {
            Some(prev) => period_return(prev.total_equity, total_equity),
            None => 0.0,
        };

        points.push(PortfolioPoint {
            timestamp: signal.timestamp,
            close: signal.close,
            position_delta: deltas[idx],
            net_position,
            cash,
            holdings_value,
            total_equity,
            returns,
        });
    }

    Ok(EquityCurve {
        initial_capital,
        points,
    })
}

fn period_return(prev_equity: f64, equity: f64) -> f64 {
    if prev_equity == 0.0 {
        return 0.0;
    }
    equity / prev_equity - 1.0
}

/// Rejects the run on the first offending row, before any portfolio
/// arithmetic happens.
fn validate(signals: &[Signal], initial_capital: f64) -> Result<(), BacktestError> {
    if signals.is_empty() {
        return Err(BacktestError::EmptyInput);
    }
    if !initial_capital.is_finite() || initial_capital <= 0.0 {
        return Err(BacktestError::InvalidCapital(initial_capital));
    }

    let mut prev_ts: Option<i64> = None;
    let mut net_position = 0.0f64;
    for (index, signal) in signals.iter().enumerate() {
        if !signal.close.is_finite() || signal.close <= 0.0 {
            return Err(BacktestError::InvalidPrice {
                index,
                timestamp: signal.timestamp,
                price: signal.close,
            });
        }
        if let Some(prev) = prev_ts {
            if signal.timestamp <= prev {
                return Err(BacktestError::UnorderedTimestamps {
                    index,
                    timestamp: signal.timestamp,
                });
            }
        }
        prev_ts = Some(signal.timestamp);

        let delta = signal.effective_delta();
        if delta.is_infinite() {
            return Err(BacktestError::InvalidPositionDelta {
                index,
                timestamp: signal.timestamp,
            });
        }
        net_position += delta;
        if net_position < -POSITION_EPSILON {
            return Err(BacktestError::ShortPosition {
                index,
                timestamp: signal.timestamp,
                net_position,
            });
        }
    }

    Ok(())
}
