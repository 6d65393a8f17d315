use crate::entities::metrics::MetricsBundle;
use crate::error::BacktestError;
use crate::services::round_trips::pair_round_trips;
use crate::services::simulator::{simulate, EquityCurve};
use crate::value_objects::decision::TradeDecision;
use crate::value_objects::portfolio_point::PortfolioPoint;
use crate::value_objects::round_trip::RoundTrip;
use crate::value_objects::signal::Signal;

/// Output of one run: the portfolio series for charting and the metrics
/// bundle derived from it. Never partially populated.
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    portfolio: EquityCurve,
    round_trips: Vec<RoundTrip>,
    metrics: MetricsBundle,
}

impl BacktestResult {
    pub fn portfolio(&self) -> &EquityCurve {
        &self.portfolio
    }

    pub fn points(&self) -> &[PortfolioPoint] {
        self.portfolio.points()
    }

    pub fn round_trips(&self) -> &[RoundTrip] {
        &self.round_trips
    }

    pub fn metrics(&self) -> &MetricsBundle {
        &self.metrics
    }

    pub fn final_point(&self) -> &PortfolioPoint {
        // A result only exists for a non-empty series.
        &self.portfolio.points()[self.portfolio.len() - 1]
    }

    /// What the last row asks for: buy, sell or hold.
    pub fn final_decision(&self) -> TradeDecision {
        TradeDecision::from_delta(self.final_point().position_delta)
    }

    /// The most recent row that actually changed the position.
    pub fn last_actionable_signal(&self) -> Option<&PortfolioPoint> {
        self.portfolio
            .points()
            .iter()
            .rev()
            .find(|p| p.position_delta != 0.0)
    }
}

/// Pure: `(signals, initial_capital) -> (portfolio, metrics)`.
pub fn run_backtest(
    signals: &[Signal],
    initial_capital: f64,
) -> Result<BacktestResult, BacktestError> {
    let portfolio = simulate(signals, initial_capital)?;
    let round_trips = pair_round_trips(signals);
    let metrics = MetricsBundle::from_parts(&portfolio, &round_trips);
    Ok(BacktestResult {
        portfolio,
        round_trips,
        metrics,
    })
}
