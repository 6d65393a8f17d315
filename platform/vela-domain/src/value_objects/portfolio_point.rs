use serde::{Deserialize, Serialize};

/// One row of the simulated portfolio; `total_equity == cash + holdings_value`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PortfolioPoint {
    pub timestamp: i64,
    pub close: f64,
    pub position_delta: f64,
    pub net_position: f64,
    pub cash: f64,
    pub holdings_value: f64,
    pub total_equity: f64,
    pub returns: f64,
}
