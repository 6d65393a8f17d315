use serde::{Deserialize, Serialize};

/// A desired change in exposure, applied at `timestamp` using that bar's close.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub timestamp: i64,
    pub position_delta: f64,
    pub close: f64,
}

impl Signal {
    pub fn new(timestamp: i64, position_delta: f64, close: f64) -> Self {
        Self {
            timestamp,
            position_delta,
            close,
        }
    }

    /// `NaN` deltas mean "no trade that day".
    pub fn effective_delta(&self) -> f64 {
        if self.position_delta.is_nan() {
            0.0
        } else {
            self.position_delta
        }
    }
}
