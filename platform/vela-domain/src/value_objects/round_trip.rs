use serde::{Deserialize, Serialize};

/// A closed flat-to-flat trade inferred from the signal series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoundTrip {
    pub entry_timestamp: i64,
    pub exit_timestamp: i64,
    pub entry_price: f64,
    pub exit_price: f64,
    pub quantity: f64,
    pub pnl: f64,
}

impl RoundTrip {
    pub fn is_win(&self) -> bool {
        self.pnl > 0.0
    }

    pub fn is_loss(&self) -> bool {
        self.pnl < 0.0
    }
}
