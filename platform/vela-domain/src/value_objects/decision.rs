use crate::value_objects::side::Side;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeDecision {
    Buy,
    Sell,
    Hold,
}

impl TradeDecision {
    pub fn from_delta(delta: f64) -> Self {
        if delta > 0.0 {
            TradeDecision::Buy
        } else if delta < 0.0 {
            TradeDecision::Sell
        } else {
            TradeDecision::Hold
        }
    }

    pub fn side(&self) -> Option<Side> {
        match self {
            TradeDecision::Buy => Some(Side::Buy),
            TradeDecision::Sell => Some(Side::Sell),
            TradeDecision::Hold => None,
        }
    }
}

impl fmt::Display for TradeDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TradeDecision::Buy => "buy",
            TradeDecision::Sell => "sell",
            TradeDecision::Hold => "hold",
        };
        f.write_str(label)
    }
}
