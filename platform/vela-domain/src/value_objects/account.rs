use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub id: String,
    pub active: bool,
    pub cash: f64,
    pub buying_power: f64,
    pub portfolio_value: f64,
}
