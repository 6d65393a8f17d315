use thiserror::Error;

/// Input-contract and data-integrity failures of a backtest run.
///
/// Arithmetic degeneracies (zero volatility, no trades, ...) are not errors;
/// see [`crate::entities::metrics::DegenerateMetric`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BacktestError {
    #[error("empty input: the signal series has no rows")]
    EmptyInput,

    #[error("invalid price at row {index} (ts={timestamp}): close={price}")]
    InvalidPrice {
        index: usize,
        timestamp: i64,
        price: f64,
    },

    #[error("invalid initial capital: {0} (must be positive and finite)")]
    InvalidCapital(f64),

    #[error("timestamps must be strictly increasing: row {index} (ts={timestamp})")]
    UnorderedTimestamps { index: usize, timestamp: i64 },

    #[error("non-finite position delta at row {index} (ts={timestamp})")]
    InvalidPositionDelta { index: usize, timestamp: i64 },

    #[error(
        "long-only violation at row {index} (ts={timestamp}): net position would be {net_position}"
    )]
    ShortPosition {
        index: usize,
        timestamp: i64,
        net_position: f64,
    },

    #[error("invalid strategy definition: {0}")]
    InvalidStrategy(String),
}

impl BacktestError {
    /// True when the run failed because there was nothing to simulate, as
    /// opposed to the data being present but malformed.
    pub fn is_no_data(&self) -> bool {
        matches!(self, BacktestError::EmptyInput)
    }
}
