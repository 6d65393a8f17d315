use crate::error::BacktestError;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum Indicator {
    Close,
    Sma { length: usize },
    Rsi { length: usize },
}

impl Indicator {
    pub fn validate(&self) -> Result<(), BacktestError> {
        match self {
            Indicator::Close => Ok(()),
            Indicator::Sma { length } | Indicator::Rsi { length } if *length == 0 => Err(
                BacktestError::InvalidStrategy(format!("{self} needs a length of at least 1")),
            ),
            Indicator::Sma { .. } | Indicator::Rsi { .. } => Ok(()),
        }
    }

    /// One value per close; `None` until the indicator has enough history.
    pub fn series(&self, closes: &[f64]) -> Vec<Option<f64>> {
        match self {
            Indicator::Close => closes.iter().map(|c| Some(*c)).collect(),
            Indicator::Sma { length } => {
                let mut sma = RollingSma::new(*length);
                closes.iter().map(|c| sma.update(*c)).collect()
            }
            Indicator::Rsi { length } => {
                let mut rsi = RollingRsi::new(*length);
                closes.iter().map(|c| rsi.update(*c)).collect()
            }
        }
    }
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Indicator::Close => f.write_str("close"),
            Indicator::Sma { length } => write!(f, "sma({length})"),
            Indicator::Rsi { length } => write!(f, "rsi({length})"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RollingSma {
    window: usize,
    buf: VecDeque<f64>,
    sum: f64,
}

impl RollingSma {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            buf: VecDeque::new(),
            sum: 0.0,
        }
    }

    fn push(&mut self, value: f64) {
        self.buf.push_back(value);
        self.sum += value;
        while self.buf.len() > self.window {
            if let Some(front) = self.buf.pop_front() {
                self.sum -= front;
            }
        }
    }

    /// Mean of the last `window` values, once the window is full.
    pub fn update(&mut self, value: f64) -> Option<f64> {
        if self.window == 0 {
            return None;
        }
        self.push(value);
        if self.buf.len() == self.window {
            Some(self.sum / self.window as f64)
        } else {
            None
        }
    }

    /// Mean of up to `window` values, available from the first one.
    pub fn update_partial(&mut self, value: f64) -> f64 {
        if self.window == 0 {
            return value;
        }
        self.push(value);
        self.sum / self.buf.len() as f64
    }
}

/// Wilder-style RSI over simple sums of close-to-close gains and losses.
#[derive(Debug, Clone)]
pub struct RollingRsi {
    window: usize,
    prev_close: Option<f64>,
    diffs: VecDeque<f64>,
    sum_gains: f64,
    sum_losses: f64,
}

impl RollingRsi {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            prev_close: None,
            diffs: VecDeque::new(),
            sum_gains: 0.0,
            sum_losses: 0.0,
        }
    }

    pub fn update(&mut self, close: f64) -> Option<f64> {
        let prev = self.prev_close.replace(close)?;
        if self.window == 0 || !prev.is_finite() || !close.is_finite() {
            return None;
        }

        let diff = close - prev;
        self.diffs.push_back(diff);
        if diff > 0.0 {
            self.sum_gains += diff;
        } else {
            self.sum_losses -= diff;
        }

        while self.diffs.len() > self.window {
            if let Some(front) = self.diffs.pop_front() {
                if front > 0.0 {
                    self.sum_gains -= front;
                } else {
                    self.sum_losses += front;
                }
            }
        }

        if self.diffs.len() < self.window {
            return None;
        }
        if self.sum_gains + self.sum_losses <= 0.0 {
            return Some(50.0);
        }
        if self.sum_losses <= 0.0 {
            return Some(100.0);
        }

        let rs = self.sum_gains / self.sum_losses;
        Some(100.0 - (100.0 / (1.0 + rs)))
    }
}

#[cfg(test)]
mod tests {
    use super::{Indicator, RollingRsi, RollingSma};

    #[test]
    fn sma_waits_for_full_window() {
        let mut sma = RollingSma::new(3);
        assert_eq!(sma.update(1.0), None);
        assert_eq!(sma.update(2.0), None);
        assert_eq!(sma.update(3.0), Some(2.0));
        assert_eq!(sma.update(6.0), Some(11.0 / 3.0));
    }

    #[test]
    fn partial_sma_averages_what_it_has() {
        let mut sma = RollingSma::new(3);
        assert_eq!(sma.update_partial(2.0), 2.0);
        assert_eq!(sma.update_partial(4.0), 3.0);
        assert_eq!(sma.update_partial(6.0), 4.0);
        assert_eq!(sma.update_partial(8.0), 6.0);
    }

    #[test]
    fn rsi_bounds() {
        let mut rsi = RollingRsi::new(2);
        assert_eq!(rsi.update(10.0), None);
        assert_eq!(rsi.update(11.0), None);
        assert_eq!(rsi.update(12.0), Some(100.0));
        assert_eq!(rsi.update(11.0), Some(50.0));
        let mut flat = RollingRsi::new(1);
        flat.update(5.0);
        assert_eq!(flat.update(5.0), Some(50.0));
    }

    #[test]
    fn zero_length_is_rejected() {
        assert!(Indicator::Sma { length: 0 }.validate().is_err());
        assert!(Indicator::Rsi { length: 14 }.validate().is_ok());
        assert!(Indicator::Close.validate().is_ok());
    }

    #[test]
    fn close_series_is_always_defined() {
        let series = Indicator::Close.series(&[1.0, 2.0]);
        assert_eq!(series, vec![Some(1.0), Some(2.0)]);
    }
}
