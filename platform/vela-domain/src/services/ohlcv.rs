use crate::value_objects::bar::Bar;
use serde::Serialize;

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct DataQualityReport {
    pub rows: usize,
    pub duplicates: usize,
    pub out_of_order: usize,
    pub invalid_close: usize,
    pub gaps: usize,
    pub first_timestamp: Option<i64>,
    pub last_timestamp: Option<i64>,
    pub first_duplicate: Option<i64>,
    pub first_out_of_order: Option<i64>,
    pub first_invalid_close: Option<i64>,
    pub max_gap_seconds: Option<i64>,
}

impl DataQualityReport {
    /// Nothing that would make the simulator reject the series.
    pub fn is_clean(&self) -> bool {
        self.duplicates == 0 && self.out_of_order == 0 && self.invalid_close == 0
    }
}

/// Gaps are only counted when `max_step_seconds` is given; daily series skip
/// weekends and holidays, so callers pass a tolerance that fits their market.
pub fn data_quality_from_bars(bars: &[Bar], max_step_seconds: Option<i64>) -> DataQualityReport {
    let mut report = DataQualityReport {
        rows: bars.len(),
        ..DataQualityReport::default()
    };
    if bars.is_empty() {
        return report;
    }

    report.first_timestamp = Some(bars[0].timestamp);
    report.last_timestamp = Some(bars[bars.len() - 1].timestamp);

    let mut last_ts: Option<i64> = None;
    let mut max_gap: Option<i64> = None;

    for bar in bars {
        let ts = bar.timestamp;

        if !bar.close.is_finite() || bar.close <= 0.0 {
            report.invalid_close += 1;
            if report.first_invalid_close.is_none() {
                report.first_invalid_close = Some(ts);
            }
        }

        if let Some(prev) = last_ts {
            if ts == prev {
                report.duplicates += 1;
                if report.first_duplicate.is_none() {
                    report.first_duplicate = Some(ts);
                }
            } else if ts < prev {
                report.out_of_order += 1;
                if report.first_out_of_order.is_none() {
                    report.first_out_of_order = Some(ts);
                }
            } else if let Some(step) = max_step_seconds {
                let diff = ts - prev;
                if diff > step.max(1) {
                    report.gaps += 1;
                    max_gap = Some(max_gap.map_or(diff, |current| current.max(diff)));
                }
            }
        }

        last_ts = Some(ts);
    }

    report.max_gap_seconds = max_gap;
    report
}

/// Bars with `start <= timestamp <= end`, order preserved.
pub fn filter_range(bars: Vec<Bar>, start: Option<i64>, end: Option<i64>) -> Vec<Bar> {
    bars.into_iter()
        .filter(|bar| start.map_or(true, |s| bar.timestamp >= s))
        .filter(|bar| end.map_or(true, |e| bar.timestamp <= e))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{data_quality_from_bars, filter_range};
    use crate::value_objects::bar::Bar;

    fn bar(ts: i64, close: f64) -> Bar {
        Bar {
            symbol: "AAPL".to_string(),
            timestamp: ts,
            open: close,
            high: close,
            low: close,
            close,
            volume: 1.0,
        }
    }

    #[test]
    fn reports_duplicates_out_of_order_and_bad_closes() {
        let bars = vec![bar(1, 10.0), bar(1, 10.0), bar(0, 10.0), bar(5, 0.0)];
        let report = data_quality_from_bars(&bars, None);
        assert_eq!(report.rows, 4);
        assert_eq!(report.duplicates, 1);
        assert_eq!(report.out_of_order, 1);
        assert_eq!(report.invalid_close, 1);
        assert_eq!(report.first_invalid_close, Some(5));
        assert_eq!(report.gaps, 0);
        assert!(!report.is_clean());
    }

    #[test]
    fn gaps_need_a_step_tolerance() {
        let bars = vec![bar(0, 1.0), bar(86_400, 1.0), bar(4 * 86_400, 1.0)];
        assert_eq!(data_quality_from_bars(&bars, None).gaps, 0);
        let report = data_quality_from_bars(&bars, Some(86_400));
        assert_eq!(report.gaps, 1);
        assert_eq!(report.max_gap_seconds, Some(3 * 86_400));
        assert!(report.is_clean());
    }

    #[test]
    fn filter_range_is_inclusive() {
        let bars = vec![bar(1, 1.0), bar(2, 1.0), bar(3, 1.0), bar(4, 1.0)];
        let kept: Vec<i64> = filter_range(bars, Some(2), Some(3))
            .iter()
            .map(|b| b.timestamp)
            .collect();
        assert_eq!(kept, vec![2, 3]);
    }
}
