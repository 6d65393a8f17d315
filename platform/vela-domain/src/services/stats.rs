//! Return-series arithmetic shared by the simulator and the metrics engine.

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;
pub const CALENDAR_DAYS_PER_YEAR: f64 = 365.0;
pub const SECONDS_PER_DAY: i64 = 86_400;

/// Running sum, one output per input.
pub fn cumulative_sum<I>(values: I) -> Vec<f64>
where
    I: IntoIterator<Item = f64>,
{
    values
        .into_iter()
        .scan(0.0f64, |acc, value| {
            *acc += value;
            Some(*acc)
        })
        .collect()
}

/// Sample standard deviation (`n - 1` denominator). Fewer than two
/// observations have no spread and yield `0.0`.
pub fn sample_stdev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values
        .iter()
        .map(|value| {
            let diff = value - mean;
            diff * diff
        })
        .sum::<f64>()
        / (n - 1.0);
    var.max(0.0).sqrt()
}

pub fn annualized_volatility(returns: &[f64]) -> f64 {
    sample_stdev(returns) * TRADING_DAYS_PER_YEAR.sqrt()
}

pub fn downside_deviation(returns: &[f64]) -> f64 {
    let negative: Vec<f64> = returns.iter().copied().filter(|r| *r < 0.0).collect();
    sample_stdev(&negative) * TRADING_DAYS_PER_YEAR.sqrt()
}

/// Whole calendar days between two epoch-second timestamps (floored).
pub fn elapsed_days(first_ts: i64, last_ts: i64) -> i64 {
    (last_ts - first_ts).div_euclid(SECONDS_PER_DAY)
}

/// Compounds `total_return` to a yearly rate. `None` when no full day elapsed.
pub fn annualized_return(total_return: f64, elapsed_days: i64) -> Option<f64> {
    if elapsed_days <= 0 {
        return None;
    }
    let growth = 1.0 + total_return;
    if growth <= 0.0 {
        return Some(-1.0);
    }
    let exponent = CALENDAR_DAYS_PER_YEAR / elapsed_days as f64;
    Some(growth.powf(exponent) - 1.0)
}

/// Most negative `(cum - peak) / peak` of the compounded return path.
/// Returns `0.0` when the path never falls below a previous peak.
pub fn max_drawdown(returns: &[f64]) -> f64 {
    let mut cumulative = 1.0f64;
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0f64;
    for ret in returns {
        cumulative *= 1.0 + ret;
        if cumulative > peak {
            peak = cumulative;
        }
        if peak > 0.0 {
            let drawdown = (cumulative - peak) / peak;
            if drawdown < worst {
                worst = drawdown;
            }
        }
    }
    worst
}
