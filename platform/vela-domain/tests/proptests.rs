use proptest::prelude::*;
use vela_domain::services::backtest::run_backtest;
use vela_domain::services::round_trips::pair_round_trips;
use vela_domain::value_objects::signal::Signal;

const DAY: i64 = 86_400;
const SOLVENT_CAPITAL: f64 = 100_000.0;

/// Long-only series: deltas are diffs of a 0/1 target, so the net position
/// never goes negative.
fn signals_from(targets: &[bool], closes: &[f64]) -> Vec<Signal> {
    let mut prev = 0.0;
    targets
        .iter()
        .zip(closes)
        .enumerate()
        .map(|(idx, (target, close))| {
            let target = if *target { 1.0 } else { 0.0 };
            let delta = if idx == 0 { 0.0 } else { target - prev };
            prev = if idx == 0 { 0.0 } else { target };
            Signal::new(idx as i64 * DAY, delta, *close)
        })
        .collect()
}

fn series() -> impl Strategy<Value = (Vec<bool>, Vec<f64>)> {
    (1usize..120).prop_flat_map(|len| {
        (
            prop::collection::vec(any::<bool>(), len),
            prop::collection::vec(1.0f64..500.0, len),
        )
    })
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        .. ProptestConfig::default()
    })]

    #[test]
    fn equity_is_cash_plus_holdings((targets, closes) in series()) {
        let signals = signals_from(&targets, &closes);
        let result = run_backtest(&signals, 1_000.0).expect("backtest");
        for point in result.points() {
            let booked = point.cash + point.holdings_value;
            prop_assert!((point.total_equity - booked).abs() < 1e-9);
            let marked = point.net_position * point.close;
            prop_assert!((point.holdings_value - marked).abs() < 1e-9);
            prop_assert!(point.net_position >= 0.0);
        }
    }

    #[test]
    fn reruns_are_bit_identical((targets, closes) in series()) {
        let signals = signals_from(&targets, &closes);
        let first = run_backtest(&signals, 1_000.0).expect("backtest");
        let second = run_backtest(&signals, 1_000.0).expect("backtest");
        prop_assert_eq!(first.points(), second.points());
        prop_assert_eq!(
            first.metrics().to_json().to_string(),
            second.metrics().to_json().to_string()
        );
    }

    // Capital covers every possible loss (at most one unit held, closes
    // under 500, fewer than 120 bars), so equity stays positive. Overdrawn
    // curves are pinned in `backtest_scenarios.rs`.
    #[test]
    fn drawdown_is_a_non_positive_fraction((targets, closes) in series()) {
        let signals = signals_from(&targets, &closes);
        let result = run_backtest(&signals, SOLVENT_CAPITAL).expect("backtest");
        let drawdown = result.metrics().max_drawdown();
        prop_assert!(drawdown <= 0.0);
        prop_assert!(drawdown >= -1.0);
    }

    #[test]
    fn risk_ratios_are_never_nan((targets, closes) in series()) {
        let signals = signals_from(&targets, &closes);
        let metrics = run_backtest(&signals, 1_000.0).expect("backtest").metrics().clone();
        prop_assert!(!metrics.sharpe_ratio().is_nan());
        prop_assert!(!metrics.sortino_ratio().is_nan());
        prop_assert!(!metrics.profit_factor().is_nan());
        prop_assert!((0.0..=100.0).contains(&metrics.win_rate()));
    }

    #[test]
    fn closed_trades_explain_final_equity((targets, closes) in series()) {
        let mut signals = signals_from(&targets, &closes);
        // Flatten on the last bar so every unit bought is sold again.
        let open: f64 = signals.iter().map(|s| s.position_delta).sum();
        if let Some(last) = signals.last_mut() {
            last.position_delta -= open;
        }
        let result = run_backtest(&signals, 1_000.0).expect("backtest");
        let pnl: f64 = pair_round_trips(&signals).iter().map(|t| t.pnl).sum();
        let final_equity = result.final_point().total_equity;
        prop_assert!((final_equity - (1_000.0 + pnl)).abs() < 1e-6);
    }
}
