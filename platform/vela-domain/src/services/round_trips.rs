use crate::services::simulator::POSITION_EPSILON;
use crate::value_objects::round_trip::RoundTrip;
use crate::value_objects::signal::Signal;

#[derive(Debug, Default)]
struct OpenTrip {
    entry_timestamp: i64,
    bought_qty: f64,
    bought_value: f64,
    sold_qty: f64,
    sold_value: f64,
}

/// Pairs entries and exits into closed flat-to-flat round trips.
///
/// A trip opens on the first buy while flat and closes when the net position
/// returns to flat. Buys while long scale in at a volume-weighted entry
/// price; partial sells accumulate into a volume-weighted exit price. Sells
/// while flat are ignored and a trip still open at the end is not reported.
pub fn pair_round_trips(signals: &[Signal]) -> Vec<RoundTrip> {
    let mut trips = Vec::new();
    let mut open: Option<OpenTrip> = None;
    let mut net_position = 0.0f64;

    for signal in signals {
        let delta = signal.effective_delta();
        if delta == 0.0 || !delta.is_finite() {
            continue;
        }

        if delta > 0.0 {
            let trip = open.get_or_insert_with(|| OpenTrip {
                entry_timestamp: signal.timestamp,
                ..OpenTrip::default()
            });
            trip.bought_qty += delta;
            trip.bought_value += delta * signal.close;
            net_position += delta;
            continue;
        }

        let Some(trip) = open.as_mut() else {
            continue;
        };
        let sell_qty = (-delta).min(net_position);
        if sell_qty <= 0.0 {
            continue;
        }
        trip.sold_qty += sell_qty;
        trip.sold_value += sell_qty * signal.close;
        net_position -= sell_qty;

        if net_position <= POSITION_EPSILON {
            net_position = 0.0;
            if let Some(done) = open.take() {
                trips.push(close_trip(done, signal.timestamp));
            }
        }
    }

    trips
}

fn close_trip(trip: OpenTrip, exit_timestamp: i64) -> RoundTrip {
    let entry_price = trip.bought_value / trip.bought_qty;
    let exit_price = trip.sold_value / trip.sold_qty;
    let quantity = trip.bought_qty;
    RoundTrip {
        entry_timestamp: trip.entry_timestamp,
        exit_timestamp,
        entry_price,
        exit_price,
        quantity,
        pnl: (exit_price - entry_price) * quantity,
    }
}

#[cfg(test)]
mod tests {
    use super::pair_round_trips;
    use crate::value_objects::signal::Signal;

    #[test]
    fn pairs_single_winning_trip() {
        let signals = vec![
            Signal::new(1, 10.0, 100.0),
            Signal::new(2, 0.0, 110.0),
            Signal::new(3, -10.0, 120.0),
        ];
        let trips = pair_round_trips(&signals);
        assert_eq!(trips.len(), 1);
        assert_eq!(trips[0].entry_timestamp, 1);
        assert_eq!(trips[0].exit_timestamp, 3);
        assert_eq!(trips[0].pnl, 200.0);
        assert!(trips[0].is_win());
    }

    #[test]
    fn open_position_at_end_is_not_a_trade() {
        let signals = vec![
            Signal::new(1, 1.0, 10.0),
            Signal::new(2, -1.0, 12.0),
            Signal::new(3, 1.0, 11.0),
        ];
        assert_eq!(pair_round_trips(&signals).len(), 1);
    }

    #[test]
    fn sells_while_flat_are_ignored() {
        let signals = vec![Signal::new(1, -1.0, 10.0), Signal::new(2, 0.0, 10.0)];
        assert!(pair_round_trips(&signals).is_empty());
    }

    #[test]
    fn scaling_in_and_out_uses_weighted_prices() {
        // Buy 1 @10, buy 1 @20 (entry 15), sell 1 @30, sell 1 @40 (exit 35).
        let signals = vec![
            Signal::new(1, 1.0, 10.0),
            Signal::new(2, 1.0, 20.0),
            Signal::new(3, -1.0, 30.0),
            Signal::new(4, -1.0, 40.0),
        ];
        let trips = pair_round_trips(&signals);
        assert_eq!(trips.len(), 1);
        assert_eq!(trips[0].entry_price, 15.0);
        assert_eq!(trips[0].exit_price, 35.0);
        assert_eq!(trips[0].quantity, 2.0);
        assert_eq!(trips[0].pnl, 40.0);
    }

    // A second buy while long scales in; it never re-prices the whole entry.
    #[test]
    fn repeated_buy_while_long_does_not_reset_entry() {
        let signals = vec![
            Signal::new(1, 1.0, 10.0),
            Signal::new(2, 1.0, 30.0),
            Signal::new(3, -2.0, 20.0),
        ];
        let trips = pair_round_trips(&signals);
        assert_eq!(trips.len(), 1);
        assert_eq!(trips[0].entry_price, 20.0);
        assert_eq!(trips[0].pnl, 0.0);
    }
}
