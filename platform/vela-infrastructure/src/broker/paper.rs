use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use vela_domain::repositories::broker::{Broker, BrokerError};
use vela_domain::services::simulator::POSITION_EPSILON;
use vela_domain::value_objects::account::AccountSnapshot;
use vela_domain::value_objects::order::{BrokerPosition, OrderAck, OrderRequest};
use vela_domain::value_objects::side::Side;

#[derive(Debug, Default)]
struct PaperState {
    active: bool,
    cash: f64,
    prices: HashMap<String, f64>,
    positions: HashMap<String, BrokerPosition>,
    orders: Vec<OrderAck>,
}

/// In-memory broker that fills market orders immediately at the last price
/// set for the symbol. Long-only, no margin.
#[derive(Debug)]
pub struct PaperBroker {
    account_id: String,
    state: Mutex<PaperState>,
}

impl PaperBroker {
    pub fn new(cash: f64) -> Self {
        Self {
            account_id: "paper".to_string(),
            state: Mutex::new(PaperState {
                active: true,
                cash,
                ..PaperState::default()
            }),
        }
    }

    /// Owning the broker means no guard can be live, so a poisoned lock
    /// still hands back the state.
    pub fn with_price(mut self, symbol: &str, price: f64) -> Self {
        self.state
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .prices
            .insert(symbol.to_string(), price);
        self
    }

    pub fn set_price(&self, symbol: &str, price: f64) -> Result<(), BrokerError> {
        self.lock()?.prices.insert(symbol.to_string(), price);
        Ok(())
    }

    pub fn set_active(&self, active: bool) -> Result<(), BrokerError> {
        self.lock()?.active = active;
        Ok(())
    }

    pub fn orders(&self) -> Result<Vec<OrderAck>, BrokerError> {
        Ok(self.lock()?.orders.clone())
    }

    fn lock(&self) -> Result<MutexGuard<'_, PaperState>, BrokerError> {
        self.state
            .lock()
            .map_err(|_| BrokerError::Transport("paper broker state poisoned".to_string()))
    }
}

impl Broker for PaperBroker {
    fn account(&self) -> Result<AccountSnapshot, BrokerError> {
        let state = self.lock()?;
        let holdings: f64 = state
            .positions
            .values()
            .map(|pos| {
                let price = state
                    .prices
                    .get(&pos.symbol)
                    .copied()
                    .unwrap_or(pos.avg_entry_price);
                pos.quantity * price
            })
            .sum();
        Ok(AccountSnapshot {
            id: self.account_id.clone(),
            active: state.active,
            cash: state.cash,
            buying_power: state.cash.max(0.0),
            portfolio_value: state.cash + holdings,
        })
    }

    fn submit_order(&self, order: &OrderRequest) -> Result<OrderAck, BrokerError> {
        let mut state = self.lock()?;
        if !state.active {
            return Err(BrokerError::Rejected("account is not active".to_string()));
        }
        if !order.quantity.is_finite() || order.quantity <= 0.0 {
            return Err(BrokerError::Rejected(format!(
                "invalid quantity: {}",
                order.quantity
            )));
        }
        let Some(price) = state.prices.get(&order.symbol).copied() else {
            return Err(BrokerError::Rejected(format!(
                "no reference price for {}",
                order.symbol
            )));
        };

        let held = state
            .positions
            .get(&order.symbol)
            .map(|pos| pos.quantity)
            .unwrap_or(0.0);
        let notional = order.quantity * price;

        match order.side {
            Side::Buy => {
                if notional > state.cash {
                    return Err(BrokerError::Rejected(format!(
                        "insufficient buying power: need {notional:.2}, have {:.2}",
                        state.cash
                    )));
                }
                state.cash -= notional;
                let entry = state
                    .positions
                    .entry(order.symbol.clone())
                    .or_insert_with(|| BrokerPosition {
                        symbol: order.symbol.clone(),
                        quantity: 0.0,
                        avg_entry_price: 0.0,
                    });
                let total_qty = entry.quantity + order.quantity;
                entry.avg_entry_price =
                    (entry.avg_entry_price * entry.quantity + notional) / total_qty;
                entry.quantity = total_qty;
            }
            Side::Sell => {
                if order.quantity > held + POSITION_EPSILON {
                    return Err(BrokerError::Rejected(format!(
                        "cannot sell {} {}: holding {held}",
                        order.quantity, order.symbol
                    )));
                }
                state.cash += notional;
                let remaining = held - order.quantity;
                if remaining <= POSITION_EPSILON {
                    state.positions.remove(&order.symbol);
                } else if let Some(pos) = state.positions.get_mut(&order.symbol) {
                    pos.quantity = remaining;
                }
            }
        }

        let ack = OrderAck {
            id: format!("paper-{}", state.orders.len() + 1),
            symbol: order.symbol.clone(),
            quantity: order.quantity,
            side: order.side,
            status: "filled".to_string(),
        };
        state.orders.push(ack.clone());
        Ok(ack)
    }

    fn position(&self, symbol: &str) -> Result<Option<BrokerPosition>, BrokerError> {
        Ok(self.lock()?.positions.get(symbol).cloned())
    }

    fn observe_price(&self, symbol: &str, price: f64) -> Result<(), BrokerError> {
        self.set_price(symbol, price)
    }
}
