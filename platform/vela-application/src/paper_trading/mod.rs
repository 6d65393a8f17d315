//! Routes the latest backtest decision to a broker through an explicit
//! session. Nothing here keeps state between calls.

use crate::config::Config;
use crate::shared::{load_bars, simulate_bars};
use std::time::Instant;
use tracing::info_span;
use vela_domain::repositories::broker::{Broker, BrokerError};
use vela_domain::repositories::market_data::MarketDataRepository;
use vela_domain::services::simulator::POSITION_EPSILON;
use vela_domain::value_objects::account::AccountSnapshot;
use vela_domain::value_objects::decision::TradeDecision;
use vela_domain::value_objects::order::{BrokerPosition, OrderAck, OrderRequest, TimeInForce};
use vela_domain::value_objects::side::Side;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub username: String,
}

impl AuthenticatedUser {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }
}

/// A logged-in user bound to a broker whose account was active at login.
pub struct TradingSession<'a> {
    user: AuthenticatedUser,
    broker: &'a dyn Broker,
    account: AccountSnapshot,
}

impl<'a> TradingSession<'a> {
    pub fn login(user: AuthenticatedUser, broker: &'a dyn Broker) -> Result<Self, BrokerError> {
        let account = broker.account()?;
        if !account.active {
            return Err(BrokerError::Rejected(format!(
                "broker account {} is not active",
                account.id
            )));
        }
        tracing::info!(user = %user.username, account = %account.id, "trading session opened");
        Ok(Self {
            user,
            broker,
            account,
        })
    }

    pub fn user(&self) -> &AuthenticatedUser {
        &self.user
    }

    pub fn broker(&self) -> &dyn Broker {
        self.broker
    }

    /// Account as seen at login.
    pub fn account(&self) -> &AccountSnapshot {
        &self.account
    }

    pub fn logout(self) -> AuthenticatedUser {
        tracing::info!(user = %self.user.username, "trading session closed");
        self.user
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaperPlan {
    pub symbol: String,
    pub decision: TradeDecision,
    pub reference_price: f64,
    pub reference_timestamp: i64,
    pub position: Option<BrokerPosition>,
    pub order: Option<OrderRequest>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaperOutcome {
    pub plan: PaperPlan,
    pub ack: Option<OrderAck>,
    pub dry_run: bool,
}

/// Buys only when flat and sells the whole holding only when long, so a
/// repeated signal never doubles the position.
pub fn decide_order(
    decision: TradeDecision,
    symbol: &str,
    position: Option<&BrokerPosition>,
    quantity: f64,
    time_in_force: TimeInForce,
) -> Option<OrderRequest> {
    let held = position
        .map(|pos| pos.quantity)
        .filter(|qty| *qty > POSITION_EPSILON);
    match (decision, held) {
        (TradeDecision::Buy, None) => Some(OrderRequest {
            symbol: symbol.to_string(),
            quantity,
            side: Side::Buy,
            time_in_force,
        }),
        (TradeDecision::Sell, Some(qty)) => Some(OrderRequest {
            symbol: symbol.to_string(),
            quantity: qty,
            side: Side::Sell,
            time_in_force,
        }),
        _ => None,
    }
}

pub fn plan_paper_order(
    config: &Config,
    session: &TradingSession<'_>,
    market_data: &dyn MarketDataRepository,
) -> Result<PaperPlan, String> {
    config.validate()?;
    let paper = config.paper_or_default();

    let bars = load_bars(config, market_data, "vela.paper")?;
    let result = simulate_bars(config, &bars, "vela.paper")?;
    let last = result.final_point();
    let decision = result.final_decision();

    let position = session
        .broker()
        .position(&config.run.symbol)
        .map_err(|err| format!("failed to fetch position for {}: {err}", config.run.symbol))?;
    let order = decide_order(
        decision,
        &config.run.symbol,
        position.as_ref(),
        paper.quantity,
        paper.time_in_force,
    );

    Ok(PaperPlan {
        symbol: config.run.symbol.clone(),
        decision,
        reference_price: last.close,
        reference_timestamp: last.timestamp,
        position,
        order,
    })
}

pub fn execute_paper_plan(
    session: &TradingSession<'_>,
    plan: PaperPlan,
    dry_run: bool,
) -> Result<PaperOutcome, String> {
    let Some(order) = plan.order.as_ref() else {
        tracing::info!(decision = %plan.decision, "no order to place");
        return Ok(PaperOutcome {
            plan,
            ack: None,
            dry_run,
        });
    };

    if dry_run {
        tracing::info!(
            side = %order.side,
            qty = order.quantity,
            symbol = %order.symbol,
            "dry run; order not sent"
        );
        return Ok(PaperOutcome {
            plan,
            ack: None,
            dry_run,
        });
    }

    session
        .broker()
        .observe_price(&plan.symbol, plan.reference_price)
        .map_err(|err| format!("failed to pass reference price to broker: {err}"))?;

    let stage_start = Instant::now();
    let result = session.broker().submit_order(order);
    let result_label = if result.is_ok() { "ok" } else { "err" };
    metrics::counter!(
        "vela.paper.orders_total",
        "side" => order.side.as_str(),
        "result" => result_label
    )
    .increment(1);
    metrics::histogram!("vela.paper.submit_order_ms")
        .record(stage_start.elapsed().as_millis() as f64);
    let ack = result.map_err(|err| format!("failed to submit {} order: {err}", order.side))?;

    Ok(PaperOutcome {
        plan,
        ack: Some(ack),
        dry_run,
    })
}

pub fn run_paper(
    config: &Config,
    session: &TradingSession<'_>,
    market_data: &dyn MarketDataRepository,
    dry_run: bool,
) -> Result<PaperOutcome, String> {
    let _span = info_span!(
        "run_paper",
        run_id = %config.run.run_id,
        symbol = %config.run.symbol,
        user = %session.user().username,
        dry_run = dry_run
    )
    .entered();

    let plan = plan_paper_order(config, session, market_data)?;
    execute_paper_plan(session, plan, dry_run)
}
