use std::path::PathBuf;
use vela_application::paper_trading::{AuthenticatedUser, TradingSession};

pub(super) fn run_paper(config_path: PathBuf, dry_run: bool, user: String) -> Result<(), String> {
    let config = vela_application::config::load_config(&config_path)?;
    super::common::print_config_summary("paper", &config, None);

    let crate::infra::PaperDeps {
        market_data,
        broker,
    } = crate::infra::build_paper_deps(&config)?;

    let session = TradingSession::login(AuthenticatedUser::new(user), broker.as_broker())
        .map_err(|err| format!("failed to log in to {} broker: {err}", broker.label()))?;
    let account = session.account();
    println!(
        "account: id={}, cash={:.2}, buying_power={:.2}, portfolio_value={:.2}",
        account.id, account.cash, account.buying_power, account.portfolio_value
    );

    let outcome = vela_application::paper_trading::run_paper(
        &config,
        &session,
        market_data.as_ref(),
        dry_run,
    )?;
    let plan = &outcome.plan;
    println!(
        "decision: {} (close={}, ts={})",
        plan.decision, plan.reference_price, plan.reference_timestamp
    );
    match &plan.position {
        Some(position) => println!(
            "position: {} qty={} avg_entry={}",
            position.symbol, position.quantity, position.avg_entry_price
        ),
        None => println!("position: flat"),
    }
    match (&plan.order, &outcome.ack) {
        (None, _) => println!("order: none"),
        (Some(order), None) => println!(
            "order (dry run): {} {} {}",
            order.side, order.quantity, order.symbol
        ),
        (Some(_), Some(ack)) => println!(
            "order: id={} {} {} {} status={}",
            ack.id, ack.side, ack.quantity, ack.symbol, ack.status
        ),
    }

    let user = session.logout();
    tracing::info!(user = %user.username, broker = broker.label(), "paper run complete");
    Ok(())
}
