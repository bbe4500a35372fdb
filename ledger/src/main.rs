//! Turnstile demo.
//!
//! Deploys a ledger from the environment (or `.env`), then plays through one
//! evening at the venue: sales, a refund, redemptions at the door and the
//! venue collecting its revenue. Ends by printing the journal as JSON lines.
//!
//! Run with:
//! ```bash
//! RUST_LOG=info cargo run --bin turnstile
//! ```

use anyhow::Context;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use turnstile_core::environment::SystemClock;
use turnstile_core::event_bus::InMemoryEventBus;
use turnstile_core::primitives::{Address, Wei};
use turnstile_ledger::{InMemoryWallets, LedgerConfig, LedgerEnvironment, TicketOffice};
use turnstile_runtime::metrics::MetricsServer;

const JOURNAL_PAGE: usize = 100;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,turnstile=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = LedgerConfig::from_env().context("invalid ledger configuration")?;

    let mut metrics_server = config.metrics_addr.map(MetricsServer::new);
    if let Some(server) = metrics_server.as_mut() {
        server.start().context("failed to start metrics exporter")?;
        turnstile_ledger::metrics::register_ledger_metrics();
    }

    let wallets = InMemoryWallets::new();
    let env = LedgerEnvironment::new(
        Arc::new(SystemClock),
        Arc::new(wallets.clone()),
        Arc::new(InMemoryEventBus::new(config.bus_capacity)),
    );
    let office = TicketOffice::deploy(&config, env).await?;

    let mut notifications = office.subscribe();
    let listener = tokio::spawn(async move {
        while let Some(notification) = notifications.next().await {
            match notification {
                Ok(entry) => tracing::debug!(sequence = entry.sequence, event = ?entry.event, "Notification"),
                Err(error) => tracing::warn!(%error, "Notification stream lagged"),
            }
        }
    });

    let venue = config.venue;
    let doorman = Address::from_low_u64(0xd00d);
    let alice = Address::from_low_u64(0x0a11_ce);
    let bob = Address::from_low_u64(0x0b0b);
    let one_ether = Wei::from_ether(1).context("ether overflow")?;
    wallets.fund(alice, one_ether)?;
    wallets.fund(bob, one_ether)?;

    println!("=== {} ({}) ===", office.name().await, office.symbol().await);
    println!(
        "cap {} | price {} ETH | refunds {}",
        office.cap().await,
        office.price_wei().await.to_ether_string(),
        office.refund_percentage().await
    );

    office.set_doorman(venue, doorman, true).await?;
    println!("\n{doorman} is now a {}", office.role_of(doorman).await);

    println!("\n--- Sales ---");
    purchase(&office, &wallets, alice, 2).await?;
    purchase(&office, &wallets, bob, 1).await?;
    for entry in office.recent_purchases(5).await {
        println!("#{} {:?}", entry.sequence, entry.event);
    }

    println!("\n--- Refund ---");
    office.refund_tickets(alice, 1).await?;
    println!(
        "alice refunded 1 ticket; wallet now {} ETH",
        wallets.balance_of(&alice).to_ether_string()
    );

    println!("\n--- At the door ---");
    office.redeem_tickets(doorman, alice, 1).await?;
    office.self_redeem(bob, 1).await?;
    println!("redeemed so far: {}", office.total_redeemed().await);

    if let Err(error) = office.redeem_tickets(bob, alice, 1).await {
        println!("bob tried to redeem for alice: {error}");
    }

    println!("\n--- Venue payout ---");
    office.withdraw_funds(venue, venue).await?;
    println!(
        "venue collected {} ETH",
        wallets.balance_of(&venue).to_ether_string()
    );
    if let Err(error) = office.withdraw_funds(venue, venue).await {
        println!("second withdrawal: {error}");
    }

    let snapshot = office.snapshot().await;
    println!("\n--- Books ---");
    println!("{}", serde_json::to_string_pretty(&snapshot)?);

    println!("\n--- Journal ---");
    let mut after = 0;
    loop {
        let page = office.journal_page(after, JOURNAL_PAGE).await;
        let Some(last) = page.last() else { break };
        after = last.sequence;
        for entry in &page {
            println!("{}", serde_json::to_string(entry)?);
        }
    }

    if let Some(rendered) = metrics_server.as_ref().and_then(MetricsServer::render) {
        tracing::debug!(bytes = rendered.len(), "Metrics rendered");
    }

    office.shutdown(Duration::from_secs(5)).await?;
    listener.abort();
    Ok(())
}

/// Charges the buyer's wallet and buys; the charge is returned if the sale refuses.
async fn purchase(
    office: &TicketOffice,
    wallets: &InMemoryWallets,
    buyer: Address,
    qty: u64,
) -> anyhow::Result<()> {
    let price = office.price_wei().await;
    let cost = price.checked_mul(qty).context("payment overflows")?;
    wallets.charge(buyer, cost)?;

    if let Err(error) = office.buy_tickets(buyer, qty, cost).await {
        wallets.fund(buyer, cost)?;
        return Err(error.into());
    }
    println!(
        "{buyer} bought {qty} for {} ETH, holds {}",
        cost.to_ether_string(),
        office.balance_of(buyer).await
    );
    Ok(())
}
