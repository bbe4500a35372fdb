//! Business metrics for the ticket ledger.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `ledger_operations_total{operation}` - Committed operations by name
//! - `ledger_rejections_total{reason}` - Rejected operations by error kind
//! - `ledger_tickets_sold_total` - Tickets minted by purchases
//!
//! ## Gauges
//! - `ledger_escrow_wei` - Native balance held by the sale
//! - `ledger_tickets_outstanding` - Tickets sold and not yet refunded or redeemed

use metrics::{describe_counter, describe_gauge};
use turnstile_core::primitives::Wei;

/// Register ledger metric descriptions.
///
/// Call once at startup, after the recorder is installed.
pub fn register_ledger_metrics() {
    describe_counter!(
        "ledger_operations_total",
        "Total number of committed ledger operations by operation name"
    );
    describe_counter!(
        "ledger_rejections_total",
        "Total number of rejected ledger operations by reason"
    );
    describe_counter!(
        "ledger_tickets_sold_total",
        "Total number of tickets minted by purchases"
    );
    describe_gauge!("ledger_escrow_wei", "Native balance currently held in escrow, in wei");
    describe_gauge!(
        "ledger_tickets_outstanding",
        "Tickets sold and neither refunded nor redeemed"
    );

    tracing::info!("Ledger metrics registered");
}

/// Record a committed operation.
pub fn record_operation(operation: &'static str) {
    metrics::counter!("ledger_operations_total", "operation" => operation).increment(1);
    tracing::trace!(operation, "Recorded ledger operation metric");
}

/// Record a rejected operation.
pub fn record_rejection(operation: &'static str, reason: &'static str) {
    metrics::counter!("ledger_rejections_total", "reason" => reason).increment(1);
    tracing::trace!(operation, reason, "Recorded ledger rejection metric");
}

/// Record tickets minted by a purchase.
pub fn record_tickets_sold(qty: u64) {
    metrics::counter!("ledger_tickets_sold_total").increment(qty);
}

/// Publish current escrow and outstanding ticket levels.
#[allow(clippy::cast_precision_loss)] // Gauges are approximate by nature
pub fn record_balances(escrow: Wei, outstanding: u64) {
    metrics::gauge!("ledger_escrow_wei").set(escrow.get() as f64);
    metrics::gauge!("ledger_tickets_outstanding").set(outstanding as f64);
}
