//! Shared domain types for the ticket ledger.

use crate::actions::LedgerEvent;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use turnstile_core::primitives::{Percentage, Wei};

/// Role an address plays at the venue.
///
/// Every address is an attendee unless it is the venue or a doorman; there is
/// no enrollment step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Owner of the token and the sale
    Venue,
    /// May redeem tickets on behalf of attendees
    Doorman,
    /// Everyone else
    Attendee,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Venue => write!(f, "venue"),
            Self::Doorman => write!(f, "doorman"),
            Self::Attendee => write!(f, "attendee"),
        }
    }
}

/// Point-in-time view of the sale counters and token supply.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleSnapshot {
    /// Current per-ticket price
    pub price_wei: Wei,
    /// Share of the purchase price returned on refund
    pub refund_percentage: Percentage,
    /// Tickets ever sold
    pub total_purchased_tickets: u64,
    /// Tickets ever refunded
    pub total_refunded_tickets: u64,
    /// Tickets ever redeemed
    pub total_redeemed: u64,
    /// Tickets sold and neither refunded nor redeemed
    pub total_sold_outstanding: u64,
    /// Payments received minus refunds paid
    pub total_revenue_wei: Wei,
    /// Revenue already paid out to the venue
    pub withdrawn_wei: Wei,
    /// Native balance held by the sale
    pub escrow_wei: Wei,
    /// Refunds owed if every outstanding ticket were refunded now
    pub refund_liability_wei: Wei,
    /// What the venue could withdraw now
    pub withdrawable_wei: Wei,
    /// Token supply
    pub total_supply: u64,
    /// Token cap
    pub cap: u64,
}

/// One committed operation in the ledger journal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Position in the journal, starting at 1
    pub sequence: u64,
    /// When the operation committed
    pub recorded_at: DateTime<Utc>,
    /// What happened
    pub event: LedgerEvent,
}
