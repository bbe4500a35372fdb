//! The single state value the store owns.

use crate::actions::LedgerEvent;
use crate::error::LedgerError;
use crate::sale::TicketSale;
use crate::token::TicketToken;
use crate::types::{JournalEntry, SaleSnapshot};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Purchases kept for [`LedgerState::recent_purchases`]
pub const RECENT_PURCHASES: usize = 64;

/// Token, sale and journal, plus the outcome of the most recent action.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerState {
    /// Ticket balances and roles
    pub token: TicketToken,
    /// Escrow and counters
    pub sale: TicketSale,
    /// Every committed operation, in order
    pub journal: Vec<JournalEntry>,
    /// Result of the last action, read back under the same lock
    pub last_outcome: Option<Result<LedgerEvent, LedgerError>>,
    recent_purchases: VecDeque<JournalEntry>,
}

impl LedgerState {
    /// Fresh ledger with an empty journal
    #[must_use]
    pub const fn new(token: TicketToken, sale: TicketSale) -> Self {
        Self {
            token,
            sale,
            journal: Vec::new(),
            last_outcome: None,
            recent_purchases: VecDeque::new(),
        }
    }

    /// Sale counters combined with token supply
    #[must_use]
    pub fn snapshot(&self) -> SaleSnapshot {
        self.sale.snapshot(self.token.total_supply(), self.token.cap())
    }

    /// Appends `event` and returns the new entry
    pub(crate) fn record(&mut self, event: LedgerEvent, recorded_at: DateTime<Utc>) -> JournalEntry {
        let sequence = self.journal.last().map_or(1, |last| last.sequence + 1);
        let entry = JournalEntry {
            sequence,
            recorded_at,
            event,
        };
        if matches!(entry.event, LedgerEvent::TicketsPurchased { .. }) {
            if self.recent_purchases.len() == RECENT_PURCHASES {
                self.recent_purchases.pop_front();
            }
            self.recent_purchases.push_back(entry.clone());
        }
        self.journal.push(entry.clone());
        entry
    }

    /// Latest purchases first, at most `limit` (and never more than
    /// [`RECENT_PURCHASES`])
    #[must_use]
    pub fn recent_purchases(&self, limit: usize) -> Vec<JournalEntry> {
        self.recent_purchases.iter().rev().take(limit).cloned().collect()
    }

    /// Up to `limit` journal entries with sequence numbers above `after`
    #[must_use]
    pub fn journal_page(&self, after: u64, limit: usize) -> Vec<JournalEntry> {
        let start = usize::try_from(after).unwrap_or(usize::MAX).min(self.journal.len());
        self.journal[start..].iter().take(limit).cloned().collect()
    }

    /// Token and sale are identical; journal and outcome are ignored
    #[must_use]
    pub fn same_books(&self, other: &Self) -> bool {
        self.token == other.token && self.sale == other.sale
    }
}
