//! `TicketOffice`: the async front door to the ledger.
//!
//! Each command method sends exactly one [`LedgerAction`] through the
//! [`Store`] and reads the reducer's outcome under the same write lock, so the
//! caller gets the result of *its* operation even when many run concurrently.
//! Queries take the read lock and never observe a half-applied operation.

use crate::actions::{LedgerAction, LedgerEvent};
use crate::config::LedgerConfig;
use crate::error::LedgerError;
use crate::reducer::{LedgerEnvironment, LedgerReducer};
use crate::sale::TicketSale;
use crate::state::LedgerState;
use crate::token::TicketToken;
use crate::types::{JournalEntry, Role, SaleSnapshot};
use std::time::Duration;
use turnstile_core::event_bus::EventStream;
use turnstile_core::primitives::{Address, Percentage, Wei};
use turnstile_runtime::{Store, StoreError};

type LedgerStore = Store<LedgerState, LedgerAction, LedgerEnvironment, LedgerReducer>;

/// Async facade over the ledger store.
#[derive(Clone)]
pub struct TicketOffice {
    store: LedgerStore,
}

impl TicketOffice {
    /// Deploys the token and the sale and authorizes the sale as minter.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidAmount`] for a zero price, or any error from
    /// authorizing the sale.
    pub async fn deploy(config: &LedgerConfig, env: LedgerEnvironment) -> Result<Self, LedgerError> {
        let office = Self::undeployed(config, env)?;
        office
            .set_sales_contract(config.venue, config.sale_address, true)
            .await?;
        tracing::info!(
            venue = %config.venue,
            sale = %config.sale_address,
            cap = config.cap,
            price_wei = %config.price_wei,
            refund_percentage = %config.refund_percentage,
            "Ledger deployed"
        );
        Ok(office)
    }

    /// Rebuilds a ledger by replaying a journal on top of a fresh deployment.
    ///
    /// The journal must start from an undeployed ledger (its first entry is
    /// the sale's minter authorization). Each entry is checked against the
    /// ledger rebuilt so far before it is applied. No payouts are made.
    ///
    /// # Errors
    ///
    /// [`LedgerError::CorruptJournal`] for the first entry that is out of
    /// sequence or does not follow from the entries before it,
    /// [`LedgerError::InvalidAmount`] for a zero configured price, or
    /// [`LedgerError::Unavailable`] if the store stops mid-replay.
    pub async fn replay(
        config: &LedgerConfig,
        env: LedgerEnvironment,
        journal: &[JournalEntry],
    ) -> Result<Self, LedgerError> {
        let office = Self::undeployed(config, env)?;
        for entry in journal {
            office.submit(LedgerAction::Replay(entry.clone())).await?;
        }
        tracing::info!(entries = journal.len(), "Ledger rebuilt from journal");
        Ok(office)
    }

    fn undeployed(config: &LedgerConfig, env: LedgerEnvironment) -> Result<Self, LedgerError> {
        let token = TicketToken::new(
            config.token_name.clone(),
            config.token_symbol.clone(),
            config.venue,
            config.cap,
        );
        let sale = TicketSale::new(
            config.sale_address,
            config.venue,
            config.price_wei,
            config.refund_percentage,
        )?;
        let store = Store::new(LedgerState::new(token, sale), LedgerReducer::new(), env);
        Ok(Self { store })
    }

    /// Sends one action and returns the outcome the reducer recorded for it
    async fn submit(&self, action: LedgerAction) -> Result<LedgerEvent, LedgerError> {
        let outcome = self
            .store
            .send_and_read(action, |state| state.last_outcome.clone())
            .await
            .map_err(|error: StoreError| LedgerError::Unavailable(error.to_string()))?;
        outcome.unwrap_or_else(|| Err(LedgerError::Unavailable("no outcome recorded".into())))
    }

    // ========== Sale operations ==========

    /// Buys `qty` tickets with `value` attached.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidAmount`] unless `value` is exactly price × qty,
    /// [`LedgerError::CapExceeded`] past the cap.
    pub async fn buy_tickets(
        &self,
        caller: Address,
        qty: u64,
        value: Wei,
    ) -> Result<LedgerEvent, LedgerError> {
        self.submit(LedgerAction::BuyTickets { caller, qty, value }).await
    }

    /// Returns `qty` tickets for a partial refund.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InsufficientBalance`] if the caller holds too few,
    /// [`LedgerError::TransferFailure`] if the refund cannot be paid.
    pub async fn refund_tickets(&self, caller: Address, qty: u64) -> Result<LedgerEvent, LedgerError> {
        self.submit(LedgerAction::RefundTickets { caller, qty }).await
    }

    /// Doorman redeems `qty` of `attendee`'s tickets.
    ///
    /// # Errors
    ///
    /// [`LedgerError::AccessDenied`] for non-doormen,
    /// [`LedgerError::InsufficientBalance`] if the attendee holds too few.
    pub async fn redeem_tickets(
        &self,
        caller: Address,
        attendee: Address,
        qty: u64,
    ) -> Result<LedgerEvent, LedgerError> {
        self.submit(LedgerAction::RedeemTickets {
            caller,
            attendee,
            qty,
        })
        .await
    }

    /// Attendee redeems their own tickets.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InsufficientBalance`] if the caller holds too few.
    pub async fn self_redeem(&self, caller: Address, qty: u64) -> Result<LedgerEvent, LedgerError> {
        self.submit(LedgerAction::SelfRedeem { caller, qty }).await
    }

    /// Venue sets the price for future purchases.
    ///
    /// # Errors
    ///
    /// [`LedgerError::AccessDenied`] for non-venue callers,
    /// [`LedgerError::InvalidAmount`] for a zero price.
    pub async fn update_price(
        &self,
        caller: Address,
        new_price: Wei,
    ) -> Result<LedgerEvent, LedgerError> {
        self.submit(LedgerAction::UpdatePrice { caller, new_price }).await
    }

    /// Venue withdraws redeemed revenue to `to`.
    ///
    /// # Errors
    ///
    /// [`LedgerError::NothingToWithdraw`] when no redeemed revenue is pending,
    /// [`LedgerError::TransferFailure`] if the payout fails.
    pub async fn withdraw_funds(&self, caller: Address, to: Address) -> Result<LedgerEvent, LedgerError> {
        self.submit(LedgerAction::WithdrawFunds { caller, to }).await
    }

    // ========== Token operations ==========

    /// Moves tickets between holders.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InsufficientBalance`] if the caller holds too few.
    pub async fn transfer(
        &self,
        caller: Address,
        to: Address,
        qty: u64,
    ) -> Result<LedgerEvent, LedgerError> {
        self.submit(LedgerAction::TransferTickets { caller, to, qty }).await
    }

    /// Venue grants or revokes the doorman role.
    ///
    /// # Errors
    ///
    /// [`LedgerError::AccessDenied`] for non-venue callers.
    pub async fn set_doorman(
        &self,
        caller: Address,
        address: Address,
        enabled: bool,
    ) -> Result<LedgerEvent, LedgerError> {
        self.submit(LedgerAction::SetDoorman {
            caller,
            address,
            enabled,
        })
        .await
    }

    /// Venue authorizes or deauthorizes a minter.
    ///
    /// # Errors
    ///
    /// [`LedgerError::AccessDenied`] for non-venue callers.
    pub async fn set_sales_contract(
        &self,
        caller: Address,
        address: Address,
        enabled: bool,
    ) -> Result<LedgerEvent, LedgerError> {
        self.submit(LedgerAction::SetSalesContract {
            caller,
            address,
            enabled,
        })
        .await
    }

    // ========== Queries ==========

    /// Tickets held by `holder`
    pub async fn balance_of(&self, holder: Address) -> u64 {
        self.store.state(|s| s.token.balance_of(&holder)).await
    }

    /// Current price
    pub async fn price_wei(&self) -> Wei {
        self.store.state(|s| s.sale.price_wei()).await
    }

    /// Refund share of the purchase price
    pub async fn refund_percentage(&self) -> Percentage {
        self.store.state(|s| s.sale.refund_percentage()).await
    }

    /// Tickets sold and neither refunded nor redeemed
    pub async fn total_sold_outstanding(&self) -> u64 {
        self.store.state(|s| s.sale.total_sold_outstanding()).await
    }

    /// Tickets ever sold
    pub async fn total_purchased_tickets(&self) -> u64 {
        self.store.state(|s| s.sale.total_purchased_tickets()).await
    }

    /// Tickets ever refunded
    pub async fn total_refunded_tickets(&self) -> u64 {
        self.store.state(|s| s.sale.total_refunded_tickets()).await
    }

    /// Tickets ever redeemed
    pub async fn total_redeemed(&self) -> u64 {
        self.store.state(|s| s.sale.total_redeemed()).await
    }

    /// Payments minus refunds
    pub async fn total_revenue_wei(&self) -> Wei {
        self.store.state(|s| s.sale.total_revenue_wei()).await
    }

    /// Revenue paid to the venue
    pub async fn withdrawn_wei(&self) -> Wei {
        self.store.state(|s| s.sale.withdrawn_wei()).await
    }

    /// Native balance held by the sale
    pub async fn escrow_wei(&self) -> Wei {
        self.store.state(|s| s.sale.escrow_wei()).await
    }

    /// Amount the venue could withdraw now
    pub async fn withdrawable(&self) -> Wei {
        self.store.state(|s| s.sale.withdrawable()).await
    }

    /// Refunds owed if every outstanding ticket were refunded now
    pub async fn refund_liability_wei(&self) -> Wei {
        self.store.state(|s| s.sale.refund_liability_wei()).await
    }

    /// What `holder` refunding `qty` of their tickets would pay right now.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidAmount`] if `qty` is zero or exceeds what
    /// `holder` owns.
    pub async fn quote_refund(&self, holder: Address, qty: u64) -> Result<Wei, LedgerError> {
        self.store
            .state(|s| {
                s.sale
                    .quote_refund(&holder, s.token.balance_of(&holder), qty)
            })
            .await
    }

    /// What `holder` paid for the tickets they hold
    pub async fn cost_of(&self, holder: Address) -> Wei {
        self.store.state(|s| s.sale.cost_of(&holder)).await
    }

    /// Whether `address` is a doorman
    pub async fn is_doorman(&self, address: Address) -> bool {
        self.store.state(|s| s.token.is_doorman(&address)).await
    }

    /// Whether `address` may mint and burn
    pub async fn is_authorized_minter(&self, address: Address) -> bool {
        self.store.state(|s| s.token.is_authorized_minter(&address)).await
    }

    /// Venue, doorman or attendee
    pub async fn role_of(&self, address: Address) -> Role {
        self.store.state(|s| s.token.role_of(&address)).await
    }

    /// Maximum ticket supply
    pub async fn cap(&self) -> u64 {
        self.store.state(|s| s.token.cap()).await
    }

    /// Tickets in existence
    pub async fn total_supply(&self) -> u64 {
        self.store.state(|s| s.token.total_supply()).await
    }

    /// Token name
    pub async fn name(&self) -> String {
        self.store.state(|s| s.token.name().to_string()).await
    }

    /// Token symbol
    pub async fn symbol(&self) -> String {
        self.store.state(|s| s.token.symbol().to_string()).await
    }

    /// The venue
    pub async fn owner(&self) -> Address {
        self.store.state(|s| s.token.owner()).await
    }

    /// Every non-zero balance
    pub async fn holders(&self) -> Vec<(Address, u64)> {
        self.store.state(|s| s.token.holders()).await
    }

    /// Counters, escrow and supply in one consistent read
    pub async fn snapshot(&self) -> SaleSnapshot {
        self.store.state(LedgerState::snapshot).await
    }

    /// Latest purchases first
    pub async fn recent_purchases(&self, limit: usize) -> Vec<JournalEntry> {
        self.store.state(|s| s.recent_purchases(limit)).await
    }

    /// The whole journal; prefer [`TicketOffice::journal_page`] for exports
    pub async fn journal(&self) -> Vec<JournalEntry> {
        self.store.state(|s| s.journal.clone()).await
    }

    /// Up to `limit` journal entries after sequence number `after`
    pub async fn journal_page(&self, after: u64, limit: usize) -> Vec<JournalEntry> {
        self.store.state(|s| s.journal_page(after, limit)).await
    }

    /// Copy of the full ledger state
    pub async fn state(&self) -> LedgerState {
        self.store.state(Clone::clone).await
    }

    /// Journal entries committed from now on
    #[must_use]
    pub fn subscribe(&self) -> EventStream<JournalEntry> {
        self.store.environment().events.subscribe()
    }

    /// Stop accepting operations and wait for pending notifications.
    ///
    /// # Errors
    ///
    /// [`StoreError::ShutdownTimeout`] if notifications are still in flight.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
        self.store.shutdown(timeout).await
    }
}
