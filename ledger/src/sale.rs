//! Ticket sale: pricing, escrow and the refund/redemption/withdrawal rules.
//!
//! Tickets are fungible, so the sale keeps counters rather than per-ticket
//! records. What each holder paid for the tickets they hold is tracked as that
//! holder's cost basis. A refund or redemption of `qty` out of the `n` tickets a
//! holder owns takes `floor(basis * qty / n)` from it, or the whole remainder
//! once their last ticket leaves. Refunds pay a percentage of that basis;
//! redemptions move it into venue revenue. One holder's payment never funds
//! another holder's refund, whatever the price was when each bought.
//!
//! ```text
//!   buy ──▶ escrow += value, basis[buyer] += value
//!   refund ──▶ pay floor(share * pct / 100), basis[holder] -= share
//!   redeem ──▶ basis[holder] -= share, redeemed revenue += share
//!   transfer ──▶ basis[from] -= share, basis[to] += share
//!   withdraw ──▶ pay min(escrow, redeemed revenue - withdrawn)
//! ```
//!
//! Every `apply_*` step assumes the matching `check_*` (or cost basis query)
//! passed against the same state.

use crate::error::LedgerError;
use crate::types::SaleSnapshot;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use turnstile_core::primitives::{Address, Percentage, Wei};

/// Escrow and accounting state of the sale.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketSale {
    address: Address,
    owner: Address,
    price_wei: Wei,
    refund_percentage: Percentage,
    total_purchased_tickets: u64,
    total_refunded_tickets: u64,
    total_redeemed: u64,
    total_revenue_wei: Wei,
    withdrawn_wei: Wei,
    escrow_wei: Wei,
    outstanding_cost_wei: Wei,
    redeemed_revenue_wei: Wei,
    holder_cost_wei: HashMap<Address, Wei>,
}

impl TicketSale {
    /// Deploys a sale at `address` owned by `owner`.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidAmount`] if `price_wei` is zero.
    pub fn new(
        address: Address,
        owner: Address,
        price_wei: Wei,
        refund_percentage: Percentage,
    ) -> Result<Self, LedgerError> {
        ensure_price(price_wei)?;
        Ok(Self {
            address,
            owner,
            price_wei,
            refund_percentage,
            total_purchased_tickets: 0,
            total_refunded_tickets: 0,
            total_redeemed: 0,
            total_revenue_wei: Wei::ZERO,
            withdrawn_wei: Wei::ZERO,
            escrow_wei: Wei::ZERO,
            outstanding_cost_wei: Wei::ZERO,
            redeemed_revenue_wei: Wei::ZERO,
            holder_cost_wei: HashMap::new(),
        })
    }

    /// The sale's own identity, authorized on the token as minter
    #[must_use]
    pub const fn address(&self) -> Address {
        self.address
    }

    /// The venue
    #[must_use]
    pub const fn owner(&self) -> Address {
        self.owner
    }

    /// Price charged for the next purchase
    #[must_use]
    pub const fn price_wei(&self) -> Wei {
        self.price_wei
    }

    /// Fixed at deployment
    #[must_use]
    pub const fn refund_percentage(&self) -> Percentage {
        self.refund_percentage
    }

    /// Tickets ever sold
    #[must_use]
    pub const fn total_purchased_tickets(&self) -> u64 {
        self.total_purchased_tickets
    }

    /// Tickets ever refunded
    #[must_use]
    pub const fn total_refunded_tickets(&self) -> u64 {
        self.total_refunded_tickets
    }

    /// Tickets ever redeemed
    #[must_use]
    pub const fn total_redeemed(&self) -> u64 {
        self.total_redeemed
    }

    /// Purchased minus refunded minus redeemed
    #[must_use]
    pub const fn total_sold_outstanding(&self) -> u64 {
        self.total_purchased_tickets
            .saturating_sub(self.total_refunded_tickets)
            .saturating_sub(self.total_redeemed)
    }

    /// Payments received minus refunds paid
    #[must_use]
    pub const fn total_revenue_wei(&self) -> Wei {
        self.total_revenue_wei
    }

    /// Revenue already paid to the venue
    #[must_use]
    pub const fn withdrawn_wei(&self) -> Wei {
        self.withdrawn_wei
    }

    /// Native balance held by the sale
    #[must_use]
    pub const fn escrow_wei(&self) -> Wei {
        self.escrow_wei
    }

    /// What outstanding tickets were bought for, across all holders
    #[must_use]
    pub const fn outstanding_cost_wei(&self) -> Wei {
        self.outstanding_cost_wei
    }

    /// What `holder` paid for the tickets they hold now
    #[must_use]
    pub fn cost_of(&self, holder: &Address) -> Wei {
        self.holder_cost_wei.get(holder).copied().unwrap_or(Wei::ZERO)
    }

    /// What redeemed tickets were bought for
    #[must_use]
    pub const fn redeemed_revenue_wei(&self) -> Wei {
        self.redeemed_revenue_wei
    }

    /// Refunds owed if every outstanding ticket were refunded now
    #[must_use]
    pub const fn refund_liability_wei(&self) -> Wei {
        self.outstanding_cost_wei.percent_floor(self.refund_percentage)
    }

    /// Amount the venue can withdraw right now
    #[must_use]
    pub fn withdrawable(&self) -> Wei {
        self.escrow_wei
            .min(self.redeemed_revenue_wei.saturating_sub(self.withdrawn_wei))
    }

    /// Exact payment required for `qty` tickets at the current price.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidAmount`] for zero or on overflow.
    pub fn expected_payment(&self, qty: u64) -> Result<Wei, LedgerError> {
        if qty == 0 {
            return Err(LedgerError::InvalidAmount("quantity must be positive".into()));
        }
        self.price_wei
            .checked_mul(qty)
            .ok_or_else(|| LedgerError::overflow("payment"))
    }

    /// Share of `holder`'s cost basis carried by `qty` of the `held` tickets
    /// they own.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidAmount`] if `qty` is zero or exceeds `held`.
    pub fn cost_basis(&self, holder: &Address, held: u64, qty: u64) -> Result<Wei, LedgerError> {
        if qty == 0 {
            return Err(LedgerError::InvalidAmount("quantity must be positive".into()));
        }
        if qty > held {
            return Err(LedgerError::InvalidAmount(format!(
                "{qty} tickets requested but {holder} holds {held}"
            )));
        }
        let basis = self.cost_of(holder);
        if qty == held {
            return Ok(basis);
        }
        basis
            .mul_div_floor(qty, held)
            .ok_or_else(|| LedgerError::overflow("cost basis"))
    }

    /// What refunding `qty` of the `held` tickets `holder` owns would pay out.
    ///
    /// # Errors
    ///
    /// As [`TicketSale::cost_basis`].
    pub fn quote_refund(&self, holder: &Address, held: u64, qty: u64) -> Result<Wei, LedgerError> {
        Ok(self
            .cost_basis(holder, held, qty)?
            .percent_floor(self.refund_percentage))
    }

    /// Counters, escrow and token supply in one value
    #[must_use]
    pub fn snapshot(&self, total_supply: u64, cap: u64) -> SaleSnapshot {
        SaleSnapshot {
            price_wei: self.price_wei,
            refund_percentage: self.refund_percentage,
            total_purchased_tickets: self.total_purchased_tickets,
            total_refunded_tickets: self.total_refunded_tickets,
            total_redeemed: self.total_redeemed,
            total_sold_outstanding: self.total_sold_outstanding(),
            total_revenue_wei: self.total_revenue_wei,
            withdrawn_wei: self.withdrawn_wei,
            escrow_wei: self.escrow_wei,
            refund_liability_wei: self.refund_liability_wei(),
            withdrawable_wei: self.withdrawable(),
            total_supply,
            cap,
        }
    }

    pub(crate) fn ensure_owner(&self, caller: Address) -> Result<(), LedgerError> {
        if caller == self.owner {
            Ok(())
        } else {
            Err(LedgerError::AccessDenied {
                caller,
                required: crate::error::Capability::Venue,
            })
        }
    }

    pub(crate) fn check_purchase(&self, qty: u64, value: Wei) -> Result<(), LedgerError> {
        let expected = self.expected_payment(qty)?;
        if value != expected {
            return Err(LedgerError::InvalidAmount(format!(
                "payment mismatch: {qty} tickets cost {expected}, got {value}"
            )));
        }
        let fits = self.total_purchased_tickets.checked_add(qty).is_some()
            && self.escrow_wei.checked_add(value).is_some()
            && self.total_revenue_wei.checked_add(value).is_some()
            && self.outstanding_cost_wei.checked_add(value).is_some();
        if fits {
            Ok(())
        } else {
            Err(LedgerError::overflow("sale totals"))
        }
    }

    pub(crate) fn check_refund(&self, cost_basis: Wei, refund: Wei) -> Result<(), LedgerError> {
        if refund > cost_basis || self.escrow_wei < refund || self.total_revenue_wei < refund {
            return Err(LedgerError::InvalidAmount(format!(
                "refund of {refund} exceeds escrow"
            )));
        }
        Ok(())
    }

    pub(crate) fn check_redemption(&self, cost_basis: Wei) -> Result<(), LedgerError> {
        if self.redeemed_revenue_wei.checked_add(cost_basis).is_none() {
            return Err(LedgerError::overflow("redeemed revenue"));
        }
        Ok(())
    }

    pub(crate) fn check_transfer(&self, to: &Address, cost_basis: Wei) -> Result<(), LedgerError> {
        if self.cost_of(to).checked_add(cost_basis).is_none() {
            return Err(LedgerError::overflow("recipient cost basis"));
        }
        Ok(())
    }

    pub(crate) fn apply_purchase(&mut self, buyer: Address, qty: u64, value: Wei) {
        self.total_purchased_tickets += qty;
        self.escrow_wei = add(self.escrow_wei, value);
        self.total_revenue_wei = add(self.total_revenue_wei, value);
        self.outstanding_cost_wei = add(self.outstanding_cost_wei, value);
        self.credit_cost(buyer, value);
    }

    pub(crate) fn apply_refund(&mut self, holder: Address, qty: u64, cost_basis: Wei, refund: Wei) {
        self.total_refunded_tickets += qty;
        self.debit_cost(holder, cost_basis);
        self.outstanding_cost_wei = self.outstanding_cost_wei.saturating_sub(cost_basis);
        self.total_revenue_wei = self.total_revenue_wei.saturating_sub(refund);
        self.escrow_wei = self.escrow_wei.saturating_sub(refund);
    }

    pub(crate) fn apply_redemption(&mut self, holder: Address, qty: u64, cost_basis: Wei) {
        self.total_redeemed += qty;
        self.debit_cost(holder, cost_basis);
        self.outstanding_cost_wei = self.outstanding_cost_wei.saturating_sub(cost_basis);
        self.redeemed_revenue_wei = add(self.redeemed_revenue_wei, cost_basis);
    }

    pub(crate) fn apply_transfer(&mut self, from: Address, to: Address, cost_basis: Wei) {
        if from == to {
            return;
        }
        self.debit_cost(from, cost_basis);
        self.credit_cost(to, cost_basis);
    }

    pub(crate) fn apply_withdrawal(&mut self, amount: Wei) {
        self.withdrawn_wei = add(self.withdrawn_wei, amount);
        self.escrow_wei = self.escrow_wei.saturating_sub(amount);
    }

    pub(crate) const fn apply_price(&mut self, price_wei: Wei) {
        self.price_wei = price_wei;
    }

    fn credit_cost(&mut self, holder: Address, amount: Wei) {
        if amount.is_zero() {
            return;
        }
        let entry = self.holder_cost_wei.entry(holder).or_insert(Wei::ZERO);
        *entry = add(*entry, amount);
    }

    fn debit_cost(&mut self, holder: Address, amount: Wei) {
        if let Some(basis) = self.holder_cost_wei.get_mut(&holder) {
            *basis = basis.saturating_sub(amount);
            if basis.is_zero() {
                self.holder_cost_wei.remove(&holder);
            }
        }
    }
}

/// Rejects a zero price.
///
/// # Errors
///
/// [`LedgerError::InvalidAmount`] if `price_wei` is zero.
pub fn ensure_price(price_wei: Wei) -> Result<(), LedgerError> {
    if price_wei.is_zero() {
        return Err(LedgerError::InvalidAmount("price must be positive".into()));
    }
    Ok(())
}

// Every caller runs after a `check_*` proving the sum fits.
fn add(a: Wei, b: Wei) -> Wei {
    a.checked_add(b).unwrap_or(Wei::new(u128::MAX))
}
