//! Ticket token: capped fungible balances plus the venue's role sets.
//!
//! The token is the only place balances change. Each mutating operation has a
//! `check_*` half that validates without touching state and an `apply_*` half
//! that cannot fail; the public methods run both, and the ledger reducer runs
//! the checks for a whole operation before applying any of it.

use crate::error::{Capability, LedgerError};
use crate::types::Role;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use turnstile_core::primitives::Address;

/// Capped-supply ticket registry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketToken {
    name: String,
    symbol: String,
    owner: Address,
    cap: u64,
    total_supply: u64,
    balances: HashMap<Address, u64>,
    doormen: HashSet<Address>,
    authorized_minters: HashSet<Address>,
}

impl TicketToken {
    /// Deploys a token owned by `owner` with nothing minted and no roles granted
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        symbol: impl Into<String>,
        owner: Address,
        cap: u64,
    ) -> Self {
        Self {
            name: name.into(),
            symbol: symbol.into(),
            owner,
            cap,
            total_supply: 0,
            balances: HashMap::new(),
            doormen: HashSet::new(),
            authorized_minters: HashSet::new(),
        }
    }

    /// Display name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ticker symbol
    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// The venue
    #[must_use]
    pub const fn owner(&self) -> Address {
        self.owner
    }

    /// Maximum supply
    #[must_use]
    pub const fn cap(&self) -> u64 {
        self.cap
    }

    /// Tickets currently in existence
    #[must_use]
    pub const fn total_supply(&self) -> u64 {
        self.total_supply
    }

    /// Tickets held by `holder` (zero when unknown)
    #[must_use]
    pub fn balance_of(&self, holder: &Address) -> u64 {
        self.balances.get(holder).copied().unwrap_or(0)
    }

    /// Every non-zero balance, ordered by address
    #[must_use]
    pub fn holders(&self) -> Vec<(Address, u64)> {
        let mut holders: Vec<_> = self.balances.iter().map(|(a, b)| (*a, *b)).collect();
        holders.sort_unstable();
        holders
    }

    /// Whether `address` may redeem for attendees
    #[must_use]
    pub fn is_doorman(&self, address: &Address) -> bool {
        self.doormen.contains(address)
    }

    /// Whether `address` may mint and burn
    #[must_use]
    pub fn is_authorized_minter(&self, address: &Address) -> bool {
        self.authorized_minters.contains(address)
    }

    /// Venue beats doorman beats attendee
    #[must_use]
    pub fn role_of(&self, address: &Address) -> Role {
        if *address == self.owner {
            Role::Venue
        } else if self.is_doorman(address) {
            Role::Doorman
        } else {
            Role::Attendee
        }
    }

    /// Moves `qty` tickets from `caller` to `to`.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidAmount`] for zero, [`LedgerError::InsufficientBalance`]
    /// if the caller holds fewer than `qty`.
    pub fn transfer(&mut self, caller: Address, to: Address, qty: u64) -> Result<(), LedgerError> {
        self.check_transfer(caller, to, qty)?;
        self.apply_transfer(caller, to, qty);
        Ok(())
    }

    /// Issues `qty` new tickets to `to`.
    ///
    /// # Errors
    ///
    /// [`LedgerError::AccessDenied`] unless `caller` is an authorized minter,
    /// [`LedgerError::CapExceeded`] if supply would pass the cap.
    pub fn mint(&mut self, caller: Address, to: Address, qty: u64) -> Result<(), LedgerError> {
        self.check_mint(caller, qty)?;
        self.apply_mint(to, qty);
        Ok(())
    }

    /// Destroys `qty` of `from`'s tickets.
    ///
    /// # Errors
    ///
    /// [`LedgerError::AccessDenied`] unless `caller` is `from` or an authorized
    /// minter, [`LedgerError::InsufficientBalance`] if `from` holds too few.
    pub fn burn(&mut self, caller: Address, from: Address, qty: u64) -> Result<(), LedgerError> {
        self.check_burn(caller, from, qty)?;
        self.apply_burn(from, qty);
        Ok(())
    }

    /// Grants or revokes the doorman role.
    ///
    /// # Errors
    ///
    /// [`LedgerError::AccessDenied`] unless `caller` is the venue.
    pub fn set_doorman(
        &mut self,
        caller: Address,
        address: Address,
        enabled: bool,
    ) -> Result<(), LedgerError> {
        self.ensure_owner(caller)?;
        self.apply_doorman(address, enabled);
        Ok(())
    }

    /// Authorizes or deauthorizes a sale contract as minter.
    ///
    /// # Errors
    ///
    /// [`LedgerError::AccessDenied`] unless `caller` is the venue.
    pub fn set_sales_contract(
        &mut self,
        caller: Address,
        address: Address,
        enabled: bool,
    ) -> Result<(), LedgerError> {
        self.ensure_owner(caller)?;
        self.apply_minter(address, enabled);
        Ok(())
    }

    pub(crate) fn ensure_owner(&self, caller: Address) -> Result<(), LedgerError> {
        if caller == self.owner {
            Ok(())
        } else {
            Err(LedgerError::AccessDenied {
                caller,
                required: Capability::Venue,
            })
        }
    }

    pub(crate) fn ensure_balance(&self, holder: Address, qty: u64) -> Result<(), LedgerError> {
        let available = self.balance_of(&holder);
        if available < qty {
            return Err(LedgerError::InsufficientBalance {
                holder,
                available,
                requested: qty,
            });
        }
        Ok(())
    }

    pub(crate) fn check_transfer(
        &self,
        caller: Address,
        to: Address,
        qty: u64,
    ) -> Result<(), LedgerError> {
        if qty == 0 {
            return Err(LedgerError::InvalidAmount("cannot transfer zero tickets".into()));
        }
        self.ensure_balance(caller, qty)?;
        if caller != to && self.balance_of(&to).checked_add(qty).is_none() {
            return Err(LedgerError::overflow("recipient balance"));
        }
        Ok(())
    }

    pub(crate) fn check_mint(&self, caller: Address, qty: u64) -> Result<(), LedgerError> {
        if !self.is_authorized_minter(&caller) {
            return Err(LedgerError::AccessDenied {
                caller,
                required: Capability::Minter,
            });
        }
        if qty == 0 {
            return Err(LedgerError::InvalidAmount("cannot mint zero tickets".into()));
        }
        match self.total_supply.checked_add(qty) {
            Some(supply) if supply <= self.cap => Ok(()),
            _ => Err(LedgerError::CapExceeded {
                cap: self.cap,
                total_supply: self.total_supply,
                requested: qty,
            }),
        }
    }

    pub(crate) fn check_burn(
        &self,
        caller: Address,
        from: Address,
        qty: u64,
    ) -> Result<(), LedgerError> {
        if caller != from && !self.is_authorized_minter(&caller) {
            return Err(LedgerError::AccessDenied {
                caller,
                required: Capability::HolderOrMinter,
            });
        }
        if qty == 0 {
            return Err(LedgerError::InvalidAmount("cannot burn zero tickets".into()));
        }
        self.ensure_balance(from, qty)
    }

    pub(crate) fn apply_transfer(&mut self, from: Address, to: Address, qty: u64) {
        if from == to {
            return;
        }
        self.debit(from, qty);
        *self.balances.entry(to).or_insert(0) += qty;
    }

    pub(crate) fn apply_mint(&mut self, to: Address, qty: u64) {
        *self.balances.entry(to).or_insert(0) += qty;
        self.total_supply += qty;
    }

    pub(crate) fn apply_burn(&mut self, from: Address, qty: u64) {
        self.debit(from, qty);
        self.total_supply = self.total_supply.saturating_sub(qty);
    }

    pub(crate) fn apply_doorman(&mut self, address: Address, enabled: bool) {
        if enabled {
            self.doormen.insert(address);
        } else {
            self.doormen.remove(&address);
        }
    }

    pub(crate) fn apply_minter(&mut self, address: Address, enabled: bool) {
        if enabled {
            self.authorized_minters.insert(address);
        } else {
            self.authorized_minters.remove(&address);
        }
    }

    fn debit(&mut self, holder: Address, qty: u64) {
        if let Some(balance) = self.balances.get_mut(&holder) {
            *balance = balance.saturating_sub(qty);
            if *balance == 0 {
                self.balances.remove(&holder);
            }
        }
    }
}
