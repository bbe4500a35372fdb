//! In-memory wallets for development and demos.
//!
//! Stands in for the external wallet layer: it holds native balances, debits
//! buyers when they attach payment, and implements [`Payouts`] so refunds and
//! withdrawals land back in the recipient's wallet. In production the signing
//! layer and the chain replace it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use turnstile_core::environment::{PayoutError, Payouts};
use turnstile_core::primitives::{Address, Wei};

/// Wallet error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    /// The account cannot cover the payment
    #[error("{account} has {available}, needs {requested}")]
    InsufficientFunds {
        /// Paying account
        account: Address,
        /// Current balance
        available: Wei,
        /// Attempted payment
        requested: Wei,
    },
    /// Balance would overflow
    #[error("balance of {0} would overflow")]
    Overflow(Address),
    /// Internal lock was poisoned
    #[error("wallet store unavailable")]
    Unavailable,
}

/// Shared native balances keyed by address.
#[derive(Clone, Debug, Default)]
pub struct InMemoryWallets {
    balances: Arc<Mutex<HashMap<Address, Wei>>>,
}

impl InMemoryWallets {
    /// Creates an empty set of wallets
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds funds to `account`.
    ///
    /// # Errors
    ///
    /// [`WalletError::Overflow`] if the balance would overflow.
    pub fn fund(&self, account: Address, amount: Wei) -> Result<(), WalletError> {
        let mut balances = self.balances.lock().map_err(|_| WalletError::Unavailable)?;
        let balance = balances.entry(account).or_default();
        *balance = balance
            .checked_add(amount)
            .ok_or(WalletError::Overflow(account))?;
        Ok(())
    }

    /// Takes a payment out of `account`, e.g. the value attached to a purchase.
    ///
    /// # Errors
    ///
    /// [`WalletError::InsufficientFunds`] if the account is short.
    pub fn charge(&self, account: Address, amount: Wei) -> Result<(), WalletError> {
        let mut balances = self.balances.lock().map_err(|_| WalletError::Unavailable)?;
        let available = balances.get(&account).copied().unwrap_or_default();
        let remaining = available
            .checked_sub(amount)
            .ok_or(WalletError::InsufficientFunds {
                account,
                available,
                requested: amount,
            })?;
        balances.insert(account, remaining);
        Ok(())
    }

    /// Current balance, zero for unknown accounts
    #[must_use]
    pub fn balance_of(&self, account: &Address) -> Wei {
        self.balances
            .lock()
            .ok()
            .and_then(|balances| balances.get(account).copied())
            .unwrap_or_default()
    }
}

impl Payouts for InMemoryWallets {
    fn transfer(&self, to: &Address, amount: Wei) -> Result<(), PayoutError> {
        self.fund(*to, amount).map_err(|error| match error {
            WalletError::Overflow(account) => PayoutError::Rejected(account),
            other => PayoutError::Unavailable(other.to_string()),
        })?;
        tracing::debug!(to = %to, amount = %amount, "Wallet credited");
        Ok(())
    }
}
