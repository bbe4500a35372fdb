//! Error types for the ticket ledger.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use turnstile_core::primitives::{Address, Wei};

/// Capability a caller was missing when an operation was refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    /// The venue (token and sale owner)
    Venue,
    /// A member of the doorman set
    Doorman,
    /// An authorized minter (the sale)
    Minter,
    /// The holder of the tickets, or an authorized minter
    HolderOrMinter,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Venue => "venue",
            Self::Doorman => "doorman",
            Self::Minter => "authorized minter",
            Self::HolderOrMinter => "holder or authorized minter",
        };
        f.write_str(name)
    }
}

/// Reasons a ledger operation is rejected.
///
/// Every variant aborts the whole operation: no balance, counter or escrow
/// change is observable after an error.
#[derive(Error, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerError {
    /// Caller lacks the role the operation requires
    #[error("access denied: {caller} is not {required}")]
    AccessDenied {
        /// Who called
        caller: Address,
        /// What they needed to be
        required: Capability,
    },

    /// Zero quantity, payment mismatch, zero price or arithmetic overflow
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// Holder does not own enough tickets
    #[error("not owned: {holder} holds {available} tickets, {requested} requested")]
    InsufficientBalance {
        /// Account whose balance was checked
        holder: Address,
        /// Tickets held
        available: u64,
        /// Tickets the operation needed
        requested: u64,
    },

    /// Minting would push total supply past the cap
    #[error("cap exceeded: {total_supply} of {cap} issued, {requested} requested")]
    CapExceeded {
        /// Maximum supply
        cap: u64,
        /// Supply before the mint
        total_supply: u64,
        /// Tickets the mint asked for
        requested: u64,
    },

    /// No redeemed revenue is waiting to be withdrawn
    #[error("nothing yet to withdraw")]
    NothingToWithdraw,

    /// Native-currency payout failed; nothing was applied
    #[error("transfer of {amount} to {to} failed: {reason}")]
    TransferFailure {
        /// Intended recipient
        to: Address,
        /// Amount that was not delivered
        amount: Wei,
        /// Reason reported by the payout backend
        reason: String,
    },

    /// The ledger no longer accepts operations
    #[error("ledger unavailable: {0}")]
    Unavailable(String),

    /// A replayed journal entry does not follow from the ledger it is applied to
    #[error("corrupt journal at entry {sequence}: {reason}")]
    CorruptJournal {
        /// Sequence number of the offending entry
        sequence: u64,
        /// What did not match
        reason: String,
    },
}

impl LedgerError {
    /// Short stable label, used as a metrics dimension
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::AccessDenied { .. } => "access_denied",
            Self::InvalidAmount(_) => "invalid_amount",
            Self::InsufficientBalance { .. } => "insufficient_balance",
            Self::CapExceeded { .. } => "cap_exceeded",
            Self::NothingToWithdraw => "nothing_to_withdraw",
            Self::TransferFailure { .. } => "transfer_failure",
            Self::Unavailable(_) => "unavailable",
            Self::CorruptJournal { .. } => "corrupt_journal",
        }
    }

    pub(crate) fn overflow(what: &str) -> Self {
        Self::InvalidAmount(format!("{what} overflows"))
    }
}

/// Configuration loading errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable was set but could not be parsed
    #[error("{key}={value:?} is invalid: {reason}")]
    Invalid {
        /// Environment variable name
        key: &'static str,
        /// Raw value
        value: String,
        /// Parser message
        reason: String,
    },

    /// Values parsed but do not describe a usable deployment
    #[error("invalid configuration: {0}")]
    Inconsistent(String),
}
