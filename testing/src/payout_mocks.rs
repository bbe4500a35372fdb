//! In-memory payout backend for tests.
//!
//! [`RecordingPayouts`] records every transfer the ledger makes out of escrow
//! and can be configured to reject specific recipients or to fail outright,
//! which is how tests exercise the "failed payout rolls back" path.

#![allow(clippy::unwrap_used)] // Test infrastructure: a poisoned lock is a test bug

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use turnstile_core::environment::{PayoutError, Payouts};
use turnstile_core::primitives::{Address, Wei};

#[derive(Debug, Default)]
struct Inner {
    transfers: Vec<(Address, Wei)>,
    rejecting: HashSet<Address>,
    outage: Option<String>,
}

/// Records payouts; cheap to clone, clones share the same record.
///
/// # Example
///
/// ```
/// use turnstile_core::environment::Payouts;
/// use turnstile_core::primitives::{Address, Wei};
/// use turnstile_testing::RecordingPayouts;
///
/// let payouts = RecordingPayouts::new();
/// let alice = Address::from_low_u64(1);
///
/// payouts.transfer(&alice, Wei::new(40)).unwrap();
/// assert_eq!(payouts.total_paid_to(&alice), Wei::new(40));
///
/// payouts.reject(alice);
/// assert!(payouts.transfer(&alice, Wei::new(1)).is_err());
/// assert_eq!(payouts.transfers().len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RecordingPayouts {
    inner: Arc<Mutex<Inner>>,
}

impl RecordingPayouts {
    /// Creates a backend that accepts every transfer
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `recipient` refuse all future transfers
    pub fn reject(&self, recipient: Address) {
        self.inner.lock().unwrap().rejecting.insert(recipient);
    }

    /// Accept transfers to `recipient` again
    pub fn accept(&self, recipient: &Address) {
        self.inner.lock().unwrap().rejecting.remove(recipient);
    }

    /// Fail every transfer with [`PayoutError::Unavailable`]
    pub fn set_outage(&self, reason: impl Into<String>) {
        self.inner.lock().unwrap().outage = Some(reason.into());
    }

    /// End a simulated outage
    pub fn clear_outage(&self) {
        self.inner.lock().unwrap().outage = None;
    }

    /// All successful transfers, in order
    #[must_use]
    pub fn transfers(&self) -> Vec<(Address, Wei)> {
        self.inner.lock().unwrap().transfers.clone()
    }

    /// Sum of successful transfers to `recipient`
    #[must_use]
    pub fn total_paid_to(&self, recipient: &Address) -> Wei {
        self.inner
            .lock()
            .unwrap()
            .transfers
            .iter()
            .filter(|(to, _)| to == recipient)
            .fold(Wei::ZERO, |acc, (_, amount)| {
                acc.checked_add(*amount).unwrap_or(acc)
            })
    }

    /// Sum of all successful transfers
    #[must_use]
    pub fn total_paid(&self) -> Wei {
        self.inner
            .lock()
            .unwrap()
            .transfers
            .iter()
            .fold(Wei::ZERO, |acc, (_, amount)| {
                acc.checked_add(*amount).unwrap_or(acc)
            })
    }
}

impl Payouts for RecordingPayouts {
    fn transfer(&self, to: &Address, amount: Wei) -> Result<(), PayoutError> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| PayoutError::Unavailable("payout record poisoned".to_string()))?;

        if let Some(reason) = &inner.outage {
            return Err(PayoutError::Unavailable(reason.clone()));
        }
        if inner.rejecting.contains(to) {
            return Err(PayoutError::Rejected(*to));
        }

        inner.transfers.push((*to, amount));
        Ok(())
    }
}
