//! # Turnstile Testing
//!
//! Testing utilities and helpers for the Turnstile ledger.
//!
//! This crate provides:
//! - Deterministic implementations of environment traits (`FixedClock`)
//! - A recording payout backend that can be told to reject recipients
//! - A Given/When/Then harness for reducers
//!
//! ## Example
//!
//! ```ignore
//! use turnstile_testing::{RecordingPayouts, test_clock};
//!
//! let payouts = RecordingPayouts::new();
//! let env = LedgerEnvironment::new(Arc::new(test_clock()), Arc::new(payouts.clone()), bus);
//! // ... drive the ledger ...
//! assert_eq!(payouts.total_paid_to(&alice), expected_refund);
//! ```

use chrono::{DateTime, Utc};
use turnstile_core::environment::Clock;

/// Payout backends for tests
pub mod payout_mocks;


/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// # Example
    ///
    /// ```
    /// use turnstile_testing::mocks::FixedClock;
    /// use turnstile_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// Panics if the hardcoded timestamp fails to parse, which cannot happen.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Install a test-friendly tracing subscriber once per process.
///
/// Honors `RUST_LOG`; repeated calls are no-ops.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_test_writer()
        .try_init();
}

// Re-export commonly used items
pub use mocks::{FixedClock, test_clock};
pub use payout_mocks::RecordingPayouts;
pub use reducer_test::{ReducerTest, assertions};
