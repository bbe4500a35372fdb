//! # Turnstile Core
//!
//! Core traits and types for the Turnstile ticket ledger.
//!
//! The ledger is written as a reducer: every public operation is an action that
//! is validated and applied to one explicit state value, and everything that
//! touches the outside world (payouts, notifications, time) is injected through
//! an environment.
//!
//! ## Core Concepts
//!
//! - **State**: The whole ledger (token balances, roles, sale counters, escrow)
//! - **Action**: All possible inputs to a reducer (commands and replayed events)
//! - **Reducer**: `(State, Action, Environment) → (State, Effects)`
//! - **Effect**: Side effect descriptions executed by the runtime after commit
//! - **Environment**: Injected collaborators (`Clock`, `Payouts`, event bus)
//!
//! ## Example
//!
//! ```ignore
//! use turnstile_core::*;
//!
//! impl Reducer for LedgerReducer {
//!     type State = LedgerState;
//!     type Action = LedgerAction;
//!     type Environment = LedgerEnvironment;
//!
//!     fn reduce(
//!         &self,
//!         state: &mut LedgerState,
//!         action: LedgerAction,
//!         env: &LedgerEnvironment,
//!     ) -> SmallVec<[Effect; 4]> {
//!         // validate, pay out, apply
//!         smallvec![Effect::None]
//!     }
//! }
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
pub use smallvec::{SmallVec, smallvec};

/// Event trait for ledger notifications and journal entries
pub mod event;

/// Typed publish/subscribe bus for ledger notifications
pub mod event_bus;

/// Addresses, wei amounts and percentages
pub mod primitives;

/// Reducer module - The core trait for business logic
///
/// Reducers are functions `(State, Action, Environment) → (State, Effects)`.
/// They contain all ledger rules and are deterministic given their environment.
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// The Reducer trait - core abstraction for business logic
    ///
    /// # Type Parameters
    ///
    /// - `State`: The domain state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: The injected dependencies this reducer needs
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and effects
        ///
        /// 1. Validates the action
        /// 2. Updates state in place
        /// 3. Returns effect descriptions to be executed
        ///
        /// A rejected action must leave `state` exactly as it found it, apart
        /// from bookkeeping the reducer itself defines (such as a last outcome).
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect; 4]>;
    }
}

/// Effect module - Side effect descriptions
///
/// Effects describe work to be performed by the Store after the reducer has
/// committed. They are values, not execution.
pub mod effect {
    use std::future::Future;
    use std::pin::Pin;

    /// Effect type - describes a side effect to be executed
    ///
    /// Effects never feed actions back into the store; anything that changes
    /// state goes through the reducer as a caller-initiated action.
    pub enum Effect {
        /// No-op effect
        None,

        /// Async work spawned after the write lock is released
        Future(Pin<Box<dyn Future<Output = ()> + Send>>),
    }

    // Manual Debug implementation since Future doesn't implement Debug
    impl std::fmt::Debug for Effect {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
            }
        }
    }

    impl Effect {
        /// Wrap a future whose only outcome is its side effect
        #[must_use]
        pub fn fire_and_forget<F>(fut: F) -> Effect
        where
            F: Future<Output = ()> + Send + 'static,
        {
            Effect::Future(Box::pin(fut))
        }

        /// Returns true for `Effect::None`
        #[must_use]
        pub const fn is_none(&self) -> bool {
            matches!(self, Effect::None)
        }
    }
}

/// Environment module - Dependency injection traits
///
/// Every collaborator the ledger cannot own is abstracted behind a trait and
/// injected via the Environment parameter.
pub mod environment {
    use crate::primitives::{Address, Wei};
    use chrono::{DateTime, Utc};
    use thiserror::Error;

    /// Clock trait - abstracts time operations for testability
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }

    /// Errors reported by a [`Payouts`] backend
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum PayoutError {
        /// The recipient refused the funds
        #[error("recipient {0} rejected the transfer")]
        Rejected(Address),

        /// The backend could not move funds at all
        #[error("payout backend unavailable: {0}")]
        Unavailable(String),
    }

    /// Native-currency transfers out of escrow
    ///
    /// Called synchronously from inside the reducer, before any state change
    /// is applied, so a failed transfer leaves the ledger untouched.
    pub trait Payouts: Send + Sync {
        /// Move `amount` out of escrow to `to`
        ///
        /// # Errors
        ///
        /// Returns [`PayoutError`] if the funds could not be delivered.
        fn transfer(&self, to: &Address, amount: Wei) -> Result<(), PayoutError>;
    }
}
