//! # Turnstile Runtime
//!
//! Runtime for the Turnstile ledger.
//!
//! This crate provides the [`Store`], which owns the ledger state and is the
//! only way to change it. Every action goes through one write lock, so no two
//! operations ever interleave: later actions observe every effect of earlier
//! ones and never see a half-applied operation.
//!
//! ## Core Components
//!
//! - **Store**: Holds state, serializes reducer execution, runs effects
//! - **Effect Executor**: Runs effect descriptions after the reducer commits
//! - **Metrics**: Prometheus exporter and store-level recorders
//!
//! ## Example
//!
//! ```ignore
//! use turnstile_runtime::Store;
//!
//! let store = Store::new(initial_state, LedgerReducer::new(), environment);
//!
//! // Send an action and read the outcome under the same lock
//! let outcome = store
//!     .send_and_read(action, |state| state.last_outcome.clone())
//!     .await?;
//!
//! // Read state
//! let outstanding = store.state(|s| s.sale.total_sold_outstanding()).await;
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use turnstile_core::{effect::Effect, reducer::Reducer};

/// Prometheus metrics for observability
pub mod metrics;

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during Store operations
    #[derive(Error, Debug)]
    pub enum StoreError {
        /// Store is shutting down and not accepting new actions
        #[error("Store is shutting down")]
        ShutdownInProgress,

        /// Shutdown timed out waiting for effects to complete
        #[error("Shutdown timed out with {0} effects still running")]
        ShutdownTimeout(usize),
    }
}

pub use error::StoreError;

/// Decrements the store-wide pending effect counter on drop, even on panic.
struct PendingGuard(Arc<AtomicUsize>);

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Store module - The runtime for reducers
pub mod store {
    use super::{Arc, AtomicBool, AtomicUsize, Duration, Effect, Ordering, PendingGuard, Reducer, RwLock, StoreError};
    use crate::metrics::StoreMetrics;

    /// The Store - runtime coordinator for a reducer
    ///
    /// The Store manages:
    /// 1. State (behind one `RwLock`; the reducer always runs under the write lock)
    /// 2. Reducer (business logic)
    /// 3. Environment (injected dependencies)
    /// 4. Effect execution (spawned once the lock is released)
    ///
    /// # Type Parameters
    ///
    /// - `S`: State type
    /// - `A`: Action type
    /// - `E`: Environment type
    /// - `R`: Reducer implementation
    pub struct Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        state: Arc<RwLock<S>>,
        reducer: R,
        environment: E,
        shutdown: Arc<AtomicBool>,
        pending_effects: Arc<AtomicUsize>,
    }

    impl<S, A, E, R> Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
        A: Send + 'static,
        S: Send + Sync + 'static,
        E: Send + Sync + 'static,
    {
        /// Create a new store with initial state, reducer, and environment
        #[must_use]
        pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
            Self {
                state: Arc::new(RwLock::new(initial_state)),
                reducer,
                environment,
                shutdown: Arc::new(AtomicBool::new(false)),
                pending_effects: Arc::new(AtomicUsize::new(0)),
            }
        }

        /// Returns the injected environment
        #[must_use]
        pub const fn environment(&self) -> &E {
            &self.environment
        }

        /// Initiate graceful shutdown
        ///
        /// New actions are rejected with [`StoreError::ShutdownInProgress`];
        /// effects already running get `timeout` to finish.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownTimeout`] if effects are still running
        /// when the timeout elapses.
        pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
            tracing::info!("Initiating graceful shutdown");
            self.shutdown.store(true, Ordering::Release);

            let start = std::time::Instant::now();
            let poll_interval = Duration::from_millis(20);

            loop {
                let pending = self.pending_effects.load(Ordering::Acquire);

                if pending == 0 {
                    tracing::info!("All effects completed, shutdown successful");
                    return Ok(());
                }

                if start.elapsed() >= timeout {
                    tracing::error!(
                        pending_effects = pending,
                        "Shutdown timeout: {} effects still running", pending
                    );
                    return Err(StoreError::ShutdownTimeout(pending));
                }

                tokio::time::sleep(poll_interval).await;
            }
        }

        /// Send an action to the store
        ///
        /// 1. Acquires the write lock on state
        /// 2. Calls the reducer with (state, action, environment)
        /// 3. Releases the lock and starts the returned effects
        ///
        /// Concurrent `send()` calls serialize on the write lock.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
        #[tracing::instrument(skip(self, action), name = "store_send")]
        pub async fn send(&self, action: A) -> Result<(), StoreError> {
            self.dispatch(action, |_| ()).await
        }

        /// Send an action and read state before the write lock is released
        ///
        /// `read` runs immediately after the reducer, under the same lock, so
        /// the value it returns reflects exactly this action and nothing sent
        /// concurrently.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
        #[tracing::instrument(skip(self, action, read), name = "store_send_and_read")]
        pub async fn send_and_read<F, T>(&self, action: A, read: F) -> Result<T, StoreError>
        where
            F: FnOnce(&S) -> T,
        {
            self.dispatch(action, read).await
        }

        async fn dispatch<F, T>(&self, action: A, read: F) -> Result<T, StoreError>
        where
            F: FnOnce(&S) -> T,
        {
            if self.shutdown.load(Ordering::Acquire) {
                tracing::warn!("Rejected action: store is shutting down");
                StoreMetrics::record_shutdown_rejection();
                return Err(StoreError::ShutdownInProgress);
            }

            tracing::debug!("Processing action");

            let (effects, value) = {
                let mut state = self.state.write().await;
                tracing::trace!("Acquired write lock on state");

                let span = tracing::debug_span!("reducer_execution");
                let _enter = span.enter();

                let start = std::time::Instant::now();
                let effects = self.reducer.reduce(&mut *state, action, &self.environment);
                StoreMetrics::record_command(start.elapsed(), effects.len());

                let value = read(&*state);
                (effects, value)
            };

            for effect in effects {
                self.execute_effect(effect);
            }

            Ok(value)
        }

        /// Read current state via a closure
        ///
        /// ```ignore
        /// let price = store.state(|s| s.sale.price_wei()).await;
        /// ```
        pub async fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&S) -> T,
        {
            let state = self.state.read().await;
            f(&*state)
        }

        /// Number of effects still running across all actions
        #[must_use]
        pub fn pending_effects(&self) -> usize {
            self.pending_effects.load(Ordering::SeqCst)
        }

        fn execute_effect(&self, effect: Effect) {
            match effect {
                Effect::None => {
                    tracing::trace!("Executing Effect::None (no-op)");
                    StoreMetrics::record_effect("none");
                },
                Effect::Future(fut) => {
                    tracing::trace!("Executing Effect::Future");
                    StoreMetrics::record_effect("future");

                    self.pending_effects.fetch_add(1, Ordering::SeqCst);
                    let guard = PendingGuard(Arc::clone(&self.pending_effects));

                    tokio::spawn(async move {
                        let _guard = guard;
                        fut.await;
                    });
                },
            }
        }
    }

    impl<S, A, E, R> Clone for Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Clone,
        E: Clone,
    {
        fn clone(&self) -> Self {
            Self {
                state: Arc::clone(&self.state),
                reducer: self.reducer.clone(),
                environment: self.environment.clone(),
                shutdown: Arc::clone(&self.shutdown),
                pending_effects: Arc::clone(&self.pending_effects),
            }
        }
    }
}

// Re-export for convenience
pub use store::Store;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use turnstile_core::{SmallVec, smallvec};

    #[derive(Debug, Clone, Default)]
    struct TallyState {
        total: u64,
        rejected: u64,
    }

    #[derive(Debug, Clone)]
    enum TallyAction {
        Add(u64),
        AddThenAnnounce { n: u64, delay: Duration },
    }

    /// Counts announcements delivered by effects
    #[derive(Clone, Default)]
    struct Announcements(Arc<AtomicUsize>);

    #[derive(Clone)]
    struct TallyReducer;

    impl Reducer for TallyReducer {
        type State = TallyState;
        type Action = TallyAction;
        type Environment = Announcements;

        fn reduce(
            &self,
            state: &mut TallyState,
            action: TallyAction,
            env: &Announcements,
        ) -> SmallVec<[Effect; 4]> {
            match action {
                TallyAction::Add(n) => {
                    if let Some(total) = state.total.checked_add(n) {
                        state.total = total;
                    } else {
                        state.rejected += 1;
                    }
                    smallvec![Effect::None]
                },
                TallyAction::AddThenAnnounce { n, delay } => {
                    state.total += n;
                    let announced = Arc::clone(&env.0);
                    smallvec![Effect::fire_and_forget(async move {
                        tokio::time::sleep(delay).await;
                        announced.fetch_add(1, Ordering::SeqCst);
                    })]
                },
            }
        }
    }

    fn store() -> (Store<TallyState, TallyAction, Announcements, TallyReducer>, Announcements) {
        let announcements = Announcements::default();
        let store = Store::new(TallyState::default(), TallyReducer, announcements.clone());
        (store, announcements)
    }

    #[tokio::test]
    async fn send_and_read_sees_own_write() {
        let (store, _) = store();
        let total = store
            .send_and_read(TallyAction::Add(5), |s| s.total)
            .await
            .unwrap();
        assert_eq!(total, 5);
    }

    #[tokio::test]
    async fn concurrent_sends_serialize() {
        let (store, _) = store();

        let handles: Vec<_> = (0..50)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move {
                    let _ = store.send(TallyAction::Add(2)).await;
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.state(|s| s.total).await, 100);
    }

    #[tokio::test]
    async fn state_commits_before_effects_finish() {
        let (store, announcements) = store();
        let action = TallyAction::AddThenAnnounce {
            n: 3,
            delay: Duration::from_millis(50),
        };

        let total = store.send_and_read(action, |s| s.total).await.unwrap();

        assert_eq!(total, 3);
        assert_eq!(store.pending_effects(), 1);
        assert_eq!(announcements.0.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn shutdown_waits_for_running_effects() {
        let (store, announcements) = store();
        store
            .send(TallyAction::AddThenAnnounce {
                n: 1,
                delay: Duration::from_millis(30),
            })
            .await
            .unwrap();

        store.shutdown(Duration::from_secs(1)).await.unwrap();

        assert_eq!(announcements.0.load(Ordering::SeqCst), 1);
        assert_eq!(store.pending_effects(), 0);
    }

    #[tokio::test]
    async fn shutdown_times_out_on_slow_effects() {
        let (store, _) = store();
        store
            .send(TallyAction::AddThenAnnounce {
                n: 1,
                delay: Duration::from_secs(5),
            })
            .await
            .unwrap();

        let result = store.shutdown(Duration::from_millis(50)).await;
        assert!(matches!(result, Err(StoreError::ShutdownTimeout(1))));
    }

    #[tokio::test]
    async fn shutdown_rejects_new_actions() {
        let (store, _) = store();
        store.shutdown(Duration::from_secs(1)).await.unwrap();

        let result = store.send(TallyAction::Add(1)).await;
        assert!(matches!(result, Err(StoreError::ShutdownInProgress)));
        assert_eq!(store.state(|s| s.rejected).await, 0);
    }
}
