//! Notification bus for committed ledger events.
//!
//! The reducer never talks to subscribers directly. After an operation commits,
//! it returns an effect that publishes the resulting event; the Store runs that
//! effect outside the state lock.
//!
//! ```text
//! ┌─────────────┐     ┌──────────┐     ┌──────────────┐     ┌────────────┐
//! │   Command   │────▶│ Reducer  │────▶│ Publish      │────▶│ UI / index │
//! └─────────────┘     │ (commit) │     │ effect       │     │ subscriber │
//!                     └──────────┘     └──────────────┘     └────────────┘
//! ```
//!
//! Delivery is best-effort and in-process. Events carry the journal sequence
//! number, so a subscriber that needs strict order sorts on it; a subscriber
//! that lags behind the channel capacity receives [`EventBusError::Lagged`]
//! and can re-read the journal.

use futures::Stream;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;
use tokio::sync::broadcast;

/// Errors that can occur during event bus operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventBusError {
    /// The subscriber fell behind and missed events
    #[error("Subscriber lagged behind and skipped {0} events")]
    Lagged(u64),

    /// Failed to publish an event
    #[error("Publish failed: {0}")]
    PublishFailed(String),
}

/// Stream of events delivered to a subscriber.
pub type EventStream<E> = Pin<Box<dyn Stream<Item = Result<E, EventBusError>> + Send>>;

/// Publish/subscribe for ledger notifications.
///
/// Uses explicit `Pin<Box<dyn Future>>` returns so the bus can live behind
/// `Arc<dyn EventBus<E>>` inside a reducer environment.
pub trait EventBus<E>: Send + Sync {
    /// Publish an event to every current subscriber.
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::PublishFailed`] if the backend rejects the event.
    fn publish(&self, event: E)
    -> Pin<Box<dyn Future<Output = Result<(), EventBusError>> + Send + '_>>;

    /// Subscribe to all events published from now on.
    fn subscribe(&self) -> EventStream<E>;
}

/// In-process bus backed by a `tokio` broadcast channel.
#[derive(Debug, Clone)]
pub struct InMemoryEventBus<E> {
    sender: broadcast::Sender<E>,
}

impl<E: Clone + Send + 'static> InMemoryEventBus<E> {
    /// Creates a bus that buffers up to `capacity` events per subscriber
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Number of live subscribers
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl<E: Clone + Send + Sync + 'static> EventBus<E> for InMemoryEventBus<E> {
    fn publish(
        &self,
        event: E,
    ) -> Pin<Box<dyn Future<Output = Result<(), EventBusError>> + Send + '_>> {
        // No subscribers is not an error: nobody is listening yet.
        let _ = self.sender.send(event);
        Box::pin(async { Ok(()) })
    }

    fn subscribe(&self) -> EventStream<E> {
        let receiver = self.sender.subscribe();
        Box::pin(futures::stream::unfold(receiver, |mut receiver| async move {
            match receiver.recv().await {
                Ok(event) => Some((Ok(event), receiver)),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    Some((Err(EventBusError::Lagged(skipped)), receiver))
                },
                Err(broadcast::error::RecvError::Closed) => None,
            }
        }))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let bus = InMemoryEventBus::<u32>::new(8);
        let mut stream = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        bus.publish(1).await.unwrap();
        bus.publish(2).await.unwrap();

        assert_eq!(stream.next().await, Some(Ok(1)));
        assert_eq!(stream.next().await, Some(Ok(2)));
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_ok() {
        let bus = InMemoryEventBus::<u32>::new(8);
        assert!(bus.publish(7).await.is_ok());
    }

    #[tokio::test]
    async fn slow_subscriber_sees_lag() {
        let bus = InMemoryEventBus::<u32>::new(2);
        let mut stream = bus.subscribe();
        for n in 0..5 {
            bus.publish(n).await.unwrap();
        }
        assert_eq!(stream.next().await, Some(Err(EventBusError::Lagged(3))));
        assert_eq!(stream.next().await, Some(Ok(3)));
    }
}
