//! Event trait for ledger facts.
//!
//! Events are immutable facts about operations the ledger has committed. They
//! are appended to the ledger journal, published to subscribers, and can be
//! replayed to rebuild state.
//!
//! Events are serialized as JSON so journals stay readable by off-chain tools
//! and the UI layer.
//!
//! # Example
//!
//! ```
//! use turnstile_core::event::Event;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Clone, Debug, Serialize, Deserialize)]
//! enum SaleEvent {
//!     TicketsPurchased { qty: u64 },
//! }
//!
//! impl Event for SaleEvent {
//!     fn event_type(&self) -> &'static str {
//!         match self {
//!             SaleEvent::TicketsPurchased { .. } => "TicketsPurchased.v1",
//!         }
//!     }
//! }
//! ```

use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

/// Error types for event operations.
#[derive(Error, Debug)]
pub enum EventError {
    /// Failed to serialize event to bytes.
    #[error("Failed to serialize event: {0}")]
    SerializationError(String),

    /// Failed to deserialize event from bytes.
    #[error("Failed to deserialize event: {0}")]
    DeserializationError(String),
}

/// A committed ledger fact.
///
/// The `event_type()` identifier is stable and versioned (`"TicketsRefunded.v1"`)
/// so that journals written by one release can be read by the next.
pub trait Event: Send + Sync + 'static {
    /// Returns the versioned event type identifier.
    fn event_type(&self) -> &'static str;

    /// Serialize this event to JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::SerializationError`] if serialization fails.
    fn to_json(&self) -> Result<Vec<u8>, EventError>
    where
        Self: Serialize,
    {
        serde_json::to_vec(self).map_err(|e| EventError::SerializationError(e.to_string()))
    }

    /// Deserialize an event from JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::DeserializationError`] if the bytes are not a valid event.
    fn from_json(bytes: &[u8]) -> Result<Self, EventError>
    where
        Self: DeserializeOwned + Sized,
    {
        serde_json::from_slice(bytes).map_err(|e| EventError::DeserializationError(e.to_string()))
    }
}
