//! # Turnstile Ledger
//!
//! Ticket sales with escrowed refunds, built on the Turnstile store.
//!
//! Two components share one state value:
//!
//! - [`TicketToken`]: capped fungible balances, the venue, its doormen and
//!   the minters allowed to issue and burn tickets.
//! - [`TicketSale`]: price, refund percentage and the escrow accounting that
//!   keeps outstanding tickets refundable and releases revenue to the venue
//!   only once tickets are redeemed.
//!
//! [`TicketOffice`] is the async entry point. Every operation runs through the
//! store's write lock, so operations are totally ordered and all-or-nothing.
//!
//! ## Example
//!
//! ```ignore
//! let office = TicketOffice::deploy(&LedgerConfig::default(), env).await?;
//! office.set_doorman(venue, doorman, true).await?;
//! office.buy_tickets(alice, 2, price.checked_mul(2).unwrap()).await?;
//! office.redeem_tickets(doorman, alice, 1).await?;
//! office.withdraw_funds(venue, venue).await?;
//! ```

pub mod actions;
pub mod config;
pub mod error;
pub mod metrics;
pub mod office;
pub mod reducer;
pub mod sale;
pub mod state;
pub mod token;
pub mod types;
pub mod wallet;

pub use actions::{LedgerAction, LedgerEvent};
pub use config::LedgerConfig;
pub use error::{Capability, ConfigError, LedgerError};
pub use office::TicketOffice;
pub use reducer::{LedgerEnvironment, LedgerReducer};
pub use sale::TicketSale;
pub use state::LedgerState;
pub use token::TicketToken;
pub use types::{JournalEntry, Role, SaleSnapshot};
pub use wallet::InMemoryWallets;
