//! Commands accepted by the ledger and the events they commit.

use crate::types::{JournalEntry, Role};
use serde::{Deserialize, Serialize};
use turnstile_core::event::Event;
use turnstile_core::primitives::{Address, Wei};

/// Everything the ledger reducer can be asked to do.
///
/// Commands carry the caller identity supplied by the wallet layer and any
/// attached payment; they are trusted as given.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerAction {
    /// Buy `qty` tickets paying `value`
    BuyTickets {
        /// Buyer
        caller: Address,
        /// Tickets wanted
        qty: u64,
        /// Attached payment
        value: Wei,
    },
    /// Return `qty` of the caller's tickets for a partial refund
    RefundTickets {
        /// Holder
        caller: Address,
        /// Tickets returned
        qty: u64,
    },
    /// Doorman redeems an attendee's tickets at the door
    RedeemTickets {
        /// Doorman
        caller: Address,
        /// Ticket holder
        attendee: Address,
        /// Tickets redeemed
        qty: u64,
    },
    /// Attendee redeems their own tickets
    SelfRedeem {
        /// Holder
        caller: Address,
        /// Tickets redeemed
        qty: u64,
    },
    /// Venue sets the price for future purchases
    UpdatePrice {
        /// Venue
        caller: Address,
        /// New per-ticket price
        new_price: Wei,
    },
    /// Venue pays out redeemed revenue
    WithdrawFunds {
        /// Venue
        caller: Address,
        /// Recipient
        to: Address,
    },
    /// Venue grants or revokes the doorman role
    SetDoorman {
        /// Venue
        caller: Address,
        /// Subject
        address: Address,
        /// Grant or revoke
        enabled: bool,
    },
    /// Venue authorizes or deauthorizes a minter
    SetSalesContract {
        /// Venue
        caller: Address,
        /// Sale contract address
        address: Address,
        /// Grant or revoke
        enabled: bool,
    },
    /// Holder gives tickets to someone else
    TransferTickets {
        /// Sender
        caller: Address,
        /// Recipient
        to: Address,
        /// Tickets moved
        qty: u64,
    },
    /// Re-apply a journal entry without payouts.
    ///
    /// The entry must carry the next sequence number and be exactly the
    /// event its command would commit against the current state.
    Replay(JournalEntry),
}

impl LedgerAction {
    /// Operation name used in logs and metrics
    #[must_use]
    pub const fn operation(&self) -> &'static str {
        match self {
            Self::BuyTickets { .. } => "buy_tickets",
            Self::RefundTickets { .. } => "refund_tickets",
            Self::RedeemTickets { .. } => "redeem_tickets",
            Self::SelfRedeem { .. } => "self_redeem",
            Self::UpdatePrice { .. } => "update_price",
            Self::WithdrawFunds { .. } => "withdraw_funds",
            Self::SetDoorman { .. } => "set_doorman",
            Self::SetSalesContract { .. } => "set_sales_contract",
            Self::TransferTickets { .. } => "transfer_tickets",
            Self::Replay(_) => "replay",
        }
    }
}

/// A committed ledger operation.
///
/// Amounts are the ones actually settled, so applying an event never needs
/// to recompute anything.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    /// Tickets minted against payment
    TicketsPurchased {
        /// Buyer
        buyer: Address,
        /// Tickets minted
        qty: u64,
        /// Payment escrowed
        value: Wei,
    },
    /// Tickets burned and partially refunded
    TicketsRefunded {
        /// Holder
        buyer: Address,
        /// Tickets burned
        qty: u64,
        /// Paid back to the holder
        refund_amount: Wei,
        /// Purchase cost released from the outstanding pool
        cost_basis: Wei,
    },
    /// Tickets burned at the door
    TicketsRedeemed {
        /// Holder
        attendee: Address,
        /// Tickets burned
        qty: u64,
        /// Doorman, or the attendee for self-redemption
        redeemer: Address,
        /// Purchase cost released to the venue
        cost_basis: Wei,
    },
    /// Redeemed revenue paid out
    FundsWithdrawn {
        /// Recipient
        to: Address,
        /// Amount paid
        amount: Wei,
    },
    /// Doorman role granted or revoked
    RoleChanged {
        /// Subject
        address: Address,
        /// Role after the change
        new_role: Role,
        /// Doorman membership after the change
        doorman: bool,
    },
    /// Minter authorization granted or revoked
    MinterChanged {
        /// Sale contract address
        address: Address,
        /// Authorized after the change
        enabled: bool,
    },
    /// Price for future purchases changed
    PriceUpdated {
        /// Previous price
        old_price: Wei,
        /// New price
        new_price: Wei,
    },
    /// Tickets changed hands
    TicketsTransferred {
        /// Sender
        from: Address,
        /// Recipient
        to: Address,
        /// Tickets moved
        qty: u64,
        /// Sender's purchase cost that moves with the tickets
        cost_basis: Wei,
    },
}

impl LedgerEvent {
    /// The command that commits this event, issued by the party it names.
    ///
    /// Events that do not name their caller (withdrawals, role and price
    /// changes) are attributed to `venue`.
    #[must_use]
    pub fn command(&self, venue: Address) -> LedgerAction {
        match *self {
            Self::TicketsPurchased { buyer, qty, value } => LedgerAction::BuyTickets {
                caller: buyer,
                qty,
                value,
            },
            Self::TicketsRefunded { buyer, qty, .. } => LedgerAction::RefundTickets {
                caller: buyer,
                qty,
            },
            Self::TicketsRedeemed {
                attendee,
                qty,
                redeemer,
                ..
            } if redeemer == attendee => LedgerAction::SelfRedeem {
                caller: attendee,
                qty,
            },
            Self::TicketsRedeemed {
                attendee,
                qty,
                redeemer,
                ..
            } => LedgerAction::RedeemTickets {
                caller: redeemer,
                attendee,
                qty,
            },
            Self::FundsWithdrawn { to, .. } => LedgerAction::WithdrawFunds { caller: venue, to },
            Self::RoleChanged {
                address, doorman, ..
            } => LedgerAction::SetDoorman {
                caller: venue,
                address,
                enabled: doorman,
            },
            Self::MinterChanged { address, enabled } => LedgerAction::SetSalesContract {
                caller: venue,
                address,
                enabled,
            },
            Self::PriceUpdated { new_price, .. } => LedgerAction::UpdatePrice {
                caller: venue,
                new_price,
            },
            Self::TicketsTransferred { from, to, qty, .. } => LedgerAction::TransferTickets {
                caller: from,
                to,
                qty,
            },
        }
    }
}

impl Event for LedgerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::TicketsPurchased { .. } => "TicketsPurchased.v1",
            Self::TicketsRefunded { .. } => "TicketsRefunded.v1",
            Self::TicketsRedeemed { .. } => "TicketsRedeemed.v1",
            Self::FundsWithdrawn { .. } => "FundsWithdrawn.v1",
            Self::RoleChanged { .. } => "RoleChanged.v1",
            Self::MinterChanged { .. } => "MinterChanged.v1",
            Self::PriceUpdated { .. } => "PriceUpdated.v1",
            Self::TicketsTransferred { .. } => "TicketsTransferred.v1",
        }
    }
}
