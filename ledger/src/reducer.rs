//! The ledger reducer.
//!
//! Every command goes through the same three steps while the store holds its
//! write lock:
//!
//! 1. **Validate** the whole operation against current state into a single
//!    [`LedgerEvent`]. Nothing is mutated; any failure ends here.
//! 2. **Settle** the event's native-currency payout through [`Payouts`]. A
//!    failed payout ends here too, still with nothing mutated.
//! 3. **Apply** the event. Every mutation in this step is infallible.
//!
//! The committed event is appended to the journal and published to
//! subscribers by a fire-and-forget effect.
//!
//! Replayed journal entries go through the same validation: an entry is only
//! applied if it is exactly the event its command would commit now.

use crate::actions::{LedgerAction, LedgerEvent};
use crate::error::{Capability, LedgerError};
use crate::metrics;
use crate::sale::ensure_price;
use crate::state::LedgerState;
use crate::types::{JournalEntry, Role};
use smallvec::{SmallVec, smallvec};
use std::sync::Arc;
use turnstile_core::environment::{Clock, Payouts};
use turnstile_core::event::Event;
use turnstile_core::event_bus::EventBus;
use turnstile_core::primitives::{Address, Wei};
use turnstile_core::{effect::Effect, reducer::Reducer};

/// Collaborators injected into the ledger reducer.
#[derive(Clone)]
pub struct LedgerEnvironment {
    /// Timestamps for journal entries
    pub clock: Arc<dyn Clock>,
    /// Moves refunds and withdrawals out of escrow
    pub payouts: Arc<dyn Payouts>,
    /// Receives every committed journal entry
    pub events: Arc<dyn EventBus<JournalEntry>>,
}

impl LedgerEnvironment {
    /// Creates a new `LedgerEnvironment`
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        payouts: Arc<dyn Payouts>,
        events: Arc<dyn EventBus<JournalEntry>>,
    ) -> Self {
        Self {
            clock,
            payouts,
            events,
        }
    }
}

/// Reducer for the token and sale.
#[derive(Clone, Copy, Debug, Default)]
pub struct LedgerReducer;

impl LedgerReducer {
    /// Creates a new `LedgerReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Turns a command into the event it would commit
    fn validate(state: &LedgerState, action: &LedgerAction) -> Result<LedgerEvent, LedgerError> {
        match *action {
            LedgerAction::BuyTickets { caller, qty, value } => {
                Self::validate_buy(state, caller, qty, value)
            },
            LedgerAction::RefundTickets { caller, qty } => {
                Self::validate_refund(state, caller, qty)
            },
            LedgerAction::RedeemTickets {
                caller,
                attendee,
                qty,
            } => {
                if !state.token.is_doorman(&caller) {
                    return Err(LedgerError::AccessDenied {
                        caller,
                        required: Capability::Doorman,
                    });
                }
                Self::validate_redeem(state, caller, attendee, qty)
            },
            LedgerAction::SelfRedeem { caller, qty } => {
                Self::validate_redeem(state, caller, caller, qty)
            },
            LedgerAction::UpdatePrice { caller, new_price } => {
                state.sale.ensure_owner(caller)?;
                ensure_price(new_price)?;
                Ok(LedgerEvent::PriceUpdated {
                    old_price: state.sale.price_wei(),
                    new_price,
                })
            },
            LedgerAction::WithdrawFunds { caller, to } => {
                state.sale.ensure_owner(caller)?;
                let amount = state.sale.withdrawable();
                if amount.is_zero() {
                    return Err(LedgerError::NothingToWithdraw);
                }
                Ok(LedgerEvent::FundsWithdrawn { to, amount })
            },
            LedgerAction::SetDoorman {
                caller,
                address,
                enabled,
            } => {
                state.token.ensure_owner(caller)?;
                let new_role = if address == state.token.owner() {
                    Role::Venue
                } else if enabled {
                    Role::Doorman
                } else {
                    Role::Attendee
                };
                Ok(LedgerEvent::RoleChanged {
                    address,
                    new_role,
                    doorman: enabled,
                })
            },
            LedgerAction::SetSalesContract {
                caller,
                address,
                enabled,
            } => {
                state.token.ensure_owner(caller)?;
                Ok(LedgerEvent::MinterChanged { address, enabled })
            },
            LedgerAction::TransferTickets { caller, to, qty } => {
                state.token.check_transfer(caller, to, qty)?;
                let held = state.token.balance_of(&caller);
                let cost_basis = state.sale.cost_basis(&caller, held, qty)?;
                state.sale.check_transfer(&to, cost_basis)?;
                Ok(LedgerEvent::TicketsTransferred {
                    from: caller,
                    to,
                    qty,
                    cost_basis,
                })
            },
            LedgerAction::Replay(ref entry) => Self::validate_replay(state, entry),
        }
    }

    fn validate_buy(
        state: &LedgerState,
        caller: Address,
        qty: u64,
        value: Wei,
    ) -> Result<LedgerEvent, LedgerError> {
        state.sale.check_purchase(qty, value)?;
        state.token.check_mint(state.sale.address(), qty)?;
        Ok(LedgerEvent::TicketsPurchased {
            buyer: caller,
            qty,
            value,
        })
    }

    fn validate_refund(
        state: &LedgerState,
        caller: Address,
        qty: u64,
    ) -> Result<LedgerEvent, LedgerError> {
        if qty == 0 {
            return Err(LedgerError::InvalidAmount("quantity must be positive".into()));
        }
        state.token.ensure_balance(caller, qty)?;
        state.token.check_burn(state.sale.address(), caller, qty)?;

        let held = state.token.balance_of(&caller);
        let cost_basis = state.sale.cost_basis(&caller, held, qty)?;
        let refund_amount = cost_basis.percent_floor(state.sale.refund_percentage());
        state.sale.check_refund(cost_basis, refund_amount)?;

        Ok(LedgerEvent::TicketsRefunded {
            buyer: caller,
            qty,
            refund_amount,
            cost_basis,
        })
    }

    fn validate_redeem(
        state: &LedgerState,
        redeemer: Address,
        attendee: Address,
        qty: u64,
    ) -> Result<LedgerEvent, LedgerError> {
        if qty == 0 {
            return Err(LedgerError::InvalidAmount("quantity must be positive".into()));
        }
        state.token.ensure_balance(attendee, qty)?;
        state.token.check_burn(state.sale.address(), attendee, qty)?;

        let held = state.token.balance_of(&attendee);
        let cost_basis = state.sale.cost_basis(&attendee, held, qty)?;
        state.sale.check_redemption(cost_basis)?;
        Ok(LedgerEvent::TicketsRedeemed {
            attendee,
            qty,
            redeemer,
            cost_basis,
        })
    }

    /// Re-derives a journal entry from its command against the current state
    fn validate_replay(state: &LedgerState, entry: &JournalEntry) -> Result<LedgerEvent, LedgerError> {
        let corrupt = |reason: String| LedgerError::CorruptJournal {
            sequence: entry.sequence,
            reason,
        };

        let next = state.journal.last().map_or(1, |last| last.sequence + 1);
        if entry.sequence != next {
            return Err(corrupt(format!("expected entry {next}")));
        }

        let command = entry.event.command(state.token.owner());
        let expected = Self::validate(state, &command).map_err(|error| corrupt(error.to_string()))?;
        if expected != entry.event {
            return Err(corrupt(format!("ledger state commits {expected:?} instead")));
        }
        Ok(expected)
    }

    /// Pays out whatever the event owes someone
    fn settle(event: &LedgerEvent, payouts: &dyn Payouts) -> Result<(), LedgerError> {
        let (to, amount) = match *event {
            LedgerEvent::TicketsRefunded {
                buyer,
                refund_amount,
                ..
            } => (buyer, refund_amount),
            LedgerEvent::FundsWithdrawn { to, amount } => (to, amount),
            _ => return Ok(()),
        };
        if amount.is_zero() {
            return Ok(());
        }
        payouts
            .transfer(&to, amount)
            .map_err(|error| LedgerError::TransferFailure {
                to,
                amount,
                reason: error.to_string(),
            })
    }

    /// Applies a validated event; cannot fail
    fn apply_event(state: &mut LedgerState, event: &LedgerEvent) {
        match *event {
            LedgerEvent::TicketsPurchased { buyer, qty, value } => {
                state.token.apply_mint(buyer, qty);
                state.sale.apply_purchase(buyer, qty, value);
            },
            LedgerEvent::TicketsRefunded {
                buyer,
                qty,
                refund_amount,
                cost_basis,
            } => {
                state.token.apply_burn(buyer, qty);
                state.sale.apply_refund(buyer, qty, cost_basis, refund_amount);
            },
            LedgerEvent::TicketsRedeemed {
                attendee,
                qty,
                cost_basis,
                ..
            } => {
                state.token.apply_burn(attendee, qty);
                state.sale.apply_redemption(attendee, qty, cost_basis);
            },
            LedgerEvent::FundsWithdrawn { amount, .. } => {
                state.sale.apply_withdrawal(amount);
            },
            LedgerEvent::RoleChanged {
                address, doorman, ..
            } => {
                state.token.apply_doorman(address, doorman);
            },
            LedgerEvent::MinterChanged { address, enabled } => {
                state.token.apply_minter(address, enabled);
            },
            LedgerEvent::PriceUpdated { new_price, .. } => {
                state.sale.apply_price(new_price);
            },
            LedgerEvent::TicketsTransferred {
                from,
                to,
                qty,
                cost_basis,
            } => {
                state.token.apply_transfer(from, to, qty);
                state.sale.apply_transfer(from, to, cost_basis);
            },
        }
    }

    fn publish(entry: JournalEntry, env: &LedgerEnvironment) -> Effect {
        let events = Arc::clone(&env.events);
        Effect::fire_and_forget(async move {
            let sequence = entry.sequence;
            if let Err(error) = events.publish(entry).await {
                tracing::warn!(sequence, %error, "Failed to publish ledger event");
            }
        })
    }
}

impl Reducer for LedgerReducer {
    type State = LedgerState;
    type Action = LedgerAction;
    type Environment = LedgerEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect; 4]> {
        let operation = action.operation();
        let replayed_at = match action {
            LedgerAction::Replay(ref entry) => Some(entry.recorded_at),
            _ => None,
        };
        let replay = replayed_at.is_some();

        let outcome = Self::validate(state, &action).and_then(|event| {
            if !replay {
                Self::settle(&event, env.payouts.as_ref())?;
            }
            Ok(event)
        });

        let event = match outcome {
            Ok(event) => event,
            Err(error) => {
                tracing::warn!(operation, %error, "Ledger operation rejected");
                metrics::record_rejection(operation, error.kind());
                state.last_outcome = Some(Err(error));
                return SmallVec::new();
            },
        };

        Self::apply_event(state, &event);
        let entry = state.record(event.clone(), replayed_at.unwrap_or_else(|| env.clock.now()));
        state.last_outcome = Some(Ok(event));

        tracing::info!(
            operation,
            sequence = entry.sequence,
            event_type = entry.event.event_type(),
            "Ledger operation committed"
        );
        metrics::record_operation(operation);
        if let LedgerEvent::TicketsPurchased { qty, .. } = entry.event {
            metrics::record_tickets_sold(qty);
        }
        metrics::record_balances(state.sale.escrow_wei(), state.sale.total_sold_outstanding());

        if replay {
            return smallvec![Effect::None];
        }
        smallvec![Self::publish(entry, env)]
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::sale::TicketSale;
    use crate::token::TicketToken;
    use turnstile_core::event_bus::InMemoryEventBus;
    use turnstile_core::primitives::Percentage;
    use turnstile_testing::{RecordingPayouts, ReducerTest, assertions, test_clock};

    const PRICE: Wei = Wei::new(5_000_000_000_000_000);

    fn venue() -> Address {
        Address::from_low_u64(0xa0)
    }
    fn sale_address() -> Address {
        Address::from_low_u64(0x5a1e)
    }
    fn doorman() -> Address {
        Address::from_low_u64(0xd0)
    }
    fn alice() -> Address {
        Address::from_low_u64(1)
    }
    fn bob() -> Address {
        Address::from_low_u64(2)
    }

    fn deployed() -> LedgerState {
        let mut token = TicketToken::new("ShowBird Ticket", "SBT", venue(), 200);
        token.set_sales_contract(venue(), sale_address(), true).unwrap();
        token.set_doorman(venue(), doorman(), true).unwrap();
        let sale =
            TicketSale::new(sale_address(), venue(), PRICE, Percentage::new(80).unwrap()).unwrap();
        LedgerState::new(token, sale)
    }

    fn env_with(payouts: &RecordingPayouts) -> LedgerEnvironment {
        LedgerEnvironment::new(
            Arc::new(test_clock()),
            Arc::new(payouts.clone()),
            Arc::new(InMemoryEventBus::new(16)),
        )
    }

    fn buy(caller: Address, qty: u64) -> LedgerAction {
        LedgerAction::BuyTickets {
            caller,
            qty,
            value: Wei::new(PRICE.get() * u128::from(qty)),
        }
    }

    #[test]
    fn purchase_mints_and_escrows() {
        ReducerTest::new(LedgerReducer::new())
            .with_env(env_with(&RecordingPayouts::new()))
            .given_state(deployed())
            .when_action(buy(alice(), 2))
            .then_state(|state| {
                assert_eq!(state.token.balance_of(&alice()), 2);
                assert_eq!(state.sale.total_purchased_tickets(), 2);
                assert_eq!(state.sale.total_sold_outstanding(), 2);
                assert_eq!(state.sale.escrow_wei(), Wei::new(10_000_000_000_000_000));
                assert_eq!(state.journal.len(), 1);
                assert_eq!(state.journal[0].sequence, 1);
                assert!(matches!(state.last_outcome, Some(Ok(LedgerEvent::TicketsPurchased { .. }))));
            })
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
                assertions::assert_has_future_effect(effects);
            })
            .run();
    }

    #[test]
    fn underpayment_is_rejected_without_effects() {
        ReducerTest::new(LedgerReducer::new())
            .with_env(env_with(&RecordingPayouts::new()))
            .given_state(deployed())
            .when_action(LedgerAction::BuyTickets {
                caller: alice(),
                qty: 2,
                value: PRICE,
            })
            .then_transition(|before, after| {
                assert!(before.same_books(after));
                assert_eq!(before.journal, after.journal);
                assert!(matches!(after.last_outcome, Some(Err(LedgerError::InvalidAmount(_)))));
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn purchase_past_cap_is_rejected() {
        let mut state = deployed();
        state.token = TicketToken::new("ShowBird Ticket", "SBT", venue(), 1);
        state.token.set_sales_contract(venue(), sale_address(), true).unwrap();

        ReducerTest::new(LedgerReducer::new())
            .with_env(env_with(&RecordingPayouts::new()))
            .given_state(state)
            .when_action(buy(alice(), 2))
            .then_state(|state| {
                assert_eq!(
                    state.last_outcome,
                    Some(Err(LedgerError::CapExceeded {
                        cap: 1,
                        total_supply: 0,
                        requested: 2
                    }))
                );
                assert_eq!(state.sale.escrow_wei(), Wei::ZERO);
            })
            .run();
    }

    #[test]
    fn refund_pays_holder_and_burns() {
        let payouts = RecordingPayouts::new();
        let recorded = payouts.clone();

        ReducerTest::new(LedgerReducer::new())
            .with_env(env_with(&payouts))
            .given_state(deployed())
            .given_actions(vec![buy(alice(), 2)])
            .when_action(LedgerAction::RefundTickets {
                caller: alice(),
                qty: 1,
            })
            .then_state(move |state| {
                let refund = Wei::new(4_000_000_000_000_000);
                assert_eq!(recorded.total_paid_to(&alice()), refund);
                assert_eq!(state.token.balance_of(&alice()), 1);
                assert_eq!(state.sale.total_refunded_tickets(), 1);
                assert_eq!(state.sale.total_sold_outstanding(), 1);
                assert_eq!(
                    state.sale.total_revenue_wei(),
                    Wei::new(10_000_000_000_000_000 - refund.get())
                );
            })
            .run();
    }

    #[test]
    fn refund_without_tickets_is_not_owned() {
        ReducerTest::new(LedgerReducer::new())
            .with_env(env_with(&RecordingPayouts::new()))
            .given_state(deployed())
            .given_actions(vec![buy(alice(), 1)])
            .when_action(LedgerAction::RefundTickets {
                caller: bob(),
                qty: 1,
            })
            .then_transition(|before, after| {
                assert!(before.same_books(after));
                assert_eq!(
                    after.last_outcome,
                    Some(Err(LedgerError::InsufficientBalance {
                        holder: bob(),
                        available: 0,
                        requested: 1
                    }))
                );
            })
            .run();
    }

    #[test]
    fn failed_payout_changes_nothing() {
        let payouts = RecordingPayouts::new();
        payouts.reject(alice());

        ReducerTest::new(LedgerReducer::new())
            .with_env(env_with(&payouts))
            .given_state(deployed())
            .given_actions(vec![buy(alice(), 1)])
            .when_action(LedgerAction::RefundTickets {
                caller: alice(),
                qty: 1,
            })
            .then_transition(|before, after| {
                assert!(before.same_books(after));
                assert_eq!(before.journal.len(), after.journal.len());
                assert!(matches!(
                    after.last_outcome,
                    Some(Err(LedgerError::TransferFailure { .. }))
                ));
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn only_doormen_redeem_for_attendees() {
        ReducerTest::new(LedgerReducer::new())
            .with_env(env_with(&RecordingPayouts::new()))
            .given_state(deployed())
            .given_actions(vec![buy(alice(), 1)])
            .when_action(LedgerAction::RedeemTickets {
                caller: bob(),
                attendee: alice(),
                qty: 1,
            })
            .then_transition(|before, after| {
                assert!(before.same_books(after));
                assert_eq!(
                    after.last_outcome,
                    Some(Err(LedgerError::AccessDenied {
                        caller: bob(),
                        required: Capability::Doorman
                    }))
                );
            })
            .run();
    }

    #[test]
    fn doorman_redemption_releases_revenue() {
        ReducerTest::new(LedgerReducer::new())
            .with_env(env_with(&RecordingPayouts::new()))
            .given_state(deployed())
            .given_actions(vec![buy(alice(), 1)])
            .when_action(LedgerAction::RedeemTickets {
                caller: doorman(),
                attendee: alice(),
                qty: 1,
            })
            .then_state(|state| {
                assert_eq!(state.token.balance_of(&alice()), 0);
                assert_eq!(state.sale.total_redeemed(), 1);
                assert_eq!(state.sale.total_sold_outstanding(), 0);
                assert_eq!(state.sale.withdrawable(), PRICE);
            })
            .run();
    }

    #[test]
    fn withdraw_before_redemption_has_nothing() {
        ReducerTest::new(LedgerReducer::new())
            .with_env(env_with(&RecordingPayouts::new()))
            .given_state(deployed())
            .given_actions(vec![buy(alice(), 3)])
            .when_action(LedgerAction::WithdrawFunds {
                caller: venue(),
                to: venue(),
            })
            .then_state(|state| {
                assert_eq!(state.last_outcome, Some(Err(LedgerError::NothingToWithdraw)));
            })
            .run();
    }

    #[test]
    fn only_venue_updates_price() {
        ReducerTest::new(LedgerReducer::new())
            .with_env(env_with(&RecordingPayouts::new()))
            .given_state(deployed())
            .when_action(LedgerAction::UpdatePrice {
                caller: doorman(),
                new_price: Wei::new(1),
            })
            .then_state(|state| {
                assert_eq!(state.sale.price_wei(), PRICE);
                assert!(matches!(
                    state.last_outcome,
                    Some(Err(LedgerError::AccessDenied { required: Capability::Venue, .. }))
                ));
            })
            .run();
    }

    #[test]
    fn zero_price_is_invalid() {
        ReducerTest::new(LedgerReducer::new())
            .with_env(env_with(&RecordingPayouts::new()))
            .given_state(deployed())
            .when_action(LedgerAction::UpdatePrice {
                caller: venue(),
                new_price: Wei::ZERO,
            })
            .then_state(|state| {
                assert!(matches!(state.last_outcome, Some(Err(LedgerError::InvalidAmount(_)))));
            })
            .run();
    }

    #[test]
    fn revoking_doorman_reports_attendee_role() {
        ReducerTest::new(LedgerReducer::new())
            .with_env(env_with(&RecordingPayouts::new()))
            .given_state(deployed())
            .when_action(LedgerAction::SetDoorman {
                caller: venue(),
                address: doorman(),
                enabled: false,
            })
            .then_state(|state| {
                assert!(!state.token.is_doorman(&doorman()));
                assert_eq!(
                    state.last_outcome,
                    Some(Ok(LedgerEvent::RoleChanged {
                        address: doorman(),
                        new_role: Role::Attendee,
                        doorman: false
                    }))
                );
            })
            .run();
    }

    fn entry(sequence: u64, event: LedgerEvent) -> JournalEntry {
        JournalEntry {
            sequence,
            recorded_at: test_clock().now(),
            event,
        }
    }

    #[test]
    fn refunds_pay_back_what_each_holder_paid() {
        let payouts = RecordingPayouts::new();
        let recorded = payouts.clone();
        let tripled = Wei::new(PRICE.get() * 3);

        ReducerTest::new(LedgerReducer::new())
            .with_env(env_with(&payouts))
            .given_state(deployed())
            .given_actions(vec![
                buy(alice(), 1),
                LedgerAction::UpdatePrice {
                    caller: venue(),
                    new_price: tripled,
                },
                LedgerAction::BuyTickets {
                    caller: bob(),
                    qty: 1,
                    value: tripled,
                },
            ])
            .when_action(LedgerAction::RefundTickets {
                caller: bob(),
                qty: 1,
            })
            .then_state(move |state| {
                assert_eq!(recorded.total_paid_to(&bob()), tripled.percent_floor(Percentage::new(80).unwrap()));
                assert_eq!(state.sale.cost_of(&alice()), PRICE);
                assert_eq!(state.sale.cost_of(&bob()), Wei::ZERO);
                assert_eq!(state.sale.outstanding_cost_wei(), PRICE);
            })
            .run();
    }

    #[test]
    fn transfer_moves_cost_basis_with_tickets() {
        ReducerTest::new(LedgerReducer::new())
            .with_env(env_with(&RecordingPayouts::new()))
            .given_state(deployed())
            .given_actions(vec![buy(alice(), 2)])
            .when_action(LedgerAction::TransferTickets {
                caller: alice(),
                to: bob(),
                qty: 1,
            })
            .then_state(|state| {
                assert_eq!(
                    state.last_outcome,
                    Some(Ok(LedgerEvent::TicketsTransferred {
                        from: alice(),
                        to: bob(),
                        qty: 1,
                        cost_basis: PRICE,
                    }))
                );
                assert_eq!(state.sale.cost_of(&alice()), PRICE);
                assert_eq!(state.sale.cost_of(&bob()), PRICE);
            })
            .run();
    }

    #[test]
    fn replay_applies_without_paying() {
        let payouts = RecordingPayouts::new();
        let recorded = payouts.clone();

        ReducerTest::new(LedgerReducer::new())
            .with_env(env_with(&payouts))
            .given_state(deployed())
            .given_actions(vec![buy(alice(), 1)])
            .when_action(LedgerAction::Replay(entry(
                2,
                LedgerEvent::TicketsRefunded {
                    buyer: alice(),
                    qty: 1,
                    refund_amount: Wei::new(4_000_000_000_000_000),
                    cost_basis: PRICE,
                },
            )))
            .then_state(move |state| {
                assert!(recorded.transfers().is_empty());
                assert_eq!(state.sale.total_refunded_tickets(), 1);
                assert_eq!(state.journal.len(), 2);
                assert_eq!(state.journal[1].recorded_at, test_clock().now());
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn replay_rejects_redemption_of_unowned_tickets() {
        ReducerTest::new(LedgerReducer::new())
            .with_env(env_with(&RecordingPayouts::new()))
            .given_state(deployed())
            .when_action(LedgerAction::Replay(entry(
                1,
                LedgerEvent::TicketsRedeemed {
                    attendee: alice(),
                    qty: 5,
                    redeemer: alice(),
                    cost_basis: Wei::ZERO,
                },
            )))
            .then_transition(|before, after| {
                assert!(before.same_books(after));
                assert!(after.journal.is_empty());
                assert!(matches!(
                    after.last_outcome,
                    Some(Err(LedgerError::CorruptJournal { sequence: 1, .. }))
                ));
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn replay_rejects_inflated_refund() {
        ReducerTest::new(LedgerReducer::new())
            .with_env(env_with(&RecordingPayouts::new()))
            .given_state(deployed())
            .given_actions(vec![buy(alice(), 1)])
            .when_action(LedgerAction::Replay(entry(
                2,
                LedgerEvent::TicketsRefunded {
                    buyer: alice(),
                    qty: 1,
                    refund_amount: PRICE,
                    cost_basis: PRICE,
                },
            )))
            .then_transition(|before, after| {
                assert!(before.same_books(after));
                assert!(matches!(
                    after.last_outcome,
                    Some(Err(LedgerError::CorruptJournal { sequence: 2, .. }))
                ));
            })
            .run();
    }

    #[test]
    fn replay_rejects_sequence_gaps() {
        ReducerTest::new(LedgerReducer::new())
            .with_env(env_with(&RecordingPayouts::new()))
            .given_state(deployed())
            .when_action(LedgerAction::Replay(entry(
                3,
                LedgerEvent::TicketsPurchased {
                    buyer: alice(),
                    qty: 1,
                    value: PRICE,
                },
            )))
            .then_state(|state| {
                assert!(state.journal.is_empty());
                assert!(matches!(
                    state.last_outcome,
                    Some(Err(LedgerError::CorruptJournal { sequence: 3, .. }))
                ));
            })
            .run();
    }
}
