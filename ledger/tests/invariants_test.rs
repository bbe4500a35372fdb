//! Property tests: ledger invariants hold across arbitrary operation sequences.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use proptest::prelude::*;
use std::sync::Arc;
use turnstile_core::event_bus::InMemoryEventBus;
use turnstile_core::primitives::{Address, Percentage, Wei};
use turnstile_core::reducer::Reducer;
use turnstile_ledger::{
    LedgerAction, LedgerEnvironment, LedgerEvent, LedgerReducer, LedgerState, TicketSale,
    TicketToken,
};
use turnstile_testing::{RecordingPayouts, test_clock};

const VENUE: u64 = 0xa0;
const SALE: u64 = 0x5a1e;
const DOORMAN: u64 = 0xd0;

#[derive(Clone, Debug)]
enum Op {
    Buy { who: u64, qty: u64, exact: bool },
    Refund { who: u64, qty: u64 },
    Redeem { doorman: bool, who: u64, qty: u64 },
    SelfRedeem { who: u64, qty: u64 },
    Price { gwei: u64 },
    Withdraw,
    Transfer { from: u64, to: u64, qty: u64 },
    Outage(bool),
}

fn op() -> impl Strategy<Value = Op> {
    let who = 1u64..=4;
    let qty = 0u64..=6;
    prop_oneof![
        4 => (who.clone(), qty.clone(), any::<bool>())
            .prop_map(|(who, qty, exact)| Op::Buy { who, qty, exact: exact || qty % 2 == 0 }),
        2 => (who.clone(), qty.clone()).prop_map(|(who, qty)| Op::Refund { who, qty }),
        2 => (any::<bool>(), who.clone(), qty.clone())
            .prop_map(|(doorman, who, qty)| Op::Redeem { doorman, who, qty }),
        1 => (who.clone(), qty.clone()).prop_map(|(who, qty)| Op::SelfRedeem { who, qty }),
        1 => (0u64..=9_000_001).prop_map(|gwei| Op::Price { gwei }),
        1 => Just(Op::Withdraw),
        1 => (who.clone(), who, qty).prop_map(|(from, to, qty)| Op::Transfer { from, to, qty }),
        1 => any::<bool>().prop_map(Op::Outage),
    ]
}

fn deployed(cap: u64, refund_pct: u8) -> LedgerState {
    let venue = Address::from_low_u64(VENUE);
    let sale_address = Address::from_low_u64(SALE);
    let mut token = TicketToken::new("ShowBird Ticket", "SBT", venue, cap);
    token.set_sales_contract(venue, sale_address, true).unwrap();
    token.set_doorman(venue, Address::from_low_u64(DOORMAN), true).unwrap();
    let sale = TicketSale::new(
        sale_address,
        venue,
        Wei::new(5_000_000_000_000_000),
        Percentage::new(refund_pct).unwrap(),
    )
    .unwrap();
    LedgerState::new(token, sale)
}

fn to_action(op: &Op, state: &LedgerState) -> Option<LedgerAction> {
    let addr = Address::from_low_u64;
    Some(match *op {
        Op::Buy { who, qty, exact } => {
            let price = state.sale.price_wei().checked_mul(qty).unwrap();
            let value = if exact { price } else { Wei::new(price.get() + 1) };
            LedgerAction::BuyTickets {
                caller: addr(who),
                qty,
                value,
            }
        },
        Op::Refund { who, qty } => LedgerAction::RefundTickets {
            caller: addr(who),
            qty,
        },
        Op::Redeem { doorman, who, qty } => LedgerAction::RedeemTickets {
            caller: if doorman { addr(DOORMAN) } else { addr(who) },
            attendee: addr(who),
            qty,
        },
        Op::SelfRedeem { who, qty } => LedgerAction::SelfRedeem {
            caller: addr(who),
            qty,
        },
        Op::Price { gwei } => LedgerAction::UpdatePrice {
            caller: addr(VENUE),
            new_price: Wei::new(u128::from(gwei) * 1_000_000_000),
        },
        Op::Withdraw => LedgerAction::WithdrawFunds {
            caller: addr(VENUE),
            to: addr(VENUE),
        },
        Op::Transfer { from, to, qty } => LedgerAction::TransferTickets {
            caller: addr(from),
            to: addr(to),
            qty,
        },
        Op::Outage(_) => return None,
    })
}

fn paid_in(state: &LedgerState) -> u128 {
    state
        .journal
        .iter()
        .map(|entry| match entry.event {
            LedgerEvent::TicketsPurchased { value, .. } => value.get(),
            _ => 0,
        })
        .sum()
}

fn assert_invariants(state: &LedgerState, payouts: &RecordingPayouts) {
    let sale = &state.sale;

    assert!(
        sale.total_purchased_tickets() >= sale.total_refunded_tickets() + sale.total_redeemed(),
        "outstanding went negative"
    );
    assert_eq!(
        sale.total_sold_outstanding(),
        sale.total_purchased_tickets() - sale.total_refunded_tickets() - sale.total_redeemed()
    );

    let held: u64 = state.token.holders().iter().map(|(_, balance)| balance).sum();
    assert_eq!(held, sale.total_sold_outstanding());
    assert_eq!(state.token.total_supply(), sale.total_sold_outstanding());
    assert!(state.token.total_supply() <= state.token.cap());

    assert!(
        sale.escrow_wei() >= sale.refund_liability_wei(),
        "escrow {} below refund liability {}",
        sale.escrow_wei(),
        sale.refund_liability_wei()
    );
    assert!(sale.withdrawn_wei() <= sale.redeemed_revenue_wei());
    assert!(sale.withdrawable() <= sale.escrow_wei());

    assert_eq!(
        sale.escrow_wei().get() + payouts.total_paid().get(),
        paid_in(state),
        "escrow plus payouts must equal payments received"
    );

    let holders = state.token.holders();
    let basis: u128 = holders.iter().map(|(holder, _)| sale.cost_of(holder).get()).sum();
    assert_eq!(basis, sale.outstanding_cost_wei().get(), "cost bases must sum to outstanding cost");
    for who in 1..=4 {
        let holder = Address::from_low_u64(who);
        if state.token.balance_of(&holder) == 0 {
            assert_eq!(sale.cost_of(&holder), Wei::ZERO, "empty wallet kept a cost basis");
        }
    }
}

/// A refund pays at most the holder's share of what they paid, never someone else's
fn assert_refund_bounded(before: &LedgerState, event: &LedgerEvent) {
    let LedgerEvent::TicketsRefunded { buyer, refund_amount, .. } = *event else {
        return;
    };
    let paid = before.sale.cost_of(&buyer);
    let ceiling = paid.percent_floor(before.sale.refund_percentage());
    assert!(
        refund_amount <= ceiling,
        "refund {refund_amount} exceeds {}% of the {paid} this holder paid",
        before.sale.refund_percentage().get()
    );
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn invariants_hold_for_any_sequence(
        ops in prop::collection::vec(op(), 1..60),
        cap in 1u64..=25,
        refund_pct in 0u8..=100,
    ) {
        let payouts = RecordingPayouts::new();
        let env = LedgerEnvironment::new(
            Arc::new(test_clock()),
            Arc::new(payouts.clone()),
            Arc::new(InMemoryEventBus::new(8)),
        );
        let reducer = LedgerReducer::new();
        let mut state = deployed(cap, refund_pct);

        for op in &ops {
            if let Op::Outage(on) = op {
                if *on {
                    payouts.set_outage("flaky node");
                } else {
                    payouts.clear_outage();
                }
                continue;
            }
            let action = to_action(op, &state).unwrap();
            let before = state.clone();

            let _ = reducer.reduce(&mut state, action, &env);

            match &state.last_outcome {
                Some(Ok(event)) => {
                    prop_assert_eq!(state.journal.len(), before.journal.len() + 1);
                    assert_refund_bounded(&before, event);
                },
                Some(Err(_)) => {
                    prop_assert!(before.same_books(&state));
                    prop_assert_eq!(&before.journal, &state.journal);
                },
                None => prop_assert!(false, "no outcome recorded"),
            }
            assert_invariants(&state, &payouts);
        }
    }

    #[test]
    fn refunds_follow_each_holders_purchase_price(
        first_gwei in 1u64..=9_000_000,
        second_gwei in 1u64..=9_000_000,
        qty in 1u64..=5,
        refund_pct in 0u8..=100,
    ) {
        let payouts = RecordingPayouts::new();
        let env = LedgerEnvironment::new(
            Arc::new(test_clock()),
            Arc::new(payouts.clone()),
            Arc::new(InMemoryEventBus::new(8)),
        );
        let reducer = LedgerReducer::new();
        let mut state = deployed(20, refund_pct);
        let early = Address::from_low_u64(1);
        let late = Address::from_low_u64(2);
        let venue = Address::from_low_u64(VENUE);
        let gwei = |n: u64| Wei::new(u128::from(n) * 1_000_000_000);

        let _ = reducer.reduce(&mut state, LedgerAction::UpdatePrice { caller: venue, new_price: gwei(first_gwei) }, &env);
        let early_cost = gwei(first_gwei).checked_mul(qty).unwrap();
        let _ = reducer.reduce(&mut state, LedgerAction::BuyTickets { caller: early, qty, value: early_cost }, &env);
        let _ = reducer.reduce(&mut state, LedgerAction::UpdatePrice { caller: venue, new_price: gwei(second_gwei) }, &env);
        let late_cost = gwei(second_gwei).checked_mul(qty).unwrap();
        let _ = reducer.reduce(&mut state, LedgerAction::BuyTickets { caller: late, qty, value: late_cost }, &env);
        prop_assert_eq!(state.sale.cost_of(&early), early_cost);
        prop_assert_eq!(state.sale.cost_of(&late), late_cost);

        let _ = reducer.reduce(&mut state, LedgerAction::RefundTickets { caller: late, qty }, &env);
        let _ = reducer.reduce(&mut state, LedgerAction::RefundTickets { caller: early, qty }, &env);

        let pct = u128::from(refund_pct);
        prop_assert_eq!(payouts.total_paid_to(&late).get(), late_cost.get() * pct / 100);
        prop_assert_eq!(payouts.total_paid_to(&early).get(), early_cost.get() * pct / 100);
        prop_assert_eq!(state.sale.outstanding_cost_wei(), Wei::ZERO);
    }

    #[test]
    fn refund_round_trip_pays_the_floor(qty in 1u64..=20, refund_pct in 0u8..=100) {
        let payouts = RecordingPayouts::new();
        let env = LedgerEnvironment::new(
            Arc::new(test_clock()),
            Arc::new(payouts.clone()),
            Arc::new(InMemoryEventBus::new(8)),
        );
        let reducer = LedgerReducer::new();
        let mut state = deployed(20, refund_pct);
        let buyer = Address::from_low_u64(1);
        let cost = state.sale.price_wei().checked_mul(qty).unwrap();

        let _ = reducer.reduce(&mut state, LedgerAction::BuyTickets { caller: buyer, qty, value: cost }, &env);
        let _ = reducer.reduce(&mut state, LedgerAction::RefundTickets { caller: buyer, qty }, &env);

        prop_assert_eq!(state.token.balance_of(&buyer), 0);
        prop_assert_eq!(
            payouts.total_paid_to(&buyer).get(),
            cost.get() * u128::from(refund_pct) / 100
        );
    }
}
