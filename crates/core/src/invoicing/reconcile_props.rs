//! Property-based tests for balance reconciliation.

use chrono::Utc;
use proptest::prelude::*;
use radbill_shared::types::{ClientId, InvoiceId};
use rust_decimal::Decimal;

use super::reconcile::{
    CarryNote, apply_adjustment, apply_payment, normalize_amount, open_period, settle_status,
};
use super::types::{Invoice, InvoiceStatus};

/// Amounts from 0.00 to 100,000.00.
fn amount() -> impl Strategy<Value = Decimal> {
    (0i64..10_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Amounts from 0.01 to 100,000.00.
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..10_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Signed amounts from -100,000.00 to 100,000.00.
fn signed_amount() -> impl Strategy<Value = Decimal> {
    (-10_000_000i64..10_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn open_status() -> impl Strategy<Value = InvoiceStatus> {
    prop_oneof![
        Just(InvoiceStatus::Pending),
        Just(InvoiceStatus::PartiallyPaid),
        Just(InvoiceStatus::OverPaid),
    ]
}

fn make_invoice(total: Decimal, paid: Decimal, status: InvoiceStatus) -> Invoice {
    Invoice {
        id: InvoiceId::new(),
        client_id: ClientId::new(),
        total_cost: total,
        paid_amount: paid,
        generated_at: Utc::now(),
        invoice_period: "Q1-2025".to_string(),
        note: String::new(),
        status,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Status always agrees with the paid-versus-total comparison.
    #[test]
    fn prop_settle_status_matches_ordering(paid in amount(), total in amount()) {
        let status = settle_status(paid, total);
        prop_assert_eq!(status == InvoiceStatus::Paid, paid == total);
        prop_assert_eq!(status == InvoiceStatus::PartiallyPaid, paid < total);
        prop_assert_eq!(status == InvoiceStatus::OverPaid, paid > total);
    }

    /// Debt and surplus are never carried together, and nothing is lost.
    #[test]
    fn prop_open_period_conserves_balance(
        base in amount(),
        total in amount(),
        paid in amount(),
        status in open_status(),
    ) {
        let previous = make_invoice(total, paid, status);
        let opening = open_period(base, Some(&previous));

        match opening.note {
            Some(CarryNote::OwedAmount(carry)) => {
                prop_assert!(carry > Decimal::ZERO);
                prop_assert_eq!(opening.total_cost, base + carry);
                prop_assert_eq!(opening.paid_amount, Decimal::ZERO);
            }
            Some(CarryNote::PaidAmount(surplus)) => {
                prop_assert!(surplus > Decimal::ZERO);
                prop_assert_eq!(opening.total_cost, base);
                prop_assert_eq!(opening.paid_amount, surplus);
            }
            None => {
                prop_assert_eq!(opening.total_cost, base);
                prop_assert_eq!(opening.paid_amount, Decimal::ZERO);
            }
        }

        // Net position of the new invoice equals the new cost minus the
        // previous balance, whenever the previous balance had a direction that
        // matches its status.
        let previous_balance = total - paid;
        let directional = match status {
            InvoiceStatus::OverPaid => previous_balance < Decimal::ZERO,
            _ => previous_balance > Decimal::ZERO,
        };
        if directional {
            prop_assert_eq!(
                opening.total_cost - opening.paid_amount,
                base + previous_balance
            );
        }
    }

    /// A seeded paid amount always yields a settled status, never `Pending`.
    #[test]
    fn prop_open_period_status(base in amount(), total in amount(), paid in amount()) {
        let previous = make_invoice(total, paid, InvoiceStatus::OverPaid);
        let opening = open_period(base, Some(&previous));

        if opening.paid_amount > Decimal::ZERO {
            prop_assert_eq!(opening.status, settle_status(opening.paid_amount, base));
        } else {
            prop_assert_eq!(opening.status, InvoiceStatus::Pending);
        }
    }

    /// Paying a non-pending invoice accumulates exactly the payment.
    #[test]
    fn prop_payment_accumulates(
        total in amount(),
        paid in amount(),
        payment in positive_amount(),
    ) {
        let invoice = make_invoice(total, paid, settle_status(paid, total));
        let (new_paid, status) = apply_payment(&invoice, payment);

        prop_assert_eq!(new_paid, paid + payment);
        prop_assert_eq!(status, settle_status(new_paid, total));
        prop_assert_ne!(status, InvoiceStatus::Pending);
    }

    /// Adjusting changes only the total and re-derives the status.
    #[test]
    fn prop_adjustment_moves_total(
        total in amount(),
        paid in amount(),
        delta in signed_amount(),
    ) {
        let invoice = make_invoice(total, paid, InvoiceStatus::Pending);
        let (new_total, status) = apply_adjustment(&invoice, delta);

        prop_assert_eq!(new_total, total + delta);
        prop_assert_eq!(status, settle_status(paid, new_total));
    }

    /// Normalised amounts have at most two decimal places and are idempotent.
    #[test]
    fn prop_normalize_is_idempotent(raw in -1_000_000_000i64..1_000_000_000i64, scale in 0u32..6) {
        let value = Decimal::new(raw, scale);
        let once = normalize_amount(value);

        prop_assert!(once.scale() <= 2);
        prop_assert_eq!(normalize_amount(once), once);
    }
}
