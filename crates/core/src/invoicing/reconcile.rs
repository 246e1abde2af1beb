//! Balance reconciliation rules.
//!
//! Pure functions shared by generation, payment and adjustment. They never
//! touch storage; the engine reads state, applies one of these, and writes the
//! result back.

use rust_decimal::{Decimal, RoundingStrategy};

use super::error::InvoiceError;
use super::types::{Invoice, InvoiceStatus};

/// Decimal places money is stored with.
pub const MONEY_SCALE: u32 = 2;

/// Largest magnitude a `numeric(10,2)` column holds.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(1_410_065_407, 2, 0, false, 2);

/// Three-way comparison of paid amount against total cost.
///
/// Equal is `Paid`, below is `PartiallyPaid`, above is `OverPaid`. Never
/// yields `Pending`, `Cancelled` or `CarriedOver`.
#[must_use]
pub fn settle_status(paid_amount: Decimal, total_cost: Decimal) -> InvoiceStatus {
    match paid_amount.cmp(&total_cost) {
        std::cmp::Ordering::Equal => InvoiceStatus::Paid,
        std::cmp::Ordering::Less => InvoiceStatus::PartiallyPaid,
        std::cmp::Ordering::Greater => InvoiceStatus::OverPaid,
    }
}

/// Rounds an incoming amount to storage scale with Banker's Rounding.
#[must_use]
pub fn normalize_amount(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointNearestEven)
}

/// Rejects amounts that do not fit the storage columns.
pub fn ensure_storable(amount: Decimal) -> Result<Decimal, InvoiceError> {
    if amount.abs() > MAX_AMOUNT {
        return Err(InvoiceError::InvalidAmount(amount));
    }
    Ok(amount)
}

/// Why an opening balance differs from the plain period cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarryNote {
    /// Unpaid remainder of the previous invoice added to the total.
    OwedAmount(Decimal),
    /// Surplus of the previous invoice credited as already paid.
    PaidAmount(Decimal),
}

/// Opening state of a newly generated invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opening {
    /// Period cost plus any carried-over debt.
    pub total_cost: Decimal,
    /// Surplus credited from the previous invoice, zero otherwise.
    pub paid_amount: Decimal,
    /// Initial status.
    pub status: InvoiceStatus,
    /// Carry-over explanation, if any.
    pub note: Option<CarryNote>,
}

/// Computes the opening balance of a new invoice.
///
/// `previous` is the client's most recent open invoice, if any. An unpaid
/// remainder of a pending or partially paid invoice is added to the total. The
/// surplus of an over-paid invoice seeds the paid amount. The two never occur
/// together.
#[must_use]
pub fn open_period(base_cost: Decimal, previous: Option<&Invoice>) -> Opening {
    let mut opening = Opening {
        total_cost: base_cost,
        paid_amount: Decimal::ZERO,
        status: InvoiceStatus::Pending,
        note: None,
    };

    let Some(previous) = previous else {
        return opening;
    };

    match previous.status {
        InvoiceStatus::Pending | InvoiceStatus::PartiallyPaid => {
            let carry_over = previous.total_cost - previous.paid_amount;
            if carry_over > Decimal::ZERO {
                opening.total_cost += carry_over;
                opening.note = Some(CarryNote::OwedAmount(carry_over));
            }
        }
        InvoiceStatus::OverPaid => {
            let surplus = previous.paid_amount - previous.total_cost;
            if surplus > Decimal::ZERO {
                opening.paid_amount = surplus;
                opening.note = Some(CarryNote::PaidAmount(surplus));
            }
        }
        _ => {}
    }

    if opening.paid_amount > Decimal::ZERO {
        opening.status = settle_status(opening.paid_amount, opening.total_cost);
    }

    opening
}

/// Returns the paid amount and status after receiving `amount`.
///
/// A pending invoice's paid amount is replaced by the first payment. Any other
/// status accumulates on top of what is already there, which for a freshly
/// generated invoice is the surplus carried from its predecessor.
#[must_use]
pub fn apply_payment(invoice: &Invoice, amount: Decimal) -> (Decimal, InvoiceStatus) {
    let paid_amount = if invoice.status == InvoiceStatus::Pending {
        amount
    } else {
        invoice.paid_amount + amount
    };

    (paid_amount, settle_status(paid_amount, invoice.total_cost))
}

/// Returns the total cost and status after adjusting by the signed `amount`.
#[must_use]
pub fn apply_adjustment(invoice: &Invoice, amount: Decimal) -> (Decimal, InvoiceStatus) {
    let total_cost = invoice.total_cost + amount;
    (total_cost, settle_status(invoice.paid_amount, total_cost))
}
