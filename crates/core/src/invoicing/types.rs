//! Invoicing domain types.
//!
//! Clients, group memberships and price groups are read-only inputs owned by
//! the RADIUS side of the system. Invoices and their audit transactions are
//! the records this module creates and mutates.

use chrono::{DateTime, Utc};
use radbill_shared::types::{ClientId, InvoiceId, InvoiceTransactionId, MembershipId, PriceGroupId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How often a client is billed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionModel {
    /// One invoice per calendar month.
    Monthly,
    /// One invoice per calendar quarter.
    Quarterly,
    /// One invoice per calendar year.
    Yearly,
}

impl SubscriptionModel {
    /// Returns the stored representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Monthly => "MONTHLY",
            Self::Quarterly => "QUARTERLY",
            Self::Yearly => "YEARLY",
        }
    }

    /// Parses a model from its stored representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "MONTHLY" => Some(Self::Monthly),
            "QUARTERLY" => Some(Self::Quarterly),
            "YEARLY" => Some(Self::Yearly),
            _ => None,
        }
    }
}

impl fmt::Display for SubscriptionModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Account status of a client. Only active clients are invoiced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientStatus {
    /// Client may authenticate and is billed.
    Active,
    /// Client is blocked and not billed.
    Suspended,
}

impl ClientStatus {
    /// Returns the stored representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Suspended => "SUSPENDED",
        }
    }

    /// Parses a status from its stored representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "ACTIVE" => Some(Self::Active),
            "SUSPENDED" => Some(Self::Suspended),
            _ => None,
        }
    }
}

/// A billable subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    /// Client ID.
    pub id: ClientId,
    /// Unique RADIUS username, joins to group memberships.
    pub username: String,
    /// Contact phone number.
    pub phone_number: Option<String>,
    /// Billing cadence. `None` when unset or not a recognised model.
    pub subscription_model: Option<SubscriptionModel>,
    /// Account status.
    pub status: ClientStatus,
}

/// Association between a client's username and a named price group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMembership {
    /// Membership ID.
    pub id: MembershipId,
    /// Client username.
    pub username: String,
    /// Group name.
    pub group_name: String,
}

/// A named RADIUS group carrying a periodic price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceGroup {
    /// Group ID.
    pub id: PriceGroupId,
    /// Unique group name.
    pub name: String,
    /// Price per billing period. Unset prices count as zero.
    pub price: Option<Decimal>,
}

/// Invoice status.
///
/// `Pending` is only the initial default. `Paid`, `PartiallyPaid` and
/// `OverPaid` come from the paid-versus-total comparison. `CarriedOver` is
/// terminal and set when the next period's invoice supersedes this one.
/// `Cancelled` is reserved for external callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    /// Generated, nothing paid yet.
    Pending,
    /// Paid amount is below the total cost.
    PartiallyPaid,
    /// Paid amount equals the total cost.
    Paid,
    /// Paid amount exceeds the total cost.
    OverPaid,
    /// Cancelled by an operator.
    Cancelled,
    /// Superseded by the next period's invoice.
    CarriedOver,
}

impl InvoiceStatus {
    /// Statuses whose balance rolls into the next generated invoice.
    pub const OPEN: [Self; 3] = [Self::PartiallyPaid, Self::Pending, Self::OverPaid];

    /// Returns the stored representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::PartiallyPaid => "PARTIALLY_PAID",
            Self::Paid => "PAID",
            Self::OverPaid => "OVER_PAID",
            Self::Cancelled => "CANCELLED",
            Self::CarriedOver => "CARRIED_OVER",
        }
    }

    /// Parses a status from its stored representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "PENDING" => Some(Self::Pending),
            "PARTIALLY_PAID" => Some(Self::PartiallyPaid),
            "PAID" => Some(Self::Paid),
            "OVER_PAID" => Some(Self::OverPaid),
            "CANCELLED" => Some(Self::Cancelled),
            "CARRIED_OVER" => Some(Self::CarriedOver),
            _ => None,
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One billing period's invoice for a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    /// Invoice ID.
    pub id: InvoiceId,
    /// Billed client.
    pub client_id: ClientId,
    /// Amount owed for the period, including any carried-over balance.
    pub total_cost: Decimal,
    /// Cumulative amount paid or credited against this invoice.
    pub paid_amount: Decimal,
    /// Generation timestamp.
    pub generated_at: DateTime<Utc>,
    /// Billing period key, e.g. `JANUARY-2025`, `Q1-2025` or `2025`.
    pub invoice_period: String,
    /// Carry-over explanation, empty when there is none.
    pub note: String,
    /// Current status.
    pub status: InvoiceStatus,
}

/// Kind of an invoice audit transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    /// Money received.
    Payment,
    /// Change to the amount owed.
    Adjustment,
}

impl TransactionType {
    /// Returns the stored representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Payment => "PAYMENT",
            Self::Adjustment => "ADJUSTMENT",
        }
    }

    /// Parses a type from its stored representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "PAYMENT" => Some(Self::Payment),
            "ADJUSTMENT" => Some(Self::Adjustment),
            _ => None,
        }
    }
}

/// Immutable audit record of a payment or adjustment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceTransaction {
    /// Transaction ID.
    pub id: InvoiceTransactionId,
    /// Invoice the transaction was applied to.
    pub invoice_id: InvoiceId,
    /// The payment amount or adjustment delta, never the running total.
    pub transaction_amount: Decimal,
    /// Transaction kind.
    pub transaction_type: TransactionType,
    /// Invoice status right after the transaction was applied.
    pub invoice_status: InvoiceStatus,
    /// When the transaction was recorded.
    pub transaction_at: DateTime<Utc>,
    /// Who performed the action.
    pub description: String,
}

/// Filter for invoice searches. Empty strings are treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceFilter {
    /// Client username, matched case-insensitively.
    pub username: Option<String>,
    /// Client phone number, matched case-insensitively.
    pub phone: Option<String>,
    /// Invoice status.
    pub status: Option<InvoiceStatus>,
}

impl InvoiceFilter {
    /// Username filter with blanks removed.
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// Phone filter with blanks removed.
    #[must_use]
    pub fn phone(&self) -> Option<&str> {
        self.phone.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

/// An invoice together with its audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceDetails {
    /// The invoice.
    pub invoice: Invoice,
    /// Transactions applied to it, oldest first.
    pub transactions: Vec<InvoiceTransaction>,
}

/// Outcome counts of one generation sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    /// Invoices created.
    pub generated: usize,
    /// Clients skipped (already invoiced, no usable model, not active).
    pub skipped: usize,
    /// Clients whose generation failed.
    pub failed: usize,
}
