//! Seams between the invoice engine and the outside world.
//!
//! Store traits are implemented by the db crate. Messages, the acting user and
//! the clock are injected by whoever builds the engine.

use std::future::Future;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use radbill_shared::types::{ClientId, InvoiceId, PageRequest, PageResponse};

use super::error::InvoiceError;
use super::types::{
    Client, GroupMembership, Invoice, InvoiceFilter, InvoiceStatus, InvoiceTransaction, PriceGroup,
};

/// Read access to clients.
pub trait ClientStore: Send + Sync {
    /// All clients whose status is active.
    fn find_active_clients(&self) -> impl Future<Output = Result<Vec<Client>, InvoiceError>> + Send;
}

/// Read access to group memberships.
pub trait GroupMembershipStore: Send + Sync {
    /// Memberships for a username.
    fn find_memberships_by_username(
        &self,
        username: &str,
    ) -> impl Future<Output = Result<Vec<GroupMembership>, InvoiceError>> + Send;
}

/// Read access to price groups.
pub trait PriceGroupStore: Send + Sync {
    /// Price group by its unique name.
    fn find_price_group_by_name(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Option<PriceGroup>, InvoiceError>> + Send;
}

/// Invoice persistence.
pub trait InvoiceStore: Send + Sync {
    /// Client invoices in any of `statuses`, most recently generated first.
    fn find_open_invoices_for_client(
        &self,
        client_id: ClientId,
        statuses: &[InvoiceStatus],
    ) -> impl Future<Output = Result<Vec<Invoice>, InvoiceError>> + Send;

    /// The client's most recently generated invoice, regardless of status.
    fn find_most_recent_for_client(
        &self,
        client_id: ClientId,
    ) -> impl Future<Output = Result<Option<Invoice>, InvoiceError>> + Send;

    /// Every invoice of the client for `period`, whatever its status.
    fn find_by_client_and_period(
        &self,
        client_id: ClientId,
        period: &str,
    ) -> impl Future<Output = Result<Vec<Invoice>, InvoiceError>> + Send;

    /// Inserts or updates an invoice.
    ///
    /// # Errors
    ///
    /// Returns `InvoiceError::DuplicatePeriod` if inserting would create a
    /// second live invoice for the same client and period.
    fn save_invoice(
        &self,
        invoice: &Invoice,
    ) -> impl Future<Output = Result<Invoice, InvoiceError>> + Send;

    /// Inserts `invoice` and saves the invoice it supersedes, in one
    /// transaction. Nothing is written if either write fails.
    ///
    /// # Errors
    ///
    /// Returns `InvoiceError::DuplicatePeriod` if `invoice` would be a second
    /// live invoice for the same client and period.
    fn open_invoice(
        &self,
        invoice: &Invoice,
        superseded: Option<&Invoice>,
    ) -> impl Future<Output = Result<Invoice, InvoiceError>> + Send;

    /// Saves `invoice` and appends `transaction` to its audit trail, in one
    /// transaction. Nothing is written if either write fails.
    fn apply_invoice_transaction(
        &self,
        invoice: &Invoice,
        transaction: &InvoiceTransaction,
    ) -> impl Future<Output = Result<Invoice, InvoiceError>> + Send;

    /// Invoice by ID.
    fn find_invoice_by_id(
        &self,
        id: InvoiceId,
    ) -> impl Future<Output = Result<Option<Invoice>, InvoiceError>> + Send;

    /// Invoices matching `filter`, most recently generated first.
    fn search_invoices(
        &self,
        filter: &InvoiceFilter,
        page: PageRequest,
    ) -> impl Future<Output = Result<PageResponse<Invoice>, InvoiceError>> + Send;
}

/// Append-only transaction persistence.
pub trait TransactionStore: Send + Sync {
    /// Records a transaction.
    fn save_transaction(
        &self,
        transaction: &InvoiceTransaction,
    ) -> impl Future<Output = Result<InvoiceTransaction, InvoiceError>> + Send;

    /// Transactions for an invoice, oldest first.
    fn find_transactions_by_invoice(
        &self,
        invoice_id: InvoiceId,
    ) -> impl Future<Output = Result<Vec<InvoiceTransaction>, InvoiceError>> + Send;
}

/// Everything the engine needs from storage.
pub trait BillingStore:
    ClientStore + GroupMembershipStore + PriceGroupStore + InvoiceStore + TransactionStore
{
}

impl<T> BillingStore for T where
    T: ClientStore + GroupMembershipStore + PriceGroupStore + InvoiceStore + TransactionStore
{
}

/// Localized message lookup.
pub trait LocalizedMessages: Send + Sync {
    /// Renders `key` with positional `args`.
    fn get(&self, key: &str, args: &[String]) -> String;
}

/// The user performing a payment or adjustment.
pub trait CurrentActor: Send + Sync {
    /// Display name recorded on audit transactions.
    fn name(&self) -> String;
}

impl CurrentActor for str {
    fn name(&self) -> String {
        self.to_string()
    }
}

impl CurrentActor for String {
    fn name(&self) -> String {
        self.clone()
    }
}

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to a settable instant.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    /// Creates a clock reading `now`.
    #[must_use]
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Moves the clock to `now`.
    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = now;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
