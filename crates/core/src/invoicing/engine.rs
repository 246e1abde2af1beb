//! Invoice engine.
//!
//! Generates one invoice per client and billing period, rolls unpaid balances
//! and surpluses into the next invoice, and applies payments and adjustments
//! with an audit transaction for each.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use radbill_shared::types::{ClientId, InvoiceId, InvoiceTransactionId, PageRequest, PageResponse};
use radbill_shared::{InvoicingSettings, SettingsHandle};
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, error, info, warn};

use super::error::InvoiceError;
use super::messages::{
    ADJUSTMENT_DONE_BY, CARRIED_OVER_AMOUNT_NOTE, CARRIED_OVER_PAID_AMOUNT_NOTE,
    PAYMENT_RECEIVED_BY, format_amount,
};
use super::period::period_key;
use super::ports::{BillingStore, Clock, CurrentActor, LocalizedMessages};
use super::reconcile::{
    CarryNote, apply_adjustment, apply_payment, ensure_storable, normalize_amount, open_period,
};
use super::types::{
    Client, ClientStatus, Invoice, InvoiceDetails, InvoiceFilter, InvoiceStatus,
    InvoiceTransaction, SweepReport, TransactionType,
};

/// Invoice lifecycle engine.
///
/// Every mutation of a client's invoices runs under that client's lock, so
/// generation, payments and adjustments for one client never interleave.
pub struct InvoiceEngine<S: BillingStore> {
    store: Arc<S>,
    messages: Arc<dyn LocalizedMessages>,
    clock: Arc<dyn Clock>,
    settings: Arc<SettingsHandle>,
    locks: DashMap<ClientId, Arc<Mutex<()>>>,
}

impl<S: BillingStore> InvoiceEngine<S> {
    /// Create a new invoice engine.
    #[must_use]
    pub fn new(
        store: Arc<S>,
        messages: Arc<dyn LocalizedMessages>,
        clock: Arc<dyn Clock>,
        settings: Arc<SettingsHandle>,
    ) -> Self {
        Self {
            store,
            messages,
            clock,
            settings,
            locks: DashMap::new(),
        }
    }

    /// Swaps in a new settings snapshot. A sweep already running keeps the old one.
    pub fn reload_settings(&self, settings: InvoicingSettings) {
        info!(
            start_date = ?settings.start_date,
            timezone = %settings.timezone,
            "invoicing settings reloaded"
        );
        self.settings.replace(settings);
    }

    /// Generates the current period's invoice for every active client.
    ///
    /// Does nothing until the configured start date has passed. A failure for
    /// one client is logged and counted; the sweep moves on to the next.
    ///
    /// # Errors
    ///
    /// Returns an error only if the active clients cannot be listed.
    pub async fn generate_invoices(&self) -> Result<SweepReport, InvoiceError> {
        let settings = self.settings.current();
        let now = self.clock.now();

        if !settings.is_billing_started(now) {
            debug!(start_date = ?settings.start_date, "billing has not started, sweep skipped");
            return Ok(SweepReport::default());
        }

        let clients = self.store.find_active_clients().await?;
        let mut report = SweepReport::default();

        for client in &clients {
            match self.generate_for_client(client, &settings, now).await {
                Ok(Some(_)) => report.generated += 1,
                Ok(None) => report.skipped += 1,
                Err(err) => {
                    warn!(
                        client_id = %client.id,
                        username = %client.username,
                        error = %err,
                        "invoice generation failed"
                    );
                    report.failed += 1;
                }
            }
        }

        info!(
            clients = clients.len(),
            generated = report.generated,
            skipped = report.skipped,
            failed = report.failed,
            "invoice sweep finished"
        );
        Ok(report)
    }

    /// Generates the current period's invoice for one client.
    ///
    /// Returns `None` when the client is skipped: not active, no usable
    /// subscription model, or already invoiced for the period.
    ///
    /// # Errors
    ///
    /// Returns an error if a store operation fails or the resulting total does
    /// not fit storage.
    pub async fn generate_invoice_for_client(
        &self,
        client: &Client,
    ) -> Result<Option<Invoice>, InvoiceError> {
        let settings = self.settings.current();
        self.generate_for_client(client, &settings, self.clock.now())
            .await
    }

    async fn generate_for_client(
        &self,
        client: &Client,
        settings: &InvoicingSettings,
        now: DateTime<Utc>,
    ) -> Result<Option<Invoice>, InvoiceError> {
        if client.status != ClientStatus::Active {
            debug!(client_id = %client.id, "client is not active, not invoiced");
            return Ok(None);
        }

        let Some(model) = client.subscription_model else {
            error!(
                client_id = %client.id,
                username = %client.username,
                "unknown subscription model, invoice not generated"
            );
            return Ok(None);
        };

        let period = period_key(model, settings.local_date(now));
        let _guard = self.lock_client(client.id).await;

        if !self
            .store
            .find_by_client_and_period(client.id, &period)
            .await?
            .is_empty()
        {
            debug!(client_id = %client.id, period = %period, "invoice already generated for period");
            return Ok(None);
        }

        let base_cost = self.period_cost(client).await?;
        let previous = self
            .store
            .find_open_invoices_for_client(client.id, &InvoiceStatus::OPEN)
            .await?
            .into_iter()
            .next();

        let opening = open_period(base_cost, previous.as_ref());
        let note = match opening.note {
            Some(CarryNote::OwedAmount(amount)) => self
                .messages
                .get(CARRIED_OVER_AMOUNT_NOTE, &[format_amount(amount)]),
            Some(CarryNote::PaidAmount(amount)) => self
                .messages
                .get(CARRIED_OVER_PAID_AMOUNT_NOTE, &[format_amount(amount)]),
            None => String::new(),
        };

        let invoice = Invoice {
            id: InvoiceId::new(),
            client_id: client.id,
            total_cost: ensure_storable(opening.total_cost)?,
            paid_amount: opening.paid_amount,
            generated_at: now,
            invoice_period: period,
            note,
            status: opening.status,
        };

        let superseded = previous.as_ref().map(|previous| Invoice {
            status: InvoiceStatus::CarriedOver,
            ..previous.clone()
        });

        let invoice = match self.store.open_invoice(&invoice, superseded.as_ref()).await {
            Ok(saved) => saved,
            Err(InvoiceError::DuplicatePeriod { period, .. }) => {
                debug!(client_id = %client.id, period = %period, "invoice generated concurrently, skipped");
                return Ok(None);
            }
            Err(err) => return Err(err),
        };

        if let Some(previous) = &previous {
            info!(
                client_id = %client.id,
                previous_invoice_id = %previous.id,
                previous_status = %previous.status,
                carry_over = ?opening.note,
                "previous invoice carried over"
            );
        }

        info!(
            client_id = %client.id,
            invoice_id = %invoice.id,
            period = %invoice.invoice_period,
            total_cost = %invoice.total_cost,
            paid_amount = %invoice.paid_amount,
            status = %invoice.status,
            "invoice generated"
        );
        Ok(Some(invoice))
    }

    /// Sum of the prices of every group the client belongs to.
    async fn period_cost(&self, client: &Client) -> Result<Decimal, InvoiceError> {
        let memberships = self
            .store
            .find_memberships_by_username(&client.username)
            .await?;

        let mut total = Decimal::ZERO;
        for membership in &memberships {
            match self
                .store
                .find_price_group_by_name(&membership.group_name)
                .await?
            {
                Some(group) => total += group.price.unwrap_or_default(),
                None => warn!(
                    client_id = %client.id,
                    group = %membership.group_name,
                    "price group not found, counted as zero"
                ),
            }
        }
        Ok(total)
    }

    /// Applies a payment to the client's most recent invoice.
    ///
    /// Zero or negative amounts, and clients without invoices, are a no-op.
    ///
    /// # Errors
    ///
    /// Returns `InvoiceError::InvalidAmount` if the amount or resulting paid
    /// amount does not fit storage, or a store error.
    pub async fn pay_invoice<A>(
        &self,
        client_id: ClientId,
        amount: Decimal,
        actor: &A,
    ) -> Result<(), InvoiceError>
    where
        A: CurrentActor + ?Sized,
    {
        let amount = normalize_amount(amount);
        if amount <= Decimal::ZERO {
            debug!(client_id = %client_id, amount = %amount, "non-positive payment ignored");
            return Ok(());
        }

        let _guard = self.lock_client(client_id).await;

        let Some(mut invoice) = self.store.find_most_recent_for_client(client_id).await? else {
            debug!(client_id = %client_id, "no invoice to pay");
            return Ok(());
        };

        let amount = ensure_storable(amount)?;
        let (paid_amount, status) = apply_payment(&invoice, amount);
        invoice.paid_amount = ensure_storable(paid_amount)?;
        invoice.status = status;

        let transaction =
            self.transaction_for(&invoice, amount, TransactionType::Payment, PAYMENT_RECEIVED_BY, actor);
        let invoice = self
            .store
            .apply_invoice_transaction(&invoice, &transaction)
            .await?;

        info!(
            client_id = %client_id,
            invoice_id = %invoice.id,
            amount = %amount,
            paid_amount = %invoice.paid_amount,
            status = %invoice.status,
            "payment applied"
        );
        Ok(())
    }

    /// Adds a signed amount to an invoice's total cost.
    ///
    /// A missing invoice is a no-op. Zero re-evaluates the status.
    ///
    /// # Errors
    ///
    /// Returns `InvoiceError::InvalidAmount` if the amount or resulting total
    /// does not fit storage, or a store error.
    pub async fn adjust_amount<A>(
        &self,
        invoice_id: InvoiceId,
        amount: Decimal,
        actor: &A,
    ) -> Result<(), InvoiceError>
    where
        A: CurrentActor + ?Sized,
    {
        let amount = normalize_amount(amount);

        let Some(found) = self.store.find_invoice_by_id(invoice_id).await? else {
            debug!(invoice_id = %invoice_id, "no invoice to adjust");
            return Ok(());
        };

        let _guard = self.lock_client(found.client_id).await;

        // Re-read under the lock.
        let Some(mut invoice) = self.store.find_invoice_by_id(invoice_id).await? else {
            return Ok(());
        };

        let amount = ensure_storable(amount)?;
        let (total_cost, status) = apply_adjustment(&invoice, amount);
        invoice.total_cost = ensure_storable(total_cost)?;
        invoice.status = status;

        // Adjustments are recorded with the PAYMENT type.
        let transaction =
            self.transaction_for(&invoice, amount, TransactionType::Payment, ADJUSTMENT_DONE_BY, actor);
        let invoice = self
            .store
            .apply_invoice_transaction(&invoice, &transaction)
            .await?;

        info!(
            invoice_id = %invoice.id,
            amount = %amount,
            total_cost = %invoice.total_cost,
            status = %invoice.status,
            "invoice adjusted"
        );
        Ok(())
    }

    /// Invoices matching `filter`, most recently generated first.
    ///
    /// # Errors
    ///
    /// Returns a store error.
    pub async fn search_invoices(
        &self,
        filter: &InvoiceFilter,
        page: PageRequest,
    ) -> Result<PageResponse<Invoice>, InvoiceError> {
        self.store.search_invoices(filter, page).await
    }

    /// An invoice with its transactions, oldest first.
    ///
    /// # Errors
    ///
    /// Returns a store error.
    pub async fn invoice_details(
        &self,
        invoice_id: InvoiceId,
    ) -> Result<Option<InvoiceDetails>, InvoiceError> {
        let Some(invoice) = self.store.find_invoice_by_id(invoice_id).await? else {
            return Ok(None);
        };
        let transactions = self.store.find_transactions_by_invoice(invoice_id).await?;
        Ok(Some(InvoiceDetails {
            invoice,
            transactions,
        }))
    }

    /// Audit record of `amount` applied to `invoice`, stamped with its new status.
    fn transaction_for<A>(
        &self,
        invoice: &Invoice,
        amount: Decimal,
        transaction_type: TransactionType,
        description_key: &str,
        actor: &A,
    ) -> InvoiceTransaction
    where
        A: CurrentActor + ?Sized,
    {
        InvoiceTransaction {
            id: InvoiceTransactionId::new(),
            invoice_id: invoice.id,
            transaction_amount: amount,
            transaction_type,
            invoice_status: invoice.status,
            transaction_at: self.clock.now(),
            description: self.messages.get(description_key, &[actor.name()]),
        }
    }

    async fn lock_client(&self, client_id: ClientId) -> ClientGuard<'_> {
        let lock = Arc::clone(self.locks.entry(client_id).or_default().value());
        ClientGuard {
            locks: &self.locks,
            client_id,
            guard: Some(lock.lock_owned().await),
        }
    }
}

/// Holds a client's lock. The lock is dropped from the map once nobody else
/// holds or waits on it.
struct ClientGuard<'a> {
    locks: &'a DashMap<ClientId, Arc<Mutex<()>>>,
    client_id: ClientId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for ClientGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.locks
            .remove_if(&self.client_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}
