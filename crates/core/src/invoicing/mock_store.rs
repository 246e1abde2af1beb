//! In-memory store for engine tests.

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use radbill_shared::types::{
    ClientId, InvoiceId, MembershipId, PageRequest, PageResponse, PriceGroupId,
};
use rust_decimal::Decimal;

use super::error::InvoiceError;
use super::ports::{ClientStore, GroupMembershipStore, InvoiceStore, PriceGroupStore, TransactionStore};
use super::types::{
    Client, ClientStatus, GroupMembership, Invoice, InvoiceFilter, InvoiceStatus,
    InvoiceTransaction, PriceGroup, SubscriptionModel,
};

/// Mock store keeping everything in vectors, counting writes.
#[derive(Default)]
pub struct InMemoryStore {
    clients: Mutex<Vec<Client>>,
    memberships: Mutex<Vec<GroupMembership>>,
    groups: Mutex<Vec<PriceGroup>>,
    invoices: Mutex<Vec<Invoice>>,
    transactions: Mutex<Vec<InvoiceTransaction>>,
    failing_usernames: Mutex<HashSet<String>>,
    fail_transaction_writes: AtomicBool,
    fail_superseding: AtomicBool,
    writes: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_client(&self, username: &str, model: Option<SubscriptionModel>) -> Client {
        let client = Client {
            id: ClientId::new(),
            username: username.to_string(),
            phone_number: Some(format!("+961-{username}")),
            subscription_model: model,
            status: ClientStatus::Active,
        };
        self.clients.lock().unwrap().push(client.clone());
        client
    }

    pub fn add_suspended_client(&self, username: &str) -> Client {
        let client = Client {
            id: ClientId::new(),
            username: username.to_string(),
            phone_number: None,
            subscription_model: Some(SubscriptionModel::Monthly),
            status: ClientStatus::Suspended,
        };
        self.clients.lock().unwrap().push(client.clone());
        client
    }

    pub fn add_group(&self, name: &str, price: Option<Decimal>) {
        self.groups.lock().unwrap().push(PriceGroup {
            id: PriceGroupId::new(),
            name: name.to_string(),
            price,
        });
    }

    pub fn add_membership(&self, username: &str, group_name: &str) {
        self.memberships.lock().unwrap().push(GroupMembership {
            id: MembershipId::new(),
            username: username.to_string(),
            group_name: group_name.to_string(),
        });
    }

    /// Inserts an invoice without counting it as a write.
    pub fn seed_invoice(&self, invoice: Invoice) {
        self.invoices.lock().unwrap().push(invoice);
    }

    /// Makes every membership lookup for `username` fail.
    pub fn fail_lookups_for(&self, username: &str) {
        self.failing_usernames
            .lock()
            .unwrap()
            .insert(username.to_string());
    }

    /// Makes every audit transaction write fail.
    pub fn fail_transaction_writes(&self, fail: bool) {
        self.fail_transaction_writes.store(fail, Ordering::SeqCst);
    }

    /// Makes the second write of `open_invoice` fail.
    pub fn fail_superseding(&self, fail: bool) {
        self.fail_superseding.store(fail, Ordering::SeqCst);
    }

    pub fn invoices_for(&self, client_id: ClientId) -> Vec<Invoice> {
        self.invoices
            .lock()
            .unwrap()
            .iter()
            .filter(|i| i.client_id == client_id)
            .cloned()
            .collect()
    }

    pub fn invoice(&self, id: InvoiceId) -> Option<Invoice> {
        self.invoices.lock().unwrap().iter().find(|i| i.id == id).cloned()
    }

    pub fn transactions(&self) -> Vec<InvoiceTransaction> {
        self.transactions.lock().unwrap().clone()
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

impl ClientStore for InMemoryStore {
    async fn find_active_clients(&self) -> Result<Vec<Client>, InvoiceError> {
        Ok(self
            .clients
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.status == ClientStatus::Active)
            .cloned()
            .collect())
    }
}

impl GroupMembershipStore for InMemoryStore {
    async fn find_memberships_by_username(
        &self,
        username: &str,
    ) -> Result<Vec<GroupMembership>, InvoiceError> {
        if self.failing_usernames.lock().unwrap().contains(username) {
            return Err(InvoiceError::repository("connection reset by peer"));
        }
        Ok(self
            .memberships
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.username == username)
            .cloned()
            .collect())
    }
}

impl PriceGroupStore for InMemoryStore {
    async fn find_price_group_by_name(
        &self,
        name: &str,
    ) -> Result<Option<PriceGroup>, InvoiceError> {
        Ok(self
            .groups
            .lock()
            .unwrap()
            .iter()
            .find(|g| g.name == name)
            .cloned())
    }
}

impl InvoiceStore for InMemoryStore {
    async fn find_open_invoices_for_client(
        &self,
        client_id: ClientId,
        statuses: &[InvoiceStatus],
    ) -> Result<Vec<Invoice>, InvoiceError> {
        let mut invoices: Vec<Invoice> = self
            .invoices_for(client_id)
            .into_iter()
            .filter(|i| statuses.contains(&i.status))
            .collect();
        invoices.sort_by(|a, b| b.generated_at.cmp(&a.generated_at));
        Ok(invoices)
    }

    async fn find_most_recent_for_client(
        &self,
        client_id: ClientId,
    ) -> Result<Option<Invoice>, InvoiceError> {
        Ok(self
            .invoices_for(client_id)
            .into_iter()
            .max_by_key(|i| i.generated_at))
    }

    async fn find_by_client_and_period(
        &self,
        client_id: ClientId,
        period: &str,
    ) -> Result<Vec<Invoice>, InvoiceError> {
        Ok(self
            .invoices_for(client_id)
            .into_iter()
            .filter(|i| i.invoice_period == period)
            .collect())
    }

    async fn save_invoice(&self, invoice: &Invoice) -> Result<Invoice, InvoiceError> {
        let mut invoices = self.invoices.lock().unwrap();
        upsert(&mut invoices, invoice)?;
        drop(invoices);
        self.record_write();
        Ok(invoice.clone())
    }

    async fn open_invoice(
        &self,
        invoice: &Invoice,
        superseded: Option<&Invoice>,
    ) -> Result<Invoice, InvoiceError> {
        let mut invoices = self.invoices.lock().unwrap();
        let mut staged = invoices.clone();

        upsert(&mut staged, invoice)?;
        if let Some(superseded) = superseded {
            if self.fail_superseding.load(Ordering::SeqCst) {
                return Err(InvoiceError::repository("connection reset by peer"));
            }
            upsert(&mut staged, superseded)?;
        }

        *invoices = staged;
        drop(invoices);
        self.record_write();
        Ok(invoice.clone())
    }

    async fn apply_invoice_transaction(
        &self,
        invoice: &Invoice,
        transaction: &InvoiceTransaction,
    ) -> Result<Invoice, InvoiceError> {
        let mut invoices = self.invoices.lock().unwrap();
        let mut staged = invoices.clone();
        upsert(&mut staged, invoice)?;

        if self.fail_transaction_writes.load(Ordering::SeqCst) {
            return Err(InvoiceError::repository("connection reset by peer"));
        }

        *invoices = staged;
        self.transactions.lock().unwrap().push(transaction.clone());
        drop(invoices);
        self.record_write();
        Ok(invoice.clone())
    }

    async fn find_invoice_by_id(&self, id: InvoiceId) -> Result<Option<Invoice>, InvoiceError> {
        Ok(self.invoice(id))
    }

    async fn search_invoices(
        &self,
        filter: &InvoiceFilter,
        page: PageRequest,
    ) -> Result<PageResponse<Invoice>, InvoiceError> {
        let clients = self.clients.lock().unwrap().clone();
        let matches_client = |client_id: ClientId| {
            clients.iter().any(|c| {
                c.id == client_id
                    && filter
                        .username()
                        .is_none_or(|u| c.username.eq_ignore_ascii_case(u))
                    && filter.phone().is_none_or(|p| {
                        c.phone_number
                            .as_deref()
                            .is_some_and(|n| n.eq_ignore_ascii_case(p))
                    })
            })
        };

        let mut found: Vec<Invoice> = self
            .invoices
            .lock()
            .unwrap()
            .iter()
            .filter(|i| filter.status.is_none_or(|s| i.status == s))
            .filter(|i| matches_client(i.client_id))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.generated_at.cmp(&a.generated_at));

        let total = found.len() as u64;
        let data = found
            .into_iter()
            .skip(usize::try_from(page.offset()).unwrap())
            .take(page.per_page as usize)
            .collect();
        Ok(PageResponse::new(data, page.page, page.per_page, total))
    }
}

impl TransactionStore for InMemoryStore {
    async fn save_transaction(
        &self,
        transaction: &InvoiceTransaction,
    ) -> Result<InvoiceTransaction, InvoiceError> {
        if self.fail_transaction_writes.load(Ordering::SeqCst) {
            return Err(InvoiceError::repository("connection reset by peer"));
        }
        self.transactions.lock().unwrap().push(transaction.clone());
        self.record_write();
        Ok(transaction.clone())
    }

    async fn find_transactions_by_invoice(
        &self,
        invoice_id: InvoiceId,
    ) -> Result<Vec<InvoiceTransaction>, InvoiceError> {
        Ok(self
            .transactions
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.invoice_id == invoice_id)
            .cloned()
            .collect())
    }
}

/// Inserts or replaces `invoice`, rejecting a second live invoice for its period.
fn upsert(invoices: &mut Vec<Invoice>, invoice: &Invoice) -> Result<(), InvoiceError> {
    if let Some(existing) = invoices.iter_mut().find(|i| i.id == invoice.id) {
        *existing = invoice.clone();
        return Ok(());
    }

    let duplicate = invoices.iter().any(|i| {
        i.client_id == invoice.client_id
            && i.invoice_period == invoice.invoice_period
            && i.status != InvoiceStatus::CarriedOver
    });
    if duplicate {
        return Err(InvoiceError::DuplicatePeriod {
            client_id: invoice.client_id,
            period: invoice.invoice_period.clone(),
        });
    }
    invoices.push(invoice.clone());
    Ok(())
}
