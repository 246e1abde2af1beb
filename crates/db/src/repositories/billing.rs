//! Billing repository for database operations.
//!
//! Implements every store trait of the invoice engine using SeaORM.

use chrono::{DateTime, Utc};
use radbill_core::invoicing::{
    Client, ClientStatus, ClientStore, GroupMembership, GroupMembershipStore, Invoice,
    InvoiceError, InvoiceFilter, InvoiceStatus, InvoiceStore, InvoiceTransaction, PriceGroup,
    PriceGroupStore, SubscriptionModel, TransactionStore, TransactionType,
};
use radbill_shared::types::{
    ClientId, InvoiceId, InvoiceTransactionId, MembershipId, PageRequest, PageResponse,
    PriceGroupId,
};
use sea_orm::sea_query::{Expr, Func, OnConflict};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, JoinType,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set, SqlErr,
    TransactionTrait,
};
use tracing::debug;

use crate::entities::{clients, groups, invoice_transactions, invoices, rad_user_group};

/// PostgreSQL-backed store for clients, groups, invoices and transactions.
#[derive(Debug, Clone)]
pub struct BillingRepository {
    db: DatabaseConnection,
}

impl BillingRepository {
    /// Create a new billing repository.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn repository_error(err: DbErr) -> InvoiceError {
    InvoiceError::repository(err.to_string())
}

impl ClientStore for BillingRepository {
    async fn find_active_clients(&self) -> Result<Vec<Client>, InvoiceError> {
        let models = clients::Entity::find()
            .filter(clients::Column::Status.eq(ClientStatus::Active.as_str()))
            .order_by_asc(clients::Column::Username)
            .all(&self.db)
            .await
            .map_err(repository_error)?;

        models.into_iter().map(client_to_domain).collect()
    }
}

impl GroupMembershipStore for BillingRepository {
    async fn find_memberships_by_username(
        &self,
        username: &str,
    ) -> Result<Vec<GroupMembership>, InvoiceError> {
        let models = rad_user_group::Entity::find()
            .filter(rad_user_group::Column::Username.eq(username))
            .order_by_asc(rad_user_group::Column::Priority)
            .all(&self.db)
            .await
            .map_err(repository_error)?;

        Ok(models
            .into_iter()
            .map(|m| GroupMembership {
                id: MembershipId::from_uuid(m.id),
                username: m.username,
                group_name: m.group_name,
            })
            .collect())
    }
}

impl PriceGroupStore for BillingRepository {
    async fn find_price_group_by_name(
        &self,
        name: &str,
    ) -> Result<Option<PriceGroup>, InvoiceError> {
        let model = groups::Entity::find()
            .filter(groups::Column::Name.eq(name))
            .one(&self.db)
            .await
            .map_err(repository_error)?;

        Ok(model.map(|m| PriceGroup {
            id: PriceGroupId::from_uuid(m.id),
            name: m.name,
            price: m.price,
        }))
    }
}

impl InvoiceStore for BillingRepository {
    async fn find_open_invoices_for_client(
        &self,
        client_id: ClientId,
        statuses: &[InvoiceStatus],
    ) -> Result<Vec<Invoice>, InvoiceError> {
        let models = invoices::Entity::find()
            .filter(invoices::Column::ClientId.eq(client_id.into_inner()))
            .filter(invoices::Column::Status.is_in(statuses.iter().map(InvoiceStatus::as_str)))
            .order_by_desc(invoices::Column::GeneratedAt)
            .all(&self.db)
            .await
            .map_err(repository_error)?;

        models.into_iter().map(invoice_to_domain).collect()
    }

    async fn find_most_recent_for_client(
        &self,
        client_id: ClientId,
    ) -> Result<Option<Invoice>, InvoiceError> {
        let model = invoices::Entity::find()
            .filter(invoices::Column::ClientId.eq(client_id.into_inner()))
            .order_by_desc(invoices::Column::GeneratedAt)
            .one(&self.db)
            .await
            .map_err(repository_error)?;

        model.map(invoice_to_domain).transpose()
    }

    async fn find_by_client_and_period(
        &self,
        client_id: ClientId,
        period: &str,
    ) -> Result<Vec<Invoice>, InvoiceError> {
        let models = invoices::Entity::find()
            .filter(invoices::Column::ClientId.eq(client_id.into_inner()))
            .filter(invoices::Column::InvoicePeriod.eq(period))
            .all(&self.db)
            .await
            .map_err(repository_error)?;

        models.into_iter().map(invoice_to_domain).collect()
    }

    async fn save_invoice(&self, invoice: &Invoice) -> Result<Invoice, InvoiceError> {
        upsert_invoice(&self.db, invoice).await?;
        Ok(invoice.clone())
    }

    async fn open_invoice(
        &self,
        invoice: &Invoice,
        superseded: Option<&Invoice>,
    ) -> Result<Invoice, InvoiceError> {
        let txn = self.db.begin().await.map_err(repository_error)?;

        upsert_invoice(&txn, invoice).await?;
        if let Some(superseded) = superseded {
            upsert_invoice(&txn, superseded).await?;
        }

        txn.commit().await.map_err(repository_error)?;
        Ok(invoice.clone())
    }

    async fn apply_invoice_transaction(
        &self,
        invoice: &Invoice,
        transaction: &InvoiceTransaction,
    ) -> Result<Invoice, InvoiceError> {
        let txn = self.db.begin().await.map_err(repository_error)?;

        upsert_invoice(&txn, invoice).await?;
        insert_transaction(&txn, transaction).await?;

        txn.commit().await.map_err(repository_error)?;
        Ok(invoice.clone())
    }

    async fn find_invoice_by_id(&self, id: InvoiceId) -> Result<Option<Invoice>, InvoiceError> {
        let model = invoices::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(repository_error)?;

        model.map(invoice_to_domain).transpose()
    }

    async fn search_invoices(
        &self,
        filter: &InvoiceFilter,
        page: PageRequest,
    ) -> Result<PageResponse<Invoice>, InvoiceError> {
        let mut query = invoices::Entity::find()
            .join(JoinType::InnerJoin, invoices::Relation::Clients.def());

        if let Some(status) = filter.status {
            query = query.filter(invoices::Column::Status.eq(status.as_str()));
        }
        if let Some(username) = filter.username() {
            query = query.filter(
                Expr::expr(Func::lower(Expr::col((
                    clients::Entity,
                    clients::Column::Username,
                ))))
                .eq(username.to_lowercase()),
            );
        }
        if let Some(phone) = filter.phone() {
            query = query.filter(
                Expr::expr(Func::lower(Expr::col((
                    clients::Entity,
                    clients::Column::PhoneNumber,
                ))))
                .eq(phone.to_lowercase()),
            );
        }

        let total = query
            .clone()
            .count(&self.db)
            .await
            .map_err(repository_error)?;

        let models = query
            .order_by_desc(invoices::Column::GeneratedAt)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .map_err(repository_error)?;

        let data = models
            .into_iter()
            .map(invoice_to_domain)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(PageResponse::new(data, page.page, page.per_page, total))
    }
}

impl TransactionStore for BillingRepository {
    async fn save_transaction(
        &self,
        transaction: &InvoiceTransaction,
    ) -> Result<InvoiceTransaction, InvoiceError> {
        insert_transaction(&self.db, transaction).await?;
        Ok(transaction.clone())
    }

    async fn find_transactions_by_invoice(
        &self,
        invoice_id: InvoiceId,
    ) -> Result<Vec<InvoiceTransaction>, InvoiceError> {
        let models = invoice_transactions::Entity::find()
            .filter(invoice_transactions::Column::InvoiceId.eq(invoice_id.into_inner()))
            .order_by_asc(invoice_transactions::Column::TransactionAt)
            .all(&self.db)
            .await
            .map_err(repository_error)?;

        models.into_iter().map(transaction_to_domain).collect()
    }
}

/// Inserts or updates an invoice on `conn`, which may be a transaction.
async fn upsert_invoice<C: ConnectionTrait>(conn: &C, invoice: &Invoice) -> Result<(), InvoiceError> {
    let active_model = invoices::ActiveModel {
        id: Set(invoice.id.into_inner()),
        client_id: Set(invoice.client_id.into_inner()),
        total_cost: Set(invoice.total_cost),
        paid_amount: Set(invoice.paid_amount),
        generated_at: Set(invoice.generated_at.fixed_offset()),
        invoice_period: Set(invoice.invoice_period.clone()),
        note: Set(invoice.note.clone()),
        status: Set(invoice.status.as_str().to_string()),
    };

    invoices::Entity::insert(active_model)
        .on_conflict(
            OnConflict::column(invoices::Column::Id)
                .update_columns([
                    invoices::Column::TotalCost,
                    invoices::Column::PaidAmount,
                    invoices::Column::Note,
                    invoices::Column::Status,
                ])
                .to_owned(),
        )
        .exec(conn)
        .await
        .map_err(|e| match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => InvoiceError::DuplicatePeriod {
                client_id: invoice.client_id,
                period: invoice.invoice_period.clone(),
            },
            _ => repository_error(e),
        })?;

    debug!(
        invoice_id = %invoice.id,
        status = %invoice.status,
        "invoice saved"
    );
    Ok(())
}

async fn insert_transaction<C: ConnectionTrait>(
    conn: &C,
    transaction: &InvoiceTransaction,
) -> Result<(), InvoiceError> {
    let active_model = invoice_transactions::ActiveModel {
        id: Set(transaction.id.into_inner()),
        invoice_id: Set(transaction.invoice_id.into_inner()),
        transaction_amount: Set(transaction.transaction_amount),
        transaction_type: Set(transaction.transaction_type.as_str().to_string()),
        invoice_status: Set(transaction.invoice_status.as_str().to_string()),
        transaction_at: Set(transaction.transaction_at.fixed_offset()),
        description: Set(transaction.description.clone()),
    };

    invoice_transactions::Entity::insert(active_model)
        .exec(conn)
        .await
        .map_err(repository_error)?;
    Ok(())
}

/// Convert database client to domain client.
fn client_to_domain(model: clients::Model) -> Result<Client, InvoiceError> {
    let status = ClientStatus::parse(&model.status).ok_or_else(|| {
        InvoiceError::repository(format!("unknown client status: {}", model.status))
    })?;

    Ok(Client {
        id: ClientId::from_uuid(model.id),
        username: model.username,
        phone_number: model.phone_number,
        // Unrecognised models surface as `None` and the client is skipped.
        subscription_model: model
            .subscription_model
            .as_deref()
            .and_then(SubscriptionModel::parse),
        status,
    })
}

fn parse_invoice_status(s: &str) -> Result<InvoiceStatus, InvoiceError> {
    InvoiceStatus::parse(s)
        .ok_or_else(|| InvoiceError::repository(format!("unknown invoice status: {s}")))
}

/// Convert database invoice to domain invoice.
fn invoice_to_domain(model: invoices::Model) -> Result<Invoice, InvoiceError> {
    Ok(Invoice {
        id: InvoiceId::from_uuid(model.id),
        client_id: ClientId::from_uuid(model.client_id),
        total_cost: model.total_cost,
        paid_amount: model.paid_amount,
        generated_at: model.generated_at.with_timezone(&Utc),
        invoice_period: model.invoice_period,
        note: model.note,
        status: parse_invoice_status(&model.status)?,
    })
}

/// Convert database transaction to domain transaction.
fn transaction_to_domain(
    model: invoice_transactions::Model,
) -> Result<InvoiceTransaction, InvoiceError> {
    let transaction_type = TransactionType::parse(&model.transaction_type).ok_or_else(|| {
        InvoiceError::repository(format!(
            "unknown transaction type: {}",
            model.transaction_type
        ))
    })?;
    let transaction_at: DateTime<Utc> = model.transaction_at.with_timezone(&Utc);

    Ok(InvoiceTransaction {
        id: InvoiceTransactionId::from_uuid(model.id),
        invoice_id: InvoiceId::from_uuid(model.invoice_id),
        transaction_amount: model.transaction_amount,
        transaction_type,
        invoice_status: parse_invoice_status(&model.invoice_status)?,
        transaction_at,
        description: model.description,
    })
}
