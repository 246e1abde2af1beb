//! Invoicing schema.
//!
//! Creates the client, group and membership tables the engine reads, and the
//! invoice and transaction tables it writes.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(INVOICING_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(
            r"
DROP TABLE IF EXISTS invoice_transactions CASCADE;
DROP TABLE IF EXISTS invoices CASCADE;
DROP TABLE IF EXISTS rad_user_group CASCADE;
DROP TABLE IF EXISTS groups CASCADE;
DROP TABLE IF EXISTS clients CASCADE;
DROP FUNCTION IF EXISTS prevent_invoice_transaction_mutation();
",
        )
        .await?;
        Ok(())
    }
}

const INVOICING_SQL: &str = r"
-- Billable subscribers
CREATE TABLE clients (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    username VARCHAR(64) NOT NULL UNIQUE,
    phone_number VARCHAR(32),
    subscription_model VARCHAR(16),
    status VARCHAR(16) NOT NULL DEFAULT 'ACTIVE',
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_clients_subscription_model
        CHECK (subscription_model IS NULL OR subscription_model IN ('MONTHLY', 'QUARTERLY', 'YEARLY')),
    CONSTRAINT chk_clients_status CHECK (status IN ('ACTIVE', 'SUSPENDED'))
);

CREATE INDEX idx_clients_status ON clients(status);
CREATE INDEX idx_clients_username_lower ON clients(LOWER(username));
CREATE INDEX idx_clients_phone_lower ON clients(LOWER(phone_number));

-- Priced RADIUS groups
CREATE TABLE groups (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    name VARCHAR(64) NOT NULL UNIQUE,
    price NUMERIC(10, 2),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_groups_price_non_negative CHECK (price IS NULL OR price >= 0)
);

-- Username to group membership
CREATE TABLE rad_user_group (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    username VARCHAR(64) NOT NULL,
    group_name VARCHAR(64) NOT NULL,
    priority INTEGER NOT NULL DEFAULT 1
);

CREATE INDEX idx_rad_user_group_username ON rad_user_group(username);

-- One invoice per client and billing period
CREATE TABLE invoices (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    client_id UUID NOT NULL REFERENCES clients(id) ON DELETE RESTRICT,
    total_cost NUMERIC(10, 2) NOT NULL,
    paid_amount NUMERIC(10, 2) NOT NULL DEFAULT 0,
    generated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    invoice_period VARCHAR(32) NOT NULL,
    note TEXT NOT NULL DEFAULT '',
    status VARCHAR(16) NOT NULL DEFAULT 'PENDING',
    CONSTRAINT chk_invoices_status CHECK (
        status IN ('PENDING', 'PARTIALLY_PAID', 'PAID', 'OVER_PAID', 'CANCELLED', 'CARRIED_OVER')
    )
);

-- At most one live invoice per client and period
CREATE UNIQUE INDEX uq_invoices_client_period_live
    ON invoices(client_id, invoice_period)
    WHERE status <> 'CARRIED_OVER';

-- Most recent invoice per client
CREATE INDEX idx_invoices_client_generated ON invoices(client_id, generated_at DESC);

-- Open invoice lookup
CREATE INDEX idx_invoices_client_status ON invoices(client_id, status, generated_at DESC);

-- Search by status
CREATE INDEX idx_invoices_status_generated ON invoices(status, generated_at DESC);

-- Append-only audit trail
CREATE TABLE invoice_transactions (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    invoice_id UUID NOT NULL REFERENCES invoices(id) ON DELETE RESTRICT,
    transaction_amount NUMERIC(10, 2) NOT NULL,
    transaction_type VARCHAR(16) NOT NULL,
    invoice_status VARCHAR(16) NOT NULL,
    transaction_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    description TEXT NOT NULL DEFAULT '',
    CONSTRAINT chk_invoice_transactions_type CHECK (transaction_type IN ('PAYMENT', 'ADJUSTMENT')),
    CONSTRAINT chk_invoice_transactions_status CHECK (
        invoice_status IN ('PENDING', 'PARTIALLY_PAID', 'PAID', 'OVER_PAID', 'CANCELLED', 'CARRIED_OVER')
    )
);

CREATE INDEX idx_invoice_transactions_invoice ON invoice_transactions(invoice_id, transaction_at);

-- Transactions are never modified
CREATE OR REPLACE FUNCTION prevent_invoice_transaction_mutation()
RETURNS TRIGGER AS $$
BEGIN
    RAISE EXCEPTION 'invoice transactions are append-only';
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_invoice_transactions_immutable
    BEFORE UPDATE OR DELETE ON invoice_transactions
    FOR EACH ROW EXECUTE FUNCTION prevent_invoice_transaction_mutation();
";
