//! `SeaORM` entities for the invoicing tables.

pub mod prelude;

pub mod clients;
pub mod groups;
pub mod invoice_transactions;
pub mod invoices;
pub mod rad_user_group;
