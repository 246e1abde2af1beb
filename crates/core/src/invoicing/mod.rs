//! Invoice lifecycle.
//!
//! This module implements billing for RADIUS clients:
//! - Billing period keys per subscription model
//! - Invoice generation with carry-over of unpaid balances and surpluses
//! - Payments and adjustments with an audit transaction for each
//! - Store and collaborator traits implemented outside this crate

pub mod engine;
pub mod error;
pub mod messages;
pub mod period;
pub mod ports;
pub mod reconcile;
pub mod types;

#[cfg(test)]
mod mock_store;
#[cfg(test)]
mod reconcile_props;

pub use engine::InvoiceEngine;
pub use error::InvoiceError;
pub use messages::MessageCatalog;
pub use period::period_key;
pub use ports::{
    BillingStore, ClientStore, Clock, CurrentActor, FixedClock, GroupMembershipStore,
    InvoiceStore, LocalizedMessages, PriceGroupStore, SystemClock, TransactionStore,
};
pub use reconcile::settle_status;
pub use types::{
    Client, ClientStatus, GroupMembership, Invoice, InvoiceDetails, InvoiceFilter, InvoiceStatus,
    InvoiceTransaction, PriceGroup, SubscriptionModel, SweepReport, TransactionType,
};
