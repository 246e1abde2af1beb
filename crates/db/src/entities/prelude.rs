pub use super::clients::Entity as Clients;
pub use super::groups::Entity as Groups;
pub use super::invoice_transactions::Entity as InvoiceTransactions;
pub use super::invoices::Entity as Invoices;
pub use super::rad_user_group::Entity as RadUserGroup;
