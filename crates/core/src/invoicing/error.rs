//! Invoicing error types.

use radbill_shared::AppError;
use radbill_shared::types::ClientId;
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors that can occur while generating or settling invoices.
#[derive(Debug, Error)]
pub enum InvoiceError {
    /// An invoice for this client and period already exists.
    #[error("invoice already exists for client {client_id} in period {period}")]
    DuplicatePeriod {
        /// Client that was being invoiced.
        client_id: ClientId,
        /// Period key.
        period: String,
    },

    /// Amount cannot be represented in storage.
    #[error("invalid amount: {0}")]
    InvalidAmount(Decimal),

    /// Invoicing settings are invalid.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Repository operation failed.
    #[error("repository error: {0}")]
    Repository(String),
}

impl InvoiceError {
    /// Create a repository error.
    #[must_use]
    pub fn repository(msg: impl Into<String>) -> Self {
        Self::Repository(msg.into())
    }
}

impl From<InvoiceError> for AppError {
    fn from(err: InvoiceError) -> Self {
        match err {
            InvoiceError::DuplicatePeriod { .. } => Self::Conflict(err.to_string()),
            InvoiceError::InvalidAmount(_) => Self::Validation(err.to_string()),
            InvoiceError::Configuration(msg) => Self::Configuration(msg),
            InvoiceError::Repository(msg) => Self::Database(msg),
        }
    }
}
