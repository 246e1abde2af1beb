//! Core business logic for Radbill.
//!
//! This crate contains the invoice engine with ZERO web or database dependencies.
//! Persistence is reached only through the store traits in [`invoicing::ports`].
//!
//! # Modules
//!
//! - `invoicing` - Invoice generation, carry-over, payments and adjustments

pub mod invoicing;
