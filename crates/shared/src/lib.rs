//! Shared types, errors, and configuration for Radbill.
//!
//! This crate provides common types used across all other crates:
//! - Typed IDs for type-safe entity references
//! - Pagination types for list queries
//! - Application-wide error types
//! - Configuration management and the invoicing settings snapshot

pub mod config;
pub mod error;
pub mod settings;
pub mod types;

pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use settings::{InvoicingSettings, SettingsHandle};
