//! Immutable invoicing settings and the handle used to swap them.
//!
//! Settings are never mutated in place. Reloading builds a fresh, validated
//! snapshot from configuration and swaps the shared reference, so a sweep that
//! is already running keeps the snapshot it started with.

use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

use crate::config::InvoicingConfig;
use crate::error::{AppError, AppResult};

/// A validated snapshot of the settings the invoice engine reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoicingSettings {
    /// Sweeps are ignored until this instant has passed.
    pub start_date: Option<DateTime<Utc>>,
    /// Time zone billing periods are computed in.
    pub timezone: Tz,
}

impl Default for InvoicingSettings {
    fn default() -> Self {
        Self {
            start_date: None,
            timezone: Tz::UTC,
        }
    }
}

impl InvoicingSettings {
    /// Builds a snapshot from configuration.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Configuration` if the time zone is not a known IANA name.
    pub fn from_config(config: &InvoicingConfig) -> AppResult<Self> {
        let timezone = config.timezone.parse::<Tz>().map_err(|_| {
            AppError::Configuration(format!("unknown time zone: {}", config.timezone))
        })?;

        Ok(Self {
            start_date: config.start_date,
            timezone,
        })
    }

    /// Returns true once the configured start date has passed.
    #[must_use]
    pub fn is_billing_started(&self, now: DateTime<Utc>) -> bool {
        self.start_date.is_none_or(|start| now > start)
    }

    /// Returns the calendar date of `now` in the billing time zone.
    #[must_use]
    pub fn local_date(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.timezone).date_naive()
    }
}

/// Shared reference to the current settings snapshot.
#[derive(Debug, Default)]
pub struct SettingsHandle {
    current: RwLock<Arc<InvoicingSettings>>,
}

impl SettingsHandle {
    /// Creates a handle holding `settings`.
    #[must_use]
    pub fn new(settings: InvoicingSettings) -> Self {
        Self {
            current: RwLock::new(Arc::new(settings)),
        }
    }

    /// Returns the snapshot in effect right now.
    #[must_use]
    pub fn current(&self) -> Arc<InvoicingSettings> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Replaces the snapshot. Readers holding the previous one are unaffected.
    pub fn replace(&self, settings: InvoicingSettings) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(settings);
    }
}
