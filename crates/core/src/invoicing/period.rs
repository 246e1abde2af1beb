//! Billing period keys.
//!
//! Every invoice carries the key of the period it bills. The key shape depends
//! on the client's subscription model:
//! - Monthly: `<MONTH NAME>-<year>`, e.g. `JANUARY-2025`
//! - Quarterly: `Q<n>-<year>`, e.g. `Q3-2025`
//! - Yearly: `<year>`, e.g. `2025`

use chrono::{Datelike, Month, NaiveDate};

use super::types::SubscriptionModel;

/// Returns the calendar quarter (1-4) that `date` falls in.
#[must_use]
pub fn quarter_of(date: NaiveDate) -> u32 {
    date.month0() / 3 + 1
}

/// Computes the invoice period key for `date` under `model`.
#[must_use]
pub fn period_key(model: SubscriptionModel, date: NaiveDate) -> String {
    match model {
        SubscriptionModel::Monthly => {
            let month = u8::try_from(date.month())
                .ok()
                .and_then(|m| Month::try_from(m).ok())
                .map_or_else(|| date.month().to_string(), |m| m.name().to_uppercase());
            format!("{month}-{}", date.year())
        }
        SubscriptionModel::Quarterly => format!("Q{}-{}", quarter_of(date), date.year()),
        SubscriptionModel::Yearly => date.year().to_string(),
    }
}
