//! Built-in message catalog for invoice notes and transaction descriptions.

use std::collections::HashMap;

use rust_decimal::Decimal;

use super::ports::LocalizedMessages;

/// Note on an invoice that absorbed the previous invoice's unpaid remainder.
pub const CARRIED_OVER_AMOUNT_NOTE: &str = "generate.invoice.carriedOverAmountNote";
/// Note on an invoice seeded with the previous invoice's surplus.
pub const CARRIED_OVER_PAID_AMOUNT_NOTE: &str = "generate.invoice.carriedOverPaidAmountNote";
/// Description of a payment transaction.
pub const PAYMENT_RECEIVED_BY: &str = "payment.receivedBy";
/// Description of an adjustment transaction.
pub const ADJUSTMENT_DONE_BY: &str = "adjustment.doneBy";

const DEFAULTS: [(&str, &str); 4] = [
    (
        CARRIED_OVER_AMOUNT_NOTE,
        "An amount of {0} was carried over from the previous invoice.",
    ),
    (
        CARRIED_OVER_PAID_AMOUNT_NOTE,
        "A paid amount of {0} was carried over from the previous invoice.",
    ),
    (PAYMENT_RECEIVED_BY, "Payment received by {0}."),
    (ADJUSTMENT_DONE_BY, "Adjustment done by {0}."),
];

/// Formats a money amount the way messages display it.
#[must_use]
pub fn format_amount(amount: Decimal) -> String {
    format!("{amount:.2}")
}

/// English message catalog with `{0}`-style positional placeholders.
#[derive(Debug, Clone)]
pub struct MessageCatalog {
    templates: HashMap<String, String>,
}

impl Default for MessageCatalog {
    fn default() -> Self {
        Self {
            templates: DEFAULTS
                .iter()
                .map(|(key, text)| ((*key).to_string(), (*text).to_string()))
                .collect(),
        }
    }
}

impl MessageCatalog {
    /// Catalog with the built-in English templates.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces templates for the given keys. Unknown keys are added.
    #[must_use]
    pub fn with_overrides<I, K, V>(mut self, overrides: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (key, text) in overrides {
            self.templates.insert(key.into(), text.into());
        }
        self
    }
}

impl LocalizedMessages for MessageCatalog {
    fn get(&self, key: &str, args: &[String]) -> String {
        let Some(template) = self.templates.get(key) else {
            return key.to_string();
        };

        args.iter()
            .enumerate()
            .fold(template.clone(), |text, (i, arg)| {
                text.replace(&format!("{{{i}}}"), arg)
            })
    }
}
