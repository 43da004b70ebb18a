use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const QUOTATION_MARKS: &[char] = &['"', '\'', '`', '\u{201C}', '\u{201D}', '\u{2018}', '\u{2019}'];

/// Raw generator output for a single run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    text: String,
}

impl Quote {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// A quote that passed validation. Only the validator can build one, so the
/// dispatcher never sees unchecked text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ValidatedQuote(String);

impl ValidatedQuote {
    pub(crate) fn new(text: String) -> Self {
        Self(text)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ValidatedQuote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DestinationId(pub String);

impl fmt::Display for DestinationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    pub message_id: i64,
    pub chat_id: String,
    pub delivered_at: DateTime<Utc>,
}

/// Strips surrounding whitespace and quotation marks, repeatedly, so
/// `  "“Ship it.”"  ` becomes `Ship it.`.
pub fn normalize_quote_text(raw: &str) -> String {
    let mut current = raw.trim();
    loop {
        let stripped = current.trim_matches(QUOTATION_MARKS).trim();
        if stripped.len() == current.len() {
            return stripped.to_owned();
        }
        current = stripped;
    }
}
