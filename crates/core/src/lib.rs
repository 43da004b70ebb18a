//! Core of the daily mentor automation.
//!
//! Holds everything that does not talk to a provider directly: configuration,
//! the error taxonomy, the quote domain types, the validator, the retry policy,
//! run auditing, and the coordinator that sequences generate → validate →
//! dispatch. Provider adapters live in `mentor-agent` and `mentor-telegram`
//! and plug in through the traits in [`ports`].

pub mod audit;
pub mod config;
pub mod domain;
pub mod errors;
pub mod flows;
pub mod ports;
pub mod retry;
pub mod schedule;
pub mod validation;

pub use audit::{AuditCategory, AuditEvent, AuditPhase, AuditSink, InMemoryAuditSink};
pub use domain::quote::{
    normalize_quote_text, DeliveryReceipt, DestinationId, Quote, ValidatedQuote,
};
pub use errors::{DeliveryError, GenerationError, Retryable, RunFailure, ValidationError};
pub use flows::{Outcome, RunCoordinator, RunReport, RunStep};
pub use ports::{MessageDispatcher, QuoteGenerator};
pub use retry::RetryPolicy;
pub use schedule::Schedule;
pub use validation::{QuoteValidator, ValidationPolicy};
