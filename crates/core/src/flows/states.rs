use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::audit::AuditCategory;
use crate::domain::quote::DeliveryReceipt;
use crate::errors::RunFailure;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStep {
    Generate,
    Validate,
    Dispatch,
}

impl RunStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Generate => "generate",
            Self::Validate => "validate",
            Self::Dispatch => "dispatch",
        }
    }

    pub(crate) fn category(&self) -> AuditCategory {
        match self {
            Self::Generate => AuditCategory::Generation,
            Self::Validate => AuditCategory::Validation,
            Self::Dispatch => AuditCategory::Delivery,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure(RunFailure),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    pub fn failure(&self) -> Option<&RunFailure> {
        match self {
            Self::Success => None,
            Self::Failure(reason) => Some(reason),
        }
    }
}

/// Everything an operator needs to know about one run without re-running it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunReport {
    pub run_id: String,
    pub outcome: Outcome,
    pub quote: Option<String>,
    pub generation_attempts: u32,
    pub delivery_attempts: u32,
    pub retries: u32,
    pub receipt: Option<DeliveryReceipt>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    pub(crate) fn begin(run_id: String) -> Self {
        let now = Utc::now();
        Self {
            run_id,
            outcome: Outcome::Success,
            quote: None,
            generation_attempts: 0,
            delivery_attempts: 0,
            retries: 0,
            receipt: None,
            started_at: now,
            finished_at: now,
        }
    }

    pub fn summary(&self) -> RunSummary<'_> {
        RunSummary {
            run_id: &self.run_id,
            status: if self.outcome.is_success() { "success" } else { "failure" },
            error_kind: self.outcome.failure().map(RunFailure::kind),
            reason: self.outcome.failure().map(ToString::to_string),
            quote: self.quote.as_deref(),
            generation_attempts: self.generation_attempts,
            delivery_attempts: self.delivery_attempts,
            retries: self.retries,
            message_id: self.receipt.as_ref().map(|receipt| receipt.message_id),
            duration_ms: (self.finished_at - self.started_at).num_milliseconds(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RunSummary<'a> {
    pub run_id: &'a str,
    pub status: &'static str,
    pub error_kind: Option<&'static str>,
    pub reason: Option<String>,
    pub quote: Option<&'a str>,
    pub generation_attempts: u32,
    pub delivery_attempts: u32,
    pub retries: u32,
    pub message_id: Option<i64>,
    pub duration_ms: i64,
}
