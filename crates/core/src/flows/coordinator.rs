use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::audit::{AuditCategory, AuditEvent, AuditPhase, AuditSink, NoopAuditSink};
use crate::domain::quote::{DestinationId, ValidatedQuote};
use crate::errors::{Retryable, RunFailure};
use crate::flows::states::{Outcome, RunReport, RunStep};
use crate::ports::{MessageDispatcher, QuoteGenerator};
use crate::retry::RetryPolicy;
use crate::validation::QuoteValidator;

/// Sequences generate → validate → dispatch once per call to [`run`].
///
/// Generation and dispatch are wrapped in the retry policy; validation is
/// not retried and a rejected quote ends the run. Every lower-level error is
/// converted into [`Outcome::Failure`], so `run` itself never fails.
///
/// [`run`]: RunCoordinator::run
pub struct RunCoordinator {
    generator: Arc<dyn QuoteGenerator>,
    dispatcher: Arc<dyn MessageDispatcher>,
    validator: QuoteValidator,
    retry_policy: RetryPolicy,
    destination: DestinationId,
    audit: Arc<dyn AuditSink>,
}

impl RunCoordinator {
    pub fn new(
        generator: Arc<dyn QuoteGenerator>,
        dispatcher: Arc<dyn MessageDispatcher>,
        destination: DestinationId,
    ) -> Self {
        Self {
            generator,
            dispatcher,
            validator: QuoteValidator::default(),
            retry_policy: RetryPolicy::default(),
            destination,
            audit: Arc::new(NoopAuditSink),
        }
    }

    pub fn with_validator(mut self, validator: QuoteValidator) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn with_audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    pub fn destination(&self) -> &DestinationId {
        &self.destination
    }

    pub async fn run(&self) -> RunReport {
        let mut report = RunReport::begin(Uuid::new_v4().to_string());

        info!(
            event_name = "run.started",
            run_id = %report.run_id,
            destination = %self.destination,
            max_attempts = self.retry_policy.max_attempts,
            "mentor run started"
        );
        self.audit.emit(AuditEvent::new(
            &report.run_id,
            "run.started",
            AuditCategory::Run,
            AuditPhase::Started,
        ));

        report.outcome = match self.execute(&mut report).await {
            Ok(()) => Outcome::Success,
            Err(failure) => Outcome::Failure(failure),
        };
        report.finished_at = Utc::now();
        self.record_finish(&report);

        report
    }

    async fn execute(&self, report: &mut RunReport) -> Result<(), RunFailure> {
        let generator = &self.generator;
        let quote = self.with_retry(report, RunStep::Generate, move || generator.generate()).await?;
        info!(
            event_name = "run.quote_generated",
            run_id = %report.run_id,
            quote = quote.text(),
            "generator returned quote"
        );

        let validated = self.validate(report, quote.text())?;
        report.quote = Some(validated.as_str().to_owned());

        let (dispatcher, destination, quote) = (&self.dispatcher, &self.destination, &validated);
        let receipt = self
            .with_retry(report, RunStep::Dispatch, move || dispatcher.dispatch(quote, destination))
            .await?;
        info!(
            event_name = "run.quote_delivered",
            run_id = %report.run_id,
            message_id = receipt.message_id,
            chat_id = %receipt.chat_id,
            delivered_at = %receipt.delivered_at.to_rfc3339(),
            "quote delivered"
        );
        report.receipt = Some(receipt);

        Ok(())
    }

    fn validate(
        &self,
        report: &RunReport,
        text: &str,
    ) -> Result<ValidatedQuote, RunFailure> {
        self.step_started(report, RunStep::Validate, 1);
        match self.validator.validate(text) {
            Ok(validated) => {
                self.step_completed(report, RunStep::Validate, 1);
                Ok(validated)
            }
            Err(validation_error) => {
                self.step_failed(report, RunStep::Validate, 1, &validation_error);
                Err(validation_error.into())
            }
        }
    }

    async fn with_retry<T, E, F, Fut>(
        &self,
        report: &mut RunReport,
        step: RunStep,
        mut operation: F,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + Display,
    {
        let mut attempt = 1;
        loop {
            match step {
                RunStep::Generate => report.generation_attempts = attempt,
                RunStep::Dispatch => report.delivery_attempts = attempt,
                RunStep::Validate => {}
            }
            self.step_started(report, step, attempt);

            let step_error = match operation().await {
                Ok(value) => {
                    self.step_completed(report, step, attempt);
                    return Ok(value);
                }
                Err(step_error) => step_error,
            };

            if !self.retry_policy.should_retry(&step_error, attempt) {
                self.step_failed(report, step, attempt, &step_error);
                return Err(step_error);
            }

            let delay = self.retry_policy.delay_before(attempt + 1);
            report.retries += 1;
            warn!(
                event_name = "run.step.retry_scheduled",
                run_id = %report.run_id,
                step = step.as_str(),
                attempt,
                max_attempts = self.retry_policy.max_attempts,
                error_kind = step_error.kind(),
                error = %step_error,
                delay_ms = delay.as_millis() as u64,
                "step failed with transient error; retry scheduled"
            );
            self.audit.emit(
                AuditEvent::new(
                    &report.run_id,
                    format!("step.{}.retry_scheduled", step.as_str()),
                    step.category(),
                    AuditPhase::RetryScheduled,
                )
                .with_attempt(attempt)
                .with_metadata("error_kind", step_error.kind())
                .with_metadata("delay_ms", delay.as_millis().to_string()),
            );

            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            attempt += 1;
        }
    }

    fn step_started(&self, report: &RunReport, step: RunStep, attempt: u32) {
        info!(
            event_name = "run.step.started",
            run_id = %report.run_id,
            step = step.as_str(),
            attempt,
            "step started"
        );
        self.audit.emit(
            AuditEvent::new(
                &report.run_id,
                format!("step.{}.started", step.as_str()),
                step.category(),
                AuditPhase::Started,
            )
            .with_attempt(attempt),
        );
    }

    fn step_completed(&self, report: &RunReport, step: RunStep, attempt: u32) {
        info!(
            event_name = "run.step.completed",
            run_id = %report.run_id,
            step = step.as_str(),
            attempt,
            "step completed"
        );
        self.audit.emit(
            AuditEvent::new(
                &report.run_id,
                format!("step.{}.completed", step.as_str()),
                step.category(),
                AuditPhase::Completed,
            )
            .with_attempt(attempt),
        );
    }

    fn step_failed<E>(&self, report: &RunReport, step: RunStep, attempt: u32, step_error: &E)
    where
        E: Retryable + Display,
    {
        error!(
            event_name = "run.step.failed",
            run_id = %report.run_id,
            step = step.as_str(),
            attempt,
            error_kind = step_error.kind(),
            transient = step_error.is_transient(),
            error = %step_error,
            "step failed"
        );
        self.audit.emit(
            AuditEvent::new(
                &report.run_id,
                format!("step.{}.failed", step.as_str()),
                step.category(),
                AuditPhase::Failed,
            )
            .with_attempt(attempt)
            .with_metadata("error_kind", step_error.kind())
            .with_metadata("error", step_error.to_string()),
        );
    }

    fn record_finish(&self, report: &RunReport) {
        let duration_ms = (report.finished_at - report.started_at).num_milliseconds();
        match &report.outcome {
            Outcome::Success => {
                info!(
                    event_name = "run.finished",
                    run_id = %report.run_id,
                    outcome = "success",
                    retries = report.retries,
                    duration_ms,
                    "mentor run succeeded"
                );
                self.audit.emit(
                    AuditEvent::new(
                        &report.run_id,
                        "run.finished",
                        AuditCategory::Run,
                        AuditPhase::Completed,
                    )
                    .with_metadata("retries", report.retries.to_string()),
                );
            }
            Outcome::Failure(failure) => {
                error!(
                    event_name = "run.finished",
                    run_id = %report.run_id,
                    outcome = "failure",
                    error_kind = failure.kind(),
                    reason = %failure,
                    retries = report.retries,
                    duration_ms,
                    "mentor run failed"
                );
                self.audit.emit(
                    AuditEvent::new(
                        &report.run_id,
                        "run.finished",
                        AuditCategory::Run,
                        AuditPhase::Failed,
                    )
                    .with_metadata("retries", report.retries.to_string())
                    .with_metadata("error_kind", failure.kind()),
                );
            }
        }
    }
}
