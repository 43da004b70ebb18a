use std::sync::Arc;

use mentor_core::audit::{AuditEvent, InMemoryAuditSink};
use mentor_core::config::{AppConfig, LoadOptions};
use mentor_core::flows::{RunReport, RunSummary};
use serde::Serialize;

use super::{build_runtime, CommandResult, EXIT_CONFIG, EXIT_RUN_FAILED};
use crate::bootstrap::bootstrap_with_config;
use crate::logging::init_logging;

#[derive(Debug, Serialize)]
struct RunOutput<'a> {
    command: &'static str,
    #[serde(flatten)]
    summary: RunSummary<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    events: Option<Vec<AuditEvent>>,
}

/// One generate, validate, dispatch pass. Exit code 0 on success, 1 when the
/// run fails, 2 when the config or wiring is unusable.
pub fn run(options: LoadOptions, include_events: bool) -> CommandResult {
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "run",
                "config_validation",
                error.to_string(),
                EXIT_CONFIG,
            )
        }
    };
    init_logging(&config.logging);

    let audit = Arc::new(InMemoryAuditSink::default());
    let app = match bootstrap_with_config(config, audit.clone()) {
        Ok(app) => app,
        Err(error) => {
            return CommandResult::failure("run", "bootstrap", error.to_string(), EXIT_CONFIG)
        }
    };

    let runtime = match build_runtime() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "run",
                "runtime",
                format!("failed to initialize async runtime: {error}"),
                EXIT_RUN_FAILED,
            )
        }
    };

    let report = runtime.block_on(app.coordinator.run());
    render_report(&report, include_events.then(|| audit.events()))
}

pub fn render_report(report: &RunReport, events: Option<Vec<AuditEvent>>) -> CommandResult {
    let exit_code = if report.outcome.is_success() { 0 } else { EXIT_RUN_FAILED };
    let output = RunOutput { command: "run", summary: report.summary(), events };

    match serde_json::to_string(&output) {
        Ok(json) => CommandResult::plain(exit_code, json),
        Err(error) => {
            CommandResult::failure("run", "serialization", error.to_string(), EXIT_RUN_FAILED)
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use mentor_core::domain::quote::DeliveryReceipt;
    use mentor_core::errors::{DeliveryError, RunFailure};
    use mentor_core::flows::{Outcome, RunReport};
    use serde_json::Value;

    use super::render_report;

    fn report(outcome: Outcome) -> RunReport {
        let now = Utc::now();
        RunReport {
            run_id: "run-1".to_string(),
            outcome,
            quote: Some("Ship it.".to_string()),
            generation_attempts: 1,
            delivery_attempts: 1,
            retries: 0,
            receipt: None,
            started_at: now,
            finished_at: now,
        }
    }

    #[test]
    fn successful_run_exits_zero_with_message_id() {
        let mut report = report(Outcome::Success);
        report.receipt = Some(DeliveryReceipt {
            message_id: 42,
            chat_id: "-100200300".to_string(),
            delivered_at: Utc::now(),
        });

        let result = render_report(&report, None);
        let payload: Value = serde_json::from_str(&result.output).expect("valid json");

        assert_eq!(result.exit_code, 0);
        assert_eq!(payload["command"], "run");
        assert_eq!(payload["status"], "success");
        assert_eq!(payload["message_id"], 42);
        assert!(payload.get("events").is_none());
    }

    #[test]
    fn failed_run_exits_one_with_error_kind() {
        let report = report(Outcome::Failure(RunFailure::Delivery(DeliveryError::Unauthorized(
            "Unauthorized".to_string(),
        ))));

        let result = render_report(&report, Some(Vec::new()));
        let payload: Value = serde_json::from_str(&result.output).expect("valid json");

        assert_eq!(result.exit_code, 1);
        assert_eq!(payload["status"], "failure");
        assert_eq!(payload["error_kind"], "delivery.unauthorized");
        assert_eq!(payload["events"], Value::Array(Vec::new()));
    }
}
