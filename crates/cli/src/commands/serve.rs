use std::future::{self, Future};
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use mentor_core::audit::NoopAuditSink;
use mentor_core::config::{AppConfig, LoadOptions};
use mentor_core::flows::RunCoordinator;
use mentor_core::schedule::Schedule;
use tracing::{info, warn};

use super::{build_runtime, CommandResult, EXIT_CONFIG, EXIT_RUN_FAILED};
use crate::bootstrap::bootstrap_with_config;
use crate::logging::init_logging;

/// Fires runs on the configured schedule until Ctrl-C.
pub fn run(options: LoadOptions) -> CommandResult {
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "serve",
                "config_validation",
                error.to_string(),
                EXIT_CONFIG,
            )
        }
    };
    let schedule = match config.schedule.schedule() {
        Ok(schedule) => schedule,
        Err(error) => {
            return CommandResult::failure(
                "serve",
                "config_validation",
                error.to_string(),
                EXIT_CONFIG,
            )
        }
    };
    init_logging(&config.logging);

    let run_immediately = config.schedule.run_immediately;
    let app = match bootstrap_with_config(config, Arc::new(NoopAuditSink)) {
        Ok(app) => app,
        Err(error) => {
            return CommandResult::failure("serve", "bootstrap", error.to_string(), EXIT_CONFIG)
        }
    };

    let runtime = match build_runtime() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "serve",
                "runtime",
                format!("failed to initialize async runtime: {error}"),
                EXIT_RUN_FAILED,
            )
        }
    };

    let served = runtime.block_on(serve_loop(
        &app.coordinator,
        schedule,
        run_immediately,
        tokio::signal::ctrl_c(),
    ));

    match served {
        Ok(stats) => CommandResult::success(
            "serve",
            format!(
                "scheduler stopped after {} runs ({} succeeded, {} failed)",
                stats.runs, stats.succeeded, stats.failed
            ),
        ),
        Err(error) => CommandResult::failure(
            "serve",
            "shutdown_signal",
            format!("{error:#}"),
            EXIT_RUN_FAILED,
        ),
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ServeStats {
    pub runs: u64,
    pub succeeded: u64,
    pub failed: u64,
}

impl ServeStats {
    fn record(&mut self, success: bool) {
        self.runs += 1;
        if success {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
    }
}

/// Runs are strictly sequential: the next fire time is computed only after
/// the previous run has finished. `shutdown` is only observed between runs,
/// but it is polled before the first run so a signal listener is installed
/// by then.
pub async fn serve_loop<F>(
    coordinator: &RunCoordinator,
    schedule: Schedule,
    run_immediately: bool,
    shutdown: F,
) -> Result<ServeStats>
where
    F: Future<Output = std::io::Result<()>>,
{
    tokio::pin!(shutdown);
    let mut stats = ServeStats::default();

    info!(
        event_name = "system.serve.started",
        schedule = %schedule,
        run_immediately,
        "scheduler started"
    );

    let mut stopped = false;
    if run_immediately {
        tokio::select! {
            biased;
            signal = &mut shutdown => {
                stop_on_signal(signal)?;
                stopped = true;
            }
            _ = future::ready(()) => {
                let report = coordinator.run().await;
                stats.record(report.outcome.is_success());
            }
        }
    }

    while !stopped {
        let now = Utc::now();
        let next_fire = schedule.next_fire(now);
        let delay = schedule.delay_until_next(now);
        info!(
            event_name = "system.serve.next_run",
            next_run_at = %next_fire.to_rfc3339(),
            delay_secs = delay.as_secs(),
            "waiting for next scheduled run"
        );

        tokio::select! {
            biased;
            signal = &mut shutdown => {
                stop_on_signal(signal)?;
                stopped = true;
            }
            _ = tokio::time::sleep(delay) => {
                let report = coordinator.run().await;
                stats.record(report.outcome.is_success());
            }
        }
    }

    info!(
        event_name = "system.serve.stopped",
        runs = stats.runs,
        succeeded = stats.succeeded,
        failed = stats.failed,
        "scheduler stopped"
    );
    Ok(stats)
}

fn stop_on_signal(signal: std::io::Result<()>) -> Result<()> {
    if let Err(error) = signal {
        warn!(
            event_name = "system.serve.signal_error",
            error = %error,
            "shutdown listener failed"
        );
        return Err(error.into());
    }
    Ok(())
}
