use chrono::{DateTime, Utc};
use mentor_core::config::{AppConfig, ConfigError, LoadOptions};
use secrecy::ExposeSecret;
use serde::Serialize;

use super::{escape_json, CommandResult, EXIT_RUN_FAILED};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

const DEPENDENT_CHECKS: [&str; 4] = ["credentials", "destination", "schedule", "config_validation"];

/// Offline readiness checks. Nothing here talks to either provider.
pub fn run(options: LoadOptions, json_output: bool) -> CommandResult {
    let report = build_report(options, Utc::now());
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { EXIT_RUN_FAILED };

    if json_output {
        let output = serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
        return CommandResult::plain(exit_code, output);
    }

    CommandResult::plain(exit_code, render_human(&report))
}

fn build_report(options: LoadOptions, now: DateTime<Utc>) -> DoctorReport {
    let mut checks = Vec::new();

    // Each check looks at one area, so a missing chat id does not hide a bad
    // bot token. `config_validation` then covers everything else.
    match AppConfig::load_unvalidated(options) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_load",
                status: CheckStatus::Pass,
                details: "config file and environment parsed".to_string(),
            });
            checks.push(check_credentials(&config));
            checks.push(check_destination(&config));
            checks.push(check_schedule(&config, now));
            checks.push(check_full_validation(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_load",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            checks.extend(DEPENDENT_CHECKS.into_iter().map(|name| DoctorCheck {
                name,
                status: CheckStatus::Skipped,
                details: "skipped because configuration did not load".to_string(),
            }));
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_credentials(config: &AppConfig) -> DoctorCheck {
    match config.validate_credentials() {
        Ok(()) => {
            let bot_id = config
                .telegram
                .bot_token
                .expose_secret()
                .trim()
                .split_once(':')
                .map(|(bot_id, _)| bot_id.to_string())
                .unwrap_or_default();
            DoctorCheck {
                name: "credentials",
                status: CheckStatus::Pass,
                details: format!("gemini api key present; telegram bot id {bot_id}"),
            }
        }
        Err(error) => failed("credentials", error),
    }
}

fn check_destination(config: &AppConfig) -> DoctorCheck {
    match config.validate_destination() {
        Ok(()) => DoctorCheck {
            name: "destination",
            status: CheckStatus::Pass,
            details: format!("quotes go to chat `{}`", config.destination()),
        },
        Err(error) => failed("destination", error),
    }
}

fn check_schedule(config: &AppConfig, now: DateTime<Utc>) -> DoctorCheck {
    match config.schedule.schedule() {
        Ok(schedule) => DoctorCheck {
            name: "schedule",
            status: CheckStatus::Pass,
            details: format!(
                "serve mode fires {schedule}; next run at {}",
                schedule.next_fire(now).format("%Y-%m-%d %H:%M UTC")
            ),
        },
        Err(error) => failed("schedule", error),
    }
}

fn check_full_validation(config: &AppConfig) -> DoctorCheck {
    match config.validate() {
        Ok(()) => DoctorCheck {
            name: "config_validation",
            status: CheckStatus::Pass,
            details: format!(
                "configuration validated; retry policy {} attempts, {}s apart",
                config.retry.max_attempts, config.retry.delay_secs
            ),
        },
        Err(error) => failed("config_validation", error),
    }
}

fn failed(name: &'static str, error: ConfigError) -> DoctorCheck {
    DoctorCheck { name, status: CheckStatus::Fail, details: error.to_string() }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use mentor_core::config::AppConfig;

    use super::{
        check_credentials, check_destination, check_full_validation, check_schedule, CheckStatus,
    };

    fn configured() -> AppConfig {
        let mut config = AppConfig::default();
        config.gemini.api_key = "doctor-key".to_string().into();
        config.telegram.bot_token = "123456:doctor-secret".to_string().into();
        config.telegram.chat_id = "@daily_mentor".to_string();
        config
    }

    #[test]
    fn missing_bot_token_fails_only_the_credentials_check() {
        let mut config = configured();
        config.telegram.bot_token = String::new().into();

        let credentials = check_credentials(&config);
        assert_eq!(credentials.status, CheckStatus::Fail);
        assert!(credentials.details.contains("telegram.bot_token"));

        assert_eq!(check_destination(&config).status, CheckStatus::Pass);
        assert_eq!(check_full_validation(&config).status, CheckStatus::Fail);
    }

    #[test]
    fn malformed_chat_id_fails_the_destination_check() {
        let mut config = configured();
        config.telegram.chat_id = "daily mentor".to_string();

        let destination = check_destination(&config);
        assert_eq!(destination.status, CheckStatus::Fail);
        assert!(destination.details.contains("telegram.chat_id"));
        assert_eq!(check_credentials(&config).status, CheckStatus::Pass);
    }

    #[test]
    fn schedule_check_reports_the_next_run() {
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 8, 0, 0).unwrap();
        let mut config = configured();

        let schedule = check_schedule(&config, now);
        assert_eq!(schedule.status, CheckStatus::Pass);
        assert!(
            schedule.details.contains("next run at 2026-03-11 07:00 UTC"),
            "unexpected details: {}",
            schedule.details
        );

        config.schedule.daily_at = Some("25:00".to_string());
        assert_eq!(check_schedule(&config, now).status, CheckStatus::Fail);
    }

    #[test]
    fn credentials_detail_never_contains_the_secret() {
        let check = check_credentials(&configured());

        assert_eq!(check.status, CheckStatus::Pass);
        assert!(check.details.contains("bot id 123456"));
        assert!(!check.details.contains("doctor-secret"));
    }
}
