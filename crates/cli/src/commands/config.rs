use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use mentor_core::config::{AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

use super::{CommandResult, EXIT_CONFIG};

/// Prints the effective configuration with the source of every value.
/// Secrets are redacted.
pub fn run(options: LoadOptions) -> CommandResult {
    let config_file_path = detect_config_path(options.config_path.as_deref());
    let overrides = options.overrides.clone();
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::plain(EXIT_CONFIG, format!("config validation failed: {error}"))
        }
    };

    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let sources = SourceLookup { doc: config_file_doc.as_ref(), path: config_file_path.as_deref() };

    let schedule = config
        .schedule
        .schedule()
        .map(|schedule| schedule.to_string())
        .unwrap_or_else(|error| format!("<invalid: {error}>"));

    let fields = [
        field(
            "gemini.api_key",
            &["MENTOR_GEMINI_API_KEY", "GOOGLE_API_KEY"],
            redact_secret(config.gemini.api_key.expose_secret()),
        ),
        field("gemini.base_url", &["MENTOR_GEMINI_BASE_URL"], config.gemini.base_url.clone()),
        field("gemini.model", &["MENTOR_GEMINI_MODEL"], config.gemini.model.clone())
            .overridden_by("--model", overrides.gemini_model.is_some()),
        field(
            "gemini.temperature",
            &["MENTOR_GEMINI_TEMPERATURE"],
            config.gemini.temperature.to_string(),
        ),
        field(
            "gemini.timeout_secs",
            &["MENTOR_GEMINI_TIMEOUT_SECS"],
            config.gemini.timeout_secs.to_string(),
        ),
        field("gemini.prompt", &["MENTOR_GEMINI_PROMPT"], format!("{:?}", config.gemini.prompt)),
        field(
            "telegram.bot_token",
            &["MENTOR_TELEGRAM_BOT_TOKEN", "TELEGRAM_TOKEN"],
            redact_bot_token(config.telegram.bot_token.expose_secret()),
        ),
        field(
            "telegram.chat_id",
            &["MENTOR_TELEGRAM_CHAT_ID", "TELEGRAM_CHAT_ID"],
            config.telegram.chat_id.clone(),
        )
        .overridden_by("--chat-id", overrides.telegram_chat_id.is_some()),
        field("telegram.base_url", &["MENTOR_TELEGRAM_BASE_URL"], config.telegram.base_url.clone()),
        field(
            "telegram.timeout_secs",
            &["MENTOR_TELEGRAM_TIMEOUT_SECS"],
            config.telegram.timeout_secs.to_string(),
        ),
        field(
            "telegram.header",
            &["MENTOR_TELEGRAM_HEADER"],
            format!("{:?}", config.telegram.header),
        )
        .blank_env_counts(),
        field(
            "retry.max_attempts",
            &["MENTOR_RETRY_MAX_ATTEMPTS"],
            config.retry.max_attempts.to_string(),
        ),
        field(
            "retry.delay_secs",
            &["MENTOR_RETRY_DELAY_SECS"],
            config.retry.delay_secs.to_string(),
        ),
        field(
            "validation.max_chars",
            &["MENTOR_VALIDATION_MAX_CHARS"],
            config.validation.max_chars.to_string(),
        ),
        field(
            "validation.error_markers",
            &[],
            format!("{} markers", config.validation.error_markers.len()),
        ),
        field(
            "schedule",
            &["MENTOR_SCHEDULE_INTERVAL_SECS", "MENTOR_SCHEDULE_DAILY_AT"],
            schedule,
        )
        .overridden_by("--interval-secs", overrides.schedule_interval_secs.is_some())
        .overridden_by("--daily-at", overrides.schedule_daily_at.is_some()),
        field(
            "schedule.run_immediately",
            &["MENTOR_SCHEDULE_RUN_IMMEDIATELY"],
            config.schedule.run_immediately.to_string(),
        )
        .overridden_by("--run-immediately", overrides.run_immediately.is_some()),
        field(
            "logging.level",
            &["MENTOR_LOGGING_LEVEL", "MENTOR_LOG_LEVEL"],
            config.logging.level.clone(),
        )
        .overridden_by("--log-level", overrides.log_level.is_some()),
        field(
            "logging.format",
            &["MENTOR_LOGGING_FORMAT", "MENTOR_LOG_FORMAT"],
            format!("{:?}", config.logging.format),
        )
        .overridden_by("--log-format", overrides.log_format.is_some()),
    ];

    let mut lines = vec![
        "effective config (source precedence: override > env > file > default):".to_string(),
    ];
    lines.extend(
        fields
            .into_iter()
            .map(|field| render_line(field.key, &field.value, sources.field_source(&field))),
    );

    CommandResult::plain(0, lines.join("\n"))
}

struct Field {
    key: &'static str,
    env_keys: &'static [&'static str],
    value: String,
    cli_flag: Option<&'static str>,
    blank_env_counts: bool,
}

fn field(key: &'static str, env_keys: &'static [&'static str], value: String) -> Field {
    Field { key, env_keys, value, cli_flag: None, blank_env_counts: false }
}

impl Field {
    fn overridden_by(mut self, flag: &'static str, applied: bool) -> Self {
        if applied {
            self.cli_flag = Some(flag);
        }
        self
    }

    /// The loader keeps an empty value for this key instead of skipping it.
    fn blank_env_counts(mut self) -> Self {
        self.blank_env_counts = true;
        self
    }

    fn env_source(&self) -> Option<&'static str> {
        self.env_keys.iter().copied().find(|key| match env::var(key) {
            Ok(value) => self.blank_env_counts || !value.trim().is_empty(),
            Err(_) => false,
        })
    }
}

struct SourceLookup<'a> {
    doc: Option<&'a Value>,
    path: Option<&'a Path>,
}

impl SourceLookup<'_> {
    /// Same precedence `AppConfig::load` applies: override, env, file, default.
    fn field_source(&self, field: &Field) -> String {
        if let Some(flag) = field.cli_flag {
            return format!("override ({flag})");
        }

        if let Some(env_key) = field.env_source() {
            return format!("env ({env_key})");
        }

        if let Some(doc) = self.doc {
            if contains_path(doc, field.key) {
                let file_path = self
                    .path
                    .map(|path| path.display().to_string())
                    .unwrap_or_else(|| "config file".to_string());
                return format!("file ({file_path})");
            }
        }

        "default".to_string()
    }
}

fn detect_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }

    [PathBuf::from("mentor.toml"), PathBuf::from("config/mentor.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn redact_secret(secret: &str) -> String {
    if secret.trim().is_empty() {
        "<empty>".to_string()
    } else {
        "<redacted>".to_string()
    }
}

/// Keeps the public bot id, hides the secret half.
fn redact_bot_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((bot_id, _)) = trimmed.split_once(':') {
        return format!("{bot_id}:***");
    }

    "<redacted>".to_string()
}
