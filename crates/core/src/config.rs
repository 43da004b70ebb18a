use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::quote::DestinationId;
use crate::retry::{RetryPolicy, DEFAULT_DELAY_SECS, DEFAULT_MAX_ATTEMPTS};
use crate::schedule::Schedule;
use crate::validation::{
    quote_char_budget, ValidationPolicy, DEFAULT_ERROR_MARKERS, DEFAULT_MAX_CHARS,
};

pub const DEFAULT_PROMPT: &str =
    "Create 1 short, punchy motivational quote for a programmer. Just the quote, no intro text.";
pub const DEFAULT_DAILY_AT: &str = "07:00";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub gemini: GeminiConfig,
    pub telegram: TelegramConfig,
    pub retry: RetryConfig,
    pub validation: ValidationConfig,
    pub schedule: ScheduleConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct GeminiConfig {
    pub api_key: SecretString,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub timeout_secs: u64,
    pub prompt: String,
}

#[derive(Clone, Debug)]
pub struct TelegramConfig {
    pub bot_token: SecretString,
    pub chat_id: String,
    pub base_url: String,
    pub timeout_secs: u64,
    pub header: String,
}

#[derive(Clone, Debug)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub delay_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ValidationConfig {
    pub max_chars: usize,
    pub error_markers: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct ScheduleConfig {
    pub interval_secs: Option<u64>,
    pub daily_at: Option<String>,
    pub run_immediately: bool,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub gemini_model: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub schedule_interval_secs: Option<u64>,
    pub schedule_daily_at: Option<String>,
    pub run_immediately: Option<bool>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            gemini: GeminiConfig {
                api_key: String::new().into(),
                base_url: "https://generativelanguage.googleapis.com".to_string(),
                model: "gemini-2.5-flash".to_string(),
                temperature: 0.7,
                timeout_secs: 30,
                prompt: DEFAULT_PROMPT.to_string(),
            },
            telegram: TelegramConfig {
                bot_token: String::new().into(),
                chat_id: String::new(),
                base_url: "https://api.telegram.org".to_string(),
                timeout_secs: 30,
                header: "Daily Mentor".to_string(),
            },
            retry: RetryConfig {
                max_attempts: DEFAULT_MAX_ATTEMPTS,
                delay_secs: DEFAULT_DELAY_SECS,
            },
            validation: ValidationConfig {
                max_chars: DEFAULT_MAX_CHARS,
                error_markers: DEFAULT_ERROR_MARKERS
                    .iter()
                    .map(|marker| (*marker).to_string())
                    .collect(),
            },
            schedule: ScheduleConfig { interval_secs: None, daily_at: None, run_immediately: false },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let config = Self::load_unvalidated(options)?;
        config.validate()?;
        Ok(config)
    }

    /// Applies every layer but skips `validate`, so callers can report each
    /// problem separately.
    pub fn load_unvalidated(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("mentor.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);

        Ok(config)
    }

    pub fn destination(&self) -> DestinationId {
        DestinationId(self.telegram.chat_id.trim().to_string())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry.max_attempts, Duration::from_secs(self.retry.delay_secs))
    }

    pub fn validation_policy(&self) -> ValidationPolicy {
        ValidationPolicy {
            max_chars: self.validation.max_chars,
            error_markers: self.validation.error_markers.clone(),
        }
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(gemini) = patch.gemini {
            if let Some(gemini_api_key_value) = gemini.api_key {
                self.gemini.api_key = secret_value(gemini_api_key_value);
            }
            if let Some(base_url) = gemini.base_url {
                self.gemini.base_url = base_url;
            }
            if let Some(model) = gemini.model {
                self.gemini.model = model;
            }
            if let Some(temperature) = gemini.temperature {
                self.gemini.temperature = temperature;
            }
            if let Some(timeout_secs) = gemini.timeout_secs {
                self.gemini.timeout_secs = timeout_secs;
            }
            if let Some(prompt) = gemini.prompt {
                self.gemini.prompt = prompt;
            }
        }

        if let Some(telegram) = patch.telegram {
            if let Some(telegram_bot_token_value) = telegram.bot_token {
                self.telegram.bot_token = secret_value(telegram_bot_token_value);
            }
            if let Some(chat_id) = telegram.chat_id {
                self.telegram.chat_id = chat_id;
            }
            if let Some(base_url) = telegram.base_url {
                self.telegram.base_url = base_url;
            }
            if let Some(timeout_secs) = telegram.timeout_secs {
                self.telegram.timeout_secs = timeout_secs;
            }
            if let Some(header) = telegram.header {
                self.telegram.header = header;
            }
        }

        if let Some(retry) = patch.retry {
            if let Some(max_attempts) = retry.max_attempts {
                self.retry.max_attempts = max_attempts;
            }
            if let Some(delay_secs) = retry.delay_secs {
                self.retry.delay_secs = delay_secs;
            }
        }

        if let Some(validation) = patch.validation {
            if let Some(max_chars) = validation.max_chars {
                self.validation.max_chars = max_chars;
            }
            if let Some(error_markers) = validation.error_markers {
                self.validation.error_markers = error_markers;
            }
        }

        if let Some(schedule) = patch.schedule {
            if let Some(interval_secs) = schedule.interval_secs {
                self.schedule.interval_secs = Some(interval_secs);
            }
            if let Some(daily_at) = schedule.daily_at {
                self.schedule.daily_at = Some(daily_at);
            }
            if let Some(run_immediately) = schedule.run_immediately {
                self.schedule.run_immediately = run_immediately;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env_any(&["MENTOR_GEMINI_API_KEY", "GOOGLE_API_KEY"]) {
            self.gemini.api_key = secret_value(value);
        }
        if let Some(value) = read_env("MENTOR_GEMINI_BASE_URL") {
            self.gemini.base_url = value;
        }
        if let Some(value) = read_env("MENTOR_GEMINI_MODEL") {
            self.gemini.model = value;
        }
        if let Some(value) = read_env("MENTOR_GEMINI_TEMPERATURE") {
            self.gemini.temperature = parse_f32("MENTOR_GEMINI_TEMPERATURE", &value)?;
        }
        if let Some(value) = read_env("MENTOR_GEMINI_TIMEOUT_SECS") {
            self.gemini.timeout_secs = parse_u64("MENTOR_GEMINI_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("MENTOR_GEMINI_PROMPT") {
            self.gemini.prompt = value;
        }

        if let Some(value) = read_env_any(&["MENTOR_TELEGRAM_BOT_TOKEN", "TELEGRAM_TOKEN"]) {
            self.telegram.bot_token = secret_value(value);
        }
        if let Some(value) = read_env_any(&["MENTOR_TELEGRAM_CHAT_ID", "TELEGRAM_CHAT_ID"]) {
            self.telegram.chat_id = value;
        }
        if let Some(value) = read_env("MENTOR_TELEGRAM_BASE_URL") {
            self.telegram.base_url = value;
        }
        if let Some(value) = read_env("MENTOR_TELEGRAM_TIMEOUT_SECS") {
            self.telegram.timeout_secs = parse_u64("MENTOR_TELEGRAM_TIMEOUT_SECS", &value)?;
        }
        if let Ok(value) = env::var("MENTOR_TELEGRAM_HEADER") {
            self.telegram.header = value;
        }

        if let Some(value) = read_env("MENTOR_RETRY_MAX_ATTEMPTS") {
            self.retry.max_attempts = parse_u32("MENTOR_RETRY_MAX_ATTEMPTS", &value)?;
        }
        if let Some(value) = read_env("MENTOR_RETRY_DELAY_SECS") {
            self.retry.delay_secs = parse_u64("MENTOR_RETRY_DELAY_SECS", &value)?;
        }

        if let Some(value) = read_env("MENTOR_VALIDATION_MAX_CHARS") {
            self.validation.max_chars = parse_usize("MENTOR_VALIDATION_MAX_CHARS", &value)?;
        }

        if let Some(value) = read_env("MENTOR_SCHEDULE_INTERVAL_SECS") {
            self.schedule.interval_secs =
                Some(parse_u64("MENTOR_SCHEDULE_INTERVAL_SECS", &value)?);
        }
        if let Some(value) = read_env("MENTOR_SCHEDULE_DAILY_AT") {
            self.schedule.daily_at = Some(value);
        }
        if let Some(value) = read_env("MENTOR_SCHEDULE_RUN_IMMEDIATELY") {
            self.schedule.run_immediately =
                parse_bool("MENTOR_SCHEDULE_RUN_IMMEDIATELY", &value)?;
        }

        if let Some(value) = read_env_any(&["MENTOR_LOGGING_LEVEL", "MENTOR_LOG_LEVEL"]) {
            self.logging.level = value;
        }
        if let Some(value) = read_env_any(&["MENTOR_LOGGING_FORMAT", "MENTOR_LOG_FORMAT"]) {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
        if let Some(gemini_model) = overrides.gemini_model {
            self.gemini.model = gemini_model;
        }
        if let Some(telegram_chat_id) = overrides.telegram_chat_id {
            self.telegram.chat_id = telegram_chat_id;
        }
        // A CLI schedule flag replaces whichever schedule the file or env chose.
        if let Some(interval_secs) = overrides.schedule_interval_secs {
            self.schedule.interval_secs = Some(interval_secs);
            self.schedule.daily_at = None;
        }
        if let Some(daily_at) = overrides.schedule_daily_at {
            self.schedule.daily_at = Some(daily_at);
            self.schedule.interval_secs = None;
        }
        if let Some(run_immediately) = overrides.run_immediately {
            self.schedule.run_immediately = run_immediately;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_credentials()?;
        self.validate_destination()?;
        validate_gemini(&self.gemini)?;
        validate_telegram(&self.telegram)?;
        validate_retry(&self.retry)?;
        validate_validation(&self.validation, &self.telegram)?;
        self.schedule.schedule()?;
        validate_logging(&self.logging)?;
        Ok(())
    }

    pub fn validate_credentials(&self) -> Result<(), ConfigError> {
        validate_api_key(&self.gemini)?;
        validate_bot_token(&self.telegram)
    }

    pub fn validate_destination(&self) -> Result<(), ConfigError> {
        validate_chat_id(&self.telegram)
    }
}

impl ScheduleConfig {
    pub fn schedule(&self) -> Result<Schedule, ConfigError> {
        match (self.interval_secs, self.daily_at.as_deref()) {
            (Some(_), Some(_)) => Err(ConfigError::Validation(
                "schedule.interval_secs and schedule.daily_at are mutually exclusive".to_string(),
            )),
            (Some(0), None) => Err(ConfigError::Validation(
                "schedule.interval_secs must be greater than zero".to_string(),
            )),
            (Some(interval_secs), None) => {
                Ok(Schedule::Interval(Duration::from_secs(interval_secs)))
            }
            (None, daily_at) => {
                let value = daily_at.unwrap_or(DEFAULT_DAILY_AT);
                Schedule::parse_daily_at(value).map(Schedule::DailyAt).ok_or_else(|| {
                    ConfigError::Validation(format!(
                        "schedule.daily_at must be a 24h `HH:MM` time in UTC, got `{value}`"
                    ))
                })
            }
        }
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("mentor.toml"), PathBuf::from("config/mentor.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_http_url(key: &str, value: &str) -> Result<(), ConfigError> {
    if !value.starts_with("http://") && !value.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{key} must start with http:// or https://"
        )));
    }
    Ok(())
}

fn validate_timeout(key: &str, timeout_secs: u64) -> Result<(), ConfigError> {
    if timeout_secs == 0 || timeout_secs > 300 {
        return Err(ConfigError::Validation(format!("{key} must be in range 1..=300")));
    }
    Ok(())
}

fn validate_api_key(gemini: &GeminiConfig) -> Result<(), ConfigError> {
    if gemini.api_key.expose_secret().trim().is_empty() {
        return Err(ConfigError::Validation(
            "gemini.api_key is required (env MENTOR_GEMINI_API_KEY or GOOGLE_API_KEY). Get one from https://aistudio.google.com/app/apikey".to_string(),
        ));
    }
    Ok(())
}

fn validate_gemini(gemini: &GeminiConfig) -> Result<(), ConfigError> {
    validate_http_url("gemini.base_url", gemini.base_url.trim())?;
    validate_timeout("gemini.timeout_secs", gemini.timeout_secs)?;

    if gemini.model.trim().is_empty() {
        return Err(ConfigError::Validation("gemini.model must not be empty".to_string()));
    }
    if !(0.0..=2.0).contains(&gemini.temperature) {
        return Err(ConfigError::Validation(
            "gemini.temperature must be in range 0.0..=2.0".to_string(),
        ));
    }
    if gemini.prompt.trim().is_empty() {
        return Err(ConfigError::Validation("gemini.prompt must not be empty".to_string()));
    }

    Ok(())
}

fn validate_bot_token(telegram: &TelegramConfig) -> Result<(), ConfigError> {
    let bot_token = telegram.bot_token.expose_secret().trim();
    if bot_token.is_empty() {
        return Err(ConfigError::Validation(
            "telegram.bot_token is required (env MENTOR_TELEGRAM_BOT_TOKEN or TELEGRAM_TOKEN). Get it from @BotFather".to_string(),
        ));
    }
    let well_formed = bot_token
        .split_once(':')
        .map(|(bot_id, secret)| {
            !bot_id.is_empty()
                && bot_id.bytes().all(|byte| byte.is_ascii_digit())
                && !secret.is_empty()
        })
        .unwrap_or(false);
    if !well_formed {
        return Err(ConfigError::Validation(
            "telegram.bot_token must look like `<bot id>:<secret>` as issued by @BotFather"
                .to_string(),
        ));
    }
    Ok(())
}

fn validate_chat_id(telegram: &TelegramConfig) -> Result<(), ConfigError> {
    let chat_id = telegram.chat_id.trim();
    if chat_id.is_empty() {
        return Err(ConfigError::Validation(
            "telegram.chat_id is required (env MENTOR_TELEGRAM_CHAT_ID or TELEGRAM_CHAT_ID)"
                .to_string(),
        ));
    }
    let numeric = chat_id.strip_prefix('-').unwrap_or(chat_id);
    let valid_chat_id = (!numeric.is_empty() && numeric.bytes().all(|byte| byte.is_ascii_digit()))
        || (chat_id.len() > 1 && chat_id.starts_with('@'));
    if !valid_chat_id {
        return Err(ConfigError::Validation(format!(
            "telegram.chat_id must be a numeric chat id or an `@channel` username, got `{chat_id}`"
        )));
    }
    Ok(())
}

fn validate_telegram(telegram: &TelegramConfig) -> Result<(), ConfigError> {
    validate_http_url("telegram.base_url", telegram.base_url.trim())?;
    validate_timeout("telegram.timeout_secs", telegram.timeout_secs)?;

    Ok(())
}

fn validate_retry(retry: &RetryConfig) -> Result<(), ConfigError> {
    if retry.max_attempts == 0 || retry.max_attempts > 10 {
        return Err(ConfigError::Validation(
            "retry.max_attempts must be in range 1..=10".to_string(),
        ));
    }
    if retry.delay_secs > 3600 {
        return Err(ConfigError::Validation(
            "retry.delay_secs must be at most 3600".to_string(),
        ));
    }
    Ok(())
}

// The header line shares Telegram's message limit with the quote.
fn validate_validation(
    validation: &ValidationConfig,
    telegram: &TelegramConfig,
) -> Result<(), ConfigError> {
    let budget = quote_char_budget(&telegram.header);
    if budget == 0 {
        return Err(ConfigError::Validation(
            "telegram.header leaves no room for the quote in a single message".to_string(),
        ));
    }
    if validation.max_chars == 0 || validation.max_chars > budget {
        return Err(ConfigError::Validation(format!(
            "validation.max_chars must be in range 1..={budget} with the configured telegram.header"
        )));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// First non-empty value among `keys`, in order.
fn read_env_any(keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| read_env(key))
}

fn invalid_override(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() }
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.trim().parse::<u32>().map_err(|_| invalid_override(key, value))
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse::<u64>().map_err(|_| invalid_override(key, value))
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.trim().parse::<usize>().map_err(|_| invalid_override(key, value))
}

fn parse_f32(key: &str, value: &str) -> Result<f32, ConfigError> {
    value.trim().parse::<f32>().map_err(|_| invalid_override(key, value))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.trim().parse::<bool>().map_err(|_| invalid_override(key, value))
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    gemini: Option<GeminiPatch>,
    telegram: Option<TelegramPatch>,
    retry: Option<RetryPatch>,
    validation: Option<ValidationPatch>,
    schedule: Option<SchedulePatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct GeminiPatch {
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    temperature: Option<f32>,
    timeout_secs: Option<u64>,
    prompt: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TelegramPatch {
    bot_token: Option<String>,
    chat_id: Option<String>,
    base_url: Option<String>,
    timeout_secs: Option<u64>,
    header: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RetryPatch {
    max_attempts: Option<u32>,
    delay_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ValidationPatch {
    max_chars: Option<usize>,
    error_markers: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct SchedulePatch {
    interval_secs: Option<u64>,
    daily_at: Option<String>,
    run_immediately: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};
    use std::time::Duration;

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
    use crate::schedule::Schedule;

    const MANAGED_VARS: &[&str] = &[
        "MENTOR_GEMINI_API_KEY",
        "GOOGLE_API_KEY",
        "MENTOR_TELEGRAM_BOT_TOKEN",
        "TELEGRAM_TOKEN",
        "MENTOR_TELEGRAM_CHAT_ID",
        "TELEGRAM_CHAT_ID",
        "MENTOR_GEMINI_MODEL",
        "MENTOR_RETRY_MAX_ATTEMPTS",
        "MENTOR_TELEGRAM_HEADER",
        "MENTOR_VALIDATION_MAX_CHARS",
        "MENTOR_SCHEDULE_INTERVAL_SECS",
        "MENTOR_SCHEDULE_DAILY_AT",
        "MENTOR_LOG_LEVEL",
        "MENTOR_LOG_FORMAT",
        "TEST_MENTOR_GEMINI_KEY",
    ];

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars() {
        for var in MANAGED_VARS {
            env::remove_var(var);
        }
    }

    fn set_credentials() {
        env::set_var("MENTOR_GEMINI_API_KEY", "gemini-test-key");
        env::set_var("MENTOR_TELEGRAM_BOT_TOKEN", "123456:telegram-test-secret");
        env::set_var("MENTOR_TELEGRAM_CHAT_ID", "-1001234567890");
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars();
        env::set_var("TEST_MENTOR_GEMINI_KEY", "gemini-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("mentor.toml");
            fs::write(
                &path,
                r#"
[gemini]
api_key = "${TEST_MENTOR_GEMINI_KEY}"

[telegram]
bot_token = "42:file-secret"
chat_id = "@daily_mentor"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.gemini.api_key.expose_secret() == "gemini-from-env",
                "api key should be interpolated from environment",
            )?;
            ensure(config.telegram.chat_id == "@daily_mentor", "chat id should come from file")?;
            Ok(())
        })();

        clear_vars();
        result
    }

    #[test]
    fn short_environment_aliases_are_accepted() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars();
        env::set_var("GOOGLE_API_KEY", "google-key");
        env::set_var("TELEGRAM_TOKEN", "987:legacy-secret");
        env::set_var("TELEGRAM_CHAT_ID", "555123");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.gemini.api_key.expose_secret() == "google-key", "GOOGLE_API_KEY alias")?;
            ensure(
                config.telegram.bot_token.expose_secret() == "987:legacy-secret",
                "TELEGRAM_TOKEN alias",
            )?;
            ensure(config.destination().0 == "555123", "TELEGRAM_CHAT_ID alias")?;
            Ok(())
        })();

        clear_vars();
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars();
        set_credentials();
        env::set_var("MENTOR_GEMINI_MODEL", "gemini-from-env");
        env::set_var("MENTOR_RETRY_MAX_ATTEMPTS", "4");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("mentor.toml");
            fs::write(
                &path,
                r#"
[gemini]
model = "gemini-from-file"

[retry]
max_attempts = 2
delay_secs = 1

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.gemini.model == "gemini-from-env", "env model should win over file")?;
            ensure(config.retry.max_attempts == 4, "env retry attempts should win over file")?;
            ensure(config.retry.delay_secs == 1, "file delay should win over default")?;
            ensure(config.logging.level == "debug", "override log level should win")?;
            ensure(
                config.retry_policy().delay == Duration::from_secs(1),
                "retry policy should reflect configured delay",
            )?;
            Ok(())
        })();

        clear_vars();
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars();
        set_credentials();
        env::set_var("MENTOR_TELEGRAM_BOT_TOKEN", "not-a-bot-token");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("telegram.bot_token")
            );
            ensure(has_message, "validation failure should mention telegram.bot_token")
        })();

        clear_vars();
        result
    }

    #[test]
    fn missing_credentials_are_reported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars();

        let result = match AppConfig::load(LoadOptions::default()) {
            Ok(_) => Err("expected missing api key failure".to_string()),
            Err(ConfigError::Validation(message)) => {
                ensure(message.contains("gemini.api_key"), "error should name gemini.api_key")
            }
            Err(other) => Err(format!("unexpected error: {other}")),
        };

        clear_vars();
        result
    }

    #[test]
    fn max_chars_leaves_room_for_the_header() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars();
        set_credentials();

        let result = (|| -> Result<(), String> {
            // "Daily Mentor" plus the blank line takes 14 of Telegram's 4096.
            env::set_var("MENTOR_VALIDATION_MAX_CHARS", "4082");
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            ensure(config.validation_policy().max_chars == 4082, "4082 should fit the header")?;

            env::set_var("MENTOR_VALIDATION_MAX_CHARS", "4083");
            let rejected = matches!(
                AppConfig::load(LoadOptions::default()),
                Err(ConfigError::Validation(ref message)) if message.contains("1..=4082")
            );
            ensure(rejected, "4083 should overflow the message with the default header")?;

            env::set_var("MENTOR_TELEGRAM_HEADER", "");
            env::set_var("MENTOR_VALIDATION_MAX_CHARS", "4096");
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("headerless config load failed: {err}"))?;
            ensure(config.telegram.header.is_empty(), "blank header should be kept from env")?;
            ensure(config.validation_policy().max_chars == 4096, "no header keeps the full limit")
        })();

        clear_vars();
        result
    }

    #[test]
    fn schedule_flags_replace_configured_schedule() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars();
        set_credentials();
        env::set_var("MENTOR_SCHEDULE_DAILY_AT", "08:15");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions {
                overrides: ConfigOverrides {
                    schedule_interval_secs: Some(600),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            let schedule = config.schedule.schedule().map_err(|err| err.to_string())?;
            ensure(
                schedule == Schedule::Interval(Duration::from_secs(600)),
                "interval override should replace env daily schedule",
            )
        })();

        clear_vars();
        result
    }

    #[test]
    fn conflicting_schedule_is_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars();
        set_credentials();
        env::set_var("MENTOR_SCHEDULE_DAILY_AT", "08:15");
        env::set_var("MENTOR_SCHEDULE_INTERVAL_SECS", "60");

        let result = match AppConfig::load(LoadOptions::default()) {
            Ok(_) => Err("expected schedule conflict".to_string()),
            Err(error) => ensure(
                error.to_string().contains("mutually exclusive"),
                "error should explain the schedule conflict",
            ),
        };

        clear_vars();
        result
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars();
        set_credentials();
        env::set_var("MENTOR_LOG_FORMAT", "json");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(!debug.contains("gemini-test-key"), "debug output should not contain api key")?;
            ensure(
                !debug.contains("telegram-test-secret"),
                "debug output should not contain bot token",
            )?;
            ensure(
                matches!(config.logging.format, LogFormat::Json),
                "json logging format should be set from env alias",
            )?;
            Ok(())
        })();

        clear_vars();
        result
    }
}
