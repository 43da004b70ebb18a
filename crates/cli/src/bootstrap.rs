use std::sync::Arc;

use mentor_agent::{GeminiClient, GeminiSettings, PromptedQuoteGenerator};
use mentor_core::audit::AuditSink;
use mentor_core::config::AppConfig;
use mentor_core::flows::RunCoordinator;
use mentor_core::validation::QuoteValidator;
use mentor_telegram::{TelegramDispatcher, TelegramSettings};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub coordinator: RunCoordinator,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("failed to build gemini http client: {0}")]
    GeminiClient(#[source] reqwest::Error),
    #[error("failed to build telegram http client: {0}")]
    TelegramClient(#[source] reqwest::Error),
}

/// Wires the providers behind the coordinator from an already validated
/// config. No network traffic happens here.
pub fn bootstrap_with_config(
    config: AppConfig,
    audit: Arc<dyn AuditSink>,
) -> Result<Application, BootstrapError> {
    let gemini = GeminiClient::new(GeminiSettings::from(&config.gemini))
        .map_err(BootstrapError::GeminiClient)?;
    let generator = PromptedQuoteGenerator::new(Arc::new(gemini), config.gemini.prompt.clone());

    let dispatcher = TelegramDispatcher::new(TelegramSettings::from(&config.telegram))
        .map_err(BootstrapError::TelegramClient)?;

    let coordinator =
        RunCoordinator::new(Arc::new(generator), Arc::new(dispatcher), config.destination())
            .with_validator(QuoteValidator::new(config.validation_policy()))
            .with_retry_policy(config.retry_policy())
            .with_audit_sink(audit);

    info!(
        event_name = "system.bootstrap.completed",
        model = %config.gemini.model,
        destination = %config.destination(),
        max_attempts = config.retry.max_attempts,
        "mentor runtime wired"
    );

    Ok(Application { config, coordinator })
}
