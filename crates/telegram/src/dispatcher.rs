use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mentor_core::config::TelegramConfig;
use mentor_core::domain::quote::{DeliveryReceipt, DestinationId, ValidatedQuote};
use mentor_core::errors::DeliveryError;
use mentor_core::ports::MessageDispatcher;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::message::MessageBuilder;

#[derive(Clone, Debug)]
pub struct TelegramSettings {
    pub bot_token: SecretString,
    pub base_url: String,
    pub timeout: Duration,
    pub header: String,
}

impl From<&TelegramConfig> for TelegramSettings {
    fn from(config: &TelegramConfig) -> Self {
        Self {
            bot_token: config.bot_token.clone(),
            base_url: config.base_url.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            header: config.header.clone(),
        }
    }
}

/// Sends validated quotes through the Bot API `sendMessage` method.
pub struct TelegramDispatcher {
    client: Client,
    settings: TelegramSettings,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    description: Option<String>,
    result: Option<SentMessage>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    message_id: i64,
    date: Option<i64>,
}

impl TelegramDispatcher {
    pub fn new(settings: TelegramSettings) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(settings.timeout).build()?;
        Ok(Self { client, settings })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.settings.base_url.trim_end_matches('/'),
            self.settings.bot_token.expose_secret()
        )
    }
}

#[async_trait]
impl MessageDispatcher for TelegramDispatcher {
    async fn dispatch(
        &self,
        quote: &ValidatedQuote,
        destination: &DestinationId,
    ) -> Result<DeliveryReceipt, DeliveryError> {
        let message = MessageBuilder::quote(quote.as_str())
            .header(&self.settings.header)
            .build(&destination.0);

        debug!(chat_id = %destination, text_len = message.text.len(), "sending telegram message");
        let response = self
            .client
            .post(self.endpoint())
            .json(&message)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(classify_transport_error)?;
        let parsed = serde_json::from_str::<ApiResponse>(&body).ok();

        if !status.is_success() {
            let description = parsed.and_then(|payload| payload.description);
            return Err(classify_status(status, description));
        }

        let payload = parsed.ok_or_else(|| {
            DeliveryError::ProviderError("could not decode sendMessage response".to_string())
        })?;
        if !payload.ok {
            let description =
                payload.description.unwrap_or_else(|| "request not acknowledged".to_string());
            return Err(DeliveryError::ProviderError(description));
        }
        let sent = payload.result.ok_or_else(|| {
            DeliveryError::ProviderError("sendMessage response had no result".to_string())
        })?;

        Ok(DeliveryReceipt {
            message_id: sent.message_id,
            chat_id: destination.0.clone(),
            delivered_at: sent
                .date
                .and_then(|seconds| DateTime::<Utc>::from_timestamp(seconds, 0))
                .unwrap_or_else(Utc::now),
        })
    }
}

// The request URL carries the bot token, so it is dropped before formatting.
fn classify_transport_error(error: reqwest::Error) -> DeliveryError {
    if error.is_timeout() {
        return DeliveryError::Timeout;
    }
    let error = error.without_url();
    if error.is_connect() {
        warn!(error = %error, "failed to connect to telegram");
        return DeliveryError::ProviderError("failed to connect to provider".to_string());
    }
    DeliveryError::ProviderError(format!("request failed: {error}"))
}

fn classify_status(status: StatusCode, description: Option<String>) -> DeliveryError {
    let detail = description
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string());

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => {
            DeliveryError::Unauthorized(detail)
        }
        StatusCode::BAD_REQUEST => DeliveryError::BadRequest(detail),
        _ => DeliveryError::ProviderError(format!("HTTP {}: {detail}", status.as_u16())),
    }
}
