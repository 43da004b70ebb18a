use std::time::Duration;

use async_trait::async_trait;
use mentor_core::config::GeminiConfig;
use mentor_core::errors::GenerationError;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::llm::LlmClient;

const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Clone, Debug)]
pub struct GeminiSettings {
    pub api_key: SecretString,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub timeout: Duration,
}

impl From<&GeminiConfig> for GeminiSettings {
    fn from(config: &GeminiConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

/// Client for the Gemini `generateContent` endpoint.
pub struct GeminiClient {
    client: Client,
    settings: GeminiSettings,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: [RequestPart<'a>; 1],
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    candidate_count: u8,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
}

impl GeminiClient {
    pub fn new(settings: GeminiSettings) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(settings.timeout).build()?;
        Ok(Self { client, settings })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.settings.base_url.trim_end_matches('/'),
            self.settings.model
        )
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
        let request = GenerateContentRequest {
            contents: [Content { role: "user", parts: [RequestPart { text: prompt }] }],
            generation_config: GenerationConfig {
                temperature: self.settings.temperature,
                candidate_count: 1,
            },
        };

        debug!(model = %self.settings.model, "sending gemini generateContent request");
        let response = self
            .client
            .post(self.endpoint())
            .header(API_KEY_HEADER, self.settings.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }

        let payload: GenerateContentResponse = response.json().await.map_err(|error| {
            GenerationError::ProviderError(format!(
                "could not decode generateContent response: {}",
                error.without_url()
            ))
        })?;

        first_candidate_text(payload)
    }
}

fn first_candidate_text(payload: GenerateContentResponse) -> Result<String, GenerationError> {
    let block_reason = payload.prompt_feedback.and_then(|feedback| feedback.block_reason);
    let text = payload
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .and_then(|content| content.parts.into_iter().find_map(|part| part.text));

    match (text, block_reason) {
        (Some(text), _) if !text.trim().is_empty() => Ok(text),
        (_, Some(reason)) => {
            Err(GenerationError::ProviderError(format!("prompt blocked by provider ({reason})")))
        }
        _ => Err(GenerationError::EmptyResponse),
    }
}

fn classify_transport_error(error: reqwest::Error) -> GenerationError {
    if error.is_timeout() {
        return GenerationError::Timeout;
    }
    let error = error.without_url();
    if error.is_connect() {
        warn!(error = %error, "failed to connect to gemini");
        return GenerationError::ProviderError("failed to connect to provider".to_string());
    }
    GenerationError::ProviderError(format!("request failed: {error}"))
}

fn classify_status(status: StatusCode, body: &str) -> GenerationError {
    let detail = serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.error.message.or(envelope.error.status))
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string());

    match status {
        StatusCode::TOO_MANY_REQUESTS => GenerationError::RateLimited,
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => GenerationError::Timeout,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GenerationError::ProviderError(
            format!("authentication rejected (HTTP {}): {detail}", status.as_u16()),
        ),
        _ => GenerationError::ProviderError(format!("HTTP {}: {detail}", status.as_u16())),
    }
}
