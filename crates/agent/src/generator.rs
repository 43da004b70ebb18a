use std::sync::Arc;

use async_trait::async_trait;
use mentor_core::domain::quote::{normalize_quote_text, Quote};
use mentor_core::errors::GenerationError;
use mentor_core::ports::QuoteGenerator;
use tracing::debug;

use crate::llm::LlmClient;

/// Asks the LLM for a quote using one fixed instruction prompt.
pub struct PromptedQuoteGenerator {
    client: Arc<dyn LlmClient>,
    prompt: String,
}

impl PromptedQuoteGenerator {
    pub fn new(client: Arc<dyn LlmClient>, prompt: impl Into<String>) -> Self {
        Self { client, prompt: prompt.into() }
    }
}

#[async_trait]
impl QuoteGenerator for PromptedQuoteGenerator {
    async fn generate(&self) -> Result<Quote, GenerationError> {
        let raw = self.client.complete(&self.prompt).await?;
        let text = normalize_quote_text(&raw);
        if text.is_empty() {
            return Err(GenerationError::EmptyResponse);
        }

        debug!(raw_len = raw.len(), text_len = text.len(), "normalized generated quote");
        Ok(Quote::new(text))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Arc;

    use async_trait::async_trait;
    use mentor_core::config::DEFAULT_PROMPT;
    use mentor_core::errors::GenerationError;
    use mentor_core::ports::QuoteGenerator;
    use tokio::sync::Mutex;

    use super::PromptedQuoteGenerator;
    use crate::llm::LlmClient;

    #[derive(Default)]
    struct ScriptedLlm {
        replies: Mutex<VecDeque<Result<String, GenerationError>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedLlm {
        fn replying(replies: Vec<Result<String, GenerationError>>) -> Self {
            Self { replies: Mutex::new(replies.into()), prompts: Mutex::new(Vec::new()) }
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        async fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
            self.prompts.lock().await.push(prompt.to_owned());
            self.replies.lock().await.pop_front().unwrap_or(Err(GenerationError::EmptyResponse))
        }
    }

    #[tokio::test]
    async fn sends_fixed_prompt_and_strips_quotation_marks() {
        let llm = Arc::new(ScriptedLlm::replying(vec![Ok(
            "  \"Code is like humor. When you have to explain it, it's bad.\"\n".to_owned(),
        )]));
        let generator = PromptedQuoteGenerator::new(llm.clone(), DEFAULT_PROMPT);

        let quote = generator.generate().await.expect("generation should succeed");

        assert_eq!(quote.text(), "Code is like humor. When you have to explain it, it's bad.");
        assert_eq!(*llm.prompts.lock().await, vec![DEFAULT_PROMPT.to_owned()]);
    }

    #[tokio::test]
    async fn whitespace_only_reply_is_an_empty_response() {
        let llm = Arc::new(ScriptedLlm::replying(vec![Ok(" \n\t \"\" ".to_owned())]));
        let generator = PromptedQuoteGenerator::new(llm, DEFAULT_PROMPT);

        assert_eq!(generator.generate().await, Err(GenerationError::EmptyResponse));
    }

    #[tokio::test]
    async fn client_errors_pass_through_unchanged() {
        let llm = Arc::new(ScriptedLlm::replying(vec![Err(GenerationError::RateLimited)]));
        let generator = PromptedQuoteGenerator::new(llm, DEFAULT_PROMPT);

        assert_eq!(generator.generate().await, Err(GenerationError::RateLimited));
    }
}
