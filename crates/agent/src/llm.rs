use async_trait::async_trait;
use mentor_core::errors::GenerationError;

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, GenerationError>;
}
