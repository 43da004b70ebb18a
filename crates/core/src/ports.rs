use async_trait::async_trait;

use crate::domain::quote::{DeliveryReceipt, DestinationId, Quote, ValidatedQuote};
use crate::errors::{DeliveryError, GenerationError};

/// Produces one quote per call from a text-generation provider.
#[async_trait]
pub trait QuoteGenerator: Send + Sync {
    async fn generate(&self) -> Result<Quote, GenerationError>;
}

/// Delivers one validated quote to a chat destination.
#[async_trait]
pub trait MessageDispatcher: Send + Sync {
    async fn dispatch(
        &self,
        quote: &ValidatedQuote,
        destination: &DestinationId,
    ) -> Result<DeliveryReceipt, DeliveryError>;
}
