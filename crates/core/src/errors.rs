use thiserror::Error;

/// Classifies a step failure as worth another attempt or not.
pub trait Retryable {
    fn is_transient(&self) -> bool;

    /// Stable dotted identifier used in logs and run summaries.
    fn kind(&self) -> &'static str;
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GenerationError {
    #[error("generation request timed out")]
    Timeout,
    #[error("generation provider rate limited the request")]
    RateLimited,
    #[error("generation provider error: {0}")]
    ProviderError(String),
    #[error("generation provider returned an empty response")]
    EmptyResponse,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("quote is empty")]
    Empty,
    #[error("quote is {length} characters long (limit {limit})")]
    TooLong { length: usize, limit: usize },
    #[error("quote contains error marker `{marker}`")]
    ContainsErrorMarker { marker: String },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("delivery request timed out")]
    Timeout,
    #[error("delivery provider rejected credentials: {0}")]
    Unauthorized(String),
    #[error("delivery provider rejected request: {0}")]
    BadRequest(String),
    #[error("delivery provider error: {0}")]
    ProviderError(String),
}

/// Terminal reason carried by a failed run.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RunFailure {
    #[error("generation failed: {0}")]
    Generation(#[from] GenerationError),
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error("delivery failed: {0}")]
    Delivery(#[from] DeliveryError),
}

impl Retryable for GenerationError {
    fn is_transient(&self) -> bool {
        true
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Timeout => "generation.timeout",
            Self::RateLimited => "generation.rate_limited",
            Self::ProviderError(_) => "generation.provider_error",
            Self::EmptyResponse => "generation.empty_response",
        }
    }
}

impl Retryable for ValidationError {
    fn is_transient(&self) -> bool {
        false
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Empty => "validation.empty",
            Self::TooLong { .. } => "validation.too_long",
            Self::ContainsErrorMarker { .. } => "validation.contains_error_marker",
        }
    }
}

impl Retryable for DeliveryError {
    fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout | Self::ProviderError(_))
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Timeout => "delivery.timeout",
            Self::Unauthorized(_) => "delivery.unauthorized",
            Self::BadRequest(_) => "delivery.bad_request",
            Self::ProviderError(_) => "delivery.provider_error",
        }
    }
}

impl RunFailure {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Generation(error) => error.kind(),
            Self::Validation(error) => error.kind(),
            Self::Delivery(error) => error.kind(),
        }
    }
}
