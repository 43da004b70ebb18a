use crate::domain::quote::{normalize_quote_text, ValidatedQuote};
use crate::errors::ValidationError;

/// Telegram rejects messages above this many characters.
pub const DELIVERY_CHANNEL_LIMIT: usize = 4096;

pub const DEFAULT_MAX_CHARS: usize = 1000;

/// Blank line between the header and the quote.
const HEADER_SEPARATOR_CHARS: usize = 2;

pub const DEFAULT_ERROR_MARKERS: &[&str] = &[
    "gemini auth error",
    "gemini quota error",
    "gemini network error",
    "gemini internal error",
    "as an ai language model",
    "i'm sorry, but i can",
    "i cannot fulfill",
    "i can't help with",
    "[blocked]",
    "safety filter",
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationPolicy {
    pub max_chars: usize,
    pub error_markers: Vec<String>,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            max_chars: DEFAULT_MAX_CHARS,
            error_markers: DEFAULT_ERROR_MARKERS.iter().map(|marker| (*marker).to_owned()).collect(),
        }
    }
}

/// Visible characters left for the quote once `header` and its separator
/// are placed in front of it. A blank header is not sent.
pub fn quote_char_budget(header: &str) -> usize {
    let header = header.trim();
    if header.is_empty() {
        return DELIVERY_CHANNEL_LIMIT;
    }
    DELIVERY_CHANNEL_LIMIT.saturating_sub(header.chars().count() + HEADER_SEPARATOR_CHARS)
}

#[derive(Clone, Debug, Default)]
pub struct QuoteValidator {
    policy: ValidationPolicy,
}

impl QuoteValidator {
    pub fn new(policy: ValidationPolicy) -> Self {
        Self { policy }
    }

    pub fn validate(&self, text: &str) -> Result<ValidatedQuote, ValidationError> {
        let normalized = normalize_quote_text(text);
        if normalized.is_empty() {
            return Err(ValidationError::Empty);
        }

        let limit = self.policy.max_chars.min(DELIVERY_CHANNEL_LIMIT);
        let length = normalized.chars().count();
        if length > limit {
            return Err(ValidationError::TooLong { length, limit });
        }

        let lowered = normalized.to_lowercase();
        let marker = self
            .policy
            .error_markers
            .iter()
            .map(|marker| marker.trim())
            .filter(|marker| !marker.is_empty())
            .find(|marker| lowered.contains(&marker.to_lowercase()));
        if let Some(marker) = marker {
            return Err(ValidationError::ContainsErrorMarker { marker: marker.to_owned() });
        }

        Ok(ValidatedQuote::new(normalized))
    }
}

#[cfg(test)]
mod tests {
    use super::{quote_char_budget, QuoteValidator, ValidationPolicy, DELIVERY_CHANNEL_LIMIT};
    use crate::errors::ValidationError;

    #[test]
    fn accepts_well_formed_quotes_after_trimming() {
        const HUMOR: &str = "Code is like humor. When you have to explain it, it's bad.";
        let validator = QuoteValidator::default();
        let cases = [
            (HUMOR, HUMOR),
            ("  \"Ship small, ship often.\"\n", "Ship small, ship often."),
            ("\u{201C}Every bug is a lesson in disguise.\u{201D}", "Every bug is a lesson in disguise."),
            ("*Debug* the fear, then refactor it.", "*Debug* the fear, then refactor it."),
        ];

        for (input, expected) in cases {
            let validated = validator.validate(input).expect("quote should validate");
            assert_eq!(validated.as_str(), expected);
        }
    }

    #[test]
    fn rejects_empty_and_whitespace_only_text() {
        let validator = QuoteValidator::default();
        for input in ["", " ", "\n\t  ", "\"  \""] {
            assert_eq!(validator.validate(input), Err(ValidationError::Empty), "input {input:?}");
        }
    }

    #[test]
    fn rejects_text_over_the_configured_limit() {
        let validator =
            QuoteValidator::new(ValidationPolicy { max_chars: 20, ..ValidationPolicy::default() });

        let error = validator.validate("Keep going, the compiler believes in you.").unwrap_err();
        assert_eq!(error, ValidationError::TooLong { length: 41, limit: 20 });
    }

    #[test]
    fn limit_never_exceeds_delivery_channel_ceiling() {
        let validator = QuoteValidator::new(ValidationPolicy {
            max_chars: 10_000,
            ..ValidationPolicy::default()
        });
        let looping = "loop ".repeat(1000);

        let error = validator.validate(&looping).unwrap_err();
        assert!(matches!(
            error,
            ValidationError::TooLong { limit, .. } if limit == DELIVERY_CHANNEL_LIMIT
        ));
    }

    #[test]
    fn header_and_separator_are_taken_from_the_quote_budget() {
        assert_eq!(quote_char_budget("Daily Mentor"), DELIVERY_CHANNEL_LIMIT - 14);
        assert_eq!(quote_char_budget("  Daily Mentor \n"), DELIVERY_CHANNEL_LIMIT - 14);
        assert_eq!(quote_char_budget("   "), DELIVERY_CHANNEL_LIMIT);
        assert_eq!(quote_char_budget(&"h".repeat(5000)), 0);
    }

    #[test]
    fn rejects_provider_error_placeholders_case_insensitively() {
        let validator = QuoteValidator::default();

        let error = validator.validate("\u{274C} Gemini Quota Error: Rate limit exceeded.").unwrap_err();
        assert_eq!(
            error,
            ValidationError::ContainsErrorMarker { marker: "gemini quota error".to_owned() }
        );

        let error = validator
            .validate("As an AI language model, I do not have motivation.")
            .unwrap_err();
        assert!(matches!(error, ValidationError::ContainsErrorMarker { .. }));
    }

    #[test]
    fn blank_markers_are_ignored() {
        let validator = QuoteValidator::new(ValidationPolicy {
            max_chars: 200,
            error_markers: vec![String::new(), "   ".to_owned()],
        });

        assert!(validator.validate("Tests are love letters to your future self.").is_ok());
    }
}
