//! Quote generation - the text-generation side of a mentor run
//!
//! - **LLM seam** (`llm`) - `LlmClient`, one prompt in, raw text out
//! - **Gemini** (`gemini`) - `generateContent` client over reqwest
//! - **Generator** (`generator`) - applies the fixed prompt and normalises the
//!   reply into a `Quote` for the run coordinator
//!
//! The generator never validates content; that is the validator's job in
//! `mentor-core`. It only guarantees the returned text is not blank.

pub mod gemini;
pub mod generator;
pub mod llm;

pub use gemini::{GeminiClient, GeminiSettings};
pub use generator::PromptedQuoteGenerator;
pub use llm::LlmClient;
