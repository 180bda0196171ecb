pub mod client;
pub mod extractor;
pub mod prompts;
pub mod types;

pub use client::{GeminiClient, LanguageModel, LlmError};
pub use extractor::Extractor;
pub use types::{Classification, ContextIntent, ContextOutcome, Draft};
