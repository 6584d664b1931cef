//! OpenAI-compatible insight generation.

pub mod openai;

pub use openai::OpenAiInsights;
