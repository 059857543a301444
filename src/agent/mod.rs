//! LLM-backed evaluators.
//!
//! This module provides the completion client, the prompt text, and the
//! worker and boss evaluators built on top of them.

pub mod boss;
pub mod ollama;
pub mod prompts;
pub mod worker;

pub use boss::Aggregator;
pub use ollama::{CompletionClient, OllamaClient};
pub use worker::Evaluator;
