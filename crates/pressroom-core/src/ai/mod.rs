//! AI Content Pipeline
//!
//! Key resolution, prompt assembly, a single vendor call and cleanup of the
//! returned HTML. Persisting the result is left to [`crate::publish`].

pub mod cleanup;
pub mod config;
pub mod generator;
pub mod prompt;
pub mod provider;

pub use cleanup::clean_html;
pub use config::{AiConfigResolver, AiKeys, AI_CONFIG_KEY};
pub use generator::{ContentGenerator, GenerationError};
pub use prompt::{image_prompt, GenerationMode, GenerationRequest, Prompt};
pub use provider::{
    ChatCompletionsAdapter, CompletionRequest, GenerateContentAdapter, MessagesAdapter,
    ProviderAdapter, ProviderRegistry,
};
