//! Vendor adapters
//!
//! Each vendor speaks one of three request shapes. Adapters only build the
//! HTTP request and pull the text out of a successful body; transport and
//! error handling live in the generator.

use pressroom_common::types::AiProvider;
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// One completion call
#[derive(Debug, Clone)]
pub struct CompletionRequest<'a> {
    pub model: &'a str,
    pub system: &'a str,
    pub user: &'a str,
    pub api_key: &'a str,
}

/// Request builder and response parser for one vendor
pub trait ProviderAdapter: Send + Sync {
    fn build_request(
        &self,
        client: &Client,
        base_url: &str,
        request: &CompletionRequest<'_>,
    ) -> RequestBuilder;

    /// Generated text from a successful response body
    fn parse_response(&self, body: &Value) -> Option<String>;
}

/// OpenAI-compatible `chat/completions`
pub struct ChatCompletionsAdapter {
    temperature: Option<f64>,
}

impl ChatCompletionsAdapter {
    pub fn new() -> Self {
        Self { temperature: None }
    }

    pub fn with_temperature(temperature: f64) -> Self {
        Self {
            temperature: Some(temperature),
        }
    }
}

impl Default for ChatCompletionsAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderAdapter for ChatCompletionsAdapter {
    fn build_request(
        &self,
        client: &Client,
        base_url: &str,
        request: &CompletionRequest<'_>,
    ) -> RequestBuilder {
        let mut body = json!({
            "model": request.model,
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user", "content": request.user },
            ],
        });
        if let Some(temperature) = self.temperature {
            body["temperature"] = json!(temperature);
        }

        client
            .post(format!("{}/chat/completions", base_url))
            .bearer_auth(request.api_key)
            .json(&body)
    }

    fn parse_response(&self, body: &Value) -> Option<String> {
        body.pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .map(str::to_string)
    }
}

/// Google `generateContent` with content parts
pub struct GenerateContentAdapter;

impl ProviderAdapter for GenerateContentAdapter {
    fn build_request(
        &self,
        client: &Client,
        base_url: &str,
        request: &CompletionRequest<'_>,
    ) -> RequestBuilder {
        client
            .post(format!(
                "{}/models/{}:generateContent",
                base_url, request.model
            ))
            .query(&[("key", request.api_key)])
            .json(&json!({
                "system_instruction": { "parts": [{ "text": request.system }] },
                "contents": [{ "parts": [{ "text": request.user }] }],
            }))
    }

    fn parse_response(&self, body: &Value) -> Option<String> {
        body.pointer("/candidates/0/content/parts/0/text")
            .and_then(Value::as_str)
            .map(str::to_string)
    }
}

pub const ANTHROPIC_VERSION: &str = "2023-06-01";
const ANTHROPIC_MAX_TOKENS: u32 = 4096;

/// Anthropic `messages`
pub struct MessagesAdapter;

impl ProviderAdapter for MessagesAdapter {
    fn build_request(
        &self,
        client: &Client,
        base_url: &str,
        request: &CompletionRequest<'_>,
    ) -> RequestBuilder {
        client
            .post(format!("{}/messages", base_url))
            .header("x-api-key", request.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&json!({
                "model": request.model,
                "max_tokens": ANTHROPIC_MAX_TOKENS,
                "system": request.system,
                "messages": [{ "role": "user", "content": request.user }],
            }))
    }

    fn parse_response(&self, body: &Value) -> Option<String> {
        body.pointer("/content/0/text")
            .and_then(Value::as_str)
            .map(str::to_string)
    }
}

/// Vendor error message from a response body, when the vendor sent one
pub fn vendor_error_message(body: &Value) -> Option<String> {
    let error = body.get("error")?;
    error
        .get("message")
        .and_then(Value::as_str)
        .or_else(|| error.as_str())
        .map(str::to_string)
}

/// Model id as the vendor expects it
pub fn vendor_model(provider: AiProvider, model: &str) -> String {
    match provider {
        AiProvider::OpenRouter => model.replace("openrouter/", ""),
        _ => model.to_string(),
    }
}

/// Provider id to adapter
#[derive(Clone)]
pub struct ProviderRegistry {
    adapters: HashMap<AiProvider, Arc<dyn ProviderAdapter>>,
}

impl ProviderRegistry {
    pub fn empty() -> Self {
        Self {
            adapters: HashMap::new(),
        }
    }

    /// All supported vendors
    pub fn standard() -> Self {
        let chat: Arc<dyn ProviderAdapter> = Arc::new(ChatCompletionsAdapter::new());

        let mut registry = Self::empty();
        registry.register(
            AiProvider::OpenAi,
            Arc::new(ChatCompletionsAdapter::with_temperature(0.7)),
        );
        registry.register(AiProvider::Perplexity, chat.clone());
        registry.register(AiProvider::OpenRouter, chat.clone());
        registry.register(AiProvider::DeepSeek, chat.clone());
        registry.register(AiProvider::Groq, chat);
        registry.register(AiProvider::Google, Arc::new(GenerateContentAdapter));
        registry.register(AiProvider::Anthropic, Arc::new(MessagesAdapter));
        registry
    }

    pub fn register(&mut self, provider: AiProvider, adapter: Arc<dyn ProviderAdapter>) {
        self.adapters.insert(provider, adapter);
    }

    pub fn get(&self, provider: AiProvider) -> Option<Arc<dyn ProviderAdapter>> {
        self.adapters.get(&provider).cloned()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::standard()
    }
}
