//! AI content generator

use super::cleanup::clean_html;
use super::config::AiConfigResolver;
use super::prompt::{GenerationRequest, Prompt};
use super::provider::{vendor_error_message, vendor_model, CompletionRequest, ProviderRegistry};
use chrono::Utc;
use pressroom_common::config::{AiConfig, AiEndpoints};
use pressroom_common::types::AiProvider;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Image endpoint request constants
const IMAGE_MODEL: &str = "dall-e-3";
const IMAGE_SIZE: &str = "1024x1024";
const IMAGE_QUALITY: &str = "standard";

/// Generation errors
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Please enter a topic")]
    EmptyTopic,

    #[error("Cannot determine a provider for model '{0}'")]
    UnknownProvider(String),

    #[error("No adapter registered for {0}")]
    Unsupported(AiProvider),

    #[error("No API key found for {0}. Please add one in AI Settings.")]
    MissingApiKey(AiProvider),

    #[error("{provider} error: {message}")]
    Vendor { provider: AiProvider, message: String },

    #[error(transparent)]
    Storage(#[from] pressroom_common::Error),
}

impl From<GenerationError> for pressroom_common::Error {
    fn from(err: GenerationError) -> Self {
        use pressroom_common::Error;
        match err {
            GenerationError::MissingApiKey(provider) => Error::MissingApiKey(provider.to_string()),
            GenerationError::Vendor { provider, message } => Error::Provider {
                provider: provider.to_string(),
                message,
            },
            GenerationError::Storage(e) => e,
            e @ (GenerationError::EmptyTopic
            | GenerationError::UnknownProvider(_)
            | GenerationError::Unsupported(_)) => Error::Validation(e.to_string()),
        }
    }
}

/// Turns a generation request into cleaned HTML with one vendor call
pub struct ContentGenerator {
    resolver: Arc<AiConfigResolver>,
    registry: ProviderRegistry,
    client: Client,
    endpoints: AiEndpoints,
    default_model: String,
}

impl ContentGenerator {
    pub fn new(
        resolver: Arc<AiConfigResolver>,
        config: &AiConfig,
    ) -> pressroom_common::Result<Self> {
        Self::with_registry(resolver, ProviderRegistry::standard(), config)
    }

    pub fn with_registry(
        resolver: Arc<AiConfigResolver>,
        registry: ProviderRegistry,
        config: &AiConfig,
    ) -> pressroom_common::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| {
                pressroom_common::Error::Config(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            resolver,
            registry,
            client,
            endpoints: config.endpoints.clone(),
            default_model: config.default_model.clone(),
        })
    }

    pub fn resolver(&self) -> &Arc<AiConfigResolver> {
        &self.resolver
    }

    /// Provider and model a request will use
    pub fn route(&self, request: &GenerationRequest) -> Result<(AiProvider, String), GenerationError> {
        let model = request
            .model
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(&self.default_model)
            .to_string();

        let provider = match request.provider {
            Some(provider) => provider,
            None => AiProvider::detect_from_model(&model)
                .ok_or_else(|| GenerationError::UnknownProvider(model.clone()))?,
        };

        Ok((provider, model))
    }

    async fn require_key(&self, provider: AiProvider) -> Result<String, GenerationError> {
        self.resolver
            .resolve_key(provider)
            .await?
            .ok_or(GenerationError::MissingApiKey(provider))
    }

    /// Generate cleaned HTML for `request`
    pub async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let topic = request.topic.trim();
        if topic.is_empty() {
            return Err(GenerationError::EmptyTopic);
        }

        let (provider, model) = self.route(request)?;
        let adapter = self
            .registry
            .get(provider)
            .ok_or(GenerationError::Unsupported(provider))?;
        let api_key = self.require_key(provider).await?;

        let prompt = Prompt::build(request, Utc::now().date_naive());
        let model = vendor_model(provider, &model);
        let completion = CompletionRequest {
            model: &model,
            system: &prompt.system,
            user: &prompt.user,
            api_key: &api_key,
        };

        debug!(provider = %provider, model = %model, mode = ?request.mode, "Dispatching generation request");

        let http = adapter.build_request(
            &self.client,
            self.endpoints.base_url(provider),
            &completion,
        );
        let body = self.send(provider, http).await?;

        let text = adapter.parse_response(&body).ok_or_else(|| GenerationError::Vendor {
            provider,
            message: "Unexpected response format".to_string(),
        })?;

        let html = clean_html(&text, request.mode, topic);
        info!(provider = %provider, model = %model, chars = html.len(), "Content generated");

        Ok(html)
    }

    /// Generate an illustration and return its URL
    pub async fn generate_image(&self, prompt: &str) -> Result<String, GenerationError> {
        let provider = AiProvider::OpenAi;
        let api_key = self.require_key(provider).await?;

        let http = self
            .client
            .post(format!(
                "{}/images/generations",
                self.endpoints.base_url(provider)
            ))
            .bearer_auth(&api_key)
            .json(&json!({
                "model": IMAGE_MODEL,
                "prompt": prompt,
                "n": 1,
                "size": IMAGE_SIZE,
                "quality": IMAGE_QUALITY,
                "response_format": "url",
            }));
        let body = self.send(provider, http).await?;

        let url = body
            .pointer("/data/0/url")
            .and_then(Value::as_str)
            .ok_or_else(|| GenerationError::Vendor {
                provider,
                message: "Unexpected response format".to_string(),
            })?;

        info!("Image generated");
        Ok(url.to_string())
    }

    /// Send and decode the JSON body. A vendor error body fails with the
    /// vendor's own message.
    async fn send(
        &self,
        provider: AiProvider,
        request: RequestBuilder,
    ) -> Result<Value, GenerationError> {
        let response = request.send().await.map_err(|e| {
            warn!(provider = %provider, "Vendor request failed: {}", e);
            GenerationError::Vendor {
                provider,
                message: e.to_string(),
            }
        })?;

        let status = response.status();
        let body: Option<Value> = response.json().await.ok();

        if let Some(message) = body.as_ref().and_then(vendor_error_message) {
            warn!(provider = %provider, status = %status, "Vendor returned error: {}", message);
            return Err(GenerationError::Vendor { provider, message });
        }

        match body {
            Some(body) if status.is_success() => Ok(body),
            _ => {
                warn!(provider = %provider, status = %status, "Vendor returned unusable response");
                Err(GenerationError::Vendor {
                    provider,
                    message: http_status_message(status),
                })
            }
        }
    }
}

fn http_status_message(status: StatusCode) -> String {
    format!("HTTP {}", status.as_u16())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::config::AI_CONFIG_KEY;
    use crate::ai::prompt::GenerationMode;
    use crate::test_support::{InMemoryProviderKeys, InMemorySettings};
    use pressroom_storage::repository::SiteSettingsRepository;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct Fixture {
        generator: ContentGenerator,
        keys: Arc<InMemoryProviderKeys>,
        settings: Arc<InMemorySettings>,
    }

    fn fixture(server: &MockServer) -> Fixture {
        let settings = Arc::new(InMemorySettings::default());
        let keys = Arc::new(InMemoryProviderKeys::default());
        let resolver = Arc::new(AiConfigResolver::new(settings.clone(), keys.clone()));
        let config = AiConfig {
            endpoints: AiEndpoints::all(&server.uri()),
            ..Default::default()
        };
        Fixture {
            generator: ContentGenerator::new(resolver, &config).unwrap(),
            keys,
            settings,
        }
    }

    fn article(topic: &str, model: &str) -> GenerationRequest {
        GenerationRequest {
            topic: topic.to_string(),
            model: Some(model.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_missing_key_makes_no_request() {
        let server = MockServer::start().await;
        let fx = fixture(&server);

        let err = fx
            .generator
            .generate(&article("VPN guide", "claude-3-5-sonnet-20240620"))
            .await
            .unwrap_err();

        assert!(matches!(err, GenerationError::MissingApiKey(AiProvider::Anthropic)));
        assert_eq!(
            err.to_string(),
            "No API key found for anthropic. Please add one in AI Settings."
        );
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_blank_topic_makes_no_request() {
        let server = MockServer::start().await;
        let fx = fixture(&server);
        fx.keys.add("openai", "sk-test", true);

        let err = fx
            .generator
            .generate(&article("   ", "gpt-4o"))
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::EmptyTopic));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_openai_chat_completion() {
        let server = MockServer::start().await;
        let fx = fixture(&server);
        fx.keys.add("openai", "sk-test", true);

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({ "model": "gpt-4o", "temperature": 0.7 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "content": "```html\n<h1>VPNs</h1><p>Fast [1].</p>\n```" } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let html = fx
            .generator
            .generate(&article("VPNs", "gpt-4o"))
            .await
            .unwrap();
        assert_eq!(html, "<h1>VPNs</h1><p>Fast .</p>");

        let requests = server.received_requests().await.unwrap();
        let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["role"], "user");
        assert!(body["messages"][1]["content"]
            .as_str()
            .unwrap()
            .starts_with("Write a long professional article about \"VPNs\"."));
    }

    #[tokio::test]
    async fn test_google_generate_content() {
        let server = MockServer::start().await;
        let fx = fixture(&server);
        fx.settings
            .put(AI_CONFIG_KEY, json!({ "gemini_key": "AIza-test" }))
            .await
            .unwrap();

        Mock::given(method("POST"))
            .and(path("/models/gemini-1.5-pro:generateContent"))
            .and(query_param("key", "AIza-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{ "content": { "parts": [{ "text": "<h1>Solar</h1>" }] } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let html = fx
            .generator
            .generate(&article("Solar", "gemini-1.5-pro"))
            .await
            .unwrap();
        assert_eq!(html, "<h1>Solar</h1>");
    }

    #[tokio::test]
    async fn test_anthropic_messages() {
        let server = MockServer::start().await;
        let fx = fixture(&server);
        fx.keys.add("anthropic", "ant-test", true);

        Mock::given(method("POST"))
            .and(path("/messages"))
            .and(header("x-api-key", "ant-test"))
            .and(header("anthropic-version", "2023-06-01"))
            .and(body_partial_json(json!({ "max_tokens": 4096 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [{ "type": "text", "text": "<h1>Claude</h1>" }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let html = fx
            .generator
            .generate(&article("AI", "claude-3-5-sonnet-20240620"))
            .await
            .unwrap();
        assert_eq!(html, "<h1>Claude</h1>");
    }

    #[tokio::test]
    async fn test_openrouter_model_prefix_dropped() {
        let server = MockServer::start().await;
        let fx = fixture(&server);
        fx.keys.add("openrouter", "or-test", true);

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(json!({ "model": "meta-llama/llama-3-70b" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "content": "<h1>Llamas</h1>" } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let html = fx
            .generator
            .generate(&article("Llamas", "openrouter/meta-llama/llama-3-70b"))
            .await
            .unwrap();
        assert_eq!(html, "<h1>Llamas</h1>");
    }

    #[tokio::test]
    async fn test_vendor_error_message_passed_through() {
        let server = MockServer::start().await;
        let fx = fixture(&server);
        fx.keys.add("perplexity", "pplx-test", true);

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": { "message": "Invalid API key provided" }
            })))
            .mount(&server)
            .await;

        let request = GenerationRequest {
            topic: "Election".to_string(),
            model: Some("sonar-pro".to_string()),
            mode: GenerationMode::News,
            ..Default::default()
        };
        let err = fx.generator.generate(&request).await.unwrap_err();
        match err {
            GenerationError::Vendor { provider, message } => {
                assert_eq!(provider, AiProvider::Perplexity);
                assert_eq!(message, "Invalid API key provided");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_non_json_failure_reports_status() {
        let server = MockServer::start().await;
        let fx = fixture(&server);
        fx.keys.add("groq", "gsk-test", true);

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
            .mount(&server)
            .await;

        let err = fx
            .generator
            .generate(&article("Llamas", "llama3-70b-8192"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "groq error: HTTP 503");
    }

    #[tokio::test]
    async fn test_news_mode_wraps_plain_text() {
        let server = MockServer::start().await;
        let fx = fixture(&server);
        fx.keys.add("perplexity", "pplx-test", true);

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "content": "Rates fell [1].\n\nMarkets rallied." } }]
            })))
            .mount(&server)
            .await;

        let request = GenerationRequest {
            topic: "Rate cuts".to_string(),
            model: Some("sonar".to_string()),
            mode: GenerationMode::News,
            ..Default::default()
        };
        let html = fx.generator.generate(&request).await.unwrap();
        assert_eq!(
            html,
            "<h1>Latest News: Rate cuts</h1><p>Rates fell .</p><p>Markets rallied.</p>"
        );
    }

    #[tokio::test]
    async fn test_generate_image() {
        let server = MockServer::start().await;
        let fx = fixture(&server);
        fx.keys.add("openai", "sk-test", true);

        Mock::given(method("POST"))
            .and(path("/images/generations"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "dall-e-3",
                "n": 1,
                "size": "1024x1024",
                "quality": "standard",
                "response_format": "url",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{ "url": "https://images.example.com/a.png" }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let url = fx
            .generator
            .generate_image("Professional informative blog illustration about: VPNs.")
            .await
            .unwrap();
        assert_eq!(url, "https://images.example.com/a.png");
    }

    #[tokio::test]
    async fn test_image_without_openai_key() {
        let server = MockServer::start().await;
        let fx = fixture(&server);

        let err = fx.generator.generate_image("anything").await.unwrap_err();
        assert!(matches!(err, GenerationError::MissingApiKey(AiProvider::OpenAi)));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[test]
    fn test_route_detects_provider() {
        let resolver = Arc::new(AiConfigResolver::new(
            Arc::new(InMemorySettings::default()),
            Arc::new(InMemoryProviderKeys::default()),
        ));
        let generator = ContentGenerator::new(resolver, &AiConfig::default()).unwrap();

        let (provider, model) = generator.route(&GenerationRequest::default()).unwrap();
        assert_eq!(provider, AiProvider::OpenAi);
        assert_eq!(model, "gpt-4o");

        let (provider, _) = generator
            .route(&GenerationRequest {
                model: Some("mixtral-8x7b-32768".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(provider, AiProvider::Groq);

        assert!(matches!(
            generator.route(&GenerationRequest {
                model: Some("mystery-model".to_string()),
                ..Default::default()
            }),
            Err(GenerationError::UnknownProvider(_))
        ));
    }
}
