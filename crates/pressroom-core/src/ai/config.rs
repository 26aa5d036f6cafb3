//! AI configuration resolver
//!
//! Vendor keys live in two places: the `ai_config` site setting (one field
//! per provider) and the `api_keys` table. Active `api_keys` rows win.

use pressroom_common::types::AiProvider;
use pressroom_common::{Error, Result};
use pressroom_storage::repository::{ProviderKeyRepository, SiteSettingsRepository};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Site setting holding the base AI configuration
pub const AI_CONFIG_KEY: &str = "ai_config";

/// Provider keys as stored in the `ai_config` setting
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AiKeys {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openai_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gemini_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anthropic_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub perplexity_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deepseek_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groq_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openrouter_key: Option<String>,

    /// Fields this service does not interpret, kept on save
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl AiKeys {
    fn slot(&self, provider: AiProvider) -> &Option<String> {
        match provider {
            AiProvider::OpenAi => &self.openai_key,
            AiProvider::Google => &self.gemini_key,
            AiProvider::Anthropic => &self.anthropic_key,
            AiProvider::Perplexity => &self.perplexity_key,
            AiProvider::DeepSeek => &self.deepseek_key,
            AiProvider::Groq => &self.groq_key,
            AiProvider::OpenRouter => &self.openrouter_key,
        }
    }

    fn slot_mut(&mut self, provider: AiProvider) -> &mut Option<String> {
        match provider {
            AiProvider::OpenAi => &mut self.openai_key,
            AiProvider::Google => &mut self.gemini_key,
            AiProvider::Anthropic => &mut self.anthropic_key,
            AiProvider::Perplexity => &mut self.perplexity_key,
            AiProvider::DeepSeek => &mut self.deepseek_key,
            AiProvider::Groq => &mut self.groq_key,
            AiProvider::OpenRouter => &mut self.openrouter_key,
        }
    }

    /// Key for a provider; blank values count as absent
    pub fn get(&self, provider: AiProvider) -> Option<&str> {
        self.slot(provider)
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    pub fn set(&mut self, provider: AiProvider, key: Option<String>) {
        *self.slot_mut(provider) = key;
    }

    /// Providers that currently have a usable key
    pub fn configured(&self) -> Vec<AiProvider> {
        AiProvider::ALL
            .into_iter()
            .filter(|p| self.get(*p).is_some())
            .collect()
    }
}

/// Resolves vendor keys from settings and the key table
pub struct AiConfigResolver {
    settings: Arc<dyn SiteSettingsRepository>,
    keys: Arc<dyn ProviderKeyRepository>,
}

impl AiConfigResolver {
    pub fn new(
        settings: Arc<dyn SiteSettingsRepository>,
        keys: Arc<dyn ProviderKeyRepository>,
    ) -> Self {
        Self { settings, keys }
    }

    /// The `ai_config` setting alone, without key-table overrides
    pub async fn load_base_config(&self) -> Result<AiKeys> {
        match self.settings.get(AI_CONFIG_KEY).await? {
            Some(value) => serde_json::from_value(value)
                .map_err(|e| Error::Validation(format!("Invalid ai_config setting: {}", e))),
            None => Ok(AiKeys::default()),
        }
    }

    /// Effective configuration: base setting overlaid by active key rows.
    /// A blank key row never clears a base key.
    pub async fn load_config(&self) -> Result<AiKeys> {
        let mut config = self.load_base_config().await?;

        for row in self.keys.list_active().await? {
            let Ok(provider) = row.provider.parse::<AiProvider>() else {
                debug!(provider = %row.provider, "Ignoring key for unknown provider");
                continue;
            };
            let key = row.key.trim();
            if !key.is_empty() {
                config.set(provider, Some(key.to_string()));
            }
        }

        Ok(config)
    }

    /// Key for `provider`, or `None` when nothing is configured
    pub async fn resolve_key(&self, provider: AiProvider) -> Result<Option<String>> {
        let config = self.load_config().await?;
        Ok(config.get(provider).map(str::to_string))
    }

    /// Replace the base `ai_config` setting
    pub async fn save_base_config(&self, config: &AiKeys) -> Result<()> {
        let value = serde_json::to_value(config)
            .map_err(|e| Error::Internal(format!("Failed to encode ai_config: {}", e)))?;
        self.settings.put(AI_CONFIG_KEY, value).await?;
        Ok(())
    }
}
