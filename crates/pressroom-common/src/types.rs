//! Common types for Pressroom

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for admin profiles
pub type ProfileId = Uuid;

/// Unique identifier for campaigns
pub type CampaignId = Uuid;

/// Unique identifier for contacts
pub type ContactId = Uuid;

/// Unique identifier for SMTP sender configurations
pub type SmtpConfigId = Uuid;

/// Unique identifier for posts
pub type PostId = Uuid;

/// Unique identifier for stored vendor API keys
pub type ProviderKeyId = Uuid;

/// Unique identifier for admin access tokens
pub type AccessTokenId = Uuid;

/// Timestamp wrapper
pub type Timestamp = DateTime<Utc>;

/// Profile role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    Editor,
    User,
}

impl UserRole {
    /// Whether this role may use the back office
    pub fn can_manage_content(&self) -> bool {
        matches!(self, UserRole::Admin | UserRole::Editor)
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserRole::Admin => write!(f, "admin"),
            UserRole::Editor => write!(f, "editor"),
            UserRole::User => write!(f, "user"),
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(UserRole::Admin),
            "editor" => Ok(UserRole::Editor),
            "user" => Ok(UserRole::User),
            other => Err(crate::Error::Validation(format!("Invalid role: {}", other))),
        }
    }
}

/// LLM vendors the content pipeline can talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AiProvider {
    #[serde(rename = "openai")]
    OpenAi,
    Google,
    Anthropic,
    Perplexity,
    #[serde(rename = "deepseek")]
    DeepSeek,
    Groq,
    #[serde(rename = "openrouter")]
    OpenRouter,
}

impl AiProvider {
    pub const ALL: [AiProvider; 7] = [
        AiProvider::OpenAi,
        AiProvider::Google,
        AiProvider::Anthropic,
        AiProvider::Perplexity,
        AiProvider::DeepSeek,
        AiProvider::Groq,
        AiProvider::OpenRouter,
    ];

    /// Provider id as stored in the `api_keys` table
    pub fn as_str(&self) -> &'static str {
        match self {
            AiProvider::OpenAi => "openai",
            AiProvider::Google => "google",
            AiProvider::Anthropic => "anthropic",
            AiProvider::Perplexity => "perplexity",
            AiProvider::DeepSeek => "deepseek",
            AiProvider::Groq => "groq",
            AiProvider::OpenRouter => "openrouter",
        }
    }

    /// Field name of this provider's key inside the `ai_config` setting
    pub fn config_field(&self) -> &'static str {
        match self {
            AiProvider::OpenAi => "openai_key",
            AiProvider::Google => "gemini_key",
            AiProvider::Anthropic => "anthropic_key",
            AiProvider::Perplexity => "perplexity_key",
            AiProvider::DeepSeek => "deepseek_key",
            AiProvider::Groq => "groq_key",
            AiProvider::OpenRouter => "openrouter_key",
        }
    }

    /// Guess the provider from a model identifier.
    ///
    /// `openrouter/` prefixed ids always route through OpenRouter, even
    /// when the rest of the id names another vendor's model.
    pub fn detect_from_model(model: &str) -> Option<Self> {
        let model = model.trim().to_ascii_lowercase();
        if model.starts_with("openrouter/") || model.contains("openrouter") {
            Some(AiProvider::OpenRouter)
        } else if model.starts_with("gpt") || model.starts_with("dall-e") {
            Some(AiProvider::OpenAi)
        } else if model.starts_with("gemini") {
            Some(AiProvider::Google)
        } else if model.starts_with("claude") {
            Some(AiProvider::Anthropic)
        } else if model.contains("sonar") {
            Some(AiProvider::Perplexity)
        } else if model.starts_with("deepseek") {
            Some(AiProvider::DeepSeek)
        } else if model.starts_with("llama")
            || model.starts_with("mixtral")
            || model.starts_with("gemma")
        {
            Some(AiProvider::Groq)
        } else {
            None
        }
    }
}

impl std::fmt::Display for AiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AiProvider {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AiProvider::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| crate::Error::Validation(format!("Unknown AI provider: {}", s)))
    }
}

/// Pagination parameters
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: 50,
            offset: 0,
        }
    }
}

/// Paginated response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}
