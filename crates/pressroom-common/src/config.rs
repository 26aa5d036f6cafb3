//! Configuration for Pressroom

use crate::types::AiProvider;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable pointing at an explicit config file
pub const CONFIG_PATH_ENV: &str = "PRESSROOM_CONFIG";

/// Prefix for `PRESSROOM__SECTION__KEY` overrides
const ENV_PREFIX: &str = "PRESSROOM";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// API configuration
    #[serde(default)]
    pub api: ApiConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Campaign send configuration
    #[serde(default)]
    pub campaigns: CampaignsConfig,

    /// AI vendor configuration
    #[serde(default)]
    pub ai: AiConfig,

    /// Admin bootstrap configuration
    #[serde(default)]
    pub auth: AuthConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Public hostname
    #[serde(default = "default_hostname")]
    pub hostname: String,

    /// Bind address
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            hostname: default_hostname(),
            bind_address: default_bind_address(),
        }
    }
}

fn default_hostname() -> String {
    "localhost".to_string()
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Connection URL
    pub url: String,

    /// Maximum connections in the pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum connections in the pool
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Run embedded migrations on startup
    #[serde(default = "default_run_migrations")]
    pub run_migrations: bool,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_run_migrations() -> bool {
    true
}

/// File storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory for stored files
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,

    /// Bucket (sub-directory) for uploaded images
    #[serde(default = "default_bucket")]
    pub bucket: String,

    /// Base URL under which the storage root is served
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,

    /// Largest accepted upload in bytes
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
            bucket: default_bucket(),
            public_base_url: default_public_base_url(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("/var/lib/pressroom/storage")
}

fn default_bucket() -> String {
    "images".to_string()
}

fn default_public_base_url() -> String {
    "http://localhost:8080/storage".to_string()
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

/// API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// HTTP port
    #[serde(default = "default_api_port")]
    pub port: u16,

    /// Serve Swagger UI
    #[serde(default = "default_enable_swagger")]
    pub enable_swagger: bool,

    /// Allowed CORS origins; empty allows any origin
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            port: default_api_port(),
            enable_swagger: default_enable_swagger(),
            cors_origins: Vec::new(),
        }
    }
}

fn default_api_port() -> u16 {
    8080
}

fn default_enable_swagger() -> bool {
    true
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// `text` or `json`
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info,pressroom=debug".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

/// Campaign send configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignsConfig {
    /// Delay before a simulated send completes
    #[serde(default = "default_send_delay_secs")]
    pub send_delay_secs: u64,
}

impl Default for CampaignsConfig {
    fn default() -> Self {
        Self {
            send_delay_secs: default_send_delay_secs(),
        }
    }
}

fn default_send_delay_secs() -> u64 {
    5
}

/// AI vendor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    /// Timeout for a single vendor request
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Model used when a request names none
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Vendor base URLs
    #[serde(default)]
    pub endpoints: AiEndpoints,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout_secs(),
            default_model: default_model(),
            endpoints: AiEndpoints::default(),
        }
    }
}

fn default_request_timeout_secs() -> u64 {
    120
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

/// Base URL per vendor, without a trailing slash
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiEndpoints {
    #[serde(default = "default_openai_url")]
    pub openai: String,
    #[serde(default = "default_google_url")]
    pub google: String,
    #[serde(default = "default_anthropic_url")]
    pub anthropic: String,
    #[serde(default = "default_perplexity_url")]
    pub perplexity: String,
    #[serde(default = "default_deepseek_url")]
    pub deepseek: String,
    #[serde(default = "default_groq_url")]
    pub groq: String,
    #[serde(default = "default_openrouter_url")]
    pub openrouter: String,
}

impl AiEndpoints {
    pub fn base_url(&self, provider: AiProvider) -> &str {
        let url = match provider {
            AiProvider::OpenAi => &self.openai,
            AiProvider::Google => &self.google,
            AiProvider::Anthropic => &self.anthropic,
            AiProvider::Perplexity => &self.perplexity,
            AiProvider::DeepSeek => &self.deepseek,
            AiProvider::Groq => &self.groq,
            AiProvider::OpenRouter => &self.openrouter,
        };
        url.trim_end_matches('/')
    }

    /// Point every vendor at the same base URL (used against mock servers)
    pub fn all(url: &str) -> Self {
        Self {
            openai: url.to_string(),
            google: url.to_string(),
            anthropic: url.to_string(),
            perplexity: url.to_string(),
            deepseek: url.to_string(),
            groq: url.to_string(),
            openrouter: url.to_string(),
        }
    }
}

impl Default for AiEndpoints {
    fn default() -> Self {
        Self {
            openai: default_openai_url(),
            google: default_google_url(),
            anthropic: default_anthropic_url(),
            perplexity: default_perplexity_url(),
            deepseek: default_deepseek_url(),
            groq: default_groq_url(),
            openrouter: default_openrouter_url(),
        }
    }
}

fn default_openai_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_google_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_anthropic_url() -> String {
    "https://api.anthropic.com/v1".to_string()
}

fn default_perplexity_url() -> String {
    "https://api.perplexity.ai".to_string()
}

fn default_deepseek_url() -> String {
    "https://api.deepseek.com".to_string()
}

fn default_groq_url() -> String {
    "https://api.groq.com/openai/v1".to_string()
}

fn default_openrouter_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

/// Admin bootstrap configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// When set and no profile with this email exists, an admin profile and
    /// an access token are created at startup
    pub bootstrap_admin_email: Option<String>,
}

impl Config {
    /// Load configuration from file
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Load configuration from the first config file found, layered with
    /// `PRESSROOM__SECTION__KEY` environment overrides
    pub fn load() -> crate::Result<Self> {
        let path = Self::locate();
        if path.is_none() {
            tracing::debug!("No configuration file found, using environment only");
        }
        Self::load_layered(path.as_deref())
    }

    fn locate() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return Some(PathBuf::from(path));
        }

        [
            PathBuf::from("./config.toml"),
            PathBuf::from("/etc/pressroom/config.toml"),
        ]
        .into_iter()
        .find(|p| p.exists())
    }

    fn load_layered(path: Option<&Path>) -> crate::Result<Self> {
        let mut builder = ::config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(
                ::config::File::from(path.to_path_buf()).format(::config::FileFormat::Toml),
            );
        }

        builder = builder.add_source(
            ::config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("api.cors_origins")
                .try_parsing(true),
        );

        builder
            .build()
            .and_then(|c| c.try_deserialize::<Config>())
            .map_err(|e| crate::Error::Config(format!("Failed to load config: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let server = ServerConfig::default();
        assert_eq!(server.hostname, "localhost");
        assert_eq!(server.bind_address, "0.0.0.0");

        assert_eq!(CampaignsConfig::default().send_delay_secs, 5);
        assert_eq!(StorageConfig::default().bucket, "images");
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[database]
url = "postgres://localhost/pressroom"

[storage]
path = "/data/pressroom"
public_base_url = "https://cdn.example.com"

[campaigns]
send_delay_secs = 1

[ai.endpoints]
openai = "http://127.0.0.1:9999/v1/"
"#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.database.url, "postgres://localhost/pressroom");
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.storage.public_base_url, "https://cdn.example.com");
        assert_eq!(config.campaigns.send_delay_secs, 1);
        assert_eq!(
            config.ai.endpoints.base_url(AiProvider::OpenAi),
            "http://127.0.0.1:9999/v1"
        );
        assert_eq!(
            config.ai.endpoints.base_url(AiProvider::Groq),
            "https://api.groq.com/openai/v1"
        );
    }

    #[test]
    fn test_load_layered_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[database]\nurl = \"postgres://db/pressroom\"\n\n[api]\nport = 9090"
        )
        .unwrap();

        let config = Config::load_layered(Some(file.path())).unwrap();
        assert_eq!(config.database.url, "postgres://db/pressroom");
        assert_eq!(config.api.port, 9090);
        assert!(config.api.enable_swagger);
    }

    #[test]
    fn test_missing_database_section_is_an_error() {
        let err = toml::from_str::<Config>("[api]\nport = 1").unwrap_err();
        assert!(err.to_string().contains("database"));
    }
}
