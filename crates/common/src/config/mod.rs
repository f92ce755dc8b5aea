//! Configuration management for JurisRAG services
//!
//! Supports loading configuration from:
//! - A `.env` file in the working directory
//! - Configuration files (config/default, config/{APP_ENV}, config/local)
//! - Environment variables (prefixed with APP__)
//! - The flat variables used by earlier deployments (OPENAI_API_KEY,
//!   QDRANT_URL, QDRANT_API_KEY, QDRANT_COLLECTION_NAME, MODELO_EMBEDDING,
//!   MODELO_CHAT, API_PORT), which take precedence when set
//! - Default values

use crate::errors::{AppError, Result};
use config::{builder::DefaultState, Config, ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Embedding provider configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Chat model configuration
    #[serde(default)]
    pub llm: LlmConfig,

    /// Vector index configuration
    #[serde(default)]
    pub index: IndexConfig,

    /// Retrieval tuning
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Whole-request timeout in seconds (classification + retrieval + synthesis)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Shutdown timeout in seconds
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddingConfig {
    /// API key for the embedding service
    pub api_key: Option<String>,

    /// API base URL (for OpenAI-compatible endpoints)
    #[serde(default = "default_openai_base")]
    pub api_base: String,

    /// Model to use
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Request timeout in seconds
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,

    /// Maximum attempts per embedding request
    #[serde(default = "default_embedding_retries")]
    pub max_retries: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    /// API key for the chat completion service
    pub api_key: Option<String>,

    /// API base URL (for OpenAI-compatible endpoints)
    #[serde(default = "default_openai_base")]
    pub api_base: String,

    /// Chat model
    #[serde(default = "default_chat_model")]
    pub model: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Request timeout in seconds
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndexConfig {
    /// Qdrant URL (gRPC port)
    #[serde(default = "default_index_url")]
    pub url: String,

    /// Qdrant API key
    pub api_key: Option<String>,

    /// Collection holding the case chunks
    pub collection: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetrievalConfig {
    /// Domain acronyms that switch a legal query to hybrid search
    #[serde(default = "default_keywords")]
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Metrics port (0 to disable)
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    /// Service name reported in logs
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8000 }
fn default_request_timeout() -> u64 { 60 }
fn default_shutdown_timeout() -> u64 { 30 }
fn default_openai_base() -> String { "https://api.openai.com/v1".to_string() }
fn default_embedding_model() -> String { "text-embedding-3-small".to_string() }
fn default_embedding_timeout() -> u64 { 30 }
fn default_embedding_retries() -> u32 { 3 }
fn default_chat_model() -> String { "gpt-4.1-mini".to_string() }
fn default_temperature() -> f32 { 0.3 }
fn default_llm_timeout() -> u64 { 45 }
fn default_index_url() -> String { "http://localhost:6334".to_string() }
fn default_keywords() -> Vec<String> { vec!["PIAR".to_string()] }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_metrics_port() -> u16 { 9090 }
fn default_service_name() -> String { "jurisrag".to_string() }

/// Flat environment variables and the config keys they override
const LEGACY_ENV_KEYS: &[(&str, &[&str])] = &[
    ("OPENAI_API_KEY", &["embedding.api_key", "llm.api_key"]),
    ("QDRANT_URL", &["index.url"]),
    ("QDRANT_API_KEY", &["index.api_key"]),
    ("QDRANT_COLLECTION_NAME", &["index.collection"]),
    ("MODELO_EMBEDDING", &["embedding.model"]),
    ("MODELO_CHAT", &["llm.model"]),
    ("API_PORT", &["server.port"]),
];

impl AppConfig {
    /// Load configuration from `.env`, config files, and environment
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let builder = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., APP__SERVER__PORT=8081
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = Self::apply_legacy_env(builder, |name| std::env::var(name).ok())?
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    fn apply_legacy_env<F>(
        mut builder: ConfigBuilder<DefaultState>,
        lookup: F,
    ) -> std::result::Result<ConfigBuilder<DefaultState>, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        for (var, keys) in LEGACY_ENV_KEYS {
            let value = lookup(var).filter(|v| !v.trim().is_empty());
            for key in *keys {
                builder = builder.set_override_option(*key, value.clone())?;
            }
        }
        Ok(builder)
    }

    /// Check that every external service has what it needs to connect
    pub fn validate(&self) -> Result<()> {
        if self.embedding.api_key.as_deref().unwrap_or_default().is_empty() {
            return Err(AppError::Configuration {
                message: "embedding.api_key (or OPENAI_API_KEY) is required".to_string(),
            });
        }
        if self.llm.api_key.as_deref().unwrap_or_default().is_empty() {
            return Err(AppError::Configuration {
                message: "llm.api_key (or OPENAI_API_KEY) is required".to_string(),
            });
        }
        if self.index.url.trim().is_empty() {
            return Err(AppError::Configuration {
                message: "index.url (or QDRANT_URL) is required".to_string(),
            });
        }
        if self.collection().is_none() {
            return Err(AppError::Configuration {
                message: "index.collection (or QDRANT_COLLECTION_NAME) is required".to_string(),
            });
        }
        Ok(())
    }

    /// Collection name, if configured and non-empty
    pub fn collection(&self) -> Option<&str> {
        self.index.collection.as_deref().filter(|c| !c.trim().is_empty())
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.server.shutdown_timeout_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
            shutdown_timeout_secs: default_shutdown_timeout(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: default_openai_base(),
            model: default_embedding_model(),
            timeout_secs: default_embedding_timeout(),
            max_retries: default_embedding_retries(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: default_openai_base(),
            model: default_chat_model(),
            temperature: default_temperature(),
            timeout_secs: default_llm_timeout(),
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            url: default_index_url(),
            api_key: None,
            collection: None,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            keywords: default_keywords(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            metrics_port: default_metrics_port(),
            service_name: default_service_name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.embedding.model, "text-embedding-3-small");
        assert_eq!(config.llm.model, "gpt-4.1-mini");
        assert_eq!(config.retrieval.keywords, vec!["PIAR".to_string()]);
    }

    #[test]
    fn test_legacy_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("OPENAI_API_KEY", "sk-test"),
            ("QDRANT_COLLECTION_NAME", "sentencias"),
            ("API_PORT", "8123"),
            ("MODELO_CHAT", "   "),
        ]
        .into_iter()
        .collect();

        let config: AppConfig = AppConfig::apply_legacy_env(Config::builder(), |name| {
            vars.get(name).map(|v| v.to_string())
        })
        .unwrap()
        .build()
        .unwrap()
        .try_deserialize()
        .unwrap();

        assert_eq!(config.embedding.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.llm.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.collection(), Some("sentencias"));
        assert_eq!(config.server.port, 8123);
        // blank values are ignored
        assert_eq!(config.llm.model, "gpt-4.1-mini");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_requires_collection() {
        let mut config = AppConfig::default();
        config.embedding.api_key = Some("sk-test".into());
        config.llm.api_key = Some("sk-test".into());

        let err = config.validate().unwrap_err();
        assert!(matches!(err, AppError::Configuration { .. }));

        config.index.collection = Some("sentencias".into());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_requires_api_key() {
        let mut config = AppConfig::default();
        config.index.collection = Some("sentencias".into());
        assert!(config.validate().is_err());
    }
}
