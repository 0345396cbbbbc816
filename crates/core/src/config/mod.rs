//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SCRAPECHAT_*)
//! 2. TOML config file (if SCRAPECHAT_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Preamble prepended to every conversation sent to the language model.
pub const DEFAULT_SYSTEM_PROMPT: &str = "you are an academic expert, you always cite your sources and base your responses on the context that you have been provided";

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SCRAPECHAT_*)
/// 2. TOML config file (if SCRAPECHAT_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Socket address the HTTP server binds to.
    ///
    /// Set via SCRAPECHAT_BIND_ADDR environment variable.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Path to the SQLite key-value store backing the scrape cache.
    ///
    /// Set via SCRAPECHAT_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via SCRAPECHAT_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per scrape.
    ///
    /// Set via SCRAPECHAT_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// HTTP request timeout in milliseconds, for both scraping and the LLM.
    ///
    /// Set via SCRAPECHAT_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Groq API key for chat completions.
    ///
    /// Set via SCRAPECHAT_GROQ_API_KEY environment variable.
    /// Required before the server starts, see [`AppConfig::require_groq_api_key`].
    #[serde(default)]
    pub groq_api_key: Option<String>,

    /// Base URL of the OpenAI-compatible Groq endpoint.
    #[serde(default = "default_groq_base_url")]
    pub groq_base_url: String,

    /// Model name passed to chat completions.
    #[serde(default = "default_groq_model")]
    pub groq_model: String,

    /// System preamble prepended to every conversation.
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Whether scrapes consult and populate the cache.
    #[serde(default = "default_true")]
    pub cache_enabled: bool,

    /// Lifetime of a cached scrape in seconds (default: 7 days).
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Largest serialized record the cache accepts, in bytes.
    #[serde(default = "default_cache_max_bytes")]
    pub cache_max_bytes: usize,

    /// Requests admitted per client within one window.
    #[serde(default = "default_rate_limit_requests")]
    pub rate_limit_requests: u32,

    /// Length of the sliding window in seconds.
    #[serde(default = "default_rate_limit_window_secs")]
    pub rate_limit_window_secs: u64,
}

fn default_bind_addr() -> String {
    "127.0.0.1:3000".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./scrapechat-cache.sqlite")
}

fn default_user_agent() -> String {
    "scrapechat/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_groq_base_url() -> String {
    "https://api.groq.com/openai/v1".into()
}

fn default_groq_model() -> String {
    "llama-3.1-8b-instant".into()
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.into()
}

fn default_true() -> bool {
    true
}

fn default_cache_ttl_secs() -> u64 {
    7 * 24 * 60 * 60
}

fn default_cache_max_bytes() -> usize {
    1_048_576
}

fn default_rate_limit_requests() -> u32 {
    4
}

fn default_rate_limit_window_secs() -> u64 {
    60
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            groq_api_key: None,
            groq_base_url: default_groq_base_url(),
            groq_model: default_groq_model(),
            system_prompt: default_system_prompt(),
            cache_enabled: true,
            cache_ttl_secs: default_cache_ttl_secs(),
            cache_max_bytes: default_cache_max_bytes(),
            rate_limit_requests: default_rate_limit_requests(),
            rate_limit_window_secs: default_rate_limit_window_secs(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Cache entry lifetime as Duration.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Rate-limit window as Duration.
    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SCRAPECHAT_`
    /// 2. TOML file from `SCRAPECHAT_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SCRAPECHAT_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SCRAPECHAT_")
                .ignore(&["config_file"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Check if the Groq API key is available (for deferred validation).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if the Groq API key is not set.
    pub fn require_groq_api_key(&self) -> Result<&str, ConfigError> {
        self.groq_api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ConfigError::Missing {
                field: "groq_api_key".into(),
                hint: "Set SCRAPECHAT_GROQ_API_KEY environment variable".into(),
            })
    }
}
