// ABOUTME: Configuration loading and validation for the listing-scout server.
// ABOUTME: Reads environment variables, applies defaults, and rejects malformed values up front.

use std::net::SocketAddr;
use std::time::Duration;

use scout_agent::ToolSettings;
use scout_agent::providers::openai::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use scout_agent::tools::fetch::{DEFAULT_FETCH_TIMEOUT, DEFAULT_USER_AGENT};
use scout_agent::tools::search::DEFAULT_SEARCH_BASE_URL;
use scout_core::{DEFAULT_LOCATION, DomainAllowList};
use thiserror::Error;

pub const DEFAULT_BIND: &str = "127.0.0.1:8787";
pub const DEFAULT_SERVICE_NAME: &str = "listing-scout";

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("SCOUT_BIND is not a valid socket address: {0}")]
    InvalidBind(String),

    #[error("SCOUT_FETCH_TIMEOUT_MS must be a positive number of milliseconds, got {0:?}")]
    InvalidFetchTimeout(String),
}

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ScoutConfig {
    pub bind: SocketAddr,
    pub service_name: String,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub model: String,
    pub search_api_key: Option<String>,
    pub search_base_url: String,
    pub user_agent: String,
    pub allowed_domains: DomainAllowList,
    pub fetch_timeout: Duration,
    pub default_location: String,
    pub moderation: bool,
}

impl Default for ScoutConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8787)),
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            openai_api_key: None,
            openai_base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            search_api_key: None,
            search_base_url: DEFAULT_SEARCH_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            allowed_domains: DomainAllowList::listing_sites(),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            default_location: DEFAULT_LOCATION.to_string(),
            moderation: false,
        }
    }
}

/// Read an environment variable, treating an empty value as unset.
fn env_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl ScoutConfig {
    /// Load configuration from environment variables with sensible defaults.
    ///
    /// Environment variables:
    /// - SCOUT_BIND: socket address to bind (default: 127.0.0.1:8787)
    /// - SCOUT_SERVICE_NAME: name reported by the health check (default: listing-scout)
    /// - OPENAI_API_KEY / OPENAI_BASE_URL: chat model credential and endpoint (with or without `/v1`)
    /// - OPENAI_MODEL, SCOUT_MODEL: model id, SCOUT_MODEL taking precedence (default: gpt-4o-mini)
    /// - TAVILY_API_KEY / TAVILY_BASE_URL: search credential and endpoint
    /// - SCOUT_USER_AGENT: User-Agent for page fetches
    /// - SCOUT_ALLOWED_DOMAINS: comma-separated listing-site allow-list
    /// - SCOUT_FETCH_TIMEOUT_MS: per-fetch timeout (default: 10000)
    /// - SCOUT_DEFAULT_LOCATION: locality used when the request names none (default: Montréal, QC)
    /// - SCOUT_MODERATION: enable the remote moderation check (default: false)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let bind = match env_var("SCOUT_BIND") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidBind(raw))?,
            None => defaults.bind,
        };

        let fetch_timeout = match env_var("SCOUT_FETCH_TIMEOUT_MS") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(ms) if ms > 0 => Duration::from_millis(ms),
                _ => return Err(ConfigError::InvalidFetchTimeout(raw)),
            },
            None => defaults.fetch_timeout,
        };

        let allowed_domains = env_var("SCOUT_ALLOWED_DOMAINS")
            .map(|list| DomainAllowList::parse(&list))
            .unwrap_or(defaults.allowed_domains);

        let moderation = env_var("SCOUT_MODERATION")
            .map(|v| v == "true" || v == "1" || v == "yes")
            .unwrap_or(false);

        Ok(Self {
            bind,
            service_name: env_var("SCOUT_SERVICE_NAME").unwrap_or(defaults.service_name),
            openai_api_key: env_var("OPENAI_API_KEY"),
            openai_base_url: env_var("OPENAI_BASE_URL").unwrap_or(defaults.openai_base_url),
            model: env_var("SCOUT_MODEL")
                .or_else(|| env_var("OPENAI_MODEL"))
                .unwrap_or(defaults.model),
            search_api_key: env_var("TAVILY_API_KEY"),
            search_base_url: env_var("TAVILY_BASE_URL").unwrap_or(defaults.search_base_url),
            user_agent: env_var("SCOUT_USER_AGENT").unwrap_or(defaults.user_agent),
            allowed_domains,
            fetch_timeout,
            default_location: env_var("SCOUT_DEFAULT_LOCATION")
                .unwrap_or(defaults.default_location),
            moderation,
        })
    }

    /// The subset of configuration the listing tools consume.
    pub fn tool_settings(&self) -> ToolSettings {
        ToolSettings {
            search_api_key: self.search_api_key.clone(),
            search_base_url: self.search_base_url.clone(),
            user_agent: self.user_agent.clone(),
            fetch_timeout: self.fetch_timeout,
            allowed_domains: self.allowed_domains.clone(),
        }
    }
}
