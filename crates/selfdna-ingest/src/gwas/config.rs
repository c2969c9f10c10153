// GWAS Catalog HTTP Configuration

use selfdna_common::{Result, SelfDnaError};
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://www.ebi.ac.uk/gwas/rest/api/";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 1;
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 500;
pub const DEFAULT_USER_AGENT: &str = concat!("selfdna-ingest/", env!("CARGO_PKG_VERSION"));

/// Configuration for GWAS Catalog lookups
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GwasConfig {
    /// Base URL of the REST API; variant lookups are resolved against it
    pub base_url: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Attempts per request (1 = no retry)
    pub max_attempts: u32,

    /// Delay before retry n is `n * retry_backoff_ms`
    pub retry_backoff_ms: u64,

    pub user_agent: String,
}

impl Default for GwasConfig {
    fn default() -> Self {
        GwasConfig {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_backoff_ms: DEFAULT_RETRY_BACKOFF_MS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl GwasConfig {
    pub fn builder() -> GwasConfigBuilder {
        GwasConfigBuilder::default()
    }

    /// Load configuration from environment variables
    ///
    /// - `GWAS_BASE_URL`
    /// - `GWAS_TIMEOUT_SECS`
    /// - `GWAS_MAX_RETRIES` (total attempts per request)
    /// - `GWAS_RETRY_BACKOFF_MS`
    pub fn from_env() -> Result<Self> {
        let default = Self::default();

        let config = Self {
            base_url: std::env::var("GWAS_BASE_URL").unwrap_or(default.base_url),
            timeout_secs: env_parse("GWAS_TIMEOUT_SECS")?.unwrap_or(default.timeout_secs),
            max_attempts: env_parse("GWAS_MAX_RETRIES")?.unwrap_or(default.max_attempts),
            retry_backoff_ms: env_parse("GWAS_RETRY_BACKOFF_MS")?
                .unwrap_or(default.retry_backoff_ms),
            user_agent: default.user_agent,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(SelfDnaError::Config("GWAS base URL cannot be empty".to_string()));
        }

        if url::Url::parse(&self.base_url).is_err() {
            return Err(SelfDnaError::Config(format!(
                "GWAS base URL is not a valid URL: {}",
                self.base_url
            )));
        }

        if self.timeout_secs == 0 {
            return Err(SelfDnaError::Config("Timeout must be greater than 0".to_string()));
        }

        if self.max_attempts == 0 {
            return Err(SelfDnaError::Config("Max attempts must be at least 1".to_string()));
        }

        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| SelfDnaError::Config(format!("Invalid value for {}: {}", key, value))),
        Err(_) => Ok(None),
    }
}

/// Builder for GwasConfig
#[derive(Debug, Default)]
pub struct GwasConfigBuilder {
    base_url: Option<String>,
    timeout_secs: Option<u64>,
    max_attempts: Option<u32>,
    retry_backoff_ms: Option<u64>,
    user_agent: Option<String>,
}

impl GwasConfigBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.retry_backoff_ms = Some(ms);
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn build(self) -> GwasConfig {
        let default = GwasConfig::default();

        GwasConfig {
            base_url: self.base_url.unwrap_or(default.base_url),
            timeout_secs: self.timeout_secs.unwrap_or(default.timeout_secs),
            max_attempts: self.max_attempts.unwrap_or(default.max_attempts),
            retry_backoff_ms: self.retry_backoff_ms.unwrap_or(default.retry_backoff_ms),
            user_agent: self.user_agent.unwrap_or(default.user_agent),
        }
    }
}
