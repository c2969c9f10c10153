// Ingestion configuration

use selfdna_common::{Result, SelfDnaError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_CONCURRENCY: usize = 1;
pub const DEFAULT_PROGRESS_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_DB_DIR: &str = "databases";

/// Settings for one ingestion run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Annotation lookups in flight at once (1 = strictly serial)
    pub concurrency: usize,

    /// How often progress observers poll
    pub progress_interval_ms: u64,

    /// Directory holding per-sample databases
    pub db_dir: PathBuf,
}

impl Default for IngestConfig {
    fn default() -> Self {
        IngestConfig {
            concurrency: DEFAULT_CONCURRENCY,
            progress_interval_ms: DEFAULT_PROGRESS_INTERVAL_MS,
            db_dir: PathBuf::from(DEFAULT_DB_DIR),
        }
    }
}

impl IngestConfig {
    pub fn builder() -> IngestConfigBuilder {
        IngestConfigBuilder::default()
    }

    /// Load configuration from environment variables
    ///
    /// - `SELFDNA_CONCURRENCY`
    /// - `SELFDNA_PROGRESS_INTERVAL_MS`
    /// - `SELFDNA_DB_DIR`
    pub fn from_env() -> Result<Self> {
        let default = Self::default();

        let concurrency = match std::env::var("SELFDNA_CONCURRENCY") {
            Ok(v) => v.trim().parse().map_err(|_| {
                SelfDnaError::Config(format!("Invalid SELFDNA_CONCURRENCY: {}", v))
            })?,
            Err(_) => default.concurrency,
        };

        let progress_interval_ms = match std::env::var("SELFDNA_PROGRESS_INTERVAL_MS") {
            Ok(v) => v.trim().parse().map_err(|_| {
                SelfDnaError::Config(format!("Invalid SELFDNA_PROGRESS_INTERVAL_MS: {}", v))
            })?,
            Err(_) => default.progress_interval_ms,
        };

        let db_dir = std::env::var("SELFDNA_DB_DIR")
            .map(PathBuf::from)
            .unwrap_or(default.db_dir);

        let config = Self {
            concurrency,
            progress_interval_ms,
            db_dir,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(SelfDnaError::Config("Concurrency must be at least 1".to_string()));
        }

        if self.progress_interval_ms == 0 {
            return Err(SelfDnaError::Config(
                "Progress interval must be greater than 0".to_string(),
            ));
        }

        if self.db_dir.as_os_str().is_empty() {
            return Err(SelfDnaError::Config("Database directory cannot be empty".to_string()));
        }

        Ok(())
    }
}

/// Builder for IngestConfig
#[derive(Debug, Default)]
pub struct IngestConfigBuilder {
    concurrency: Option<usize>,
    progress_interval_ms: Option<u64>,
    db_dir: Option<PathBuf>,
}

impl IngestConfigBuilder {
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = Some(concurrency);
        self
    }

    pub fn progress_interval_ms(mut self, ms: u64) -> Self {
        self.progress_interval_ms = Some(ms);
        self
    }

    pub fn db_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.db_dir = Some(dir.into());
        self
    }

    pub fn build(self) -> IngestConfig {
        let default = IngestConfig::default();

        IngestConfig {
            concurrency: self.concurrency.unwrap_or(default.concurrency),
            progress_interval_ms: self
                .progress_interval_ms
                .unwrap_or(default.progress_interval_ms),
            db_dir: self.db_dir.unwrap_or(default.db_dir),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_serial() {
        let config = IngestConfig::default();
        assert_eq!(config.concurrency, 1);
        assert_eq!(config.progress_interval(), Duration::from_secs(1));
        assert_eq!(config.db_dir, PathBuf::from("databases"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_and_validation() {
        let config = IngestConfig::builder().concurrency(8).db_dir("/tmp/dbs").build();
        assert_eq!(config.concurrency, 8);
        assert_eq!(config.db_dir, PathBuf::from("/tmp/dbs"));

        assert!(IngestConfig::builder().concurrency(0).build().validate().is_err());
        assert!(IngestConfig::builder().progress_interval_ms(0).build().validate().is_err());
    }
}
