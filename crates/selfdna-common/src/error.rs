//! Error types shared across the selfdna crates

use thiserror::Error;

/// Result type alias for selfdna operations
pub type Result<T> = std::result::Result<T, SelfDnaError>;

/// Main error type for selfdna
#[derive(Error, Debug)]
pub enum SelfDnaError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),
}
