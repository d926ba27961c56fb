//! Error types for transcript compression

use crate::context::summarizer::SummarizerError;
use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, ContextError>;

/// Compression errors
///
/// Running out of budget is not represented here: strategies degrade to
/// keeping at least one turn and report it through the compression ratio.
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("Token estimation failed: {0}")]
    Estimation(String),

    #[error("Summarization failed: {0}")]
    Summarization(#[from] SummarizerError),

    #[error("Summarization timed out after {timeout_ms} ms")]
    SummarizationTimeout { timeout_ms: u64 },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<config::ConfigError> for ContextError {
    fn from(err: config::ConfigError) -> Self {
        ContextError::Configuration(err.to_string())
    }
}
