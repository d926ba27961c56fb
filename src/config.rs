//! Configuration for transcript compression
//!
//! Every threshold the strategies consult lives here so callers (and tests)
//! can substitute their own values. Files are layered under environment
//! overrides prefixed with `CONTEXT_COMPRESSOR`, e.g.
//! `CONTEXT_COMPRESSOR__SUMMARIZE__TIMEOUT_MS=5000`.

use crate::error::{ContextError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

const ENV_PREFIX: &str = "CONTEXT_COMPRESSOR";

/// Compression configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressionConfig {
    /// Fraction of the model context window at which compression triggers
    #[serde(default = "default_overflow_threshold")]
    pub overflow_threshold: f64,

    /// Fraction of the model context window targeted by adaptive compression
    #[serde(default = "default_adaptive_target_ratio")]
    pub adaptive_target_ratio: f64,

    /// Case-insensitive keywords marking a turn as carrying an error signal
    #[serde(default = "default_error_keywords")]
    pub error_keywords: Vec<String>,

    /// Recency window used by truncation when the caller does not set one
    #[serde(default = "default_preserve_recent")]
    pub default_preserve_recent: usize,

    #[serde(default)]
    pub sliding_window: SlidingWindowConfig,

    #[serde(default)]
    pub priority: PriorityConfig,

    #[serde(default)]
    pub summarize: SummarizeConfig,

    /// Iteration cap for refinement loops (partial inclusion trimming)
    #[serde(default = "default_max_reduction_rounds")]
    pub max_reduction_rounds: usize,

    #[serde(default)]
    pub pairing_mode: PairingMode,

    /// Appended to a turn whose text was cut to fit the budget
    #[serde(default = "default_truncation_marker")]
    pub truncation_marker: String,

    /// Prefix identifying a synthetic summary turn
    #[serde(default = "default_summary_marker")]
    pub summary_marker: String,
}

fn default_overflow_threshold() -> f64 {
    0.75
}

fn default_adaptive_target_ratio() -> f64 {
    0.6
}

fn default_error_keywords() -> Vec<String> {
    ["error", "exception", "failed", "failure", "invalid", "unable"]
        .iter()
        .map(|k| k.to_string())
        .collect()
}

fn default_preserve_recent() -> usize {
    5
}

fn default_max_reduction_rounds() -> usize {
    32
}

fn default_truncation_marker() -> String {
    "\n\n[... truncated]".to_string()
}

fn default_summary_marker() -> String {
    "[Summary of earlier conversation]".to_string()
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            overflow_threshold: default_overflow_threshold(),
            adaptive_target_ratio: default_adaptive_target_ratio(),
            error_keywords: default_error_keywords(),
            default_preserve_recent: default_preserve_recent(),
            sliding_window: SlidingWindowConfig::default(),
            priority: PriorityConfig::default(),
            summarize: SummarizeConfig::default(),
            max_reduction_rounds: default_max_reduction_rounds(),
            pairing_mode: PairingMode::default(),
            truncation_marker: default_truncation_marker(),
            summary_marker: default_summary_marker(),
        }
    }
}

impl CompressionConfig {
    /// Load configuration from a file, with environment overrides on top
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the environment only (reads `.env` if present)
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let settings = config::Config::builder()
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate that thresholds and caps are usable
    pub fn validate(&self) -> Result<()> {
        let fractions = [
            ("overflow_threshold", self.overflow_threshold),
            ("adaptive_target_ratio", self.adaptive_target_ratio),
            ("sliding_window.must_keep_fraction", self.sliding_window.must_keep_fraction),
            ("sliding_window.window_fraction", self.sliding_window.window_fraction),
            ("sliding_window.stride_fraction", self.sliding_window.stride_fraction),
            (
                "priority.partial_inclusion_threshold",
                self.priority.partial_inclusion_threshold,
            ),
            ("summarize.preserve_fraction", self.summarize.preserve_fraction),
        ];

        for (name, value) in fractions {
            if !(value > 0.0 && value <= 1.0) {
                return Err(ContextError::Configuration(format!(
                    "{} must be in (0, 1], got {}",
                    name, value
                )));
            }
        }

        if self.summarize.preserve_fraction >= 1.0 {
            return Err(ContextError::Configuration(
                "summarize.preserve_fraction must leave turns to summarize".to_string(),
            ));
        }

        if self.error_keywords.iter().all(|k| k.trim().is_empty()) {
            return Err(ContextError::Configuration(
                "error_keywords must contain at least one keyword".to_string(),
            ));
        }

        if self.max_reduction_rounds == 0 || self.summarize.max_rounds == 0 {
            return Err(ContextError::Configuration(
                "iteration caps must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

/// Sliding window strategy tunables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlidingWindowConfig {
    /// Share of the budget reserved for must-keep turns
    #[serde(default = "default_must_keep_fraction")]
    pub must_keep_fraction: f64,

    /// Window width as a share of the transcript length
    #[serde(default = "default_window_fraction")]
    pub window_fraction: f64,

    /// Stride as a share of the window width
    #[serde(default = "default_stride_fraction")]
    pub stride_fraction: f64,
}

fn default_must_keep_fraction() -> f64 {
    0.3
}

fn default_window_fraction() -> f64 {
    0.3
}

fn default_stride_fraction() -> f64 {
    0.5
}

impl Default for SlidingWindowConfig {
    fn default() -> Self {
        Self {
            must_keep_fraction: default_must_keep_fraction(),
            window_fraction: default_window_fraction(),
            stride_fraction: default_stride_fraction(),
        }
    }
}

/// Priority-based strategy tunables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriorityConfig {
    /// Partial inclusion is only attempted while usage is below this share of the budget
    #[serde(default = "default_partial_inclusion_threshold")]
    pub partial_inclusion_threshold: f64,

    #[serde(default)]
    pub weights: ScoringWeights,
}

fn default_partial_inclusion_threshold() -> f64 {
    0.5
}

impl Default for PriorityConfig {
    fn default() -> Self {
        Self {
            partial_inclusion_threshold: default_partial_inclusion_threshold(),
            weights: ScoringWeights::default(),
        }
    }
}

/// Additive terms of the turn priority score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub recency: f64,
    pub user: f64,
    pub error: f64,
    pub tool: f64,
    pub boundary: f64,
    pub small_bonus: f64,
    pub small_threshold: usize,
    pub large_penalty: f64,
    pub large_threshold: usize,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            recency: 30.0,
            user: 20.0,
            error: 25.0,
            tool: 10.0,
            boundary: 15.0,
            small_bonus: 5.0,
            small_threshold: 100,
            large_penalty: 10.0,
            large_threshold: 1000,
        }
    }
}

/// Summarize strategy tunables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizeConfig {
    /// Share of the most recent turns never sent to the summarizer
    #[serde(default = "default_preserve_fraction")]
    pub preserve_fraction: f64,

    /// Per-call timeout for the summarization collaborator
    #[serde(default = "default_summarize_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum number of summarize-then-retry rounds
    #[serde(default = "default_summarize_max_rounds")]
    pub max_rounds: usize,
}

fn default_preserve_fraction() -> f64 {
    0.2
}

fn default_summarize_timeout_ms() -> u64 {
    30_000
}

fn default_summarize_max_rounds() -> usize {
    8
}

impl Default for SummarizeConfig {
    fn default() -> Self {
        Self {
            preserve_fraction: default_preserve_fraction(),
            timeout_ms: default_summarize_timeout_ms(),
            max_rounds: default_summarize_max_rounds(),
        }
    }
}

impl SummarizeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// How reductions treat tool_use/tool_result pairs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PairingMode {
    /// Accept broken pairs under budget pressure
    #[default]
    Lenient,
    /// Drop the surviving half of any pair the strategy split
    Strict,
}
