//! Token budget arithmetic against a model context window
//!
//! - Overflow triggers at `overflow_threshold` of the window (inclusive)
//! - An explicit compression never targets more than that threshold
//! - Adaptive compression targets `adaptive_target_ratio` of the window

use crate::config::CompressionConfig;
use serde::{Deserialize, Serialize};

/// Budget thresholds as fractions of the model context window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContextBudget {
    pub overflow_threshold: f64,
    pub adaptive_target_ratio: f64,
}

impl Default for ContextBudget {
    fn default() -> Self {
        Self {
            overflow_threshold: 0.75,
            adaptive_target_ratio: 0.6,
        }
    }
}

impl From<&CompressionConfig> for ContextBudget {
    fn from(config: &CompressionConfig) -> Self {
        Self {
            overflow_threshold: config.overflow_threshold,
            adaptive_target_ratio: config.adaptive_target_ratio,
        }
    }
}

impl ContextBudget {
    /// Token count at which the window counts as overflowing
    pub fn threshold_tokens(&self, model_context_window: usize) -> usize {
        fraction_of(model_context_window, self.overflow_threshold)
    }

    /// True once `current_tokens` reaches the overflow threshold
    pub fn detect_overflow(&self, current_tokens: usize, model_context_window: usize) -> bool {
        current_tokens as f64 >= model_context_window as f64 * self.overflow_threshold
    }

    /// How far past the threshold the transcript is (1.0 = exactly at it)
    pub fn overflow_severity(&self, current_tokens: usize, model_context_window: usize) -> f64 {
        let threshold = model_context_window as f64 * self.overflow_threshold;
        if threshold <= 0.0 {
            return f64::INFINITY;
        }
        current_tokens as f64 / threshold
    }

    /// Budget a compression actually targets
    pub fn effective_target(&self, max_tokens: usize, model_context_window: usize) -> usize {
        max_tokens.min(self.threshold_tokens(model_context_window))
    }

    /// Budget used by adaptive compression
    pub fn adaptive_target(&self, model_context_window: usize) -> usize {
        fraction_of(model_context_window, self.adaptive_target_ratio)
    }
}

fn fraction_of(tokens: usize, fraction: f64) -> usize {
    (tokens as f64 * fraction).floor() as usize
}
