//! Token estimation for turns and transcripts

use super::models::{ContentBlock, Turn, TurnContent};
use crate::error::{ContextError, Result};
use std::borrow::Cow;
use std::sync::Arc;
use tiktoken_rs::{cl100k_base, CoreBPE};

/// Token estimator trait for different tokenization strategies
pub trait TokenEstimator: Send + Sync {
    /// Estimate the number of tokens in the given text
    fn estimate(&self, text: &str) -> Result<usize>;
}

/// Tiktoken-based token estimator using cl100k_base (GPT-4, GPT-3.5-turbo)
#[derive(Clone)]
pub struct TiktokenEstimator {
    bpe: Arc<CoreBPE>,
}

impl TiktokenEstimator {
    /// Create a new tiktoken estimator with cl100k_base encoding
    pub fn new() -> Result<Self> {
        let bpe = cl100k_base().map_err(|e| {
            ContextError::Configuration(format!("Failed to load cl100k_base: {}", e))
        })?;
        Ok(Self { bpe: Arc::new(bpe) })
    }
}

impl TokenEstimator for TiktokenEstimator {
    fn estimate(&self, text: &str) -> Result<usize> {
        Ok(self.bpe.encode_with_special_tokens(text).len())
    }
}

/// Word-based token estimator (fallback, ~1.3 tokens per word)
#[derive(Debug, Clone, Copy)]
pub struct WordBasedEstimator {
    tokens_per_word: f64,
}

impl WordBasedEstimator {
    pub fn new(tokens_per_word: f64) -> Self {
        Self { tokens_per_word }
    }
}

impl Default for WordBasedEstimator {
    fn default() -> Self {
        Self::new(1.3)
    }
}

impl TokenEstimator for WordBasedEstimator {
    fn estimate(&self, text: &str) -> Result<usize> {
        let word_count = text.split_whitespace().count();
        Ok((word_count as f64 * self.tokens_per_word).ceil() as usize)
    }
}

/// Counts turns and transcripts against a [`TokenEstimator`]
///
/// Counting is additive: a transcript costs the sum of its turns, and a
/// structured turn the sum of its blocks. Strategies rely on this to
/// measure each turn once and do their accounting on the cached numbers.
#[derive(Clone)]
pub struct TranscriptCounter {
    estimator: Arc<dyn TokenEstimator>,
}

impl TranscriptCounter {
    pub fn new(estimator: Arc<dyn TokenEstimator>) -> Self {
        Self { estimator }
    }

    pub fn count_text(&self, text: &str) -> Result<usize> {
        self.estimator.estimate(text)
    }

    /// Tokens for one block; unknown block kinds cost nothing
    pub fn count_block(&self, block: &ContentBlock) -> Result<usize> {
        match block {
            ContentBlock::Text { text } => self.estimator.estimate(text),
            ContentBlock::ToolUse { input, .. } => {
                let serialized = serde_json::to_string(input)?;
                self.estimator.estimate(&serialized)
            }
            ContentBlock::ToolResult { content, .. } => {
                let rendered = render_value(content)?;
                self.estimator.estimate(&rendered)
            }
            ContentBlock::Unknown => Ok(0),
        }
    }

    pub fn count_turn(&self, turn: &Turn) -> Result<usize> {
        match &turn.content {
            TurnContent::Text(text) => self.estimator.estimate(text),
            TurnContent::Blocks(blocks) => blocks.iter().map(|b| self.count_block(b)).sum(),
        }
    }

    pub fn count(&self, transcript: &[Turn]) -> Result<usize> {
        transcript.iter().map(|t| self.count_turn(t)).sum()
    }

    /// Per-turn counts, in transcript order
    pub fn count_each(&self, transcript: &[Turn]) -> Result<Vec<usize>> {
        transcript.iter().map(|t| self.count_turn(t)).collect()
    }
}

/// Strings render as-is, anything else as canonical JSON
pub(crate) fn render_value(value: &serde_json::Value) -> Result<Cow<'_, str>> {
    match value {
        serde_json::Value::String(s) => Ok(Cow::Borrowed(s)),
        other => Ok(Cow::Owned(serde_json::to_string(other)?)),
    }
}
