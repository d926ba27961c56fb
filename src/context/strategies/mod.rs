//! Reduction strategies
//!
//! Every strategy takes the same [`ReductionInput`] and returns a
//! [`Reduction`] whose turns are in chronological order. Per-turn token
//! counts are computed once by the caller and shared through the input.

pub mod priority_based;
pub mod sliding_window;
pub mod summarize;
pub mod truncate;

pub use priority_based::PriorityBasedReducer;
pub use sliding_window::SlidingWindowReducer;
pub use summarize::SummarizeReducer;
pub use truncate::TruncateReducer;

use super::models::{StrategyKind, Turn};
use crate::error::Result;
use async_trait::async_trait;

/// Everything a strategy needs for one call
#[derive(Debug, Clone, Copy)]
pub struct ReductionInput<'a> {
    pub transcript: &'a [Turn],
    /// Parallel to `transcript`
    pub token_counts: &'a [usize],
    pub max_tokens: usize,
    pub preserve_recent: usize,
    pub preserve_important: bool,
}

impl<'a> ReductionInput<'a> {
    pub fn new(transcript: &'a [Turn], token_counts: &'a [usize], max_tokens: usize) -> Self {
        Self {
            transcript,
            token_counts,
            max_tokens,
            preserve_recent: 5,
            preserve_important: true,
        }
    }
}

/// A turn chosen by a strategy
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedTurn {
    /// Index in the input transcript; `None` for synthetic turns
    pub source: Option<usize>,
    pub turn: Turn,
}

impl SelectedTurn {
    pub fn original(index: usize, turn: &Turn) -> Self {
        Self {
            source: Some(index),
            turn: turn.clone(),
        }
    }

    pub fn synthetic(turn: Turn) -> Self {
        Self { source: None, turn }
    }
}

/// Strategy output
#[derive(Debug, Clone, Default)]
pub struct Reduction {
    pub selected: Vec<SelectedTurn>,
    pub summary: Option<String>,
}

impl Reduction {
    /// Build from kept indices, restoring chronological order
    pub fn from_indices(transcript: &[Turn], indices: impl IntoIterator<Item = usize>) -> Self {
        let mut indices: Vec<usize> = indices.into_iter().collect();
        indices.sort_unstable();
        indices.dedup();

        Self {
            selected: indices
                .into_iter()
                .map(|i| SelectedTurn::original(i, &transcript[i]))
                .collect(),
            summary: None,
        }
    }

    pub fn into_transcript(self) -> Vec<Turn> {
        self.selected.into_iter().map(|s| s.turn).collect()
    }
}

/// One reduction algorithm
#[async_trait]
pub trait Reducer: Send + Sync {
    fn kind(&self) -> StrategyKind;

    async fn reduce(&self, input: ReductionInput<'_>) -> Result<Reduction>;
}

/// Maps each strategy kind to its implementation
pub struct StrategyTable {
    pub truncate: TruncateReducer,
    pub sliding_window: SlidingWindowReducer,
    pub priority_based: PriorityBasedReducer,
    pub summarize: SummarizeReducer,
}

impl StrategyTable {
    pub fn get(&self, kind: StrategyKind) -> &dyn Reducer {
        match kind {
            StrategyKind::Truncate => &self.truncate,
            StrategyKind::SlidingWindow => &self.sliding_window,
            StrategyKind::PriorityBased => &self.priority_based,
            StrategyKind::Summarize => &self.summarize,
        }
    }
}
