//! Recency-window truncation with greedy backfill

use super::{Reducer, Reduction, ReductionInput};
use crate::context::models::StrategyKind;
use crate::error::Result;
use async_trait::async_trait;
use std::ops::Range;
use tracing::{debug, warn};

/// Keeps the most recent turns, then backfills older ones while they fit
#[derive(Debug, Clone, Default)]
pub struct TruncateReducer;

impl TruncateReducer {
    pub fn new() -> Self {
        Self
    }

    /// Contiguous suffix of the transcript to keep
    ///
    /// The recency window shrinks one turn at a time until it fits, but never
    /// below a single turn: an oversized last turn is returned on its own.
    /// Backfill stops at the first older turn that would overflow.
    pub fn select(token_counts: &[usize], max_tokens: usize, preserve_recent: usize) -> Range<usize> {
        let len = token_counts.len();
        if len == 0 {
            return 0..0;
        }

        let mut window = preserve_recent.clamp(1, len);
        let mut total: usize = token_counts[len - window..].iter().sum();

        while total > max_tokens && window > 1 {
            total -= token_counts[len - window];
            window -= 1;
        }

        if total > max_tokens {
            warn!(
                "Most recent turn alone needs {} tokens, over budget of {}",
                total, max_tokens
            );
        }

        let mut start = len - window;
        while start > 0 {
            let tokens = token_counts[start - 1];
            if total + tokens > max_tokens {
                break;
            }
            total += tokens;
            start -= 1;
        }

        debug!(
            "Truncate kept {} of {} turns (window {}, {} tokens)",
            len - start,
            len,
            window,
            total
        );

        start..len
    }
}

#[async_trait]
impl Reducer for TruncateReducer {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Truncate
    }

    async fn reduce(&self, input: ReductionInput<'_>) -> Result<Reduction> {
        let range = Self::select(input.token_counts, input.max_tokens, input.preserve_recent);
        Ok(Reduction::from_indices(input.transcript, range))
    }
}
