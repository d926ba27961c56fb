//! Global ranking by priority score with partial inclusion of an overflow turn

use super::{Reducer, Reduction, ReductionInput, SelectedTurn};
use crate::context::models::{ContentBlock, StrategyKind, Turn, TurnContent};
use crate::context::priority::PriorityScorer;
use crate::context::token_estimator::TranscriptCounter;
use crate::error::Result;
use async_trait::async_trait;
use std::cmp::Ordering;
use tracing::debug;

/// Keeps the highest-scoring turns that fit, in chronological order
#[derive(Clone)]
pub struct PriorityBasedReducer {
    scorer: PriorityScorer,
    counter: TranscriptCounter,
    partial_inclusion_threshold: f64,
    truncation_marker: String,
    max_rounds: usize,
}

impl PriorityBasedReducer {
    pub fn new(
        scorer: PriorityScorer,
        counter: TranscriptCounter,
        partial_inclusion_threshold: f64,
        truncation_marker: String,
        max_rounds: usize,
    ) -> Self {
        Self {
            scorer,
            counter,
            partial_inclusion_threshold,
            truncation_marker,
            max_rounds,
        }
    }

    /// Cut the turn's text (or its last text block) to fit `remaining` tokens
    ///
    /// Returns `None` when the turn has no text to cut or nothing meaningful fits.
    fn truncate_turn(
        &self,
        turn: &Turn,
        turn_tokens: usize,
        remaining: usize,
    ) -> Result<Option<(Turn, usize)>> {
        let text = match last_text(turn) {
            Some(text) if !text.is_empty() => text,
            _ => return Ok(None),
        };

        let text_tokens = self.counter.count_text(text)?.max(1);
        let other_tokens = turn_tokens.saturating_sub(text_tokens);
        let marker_tokens = self.counter.count_text(&self.truncation_marker)?;
        if other_tokens + marker_tokens >= remaining {
            return Ok(None);
        }

        let available = remaining - other_tokens - marker_tokens;
        let total_chars = text.chars().count();
        let mut keep_chars =
            ((total_chars as f64) * (available as f64 / text_tokens as f64)).floor() as usize;
        keep_chars = keep_chars.min(total_chars);

        for _ in 0..self.max_rounds {
            if keep_chars == 0 {
                break;
            }

            let cut = format!("{}{}", char_prefix(text, keep_chars), self.truncation_marker);
            let candidate = replace_last_text(turn, cut);
            let tokens = self.counter.count_turn(&candidate)?;
            if tokens <= remaining {
                return Ok(Some((candidate, tokens)));
            }

            let next = keep_chars * 9 / 10;
            keep_chars = if next == keep_chars { keep_chars - 1 } else { next };
        }

        Ok(None)
    }
}

#[async_trait]
impl Reducer for PriorityBasedReducer {
    fn kind(&self) -> StrategyKind {
        StrategyKind::PriorityBased
    }

    async fn reduce(&self, input: ReductionInput<'_>) -> Result<Reduction> {
        let mut records = self.scorer.score(input.transcript, input.token_counts);
        // stable: equal scores keep transcript order
        records.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

        let max_tokens = input.max_tokens;
        let partial_limit = max_tokens as f64 * self.partial_inclusion_threshold;
        let mut selected: Vec<SelectedTurn> = Vec::new();
        let mut total = 0usize;

        for record in &records {
            if total >= max_tokens {
                break;
            }

            if total + record.token_count <= max_tokens {
                total += record.token_count;
                selected.push(SelectedTurn::original(record.index, record.turn));
                continue;
            }

            // too big to keep whole: cut it down while under half budget, else skip it
            if (total as f64) < partial_limit {
                let remaining = max_tokens - total;
                if let Some((turn, tokens)) =
                    self.truncate_turn(record.turn, record.token_count, remaining)?
                {
                    debug!(
                        "Partially included turn {} ({} -> {} tokens)",
                        record.index, record.token_count, tokens
                    );
                    total += tokens;
                    selected.push(SelectedTurn {
                        source: Some(record.index),
                        turn,
                    });
                    break;
                }
            }
        }

        selected.sort_by_key(|s| s.source);

        debug!(
            "Priority-based kept {} of {} turns ({} tokens)",
            selected.len(),
            input.transcript.len(),
            total
        );

        Ok(Reduction {
            selected,
            summary: None,
        })
    }
}

fn last_text(turn: &Turn) -> Option<&str> {
    match &turn.content {
        TurnContent::Text(text) => Some(text.as_str()),
        TurnContent::Blocks(blocks) => blocks.iter().rev().find_map(|b| match b {
            ContentBlock::Text { text } => Some(text.as_str()),
            _ => None,
        }),
    }
}

fn replace_last_text(turn: &Turn, text: String) -> Turn {
    let content = match &turn.content {
        TurnContent::Text(_) => TurnContent::Text(text),
        TurnContent::Blocks(blocks) => {
            let mut blocks = blocks.clone();
            if let Some(block) = blocks
                .iter_mut()
                .rev()
                .find(|b| matches!(b, ContentBlock::Text { .. }))
            {
                *block = ContentBlock::Text { text };
            }
            TurnContent::Blocks(blocks)
        }
    };
    Turn::new(turn.role, content)
}

fn char_prefix(text: &str, chars: usize) -> &str {
    match text.char_indices().nth(chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}
