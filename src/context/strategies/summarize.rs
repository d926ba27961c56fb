//! Collapse older turns into one synthetic summary turn

use super::{Reducer, Reduction, ReductionInput, SelectedTurn};
use crate::config::SummarizeConfig;
use crate::context::classifier::render_turn;
use crate::context::models::{Role, StrategyKind, Turn};
use crate::context::summarizer::Summarizer;
use crate::context::token_estimator::TranscriptCounter;
use crate::error::{ContextError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

/// Summarizes the oldest turns and keeps a recent tail verbatim
///
/// If the summary plus the preserved tail is still over budget, the tail
/// becomes the next round's input. The tail strictly shrinks every round,
/// and rounds are capped by `max_rounds`.
pub struct SummarizeReducer {
    summarizer: Arc<dyn Summarizer>,
    counter: TranscriptCounter,
    config: SummarizeConfig,
    summary_marker: String,
}

impl SummarizeReducer {
    pub fn new(
        summarizer: Arc<dyn Summarizer>,
        counter: TranscriptCounter,
        config: SummarizeConfig,
        summary_marker: String,
    ) -> Self {
        Self {
            summarizer,
            counter,
            config,
            summary_marker,
        }
    }

    pub fn summary_turn(&self, summary: &str) -> Turn {
        Turn::user(format!("{}\n{}", self.summary_marker, summary))
    }

    async fn generate(&self, older: &[Turn], max_tokens: usize) -> Result<String> {
        let texts: Vec<String> = older
            .iter()
            .map(|turn| {
                let role = match turn.role {
                    Role::User => "user",
                    Role::Assistant => "assistant",
                };
                format!("{}: {}", role, render_turn(turn))
            })
            .collect();

        let timeout = self.config.timeout();
        match tokio::time::timeout(timeout, self.summarizer.summarize(&texts, max_tokens)).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(ContextError::SummarizationTimeout {
                timeout_ms: self.config.timeout_ms,
            }),
        }
    }
}

#[async_trait]
impl Reducer for SummarizeReducer {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Summarize
    }

    async fn reduce(&self, input: ReductionInput<'_>) -> Result<Reduction> {
        let transcript = input.transcript;
        let counts = input.token_counts;
        let len = transcript.len();

        // tokens the marker adds on top of the summary text
        let overhead = self.counter.count_turn(&self.summary_turn(""))?;
        let mut offset = 0;
        let mut best = Reduction::default();

        for round in 0..self.config.max_rounds {
            let remaining = len - offset;
            if remaining == 0 {
                break;
            }

            let preserve = (remaining as f64 * self.config.preserve_fraction).floor() as usize;
            let split = len - preserve.min(remaining - 1);
            let preserved_tokens: usize = counts[split..].iter().sum();
            let summary_budget = input
                .max_tokens
                .saturating_sub(preserved_tokens + overhead)
                .max(1);

            let summary = self
                .generate(&transcript[offset..split], summary_budget)
                .await?;
            let summary_turn = self.summary_turn(&summary);
            let total = self.counter.count_turn(&summary_turn)? + preserved_tokens;

            let mut selected = Vec::with_capacity(len - split + 1);
            selected.push(SelectedTurn::synthetic(summary_turn));
            selected.extend((split..len).map(|i| SelectedTurn::original(i, &transcript[i])));

            debug!(
                "Summarize round {}: {} turns summarized, {} preserved, {} tokens (budget {})",
                round,
                split - offset,
                len - split,
                total,
                input.max_tokens
            );

            best = Reduction {
                selected,
                summary: Some(summary),
            };

            if total <= input.max_tokens {
                return Ok(best);
            }

            offset = split;
        }

        warn!(
            "Summarization could not reach budget of {} tokens",
            input.max_tokens
        );
        Ok(best)
    }
}
