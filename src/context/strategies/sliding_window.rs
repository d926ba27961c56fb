//! Important turns plus periodic representatives sampled across windows

use super::{Reducer, Reduction, ReductionInput};
use crate::config::SlidingWindowConfig;
use crate::context::classifier::TurnClassifier;
use crate::context::models::StrategyKind;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::ops::Range;
use tracing::debug;

/// Must-keep turns first, then one representative per window, newest first
#[derive(Debug, Clone)]
pub struct SlidingWindowReducer {
    config: SlidingWindowConfig,
    classifier: TurnClassifier,
}

struct TurnSignals {
    is_user: bool,
    has_error: bool,
}

impl SlidingWindowReducer {
    pub fn new(config: SlidingWindowConfig, classifier: TurnClassifier) -> Self {
        Self { config, classifier }
    }

    fn select(&self, input: &ReductionInput<'_>) -> BTreeSet<usize> {
        let len = input.transcript.len();
        let counts = input.token_counts;
        let mut selected = BTreeSet::new();
        if len == 0 {
            return selected;
        }

        let signals: Vec<TurnSignals> = input
            .transcript
            .iter()
            .map(|turn| TurnSignals {
                is_user: self.classifier.is_user_authored(turn),
                has_error: self.classifier.has_error_signal(turn),
            })
            .collect();

        let mut total = 0usize;

        if input.preserve_important {
            let must_keep_budget =
                (input.max_tokens as f64 * self.config.must_keep_fraction).floor() as usize;

            for (index, signal) in signals.iter().enumerate() {
                let is_boundary = index == 0 || index + 1 == len;
                if !(signal.is_user || signal.has_error || is_boundary) {
                    continue;
                }
                if total + counts[index] > must_keep_budget {
                    break;
                }
                total += counts[index];
                selected.insert(index);
            }

            debug!(
                "Sliding window must-keep pass: {} turns, {} tokens (cap {})",
                selected.len(),
                total,
                must_keep_budget
            );
        }

        let width = ((len as f64 * self.config.window_fraction).ceil() as usize).clamp(1, len);
        let stride = ((width as f64 * self.config.stride_fraction).floor() as usize).max(1);

        let mut end = len;
        loop {
            let start = end.saturating_sub(width);
            let representative = Self::representative(start..end, &signals, counts);

            if !selected.contains(&representative) {
                if total + counts[representative] > input.max_tokens {
                    break;
                }
                total += counts[representative];
                selected.insert(representative);
            }

            if start == 0 {
                break;
            }
            end -= stride;
        }

        debug!(
            "Sliding window kept {} of {} turns (width {}, stride {}, {} tokens)",
            selected.len(),
            len,
            width,
            stride,
            total
        );

        selected
    }

    /// First user turn, else first error turn, else the cheapest turn
    fn representative(window: Range<usize>, signals: &[TurnSignals], counts: &[usize]) -> usize {
        window
            .clone()
            .find(|&i| signals[i].is_user)
            .or_else(|| window.clone().find(|&i| signals[i].has_error))
            .or_else(|| window.clone().min_by_key(|&i| counts[i]))
            .unwrap_or(window.start)
    }
}

#[async_trait]
impl Reducer for SlidingWindowReducer {
    fn kind(&self) -> StrategyKind {
        StrategyKind::SlidingWindow
    }

    async fn reduce(&self, input: ReductionInput<'_>) -> Result<Reduction> {
        let selected = self.select(&input);
        Ok(Reduction::from_indices(input.transcript, selected))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompressionConfig;
    use crate::context::models::Turn;
    use crate::context::strategies::test_support::{conversation, counter, is_chronological};

    fn reducer() -> SlidingWindowReducer {
        let config = CompressionConfig::default();
        SlidingWindowReducer::new(
            config.sliding_window.clone(),
            TurnClassifier::new(&config.error_keywords),
        )
    }

    fn assistant_run(n: usize) -> Vec<Turn> {
        (0..n).map(|i| Turn::assistant(format!("step {} ok", i))).collect()
    }

    #[test]
    fn test_boundaries_and_representatives() {
        // 10 assistant turns of 3 tokens: width 3, stride 1
        let transcript = assistant_run(10);
        let counts = vec![3; 10];
        let input = ReductionInput::new(&transcript, &counts, 20);

        let selected: Vec<usize> = reducer().select(&input).into_iter().collect();
        // must-keep cap is 6 tokens: first and last boundary turns
        // windows 7..10 -> 7, 6..9 -> 6, 5..8 -> 5, 4..7 -> 4, then 3..6 -> 3 would make 21
        assert_eq!(selected, vec![0, 4, 5, 6, 7, 9]);
    }

    #[test]
    fn test_prefers_user_then_error_turns() {
        let transcript = vec![
            Turn::assistant("plain one"),
            Turn::assistant("Error: disk full"),
            Turn::user("please retry"),
            Turn::assistant("plain two"),
        ];
        let counts = vec![2, 3, 2, 2];
        let reducer = reducer();
        let signals: Vec<TurnSignals> = transcript
            .iter()
            .map(|t| TurnSignals {
                is_user: reducer.classifier.is_user_authored(t),
                has_error: reducer.classifier.has_error_signal(t),
            })
            .collect();

        assert_eq!(SlidingWindowReducer::representative(0..4, &signals, &counts), 2);
        assert_eq!(SlidingWindowReducer::representative(0..2, &signals, &counts), 1);
        assert_eq!(SlidingWindowReducer::representative(3..4, &signals, &counts), 3);
    }

    #[test]
    fn test_must_keep_disabled() {
        let transcript = assistant_run(10);
        let counts = vec![3; 10];
        let mut input = ReductionInput::new(&transcript, &counts, 6);
        input.preserve_important = false;

        let selected: Vec<usize> = reducer().select(&input).into_iter().collect();
        assert_eq!(selected, vec![6, 7]);
    }

    #[tokio::test]
    async fn test_output_is_ordered_unique_and_within_budget() {
        let counter = counter();
        let transcript = conversation(40, 6);
        let counts = counter.count_each(&transcript).unwrap();
        let input = ReductionInput::new(&transcript, &counts, 120);

        let reduction = reducer().reduce(input).await.unwrap();
        let sources: Vec<usize> = reduction.selected.iter().filter_map(|s| s.source).collect();
        let unique: BTreeSet<usize> = sources.iter().copied().collect();
        assert_eq!(unique.len(), sources.len());

        let output = reduction.into_transcript();
        assert!(!output.is_empty());
        assert!(counter.count(&output).unwrap() <= 120);
        assert!(is_chronological(&output, &transcript));
    }
}
