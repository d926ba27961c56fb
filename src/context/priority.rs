//! Turn priority scoring
//!
//! Each term is independent and additive:
//! - recency: `(index / len) * recency`
//! - user-authored, error-signal, tool-activity bonuses
//! - boundary bonus for the first and last turn
//! - size adjustment: bonus for small turns, penalty for large ones
//!
//! Scores are only comparable within a single scoring call.

use super::classifier::TurnClassifier;
use super::models::{PriorityRecord, Turn};
use crate::config::ScoringWeights;

/// Scores turns from position, role, signals and size
#[derive(Debug, Clone)]
pub struct PriorityScorer {
    weights: ScoringWeights,
    classifier: TurnClassifier,
}

impl PriorityScorer {
    pub fn new(weights: ScoringWeights, classifier: TurnClassifier) -> Self {
        Self { weights, classifier }
    }

    /// Score every turn; `token_counts` must be parallel to `transcript`
    pub fn score<'a>(&self, transcript: &'a [Turn], token_counts: &[usize]) -> Vec<PriorityRecord<'a>> {
        let len = transcript.len();

        transcript
            .iter()
            .zip(token_counts)
            .enumerate()
            .map(|(index, (turn, &token_count))| {
                let is_tool_use = self.classifier.has_tool_activity(turn);
                let has_error = self.classifier.has_error_signal(turn);
                let score = self.score_turn(index, len, turn, token_count, is_tool_use, has_error);

                PriorityRecord {
                    index,
                    turn,
                    score,
                    token_count,
                    is_tool_use,
                    has_error,
                }
            })
            .collect()
    }

    fn score_turn(
        &self,
        index: usize,
        len: usize,
        turn: &Turn,
        token_count: usize,
        is_tool_use: bool,
        has_error: bool,
    ) -> f64 {
        let w = &self.weights;
        let mut score = (index as f64 / len as f64) * w.recency;

        if self.classifier.is_user_authored(turn) {
            score += w.user;
        }
        if has_error {
            score += w.error;
        }
        if is_tool_use {
            score += w.tool;
        }
        if index == 0 || index + 1 == len {
            score += w.boundary;
        }

        if token_count < w.small_threshold {
            score += w.small_bonus;
        } else if token_count > w.large_threshold {
            score -= w.large_penalty;
        }

        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompressionConfig;

    fn scorer() -> PriorityScorer {
        let config = CompressionConfig::default();
        PriorityScorer::new(
            config.priority.weights.clone(),
            TurnClassifier::new(&config.error_keywords),
        )
    }

    #[test]
    fn test_score_terms() {
        let transcript = vec![
            Turn::user("start"),
            Turn::assistant("working"),
            Turn::assistant("Error: build failed"),
            Turn::assistant("done"),
        ];
        let counts = vec![10, 10, 2000, 10];
        let records = scorer().score(&transcript, &counts);

        assert_eq!(records.len(), 4);
        // first turn: recency 0 + user 20 + boundary 15 + small 5
        assert_eq!(records[0].score, 40.0);
        // middle assistant: 7.5 + small 5
        assert_eq!(records[1].score, 12.5);
        // large error turn: 15 + error 25 - large 10
        assert_eq!(records[2].score, 30.0);
        assert!(records[2].has_error);
        // last turn: 22.5 + boundary 15 + small 5
        assert_eq!(records[3].score, 42.5);
    }

    #[test]
    fn test_mid_size_turn_has_no_size_adjustment() {
        let transcript = vec![Turn::assistant("a"), Turn::assistant("b"), Turn::assistant("c")];
        let records = scorer().score(&transcript, &[500, 500, 500]);
        assert_eq!(records[1].score, 10.0);
    }

    #[test]
    fn test_scoring_is_deterministic() {
        let transcript: Vec<Turn> = (0..10).map(|i| Turn::user(format!("turn {}", i))).collect();
        let counts = vec![3; 10];
        let s = scorer();
        let first: Vec<f64> = s.score(&transcript, &counts).iter().map(|r| r.score).collect();
        let second: Vec<f64> = s.score(&transcript, &counts).iter().map(|r| r.score).collect();
        assert_eq!(first, second);
    }
}
