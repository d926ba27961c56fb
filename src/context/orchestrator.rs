//! Compression orchestrator
//!
//! Public entry point of the engine:
//! - measures the transcript and skips work when it already fits
//! - dispatches to the requested strategy with the effective budget
//! - optionally drops broken tool pairs (strict pairing)
//! - reports before/after token accounting

use super::classifier::TurnClassifier;
use super::models::{CompressionResult, ReductionStrategy, StrategyKind, Turn};
use super::pairing::enforce_strict_pairs;
use super::priority::PriorityScorer;
use super::selector::{SafetyFirstSelector, StrategySelector};
use super::strategies::{
    PriorityBasedReducer, Reducer, Reduction, ReductionInput, SlidingWindowReducer, StrategyTable,
    SummarizeReducer, TruncateReducer,
};
use super::summarizer::Summarizer;
use super::token_budget::ContextBudget;
use super::token_estimator::{TokenEstimator, TranscriptCounter};
use crate::config::{CompressionConfig, PairingMode};
use crate::error::{ContextError, Result};
use crate::metrics::CompressionMetrics;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Compresses transcripts to fit a token budget
///
/// Holds configuration and collaborators only; every call works on its own
/// copies, so one orchestrator can serve concurrent calls.
pub struct CompressionOrchestrator {
    config: CompressionConfig,
    budget: ContextBudget,
    counter: TranscriptCounter,
    strategies: StrategyTable,
    selector: Arc<dyn StrategySelector>,
    metrics: Option<CompressionMetrics>,
}

impl CompressionOrchestrator {
    /// Create an orchestrator; fails if `config` does not validate
    pub fn new(
        config: CompressionConfig,
        estimator: Arc<dyn TokenEstimator>,
        summarizer: Arc<dyn Summarizer>,
    ) -> Result<Self> {
        config.validate()?;

        let counter = TranscriptCounter::new(estimator);
        let classifier = TurnClassifier::new(&config.error_keywords);
        let scorer = PriorityScorer::new(config.priority.weights.clone(), classifier.clone());

        let strategies = StrategyTable {
            truncate: TruncateReducer::new(),
            sliding_window: SlidingWindowReducer::new(config.sliding_window.clone(), classifier),
            priority_based: PriorityBasedReducer::new(
                scorer,
                counter.clone(),
                config.priority.partial_inclusion_threshold,
                config.truncation_marker.clone(),
                config.max_reduction_rounds,
            ),
            summarize: SummarizeReducer::new(
                summarizer,
                counter.clone(),
                config.summarize.clone(),
                config.summary_marker.clone(),
            ),
        };

        Ok(Self {
            budget: ContextBudget::from(&config),
            config,
            counter,
            strategies,
            selector: Arc::new(SafetyFirstSelector),
            metrics: None,
        })
    }

    /// Replace the selector used by [`adaptive_compress`](Self::adaptive_compress)
    pub fn with_selector(mut self, selector: Arc<dyn StrategySelector>) -> Self {
        self.selector = selector;
        self
    }

    pub fn with_metrics(mut self, metrics: CompressionMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn config(&self) -> &CompressionConfig {
        &self.config
    }

    pub fn budget(&self) -> &ContextBudget {
        &self.budget
    }

    /// Token count of a transcript
    pub fn count(&self, transcript: &[Turn]) -> Result<usize> {
        self.counter.count(transcript)
    }

    /// True once `current_tokens` reaches the overflow threshold of the window
    pub fn detect_context_overflow(&self, current_tokens: usize, model_context_window: usize) -> bool {
        self.budget.detect_overflow(current_tokens, model_context_window)
    }

    /// Compress `transcript` with an explicit strategy
    ///
    /// Returns the transcript unchanged with ratio 1 when it already fits
    /// `min(strategy.max_tokens, overflow threshold of the window)`.
    pub async fn compress(
        &self,
        transcript: &[Turn],
        strategy: &ReductionStrategy,
        model_context_window: usize,
    ) -> Result<CompressionResult> {
        let counts = self.counter.count_each(transcript)?;
        let original_token_count: usize = counts.iter().sum();
        let target = self
            .budget
            .effective_target(strategy.max_tokens, model_context_window);

        if original_token_count <= target {
            debug!(
                "Transcript fits ({} <= {} tokens), skipping compression",
                original_token_count, target
            );
            if let Some(metrics) = &self.metrics {
                metrics.record_skipped(strategy.kind);
            }
            return Ok(CompressionResult::unchanged(
                transcript.to_vec(),
                original_token_count,
                strategy.kind,
            ));
        }

        let input = ReductionInput {
            transcript,
            token_counts: &counts,
            max_tokens: target,
            preserve_recent: strategy
                .preserve_recent
                .unwrap_or(self.config.default_preserve_recent),
            preserve_important: strategy.preserve_important.unwrap_or(true),
        };

        let reduction = match self.strategies.get(strategy.kind).reduce(input).await {
            Ok(reduction) => reduction,
            Err(err) => {
                warn!("Compression with {} failed: {}", strategy.kind, err);
                if let Some(metrics) = &self.metrics {
                    let summarization = matches!(
                        err,
                        ContextError::Summarization(_) | ContextError::SummarizationTimeout { .. }
                    );
                    metrics.record_failure(strategy.kind, summarization);
                }
                return Err(err);
            }
        };

        let reduction = match self.config.pairing_mode {
            PairingMode::Lenient => reduction,
            PairingMode::Strict => Self::drop_broken_pairs(transcript, reduction),
        };

        let summary = reduction.summary.clone();
        let compressed = reduction.into_transcript();
        let compressed_token_count = self.counter.count(&compressed)?;
        let compression_ratio = compressed_token_count as f64 / original_token_count as f64;

        if compressed_token_count > target {
            warn!(
                "{} left {} tokens, over target of {}",
                strategy.kind, compressed_token_count, target
            );
        }

        info!(
            "Compressed {} turns to {} with {} ({} -> {} tokens, ratio {:.2})",
            transcript.len(),
            compressed.len(),
            strategy.kind,
            original_token_count,
            compressed_token_count,
            compression_ratio
        );

        let result = CompressionResult {
            transcript: compressed,
            summary,
            compression_ratio,
            original_token_count,
            compressed_token_count,
            strategy: strategy.kind,
        };

        if let Some(metrics) = &self.metrics {
            metrics.record_success(&result);
        }

        Ok(result)
    }

    /// Compress only if the transcript overflows the window, letting the selector pick
    ///
    /// Without overflow the selector is not consulted and the pass-through
    /// result reports [`StrategyKind::Truncate`].
    pub async fn adaptive_compress(
        &self,
        transcript: &[Turn],
        model_context_window: usize,
    ) -> Result<CompressionResult> {
        let current_tokens = self.counter.count(transcript)?;

        if !self.detect_context_overflow(current_tokens, model_context_window) {
            debug!(
                "No overflow ({} tokens, window {}), skipping compression",
                current_tokens, model_context_window
            );
            return Ok(CompressionResult::unchanged(
                transcript.to_vec(),
                current_tokens,
                StrategyKind::Truncate,
            ));
        }

        let severity = self
            .budget
            .overflow_severity(current_tokens, model_context_window);
        let kind = self.selector.select(transcript, severity);

        let strategy = ReductionStrategy {
            kind,
            max_tokens: self.budget.adaptive_target(model_context_window),
            preserve_recent: Some(self.config.default_preserve_recent),
            preserve_important: Some(true),
        };

        info!(
            "Context overflow ({} tokens, severity {:.2}), compressing with {}",
            current_tokens, severity, kind
        );

        self.compress(transcript, &strategy, model_context_window).await
    }

    fn drop_broken_pairs(transcript: &[Turn], reduction: Reduction) -> Reduction {
        let mut kept: BTreeSet<usize> = reduction
            .selected
            .iter()
            .filter_map(|s| s.source)
            .collect();

        if enforce_strict_pairs(transcript, &mut kept) == 0 {
            return reduction;
        }

        Reduction {
            selected: reduction
                .selected
                .into_iter()
                .filter(|s| s.source.map_or(true, |i| kept.contains(&i)))
                .collect(),
            summary: reduction.summary,
        }
    }
}

/// Whether a transcript needs compression against a model context window
pub fn detect_context_overflow(current_tokens: usize, model_context_window: usize) -> bool {
    ContextBudget::default().detect_overflow(current_tokens, model_context_window)
}
