//! Metrics collection for compression runs

use crate::context::models::{CompressionResult, StrategyKind};
use prometheus::{
    register_counter_vec_with_registry, register_counter_with_registry,
    register_histogram_with_registry, Counter, CounterVec, Histogram, Opts, Registry,
};

/// Prometheus metrics for the compression orchestrator
#[derive(Clone)]
pub struct CompressionMetrics {
    pub compressions: CounterVec,
    pub compression_ratio: Histogram,
    pub tokens_saved: Histogram,
    pub summarization_failures: Counter,
}

impl CompressionMetrics {
    /// Register all compression metrics with `registry`
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let compressions = register_counter_vec_with_registry!(
            Opts::new("context_compressions_total", "Total compression calls"),
            &["strategy", "outcome"],
            registry
        )?;

        let compression_ratio = register_histogram_with_registry!(
            "context_compression_ratio",
            "Compressed over original token count",
            vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 1.0],
            registry
        )?;

        let tokens_saved = register_histogram_with_registry!(
            "context_tokens_saved",
            "Tokens removed by a compression",
            prometheus::exponential_buckets(100.0, 2.0, 12)?,
            registry
        )?;

        let summarization_failures = register_counter_with_registry!(
            Opts::new(
                "context_summarization_failures_total",
                "Compressions that failed in the summarization collaborator"
            ),
            registry
        )?;

        Ok(Self {
            compressions,
            compression_ratio,
            tokens_saved,
            summarization_failures,
        })
    }

    pub fn record_skipped(&self, strategy: StrategyKind) {
        self.compressions
            .with_label_values(&[strategy.as_str(), "skipped"])
            .inc();
    }

    pub fn record_success(&self, result: &CompressionResult) {
        self.compressions
            .with_label_values(&[result.strategy.as_str(), "compressed"])
            .inc();
        self.compression_ratio.observe(result.compression_ratio);
        self.tokens_saved.observe(result.tokens_saved() as f64);
    }

    pub fn record_failure(&self, strategy: StrategyKind, summarization: bool) {
        self.compressions
            .with_label_values(&[strategy.as_str(), "failed"])
            .inc();
        if summarization {
            self.summarization_failures.inc();
        }
    }
}
