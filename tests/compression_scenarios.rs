//! End-to-end compression scenarios through the public orchestrator API

use async_trait::async_trait;
use context_compressor::{
    CompressionConfig, CompressionMetrics, CompressionOrchestrator, ConcatenationSummarizer,
    ContextError, FixedSelector, ReductionStrategy, Role, StrategyKind, Summarizer,
    SummarizerError, TokenEstimator, Turn, WordBasedEstimator,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const WINDOW: usize = 10_000;

struct CountingSummarizer {
    calls: AtomicUsize,
}

#[async_trait]
impl Summarizer for CountingSummarizer {
    async fn summarize(&self, texts: &[String], _max_tokens: usize) -> Result<String, SummarizerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("{} earlier turns about project setup", texts.len()))
    }
}

struct FailingSummarizer;

#[async_trait]
impl Summarizer for FailingSummarizer {
    async fn summarize(&self, _texts: &[String], _max_tokens: usize) -> Result<String, SummarizerError> {
        Err(SummarizerError::NetworkError("connection refused".to_string()))
    }
}

struct BrokenEstimator;

impl TokenEstimator for BrokenEstimator {
    fn estimate(&self, _text: &str) -> context_compressor::Result<usize> {
        Err(ContextError::Estimation("tokenizer unavailable".to_string()))
    }
}

fn orchestrator_with(summarizer: Arc<dyn Summarizer>) -> CompressionOrchestrator {
    CompressionOrchestrator::new(
        CompressionConfig::default(),
        Arc::new(WordBasedEstimator::default()),
        summarizer,
    )
    .unwrap()
}

fn orchestrator() -> CompressionOrchestrator {
    orchestrator_with(Arc::new(ConcatenationSummarizer))
}

fn conversation(n: usize, filler_words: usize) -> Vec<Turn> {
    (0..n)
        .map(|i| {
            let text = format!("Message {}{}", i, " filler".repeat(filler_words));
            if i % 2 == 0 {
                Turn::user(text)
            } else {
                Turn::assistant(text)
            }
        })
        .collect()
}

fn is_subsequence(output: &[Turn], input: &[Turn]) -> bool {
    let mut cursor = 0;
    output.iter().all(|turn| match input[cursor..].iter().position(|t| t == turn) {
        Some(offset) => {
            cursor += offset + 1;
            true
        }
        None => false,
    })
}

#[tokio::test]
async fn test_fitting_transcript_is_returned_unchanged() {
    let orchestrator = orchestrator_with(Arc::new(FailingSummarizer));
    let transcript = conversation(6, 2);
    let strategy = ReductionStrategy::new(StrategyKind::Summarize, 1_000);

    // a failing summarizer proves the strategy never ran
    let result = orchestrator.compress(&transcript, &strategy, WINDOW).await.unwrap();

    assert_eq!(result.transcript, transcript);
    assert_eq!(result.compression_ratio, 1.0);
    assert_eq!(result.original_token_count, result.compressed_token_count);
    assert!(result.summary.is_none());
}

#[tokio::test]
async fn test_window_threshold_caps_the_budget() {
    let orchestrator = orchestrator();
    let transcript = conversation(50, 0);
    // 150 tokens fits max_tokens, but not 75% of a 100-token window
    let strategy = ReductionStrategy::truncate(1_000, 5);

    let result = orchestrator.compress(&transcript, &strategy, 100).await.unwrap();
    assert!(result.compressed_token_count <= 75);
    assert!(result.compression_ratio < 1.0);
}

#[tokio::test]
async fn test_truncate_fifty_short_turns() {
    let orchestrator = orchestrator();
    let transcript = conversation(50, 0);
    let strategy = ReductionStrategy::truncate(100, 5);

    let result = orchestrator.compress(&transcript, &strategy, WINDOW).await.unwrap();

    assert!(result.transcript.len() <= 50);
    assert!(result.compressed_token_count <= 100);
    assert!(result.compression_ratio < 1.0);
    assert_eq!(result.strategy, StrategyKind::Truncate);
    assert_eq!(&result.transcript[result.transcript.len() - 5..], &transcript[45..]);
    assert!(is_subsequence(&result.transcript, &transcript));
}

#[tokio::test]
async fn test_priority_based_keeps_error_and_user_turns() {
    let orchestrator = orchestrator();
    let transcript = vec![
        Turn::user(format!("Set up the service{}", " please".repeat(15))),
        Turn::assistant(format!("Writing configuration{}", " step".repeat(15))),
        Turn::assistant("Error: Something failed"),
        Turn::assistant(format!("Trying again{}", " step".repeat(15))),
        Turn::user("What went wrong?"),
    ];
    let strategy = ReductionStrategy::new(StrategyKind::PriorityBased, 50);

    let result = orchestrator.compress(&transcript, &strategy, WINDOW).await.unwrap();

    assert!(result.compression_ratio < 1.0);
    assert!(result.compressed_token_count <= 50);
    assert!(result.transcript.iter().any(|t| t
        .primary_text()
        .map_or(false, |text| text.to_lowercase().contains("error"))));
    assert!(result.transcript.iter().any(|t| t.role == Role::User));
    assert!(is_subsequence(&result.transcript, &transcript));
}

#[tokio::test]
async fn test_summarize_twenty_turns() {
    let summarizer = Arc::new(CountingSummarizer {
        calls: AtomicUsize::new(0),
    });
    let orchestrator = orchestrator_with(summarizer.clone());
    let transcript = conversation(20, 8);
    let strategy = ReductionStrategy::new(StrategyKind::Summarize, 100);

    let result = orchestrator.compress(&transcript, &strategy, WINDOW).await.unwrap();

    assert_eq!(summarizer.calls.load(Ordering::SeqCst), 1);
    assert_eq!(result.summary.as_deref(), Some("16 earlier turns about project setup"));
    let first = result.transcript[0].primary_text().unwrap();
    assert!(first.starts_with(&orchestrator.config().summary_marker));
    assert!(result.compressed_token_count <= 100);
    assert!(result.compression_ratio < 1.0);
}

#[tokio::test]
async fn test_summarization_failure_fails_compression() {
    let orchestrator = orchestrator_with(Arc::new(FailingSummarizer));
    let transcript = conversation(20, 8);
    let strategy = ReductionStrategy::new(StrategyKind::Summarize, 100);

    let err = orchestrator.compress(&transcript, &strategy, WINDOW).await.unwrap_err();
    assert!(matches!(err, ContextError::Summarization(SummarizerError::NetworkError(_))));
}

#[tokio::test]
async fn test_estimation_failure_surfaces() {
    let orchestrator = CompressionOrchestrator::new(
        CompressionConfig::default(),
        Arc::new(BrokenEstimator),
        Arc::new(ConcatenationSummarizer),
    )
    .unwrap();
    let strategy = ReductionStrategy::truncate(100, 5);

    let err = orchestrator
        .compress(&conversation(3, 0), &strategy, WINDOW)
        .await
        .unwrap_err();
    assert!(matches!(err, ContextError::Estimation(_)));
}

#[test]
fn test_overflow_detection_threshold() {
    let orchestrator = orchestrator();
    assert!(orchestrator.detect_context_overflow(750, 1000));
    assert!(!orchestrator.detect_context_overflow(500, 1000));
    assert!(context_compressor::detect_context_overflow(750, 1000));
}

#[tokio::test]
async fn test_every_local_strategy_preserves_order_without_duplicates() {
    let orchestrator = orchestrator();
    let transcript = conversation(60, 5);

    for kind in [
        StrategyKind::Truncate,
        StrategyKind::SlidingWindow,
        StrategyKind::PriorityBased,
    ] {
        let strategy = ReductionStrategy::new(kind, 120);
        let result = orchestrator.compress(&transcript, &strategy, WINDOW).await.unwrap();

        assert!(!result.transcript.is_empty(), "{} kept nothing", kind);
        assert!(result.compressed_token_count <= 120, "{} over budget", kind);
        // every kept turn is distinct, so a strict subsequence match also rules out duplicates
        assert!(is_subsequence(&result.transcript, &transcript), "{} reordered", kind);
    }
}

#[tokio::test]
async fn test_budget_monotonicity_for_every_strategy() {
    let orchestrator = orchestrator();
    let transcript = conversation(40, 3);

    for kind in [
        StrategyKind::Truncate,
        StrategyKind::SlidingWindow,
        StrategyKind::PriorityBased,
        StrategyKind::Summarize,
    ] {
        let mut previous = usize::MAX;
        for max_tokens in (20..=200).rev().step_by(15) {
            let strategy = ReductionStrategy::new(kind, max_tokens);
            let result = orchestrator.compress(&transcript, &strategy, WINDOW).await.unwrap();
            assert!(
                result.compressed_token_count <= previous,
                "{} grew from {} to {} tokens at budget {}",
                kind,
                previous,
                result.compressed_token_count,
                max_tokens
            );
            previous = result.compressed_token_count;
        }
    }
}

#[tokio::test]
async fn test_adaptive_compress_skips_without_overflow() {
    let orchestrator = orchestrator();
    let transcript = conversation(10, 0); // 30 tokens

    let result = orchestrator.adaptive_compress(&transcript, 100).await.unwrap();
    assert_eq!(result.transcript, transcript);
    assert_eq!(result.compression_ratio, 1.0);
    assert_eq!(result.strategy, StrategyKind::Truncate);
}

#[tokio::test]
async fn test_adaptive_compress_truncates_to_sixty_percent() {
    let orchestrator = orchestrator();
    let transcript = conversation(40, 0); // 120 tokens

    let result = orchestrator.adaptive_compress(&transcript, 100).await.unwrap();
    assert_eq!(result.strategy, StrategyKind::Truncate);
    assert!(result.compressed_token_count <= 60);
    assert_eq!(result.transcript.last(), transcript.last());
}

#[tokio::test]
async fn test_adaptive_compress_with_pinned_selector() {
    let orchestrator = orchestrator().with_selector(Arc::new(FixedSelector(StrategyKind::SlidingWindow)));
    let transcript = conversation(40, 0);

    let result = orchestrator.adaptive_compress(&transcript, 100).await.unwrap();
    assert_eq!(result.strategy, StrategyKind::SlidingWindow);
    assert!(result.compressed_token_count <= 60);
}

#[tokio::test]
async fn test_metrics_are_recorded() {
    let registry = prometheus::Registry::new();
    let metrics = CompressionMetrics::new(&registry).unwrap();
    let orchestrator = orchestrator().with_metrics(metrics.clone());
    let transcript = conversation(50, 0);

    orchestrator
        .compress(&transcript, &ReductionStrategy::truncate(100, 5), WINDOW)
        .await
        .unwrap();
    orchestrator
        .compress(&transcript, &ReductionStrategy::truncate(1_000, 5), WINDOW)
        .await
        .unwrap();

    let compressed = metrics
        .compressions
        .with_label_values(&["truncate", "compressed"])
        .get();
    let skipped = metrics
        .compressions
        .with_label_values(&["truncate", "skipped"])
        .get();
    assert_eq!(compressed, 1.0);
    assert_eq!(skipped, 1.0);
}
