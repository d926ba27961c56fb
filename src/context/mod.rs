//! Transcript compression under a token budget
//!
//! This module reduces an agent/user transcript to fit a model context
//! window while keeping user intent, error signals and recent turns.

pub mod classifier;
pub mod models;
pub mod orchestrator;
pub mod pairing;
pub mod priority;
pub mod selector;
pub mod strategies;
pub mod summarizer;
pub mod token_budget;
pub mod token_estimator;

pub use classifier::TurnClassifier;
pub use models::{
    CompressionResult, ContentBlock, PriorityRecord, ReductionStrategy, Role, StrategyKind, Turn,
    TurnContent,
};
pub use orchestrator::{detect_context_overflow, CompressionOrchestrator};
pub use priority::PriorityScorer;
pub use selector::{FixedSelector, SafetyFirstSelector, StrategySelector};
pub use strategies::{Reducer, Reduction, ReductionInput, SelectedTurn, StrategyTable};
pub use summarizer::{ConcatenationSummarizer, LLMSummarizer, Summarizer, SummarizerConfig, SummarizerError};
pub use token_budget::ContextBudget;
pub use token_estimator::{TiktokenEstimator, TokenEstimator, TranscriptCounter, WordBasedEstimator};
