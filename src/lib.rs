//! Token-budgeted transcript compression for AI agents
//!
//! Given a transcript that may overflow a model's context window, produce a
//! smaller one that keeps what an agent needs to continue: recent turns,
//! user intent, error signals and tool activity.
//!
//! ```rust,ignore
//! use context_compressor::{
//!     CompressionConfig, CompressionOrchestrator, ConcatenationSummarizer, TiktokenEstimator,
//! };
//! use std::sync::Arc;
//!
//! let orchestrator = CompressionOrchestrator::new(
//!     CompressionConfig::default(),
//!     Arc::new(TiktokenEstimator::new()?),
//!     Arc::new(ConcatenationSummarizer),
//! )?;
//!
//! let result = orchestrator.adaptive_compress(&transcript, 128_000).await?;
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod metrics;
pub mod telemetry;

pub use crate::config::{CompressionConfig, PairingMode};
pub use crate::context::*;
pub use crate::error::{ContextError, Result};
pub use crate::metrics::CompressionMetrics;
