//! Data models for transcript compression

use serde::{Deserialize, Serialize};
use std::fmt;

/// Author of a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One fragment of a structured turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    ToolResult {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tool_use_id: Option<String>,
        content: serde_json::Value,
    },
    /// Block kinds this crate does not know about; counted as zero tokens
    #[serde(other)]
    Unknown,
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }

    pub fn tool_use(id: impl Into<String>, name: impl Into<String>, input: serde_json::Value) -> Self {
        ContentBlock::ToolUse {
            id: id.into(),
            name: name.into(),
            input,
        }
    }

    pub fn tool_result(tool_use_id: Option<String>, content: serde_json::Value) -> Self {
        ContentBlock::ToolResult {
            tool_use_id,
            content,
        }
    }
}

/// Turn content: raw text or an ordered list of blocks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TurnContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

/// One message of a transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: TurnContent,
}

impl Turn {
    pub fn new(role: Role, content: TurnContent) -> Self {
        Self { role, content }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, TurnContent::Text(text.into()))
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, TurnContent::Text(text.into()))
    }

    pub fn with_blocks(role: Role, blocks: Vec<ContentBlock>) -> Self {
        Self::new(role, TurnContent::Blocks(blocks))
    }

    /// Iterate over the content blocks (empty for plain text turns)
    pub fn blocks(&self) -> &[ContentBlock] {
        match &self.content {
            TurnContent::Text(_) => &[],
            TurnContent::Blocks(blocks) => blocks,
        }
    }

    /// Text of a plain turn or the first text block of a structured one
    pub fn primary_text(&self) -> Option<&str> {
        match &self.content {
            TurnContent::Text(text) => Some(text.as_str()),
            TurnContent::Blocks(blocks) => blocks.iter().find_map(|b| match b {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            }),
        }
    }
}

/// Reduction algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Truncate,
    SlidingWindow,
    PriorityBased,
    Summarize,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Truncate => "truncate",
            StrategyKind::SlidingWindow => "sliding_window",
            StrategyKind::PriorityBased => "priority_based",
            StrategyKind::Summarize => "summarize",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-call reduction request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReductionStrategy {
    pub kind: StrategyKind,
    pub max_tokens: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preserve_recent: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preserve_important: Option<bool>,
}

impl ReductionStrategy {
    pub fn new(kind: StrategyKind, max_tokens: usize) -> Self {
        Self {
            kind,
            max_tokens,
            preserve_recent: None,
            preserve_important: None,
        }
    }

    pub fn truncate(max_tokens: usize, preserve_recent: usize) -> Self {
        Self {
            preserve_recent: Some(preserve_recent),
            ..Self::new(StrategyKind::Truncate, max_tokens)
        }
    }
}

/// Scored view of one turn
#[derive(Debug, Clone)]
pub struct PriorityRecord<'a> {
    pub index: usize,
    pub turn: &'a Turn,
    pub score: f64,
    pub token_count: usize,
    pub is_tool_use: bool,
    pub has_error: bool,
}

/// Outcome of one compression call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressionResult {
    pub transcript: Vec<Turn>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub compression_ratio: f64,
    pub original_token_count: usize,
    pub compressed_token_count: usize,
    pub strategy: StrategyKind,
}

impl CompressionResult {
    /// Pass-through result for a transcript that already fits
    pub fn unchanged(transcript: Vec<Turn>, token_count: usize, strategy: StrategyKind) -> Self {
        Self {
            transcript,
            summary: None,
            compression_ratio: 1.0,
            original_token_count: token_count,
            compressed_token_count: token_count,
            strategy,
        }
    }

    pub fn tokens_saved(&self) -> usize {
        self.original_token_count
            .saturating_sub(self.compressed_token_count)
    }
}
