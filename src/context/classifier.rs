//! Turn classification predicates

use super::models::{ContentBlock, Role, Turn, TurnContent};
use super::token_estimator::render_value;

/// Keyword heuristics over a single turn
#[derive(Debug, Clone)]
pub struct TurnClassifier {
    error_keywords: Vec<String>,
}

impl TurnClassifier {
    /// Keywords are matched case-insensitively as substrings
    pub fn new(error_keywords: &[String]) -> Self {
        Self {
            error_keywords: error_keywords
                .iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    pub fn is_user_authored(&self, turn: &Turn) -> bool {
        turn.role == Role::User
    }

    /// True if any text or structured payload contains an error keyword
    ///
    /// Benign text like "no errors found" matches too. Tool names are not
    /// searched.
    pub fn has_error_signal(&self, turn: &Turn) -> bool {
        let searchable = searchable_text(turn).to_lowercase();
        self.error_keywords.iter().any(|k| searchable.contains(k.as_str()))
    }

    pub fn has_tool_activity(&self, turn: &Turn) -> bool {
        turn.blocks().iter().any(|b| {
            matches!(
                b,
                ContentBlock::ToolUse { .. } | ContentBlock::ToolResult { .. }
            )
        })
    }
}

/// Turn text plus serialized tool inputs and results, without labels
fn searchable_text(turn: &Turn) -> String {
    match &turn.content {
        TurnContent::Text(text) => text.clone(),
        TurnContent::Blocks(blocks) => blocks
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.clone()),
                ContentBlock::ToolUse { input, .. } => Some(input.to_string()),
                ContentBlock::ToolResult { content, .. } => {
                    render_value(content).ok().map(|c| c.into_owned())
                }
                ContentBlock::Unknown => None,
            })
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

/// Flatten a turn into one string for summarization
pub fn render_turn(turn: &Turn) -> String {
    match &turn.content {
        TurnContent::Text(text) => text.clone(),
        TurnContent::Blocks(blocks) => blocks
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.clone()),
                ContentBlock::ToolUse { name, input, .. } => {
                    Some(format!("[tool_use {}] {}", name, input))
                }
                ContentBlock::ToolResult { content, .. } => render_value(content)
                    .ok()
                    .map(|c| format!("[tool_result] {}", c)),
                ContentBlock::Unknown => None,
            })
            .collect::<Vec<_>>()
            .join("\n"),
    }
}
