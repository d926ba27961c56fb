//! tool_use / tool_result pairing
//!
//! A result is linked to the turn holding the tool_use with the same id.
//! Results without an id link to the nearest preceding turn with any tool_use.

use super::models::{ContentBlock, Turn};
use std::collections::{BTreeSet, HashMap};
use tracing::warn;

/// (tool_use turn index, tool_result turn index) pairs, in transcript order
pub fn tool_pairs(transcript: &[Turn]) -> Vec<(usize, usize)> {
    let mut use_by_id: HashMap<&str, usize> = HashMap::new();
    let mut last_use: Option<usize> = None;
    let mut pairs = Vec::new();

    for (index, turn) in transcript.iter().enumerate() {
        for block in turn.blocks() {
            match block {
                ContentBlock::ToolResult { tool_use_id, .. } => {
                    let source = match tool_use_id {
                        Some(id) => use_by_id.get(id.as_str()).copied(),
                        None => last_use,
                    };
                    if let Some(source) = source {
                        if source != index && !pairs.contains(&(source, index)) {
                            pairs.push((source, index));
                        }
                    }
                }
                ContentBlock::ToolUse { id, .. } => {
                    use_by_id.insert(id.as_str(), index);
                    last_use = Some(index);
                }
                _ => {}
            }
        }
    }

    pairs
}

/// Drop kept turns whose pair partner was removed
///
/// Returns the number of turns dropped. Removing a turn can orphan another
/// pair, so this repeats until the kept set is stable.
pub fn enforce_strict_pairs(transcript: &[Turn], kept: &mut BTreeSet<usize>) -> usize {
    let pairs = tool_pairs(transcript);
    let mut dropped = 0;

    loop {
        let orphans: Vec<usize> = pairs
            .iter()
            .filter_map(|&(use_idx, result_idx)| {
                match (kept.contains(&use_idx), kept.contains(&result_idx)) {
                    (true, false) => Some(use_idx),
                    (false, true) => Some(result_idx),
                    _ => None,
                }
            })
            .collect();

        if orphans.is_empty() {
            break;
        }

        for index in orphans {
            if kept.remove(&index) {
                dropped += 1;
            }
        }
    }

    if dropped > 0 {
        warn!("Strict pairing dropped {} turns with a missing tool partner", dropped);
    }

    dropped
}
