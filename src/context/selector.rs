//! Strategy selection for adaptive compression

use super::models::{StrategyKind, Turn};

/// Picks a reduction strategy from transcript shape and overflow severity
pub trait StrategySelector: Send + Sync {
    /// `severity` is current tokens over the overflow threshold (1.0 = at threshold)
    fn select(&self, transcript: &[Turn], severity: f64) -> StrategyKind;
}

/// Always truncates
///
/// Summarization depends on an external model call that can be slow or fail,
/// so the default path never picks it. Callers that accept that risk pass
/// an explicit strategy or use [`FixedSelector`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SafetyFirstSelector;

impl StrategySelector for SafetyFirstSelector {
    fn select(&self, _transcript: &[Turn], _severity: f64) -> StrategyKind {
        StrategyKind::Truncate
    }
}

/// Always returns the strategy it was built with
#[derive(Debug, Clone, Copy)]
pub struct FixedSelector(pub StrategyKind);

impl StrategySelector for FixedSelector {
    fn select(&self, _transcript: &[Turn], _severity: f64) -> StrategyKind {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safety_first_always_truncates() {
        let transcript = vec![Turn::user("hi"); 100];
        for severity in [0.5, 1.0, 4.0, f64::INFINITY] {
            assert_eq!(
                SafetyFirstSelector.select(&transcript, severity),
                StrategyKind::Truncate
            );
        }
    }

    #[test]
    fn test_fixed_selector() {
        let selector = FixedSelector(StrategyKind::Summarize);
        assert_eq!(selector.select(&[], 2.0), StrategyKind::Summarize);
    }
}
