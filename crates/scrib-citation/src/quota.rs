//! Per-unit citation quota

use serde::{Deserialize, Serialize};

/// Citation quota for one generation unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationQuota {
    /// Fewer than this many citations is a shortfall
    pub min: usize,
    /// Greedy selection stops here when candidates allow
    pub target: usize,
    /// Hard upper bound per unit
    pub max: usize,
}

impl CitationQuota {
    /// Create quota; clamps so that `min <= target <= max`
    #[must_use]
    pub fn new(min: usize, target: usize, max: usize) -> Self {
        let max = max.max(min);
        let target = target.clamp(min, max);
        Self { min, target, max }
    }
}

impl Default for CitationQuota {
    fn default() -> Self {
        // Per-paragraph density defaults
        Self {
            min: 2,
            target: 3,
            max: 5,
        }
    }
}
