//! Critic roster

use serde::{Deserialize, Serialize};

/// One critic's scoring lens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriticRubric {
    /// Critic name, unique within a roster
    pub name: String,
    /// Weight in the composite (normalized by the reducer)
    pub weight: f32,
    /// Instruction prompt describing what this critic judges
    pub prompt: String,
}

impl CriticRubric {
    /// Create a rubric with weight 1.0
    #[must_use]
    pub fn new(name: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            weight: 1.0,
            prompt: prompt.into(),
        }
    }

    /// With composite weight
    #[inline]
    #[must_use]
    pub fn with_weight(mut self, weight: f32) -> Self {
        self.weight = weight.max(0.0);
        self
    }

    /// The default five-critic roster, equally weighted
    #[must_use]
    pub fn default_roster() -> Vec<CriticRubric> {
        vec![
            CriticRubric::new(
                "originality",
                "Judge how much the draft contributes beyond restating its sources: \
                 novel framing, synthesis across excerpts, non-obvious connections.",
            ),
            CriticRubric::new(
                "rigor",
                "Judge the argumentative structure: are claims supported, are \
                 limitations acknowledged, does each section follow from the last?",
            ),
            CriticRubric::new(
                "accuracy",
                "Judge whether statements attributed to cited sources match what \
                 those sources plausibly say, and flag unsupported generalizations.",
            ),
            CriticRubric::new(
                "clarity",
                "Judge readability: sentence economy, paragraph focus, terminology \
                 used consistently and defined on first use.",
            ),
            CriticRubric::new(
                "citations",
                "Judge citation discipline: every marker resolvable, density matching \
                 the claims made, no orphaned or bunched markers.",
            ),
        ]
    }
}
