//! Round synthesis
//!
//! Pure reducer from a joined set of critic verdicts to one composite
//! score and a deduplicated, per-unit issue grouping. No shared state, no
//! generator calls.

use crate::rubric::CriticRubric;
use crate::score::{Issue, IssueTarget, ReviewScore};
use scrib_pipeline::UnitId;
use std::collections::{BTreeMap, HashSet};

/// Reduced result of one scoring round
#[derive(Debug, Clone)]
pub struct Synthesis {
    /// Weighted-mean composite on the 0..=100 scale
    pub composite: f32,
    /// Issues grouped by unit, one entry per distinct unit
    pub by_unit: BTreeMap<UnitId, Vec<Issue>>,
    /// Issues addressing the draft as a whole
    pub global: Vec<Issue>,
}

/// Reduce critic verdicts to a composite and grouped issues
///
/// Weights come from the roster, matched by critic name; a verdict from
/// an unknown critic weighs 1.0. Issues with identical target and
/// description (case-insensitive) collapse to the first occurrence.
#[must_use]
pub fn synthesize(scores: &[ReviewScore], roster: &[CriticRubric]) -> Synthesis {
    let weight_of = |name: &str| -> f32 {
        roster
            .iter()
            .find(|r| r.name == name)
            .map_or(1.0, |r| r.weight)
    };

    let mut weighted_sum = 0.0f32;
    let mut total_weight = 0.0f32;
    for score in scores {
        let w = weight_of(&score.critic);
        weighted_sum += score.score as f32 * w;
        total_weight += w;
    }
    let composite = if total_weight > f32::EPSILON {
        weighted_sum / total_weight
    } else {
        0.0
    };

    let mut seen: HashSet<(IssueTarget, String)> = HashSet::new();
    let mut by_unit: BTreeMap<UnitId, Vec<Issue>> = BTreeMap::new();
    let mut global = Vec::new();

    for issue in scores.iter().flat_map(|s| s.issues.iter()) {
        let key = (issue.target, issue.description.to_lowercase());
        if !seen.insert(key) {
            continue;
        }
        match issue.target {
            IssueTarget::Unit(id) => by_unit.entry(id).or_default().push(issue.clone()),
            IssueTarget::Global => global.push(issue.clone()),
        }
    }

    tracing::debug!(
        composite,
        units = by_unit.len(),
        global = global.len(),
        "round synthesized"
    );

    Synthesis {
        composite,
        by_unit,
        global,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::score::IssueId;

    fn verdict(critic: &str, score: u32, issues: Vec<Issue>) -> ReviewScore {
        ReviewScore {
            critic: critic.to_string(),
            score,
            issues,
        }
    }

    fn issue(target: IssueTarget, description: &str) -> Issue {
        Issue {
            id: IssueId::new(),
            target,
            description: description.to_string(),
        }
    }

    #[test]
    fn equal_weights_give_plain_mean() {
        // Three critics at 70, 80, 90 average to 80
        let roster = vec![
            CriticRubric::new("a", ""),
            CriticRubric::new("b", ""),
            CriticRubric::new("c", ""),
        ];
        let scores = vec![
            verdict("a", 70, vec![]),
            verdict("b", 80, vec![]),
            verdict("c", 90, vec![]),
        ];

        let out = synthesize(&scores, &roster);
        assert!((out.composite - 80.0).abs() < f32::EPSILON);
    }

    #[test]
    fn weights_skew_the_composite() {
        let roster = vec![
            CriticRubric::new("heavy", "").with_weight(3.0),
            CriticRubric::new("light", ""),
        ];
        let scores = vec![verdict("heavy", 100, vec![]), verdict("light", 0, vec![])];

        let out = synthesize(&scores, &roster);
        assert!((out.composite - 75.0).abs() < f32::EPSILON);
    }

    #[test]
    fn duplicate_issues_collapse() {
        let unit = UnitId::new();
        let scores = vec![
            verdict("a", 50, vec![issue(IssueTarget::Unit(unit), "Weak opening")]),
            verdict("b", 60, vec![issue(IssueTarget::Unit(unit), "weak OPENING")]),
        ];

        let out = synthesize(&scores, &CriticRubric::default_roster());
        assert_eq!(out.by_unit[&unit].len(), 1);
    }

    #[test]
    fn issues_group_by_unit() {
        let (u1, u2) = (UnitId::new(), UnitId::new());
        let scores = vec![verdict(
            "a",
            50,
            vec![
                issue(IssueTarget::Unit(u1), "one"),
                issue(IssueTarget::Unit(u2), "two"),
                issue(IssueTarget::Global, "three"),
            ],
        )];

        let out = synthesize(&scores, &[]);
        assert_eq!(out.by_unit.len(), 2);
        assert_eq!(out.global.len(), 1);
    }

    #[test]
    fn empty_round_scores_zero() {
        let out = synthesize(&[], &[]);
        assert_eq!(out.composite, 0.0);
    }
}
