//! Critic response parsing
//!
//! Critics reply in free text; the loop asks them for a line-oriented
//! shape and parses it leniently:
//!
//! ```text
//! Score: 82
//! Issue[unit-01H...]: The second paragraph contradicts the first.
//! Issue[global]: No limitations are discussed anywhere.
//! ```
//!
//! A response with no recognizable score scores 0 with a logged warning;
//! the loop never stalls on a malformed critic.

use regex::Regex;
use scrib_pipeline::UnitId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;
use ulid::Ulid;

/// Identifier of one reported issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IssueId(Ulid);

impl IssueId {
    /// Generate a fresh id
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for IssueId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for IssueId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "issue-{}", self.0)
    }
}

/// What an issue points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IssueTarget {
    /// One generation unit
    Unit(UnitId),
    /// The draft as a whole
    Global,
}

/// One problem a critic reported
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    /// Issue id
    pub id: IssueId,
    /// What the issue points at
    pub target: IssueTarget,
    /// Critic's description
    pub description: String,
}

/// One critic's verdict on one draft version
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewScore {
    /// Critic name
    pub critic: String,
    /// Score on the 0..=100 scale
    pub score: u32,
    /// Issues reported alongside the score
    pub issues: Vec<Issue>,
}

fn score_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bscore\s*[:=]?\s*(\d{1,3})\b").unwrap())
}

fn issue_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^\s*issue\s*\[([^\]]+)\]\s*[:.]\s*(.+)$").unwrap())
}

/// Parse one critic response
///
/// `units` maps the unit labels the prompt showed (unit id display form)
/// back to ids. Issue lines with an unknown label fall back to
/// [`IssueTarget::Global`].
#[must_use]
pub fn parse_review(
    critic: &str,
    response: &str,
    units: &HashMap<String, UnitId>,
) -> ReviewScore {
    let score = match score_re().captures(response) {
        Some(caps) => caps[1].parse::<u32>().unwrap_or(0).min(100),
        None => {
            tracing::warn!(critic, "no score found in critic response, scoring 0");
            0
        }
    };

    let issues = response
        .lines()
        .filter_map(|line| issue_re().captures(line))
        .map(|caps| {
            let label = caps[1].trim();
            let target = units
                .get(label)
                .map_or(IssueTarget::Global, |id| IssueTarget::Unit(*id));
            Issue {
                id: IssueId::new(),
                target,
                description: caps[2].trim().to_string(),
            }
        })
        .collect();

    ReviewScore {
        critic: critic.to_string(),
        score,
        issues,
    }
}
