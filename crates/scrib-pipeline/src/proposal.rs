//! Structural proposal parsing
//!
//! During dynamic expansion the generator is asked to propose section
//! names in a line-oriented format:
//!
//! ```text
//! Section 1: Retrieval-Augmented Pipelines
//! Summary: Surveys retrieval conditioning for long-form generation.
//! Subsection 1: Dense Indexing
//! Subsection 2: Reranking
//! ```
//!
//! Parsing is lenient. Missing summaries become empty, subsections are
//! capped, and too few sections are padded with numbered fallbacks so the
//! run always gets exactly the count it asked for.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Subsections kept per proposed section
const MAX_SUBSECTIONS: usize = 3;

/// One proposed section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionPlan {
    /// Proposed title
    pub title: String,
    /// One-line summary, possibly empty
    pub summary: String,
    /// Proposed subsection titles, at most [`MAX_SUBSECTIONS`]
    pub subsections: Vec<String>,
}

fn section_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^\s*section\s+\d+\s*[:.]\s*(.+)$").unwrap())
}

fn summary_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^\s*summary\s*[:.]\s*(.+)$").unwrap())
}

fn subsection_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^\s*subsection\s+\d+\s*[:.]\s*(.+)$").unwrap())
}

/// Parse a structural proposal into exactly `expect` section plans
///
/// Extra sections are dropped, missing ones padded with "Part N" fallback
/// titles so downstream staging never sees a short plan.
#[must_use]
pub fn parse_structural_proposal(response: &str, expect: usize) -> Vec<SectionPlan> {
    let mut plans: Vec<SectionPlan> = Vec::new();

    for line in response.lines() {
        if let Some(caps) = section_re().captures(line) {
            plans.push(SectionPlan {
                title: caps[1].trim().to_string(),
                summary: String::new(),
                subsections: Vec::new(),
            });
        } else if let Some(caps) = summary_re().captures(line) {
            if let Some(plan) = plans.last_mut() {
                if plan.summary.is_empty() {
                    plan.summary = caps[1].trim().to_string();
                }
            }
        } else if let Some(caps) = subsection_re().captures(line) {
            if let Some(plan) = plans.last_mut() {
                if plan.subsections.len() < MAX_SUBSECTIONS {
                    plan.subsections.push(caps[1].trim().to_string());
                }
            }
        }
    }

    if plans.len() > expect {
        tracing::debug!(
            proposed = plans.len(),
            expect,
            "proposal over-delivered, truncating"
        );
        plans.truncate(expect);
    }
    while plans.len() < expect {
        let n = plans.len() + 1;
        tracing::warn!(n, "proposal under-delivered, padding with fallback section");
        plans.push(SectionPlan {
            title: format!("Part {n}"),
            summary: String::new(),
            subsections: Vec::new(),
        });
    }

    plans
}
