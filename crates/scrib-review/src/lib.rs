//! Convergence review loop
//!
//! Iteratively raises draft quality through scored critique:
//! - [`CriticRubric`] roster fanned out concurrently per round
//! - [`synthesize`] reduces critic scores to a weighted composite and
//!   deduplicated per-unit issue lists
//! - Bounded [`Patch`]es rewrite exactly one unit each
//! - [`ReviewLoop`] drives Score, Synthesize, Patch, Evaluate rounds until
//!   the composite reaches its target or the round bound is hit
//! - [`RoundAudit`] records every round; optional JSON persistence
//!
//! The loop is an anytime algorithm: every scored draft version is
//! snapshotted, so the best one survives later regressions.

pub mod audit;
pub mod convergence;
pub mod error;
pub mod patch;
pub mod rubric;
pub mod score;
pub mod synthesis;

pub use audit::{AuditWriter, RoundAudit};
pub use convergence::{ReviewConfig, ReviewLoop, ReviewOutcome};
pub use error::ReviewError;
pub use patch::Patch;
pub use rubric::CriticRubric;
pub use score::{parse_review, Issue, IssueId, IssueTarget, ReviewScore};
pub use synthesis::{synthesize, Synthesis};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
