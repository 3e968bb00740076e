//! Bounded patches
//!
//! A patch rewrites exactly one unit. The loop builds at most one patch
//! per unit per round, so applying a round's patches can never race on
//! the same text.

use crate::error::ReviewError;
use crate::score::{Issue, IssueId};
use scrib_pipeline::{Draft, UnitId};
use serde::{Deserialize, Serialize};

/// Replacement text for one unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patch {
    /// Unit being rewritten
    pub target: UnitId,
    /// New unit text
    pub replacement: String,
    /// Issues the rewrite addresses
    pub issue_ids: Vec<IssueId>,
}

impl Patch {
    /// Create a patch addressing the given issues
    #[must_use]
    pub fn new(target: UnitId, replacement: String, issues: &[Issue]) -> Self {
        Self {
            target,
            replacement,
            issue_ids: issues.iter().map(|i| i.id).collect(),
        }
    }
}

/// Apply a round's patches to the draft
///
/// Each patch lands atomically on its own unit; units without a patch are
/// untouched.
///
/// # Errors
/// `ReviewError::Draft` when a patch addresses a unit the draft lost —
/// an invariant violation, since patches are built from the same draft.
pub fn apply_patches(draft: &mut Draft, patches: &[Patch]) -> Result<(), ReviewError> {
    for patch in patches {
        draft.apply_patch(patch.target, patch.replacement.clone())?;
        tracing::debug!(unit = %patch.target, issues = patch.issue_ids.len(), "patch applied");
    }
    Ok(())
}
