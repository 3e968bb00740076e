//! Per-round audit trail
//!
//! Every round leaves a [`RoundAudit`] in the outcome. An [`AuditWriter`]
//! additionally persists each round as one JSON file, mirroring how runs
//! are inspected after the fact.

use crate::error::ReviewError;
use crate::patch::Patch;
use crate::score::ReviewScore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Record of one completed review round
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundAudit {
    /// Round number, 1-based
    pub round: u32,
    /// Every critic verdict from the round
    pub scores: Vec<ReviewScore>,
    /// Weighted composite
    pub composite: f32,
    /// Patches applied after the round, empty on the final round
    pub patches: Vec<Patch>,
    /// Completion time
    pub completed_at: DateTime<Utc>,
}

/// Writes one JSON file per round into a directory
#[derive(Debug, Clone)]
pub struct AuditWriter {
    dir: PathBuf,
}

impl AuditWriter {
    /// Create a writer targeting `dir`
    ///
    /// # Errors
    /// `ReviewError::AuditIo` when the directory cannot be created.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, ReviewError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Persist one round as `round-N.json`
    ///
    /// # Errors
    /// `ReviewError::AuditEncode` / `ReviewError::AuditIo` on failure.
    pub fn persist(&self, audit: &RoundAudit) -> Result<PathBuf, ReviewError> {
        let path = self.dir.join(format!("round-{}.json", audit.round));
        let json = serde_json::to_string_pretty(audit)?;
        std::fs::write(&path, json)?;
        tracing::debug!(path = %path.display(), "round audit persisted");
        Ok(path)
    }

    /// Target directory
    #[inline]
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}
