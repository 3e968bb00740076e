//! Draft arena
//!
//! A [`Draft`] is the mutable artifact a run builds up: an ordered list of
//! [`GenerationUnit`]s plus a stage history. Review patches replace unit
//! text through [`Draft::apply_patch`], which refuses to touch anything
//! outside the addressed unit. [`VersionHistory`] keeps immutable
//! snapshots so the best-scoring version of a run is never lost.

use chrono::{DateTime, Utc};
use scrib_citation::CitationQuota;
use scrib_corpus::ExcerptId;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::error::DraftError;

/// Identifier of one generation unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(Ulid);

impl UnitId {
    /// Generate a fresh id
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for UnitId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UnitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unit-{}", self.0)
    }
}

/// One generated passage with its citation backing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationUnit {
    /// Unit id
    pub id: UnitId,
    /// Id of the section descriptor that produced this unit
    pub section_id: String,
    /// Section title at generation time
    pub title: String,
    /// Quota the unit was generated under
    pub quota: CitationQuota,
    /// Generated text
    pub text: String,
    /// Excerpts cited by this unit, in selection order
    pub cited: Vec<ExcerptId>,
    /// Generation failed after retries; text is a placeholder
    pub degraded: bool,
    /// Allocation fell short of the quota minimum
    pub below_quota: bool,
}

impl GenerationUnit {
    /// Create a unit for a section
    #[must_use]
    pub fn new(section_id: impl Into<String>, title: impl Into<String>, quota: CitationQuota) -> Self {
        Self {
            id: UnitId::new(),
            section_id: section_id.into(),
            title: title.into(),
            quota,
            text: String::new(),
            cited: Vec::new(),
            degraded: false,
            below_quota: false,
        }
    }
}

/// One completed orchestration stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageRecord {
    /// Stage label
    pub stage: String,
    /// Units produced by the stage
    pub units: Vec<UnitId>,
    /// Completion time
    pub completed_at: DateTime<Utc>,
}

/// Mutable draft under construction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Draft {
    /// Document title
    pub title: String,
    /// Version counter, bumped by [`VersionHistory::record`]
    pub version: u32,
    units: Vec<GenerationUnit>,
    stage_history: Vec<StageRecord>,
}

impl Draft {
    /// Create an empty draft
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            version: 0,
            units: Vec::new(),
            stage_history: Vec::new(),
        }
    }

    /// Units in document order
    #[inline]
    #[must_use]
    pub fn units(&self) -> &[GenerationUnit] {
        &self.units
    }

    /// Look up a unit
    #[must_use]
    pub fn unit(&self, id: UnitId) -> Option<&GenerationUnit> {
        self.units.iter().find(|u| u.id == id)
    }

    /// Append a finished unit
    pub fn push_unit(&mut self, unit: GenerationUnit) {
        self.units.push(unit);
    }

    /// Record a completed stage
    pub fn record_stage(&mut self, stage: impl Into<String>, units: Vec<UnitId>) {
        self.stage_history.push(StageRecord {
            stage: stage.into(),
            units,
            completed_at: Utc::now(),
        });
    }

    /// Completed stages in order
    #[inline]
    #[must_use]
    pub fn stage_history(&self) -> &[StageRecord] {
        &self.stage_history
    }

    /// Replace one unit's text, leaving every other unit untouched
    ///
    /// # Errors
    /// `DraftError::UnknownUnit` when the id addresses no unit.
    pub fn apply_patch(&mut self, id: UnitId, text: String) -> Result<(), DraftError> {
        let unit = self
            .units
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(DraftError::UnknownUnit(id))?;
        unit.text = text;
        Ok(())
    }

    /// Concatenated unit text, section titles as headings
    #[must_use]
    pub fn full_text(&self) -> String {
        let mut out = String::new();
        for unit in &self.units {
            out.push_str("## ");
            out.push_str(&unit.title);
            out.push_str("\n\n");
            out.push_str(&unit.text);
            out.push_str("\n\n");
        }
        out
    }

    /// Immutable copy for the version history
    #[must_use]
    pub fn snapshot(&self) -> Draft {
        self.clone()
    }
}

/// One retained draft version
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftVersion {
    /// Version number at snapshot time
    pub version: u32,
    /// Composite review score, if this version was scored
    pub score: Option<f32>,
    /// Snapshot
    pub draft: Draft,
    /// Snapshot time
    pub recorded_at: DateTime<Utc>,
}

/// Append-only history of draft snapshots
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VersionHistory {
    versions: Vec<DraftVersion>,
}

impl VersionHistory {
    /// Create an empty history
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the draft, bump its version counter, return the new version
    pub fn record(&mut self, draft: &mut Draft, score: Option<f32>) -> u32 {
        draft.version += 1;
        self.versions.push(DraftVersion {
            version: draft.version,
            score,
            draft: draft.snapshot(),
            recorded_at: Utc::now(),
        });
        draft.version
    }

    /// All versions, oldest first
    #[inline]
    #[must_use]
    pub fn versions(&self) -> &[DraftVersion] {
        &self.versions
    }

    /// Highest-scoring version seen so far
    ///
    /// Ties go to the later version. Unscored versions never win.
    #[must_use]
    pub fn best(&self) -> Option<&DraftVersion> {
        self.versions
            .iter()
            .filter(|v| v.score.is_some())
            .max_by(|a, b| {
                a.score
                    .partial_cmp(&b.score)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(a.version.cmp(&b.version))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn unit(section: &str, text: &str) -> GenerationUnit {
        let mut u = GenerationUnit::new(section, format!("Title {section}"), CitationQuota::default());
        u.text = text.to_string();
        u
    }

    #[test]
    fn patch_is_scoped_to_one_unit() {
        let mut draft = Draft::new("D");
        let a = unit("s1", "alpha");
        let b = unit("s2", "beta");
        let (a_id, b_id) = (a.id, b.id);
        draft.push_unit(a);
        draft.push_unit(b);

        draft.apply_patch(a_id, "alpha prime".to_string()).unwrap();

        assert_eq!(draft.unit(a_id).unwrap().text, "alpha prime");
        // Untouched unit byte-identical
        assert_eq!(draft.unit(b_id).unwrap().text, "beta");
    }

    #[test]
    fn patch_unknown_unit_rejected() {
        let mut draft = Draft::new("D");
        let err = draft.apply_patch(UnitId::new(), "x".to_string()).unwrap_err();
        assert!(matches!(err, DraftError::UnknownUnit(_)));
    }

    #[test]
    fn best_version_retained_across_regression() {
        let mut draft = Draft::new("D");
        let mut history = VersionHistory::new();

        history.record(&mut draft, Some(85.0));
        history.record(&mut draft, Some(70.0));

        let best = history.best().unwrap();
        assert_eq!(best.version, 1);
        assert_eq!(best.score, Some(85.0));
    }

    #[test]
    fn best_prefers_later_version_on_tie() {
        let mut draft = Draft::new("D");
        let mut history = VersionHistory::new();

        history.record(&mut draft, Some(80.0));
        history.record(&mut draft, Some(80.0));

        assert_eq!(history.best().unwrap().version, 2);
    }

    #[test]
    fn record_snapshots_current_state() {
        let mut draft = Draft::new("D");
        let u = unit("s1", "original");
        let id = u.id;
        draft.push_unit(u);
        let mut history = VersionHistory::new();

        history.record(&mut draft, Some(90.0));
        draft.apply_patch(id, "mutated".to_string()).unwrap();

        let snap = &history.versions()[0].draft;
        assert_eq!(snap.unit(id).unwrap().text, "original");
    }
}
