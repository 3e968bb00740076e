//! Pipeline error taxonomy

use crate::draft::{Draft, UnitId};
use scrib_capability::GenerationError;
use scrib_citation::AllocationError;
use thiserror::Error;

/// Template structural errors, caught before any generation happens
#[derive(Debug, Error)]
pub enum TemplateError {
    /// No sections at all
    #[error("template has no sections")]
    Empty,

    /// Dynamic descriptor without a fill pattern after it
    #[error("dynamic section '{id}' has no template section following it")]
    DanglingDynamic {
        /// Offending descriptor id
        id: String,
    },

    /// Pattern section without a dynamic descriptor before it
    #[error("template section '{id}' has no preceding dynamic section")]
    OrphanTemplate {
        /// Offending descriptor id
        id: String,
    },

    /// Embedding dimension differs from the theme embedding
    #[error("section '{id}' embedding has dimension {actual}, expected {expected}")]
    DimensionMismatch {
        /// Offending descriptor id
        id: String,
        /// Theme embedding dimension
        expected: usize,
        /// Section embedding dimension
        actual: usize,
    },
}

/// Draft mutation errors
#[derive(Debug, Error)]
pub enum DraftError {
    /// Patch addressed a unit the draft does not contain
    #[error("no unit with id {0}")]
    UnknownUnit(UnitId),
}

/// Orchestration failures
///
/// Variants that abort a run carry the partial draft so the caller can
/// persist whatever was produced before the failure.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Invalid template
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// Non-recoverable allocation failure
    #[error("citation allocation failed: {source}")]
    Allocation {
        /// Allocation error
        source: AllocationError,
        /// Units completed before the failure
        partial: Box<Draft>,
    },

    /// Generation backend unreachable; run aborted
    #[error("generation backend unreachable: {source}")]
    GenerationUnavailable {
        /// Backend error
        source: GenerationError,
        /// Units completed before the failure
        partial: Box<Draft>,
    },

    /// Run cancelled at a stage boundary
    #[error("run cancelled")]
    Cancelled {
        /// Units completed before cancellation
        partial: Box<Draft>,
    },
}
