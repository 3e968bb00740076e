//! Review error taxonomy

use scrib_capability::GenerationError;
use scrib_pipeline::{Draft, DraftError};
use thiserror::Error;

/// Review loop failures
///
/// Aborting variants carry the best draft version seen so far, keeping
/// the anytime guarantee even on failure.
#[derive(Debug, Error)]
pub enum ReviewError {
    /// Generation backend unreachable mid-review
    #[error("generation backend unreachable: {source}")]
    GenerationUnavailable {
        /// Backend error
        source: GenerationError,
        /// Best draft seen before the failure
        best: Box<Draft>,
    },

    /// Review cancelled between rounds
    #[error("review cancelled")]
    Cancelled {
        /// Best draft seen before cancellation
        best: Box<Draft>,
    },

    /// Patch addressed a unit the draft does not contain
    #[error(transparent)]
    Draft(#[from] DraftError),

    /// Audit record could not be written
    #[error("audit persistence failed: {0}")]
    AuditIo(#[from] std::io::Error),

    /// Audit record could not be encoded
    #[error("audit encoding failed: {0}")]
    AuditEncode(#[from] serde_json::Error),
}
