//! Allocation errors

use scrib_corpus::CorpusError;

/// Errors from citation allocation
#[derive(Debug, Clone, thiserror::Error)]
pub enum AllocationError {
    /// Fewer than `min` candidates above the similarity threshold
    ///
    /// Recoverable: the caller enlarges the excerpt store via the
    /// external-search collaborator and retries once.
    #[error("insufficient citations: short {shortfall} of minimum (available {available})")]
    InsufficientCitations {
        /// `min - available`
        shortfall: usize,
        /// Eligible candidates found
        available: usize,
    },

    /// Retrieval failed (empty index is fatal for the run)
    #[error("retrieval failed: {0}")]
    Corpus(#[from] CorpusError),

    /// A commit was validated against stale ledger state
    ///
    /// Indicates the single-writer discipline around allocate-and-commit
    /// was violated. Programming error, fatal, never expected.
    #[error("ledger conflict: {0}")]
    LedgerConflict(String),
}

impl AllocationError {
    /// Whether enlarging the excerpt pool and retrying can help
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::InsufficientCitations { .. })
    }
}
