//! Corpus errors

use crate::excerpt::ExcerptId;

/// Errors from store construction and retrieval
#[derive(Debug, Clone, thiserror::Error)]
pub enum CorpusError {
    /// Store has zero excerpts; fatal for the run, never retried
    #[error("excerpt store is empty")]
    EmptyIndex,

    /// Two ingested records carry the same id
    #[error("duplicate excerpt id: {0}")]
    DuplicateId(ExcerptId),

    /// Embedding dimension differs from the store's fixed dimension
    #[error("embedding dimension mismatch for {id}: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Offending excerpt
        id: ExcerptId,
        /// Store dimension
        expected: usize,
        /// Record dimension
        actual: usize,
    },

    /// Query vector dimension differs from the store's fixed dimension
    #[error("query dimension mismatch: expected {expected}, got {actual}")]
    QueryDimensionMismatch {
        /// Store dimension
        expected: usize,
        /// Query dimension
        actual: usize,
    },
}
