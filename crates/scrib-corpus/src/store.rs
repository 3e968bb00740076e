//! Immutable excerpt store
//!
//! Built once from ingested records; validates ids and embedding
//! dimensions at build time so retrieval never has to.

use crate::error::CorpusError;
use crate::excerpt::{Excerpt, ExcerptId};
use std::collections::HashMap;
use std::sync::Arc;

/// Immutable collection of excerpts with a fixed embedding dimension
#[derive(Debug)]
pub struct ExcerptStore {
    excerpts: Vec<Arc<Excerpt>>,
    by_id: HashMap<ExcerptId, usize>,
    dimension: usize,
}

impl ExcerptStore {
    /// Build a store from ingested records
    ///
    /// The first record fixes the embedding dimension; every later record
    /// must match it.
    ///
    /// # Errors
    /// - `CorpusError::EmptyIndex` if `records` is empty
    /// - `CorpusError::DuplicateId` on id collisions
    /// - `CorpusError::DimensionMismatch` on ragged embeddings
    pub fn build(records: Vec<Excerpt>) -> Result<Self, CorpusError> {
        let Some(first) = records.first() else {
            return Err(CorpusError::EmptyIndex);
        };
        let dimension = first.embedding.len();

        let mut excerpts = Vec::with_capacity(records.len());
        let mut by_id = HashMap::with_capacity(records.len());

        for record in records {
            if record.embedding.len() != dimension {
                return Err(CorpusError::DimensionMismatch {
                    id: record.id.clone(),
                    expected: dimension,
                    actual: record.embedding.len(),
                });
            }
            if by_id.contains_key(&record.id) {
                return Err(CorpusError::DuplicateId(record.id));
            }
            by_id.insert(record.id.clone(), excerpts.len());
            excerpts.push(Arc::new(record));
        }

        tracing::info!(count = excerpts.len(), dimension, "excerpt store built");

        Ok(Self {
            excerpts,
            by_id,
            dimension,
        })
    }

    /// Create a store with zero excerpts and a declared dimension
    ///
    /// Retrieval against an empty store fails with
    /// `CorpusError::EmptyIndex`; this exists so callers can represent a
    /// not-yet-enlarged pool explicitly.
    #[inline]
    #[must_use]
    pub fn empty(dimension: usize) -> Self {
        Self {
            excerpts: Vec::new(),
            by_id: HashMap::new(),
            dimension,
        }
    }

    /// Number of excerpts
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.excerpts.len()
    }

    /// Whether the store is empty (a built store never is)
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.excerpts.is_empty()
    }

    /// Fixed embedding dimension
    #[inline]
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Look up an excerpt by id
    #[must_use]
    pub fn get(&self, id: &ExcerptId) -> Option<&Arc<Excerpt>> {
        self.by_id.get(id).map(|&idx| &self.excerpts[idx])
    }

    /// Iterate all excerpts in ingestion order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Excerpt>> {
        self.excerpts.iter()
    }
}
