//! Semantic retrieval
//!
//! Ranks store excerpts against a query embedding by cosine similarity.
//! Ranking is deterministic: descending similarity, ties broken by
//! ascending excerpt id.

use crate::error::CorpusError;
use crate::excerpt::{Excerpt, ExcerptId};
use crate::store::ExcerptStore;
use std::collections::HashSet;
use std::sync::Arc;

/// One ranked candidate
#[derive(Debug, Clone)]
pub struct RankedExcerpt {
    /// The excerpt, shared with the store
    pub excerpt: Arc<Excerpt>,
    /// Cosine similarity against the query
    pub similarity: f32,
}

/// Cosine-similarity retriever over an excerpt store
#[derive(Debug)]
pub struct SemanticRetriever {
    store: Arc<ExcerptStore>,
}

impl SemanticRetriever {
    /// Create retriever over a built store
    #[inline]
    #[must_use]
    pub fn new(store: Arc<ExcerptStore>) -> Self {
        Self { store }
    }

    /// The backing store
    #[inline]
    #[must_use]
    pub fn store(&self) -> &Arc<ExcerptStore> {
        &self.store
    }

    /// Rank the top `k` excerpts for a query embedding
    ///
    /// `exclude` suppresses ids already exhausted by quota. Exclusion is
    /// applied before truncation, so excluded ids never starve the
    /// candidate list.
    ///
    /// # Errors
    /// - `CorpusError::EmptyIndex` if the store has zero excerpts
    /// - `CorpusError::QueryDimensionMismatch` on a bad query vector
    pub fn rank(
        &self,
        query: &[f32],
        exclude: &HashSet<ExcerptId>,
        k: usize,
    ) -> Result<Vec<RankedExcerpt>, CorpusError> {
        if self.store.is_empty() {
            return Err(CorpusError::EmptyIndex);
        }
        if query.len() != self.store.dimension() {
            return Err(CorpusError::QueryDimensionMismatch {
                expected: self.store.dimension(),
                actual: query.len(),
            });
        }

        let mut ranked: Vec<RankedExcerpt> = self
            .store
            .iter()
            .filter(|e| !exclude.contains(&e.id))
            .map(|e| RankedExcerpt {
                excerpt: Arc::clone(e),
                similarity: cosine_similarity(query, &e.embedding),
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.excerpt.id.cmp(&b.excerpt.id))
        });
        ranked.truncate(k);

        tracing::debug!(
            candidates = ranked.len(),
            excluded = exclude.len(),
            k,
            "ranked excerpts for query"
        );

        Ok(ranked)
    }
}

/// Cosine similarity of two equal-length vectors
///
/// Zero-magnitude vectors score 0.0 rather than NaN.
#[must_use]
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        0.0
    } else {
        dot / denom
    }
}
