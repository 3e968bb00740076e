//! Citation allocation
//!
//! Retrieval gives similarity; the ledger gives history. The allocator
//! combines both into a composite score and greedily fills the unit's
//! quota, committing the result transactionally.

use crate::error::AllocationError;
use crate::ledger::UsageLedger;
use crate::quota::CitationQuota;
use scrib_corpus::{ExcerptId, RankedExcerpt, SemanticRetriever, Signature};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// Allocator tuning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AllocatorConfig {
    /// Candidates fetched from the retriever per allocation
    pub top_m: usize,
    /// Candidates below this similarity never count toward the quota
    pub similarity_threshold: f32,
    /// Weight of the diversity bonus in the composite score (0..=1)
    pub diversity_weight: f32,
}

impl AllocatorConfig {
    /// Create config with the default density tuning
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With candidate fetch size
    #[inline]
    #[must_use]
    pub fn with_top_m(mut self, top_m: usize) -> Self {
        self.top_m = top_m;
        self
    }

    /// With similarity threshold
    #[inline]
    #[must_use]
    pub fn with_similarity_threshold(mut self, threshold: f32) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    /// With diversity weight
    #[inline]
    #[must_use]
    pub fn with_diversity_weight(mut self, weight: f32) -> Self {
        self.diversity_weight = weight.clamp(0.0, 1.0);
        self
    }
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            top_m: 10,
            similarity_threshold: 0.2,
            diversity_weight: 0.3,
        }
    }
}

/// Result of one allocation call
#[derive(Debug, Clone)]
pub struct Allocation {
    /// Chosen excerpt ids, in selection order
    pub selected: Vec<ExcerptId>,
    /// Paragraph position the ledger assigned
    pub position: u32,
    /// Whether the adjacent-reuse rule had to be relaxed
    pub relaxed_reuse: bool,
}

/// Chooses excerpts to back one generation unit
#[derive(Debug)]
pub struct CitationAllocator {
    retriever: Arc<SemanticRetriever>,
    config: AllocatorConfig,
}

struct ScoredCandidate {
    candidate: RankedExcerpt,
    signature: Signature,
    composite: f32,
    last_used: Option<u32>,
}

impl CitationAllocator {
    /// Create allocator over a retriever
    #[inline]
    #[must_use]
    pub fn new(retriever: Arc<SemanticRetriever>, config: AllocatorConfig) -> Self {
        Self { retriever, config }
    }

    /// Tuning in effect
    #[inline]
    #[must_use]
    pub fn config(&self) -> &AllocatorConfig {
        &self.config
    }

    /// Allocate citations for one unit and commit them to the ledger
    ///
    /// The caller holds the single-writer boundary around this whole call:
    /// candidate scoring reads the ledger and the commit mutates it.
    ///
    /// # Errors
    /// - `AllocationError::InsufficientCitations` when fewer than
    ///   `quota.min` eligible candidates exist (shortfall carried for the
    ///   external-search collaborator)
    /// - `AllocationError::Corpus` on retrieval failure
    /// - `AllocationError::LedgerConflict` only on serialization bugs
    pub fn allocate(
        &self,
        quota: CitationQuota,
        context_embedding: &[f32],
        ledger: &mut UsageLedger,
    ) -> Result<Allocation, AllocationError> {
        // Run-wide budget bounds how many we may take this call
        let effective_max = quota.max.min(ledger.remaining_budget());
        if effective_max < quota.min {
            return Err(AllocationError::InsufficientCitations {
                shortfall: quota.min - effective_max,
                available: effective_max,
            });
        }

        let candidates =
            self.retriever
                .rank(context_embedding, &ledger.exhausted_ids(), self.config.top_m)?;

        let eligible: Vec<&RankedExcerpt> = candidates
            .iter()
            .filter(|c| c.similarity >= self.config.similarity_threshold)
            .collect();

        // Adjacent-reuse suppression: ids from the immediately preceding
        // allocation are held back unless that starves the minimum.
        let previous: HashSet<&ExcerptId> = ledger.previous_selection().iter().collect();
        let non_adjacent: Vec<&RankedExcerpt> = eligible
            .iter()
            .copied()
            .filter(|c| !previous.contains(&c.excerpt.id))
            .collect();

        let (pool, relaxed_reuse) = if non_adjacent.len() >= quota.min {
            (non_adjacent, false)
        } else if eligible.len() > non_adjacent.len() {
            tracing::warn!(
                eligible = eligible.len(),
                non_adjacent = non_adjacent.len(),
                "candidate pool exhausted, relaxing adjacent-reuse rule"
            );
            (eligible, true)
        } else {
            (non_adjacent, false)
        };

        if pool.len() < quota.min {
            tracing::warn!(
                available = pool.len(),
                min = quota.min,
                "insufficient citation candidates above threshold"
            );
            return Err(AllocationError::InsufficientCitations {
                shortfall: quota.min - pool.len(),
                available: pool.len(),
            });
        }

        let mut scored: Vec<ScoredCandidate> = pool
            .into_iter()
            .map(|c| {
                let signature = c.excerpt.signature();
                let composite = self.composite_score(c.similarity, &signature, ledger);
                ScoredCandidate {
                    last_used: ledger.last_used_position(&c.excerpt.id),
                    candidate: c.clone(),
                    signature,
                    composite,
                }
            })
            .collect();

        // Composite descending; equal scores fall back to least recently
        // used, then lowest id.
        scored.sort_by(|a, b| {
            b.composite
                .partial_cmp(&a.composite)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| match (a.last_used, b.last_used) {
                    (None, None) => std::cmp::Ordering::Equal,
                    (None, Some(_)) => std::cmp::Ordering::Less,
                    (Some(_), None) => std::cmp::Ordering::Greater,
                    (Some(x), Some(y)) => x.cmp(&y),
                })
                .then_with(|| a.candidate.excerpt.id.cmp(&b.candidate.excerpt.id))
        });

        let take = quota.target.min(scored.len()).min(effective_max);
        let selections: Vec<(ExcerptId, Signature)> = scored
            .into_iter()
            .take(take)
            .map(|s| (s.candidate.excerpt.id.clone(), s.signature))
            .collect();

        let position = ledger.commit(&selections)?;

        tracing::debug!(
            position,
            selected = selections.len(),
            relaxed_reuse,
            "allocation committed"
        );

        Ok(Allocation {
            selected: selections.into_iter().map(|(id, _)| id).collect(),
            position,
            relaxed_reuse,
        })
    }

    /// `similarity * (1 - w) + diversity_bonus * w`
    ///
    /// The bonus is the inverse frequency of the author/year signature in
    /// the ledger, so under-cited clusters rank up.
    fn composite_score(
        &self,
        similarity: f32,
        signature: &Signature,
        ledger: &UsageLedger,
    ) -> f32 {
        let w = self.config.diversity_weight;
        let bonus = 1.0 / (1.0 + ledger.signature_count(signature) as f32);
        similarity * (1.0 - w) + bonus * w
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::LedgerConfig;
    use scrib_corpus::{Excerpt, ExcerptStore};

    fn record(id: &str, author: &str, year: u16, embedding: Vec<f32>) -> Excerpt {
        Excerpt::new(
            id,
            vec![author.to_string()],
            year,
            format!("title {id}"),
            "venue",
            "summary",
            embedding,
        )
    }

    fn allocator(records: Vec<Excerpt>) -> CitationAllocator {
        let store = Arc::new(ExcerptStore::build(records).unwrap());
        CitationAllocator::new(
            Arc::new(SemanticRetriever::new(store)),
            AllocatorConfig::new(),
        )
    }

    #[test]
    fn respects_quota_bounds() {
        let alloc = allocator(vec![
            record("a", "X", 2019, vec![1.0, 0.0]),
            record("b", "Y", 2020, vec![0.9, 0.1]),
            record("c", "Z", 2021, vec![0.8, 0.2]),
        ]);
        let mut ledger = UsageLedger::default();

        let out = alloc
            .allocate(CitationQuota::new(2, 3, 3), &[1.0, 0.0], &mut ledger)
            .unwrap();

        assert!(out.selected.len() >= 2 && out.selected.len() <= 3);
        assert_eq!(ledger.total_uses(), out.selected.len());
    }

    #[test]
    fn shortfall_reported_with_count() {
        let alloc = allocator(vec![record("a", "X", 2019, vec![1.0, 0.0])]);
        let mut ledger = UsageLedger::default();

        let err = alloc
            .allocate(CitationQuota::new(3, 3, 4), &[1.0, 0.0], &mut ledger)
            .unwrap_err();

        match err {
            AllocationError::InsufficientCitations {
                shortfall,
                available,
            } => {
                assert_eq!(shortfall, 2);
                assert_eq!(available, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
        // Failed allocation must not touch the ledger
        assert_eq!(ledger.total_uses(), 0);
    }

    #[test]
    fn below_threshold_candidates_do_not_count() {
        // "far" is orthogonal to the query: similarity 0 < threshold
        let alloc = allocator(vec![
            record("near", "X", 2019, vec![1.0, 0.0]),
            record("far", "Y", 2020, vec![0.0, 1.0]),
        ]);
        let mut ledger = UsageLedger::default();

        let err = alloc
            .allocate(CitationQuota::new(2, 2, 3), &[1.0, 0.0], &mut ledger)
            .unwrap_err();
        assert!(matches!(
            err,
            AllocationError::InsufficientCitations { shortfall: 1, .. }
        ));
    }

    #[test]
    fn diversity_rotates_successive_allocations() {
        // Three excerpts near the same query; a second allocation with the
        // same context must not repeat the first selection while unused
        // excerpts remain.
        let alloc = allocator(vec![
            record("a", "X", 2019, vec![1.0, 0.0]),
            record("b", "Y", 2020, vec![0.97, 0.05]),
            record("c", "Z", 2021, vec![0.95, 0.1]),
        ]);
        let mut ledger = UsageLedger::new(
            LedgerConfig::new().with_max_uses_per_excerpt(2),
        );

        let first = alloc
            .allocate(CitationQuota::new(2, 2, 3), &[1.0, 0.0], &mut ledger)
            .unwrap();
        let second = alloc
            .allocate(CitationQuota::new(2, 2, 3), &[1.0, 0.0], &mut ledger)
            .unwrap();

        assert_ne!(first.selected, second.selected);
    }

    #[test]
    fn adjacent_reuse_relaxed_when_pool_exhausted() {
        let alloc = allocator(vec![
            record("a", "X", 2019, vec![1.0, 0.0]),
            record("b", "Y", 2020, vec![0.9, 0.1]),
        ]);
        let mut ledger = UsageLedger::new(
            LedgerConfig::new().with_max_uses_per_excerpt(5),
        );

        let first = alloc
            .allocate(CitationQuota::new(2, 2, 2), &[1.0, 0.0], &mut ledger)
            .unwrap();
        assert!(!first.relaxed_reuse);

        // Both excerpts were just used; only they can satisfy min = 2
        let second = alloc
            .allocate(CitationQuota::new(2, 2, 2), &[1.0, 0.0], &mut ledger)
            .unwrap();
        assert!(second.relaxed_reuse);
        assert_eq!(second.selected.len(), 2);
    }

    #[test]
    fn per_excerpt_cap_never_exceeded() {
        let alloc = allocator(vec![
            record("a", "X", 2019, vec![1.0, 0.0]),
            record("b", "Y", 2020, vec![0.9, 0.1]),
            record("c", "Z", 2021, vec![0.8, 0.2]),
        ]);
        let mut ledger = UsageLedger::new(
            LedgerConfig::new()
                .with_max_uses_per_excerpt(2)
                .with_max_total_uses(100),
        );

        // Allocate until candidates run out entirely
        for _ in 0..10 {
            if alloc
                .allocate(CitationQuota::new(1, 2, 3), &[1.0, 0.0], &mut ledger)
                .is_err()
            {
                break;
            }
        }

        for id in ["a", "b", "c"] {
            assert!(ledger.uses(&ExcerptId::new(id)) <= 2, "excerpt {id} over cap");
        }
    }

    #[test]
    fn run_budget_limits_allocation() {
        let alloc = allocator(vec![
            record("a", "X", 2019, vec![1.0, 0.0]),
            record("b", "Y", 2020, vec![0.9, 0.1]),
            record("c", "Z", 2021, vec![0.8, 0.2]),
        ]);
        let mut ledger = UsageLedger::new(
            LedgerConfig::new().with_max_total_uses(1),
        );

        let err = alloc
            .allocate(CitationQuota::new(2, 2, 3), &[1.0, 0.0], &mut ledger)
            .unwrap_err();
        assert!(matches!(
            err,
            AllocationError::InsufficientCitations { shortfall: 1, .. }
        ));
    }
}
