//! Run-scoped usage ledger
//!
//! Mutable record of how often each excerpt has been cited in the current
//! generation run. Counts only ever grow. Commits are transactional: every
//! id in an allocation is applied together or not at all.
//!
//! Callers serialize access (single-writer discipline); the commit path
//! re-validates caps and reports `LedgerConflict` if it ever sees state
//! the allocator did not.

use crate::error::AllocationError;
use scrib_corpus::{ExcerptId, Signature};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Usage caps for one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Run-wide cap on total citations
    pub max_total_uses: usize,
    /// Cap on uses of any single excerpt
    pub max_uses_per_excerpt: u32,
}

impl LedgerConfig {
    /// Create config with default caps
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With run-wide cap
    #[inline]
    #[must_use]
    pub fn with_max_total_uses(mut self, max: usize) -> Self {
        self.max_total_uses = max;
        self
    }

    /// With per-excerpt cap
    #[inline]
    #[must_use]
    pub fn with_max_uses_per_excerpt(mut self, max: u32) -> Self {
        self.max_uses_per_excerpt = max;
        self
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_total_uses: 300,
            max_uses_per_excerpt: 2,
        }
    }
}

/// Per-excerpt usage record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageEntry {
    /// Times cited so far
    pub uses: u32,
    /// Paragraph positions where cited
    pub positions: Vec<u32>,
    /// Citation number assigned at first use (bibliography order)
    pub citation_number: usize,
    /// Diversity cluster of the excerpt
    pub signature: Signature,
}

/// Run-scoped citation ledger
#[derive(Debug, Clone)]
pub struct UsageLedger {
    config: LedgerConfig,
    entries: HashMap<ExcerptId, UsageEntry>,
    signature_counts: HashMap<Signature, u32>,
    total_uses: usize,
    next_position: u32,
    next_citation_number: usize,
    previous_selection: Vec<ExcerptId>,
}

impl UsageLedger {
    /// Create an empty ledger for a new run
    #[must_use]
    pub fn new(config: LedgerConfig) -> Self {
        Self {
            config,
            entries: HashMap::new(),
            signature_counts: HashMap::new(),
            total_uses: 0,
            next_position: 0,
            next_citation_number: 1,
            previous_selection: Vec::new(),
        }
    }

    /// Configured caps
    #[inline]
    #[must_use]
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Use count for an excerpt
    #[inline]
    #[must_use]
    pub fn uses(&self, id: &ExcerptId) -> u32 {
        self.entries.get(id).map_or(0, |e| e.uses)
    }

    /// Total citations committed this run
    #[inline]
    #[must_use]
    pub fn total_uses(&self) -> usize {
        self.total_uses
    }

    /// Citations still available under the run-wide cap
    #[inline]
    #[must_use]
    pub fn remaining_budget(&self) -> usize {
        self.config.max_total_uses.saturating_sub(self.total_uses)
    }

    /// Ids at their per-excerpt cap, for retrieval exclusion
    #[must_use]
    pub fn exhausted_ids(&self) -> HashSet<ExcerptId> {
        self.entries
            .iter()
            .filter(|(_, e)| e.uses >= self.config.max_uses_per_excerpt)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// How often a diversity cluster has been cited
    #[inline]
    #[must_use]
    pub fn signature_count(&self, signature: &Signature) -> u32 {
        self.signature_counts.get(signature).copied().unwrap_or(0)
    }

    /// Last paragraph position where an excerpt was cited
    #[must_use]
    pub fn last_used_position(&self, id: &ExcerptId) -> Option<u32> {
        self.entries
            .get(id)
            .and_then(|e| e.positions.last().copied())
    }

    /// Ids cited by the immediately preceding allocation
    #[inline]
    #[must_use]
    pub fn previous_selection(&self) -> &[ExcerptId] {
        &self.previous_selection
    }

    /// Citation number assigned to an excerpt, if cited
    #[must_use]
    pub fn citation_number(&self, id: &ExcerptId) -> Option<usize> {
        self.entries.get(id).map(|e| e.citation_number)
    }

    /// Cited ids in bibliography (first-use) order
    #[must_use]
    pub fn citation_order(&self) -> Vec<(usize, ExcerptId)> {
        let mut order: Vec<_> = self
            .entries
            .iter()
            .map(|(id, e)| (e.citation_number, id.clone()))
            .collect();
        order.sort();
        order
    }

    /// Number of distinct excerpts cited
    #[inline]
    #[must_use]
    pub fn distinct_cited(&self) -> usize {
        self.entries.len()
    }

    /// Commit one allocation atomically
    ///
    /// Validates every selection against the caps before touching any
    /// count; either the whole batch lands or none of it does. Returns the
    /// paragraph position assigned to this allocation.
    ///
    /// # Errors
    /// `AllocationError::LedgerConflict` if the batch would breach a cap
    /// the allocator should have observed — a serialization violation.
    pub fn commit(
        &mut self,
        selections: &[(ExcerptId, Signature)],
    ) -> Result<u32, AllocationError> {
        if self.total_uses + selections.len() > self.config.max_total_uses {
            return Err(AllocationError::LedgerConflict(format!(
                "commit of {} would exceed total cap {} (at {})",
                selections.len(),
                self.config.max_total_uses,
                self.total_uses
            )));
        }
        let mut batch_counts: HashMap<&ExcerptId, u32> = HashMap::new();
        for (id, _) in selections {
            *batch_counts.entry(id).or_insert(0) += 1;
        }
        for (id, count) in &batch_counts {
            if self.uses(id) + count > self.config.max_uses_per_excerpt {
                return Err(AllocationError::LedgerConflict(format!(
                    "excerpt {id} would exceed per-excerpt cap"
                )));
            }
        }

        let position = self.next_position;
        self.next_position += 1;

        for (id, signature) in selections {
            let next_number = self.next_citation_number;
            let entry = self.entries.entry(id.clone()).or_insert_with(|| UsageEntry {
                uses: 0,
                positions: Vec::new(),
                citation_number: next_number,
                signature: signature.clone(),
            });
            if entry.uses == 0 {
                self.next_citation_number += 1;
            }
            entry.uses += 1;
            entry.positions.push(position);
            *self.signature_counts.entry(signature.clone()).or_insert(0) += 1;
            self.total_uses += 1;
        }

        self.previous_selection = selections.iter().map(|(id, _)| id.clone()).collect();

        tracing::debug!(
            position,
            committed = selections.len(),
            total = self.total_uses,
            "ledger commit"
        );

        Ok(position)
    }
}

impl Default for UsageLedger {
    fn default() -> Self {
        Self::new(LedgerConfig::default())
    }
}
