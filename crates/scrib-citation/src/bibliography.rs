//! Reference list and citation statistics
//!
//! Numbering follows first use in the run, so [1] is always the first
//! excerpt cited, matching the inline markers the pipeline emits.

use crate::ledger::UsageLedger;
use scrib_corpus::ExcerptStore;
use serde::{Deserialize, Serialize};

/// Citation totals for one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationStats {
    /// Distinct excerpts cited
    pub distinct_cited: usize,
    /// Total citations including reuse
    pub total_uses: usize,
    /// Excerpts in the pool
    pub pool_size: usize,
    /// Excerpts never cited
    pub unused_count: usize,
}

impl CitationStats {
    /// Compute stats from ledger and store
    #[must_use]
    pub fn collect(ledger: &UsageLedger, store: &ExcerptStore) -> Self {
        let distinct = ledger.distinct_cited();
        Self {
            distinct_cited: distinct,
            total_uses: ledger.total_uses(),
            pool_size: store.len(),
            unused_count: store.len().saturating_sub(distinct),
        }
    }
}

/// Render the numbered reference list in citation order
///
/// Ids in the ledger that no longer resolve against the store are
/// skipped with a warning; that only happens if ledger and store are
/// from different runs.
#[must_use]
pub fn render_bibliography(ledger: &UsageLedger, store: &ExcerptStore) -> String {
    let mut lines = Vec::with_capacity(ledger.distinct_cited());

    for (number, id) in ledger.citation_order() {
        match store.get(&id) {
            Some(excerpt) => {
                lines.push(format!("[{number}] {}", excerpt.formatted_reference()));
            }
            None => {
                tracing::warn!(%id, "cited excerpt missing from store, skipping");
            }
        }
    }

    tracing::info!(entries = lines.len(), "bibliography rendered");
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::UsageLedger;
    use pretty_assertions::assert_eq;
    use scrib_corpus::{Excerpt, ExcerptId};

    fn record(id: &str, author: &str) -> Excerpt {
        Excerpt::new(
            id,
            vec![author.to_string()],
            2020,
            format!("title {id}"),
            "venue",
            "summary",
            vec![1.0, 0.0],
        )
    }

    fn commit(ledger: &mut UsageLedger, store: &ExcerptStore, id: &str) {
        let excerpt = store.get(&ExcerptId::new(id)).unwrap();
        ledger
            .commit(&[(excerpt.id.clone(), excerpt.signature())])
            .unwrap();
    }

    #[test]
    fn bibliography_in_first_use_order() {
        let store = ExcerptStore::build(vec![
            record("a", "Adler"),
            record("b", "Brandt"),
            record("c", "Cheng"),
        ])
        .unwrap();
        let mut ledger = UsageLedger::default();

        commit(&mut ledger, &store, "c");
        commit(&mut ledger, &store, "a");

        let bib = render_bibliography(&ledger, &store);
        let lines: Vec<_> = bib.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("[1] Cheng"));
        assert!(lines[1].starts_with("[2] Adler"));
    }

    #[test]
    fn numbering_stable_across_renders() {
        let store = ExcerptStore::build(vec![record("a", "Adler"), record("b", "Brandt")]).unwrap();
        let mut ledger = UsageLedger::default();
        commit(&mut ledger, &store, "b");

        assert_eq!(
            render_bibliography(&ledger, &store),
            render_bibliography(&ledger, &store)
        );
    }

    #[test]
    fn stats_count_unused() {
        let store = ExcerptStore::build(vec![
            record("a", "Adler"),
            record("b", "Brandt"),
            record("c", "Cheng"),
        ])
        .unwrap();
        let mut ledger = UsageLedger::default();
        commit(&mut ledger, &store, "a");

        let stats = CitationStats::collect(&ledger, &store);
        assert_eq!(stats.distinct_cited, 1);
        assert_eq!(stats.total_uses, 1);
        assert_eq!(stats.pool_size, 3);
        assert_eq!(stats.unused_count, 2);
    }
}
