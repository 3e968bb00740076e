//! Retrieval invariants under arbitrary embeddings

use proptest::prelude::*;
use scrib_corpus::{Excerpt, ExcerptId, ExcerptStore, SemanticRetriever};
use std::collections::HashSet;
use std::sync::Arc;

fn store_from(embeddings: Vec<Vec<f32>>) -> Arc<ExcerptStore> {
    let records = embeddings
        .into_iter()
        .enumerate()
        .map(|(i, embedding)| {
            Excerpt::new(
                format!("lit-{i:02}"),
                vec![format!("Author{i}")],
                2015 + (i % 8) as u16,
                format!("title {i}"),
                "venue",
                "summary",
                embedding,
            )
        })
        .collect();
    Arc::new(ExcerptStore::build(records).expect("valid fixture store"))
}

fn embedding() -> impl Strategy<Value = Vec<f32>> {
    prop::collection::vec(-1.0f32..1.0, 3)
}

proptest! {
    /// Ranking the same query twice gives the same order.
    #[test]
    fn ranking_is_stable(
        embeddings in prop::collection::vec(embedding(), 1..12),
        query in embedding(),
    ) {
        let retriever = SemanticRetriever::new(store_from(embeddings));

        let first = retriever.rank(&query, &HashSet::new(), 8).unwrap();
        let second = retriever.rank(&query, &HashSet::new(), 8).unwrap();

        let ids = |v: &[scrib_corpus::RankedExcerpt]| {
            v.iter().map(|c| c.excerpt.id.clone()).collect::<Vec<_>>()
        };
        prop_assert_eq!(ids(&first), ids(&second));
    }

    /// Excluded ids never appear, and exclusion never hides more
    /// candidates than it names.
    #[test]
    fn exclusion_never_leaks_or_starves(
        embeddings in prop::collection::vec(embedding(), 2..12),
        query in embedding(),
        excluded_count in 0usize..4,
    ) {
        let n = embeddings.len();
        let retriever = SemanticRetriever::new(store_from(embeddings));
        let exclude: HashSet<ExcerptId> = (0..excluded_count.min(n))
            .map(|i| ExcerptId::new(format!("lit-{i:02}")))
            .collect();

        let ranked = retriever.rank(&query, &exclude, n).unwrap();

        for candidate in &ranked {
            prop_assert!(!exclude.contains(&candidate.excerpt.id));
        }
        prop_assert_eq!(ranked.len(), n - exclude.len());
    }

    /// Similarities are non-increasing down the ranking.
    #[test]
    fn similarity_is_sorted(
        embeddings in prop::collection::vec(embedding(), 1..12),
        query in embedding(),
    ) {
        let retriever = SemanticRetriever::new(store_from(embeddings));
        let ranked = retriever.rank(&query, &HashSet::new(), 12).unwrap();

        for pair in ranked.windows(2) {
            prop_assert!(pair[0].similarity >= pair[1].similarity);
        }
    }
}
