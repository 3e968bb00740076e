//! Citable source records
//!
//! An excerpt is one bibliographic record plus its embedding. Ids are
//! supplied by the ingestion collaborator and stay stable for the life of
//! the store.

use serde::{Deserialize, Serialize};

/// Stable excerpt identifier
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ExcerptId(String);

impl ExcerptId {
    /// Create id from an ingestion-supplied key
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Id as string slice
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ExcerptId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ExcerptId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Author/year diversity cluster key
///
/// Excerpts sharing a first author and year count as one cluster for the
/// allocator's diversity bonus.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Signature {
    /// First author surname
    pub first_author: String,
    /// Publication year
    pub year: u16,
}

impl std::fmt::Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.first_author, self.year)
    }
}

/// One citable source record
///
/// Immutable once ingested. Owned by the store; the allocator and
/// retriever hold references, never copies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Excerpt {
    /// Stable identifier
    pub id: ExcerptId,
    /// Author list, first author leading
    pub authors: Vec<String>,
    /// Publication year
    pub year: u16,
    /// Title
    pub title: String,
    /// Source venue (journal, proceedings)
    pub venue: String,
    /// Abstract or summary text
    pub summary: String,
    /// Precomputed fixed-dimension embedding
    pub embedding: Vec<f32>,
}

impl Excerpt {
    /// Create a record from ingested fields
    #[must_use]
    pub fn new(
        id: impl Into<ExcerptId>,
        authors: Vec<String>,
        year: u16,
        title: impl Into<String>,
        venue: impl Into<String>,
        summary: impl Into<String>,
        embedding: Vec<f32>,
    ) -> Self {
        Self {
            id: id.into(),
            authors,
            year,
            title: title.into(),
            venue: venue.into(),
            summary: summary.into(),
            embedding,
        }
    }

    /// Diversity cluster key (first author + year)
    #[must_use]
    pub fn signature(&self) -> Signature {
        Signature {
            first_author: self
                .authors
                .first()
                .map(|a| a.trim().to_string())
                .unwrap_or_default(),
            year: self.year,
        }
    }

    /// Formatted bibliographic line for prompts and reference lists
    #[must_use]
    pub fn formatted_reference(&self) -> String {
        format!(
            "{} ({}). {}. {}.",
            self.authors.join(", "),
            self.year,
            self.title,
            self.venue
        )
    }
}

impl From<String> for ExcerptId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Excerpt {
        Excerpt::new(
            "lit-1",
            vec!["Okonkwo".to_string(), "Larsen".to_string()],
            2021,
            "Retrieval under constraint",
            "J. Synth. Writing",
            "A study of constrained retrieval.",
            vec![1.0, 0.0],
        )
    }

    #[test]
    fn signature_uses_first_author() {
        let sig = sample().signature();
        assert_eq!(sig.first_author, "Okonkwo");
        assert_eq!(sig.year, 2021);
    }

    #[test]
    fn formatted_reference_contains_fields() {
        let line = sample().formatted_reference();
        assert!(line.contains("Okonkwo, Larsen"));
        assert!(line.contains("(2021)"));
        assert!(line.contains("Retrieval under constraint"));
    }

    #[test]
    fn id_ordering_is_lexicographic() {
        assert!(ExcerptId::new("a") < ExcerptId::new("b"));
    }
}
