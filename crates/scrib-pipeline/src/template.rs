//! Declarative document templates
//!
//! A template is an ordered list of section descriptors. Sections flagged
//! `dynamic` are expanded at runtime: the orchestrator asks the generator
//! for N section names, then fills each one using the following
//! `is_template` descriptor as the pattern.
//!
//! Prompt and theme embeddings are precomputed at ingestion; the core
//! never derives embeddings mid-run.

use scrib_citation::CitationQuota;
use serde::{Deserialize, Serialize};

/// Structural role of a section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SectionRole {
    /// Opening section, plain paragraphs
    Introduction,
    /// Body chapter
    Body,
    /// Closing section
    Conclusion,
    /// Abstract, composed last from the finished body
    Abstract,
}

/// One section descriptor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionTemplate {
    /// Stable descriptor id
    pub id: String,
    /// Section title
    pub title: String,
    /// Structural role
    pub role: SectionRole,
    /// Prompt template for the generator
    pub prompt: String,
    /// Precomputed embedding of the prompt
    pub prompt_embedding: Vec<f32>,
    /// Word-count target passed into the prompt
    pub word_target: usize,
    /// Citation quota per generated unit
    pub quota: CitationQuota,
    /// Expand into N runtime sections before filling
    pub dynamic: bool,
    /// Pattern section consumed by the preceding dynamic descriptor
    pub is_template: bool,
    /// How many sections a dynamic descriptor proposes
    pub expand_count: usize,
}

impl SectionTemplate {
    /// Create a plain (non-dynamic) descriptor
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        role: SectionRole,
        prompt: impl Into<String>,
        prompt_embedding: Vec<f32>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            role,
            prompt: prompt.into(),
            prompt_embedding,
            word_target: 800,
            quota: CitationQuota::default(),
            dynamic: false,
            is_template: false,
            expand_count: 0,
        }
    }

    /// With word target
    #[inline]
    #[must_use]
    pub fn with_word_target(mut self, words: usize) -> Self {
        self.word_target = words;
        self
    }

    /// With citation quota
    #[inline]
    #[must_use]
    pub fn with_quota(mut self, quota: CitationQuota) -> Self {
        self.quota = quota;
        self
    }

    /// Mark dynamic, proposing `expand_count` sections at runtime
    #[inline]
    #[must_use]
    pub fn dynamic(mut self, expand_count: usize) -> Self {
        self.dynamic = true;
        self.expand_count = expand_count;
        self
    }

    /// Mark as the fill pattern for the preceding dynamic descriptor
    #[inline]
    #[must_use]
    pub fn as_template(mut self) -> Self {
        self.is_template = true;
        self
    }
}

/// Ordered template for a whole document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentTemplate {
    /// Document title
    pub title: String,
    /// Embedding of the running document theme
    pub theme_embedding: Vec<f32>,
    /// Ordered section descriptors
    pub sections: Vec<SectionTemplate>,
}

impl DocumentTemplate {
    /// Create template
    #[must_use]
    pub fn new(title: impl Into<String>, theme_embedding: Vec<f32>) -> Self {
        Self {
            title: title.into(),
            theme_embedding,
            sections: Vec::new(),
        }
    }

    /// Append a section descriptor
    #[must_use]
    pub fn with_section(mut self, section: SectionTemplate) -> Self {
        self.sections.push(section);
        self
    }

    /// Validate structural rules before a run
    ///
    /// # Errors
    /// - `TemplateError::Empty` with no sections
    /// - `TemplateError::DanglingDynamic` when a dynamic descriptor is not
    ///   followed by an `is_template` pattern
    /// - `TemplateError::OrphanTemplate` when an `is_template` pattern has
    ///   no dynamic descriptor before it
    /// - `TemplateError::DimensionMismatch` on ragged embeddings
    pub fn validate(&self) -> Result<(), crate::error::TemplateError> {
        use crate::error::TemplateError;

        if self.sections.is_empty() {
            return Err(TemplateError::Empty);
        }

        let dimension = self.theme_embedding.len();
        for section in &self.sections {
            if section.prompt_embedding.len() != dimension {
                return Err(TemplateError::DimensionMismatch {
                    id: section.id.clone(),
                    expected: dimension,
                    actual: section.prompt_embedding.len(),
                });
            }
        }

        for (i, section) in self.sections.iter().enumerate() {
            if section.dynamic {
                let follower = self.sections.get(i + 1);
                if !follower.is_some_and(|s| s.is_template) {
                    return Err(TemplateError::DanglingDynamic {
                        id: section.id.clone(),
                    });
                }
            }
            if section.is_template && (i == 0 || !self.sections[i - 1].dynamic) {
                return Err(TemplateError::OrphanTemplate {
                    id: section.id.clone(),
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TemplateError;

    fn section(id: &str, role: SectionRole) -> SectionTemplate {
        SectionTemplate::new(id, format!("Title {id}"), role, "prompt", vec![1.0, 0.0])
    }

    #[test]
    fn empty_template_invalid() {
        let t = DocumentTemplate::new("T", vec![1.0, 0.0]);
        assert!(matches!(t.validate(), Err(TemplateError::Empty)));
    }

    #[test]
    fn dynamic_requires_following_pattern() {
        let t = DocumentTemplate::new("T", vec![1.0, 0.0])
            .with_section(section("intro", SectionRole::Introduction))
            .with_section(section("body", SectionRole::Body).dynamic(3));
        assert!(matches!(
            t.validate(),
            Err(TemplateError::DanglingDynamic { .. })
        ));

        let t = DocumentTemplate::new("T", vec![1.0, 0.0])
            .with_section(section("body", SectionRole::Body).dynamic(3))
            .with_section(section("pattern", SectionRole::Body).as_template());
        assert!(t.validate().is_ok());
    }

    #[test]
    fn pattern_requires_preceding_dynamic() {
        let t = DocumentTemplate::new("T", vec![1.0, 0.0])
            .with_section(section("pattern", SectionRole::Body).as_template());
        assert!(matches!(
            t.validate(),
            Err(TemplateError::OrphanTemplate { .. })
        ));

        let t = DocumentTemplate::new("T", vec![1.0, 0.0])
            .with_section(section("intro", SectionRole::Introduction))
            .with_section(section("stray", SectionRole::Body).as_template());
        assert!(matches!(
            t.validate(),
            Err(TemplateError::OrphanTemplate { .. })
        ));
    }

    #[test]
    fn ragged_embeddings_rejected() {
        let mut bad = section("intro", SectionRole::Introduction);
        bad.prompt_embedding = vec![1.0, 0.0, 0.0];
        let t = DocumentTemplate::new("T", vec![1.0, 0.0]).with_section(bad);
        assert!(matches!(
            t.validate(),
            Err(TemplateError::DimensionMismatch { .. })
        ));
    }
}
