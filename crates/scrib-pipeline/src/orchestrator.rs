//! Section orchestrator
//!
//! State machine that walks a validated [`DocumentTemplate`] and produces
//! a [`Draft`]:
//!
//! 1. **Outline**: dynamic descriptors are expanded into concrete section
//!    plans via a structural proposal round-trip with the generator.
//! 2. **Sections**: each resolved section becomes one generation unit.
//!    Citations are allocated first (single-writer ledger), then the text
//!    is generated with the citation markers in the prompt.
//! 3. **Abstract**: composed last from the finished body.
//!
//! Recoverable failures degrade the affected unit and the run continues;
//! an unreachable backend or a cancellation aborts at the next unit
//! boundary, returning the partial draft inside the error.

use scrib_capability::{
    generate_with_retry, CancelToken, GenerationError, GenerationOptions, RetryPolicy,
    TextGenerator,
};
use scrib_citation::{Allocation, AllocationError, CitationAllocator, CitationQuota, UsageLedger};
use scrib_corpus::SemanticRetriever;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::draft::{Draft, GenerationUnit};
use crate::error::PipelineError;
use crate::proposal::parse_structural_proposal;
use crate::template::{DocumentTemplate, SectionRole, SectionTemplate};

/// Orchestration stage label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Dynamic expansion phase
    Outline,
    /// Opening section
    Introduction,
    /// i-th body section (1-based)
    Body(usize),
    /// j-th subsection of the i-th body section (1-based)
    SubSection(usize, usize),
    /// Closing section
    Conclusion,
    /// Abstract, composed from the finished body
    Abstract,
    /// Run complete
    Done,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Outline => write!(f, "outline"),
            Self::Introduction => write!(f, "introduction"),
            Self::Body(i) => write!(f, "body-{i}"),
            Self::SubSection(i, j) => write!(f, "body-{i}.{j}"),
            Self::Conclusion => write!(f, "conclusion"),
            Self::Abstract => write!(f, "abstract"),
            Self::Done => write!(f, "done"),
        }
    }
}

/// Orchestrator tuning
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Sampling options passed to the generator
    pub generation: GenerationOptions,
    /// Retry policy for transient backend failures
    pub retry: RetryPolicy,
    /// Hard cap on unit text length
    pub max_unit_chars: usize,
    /// Weight of the run theme when blending the context embedding
    pub theme_weight: f32,
}

impl OrchestratorConfig {
    /// Create config with defaults
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With generation options
    #[inline]
    #[must_use]
    pub fn with_generation(mut self, options: GenerationOptions) -> Self {
        self.generation = options;
        self
    }

    /// With retry policy
    #[inline]
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// With theme blend weight (clamped to 0..=1)
    #[inline]
    #[must_use]
    pub fn with_theme_weight(mut self, weight: f32) -> Self {
        self.theme_weight = weight.clamp(0.0, 1.0);
        self
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            generation: GenerationOptions::default(),
            retry: RetryPolicy::default(),
            max_unit_chars: 20_000,
            theme_weight: 0.4,
        }
    }
}

/// A section after dynamic expansion
struct ResolvedSection {
    stage: Stage,
    section_id: String,
    title: String,
    prompt: String,
    embedding: Vec<f32>,
    word_target: usize,
    quota: CitationQuota,
    role: SectionRole,
}

/// External-search collaborator
///
/// Called on a citation shortfall before the allocation is retried. An
/// implementation searches for new sources, ingests them, and returns a
/// retriever over the enlarged store; `None` means nothing new was found.
#[async_trait::async_trait]
pub trait ExternalSearch: Send + Sync {
    /// Try to enlarge the excerpt pool for the given context
    async fn enlarge(
        &self,
        context: &[f32],
        shortfall: usize,
    ) -> Option<Arc<SemanticRetriever>>;
}

/// Drives one document run
pub struct SectionOrchestrator {
    generator: Arc<dyn TextGenerator>,
    allocator: Mutex<CitationAllocator>,
    ledger: Mutex<UsageLedger>,
    search: Option<Arc<dyn ExternalSearch>>,
    config: OrchestratorConfig,
    cancel: CancelToken,
}

impl SectionOrchestrator {
    /// Create an orchestrator for one run
    #[must_use]
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        allocator: CitationAllocator,
        ledger: UsageLedger,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            generator,
            allocator: Mutex::new(allocator),
            ledger: Mutex::new(ledger),
            search: None,
            config,
            cancel: CancelToken::new(),
        }
    }

    /// With an external-search collaborator for shortfall recovery
    #[must_use]
    pub fn with_external_search(mut self, search: Arc<dyn ExternalSearch>) -> Self {
        self.search = Some(search);
        self
    }

    /// Token that aborts the run at the next unit boundary
    #[inline]
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Clone of the ledger's current state
    pub async fn ledger_snapshot(&self) -> UsageLedger {
        self.ledger.lock().await.clone()
    }

    /// Run the full template to a draft
    ///
    /// # Errors
    /// - `PipelineError::Template` before any generation
    /// - `PipelineError::GenerationUnavailable` when the backend is
    ///   unreachable; carries the partial draft
    /// - `PipelineError::Cancelled` when the cancel token fires; carries
    ///   the partial draft
    /// - `PipelineError::Allocation` on non-recoverable allocation
    ///   failures; carries the partial draft
    pub async fn run(&self, template: &DocumentTemplate) -> Result<Draft, PipelineError> {
        template.validate()?;

        let mut draft = Draft::new(template.title.clone());

        let sections = self.expand(template, &draft).await?;
        draft.record_stage(Stage::Outline.to_string(), Vec::new());

        // Abstract waits for the finished body
        let (body, tail): (Vec<_>, Vec<_>) = sections
            .into_iter()
            .partition(|s| s.role != SectionRole::Abstract);

        for section in body.iter().chain(tail.iter()) {
            if self.cancel.is_cancelled() {
                info!(stage = %section.stage, "run cancelled at unit boundary");
                return Err(PipelineError::Cancelled {
                    partial: Box::new(draft),
                });
            }
            let unit = self
                .generate_unit(section, &template.theme_embedding, &draft)
                .await
                .map_err(|kind| abort_error(kind, draft.clone()))?;
            let id = unit.id;
            debug!(stage = %section.stage, unit = %id, degraded = unit.degraded, "unit complete");
            draft.push_unit(unit);
            draft.record_stage(section.stage.to_string(), vec![id]);
        }

        draft.record_stage(Stage::Done.to_string(), Vec::new());
        info!(units = draft.units().len(), "draft complete");
        Ok(draft)
    }

    /// Phase one: expand every dynamic descriptor into concrete sections
    async fn expand(
        &self,
        template: &DocumentTemplate,
        draft: &Draft,
    ) -> Result<Vec<ResolvedSection>, PipelineError> {
        let mut resolved = Vec::new();
        let mut body_index = 0usize;

        let mut iter = template.sections.iter();
        while let Some(section) = iter.next() {
            if section.dynamic {
                // validate() guarantees the pattern follows
                let Some(pattern) = iter.next() else {
                    continue;
                };
                let plans = self.propose(section, draft).await?;
                for plan in plans {
                    body_index += 1;
                    resolved.push(self.resolve(
                        pattern,
                        Stage::Body(body_index),
                        plan.title.clone(),
                        plan.summary.clone(),
                    ));
                    for (j, sub) in plan.subsections.iter().enumerate() {
                        resolved.push(self.resolve(
                            pattern,
                            Stage::SubSection(body_index, j + 1),
                            format!("{}: {sub}", plan.title),
                            plan.summary.clone(),
                        ));
                    }
                }
            } else if !section.is_template {
                let stage = match section.role {
                    SectionRole::Introduction => Stage::Introduction,
                    SectionRole::Body => {
                        body_index += 1;
                        Stage::Body(body_index)
                    }
                    SectionRole::Conclusion => Stage::Conclusion,
                    SectionRole::Abstract => Stage::Abstract,
                };
                resolved.push(self.resolve(section, stage, section.title.clone(), String::new()));
            }
        }

        Ok(resolved)
    }

    fn resolve(
        &self,
        section: &SectionTemplate,
        stage: Stage,
        title: String,
        summary: String,
    ) -> ResolvedSection {
        let mut prompt = section.prompt.clone();
        if !summary.is_empty() {
            prompt.push_str("\n\nSection focus: ");
            prompt.push_str(&summary);
        }
        ResolvedSection {
            stage,
            section_id: section.id.clone(),
            title,
            prompt,
            embedding: section.prompt_embedding.clone(),
            word_target: section.word_target,
            quota: section.quota,
            role: section.role,
        }
    }

    /// Ask the generator for a structural proposal, fall back to padded
    /// plans when the backend keeps failing transiently
    async fn propose(
        &self,
        section: &SectionTemplate,
        draft: &Draft,
    ) -> Result<Vec<crate::proposal::SectionPlan>, PipelineError> {
        let prompt = format!(
            "{}\n\nPropose exactly {} sections, one per line as 'Section N: Title', \
             each followed by 'Summary: ...' and optional 'Subsection N: ...' lines.",
            section.prompt, section.expand_count
        );
        let response = match generate_with_retry(
            self.generator.as_ref(),
            &prompt,
            &self.config.generation,
            &self.config.retry,
        )
        .await
        {
            Ok(text) => text,
            Err(err) if err.is_fatal() => {
                return Err(PipelineError::GenerationUnavailable {
                    source: err,
                    partial: Box::new(draft.clone()),
                });
            }
            Err(GenerationError::Cancelled) => {
                return Err(PipelineError::Cancelled {
                    partial: Box::new(draft.clone()),
                });
            }
            Err(err) => {
                warn!(%err, "structural proposal failed, using fallback plan");
                String::new()
            }
        };
        Ok(parse_structural_proposal(&response, section.expand_count))
    }

    /// Phase two: allocate citations, then generate one unit
    async fn generate_unit(
        &self,
        section: &ResolvedSection,
        theme: &[f32],
        draft: &Draft,
    ) -> Result<GenerationUnit, UnitAbort> {
        let mut unit = GenerationUnit::new(&section.section_id, &section.title, section.quota);

        let markers = if section.quota.target == 0 {
            String::new()
        } else {
            let context = blend_context(theme, &section.embedding, self.config.theme_weight);
            match self.allocate_with_recovery(section.quota, &context).await {
                Ok((allocation, below_quota)) => {
                    unit.below_quota = below_quota;
                    let ledger = self.ledger.lock().await;
                    let markers = allocation
                        .selected
                        .iter()
                        .filter_map(|id| ledger.citation_number(id))
                        .map(|n| format!("[{n}]"))
                        .collect::<Vec<_>>()
                        .join("");
                    unit.cited = allocation.selected;
                    markers
                }
                Err(err) => return Err(UnitAbort::Allocation(err)),
            }
        };

        let mut prompt = format!(
            "Write the section '{}' in about {} words.\n\n{}",
            section.title, section.word_target, section.prompt
        );
        if !markers.is_empty() {
            prompt.push_str(&format!(
                "\n\nWeave in the citation markers {markers}, all of them, none invented."
            ));
        }
        if section.role == SectionRole::Abstract {
            prompt.push_str("\n\nDocument body:\n");
            prompt.push_str(&truncate(&draft.full_text(), self.config.max_unit_chars));
        }

        // Blank output counts against the same retry bound as transient
        // backend failures; each re-ask carries a reminder.
        let mut text = None;
        for attempt in 0..=self.config.retry.max_retries {
            match generate_with_retry(
                self.generator.as_ref(),
                &prompt,
                &self.config.generation,
                &self.config.retry,
            )
            .await
            {
                Ok(response) if response.trim().is_empty() => {
                    warn!(stage = %section.stage, attempt, "generator returned blank text, re-asking");
                    if attempt == 0 {
                        prompt.push_str(
                            "\n\nThe previous response was empty. Write the full section text.",
                        );
                    }
                }
                Ok(response) => {
                    text = Some(truncate(&response, self.config.max_unit_chars).into_owned());
                    break;
                }
                Err(err) if err.is_fatal() => return Err(UnitAbort::Backend(err)),
                Err(GenerationError::Cancelled) => return Err(UnitAbort::Cancelled),
                Err(err) => {
                    warn!(stage = %section.stage, %err, "generation exhausted retries");
                    break;
                }
            }
        }
        match text {
            Some(text) => unit.text = text,
            None => {
                warn!(stage = %section.stage, "no usable text produced, degrading unit");
                unit.text = format!("[section '{}' unavailable]", section.title);
                unit.degraded = true;
            }
        }

        Ok(unit)
    }

    /// Allocate under the quota; on shortfall ask the external-search
    /// collaborator to enlarge the pool and retry once, then take whatever
    /// is available and flag the unit
    async fn allocate_with_recovery(
        &self,
        quota: CitationQuota,
        context: &[f32],
    ) -> Result<(Allocation, bool), AllocationError> {
        let mut allocator = self.allocator.lock().await;
        let mut ledger = self.ledger.lock().await;

        match allocator.allocate(quota, context, &mut ledger) {
            Ok(allocation) => return Ok((allocation, false)),
            Err(AllocationError::InsufficientCitations {
                shortfall,
                available,
            }) => {
                warn!(shortfall, available, "citation shortfall");
                if let Some(search) = &self.search {
                    if let Some(retriever) = search.enlarge(context, shortfall).await {
                        info!("excerpt pool enlarged, retrying allocation");
                        let config = *allocator.config();
                        *allocator = CitationAllocator::new(retriever, config);
                        match allocator.allocate(quota, context, &mut ledger) {
                            Ok(allocation) => return Ok((allocation, false)),
                            Err(AllocationError::InsufficientCitations {
                                shortfall,
                                available,
                            }) => {
                                warn!(shortfall, available, "shortfall persists after enlargement");
                            }
                            Err(err) => return Err(err),
                        }
                    }
                }
            }
            Err(err) => return Err(err),
        }

        // Best effort: drop the minimum, keep the target
        let relaxed = CitationQuota::new(0, quota.target, quota.max);
        let allocation = allocator.allocate(relaxed, context, &mut ledger)?;
        Ok((allocation, true))
    }
}

/// Why one unit aborted the run
enum UnitAbort {
    Backend(GenerationError),
    Cancelled,
    Allocation(AllocationError),
}

fn abort_error(kind: UnitAbort, draft: Draft) -> PipelineError {
    match kind {
        UnitAbort::Backend(source) => PipelineError::GenerationUnavailable {
            source,
            partial: Box::new(draft),
        },
        UnitAbort::Cancelled => PipelineError::Cancelled {
            partial: Box::new(draft),
        },
        UnitAbort::Allocation(source) => PipelineError::Allocation {
            source,
            partial: Box::new(draft),
        },
    }
}

/// `w * theme + (1 - w) * prompt`, renormalized
fn blend_context(theme: &[f32], prompt: &[f32], w: f32) -> Vec<f32> {
    let mut out: Vec<f32> = theme
        .iter()
        .zip(prompt.iter())
        .map(|(t, p)| w * t + (1.0 - w) * p)
        .collect();
    let magnitude = out.iter().map(|x| x * x).sum::<f32>().sqrt();
    if magnitude > f32::EPSILON {
        for x in &mut out {
            *x /= magnitude;
        }
    }
    out
}

fn truncate(text: &str, max_chars: usize) -> std::borrow::Cow<'_, str> {
    if text.chars().count() <= max_chars {
        std::borrow::Cow::Borrowed(text)
    } else {
        std::borrow::Cow::Owned(text.chars().take(max_chars).collect())
    }
}
