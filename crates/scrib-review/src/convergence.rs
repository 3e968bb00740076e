//! Convergence loop
//!
//! Rounds of Score, Synthesize, Patch, Evaluate:
//! - critics are fanned out with `join_all` and fully joined before the
//!   reducer runs, so synthesis never sees a partial round;
//! - at most one patch per unit per round, generated concurrently and
//!   applied sequentially, each scoped to its own unit;
//! - the loop stops at the composite target or the round bound;
//! - every scored draft is snapshotted, so the best version survives
//!   later regressions and failures alike.

use futures::future::join_all;
use scrib_capability::{
    generate_with_retry, CancelToken, GenerationError, GenerationOptions, RetryPolicy,
    TextGenerator,
};
use scrib_pipeline::{Draft, DraftVersion, UnitId, VersionHistory};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::audit::{AuditWriter, RoundAudit};
use crate::error::ReviewError;
use crate::patch::{apply_patches, Patch};
use crate::rubric::CriticRubric;
use crate::score::{parse_review, Issue, ReviewScore};
use crate::synthesis::synthesize;

/// Loop tuning
#[derive(Debug, Clone)]
pub struct ReviewConfig {
    /// Composite score that ends the loop early
    pub target_score: f32,
    /// Hard bound on review rounds
    pub max_rounds: u32,
    /// Sampling options for critic and patch calls
    pub generation: GenerationOptions,
    /// Retry policy for transient backend failures
    pub retry: RetryPolicy,
    /// Optional per-round JSON persistence
    pub audit: Option<AuditWriter>,
}

impl ReviewConfig {
    /// Create config with defaults
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With composite target
    #[inline]
    #[must_use]
    pub fn with_target_score(mut self, target: f32) -> Self {
        self.target_score = target.clamp(0.0, 100.0);
        self
    }

    /// With round bound
    #[inline]
    #[must_use]
    pub fn with_max_rounds(mut self, rounds: u32) -> Self {
        self.max_rounds = rounds;
        self
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

    /// With per-round audit persistence
    #[inline]
    #[must_use]
    pub fn with_audit(mut self, writer: AuditWriter) -> Self {
        self.audit = Some(writer);
        self
    }
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            target_score: 90.0,
            max_rounds: 3,
            generation: GenerationOptions::default(),
            retry: RetryPolicy::default(),
            audit: None,
        }
    }
}

/// Result of a finished review
#[derive(Debug)]
pub struct ReviewOutcome {
    /// Final working draft, including patches from the last round
    pub draft: Draft,
    /// Composite of the last scored round
    pub composite: f32,
    /// Whether the composite reached the target
    pub converged: bool,
    /// One audit per completed round
    pub rounds: Vec<RoundAudit>,
    /// Every scored draft version
    pub history: VersionHistory,
}

impl ReviewOutcome {
    /// Best-scoring version seen across the whole review
    ///
    /// The anytime fallback: if the final draft regressed, this is the
    /// one to keep.
    #[must_use]
    pub fn best(&self) -> Option<&DraftVersion> {
        self.history.best()
    }
}

/// Drives one review to convergence or its round bound
pub struct ReviewLoop {
    generator: Arc<dyn TextGenerator>,
    roster: Vec<CriticRubric>,
    config: ReviewConfig,
    cancel: CancelToken,
}

impl ReviewLoop {
    /// Create a loop with the given critic roster
    #[must_use]
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        roster: Vec<CriticRubric>,
        config: ReviewConfig,
    ) -> Self {
        Self {
            generator,
            roster,
            config,
            cancel: CancelToken::new(),
        }
    }

    /// Token that aborts the review between rounds
    #[inline]
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Review a draft to convergence
    ///
    /// # Errors
    /// - `ReviewError::GenerationUnavailable` when the backend dies;
    ///   carries the best draft seen so far
    /// - `ReviewError::Cancelled` between rounds
    /// - `ReviewError::Draft` on patch invariant violations
    /// - audit errors when persistence is configured and fails
    pub async fn run(&self, draft: Draft) -> Result<ReviewOutcome, ReviewError> {
        let mut draft = draft;
        let mut history = VersionHistory::new();
        let mut rounds: Vec<RoundAudit> = Vec::new();
        let mut composite = 0.0f32;
        let mut converged = false;

        for round in 1..=self.config.max_rounds {
            if self.cancel.is_cancelled() {
                return Err(ReviewError::Cancelled {
                    best: Box::new(best_of(&history, &draft)),
                });
            }

            // Score: full fan-out, full fan-in
            let unit_map: HashMap<String, UnitId> = draft
                .units()
                .iter()
                .map(|u| (u.id.to_string(), u.id))
                .collect();
            let verdicts = join_all(
                self.roster
                    .iter()
                    .map(|rubric| self.score_one(rubric, &draft, &unit_map)),
            )
            .await;

            let mut scores: Vec<ReviewScore> = Vec::with_capacity(verdicts.len());
            for verdict in verdicts {
                scores.push(verdict.map_err(|err| self.abort(err, &history, &draft))?);
            }

            let synthesis = synthesize(&scores, &self.roster);
            composite = synthesis.composite;
            let version = history.record(&mut draft, Some(composite));
            info!(round, composite, version, "review round scored");

            if composite >= self.config.target_score {
                converged = true;
                self.finish_round(&mut rounds, round, scores, composite, Vec::new())?;
                break;
            }

            // Patch: one per distinct unit, generated concurrently
            let patch_results = join_all(
                synthesis
                    .by_unit
                    .iter()
                    .map(|(id, issues)| self.patch_one(*id, issues, &draft)),
            )
            .await;

            let mut patches: Vec<Patch> = Vec::new();
            for result in patch_results {
                if let Some(patch) = result.map_err(|err| self.abort(err, &history, &draft))? {
                    patches.push(patch);
                }
            }
            apply_patches(&mut draft, &patches)?;

            self.finish_round(&mut rounds, round, scores, composite, patches)?;
        }

        info!(
            rounds = rounds.len(),
            composite, converged, "review complete"
        );

        Ok(ReviewOutcome {
            draft,
            composite,
            converged,
            rounds,
            history,
        })
    }

    /// One critic call; transient exhaustion degrades to a zero score
    async fn score_one(
        &self,
        rubric: &CriticRubric,
        draft: &Draft,
        unit_map: &HashMap<String, UnitId>,
    ) -> Result<ReviewScore, GenerationError> {
        let mut prompt = format!("{}\n\nDraft under review:\n", rubric.prompt);
        for unit in draft.units() {
            prompt.push_str(&format!("\n[{}] {}\n{}\n", unit.id, unit.title, unit.text));
        }
        prompt.push_str(
            "\nReply with one 'Score: N' line (0-100), then zero or more \
             'Issue[<unit id>]: description' lines. Use Issue[global] for \
             draft-wide problems.",
        );

        match generate_with_retry(
            self.generator.as_ref(),
            &prompt,
            &self.config.generation,
            &self.config.retry,
        )
        .await
        {
            Ok(response) => Ok(parse_review(&rubric.name, &response, unit_map)),
            Err(err) if err.is_retryable() => {
                warn!(critic = %rubric.name, %err, "critic exhausted retries, scoring 0");
                Ok(ReviewScore {
                    critic: rubric.name.clone(),
                    score: 0,
                    issues: Vec::new(),
                })
            }
            Err(err) => Err(err),
        }
    }

    /// One patch call; the prompt carries only the target unit and its
    /// issues, never the rest of the draft
    async fn patch_one(
        &self,
        target: UnitId,
        issues: &[Issue],
        draft: &Draft,
    ) -> Result<Option<Patch>, GenerationError> {
        let Some(unit) = draft.unit(target) else {
            warn!(unit = %target, "issue targets a unit the draft lost, skipping");
            return Ok(None);
        };

        let mut prompt = format!(
            "Revise the section '{}' to address these problems:\n",
            unit.title
        );
        for issue in issues {
            prompt.push_str(&format!("- {}\n", issue.description));
        }
        prompt.push_str(&format!(
            "\nCurrent text:\n{}\n\nKeep every citation marker. Reply with the revised \
             section text only.",
            unit.text
        ));

        match generate_with_retry(
            self.generator.as_ref(),
            &prompt,
            &self.config.generation,
            &self.config.retry,
        )
        .await
        {
            Ok(replacement) => Ok(Some(Patch::new(target, replacement, issues))),
            Err(err) if err.is_retryable() => {
                warn!(unit = %target, %err, "patch exhausted retries, leaving unit as-is");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    fn finish_round(
        &self,
        rounds: &mut Vec<RoundAudit>,
        round: u32,
        scores: Vec<ReviewScore>,
        composite: f32,
        patches: Vec<Patch>,
    ) -> Result<(), ReviewError> {
        let audit = RoundAudit {
            round,
            scores,
            composite,
            patches,
            completed_at: chrono::Utc::now(),
        };
        if let Some(writer) = &self.config.audit {
            writer.persist(&audit)?;
        }
        rounds.push(audit);
        Ok(())
    }

    fn abort(&self, err: GenerationError, history: &VersionHistory, draft: &Draft) -> ReviewError {
        let best = Box::new(best_of(history, draft));
        match err {
            GenerationError::Cancelled => ReviewError::Cancelled { best },
            source => ReviewError::GenerationUnavailable { source, best },
        }
    }
}

/// Best scored version, or the current draft when nothing was scored yet
fn best_of(history: &VersionHistory, current: &Draft) -> Draft {
    history
        .best()
        .map_or_else(|| current.clone(), |v| v.draft.clone())
}
