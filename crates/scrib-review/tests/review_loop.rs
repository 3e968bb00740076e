//! End-to-end review rounds against a scripted backend

use scrib_capability::{GenerationError, RetryPolicy};
use scrib_citation::CitationQuota;
use scrib_pipeline::{Draft, GenerationUnit, UnitId};
use scrib_review::{AuditWriter, CriticRubric, ReviewConfig, ReviewError, ReviewLoop};
use scrib_test_utils::{ScriptStep, ScriptedGenerator};
use std::sync::Arc;

fn single_unit_draft(text: &str) -> (Draft, UnitId) {
    let mut draft = Draft::new("Survey");
    let mut unit = GenerationUnit::new("intro", "Introduction", CitationQuota::default());
    unit.text = text.to_string();
    let id = unit.id;
    draft.push_unit(unit);
    (draft, id)
}

fn config() -> ReviewConfig {
    ReviewConfig::new().with_retry(RetryPolicy::new().with_max_retries(0))
}

fn roster(n: usize) -> Vec<CriticRubric> {
    (0..n)
        .map(|i| CriticRubric::new(format!("critic-{i}"), "Judge the draft."))
        .collect()
}

#[tokio::test]
async fn split_verdicts_average_and_bound_terminates() {
    // Critics at 70, 80, 90 average to 80: below the 90 target, so the
    // round patches and the bound of one round ends the loop.
    let (draft, unit) = single_unit_draft("original");
    let issue = format!("Issue[{unit}]: Opening claim is unsupported.");
    let generator = ScriptedGenerator::new(vec![
        ScriptStep::Reply(format!("Score: 70\n{issue}")),
        ScriptStep::Reply(format!("Score: 80\n{issue}")),
        ScriptStep::Reply(format!("Score: 90\n{issue}")),
        ScriptStep::Reply("patched text".to_string()),
    ]);

    let review = ReviewLoop::new(
        Arc::new(generator),
        roster(3),
        config().with_max_rounds(1),
    );
    let outcome = review.run(draft).await.unwrap();

    assert!(!outcome.converged);
    assert!((outcome.composite - 80.0).abs() < f32::EPSILON);
    assert_eq!(outcome.rounds.len(), 1);
    // Duplicate issues collapsed to one patch for the one unit
    assert_eq!(outcome.rounds[0].patches.len(), 1);
    assert_eq!(outcome.draft.unit(unit).unwrap().text, "patched text");

    // The scored pre-patch version survives as the fallback
    let best = outcome.best().unwrap();
    assert_eq!(best.version, 1);
    assert_eq!(best.score, Some(80.0));
    assert_eq!(best.draft.unit(unit).unwrap().text, "original");
}

#[tokio::test]
async fn target_reached_stops_without_patching() {
    let (draft, unit) = single_unit_draft("already great");
    let generator = Arc::new(ScriptedGenerator::always("Score: 95"));

    let review = ReviewLoop::new(generator.clone(), CriticRubric::default_roster(), config());
    let outcome = review.run(draft).await.unwrap();

    assert!(outcome.converged);
    assert_eq!(outcome.rounds.len(), 1);
    assert!(outcome.rounds[0].patches.is_empty());
    assert_eq!(outcome.draft.unit(unit).unwrap().text, "already great");
    // Five critic calls, no patch call
    assert_eq!(generator.call_count().await, 5);
}

#[tokio::test]
async fn best_version_survives_regression() {
    let (draft, _) = single_unit_draft("text");
    let generator = ScriptedGenerator::new(vec![
        ScriptStep::Reply("Score: 85\nIssue[global]: shallow treatment".to_string()),
        ScriptStep::Reply("Score: 70".to_string()),
    ]);

    let review = ReviewLoop::new(
        Arc::new(generator),
        roster(1),
        config().with_max_rounds(2),
    );
    let outcome = review.run(draft).await.unwrap();

    assert!((outcome.composite - 70.0).abs() < f32::EPSILON);
    let best = outcome.best().unwrap();
    assert_eq!(best.version, 1);
    assert_eq!(best.score, Some(85.0));
}

#[tokio::test]
async fn unreachable_backend_carries_best_draft() {
    let (draft, unit) = single_unit_draft("text");
    let generator = ScriptedGenerator::new(vec![ScriptStep::Fail(GenerationError::Unreachable(
        "backend down".to_string(),
    ))]);

    let review = ReviewLoop::new(Arc::new(generator), roster(1), config());
    let err = review.run(draft).await.unwrap_err();

    match err {
        ReviewError::GenerationUnavailable { best, .. } => {
            assert!(best.unit(unit).is_some());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn cancellation_observed_between_rounds() {
    let (draft, _) = single_unit_draft("text");
    let review = ReviewLoop::new(
        Arc::new(ScriptedGenerator::always("Score: 50")),
        roster(1),
        config(),
    );
    review.cancel_token().cancel();

    let err = review.run(draft).await.unwrap_err();
    assert!(matches!(err, ReviewError::Cancelled { .. }));
}

#[tokio::test]
async fn failed_critic_degrades_to_zero_score() {
    let (draft, _) = single_unit_draft("text");
    let generator = ScriptedGenerator::new(vec![
        ScriptStep::Fail(GenerationError::Timeout { elapsed_secs: 30 }),
        ScriptStep::Reply("Score: 80".to_string()),
    ]);

    let review = ReviewLoop::new(
        Arc::new(generator),
        roster(2),
        config().with_max_rounds(1),
    );
    let outcome = review.run(draft).await.unwrap();

    // (0 + 80) / 2
    assert!((outcome.composite - 40.0).abs() < f32::EPSILON);
}

#[tokio::test]
async fn audit_writes_one_json_per_round() {
    let dir = tempfile::tempdir().unwrap();
    let (draft, _) = single_unit_draft("text");

    let review = ReviewLoop::new(
        Arc::new(ScriptedGenerator::always("Score: 40")),
        roster(1),
        config()
            .with_max_rounds(2)
            .with_audit(AuditWriter::new(dir.path().join("audit")).unwrap()),
    );
    review.run(draft).await.unwrap();

    assert!(dir.path().join("audit/round-1.json").exists());
    assert!(dir.path().join("audit/round-2.json").exists());
}
