//! End-to-end tests for the trait engine
//!
//! Drives `process_submission` against the in-memory backend with fake
//! classifier and embedder collaborators.

mod common;

use common::*;
use metis_core::embeddings::EmbeddingService;
use metis_core::engine::UpdateMethod;
use metis_core::storage::StorageBackend;
use metis_core::types::CognitiveTrait;
use metis_core::{
    LearnerId, MemoryStorage, MetisConfig, MetisError, TraitEngine,
};
use std::sync::Arc;

async fn engine_with(
    classifier: FakeClassifier,
) -> (TraitEngine, Arc<MemoryStorage>, LearnerId) {
    let storage = Arc::new(MemoryStorage::new());
    let learner = LearnerId::new();
    storage.create_learner(learner).await.unwrap();

    let engine = TraitEngine::new(
        storage.clone(),
        Arc::new(classifier),
        Arc::new(FakeEmbedder::new()),
        MetisConfig::default(),
    );
    (engine, storage, learner)
}

#[tokio::test]
async fn two_correct_precision_answers_nudge_precision_up() {
    let (engine, storage, learner) = engine_with(FakeClassifier::new()).await;

    let questions = vec![
        precision_question("q1", "mechanics"),
        precision_question("q2", "mechanics"),
    ];
    let events = vec![
        correct_answer(&questions[0], 0.9),
        correct_answer(&questions[1], 0.9),
    ];

    let outcome = engine
        .process_submission(learner, "physics", None, &events, &questions)
        .await
        .unwrap();

    // Each sample: (1.0 + 0.9*1.2) / 2.2 = 0.9455, so precision moves from
    // 0.5 to 0.5 + 0.15 * 0.4455 = 0.567
    let precision = outcome.traits.traits.get(CognitiveTrait::Precision);
    assert!((precision - 0.567).abs() < 0.005, "got {}", precision);

    let diag = &outcome.traits.diagnostics[&CognitiveTrait::Precision];
    assert_eq!(diag.evidence_count, 2);
    assert_eq!(diag.method, UpdateMethod::KalmanInnovation);

    // Untargeted traits carry forward untouched
    assert_eq!(outcome.traits.traits.get(CognitiveTrait::Curiosity), 0.5);
    assert_eq!(
        outcome.traits.diagnostics[&CognitiveTrait::Curiosity].method,
        UpdateMethod::NoEvidence
    );

    // The updated vector was persisted
    let stored = storage.get_trait_vector(learner).await.unwrap();
    assert!((stored.get(CognitiveTrait::Precision) - precision).abs() < f32::EPSILON);
}

#[tokio::test]
async fn empty_submission_leaves_vector_unchanged() {
    let (engine, _, learner) = engine_with(FakeClassifier::new()).await;

    let outcome = engine
        .process_submission(learner, "physics", None, &[], &[])
        .await
        .unwrap();

    for (_, diag) in &outcome.traits.diagnostics {
        assert_eq!(diag.method, UpdateMethod::NoEvidence);
        assert_eq!(diag.change, 0.0);
    }
    assert!(outcome.traits.evidence_log.is_empty());
    assert!(outcome.detections.is_empty());
    assert!(outcome.promotions.is_empty());
}

#[tokio::test]
async fn unknown_learner_is_surfaced() {
    let (engine, _, _) = engine_with(FakeClassifier::new()).await;

    let result = engine
        .process_submission(LearnerId::new(), "physics", None, &[], &[])
        .await;
    assert!(matches!(result, Err(MetisError::LearnerNotFound(_))));
}

#[tokio::test]
async fn topic_vector_updates_independently_of_global() {
    let (engine, storage, learner) = engine_with(FakeClassifier::new()).await;

    let questions = vec![precision_question("q1", "mechanics")];
    let events = vec![correct_answer(&questions[0], 0.9)];

    let outcome = engine
        .process_submission(learner, "physics", Some("mechanics"), &events, &questions)
        .await
        .unwrap();

    let topical = outcome.topic_traits.unwrap();
    assert!(topical.traits.get(CognitiveTrait::Precision) > 0.5);

    // A different topic still reads neutral
    let other = storage
        .get_topic_trait_vector(learner, "optics")
        .await
        .unwrap();
    assert_eq!(other.get(CognitiveTrait::Precision), 0.5);
}

#[tokio::test]
async fn wrong_answer_records_misconception_and_penalizes_trait() {
    let classifier = FakeClassifier::new().with_response("q1", falls_faster_discovery());
    let (engine, storage, learner) = engine_with(classifier).await;

    let mut question = conceptual_question("q1", "gravity");
    question.traits_targeted = vec![
        CognitiveTrait::AnalyticalDepth,
        CognitiveTrait::PatternRecognition,
    ];
    let questions = vec![question];
    let events = vec![wrong_answer(&questions[0], 0.8)];

    let outcome = engine
        .process_submission(learner, "physics", None, &events, &questions)
        .await
        .unwrap();

    assert_eq!(outcome.detections.len(), 1);
    let detection = &outcome.detections[0];
    assert!(detection.newly_created);
    assert_eq!(detection.personal.frequency, 1);
    assert!(detection.personal.is_active());

    // The record is in the learner's catalogue
    let catalogue = storage
        .list_personal_misconceptions(learner, Some("gravity"), true)
        .await
        .unwrap();
    assert_eq!(catalogue.len(), 1);

    // The detection flag penalized its related trait in the same update:
    // the affected trait's sample carries a nonzero penalty component
    let penalized_entries: Vec<_> = outcome
        .traits
        .evidence_log
        .iter()
        .filter(|e| e.sample.components.penalty > 0.0)
        .collect();
    assert!(!penalized_entries.is_empty());
    assert!(penalized_entries
        .iter()
        .all(|e| e.target == CognitiveTrait::PatternRecognition));
}

#[tokio::test]
async fn targeted_streak_resolves_then_relapses() {
    let classifier = FakeClassifier::new().with_response("q1", falls_faster_discovery());
    let (engine, _, learner) = engine_with(classifier).await;

    // Detection pass
    let questions = vec![conceptual_question("q1", "gravity")];
    let outcome = engine
        .process_submission(
            learner,
            "physics",
            None,
            &[wrong_answer(&questions[0], 0.8)],
            &questions,
        )
        .await
        .unwrap();
    let id = outcome.detections[0].personal.id;

    // Three correct answers on remedial questions targeting the record
    let mut remedial = conceptual_question("r1", "gravity");
    remedial.misconception_target = Some(id);

    for round in 0..3u32 {
        let outcome = engine
            .process_submission(
                learner,
                "physics",
                None,
                &[correct_answer(&remedial, 0.8)],
                &[remedial.clone()],
            )
            .await
            .unwrap();

        let update = &outcome.resolutions[0];
        assert_eq!(update.misconception.correct_streak, round + 1);
        assert_eq!(update.resolved_now, round == 2);
    }

    // Re-detection on a fresh wrong answer relapses the record
    let outcome = engine
        .process_submission(
            learner,
            "physics",
            None,
            &[wrong_answer(&questions[0], 0.8)],
            &questions,
        )
        .await
        .unwrap();

    let relapsed = &outcome.detections[0];
    assert!(!relapsed.newly_created);
    assert_eq!(relapsed.personal.frequency, 2);
    assert_eq!(relapsed.personal.correct_streak, 0);
    assert!(relapsed.personal.is_active());
}

#[tokio::test]
async fn classifier_outage_still_updates_traits() {
    let classifier = FakeClassifier::new().with_response("q1", falls_faster_discovery());
    classifier.set_failing(true);
    let (engine, _, learner) = engine_with(classifier).await;

    let questions = vec![conceptual_question("q1", "gravity")];
    let events = vec![wrong_answer(&questions[0], 0.8)];

    let outcome = engine
        .process_submission(learner, "physics", None, &events, &questions)
        .await
        .unwrap();

    // No detection, but the trait update still ran on the wrong answer
    assert!(outcome.detections.is_empty());
    assert!(outcome.traits.traits.get(CognitiveTrait::AnalyticalDepth) < 0.5);
}

#[tokio::test]
async fn event_with_unknown_question_is_skipped() {
    let (engine, _, learner) = engine_with(FakeClassifier::new()).await;

    let questions = vec![precision_question("q1", "mechanics")];
    let mut orphan = correct_answer(&questions[0], 0.9);
    orphan.question_id = "missing".to_string();
    let events = vec![orphan, correct_answer(&questions[0], 0.9)];

    let outcome = engine
        .process_submission(learner, "physics", None, &events, &questions)
        .await
        .unwrap();

    assert_eq!(
        outcome.traits.diagnostics[&CognitiveTrait::Precision].evidence_count,
        1
    );
}

#[tokio::test]
async fn shared_misconception_promotes_once_quorum_reached() {
    let storage = Arc::new(MemoryStorage::new());
    let classifier =
        FakeClassifier::new().with_response("q1", falls_faster_discovery());
    let engine = TraitEngine::new(
        storage.clone(),
        Arc::new(classifier),
        Arc::new(FakeEmbedder::new()),
        MetisConfig::default(),
    );

    let questions = vec![conceptual_question("q1", "gravity")];

    // Three learners make the same conceptual error
    let mut decisions = Vec::new();
    for _ in 0..3 {
        let learner = LearnerId::new();
        storage.create_learner(learner).await.unwrap();

        let outcome = engine
            .process_submission(
                learner,
                "physics",
                None,
                &[wrong_answer(&questions[0], 0.8)],
                &questions,
            )
            .await
            .unwrap();
        decisions.extend(outcome.promotions);
    }

    // Learners 1 and 2 fall short of the frequency quorum; learner 3 tips it
    assert_eq!(decisions.len(), 3);
    assert!(!decisions[0].promoted);
    assert!(!decisions[1].promoted);
    assert!(decisions[2].promoted);
    assert_eq!(decisions[2].learner_count, Some(3));

    // The knowledge base now holds the promoted record
    let embedding = FakeEmbedder::new()
        .embed("Thinks heavier objects fall faster")
        .await
        .unwrap();
    let neighbors = storage
        .nearest_global_misconceptions(&embedding, Some("physics"), 1)
        .await
        .unwrap();
    assert_eq!(
        neighbors[0].0.misconception_text,
        "Thinks heavier objects fall faster"
    );
}
