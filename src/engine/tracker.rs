//! Personal misconception tracking
//!
//! Maintains each learner's catalogue of misconceptions through the
//! detection/relapse/resolution lifecycle. Detection consumes the external
//! classifier; classifier failures degrade to "no misconception detected"
//! rather than failing the request.

use crate::config::EngineConfig;
use crate::error::Result;
use crate::services::MisconceptionClassifier;
use crate::storage::StorageBackend;
use crate::types::{
    DiscoveredMisconception, LearnerId, MisconceptionId, MisconceptionProgress,
    PersonalMisconception, QuestionInfo, QuizResponseEvent,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of running detection on one incorrect response
#[derive(Debug, Clone)]
pub struct DetectionOutcome {
    /// The stored record (created or relapsed)
    pub personal: PersonalMisconception,

    /// The raw classifier output
    pub discovered: DiscoveredMisconception,

    /// Whether this detection created a new record
    pub newly_created: bool,
}

/// A streak update on a targeted misconception
#[derive(Debug, Clone)]
pub struct ResolutionUpdate {
    pub misconception: PersonalMisconception,

    /// Whether this update transitioned the record to resolved
    pub resolved_now: bool,
}

/// Tracker for one deployment's learner population
pub struct MisconceptionTracker {
    storage: Arc<dyn StorageBackend>,
    classifier: Arc<dyn MisconceptionClassifier>,
    config: EngineConfig,
}

impl MisconceptionTracker {
    pub fn new(
        storage: Arc<dyn StorageBackend>,
        classifier: Arc<dyn MisconceptionClassifier>,
        config: EngineConfig,
    ) -> Self {
        Self {
            storage,
            classifier,
            config,
        }
    }

    /// Classify an incorrect response and record any detected misconception
    ///
    /// Returns `None` when the classifier sees only a guess, when its
    /// confidence is below the floor, or when the classifier itself fails
    /// (best-effort enrichment, never an error).
    ///
    /// A detection matching an existing record (case-insensitive text, same
    /// topic) is a relapse: frequency increments, the streak resets, and the
    /// record returns to active even if previously resolved.
    pub async fn detect_and_record(
        &self,
        learner: LearnerId,
        event: &QuizResponseEvent,
        question: &QuestionInfo,
        topic: &str,
    ) -> Result<Option<DetectionOutcome>> {
        let discovered = match self
            .classifier
            .extract_misconception(
                question,
                &event.selected_option,
                event.reasoning.as_deref(),
                topic,
            )
            .await
        {
            Ok(Some(discovered)) => discovered,
            Ok(None) => {
                debug!("No misconception identified for question {}", question.id);
                return Ok(None);
            }
            Err(e) => {
                warn!("Misconception classifier unavailable, skipping: {}", e);
                return Ok(None);
            }
        };

        if discovered.confidence < self.config.classifier_confidence_floor {
            debug!(
                "Discarding low-confidence detection ({:.2} < {:.2}): '{}'",
                discovered.confidence,
                self.config.classifier_confidence_floor,
                discovered.misconception_text
            );
            return Ok(None);
        }

        let now = Utc::now();
        let existing = self
            .storage
            .find_personal_misconception_by_text(
                learner,
                topic,
                &discovered.misconception_text,
            )
            .await?;

        let (personal, newly_created) = match existing {
            Some(mut record) => {
                info!(
                    "Recurrence of misconception '{}' for learner {} (frequency {})",
                    record.misconception_text,
                    learner,
                    record.frequency + 1
                );
                record.record_recurrence(now);
                (record, false)
            }
            None => {
                info!(
                    "New personal misconception for learner {}: '{}'",
                    learner, discovered.misconception_text
                );
                let record = PersonalMisconception::from_discovery(
                    &discovered,
                    Some(question.text.clone()),
                    event.reasoning.clone(),
                    now,
                );
                (record, true)
            }
        };

        self.storage
            .upsert_personal_misconception(learner, &personal)
            .await?;

        Ok(Some(DetectionOutcome {
            personal,
            discovered,
            newly_created,
        }))
    }

    /// Record a correct answer on a question targeting a misconception
    ///
    /// Increments the correct streak; at the resolution threshold the record
    /// transitions to resolved. Unknown IDs are skipped with a warning
    /// (input error, not fatal).
    pub async fn record_correct(
        &self,
        learner: LearnerId,
        id: MisconceptionId,
    ) -> Result<Option<ResolutionUpdate>> {
        let Some(mut record) = self.storage.get_personal_misconception(learner, id).await? else {
            warn!("Correct answer tied to unknown misconception {}", id);
            return Ok(None);
        };

        let resolved_now = record.record_correct(self.config.resolution_threshold, Utc::now());
        self.storage
            .upsert_personal_misconception(learner, &record)
            .await?;

        if resolved_now {
            info!(
                "Misconception resolved for learner {}: '{}'",
                learner, record.misconception_text
            );
        }

        Ok(Some(ResolutionUpdate {
            misconception: record,
            resolved_now,
        }))
    }

    /// Record an incorrect answer on a question targeting a misconception
    ///
    /// The streak resets and the record returns to active.
    pub async fn record_incorrect(
        &self,
        learner: LearnerId,
        id: MisconceptionId,
    ) -> Result<Option<PersonalMisconception>> {
        let Some(mut record) = self.storage.get_personal_misconception(learner, id).await? else {
            warn!("Incorrect answer tied to unknown misconception {}", id);
            return Ok(None);
        };

        record.record_incorrect();
        self.storage
            .upsert_personal_misconception(learner, &record)
            .await?;
        Ok(Some(record))
    }

    /// Note that a question targeting this misconception was served
    pub async fn note_targeted_question(
        &self,
        learner: LearnerId,
        id: MisconceptionId,
    ) -> Result<()> {
        if let Some(mut record) = self.storage.get_personal_misconception(learner, id).await? {
            record.targeted_question_count += 1;
            self.storage
                .upsert_personal_misconception(learner, &record)
                .await?;
        }
        Ok(())
    }

    /// Per-topic resolution progress rollup
    pub async fn progress(&self, learner: LearnerId, topic: &str) -> Result<MisconceptionProgress> {
        let all = self
            .storage
            .list_personal_misconceptions(learner, Some(topic), false)
            .await?;

        let total = all.len();
        let resolved = all.iter().filter(|m| m.resolved).count();

        Ok(MisconceptionProgress {
            topic: topic.to_string(),
            total_misconceptions: total,
            resolved_misconceptions: resolved,
            active_misconceptions: total - resolved,
            resolution_rate: if total == 0 {
                0.0
            } else {
                resolved as f32 / total as f32
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MetisError;
    use crate::services::llm::MockMisconceptionClassifier;
    use crate::storage::MemoryStorage;
    use crate::types::{CognitiveTrait, Difficulty, Severity};

    fn question() -> QuestionInfo {
        QuestionInfo {
            id: "q1".to_string(),
            text: "Which object hits the ground first?".to_string(),
            correct_option: "Both together".to_string(),
            options: vec!["The heavy one".to_string(), "Both together".to_string()],
            traits_targeted: vec![],
            requires_calculation: false,
            difficulty: Difficulty::Medium,
            misconception_target: None,
            topic: Some("gravity".to_string()),
        }
    }

    fn wrong_answer() -> QuizResponseEvent {
        QuizResponseEvent {
            question_id: "q1".to_string(),
            selected_option: "The heavy one".to_string(),
            is_correct: false,
            confidence: 0.8,
            reasoning: Some("Heavier things have more gravity so they fall faster".to_string()),
        }
    }

    fn discovery(confidence: f32) -> DiscoveredMisconception {
        DiscoveredMisconception {
            misconception_text: "Thinks heavier objects fall faster".to_string(),
            topic: "gravity".to_string(),
            confidence,
            evidence: "more gravity so they fall faster".to_string(),
            severity: Severity::High,
            related_trait: Some(CognitiveTrait::PatternRecognition),
            suggested_remediation: None,
        }
    }

    async fn tracker_with(
        classifier: MockMisconceptionClassifier,
    ) -> (MisconceptionTracker, Arc<MemoryStorage>, LearnerId) {
        let storage = Arc::new(MemoryStorage::new());
        let learner = LearnerId::new();
        storage.create_learner(learner).await.unwrap();

        let tracker = MisconceptionTracker::new(
            storage.clone(),
            Arc::new(classifier),
            EngineConfig::default(),
        );
        (tracker, storage, learner)
    }

    #[tokio::test]
    async fn test_new_detection_creates_active_record() {
        let mut classifier = MockMisconceptionClassifier::new();
        classifier
            .expect_extract_misconception()
            .returning(|_, _, _, _| Ok(Some(discovery(0.9))));

        let (tracker, _, learner) = tracker_with(classifier).await;

        let outcome = tracker
            .detect_and_record(learner, &wrong_answer(), &question(), "gravity")
            .await
            .unwrap()
            .unwrap();

        assert!(outcome.newly_created);
        assert_eq!(outcome.personal.frequency, 1);
        assert_eq!(outcome.personal.correct_streak, 0);
        assert!(outcome.personal.is_active());
    }

    #[tokio::test]
    async fn test_redetection_is_a_relapse() {
        let mut classifier = MockMisconceptionClassifier::new();
        classifier
            .expect_extract_misconception()
            .returning(|_, _, _, _| Ok(Some(discovery(0.9))));

        let (tracker, _, learner) = tracker_with(classifier).await;

        let first = tracker
            .detect_and_record(learner, &wrong_answer(), &question(), "gravity")
            .await
            .unwrap()
            .unwrap();
        let second = tracker
            .detect_and_record(learner, &wrong_answer(), &question(), "gravity")
            .await
            .unwrap()
            .unwrap();

        assert!(!second.newly_created);
        assert_eq!(second.personal.id, first.personal.id);
        assert_eq!(second.personal.frequency, 2);
        assert_eq!(second.personal.correct_streak, 0);
    }

    #[tokio::test]
    async fn test_confidence_floor_filters_detection() {
        let mut classifier = MockMisconceptionClassifier::new();
        classifier
            .expect_extract_misconception()
            .returning(|_, _, _, _| Ok(Some(discovery(0.5))));

        let (tracker, _, learner) = tracker_with(classifier).await;

        let outcome = tracker
            .detect_and_record(learner, &wrong_answer(), &question(), "gravity")
            .await
            .unwrap();
        assert!(outcome.is_none());
    }

    #[tokio::test]
    async fn test_classifier_failure_degrades_to_none() {
        let mut classifier = MockMisconceptionClassifier::new();
        classifier
            .expect_extract_misconception()
            .returning(|_, _, _, _| Err(MetisError::LlmApi("timeout".to_string())));

        let (tracker, _, learner) = tracker_with(classifier).await;

        let outcome = tracker
            .detect_and_record(learner, &wrong_answer(), &question(), "gravity")
            .await
            .unwrap();
        assert!(outcome.is_none());
    }

    #[tokio::test]
    async fn test_null_classification_records_nothing() {
        let mut classifier = MockMisconceptionClassifier::new();
        classifier
            .expect_extract_misconception()
            .returning(|_, _, _, _| Ok(None));

        let (tracker, storage, learner) = tracker_with(classifier).await;

        let outcome = tracker
            .detect_and_record(learner, &wrong_answer(), &question(), "gravity")
            .await
            .unwrap();
        assert!(outcome.is_none());

        let all = storage
            .list_personal_misconceptions(learner, None, false)
            .await
            .unwrap();
        assert!(all.is_empty());
    }

    #[tokio::test]
    async fn test_full_lifecycle_resolve_then_relapse() {
        let mut classifier = MockMisconceptionClassifier::new();
        classifier
            .expect_extract_misconception()
            .returning(|_, _, _, _| Ok(Some(discovery(0.9))));

        let (tracker, _, learner) = tracker_with(classifier).await;

        let created = tracker
            .detect_and_record(learner, &wrong_answer(), &question(), "gravity")
            .await
            .unwrap()
            .unwrap();
        let id = created.personal.id;

        // Three consecutive correct answers resolve the misconception
        for expected_resolved in [false, false, true] {
            let update = tracker.record_correct(learner, id).await.unwrap().unwrap();
            assert_eq!(update.resolved_now, expected_resolved);
        }

        // A subsequent re-detection relapses with frequency bump
        let relapse = tracker
            .detect_and_record(learner, &wrong_answer(), &question(), "gravity")
            .await
            .unwrap()
            .unwrap();
        assert!(!relapse.newly_created);
        assert_eq!(relapse.personal.frequency, 2);
        assert_eq!(relapse.personal.correct_streak, 0);
        assert!(relapse.personal.is_active());
    }

    #[tokio::test]
    async fn test_incorrect_resets_streak() {
        let mut classifier = MockMisconceptionClassifier::new();
        classifier
            .expect_extract_misconception()
            .returning(|_, _, _, _| Ok(Some(discovery(0.9))));

        let (tracker, _, learner) = tracker_with(classifier).await;

        let created = tracker
            .detect_and_record(learner, &wrong_answer(), &question(), "gravity")
            .await
            .unwrap()
            .unwrap();
        let id = created.personal.id;

        tracker.record_correct(learner, id).await.unwrap();
        tracker.record_correct(learner, id).await.unwrap();

        let after_miss = tracker
            .record_incorrect(learner, id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(after_miss.correct_streak, 0);
        assert!(after_miss.is_active());
    }

    #[tokio::test]
    async fn test_progress_rollup() {
        let mut classifier = MockMisconceptionClassifier::new();
        classifier
            .expect_extract_misconception()
            .returning(|_, _, _, _| Ok(Some(discovery(0.9))));

        let (tracker, _, learner) = tracker_with(classifier).await;

        let created = tracker
            .detect_and_record(learner, &wrong_answer(), &question(), "gravity")
            .await
            .unwrap()
            .unwrap();
        for _ in 0..3 {
            tracker
                .record_correct(learner, created.personal.id)
                .await
                .unwrap();
        }

        let progress = tracker.progress(learner, "gravity").await.unwrap();
        assert_eq!(progress.total_misconceptions, 1);
        assert_eq!(progress.resolved_misconceptions, 1);
        assert_eq!(progress.active_misconceptions, 0);
        assert!((progress.resolution_rate - 1.0).abs() < f32::EPSILON);
    }
}
