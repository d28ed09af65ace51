//! The trait and misconception engine
//!
//! `TraitEngine` is the facade the host application calls once per quiz
//! submission. Collaborators (storage, classifier, embedder) are injected at
//! construction so tests can substitute fakes.
//!
//! Within one submission, misconception detection runs before the trait
//! update (the update consumes detection flags); the promotion check runs
//! post-hoc and never blocks or fails the submission.

pub mod evidence;
pub mod promotion;
pub mod tracker;
pub mod update;

use crate::analysis::{self, ReasoningAnalyzer};
use crate::config::MetisConfig;
use crate::embeddings::EmbeddingService;
use crate::error::{MetisError, Result};
use crate::services::MisconceptionClassifier;
use crate::storage::StorageBackend;
use crate::types::{LearnerId, QuestionInfo, QuizResponseEvent};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub use evidence::{EvidenceComponents, EvidenceSample, MisconceptionFlag};
pub use promotion::{PromotionDecision, PromotionPipeline, RejectReason};
pub use tracker::{DetectionOutcome, MisconceptionTracker, ResolutionUpdate};
pub use update::{EvidenceLogEntry, TraitDiagnostic, TraitUpdateOutcome, UpdateMethod};

/// Everything one submission produced, for the caller to render or export
#[derive(Debug)]
pub struct SubmissionOutcome {
    /// Global trait update (vector, diagnostics, evidence log)
    pub traits: TraitUpdateOutcome,

    /// Per-topic trait update, when a topic was supplied
    pub topic_traits: Option<TraitUpdateOutcome>,

    /// Misconceptions detected and recorded this submission
    pub detections: Vec<DetectionOutcome>,

    /// Streak updates on targeted misconceptions
    pub resolutions: Vec<ResolutionUpdate>,

    /// Promotion decisions for newly created misconceptions
    pub promotions: Vec<PromotionDecision>,
}

/// Adaptive cognitive trait and misconception modeling engine
pub struct TraitEngine {
    storage: Arc<dyn StorageBackend>,
    tracker: MisconceptionTracker,
    promotion: PromotionPipeline,
    analyzer: Box<dyn ReasoningAnalyzer>,
}

impl TraitEngine {
    /// Construct the engine with injected collaborators
    pub fn new(
        storage: Arc<dyn StorageBackend>,
        classifier: Arc<dyn MisconceptionClassifier>,
        embedder: Arc<dyn EmbeddingService>,
        config: MetisConfig,
    ) -> Self {
        let analyzer = analysis::select(
            config.engine.analyzer,
            config.engine.min_reasoning_words,
        );
        info!("Trait engine initialized (analyzer: {})", analyzer.name());

        Self {
            tracker: MisconceptionTracker::new(
                storage.clone(),
                classifier,
                config.engine.clone(),
            ),
            promotion: PromotionPipeline::new(
                storage.clone(),
                embedder,
                config.engine.clone(),
            ),
            storage,
            analyzer,
        }
    }

    /// Process one quiz submission end to end
    ///
    /// Fans out to misconception detection first, then updates the global
    /// (and per-topic) trait vectors consuming the detection flags, then
    /// runs promotion checks for newly recorded misconceptions.
    ///
    /// The only surfaced failure is `LearnerNotFound`: enrichment-service
    /// unavailability always degrades to neutral defaults and the caller
    /// still receives an updated (possibly unchanged) trait vector.
    pub async fn process_submission(
        &self,
        learner: LearnerId,
        subject: &str,
        topic: Option<&str>,
        events: &[QuizResponseEvent],
        questions: &[QuestionInfo],
    ) -> Result<SubmissionOutcome> {
        if !self.storage.learner_exists(learner).await? {
            return Err(MetisError::LearnerNotFound(learner.to_string()));
        }

        let question_map: HashMap<&str, &QuestionInfo> =
            questions.iter().map(|q| (q.id.as_str(), q)).collect();

        // Phase 1: misconception detection and streak bookkeeping. Trait
        // updates consume the flags gathered here.
        let mut detections = Vec::new();
        let mut resolutions = Vec::new();
        let mut flags: HashMap<String, MisconceptionFlag> = HashMap::new();

        for event in events {
            let Some(question) = question_map.get(event.question_id.as_str()) else {
                warn!(
                    "Submission references unknown question {}, skipping",
                    event.question_id
                );
                continue;
            };

            let event_topic = question
                .topic
                .as_deref()
                .or(topic)
                .unwrap_or("general");

            if event.is_correct {
                if let Some(target) = question.misconception_target {
                    if let Some(update) = self.tracker.record_correct(learner, target).await? {
                        resolutions.push(update);
                    }
                }
                continue;
            }

            // Incorrect: a targeted miss resets the streak on its record
            if let Some(target) = question.misconception_target {
                self.tracker.record_incorrect(learner, target).await?;
            }

            if let Some(outcome) = self
                .tracker
                .detect_and_record(learner, event, question, event_topic)
                .await?
            {
                flags.insert(
                    event.question_id.clone(),
                    MisconceptionFlag {
                        confidence: outcome.discovered.confidence,
                        affected_traits: outcome
                            .discovered
                            .related_trait
                            .into_iter()
                            .collect(),
                    },
                );
                detections.push(outcome);
            }
        }

        // Phase 2: trait updates, global then per-topic
        let current = self.storage.get_trait_vector(learner).await?;
        let traits = update::update_traits(
            &current,
            events,
            questions,
            self.analyzer.as_ref(),
            &flags,
        );
        self.storage.put_trait_vector(learner, &traits.traits).await?;

        let topic_traits = match topic {
            Some(topic) => {
                let current = self.storage.get_topic_trait_vector(learner, topic).await?;
                let outcome = update::update_traits(
                    &current,
                    events,
                    questions,
                    self.analyzer.as_ref(),
                    &flags,
                );
                self.storage
                    .put_topic_trait_vector(learner, topic, &outcome.traits)
                    .await?;
                Some(outcome)
            }
            None => None,
        };

        // Phase 3: post-hoc promotion checks for fresh misconceptions
        let mut promotions = Vec::new();
        for detection in detections.iter().filter(|d| d.newly_created) {
            let decision = self
                .promotion
                .check_and_promote(
                    &detection.personal.misconception_text,
                    &detection.personal.topic,
                    subject,
                )
                .await;
            promotions.push(decision);
        }

        debug!(
            "Submission processed for learner {}: {} events, {} detections, {} promotions",
            learner,
            events.len(),
            detections.len(),
            promotions.iter().filter(|p| p.promoted).count()
        );

        Ok(SubmissionOutcome {
            traits,
            topic_traits,
            detections,
            resolutions,
            promotions,
        })
    }

    /// The tracker, for catalogue queries and targeted-question bookkeeping
    pub fn tracker(&self) -> &MisconceptionTracker {
        &self.tracker
    }

    /// The promotion pipeline, for standalone candidate checks
    pub fn promotion(&self) -> &PromotionPipeline {
        &self.promotion
    }
}
