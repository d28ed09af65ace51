//! Novelty and promotion pipeline
//!
//! Decides whether a personally-tracked misconception enters the shared
//! knowledge base. Promotion requires both novelty (not already known) and
//! cross-learner frequency (not an idiosyncratic error): a two-gate quorum
//! over unstructured data.
//!
//! The pipeline never fails a request: external-service errors produce a
//! rejection with reason `error` and the caller moves on.

use crate::config::EngineConfig;
use crate::embeddings::EmbeddingService;
use crate::error::Result;
use crate::storage::StorageBackend;
use crate::types::{GlobalMisconceptionRecord, MisconceptionId};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Why a candidate was not promoted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Too similar to an existing knowledge-base record
    Duplicate,

    /// Too few distinct learners exhibit the misconception
    InsufficientFrequency,

    /// An external service failed; promotion skipped
    Error,
}

/// Outcome of one promotion check, with supporting metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromotionDecision {
    pub promoted: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<RejectReason>,

    /// Similarity to the nearest existing record
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f32>,

    /// Text of the nearest existing record
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similar_to: Option<String>,

    /// Distinct learners exhibiting the candidate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub learner_count: Option<usize>,

    /// 1 - similarity, for promoted candidates
    #[serde(skip_serializing_if = "Option::is_none")]
    pub novelty_score: Option<f32>,

    /// ID of the created record, when promoted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<MisconceptionId>,
}

impl PromotionDecision {
    fn rejected(reason: RejectReason) -> Self {
        Self {
            promoted: false,
            reason: Some(reason),
            similarity: None,
            similar_to: None,
            learner_count: None,
            novelty_score: None,
            record_id: None,
        }
    }
}

/// Two-gate promotion pipeline over the shared knowledge base
pub struct PromotionPipeline {
    storage: Arc<dyn StorageBackend>,
    embedder: Arc<dyn EmbeddingService>,
    config: EngineConfig,
}

impl PromotionPipeline {
    pub fn new(
        storage: Arc<dyn StorageBackend>,
        embedder: Arc<dyn EmbeddingService>,
        config: EngineConfig,
    ) -> Self {
        Self {
            storage,
            embedder,
            config,
        }
    }

    /// Run the novelty and frequency gates for one candidate
    pub async fn check_and_promote(
        &self,
        misconception_text: &str,
        topic: &str,
        subject: &str,
    ) -> PromotionDecision {
        match self
            .try_check_and_promote(misconception_text, topic, subject)
            .await
        {
            Ok(decision) => decision,
            Err(e) => {
                warn!(
                    "Promotion check failed for '{}': {}",
                    misconception_text, e
                );
                PromotionDecision::rejected(RejectReason::Error)
            }
        }
    }

    async fn try_check_and_promote(
        &self,
        misconception_text: &str,
        topic: &str,
        subject: &str,
    ) -> Result<PromotionDecision> {
        let embedding = self.embedder.embed(misconception_text).await?;

        // Gate 1: novelty against the domain-scoped knowledge base
        let (max_similarity, similar_to) = self.nearest_similarity(&embedding, subject).await?;

        if max_similarity >= self.config.similarity_threshold {
            info!(
                "Rejecting duplicate (sim={:.2}): '{}' ~ '{}'",
                max_similarity,
                misconception_text,
                similar_to.as_deref().unwrap_or("n/a")
            );
            return Ok(PromotionDecision {
                similarity: Some(max_similarity),
                similar_to,
                ..PromotionDecision::rejected(RejectReason::Duplicate)
            });
        }

        // Gate 2: distinct-learner frequency across the population
        let learner_count = self
            .storage
            .count_learners_with_misconception(misconception_text)
            .await?;

        if learner_count < self.config.frequency_threshold {
            info!(
                "Rejecting '{}': {} learners < threshold {}",
                misconception_text, learner_count, self.config.frequency_threshold
            );
            return Ok(PromotionDecision {
                similarity: Some(max_similarity),
                learner_count: Some(learner_count),
                ..PromotionDecision::rejected(RejectReason::InsufficientFrequency)
            });
        }

        // Re-check novelty immediately before insert: the frequency scan
        // awaited in between, and the knowledge base is shared.
        let (final_similarity, similar_to) = self.nearest_similarity(&embedding, subject).await?;
        if final_similarity >= self.config.similarity_threshold {
            return Ok(PromotionDecision {
                similarity: Some(final_similarity),
                similar_to,
                ..PromotionDecision::rejected(RejectReason::Duplicate)
            });
        }

        let novelty_score = 1.0 - final_similarity;
        let record = GlobalMisconceptionRecord {
            id: MisconceptionId::new(),
            misconception_text: misconception_text.to_string(),
            subject: subject.to_string(),
            topic: topic.to_string(),
            embedding,
            frequency: learner_count,
            novelty_score,
            added_date: Utc::now(),
        };
        self.storage.insert_global_misconception(&record).await?;

        info!(
            "Promoted to shared knowledge base: '{}' (learners={}, novelty={:.2})",
            misconception_text, learner_count, novelty_score
        );

        Ok(PromotionDecision {
            promoted: true,
            reason: None,
            similarity: Some(final_similarity),
            similar_to: None,
            learner_count: Some(learner_count),
            novelty_score: Some(novelty_score),
            record_id: Some(record.id),
        })
    }

    /// Similarity of the nearest domain-scoped neighbor, if any
    async fn nearest_similarity(
        &self,
        embedding: &[f32],
        subject: &str,
    ) -> Result<(f32, Option<String>)> {
        let neighbors = self
            .storage
            .nearest_global_misconceptions(embedding, Some(subject), 3)
            .await?;

        Ok(neighbors
            .first()
            .map(|(record, similarity)| (*similarity, Some(record.misconception_text.clone())))
            .unwrap_or((0.0, None)))
    }
}
