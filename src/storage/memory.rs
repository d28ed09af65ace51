//! In-memory storage backend
//!
//! Reference implementation of `StorageBackend` over `tokio::sync::RwLock`
//! maps. Serves as the test backend and as the store for single-process
//! deployments where the host application handles durability itself.
//!
//! Cross-learner frequency lookups are answered from an inverted index
//! (lowercased misconception text -> learner set) maintained incrementally
//! on every upsert, instead of scanning every learner's catalogue per
//! promotion check.

use crate::embeddings::cosine_similarity;
use crate::error::{MetisError, Result};
use crate::storage::StorageBackend;
use crate::types::{
    GlobalMisconceptionRecord, LearnerId, MisconceptionId, PersonalMisconception, TraitVector,
};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Default)]
struct LearnerRecord {
    traits: TraitVector,
    topic_traits: HashMap<String, TraitVector>,
    misconceptions: HashMap<MisconceptionId, PersonalMisconception>,
}

#[derive(Default)]
struct Inner {
    learners: HashMap<LearnerId, LearnerRecord>,
    global: Vec<GlobalMisconceptionRecord>,
    /// Lowercased misconception text -> learners who have demonstrated it
    text_index: HashMap<String, HashSet<LearnerId>>,
}

/// In-memory storage backend
#[derive(Default)]
pub struct MemoryStorage {
    inner: RwLock<Inner>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StorageBackend for MemoryStorage {
    async fn create_learner(&self, learner: LearnerId) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.learners.entry(learner).or_default();
        Ok(())
    }

    async fn learner_exists(&self, learner: LearnerId) -> Result<bool> {
        let inner = self.inner.read().await;
        Ok(inner.learners.contains_key(&learner))
    }

    async fn get_trait_vector(&self, learner: LearnerId) -> Result<TraitVector> {
        let inner = self.inner.read().await;
        inner
            .learners
            .get(&learner)
            .map(|r| r.traits.clone())
            .ok_or_else(|| MetisError::LearnerNotFound(learner.to_string()))
    }

    async fn put_trait_vector(&self, learner: LearnerId, vector: &TraitVector) -> Result<()> {
        let mut inner = self.inner.write().await;
        let record = inner
            .learners
            .get_mut(&learner)
            .ok_or_else(|| MetisError::LearnerNotFound(learner.to_string()))?;
        record.traits = vector.clone();
        Ok(())
    }

    async fn get_topic_trait_vector(
        &self,
        learner: LearnerId,
        topic: &str,
    ) -> Result<TraitVector> {
        let inner = self.inner.read().await;
        let record = inner
            .learners
            .get(&learner)
            .ok_or_else(|| MetisError::LearnerNotFound(learner.to_string()))?;
        Ok(record
            .topic_traits
            .get(topic)
            .cloned()
            .unwrap_or_default())
    }

    async fn put_topic_trait_vector(
        &self,
        learner: LearnerId,
        topic: &str,
        vector: &TraitVector,
    ) -> Result<()> {
        let mut inner = self.inner.write().await;
        let record = inner
            .learners
            .get_mut(&learner)
            .ok_or_else(|| MetisError::LearnerNotFound(learner.to_string()))?;
        record.topic_traits.insert(topic.to_string(), vector.clone());
        Ok(())
    }

    async fn upsert_personal_misconception(
        &self,
        learner: LearnerId,
        misconception: &PersonalMisconception,
    ) -> Result<()> {
        let mut inner = self.inner.write().await;
        if !inner.learners.contains_key(&learner) {
            return Err(MetisError::LearnerNotFound(learner.to_string()));
        }

        let key = misconception.misconception_text.to_lowercase();
        inner.text_index.entry(key).or_default().insert(learner);

        let record = inner
            .learners
            .get_mut(&learner)
            .ok_or_else(|| MetisError::LearnerNotFound(learner.to_string()))?;
        record
            .misconceptions
            .insert(misconception.id, misconception.clone());

        debug!(
            "Upserted misconception {} for learner {}",
            misconception.id, learner
        );
        Ok(())
    }

    async fn get_personal_misconception(
        &self,
        learner: LearnerId,
        id: MisconceptionId,
    ) -> Result<Option<PersonalMisconception>> {
        let inner = self.inner.read().await;
        Ok(inner
            .learners
            .get(&learner)
            .and_then(|r| r.misconceptions.get(&id))
            .cloned())
    }

    async fn find_personal_misconception_by_text(
        &self,
        learner: LearnerId,
        topic: &str,
        text: &str,
    ) -> Result<Option<PersonalMisconception>> {
        let inner = self.inner.read().await;
        let needle = text.to_lowercase();
        Ok(inner.learners.get(&learner).and_then(|r| {
            r.misconceptions
                .values()
                .find(|m| {
                    m.topic == topic && m.misconception_text.to_lowercase() == needle
                })
                .cloned()
        }))
    }

    async fn list_personal_misconceptions(
        &self,
        learner: LearnerId,
        topic: Option<&str>,
        only_unresolved: bool,
    ) -> Result<Vec<PersonalMisconception>> {
        let inner = self.inner.read().await;
        let record = inner
            .learners
            .get(&learner)
            .ok_or_else(|| MetisError::LearnerNotFound(learner.to_string()))?;

        let mut result: Vec<PersonalMisconception> = record
            .misconceptions
            .values()
            .filter(|m| topic.map_or(true, |t| m.topic == t))
            .filter(|m| !only_unresolved || !m.resolved)
            .cloned()
            .collect();

        result.sort_by(|a, b| b.last_occurrence.cmp(&a.last_occurrence));
        Ok(result)
    }

    async fn count_learners_with_misconception(&self, text: &str) -> Result<usize> {
        let inner = self.inner.read().await;
        let needle = text.to_lowercase();

        // Substring semantics: a stored text containing the candidate counts
        let mut learners: HashSet<LearnerId> = HashSet::new();
        for (stored, ids) in &inner.text_index {
            if stored.contains(&needle) {
                learners.extend(ids.iter().copied());
            }
        }
        Ok(learners.len())
    }

    async fn nearest_global_misconceptions(
        &self,
        embedding: &[f32],
        subject: Option<&str>,
        limit: usize,
    ) -> Result<Vec<(GlobalMisconceptionRecord, f32)>> {
        let inner = self.inner.read().await;

        let mut scored: Vec<(GlobalMisconceptionRecord, f32)> = inner
            .global
            .iter()
            .filter(|r| subject.map_or(true, |s| r.subject.eq_ignore_ascii_case(s)))
            .map(|r| (r.clone(), cosine_similarity(embedding, &r.embedding)))
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);
        Ok(scored)
    }

    async fn insert_global_misconception(
        &self,
        record: &GlobalMisconceptionRecord,
    ) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.global.push(record.clone());
        debug!(
            "Appended global misconception '{}' ({})",
            record.misconception_text, record.id
        );
        Ok(())
    }
}
