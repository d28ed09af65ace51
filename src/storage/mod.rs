//! Storage layer for the Metis engine
//!
//! Provides the abstraction the engine reads and writes through: trait
//! vectors keyed by learner (and optionally topic), personal misconception
//! catalogues, and the shared append-only misconception knowledge base.
//!
//! The engine treats storage as a key-value/document abstraction; durable
//! backends are a host-application concern. `MemoryStorage` is the reference
//! implementation used in tests and single-process deployments.

pub mod memory;

use crate::error::Result;
use crate::types::{
    GlobalMisconceptionRecord, LearnerId, MisconceptionId, PersonalMisconception, TraitVector,
};
use async_trait::async_trait;

pub use memory::MemoryStorage;

/// Storage backend trait defining all required operations
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Register a learner with a neutral trait vector
    async fn create_learner(&self, learner: LearnerId) -> Result<()>;

    /// Whether a learner record exists
    async fn learner_exists(&self, learner: LearnerId) -> Result<bool>;

    /// Fetch a learner's global trait vector
    ///
    /// Fails with `LearnerNotFound` for unknown learners.
    async fn get_trait_vector(&self, learner: LearnerId) -> Result<TraitVector>;

    /// Store a learner's global trait vector
    async fn put_trait_vector(&self, learner: LearnerId, vector: &TraitVector) -> Result<()>;

    /// Fetch a learner's per-topic trait vector
    ///
    /// Returns the neutral vector when the learner exists but has no vector
    /// for this topic yet.
    async fn get_topic_trait_vector(
        &self,
        learner: LearnerId,
        topic: &str,
    ) -> Result<TraitVector>;

    /// Store a learner's per-topic trait vector
    async fn put_topic_trait_vector(
        &self,
        learner: LearnerId,
        topic: &str,
        vector: &TraitVector,
    ) -> Result<()>;

    /// Insert or replace a personal misconception record
    async fn upsert_personal_misconception(
        &self,
        learner: LearnerId,
        misconception: &PersonalMisconception,
    ) -> Result<()>;

    /// Fetch one personal misconception by ID
    async fn get_personal_misconception(
        &self,
        learner: LearnerId,
        id: MisconceptionId,
    ) -> Result<Option<PersonalMisconception>>;

    /// Find a personal misconception by case-insensitive text match within a
    /// topic
    async fn find_personal_misconception_by_text(
        &self,
        learner: LearnerId,
        topic: &str,
        text: &str,
    ) -> Result<Option<PersonalMisconception>>;

    /// List a learner's personal misconceptions, optionally filtered by
    /// topic and resolution state
    async fn list_personal_misconceptions(
        &self,
        learner: LearnerId,
        topic: Option<&str>,
        only_unresolved: bool,
    ) -> Result<Vec<PersonalMisconception>>;

    /// Count distinct learners whose catalogue contains a case-insensitive
    /// text match for `text`, across the whole population
    async fn count_learners_with_misconception(&self, text: &str) -> Result<usize>;

    /// Nearest neighbors in the global knowledge base, optionally filtered
    /// by subject/domain, with cosine similarity per record
    async fn nearest_global_misconceptions(
        &self,
        embedding: &[f32],
        subject: Option<&str>,
        limit: usize,
    ) -> Result<Vec<(GlobalMisconceptionRecord, f32)>>;

    /// Append a record to the global knowledge base
    async fn insert_global_misconception(
        &self,
        record: &GlobalMisconceptionRecord,
    ) -> Result<()>;
}
