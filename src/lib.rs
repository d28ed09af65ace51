//! Metis - Adaptive Cognitive Trait & Misconception Modeling Engine
//!
//! A library for maintaining per-learner cognitive profiles used to
//! personalize STEM practice:
//! - Evidence fusion over quiz responses (correctness, calibration,
//!   reasoning quality, misconception penalties)
//! - Per-trait Kalman-style filtering with trait-specific learning rates
//! - Misconception lifecycle tracking (detection, relapse, resolution)
//! - Novelty + cross-learner frequency gating for promotion into a shared
//!   knowledge base
//!
//! # Architecture
//!
//! The engine is a library-style component consumed by request-handling
//! code; its boundary is in-process function calls. Layers:
//! - **Types**: Core data structures (TraitVector, QuizResponseEvent, ...)
//! - **Storage**: The backend abstraction plus an in-memory reference impl
//! - **Services**: LLM-backed misconception classification and scoring
//! - **Analysis**: Reasoning quality strategies (linguistic + heuristic)
//! - **Engine**: Evidence aggregation, trait updates, tracking, promotion
//!
//! # Example
//!
//! ```ignore
//! use metis_core::{LearnerId, MetisConfig, TraitEngine};
//! use metis_core::services::LlmService;
//! use metis_core::embeddings::LocalEmbeddingService;
//! use metis_core::storage::MemoryStorage;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = MetisConfig::from_file("metis.toml")?;
//!     let storage = Arc::new(MemoryStorage::new());
//!     let classifier = Arc::new(LlmService::new(config.llm.clone())?);
//!     let embedder = Arc::new(LocalEmbeddingService::new(config.embedding.clone()).await?);
//!
//!     let engine = TraitEngine::new(storage, classifier, embedder, config);
//!     let outcome = engine
//!         .process_submission(learner, "physics", Some("gravity"), &events, &questions)
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

pub mod analysis;
pub mod config;
pub mod embeddings;
pub mod engine;
pub mod error;
pub mod services;
pub mod storage;
pub mod types;

// Re-export commonly used types
pub use config::{AnalyzerKind, EngineConfig, LlmConfig, MetisConfig};
pub use engine::{SubmissionOutcome, TraitEngine};
pub use error::{MetisError, Result};
pub use services::LlmService;
pub use storage::{MemoryStorage, StorageBackend};
pub use types::{
    CognitiveTrait, DiscoveredMisconception, GlobalMisconceptionRecord, LearnerId,
    MisconceptionId, PersonalMisconception, QuestionInfo, QuizResponseEvent, Severity,
    TraitVector,
};
