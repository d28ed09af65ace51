//! Services layer for the Metis engine
//!
//! Provides LLM-backed misconception classification and the legacy
//! assessment scoring path.

pub mod llm;

pub use llm::{AssessmentResponse, LlmService, MisconceptionClassifier};
