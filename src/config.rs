//! Configuration for the Metis engine
//!
//! Aggregates LLM, embedding, and engine tuning parameters into a single
//! deserializable config, loadable from a TOML file with `METIS_`-prefixed
//! environment variable overrides.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Configuration for the LLM classifier/scorer service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Anthropic API key
    #[serde(default = "default_api_key")]
    pub api_key: String,

    /// Model to use
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Max tokens for responses
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    /// Temperature for sampling (low, for consistent analysis)
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_api_key() -> String {
    env::var("ANTHROPIC_API_KEY").unwrap_or_default()
}

fn default_llm_model() -> String {
    "claude-3-5-haiku-20241022".to_string()
}

fn default_max_tokens() -> usize {
    1024
}

fn default_temperature() -> f32 {
    0.2
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: default_api_key(),
            model: default_llm_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

/// Configuration for embedding generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Model name (fastembed model for local, Voyage model for remote)
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Cache directory for downloaded local models
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    /// Show download progress when fetching a local model
    #[serde(default)]
    pub show_download_progress: bool,

    /// Batch size for bulk embedding requests
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// API key for the remote embedding provider (Voyage AI)
    #[serde(default)]
    pub api_key: Option<String>,
}

fn default_embedding_model() -> String {
    "all-MiniLM-L6-v2".to_string()
}

fn default_batch_size() -> usize {
    32
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            cache_dir: None,
            show_download_progress: false,
            batch_size: default_batch_size(),
            api_key: None,
        }
    }
}

impl EmbeddingConfig {
    /// Supported local model names and their dimensions
    const LOCAL_MODELS: [(&'static str, usize); 5] = [
        ("all-MiniLM-L6-v2", 384),
        ("all-MiniLM-L12-v2", 384),
        ("bge-small-en-v1.5", 384),
        ("bge-base-en-v1.5", 768),
        ("nomic-embed-text-v1.5", 768),
    ];

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(crate::error::MetisError::Validation(
                "batch_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Embedding dimensionality for the configured local model
    pub fn dimensions(&self) -> usize {
        Self::LOCAL_MODELS
            .iter()
            .find(|(name, _)| *name == self.model)
            .map(|(_, dims)| *dims)
            .unwrap_or(384)
    }
}

/// Which reasoning analysis strategy to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalyzerKind {
    /// Lexical-structure analysis (sentence complexity, clause density)
    Linguistic,

    /// Keyword/regex marker matching
    Heuristic,
}

impl Default for AnalyzerKind {
    fn default() -> Self {
        AnalyzerKind::Linguistic
    }
}

/// Tuning parameters for the trait and misconception engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Consecutive correct answers needed to resolve a misconception
    #[serde(default = "default_resolution_threshold")]
    pub resolution_threshold: u32,

    /// Minimum classifier confidence for persisting a detection
    #[serde(default = "default_confidence_floor")]
    pub classifier_confidence_floor: f32,

    /// Similarity at or above which a promotion candidate is a duplicate
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,

    /// Minimum distinct learners required for promotion
    #[serde(default = "default_frequency_threshold")]
    pub frequency_threshold: usize,

    /// Reasoning texts below this word count score a flat 0.3
    #[serde(default = "default_min_reasoning_words")]
    pub min_reasoning_words: usize,

    /// Reasoning analysis strategy
    #[serde(default)]
    pub analyzer: AnalyzerKind,
}

fn default_resolution_threshold() -> u32 {
    3
}

fn default_confidence_floor() -> f32 {
    0.6
}

fn default_similarity_threshold() -> f32 {
    0.85
}

fn default_frequency_threshold() -> usize {
    3
}

fn default_min_reasoning_words() -> usize {
    5
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            resolution_threshold: default_resolution_threshold(),
            classifier_confidence_floor: default_confidence_floor(),
            similarity_threshold: default_similarity_threshold(),
            frequency_threshold: default_frequency_threshold(),
            min_reasoning_words: default_min_reasoning_words(),
            analyzer: AnalyzerKind::default(),
        }
    }
}

/// Top-level Metis configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetisConfig {
    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub engine: EngineConfig,
}

impl MetisConfig {
    /// Load configuration from a TOML file plus `METIS_` environment overrides
    ///
    /// Environment variables use `__` as the section separator, e.g.
    /// `METIS_ENGINE__FREQUENCY_THRESHOLD=5`.
    pub fn from_file(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("METIS").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Load configuration from environment overrides only
    pub fn from_env() -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::Environment::with_prefix("METIS").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
