//! Local embedding service using fastembed
//!
//! Provides semantic embeddings for misconception text using locally-run
//! models via the fastembed library with ONNX Runtime.
//!
//! Models are automatically downloaded on first use to the cache directory
//! and subsequent runs load from cache.

use crate::config::EmbeddingConfig;
use crate::embeddings::EmbeddingService;
use crate::error::{MetisError, Result};
use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::{Arc, Mutex};
use tokio::task;
use tracing::{debug, info};

/// Local embedding service using fastembed
pub struct LocalEmbeddingService {
    /// The underlying fastembed model (Arc<Mutex> for thread-safe interior mutability)
    model: Arc<Mutex<TextEmbedding>>,
    /// Configuration
    config: EmbeddingConfig,
    /// Cached dimensions
    dimensions: usize,
}

impl LocalEmbeddingService {
    /// Create a new local embedding service with the given configuration
    ///
    /// This will download the model if not already cached (may take 30-120
    /// seconds depending on model size and network speed).
    pub async fn new(config: EmbeddingConfig) -> Result<Self> {
        config.validate()?;

        info!(
            "Initializing local embedding service: model={}, cache={:?}",
            config.model, config.cache_dir
        );

        let embedding_model = Self::model_name_to_enum(&config.model)?;

        let show_progress = config.show_download_progress;
        let cache_dir = config.cache_dir.clone();
        let mut init_options = InitOptions::default();
        init_options.model_name = embedding_model;
        init_options.show_download_progress = show_progress;
        if let Some(dir) = cache_dir {
            init_options.cache_dir = dir;
        }

        // Load model in blocking task (may download if not cached)
        let model = task::spawn_blocking(move || TextEmbedding::try_new(init_options))
            .await
            .map_err(|e| MetisError::Other(format!("Task join error: {}", e)))?
            .map_err(|e| MetisError::Embedding(format!("Failed to load model: {}", e)))?;

        let dimensions = config.dimensions();

        info!(
            "Local embedding service initialized successfully: {} dimensions",
            dimensions
        );

        Ok(Self {
            model: Arc::new(Mutex::new(model)),
            config,
            dimensions,
        })
    }

    /// Map model name string to fastembed's EmbeddingModel enum
    fn model_name_to_enum(model_name: &str) -> Result<EmbeddingModel> {
        match model_name {
            "all-MiniLM-L6-v2" => Ok(EmbeddingModel::AllMiniLML6V2),
            "all-MiniLM-L12-v2" => Ok(EmbeddingModel::AllMiniLML12V2),
            "bge-small-en-v1.5" => Ok(EmbeddingModel::BGESmallENV15),
            "bge-base-en-v1.5" => Ok(EmbeddingModel::BGEBaseENV15),
            "nomic-embed-text-v1.5" => Ok(EmbeddingModel::NomicEmbedTextV15),
            _ => Err(MetisError::Config(config::ConfigError::Message(format!(
                "Unsupported model: '{}'. See EmbeddingConfig for supported models.",
                model_name
            )))),
        }
    }

    /// Embed a batch of texts in a blocking task
    ///
    /// fastembed's embed function is synchronous, so it runs inside a Tokio
    /// blocking task.
    async fn embed_batch_internal(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Embedding batch of {} texts", texts.len());

        let model = Arc::clone(&self.model);
        let dimensions = self.dimensions;

        let embeddings = task::spawn_blocking(move || {
            let mut model_guard = model
                .lock()
                .map_err(|e| format!("Mutex lock failed: {}", e))?;

            model_guard
                .embed(texts, None)
                .map_err(|e| format!("Embedding generation failed: {}", e))
        })
        .await
        .map_err(|e| MetisError::Other(format!("Task join error: {}", e)))?
        .map_err(MetisError::Embedding)?;

        for (i, embedding) in embeddings.iter().enumerate() {
            if embedding.len() != dimensions {
                return Err(MetisError::Embedding(format!(
                    "Embedding {} has wrong dimensions: expected {}, got {}",
                    i,
                    dimensions,
                    embedding.len()
                )));
            }
        }

        Ok(embeddings)
    }
}

#[async_trait]
impl EmbeddingService for LocalEmbeddingService {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.is_empty() {
            return Err(MetisError::Validation("Text cannot be empty".to_string()));
        }

        let texts = vec![text.to_string()];
        let mut embeddings = self.embed_batch_internal(texts).await?;

        embeddings
            .pop()
            .ok_or_else(|| MetisError::Embedding("No embedding returned".to_string()))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        for (i, text) in texts.iter().enumerate() {
            if text.is_empty() {
                return Err(MetisError::Validation(format!(
                    "Text at index {} cannot be empty",
                    i
                )));
            }
        }

        let texts_owned: Vec<String> = texts.iter().map(|s| s.to_string()).collect();

        // Process in batches based on config
        let batch_size = self.config.batch_size;
        let mut all_embeddings = Vec::new();

        for chunk in texts_owned.chunks(batch_size) {
            let chunk_embeddings = self.embed_batch_internal(chunk.to_vec()).await?;
            all_embeddings.extend(chunk_embeddings);
        }

        Ok(all_embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}
