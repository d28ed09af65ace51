//! Shared fakes and builders for integration tests

use async_trait::async_trait;
use metis_core::embeddings::EmbeddingService;
use metis_core::services::MisconceptionClassifier;
use metis_core::types::{
    CognitiveTrait, Difficulty, DiscoveredMisconception, QuestionInfo, QuizResponseEvent,
    Severity,
};
use metis_core::{MetisError, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Programmable misconception classifier
///
/// Returns the discovery registered for a question ID, `None` otherwise.
/// Flip `fail` to simulate an unavailable classification service.
#[derive(Default)]
pub struct FakeClassifier {
    responses: Mutex<HashMap<String, DiscoveredMisconception>>,
    fail: AtomicBool,
}

impl FakeClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(self, question_id: &str, discovered: DiscoveredMisconception) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(question_id.to_string(), discovered);
        self
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl MisconceptionClassifier for FakeClassifier {
    async fn extract_misconception<'a>(
        &self,
        question: &QuestionInfo,
        _selected_option: &str,
        _reasoning: Option<&'a str>,
        _topic: &str,
    ) -> Result<Option<DiscoveredMisconception>> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(MetisError::LlmApi("classifier unavailable".to_string()));
        }
        Ok(self.responses.lock().unwrap().get(&question.id).cloned())
    }
}

/// Deterministic embedder with per-text fixed vectors
///
/// Texts without a registered vector hash to a stable pseudo-embedding, so
/// unrelated texts read as dissimilar without any network dependency.
#[derive(Default)]
pub struct FakeEmbedder {
    fixed: Mutex<HashMap<String, Vec<f32>>>,
}

impl FakeEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_vector(self, text: &str, vector: Vec<f32>) -> Self {
        self.fixed
            .lock()
            .unwrap()
            .insert(text.to_lowercase(), vector);
        self
    }

    fn hashed(text: &str) -> Vec<f32> {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut embedding = vec![0.0f32; 16];
        for word in text.to_lowercase().split_whitespace() {
            let mut hasher = DefaultHasher::new();
            word.hash(&mut hasher);
            let hash = hasher.finish();
            embedding[(hash as usize) % 16] += 1.0;
        }

        let magnitude: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for val in &mut embedding {
                *val /= magnitude;
            }
        }
        embedding
    }
}

#[async_trait]
impl EmbeddingService for FakeEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self
            .fixed
            .lock()
            .unwrap()
            .get(&text.to_lowercase())
            .cloned()
            .unwrap_or_else(|| Self::hashed(text)))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }

    fn dimensions(&self) -> usize {
        16
    }

    fn model_name(&self) -> &str {
        "fake-embedder"
    }
}

/// A precision-tagged calculation question
pub fn precision_question(id: &str, topic: &str) -> QuestionInfo {
    QuestionInfo {
        id: id.to_string(),
        text: "A 2kg mass feels a 10N force. What is its acceleration?".to_string(),
        correct_option: "5 m/s^2".to_string(),
        options: vec!["5 m/s^2".to_string(), "20 m/s^2".to_string()],
        traits_targeted: vec![CognitiveTrait::Precision],
        requires_calculation: true,
        difficulty: Difficulty::Medium,
        misconception_target: None,
        topic: Some(topic.to_string()),
    }
}

/// An untagged conceptual question
pub fn conceptual_question(id: &str, topic: &str) -> QuestionInfo {
    QuestionInfo {
        id: id.to_string(),
        text: "Which object hits the ground first?".to_string(),
        correct_option: "Both together".to_string(),
        options: vec!["The heavy one".to_string(), "Both together".to_string()],
        traits_targeted: vec![],
        requires_calculation: false,
        difficulty: Difficulty::Medium,
        misconception_target: None,
        topic: Some(topic.to_string()),
    }
}

pub fn correct_answer(question: &QuestionInfo, confidence: f32) -> QuizResponseEvent {
    QuizResponseEvent {
        question_id: question.id.clone(),
        selected_option: question.correct_option.clone(),
        is_correct: true,
        confidence,
        reasoning: None,
    }
}

pub fn wrong_answer(question: &QuestionInfo, confidence: f32) -> QuizResponseEvent {
    QuizResponseEvent {
        question_id: question.id.clone(),
        selected_option: question
            .options
            .iter()
            .find(|o| **o != question.correct_option)
            .cloned()
            .unwrap_or_else(|| "wrong".to_string()),
        is_correct: false,
        confidence,
        reasoning: Some("Heavier things have more gravity so they fall faster".to_string()),
    }
}

pub fn falls_faster_discovery() -> DiscoveredMisconception {
    DiscoveredMisconception {
        misconception_text: "Thinks heavier objects fall faster".to_string(),
        topic: "gravity".to_string(),
        confidence: 0.9,
        evidence: "more gravity so they fall faster".to_string(),
        severity: Severity::High,
        related_trait: Some(CognitiveTrait::PatternRecognition),
        suggested_remediation: Some("Revisit free-fall experiments".to_string()),
    }
}
