//! LLM service for misconception intelligence
//!
//! Provides integration with Claude Haiku for:
//! - Misconception extraction from incorrect quiz responses
//! - Legacy whole-assessment trait scoring
//!
//! Both paths are best-effort enrichments: extraction failures surface as
//! "no misconception detected" to the tracker, and assessment scoring
//! degrades to a neutral trait vector rather than failing the request.

use crate::config::LlmConfig;
use crate::error::{MetisError, Result};
use crate::types::{
    CognitiveTrait, DiscoveredMisconception, QuestionInfo, Severity, TraitVector,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Classifier boundary for misconception extraction
///
/// The engine depends on this trait, not on `LlmService` directly, so tests
/// substitute programmable fakes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MisconceptionClassifier: Send + Sync {
    /// Identify the misconception behind one incorrect response
    ///
    /// Returns `None` when the response looks like a guess rather than a
    /// conceptual error.
    async fn extract_misconception<'a>(
        &self,
        question: &QuestionInfo,
        selected_option: &str,
        reasoning: Option<&'a str>,
        topic: &str,
    ) -> Result<Option<DiscoveredMisconception>>;
}

/// One answer in a legacy onboarding assessment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentResponse {
    pub question_id: String,
    pub answer_text: String,
    #[serde(default)]
    pub confidence: Option<f32>,
}

/// LLM service for misconception and assessment intelligence
pub struct LlmService {
    config: LlmConfig,
    client: reqwest::Client,
    base_url: String,
}

/// Anthropic API message format
#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: usize,
    temperature: f32,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

/// Anthropic API response format
#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    text: String,
}

/// Raw classifier output before validation
#[derive(Debug, Deserialize)]
struct RawMisconception {
    misconception_text: Option<String>,
    confidence: Option<f32>,
    evidence: Option<String>,
    severity: Option<Severity>,
    related_trait: Option<String>,
    suggested_remediation: Option<String>,
}

/// Raw assessment scores keyed by trait name
#[derive(Debug, Deserialize)]
struct RawAssessmentScores {
    precision: Option<f32>,
    confidence: Option<f32>,
    analytical_depth: Option<f32>,
    curiosity: Option<f32>,
    metacognition: Option<f32>,
    cognitive_flexibility: Option<f32>,
    pattern_recognition: Option<f32>,
    attention_consistency: Option<f32>,
}

impl LlmService {
    /// Create a new LLM service with custom config
    pub fn new(config: LlmConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(MetisError::Config(config::ConfigError::Message(
                "ANTHROPIC_API_KEY not set".to_string(),
            )));
        }

        Ok(Self {
            config,
            client: reqwest::Client::new(),
            base_url: "https://api.anthropic.com".to_string(),
        })
    }

    /// Create with default config
    pub fn with_default() -> Result<Self> {
        Self::new(LlmConfig::default())
    }

    /// Override the API base URL (for test doubles)
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    /// Score a whole onboarding assessment into a trait vector
    ///
    /// Legacy path used before per-question evidence accumulation exists for
    /// a learner. Degrades to the neutral vector on any failure: a missing
    /// key, a malformed response, or an API error must never block
    /// onboarding.
    pub async fn score_assessment(&self, responses: &[AssessmentResponse]) -> TraitVector {
        if responses.is_empty() {
            return TraitVector::neutral();
        }

        let context: Vec<String> = responses
            .iter()
            .map(|r| {
                format!(
                    "**Question ID:** {}\n**Answer/Reasoning:** {}\n**Confidence:** {}",
                    r.question_id,
                    r.answer_text,
                    r.confidence
                        .map(|c| format!("{:.2}", c))
                        .unwrap_or_else(|| "Not specified".to_string())
                )
            })
            .collect();

        let prompt = format!(
            r#"You are an expert psychometric analyst specializing in cognitive profiling.

Analyze this learner's assessment responses and score their cognitive signature
across 8 dimensions, each 0.0-1.0 where 0.5 is baseline/neutral:

precision, confidence, analytical_depth, curiosity, metacognition,
cognitive_flexibility, pattern_recognition, attention_consistency

**Assessment Responses:**
{}

Return ONLY valid JSON (no markdown) in this exact format:
{{
  "precision": 0.5,
  "confidence": 0.5,
  "analytical_depth": 0.5,
  "curiosity": 0.5,
  "metacognition": 0.5,
  "cognitive_flexibility": 0.5,
  "pattern_recognition": 0.5,
  "attention_consistency": 0.5
}}
"#,
            context.join("\n---\n")
        );

        let content = match self.call_api(&prompt).await {
            Ok(content) => content,
            Err(e) => {
                warn!("Assessment scoring failed, returning neutral traits: {}", e);
                return TraitVector::neutral();
            }
        };

        let stripped = strip_code_fences(&content);
        let parsed: RawAssessmentScores = match serde_json::from_str(stripped) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(
                    "Assessment scoring returned malformed JSON, returning neutral traits: {}",
                    e
                );
                return TraitVector::neutral();
            }
        };

        let mut traits = TraitVector::neutral();
        let scores = [
            (CognitiveTrait::Precision, parsed.precision),
            (CognitiveTrait::Confidence, parsed.confidence),
            (CognitiveTrait::AnalyticalDepth, parsed.analytical_depth),
            (CognitiveTrait::Curiosity, parsed.curiosity),
            (CognitiveTrait::Metacognition, parsed.metacognition),
            (
                CognitiveTrait::CognitiveFlexibility,
                parsed.cognitive_flexibility,
            ),
            (
                CognitiveTrait::PatternRecognition,
                parsed.pattern_recognition,
            ),
            (
                CognitiveTrait::AttentionConsistency,
                parsed.attention_consistency,
            ),
        ];
        for (t, value) in scores {
            traits.set(t, value.unwrap_or(0.5));
        }

        info!("Scored assessment across {} responses", responses.len());
        traits
    }

    /// Make an API call to Claude
    async fn call_api(&self, prompt: &str) -> Result<String> {
        debug!("Calling Anthropic API");

        let request = AnthropicRequest {
            model: self.config.model.clone(),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(MetisError::Http)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(MetisError::LlmApi(format!(
                "API request failed with status {}: {}",
                status, error_text
            )));
        }

        let api_response: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| MetisError::LlmApi(format!("Failed to parse response: {}", e)))?;

        api_response
            .content
            .first()
            .map(|c| c.text.clone())
            .ok_or_else(|| MetisError::LlmApi("Empty response from API".to_string()))
    }
}

#[async_trait]
impl MisconceptionClassifier for LlmService {
    async fn extract_misconception<'a>(
        &self,
        question: &QuestionInfo,
        selected_option: &str,
        reasoning: Option<&'a str>,
        topic: &str,
    ) -> Result<Option<DiscoveredMisconception>> {
        debug!("Extracting misconception for question {}", question.id);

        let options_line = if question.options.is_empty() {
            String::new()
        } else {
            format!("**ALL OPTIONS:** {}\n", question.options.join(" | "))
        };

        let prompt = format!(
            r#"You are an expert educational psychologist specializing in misconception analysis.

Analyze this student's incorrect response and identify the underlying misconception.

**QUESTION:** {}

**CORRECT ANSWER:** {}

**STUDENT'S ANSWER:** {}

**STUDENT'S REASONING:** {}

**TOPIC:** {}

{}**TASK:**
Identify the core misconception that led the student to choose the wrong answer.

Return ONLY valid JSON (no markdown):
{{
    "misconception_text": "Clear, concise description of the misconception",
    "confidence": 0.8,
    "evidence": "Specific evidence from the reasoning that reveals this misconception",
    "severity": "low" | "medium" | "high" | "critical",
    "related_trait": "Which cognitive trait this affects most (precision, analytical_depth, ...)",
    "suggested_remediation": "Brief suggestion for addressing this misconception"
}}

If the student just guessed or no clear misconception is evident, return {{"misconception_text": null}}
"#,
            question.text,
            question.correct_option,
            selected_option,
            reasoning.unwrap_or("Not provided"),
            topic,
            options_line
        );

        let content = self.call_api(&prompt).await?;
        let stripped = strip_code_fences(&content);

        let raw: RawMisconception = serde_json::from_str(stripped)
            .map_err(|e| MetisError::LlmApi(format!("Malformed classifier JSON: {}", e)))?;

        let text = match raw.misconception_text {
            Some(text) if !text.trim().is_empty() => text,
            _ => {
                info!("No clear misconception identified for topic '{}'", topic);
                return Ok(None);
            }
        };

        let discovered = DiscoveredMisconception {
            misconception_text: text,
            topic: topic.to_string(),
            confidence: raw.confidence.unwrap_or(0.8).clamp(0.0, 1.0),
            evidence: raw
                .evidence
                .unwrap_or_else(|| reasoning.unwrap_or_default().to_string()),
            severity: raw.severity.unwrap_or_default(),
            related_trait: raw
                .related_trait
                .as_deref()
                .and_then(CognitiveTrait::from_name),
            suggested_remediation: raw.suggested_remediation,
        };

        info!(
            "Extracted misconception: '{}' (confidence: {:.2})",
            discovered.misconception_text, discovered.confidence
        );
        Ok(Some(discovered))
    }
}

/// Strip markdown code fences that LLMs often wrap around JSON
fn strip_code_fences(content: &str) -> &str {
    let mut s = content.trim();
    if let Some(rest) = s.strip_prefix("```json") {
        s = rest;
    } else if let Some(rest) = s.strip_prefix("```") {
        s = rest;
    }
    if let Some(rest) = s.strip_suffix("```") {
        s = rest;
    }
    s.trim()
}
