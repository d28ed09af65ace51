//! Evidence aggregation
//!
//! Fuses correctness, confidence calibration, reasoning quality, and
//! misconception penalties into one normalized evidence sample per
//! (response, trait) pair. Samples are ephemeral: recomputed each update
//! cycle, never persisted.

use crate::analysis::ReasoningAnalyzer;
use crate::types::{CognitiveTrait, QuizResponseEvent};
use serde::{Deserialize, Serialize};

/// Scale factor for confidence-weighted misconception penalties
const MISCONCEPTION_PENALTY_FACTOR: f32 = 0.15;

/// A detected misconception's influence on evidence for one response
#[derive(Debug, Clone)]
pub struct MisconceptionFlag {
    /// Classifier confidence in the detection (0-1)
    pub confidence: f32,

    /// Traits the misconception is judged to affect
    pub affected_traits: Vec<CognitiveTrait>,
}

/// Per-source breakdown of an evidence sample, for audit/export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceComponents {
    pub correctness: f32,
    pub calibration: f32,

    /// Absent when the learner supplied no reasoning text
    pub reasoning: Option<f32>,

    /// Confidence-scaled misconception penalty subtracted from the numerator
    pub penalty: f32,
}

/// Normalized evidence for one (response, trait) pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceSample {
    /// Score in [0, 1]
    pub score: f32,

    /// Total weight (> 0 whenever correctness contributes)
    pub weight: f32,

    pub components: EvidenceComponents,
}

/// Gather evidence for one trait from one quiz response
///
/// Weighted sum normalized by total weight. The reasoning term is omitted
/// entirely (weight included) when no reasoning text was supplied; the
/// misconception penalty applies only to incorrect responses whose detected
/// misconception affects the target trait.
pub fn gather_evidence(
    event: &QuizResponseEvent,
    target: CognitiveTrait,
    analyzer: &dyn ReasoningAnalyzer,
    flag: Option<&MisconceptionFlag>,
) -> EvidenceSample {
    let mut weighted_sum = 0.0f32;
    let mut total_weight = 0.0f32;

    // 1. Correctness evidence (weight 1.0)
    let correctness = if event.is_correct { 1.0 } else { 0.0 };
    weighted_sum += correctness * 1.0;
    total_weight += 1.0;

    // 2. Confidence calibration: 1 - |confidence - accuracy|, weighted
    //    higher for calibration-sensitive traits
    let confidence = event.confidence.clamp(0.0, 1.0);
    let calibration = 1.0 - (confidence - correctness).abs();
    let calibration_weight = match target {
        CognitiveTrait::Confidence | CognitiveTrait::Metacognition | CognitiveTrait::Precision => {
            1.2
        }
        _ => 0.8,
    };
    weighted_sum += calibration * calibration_weight;
    total_weight += calibration_weight;

    // 3. Reasoning quality, weighted higher for reasoning-dependent traits.
    //    Skipping the term changes the total weight, not just the score.
    let reasoning = match event.reasoning.as_deref() {
        Some(text) if !text.trim().is_empty() => {
            let assessment = analyzer.analyze(text, target);
            let reasoning_weight = match target {
                CognitiveTrait::AnalyticalDepth
                | CognitiveTrait::Metacognition
                | CognitiveTrait::Curiosity => 1.5,
                _ => 0.5,
            };
            weighted_sum += assessment.score * reasoning_weight;
            total_weight += reasoning_weight;
            Some(assessment.score)
        }
        _ => None,
    };

    // 4. Misconception penalty: a punitive adjustment to the numerator, not
    //    a separate weighted term
    let penalty = match flag {
        Some(flag) if !event.is_correct && flag.affected_traits.contains(&target) => {
            flag.confidence.clamp(0.0, 1.0) * MISCONCEPTION_PENALTY_FACTOR * total_weight
        }
        _ => 0.0,
    };

    let score = if total_weight > 0.0 {
        ((weighted_sum - penalty) / total_weight).clamp(0.0, 1.0)
    } else {
        0.5
    };

    EvidenceSample {
        score,
        weight: total_weight,
        components: EvidenceComponents {
            correctness,
            calibration,
            reasoning,
            penalty,
        },
    }
}
