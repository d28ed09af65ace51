//! Trait state updates
//!
//! Folds evidence samples into a learner's trait vector using per-trait
//! Kalman gains: `new = old + gain * (avg_performance - old)`, clamped to
//! [0, 1]. Produces per-trait diagnostics and a flat evidence log for
//! audit/export.

use crate::analysis::ReasoningAnalyzer;
use crate::engine::evidence::{gather_evidence, EvidenceSample, MisconceptionFlag};
use crate::types::{CognitiveTrait, QuestionInfo, QuizResponseEvent, TraitVector};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, warn};

/// How a trait's value was produced this cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateMethod {
    /// Kalman-style innovation update from accumulated evidence
    KalmanInnovation,

    /// No evidence targeted this trait; value carried forward
    NoEvidence,
}

/// Per-trait audit record for one update cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraitDiagnostic {
    pub old_value: f32,
    pub new_value: f32,
    pub change: f32,
    pub evidence_count: usize,

    /// Weighted average of evidence scores; absent without evidence
    pub avg_performance: Option<f32>,

    /// Gain configured for this trait
    pub gain: f32,

    pub method: UpdateMethod,
}

/// One evidence sample in the flat audit log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceLogEntry {
    pub question_id: String,

    #[serde(rename = "trait")]
    pub target: CognitiveTrait,

    pub sample: EvidenceSample,
}

/// Result of one trait update cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraitUpdateOutcome {
    /// The updated vector
    pub traits: TraitVector,

    /// Per-trait diagnostics, every trait present
    pub diagnostics: BTreeMap<CognitiveTrait, TraitDiagnostic>,

    /// One entry per (event, trait) pair that produced evidence
    pub evidence_log: Vec<EvidenceLogEntry>,
}

/// Infer Q-matrix targets for a question without explicit tags
///
/// Calculation-requiring questions probe precision and analytical depth;
/// hard questions probe cognitive flexibility and analytical depth;
/// misconception-targeting questions probe pattern recognition. Questions
/// matching none of these default to analytical depth and precision.
pub fn infer_targets(question: &QuestionInfo) -> Vec<CognitiveTrait> {
    let mut targets = BTreeSet::new();

    if question.requires_calculation {
        targets.insert(CognitiveTrait::Precision);
        targets.insert(CognitiveTrait::AnalyticalDepth);
    }

    if question.difficulty == crate::types::Difficulty::Hard {
        targets.insert(CognitiveTrait::CognitiveFlexibility);
        targets.insert(CognitiveTrait::AnalyticalDepth);
    }

    if question.misconception_target.is_some() {
        targets.insert(CognitiveTrait::PatternRecognition);
    }

    if targets.is_empty() {
        targets.insert(CognitiveTrait::AnalyticalDepth);
        targets.insert(CognitiveTrait::Precision);
    }

    targets.into_iter().collect()
}

/// Update a trait vector from a batch of quiz responses
///
/// Events without a matching question are skipped (logged once each);
/// traits with no evidence keep their current value. The returned vector
/// always satisfies the [0, 1] invariant.
pub fn update_traits(
    current: &TraitVector,
    events: &[QuizResponseEvent],
    questions: &[QuestionInfo],
    analyzer: &dyn ReasoningAnalyzer,
    flags: &HashMap<String, MisconceptionFlag>,
) -> TraitUpdateOutcome {
    let question_map: HashMap<&str, &QuestionInfo> =
        questions.iter().map(|q| (q.id.as_str(), q)).collect();

    struct Accumulator {
        weighted_sum: f32,
        total_weight: f32,
        count: usize,
    }

    let mut accumulators: BTreeMap<CognitiveTrait, Accumulator> = BTreeMap::new();
    let mut evidence_log = Vec::new();

    for event in events {
        let Some(question) = question_map.get(event.question_id.as_str()) else {
            warn!(
                "Skipping response with unknown question reference: {}",
                event.question_id
            );
            continue;
        };

        let targets = if question.traits_targeted.is_empty() {
            infer_targets(question)
        } else {
            question.traits_targeted.clone()
        };

        let flag = flags.get(event.question_id.as_str());

        for target in targets {
            let sample = gather_evidence(event, target, analyzer, flag);

            let acc = accumulators.entry(target).or_insert(Accumulator {
                weighted_sum: 0.0,
                total_weight: 0.0,
                count: 0,
            });
            acc.weighted_sum += sample.score * sample.weight;
            acc.total_weight += sample.weight;
            acc.count += 1;

            evidence_log.push(EvidenceLogEntry {
                question_id: event.question_id.clone(),
                target,
                sample,
            });
        }
    }

    let mut updated = current.clone();
    let mut diagnostics = BTreeMap::new();

    for trait_ in CognitiveTrait::ALL {
        let old_value = current.get(trait_);
        let gain = trait_.gain();

        let diagnostic = match accumulators.get(&trait_) {
            Some(acc) if acc.total_weight > 0.0 => {
                let avg_performance = acc.weighted_sum / acc.total_weight;
                let innovation = avg_performance - old_value;
                let new_value = (old_value + gain * innovation).clamp(0.0, 1.0);
                updated.set(trait_, new_value);

                debug!(
                    "{}: {:.3} -> {:.3} (gain={:.2}, {} obs)",
                    trait_, old_value, new_value, gain, acc.count
                );

                TraitDiagnostic {
                    old_value,
                    new_value,
                    change: new_value - old_value,
                    evidence_count: acc.count,
                    avg_performance: Some(avg_performance),
                    gain,
                    method: UpdateMethod::KalmanInnovation,
                }
            }
            _ => TraitDiagnostic {
                old_value,
                new_value: old_value,
                change: 0.0,
                evidence_count: 0,
                avg_performance: None,
                gain,
                method: UpdateMethod::NoEvidence,
            },
        };

        diagnostics.insert(trait_, diagnostic);
    }

    TraitUpdateOutcome {
        traits: updated,
        diagnostics,
        evidence_log,
    }
}
