//! Keyword/regex fallback strategy for reasoning analysis
//!
//! Trait-specific marker lexicons with individually capped additive
//! sub-scores, so no single signal can saturate the result. Used when the
//! lexical-structure mode is disabled by configuration.

use crate::analysis::{
    insufficient, lexical_diversity, sentence_count, words, ReasoningAnalyzer,
    ReasoningAssessment, ReasoningFeatures,
};
use crate::types::CognitiveTrait;
use once_cell::sync::Lazy;
use regex::Regex;

/// Causal connectives signal analytical depth
const CAUSAL_MARKERS: [&str; 7] = [
    "because",
    "therefore",
    "thus",
    "hence",
    "leads to",
    "causes",
    "results in",
];

/// Multi-step reasoning markers
const STEP_MARKERS: [&str; 5] = ["first", "then", "next", "finally", "step"];

/// Uncertainty expressions signal metacognitive awareness
const UNCERTAINTY_MARKERS: [&str; 5] = ["i think", "probably", "maybe", "not sure", "might be"];

/// Self-monitoring verbs
const MONITORING_MARKERS: [&str; 5] = [
    "i checked",
    "i realized",
    "i noticed",
    "i found",
    "i reviewed",
];

/// Strategy awareness phrases
const STRATEGY_MARKERS: [&str; 4] = ["i used", "i applied", "my approach", "my method"];

/// Question-generation markers signal curiosity
const QUESTION_MARKERS: [&str; 5] = ["why", "how", "what if", "i wonder", "curious"];

/// Exploration markers
const EXPLORATION_MARKERS: [&str; 4] = ["explore", "investigate", "discover", "learn more"];

/// Specificity vocabulary signals precision
const PRECISION_MARKERS: [&str; 6] = [
    "exactly",
    "precisely",
    "specific",
    "unit",
    "formula",
    "equation",
];

/// Comparison/generalization vocabulary signals pattern recognition
const PATTERN_MARKERS: [&str; 6] = [
    "pattern",
    "similar",
    "relationship",
    "trend",
    "sequence",
    "rule",
];

/// Hypothetical framing signals cognitive flexibility
const HYPOTHETICAL_MARKERS: [&str; 4] = ["suppose", "imagine", "alternatively", "instead"];

/// Numbers, optionally with a decimal part or unit suffix
static NUMERIC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+(\.\d+)?\s*[a-zA-Z%°/]*").expect("valid regex"));

/// Heuristic reasoning analyzer
pub struct HeuristicAnalyzer {
    min_words: usize,
}

impl HeuristicAnalyzer {
    pub fn new(min_words: usize) -> Self {
        Self { min_words }
    }

    /// Count phrase matches in the lowercased text
    ///
    /// Multi-word phrases match by substring; single words match whole
    /// tokens, so "how" does not fire on "show".
    fn count_matches(text_lower: &str, tokens: &[String], markers: &[&str]) -> usize {
        markers
            .iter()
            .filter(|m| {
                if m.contains(' ') {
                    text_lower.contains(*m)
                } else {
                    tokens.iter().any(|t| t == *m)
                }
            })
            .count()
    }

    fn depth_score(
        text_lower: &str,
        tokens: &[String],
        markers: &mut Vec<String>,
        hits: &mut usize,
    ) -> f32 {
        let mut score = 0.0;

        let causal = Self::count_matches(text_lower, tokens, &CAUSAL_MARKERS);
        if causal > 0 {
            score += (causal as f32 * 0.1).min(0.3);
            markers.push(format!("causal connectives ({})", causal));
            *hits += causal;
        }

        let steps = Self::count_matches(text_lower, tokens, &STEP_MARKERS);
        if steps > 0 {
            score += 0.2;
            markers.push("multi-step reasoning".to_string());
            *hits += steps;
        }

        // Length as proxy for elaboration
        score += (tokens.len() as f32 / 100.0).min(0.3);

        score
    }

    /// Generic linguistic-quality fallback for traits without a dedicated
    /// detector
    fn generic_score(tokens: &[String], sentences: usize, markers: &mut Vec<String>) -> f32 {
        let avg_sentence_len = tokens.len() as f32 / sentences as f32;
        let complexity = (avg_sentence_len / 30.0).min(0.4);
        let diversity = lexical_diversity(tokens) * 0.4;

        if complexity > 0.2 {
            markers.push("elaborated sentences".to_string());
        }
        if diversity > 0.3 {
            markers.push("varied vocabulary".to_string());
        }

        complexity + diversity
    }
}

impl ReasoningAnalyzer for HeuristicAnalyzer {
    fn analyze(&self, text: &str, target: CognitiveTrait) -> ReasoningAssessment {
        let tokens = words(text);
        if tokens.len() < self.min_words {
            return insufficient(&tokens, text);
        }

        let text_lower = text.to_lowercase();
        let sentences = sentence_count(text);
        let mut markers = Vec::new();
        let mut hits = 0usize;
        let mut score = 0.0f32;

        match target {
            CognitiveTrait::AnalyticalDepth => {
                score += Self::depth_score(&text_lower, &tokens, &mut markers, &mut hits);
            }
            CognitiveTrait::CognitiveFlexibility => {
                score += Self::depth_score(&text_lower, &tokens, &mut markers, &mut hits);
                let hypo = Self::count_matches(&text_lower, &tokens, &HYPOTHETICAL_MARKERS);
                if hypo > 0 {
                    score += 0.2;
                    markers.push("hypothetical framing".to_string());
                    hits += hypo;
                }
            }
            CognitiveTrait::Metacognition => {
                let uncertainty =
                    Self::count_matches(&text_lower, &tokens, &UNCERTAINTY_MARKERS);
                if uncertainty > 0 {
                    score += 0.25;
                    markers.push("uncertainty expressions".to_string());
                    hits += uncertainty;
                }

                let monitoring =
                    Self::count_matches(&text_lower, &tokens, &MONITORING_MARKERS);
                if monitoring > 0 {
                    score += 0.35;
                    markers.push("self-monitoring language".to_string());
                    hits += monitoring;
                }

                let strategy = Self::count_matches(&text_lower, &tokens, &STRATEGY_MARKERS);
                if strategy > 0 {
                    score += 0.25;
                    markers.push("strategy awareness".to_string());
                    hits += strategy;
                }
            }
            CognitiveTrait::Curiosity => {
                let questions = Self::count_matches(&text_lower, &tokens, &QUESTION_MARKERS);
                if questions > 0 {
                    score += (questions as f32 * 0.15).min(0.5);
                    markers.push(format!("question generation ({})", questions));
                    hits += questions;
                }

                let exploration =
                    Self::count_matches(&text_lower, &tokens, &EXPLORATION_MARKERS);
                if exploration > 0 {
                    score += 0.3;
                    markers.push("exploration markers".to_string());
                    hits += exploration;
                }
            }
            CognitiveTrait::Precision => {
                let precision = Self::count_matches(&text_lower, &tokens, &PRECISION_MARKERS);
                if precision > 0 {
                    score += (precision as f32 * 0.15).min(0.4);
                    markers.push(format!("specificity vocabulary ({})", precision));
                    hits += precision;
                }

                let numerics = NUMERIC_RE.find_iter(text).count();
                if numerics > 0 {
                    score += (numerics as f32 * 0.1).min(0.3);
                    markers.push(format!("numeric specificity ({})", numerics));
                    hits += numerics;
                }
            }
            CognitiveTrait::PatternRecognition => {
                let patterns = Self::count_matches(&text_lower, &tokens, &PATTERN_MARKERS);
                if patterns > 0 {
                    score += (patterns as f32 * 0.15).min(0.5);
                    markers.push(format!("pattern vocabulary ({})", patterns));
                    hits += patterns;
                }
            }
            CognitiveTrait::Confidence | CognitiveTrait::AttentionConsistency => {
                score += Self::generic_score(&tokens, sentences, &mut markers);
            }
        }

        ReasoningAssessment {
            score: score.clamp(0.0, 1.0),
            markers,
            features: ReasoningFeatures {
                word_count: tokens.len(),
                sentence_count: sentences,
                lexical_diversity: lexical_diversity(&tokens),
                marker_hits: hits,
            },
        }
    }

    fn name(&self) -> &'static str {
        "heuristic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyzer() -> HeuristicAnalyzer {
        HeuristicAnalyzer::new(5)
    }

    #[test]
    fn test_short_text_scores_fixed_low() {
        let a = analyzer().analyze("idk", CognitiveTrait::AnalyticalDepth);
        assert_eq!(a.score, 0.3);
        assert_eq!(a.features.marker_hits, 0);
    }

    #[test]
    fn test_causal_markers_detected() {
        let text = "The reaction speeds up because higher temperature causes more \
                    collisions, therefore the rate constant increases.";
        let a = analyzer().analyze(text, CognitiveTrait::AnalyticalDepth);

        assert!(a.score > 0.3);
        assert!(a.markers.iter().any(|m| m.contains("causal")));
    }

    #[test]
    fn test_causal_cap_prevents_saturation() {
        // Many causal words alone cannot push depth past its caps:
        // 0.3 (causal) + 0.2 (steps, absent) + 0.3 (elaboration) < 1.0
        let text = "because therefore thus hence because therefore thus hence \
                    because therefore thus hence";
        let a = analyzer().analyze(text, CognitiveTrait::AnalyticalDepth);
        assert!(a.score < 0.7);
    }

    #[test]
    fn test_metacognition_markers() {
        let text = "I think the answer is B but I checked my work and I realized \
                    my approach to the limit was off at first.";
        let a = analyzer().analyze(text, CognitiveTrait::Metacognition);

        assert!(a.score >= 0.8);
        assert!(a.markers.iter().any(|m| m.contains("self-monitoring")));
        assert!(a.markers.iter().any(|m| m.contains("uncertainty")));
    }

    #[test]
    fn test_curiosity_question_markers() {
        let text = "Why does this work? I wonder what if we changed the initial \
                    conditions, could we explore other domains?";
        let a = analyzer().analyze(text, CognitiveTrait::Curiosity);

        assert!(a.score >= 0.6);
        assert!(a.markers.iter().any(|m| m.contains("question")));
    }

    #[test]
    fn test_single_word_markers_match_whole_tokens_only() {
        // "show" must not fire the curiosity "how" marker
        let text = "the results show a large increase over previous values";
        let a = analyzer().analyze(text, CognitiveTrait::Curiosity);
        assert!(!a.markers.iter().any(|m| m.contains("question")));
    }

    #[test]
    fn test_precision_numeric_markers() {
        let text = "Using F=ma precisely: F=10N and m=2kg, so a=5 exactly, and the \
                    unit check confirms m/s2.";
        let a = analyzer().analyze(text, CognitiveTrait::Precision);

        assert!(a.score >= 0.5);
        assert!(a.markers.iter().any(|m| m.contains("numeric")));
    }

    #[test]
    fn test_generic_fallback_for_untargeted_trait() {
        let text = "The experiment demonstrates consistent measurement methodology \
                    across repeated independent trials with careful controls.";
        let a = analyzer().analyze(text, CognitiveTrait::AttentionConsistency);

        assert!(a.score > 0.0);
        assert!(a.score <= 1.0);
    }

    #[test]
    fn test_score_always_bounded() {
        let text = "because therefore thus hence first then next finally step \
                    pattern similar relationship trend sequence rule exactly \
                    precisely specific unit formula equation why how i wonder";
        for t in CognitiveTrait::ALL {
            let a = analyzer().analyze(text, t);
            assert!((0.0..=1.0).contains(&a.score), "trait {} out of range", t);
        }
    }
}
