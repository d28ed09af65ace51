//! Lexical-structure strategy for reasoning analysis
//!
//! The default, deeper mode: instead of bare keyword hits it measures
//! structural properties of the text — connective density per sentence,
//! clause embedding, interrogative forms, numeric token shapes, and
//! vocabulary spread — and weights them per target trait. Honors the same
//! score contract and range as the heuristic fallback.

use crate::analysis::{
    insufficient, lexical_diversity, sentence_count, words, ReasoningAnalyzer,
    ReasoningAssessment, ReasoningFeatures,
};
use crate::types::CognitiveTrait;
use once_cell::sync::Lazy;
use regex::Regex;

/// Connectives that mark causal or inferential structure
static CAUSAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(because|therefore|thus|hence|so that|consequently|due to|leads? to|causes?|results? in|implies)\b")
        .expect("valid regex")
});

/// Subordinating conjunctions approximate clause embedding
static SUBORDINATOR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(although|while|whereas|unless|if|when|since|even though|despite)\b")
        .expect("valid regex")
});

/// Hedging and uncertainty phrases
static HEDGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(i think|i believe|probably|perhaps|maybe|might|not sure|i assumed|i guessed|seems?)\b")
        .expect("valid regex")
});

/// Self-monitoring verbs in first person
static MONITOR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bi\s+(checked|verified|re-?read|realized|noticed|reviewed|double-?checked|caught)\b")
        .expect("valid regex")
});

/// Interrogative or hypothetical framing
static INQUIRY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\bwhat if\b|\bi wonder\b|\bwhy\b|\bhow come\b|\bsuppose\b|\bimagine\b|\?)")
        .expect("valid regex")
});

/// Numbers with optional decimal part and unit suffix
static NUMERIC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b\d+(\.\d+)?\s*(m/s\^?2?|m/s|kg|km|mol|ml|mm|cm|nm|kj|[jnvwk%°])?\b")
        .expect("valid regex")
});

/// Comparative and generalizing vocabulary
static COMPARISON_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(similar(ly)?|analogous|same as|in general|generali[sz]e[sd]?|pattern|relationship|trend|like the|matches)\b")
        .expect("valid regex")
});

/// Sequencing vocabulary marks multi-step structure
static SEQUENCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(first(ly)?|second(ly)?|then|next|finally|after that|step \d+)\b")
        .expect("valid regex")
});

/// Lexical-structure reasoning analyzer
pub struct LinguisticAnalyzer {
    min_words: usize,
}

/// Structural measurements shared by the per-trait scorers
struct TextProfile {
    word_count: usize,
    sentences: usize,
    diversity: f32,
    causal_per_sentence: f32,
    subordination_per_sentence: f32,
    hedge_count: usize,
    monitor_count: usize,
    inquiry_count: usize,
    numeric_count: usize,
    comparison_count: usize,
    sequence_count: usize,
}

impl LinguisticAnalyzer {
    pub fn new(min_words: usize) -> Self {
        Self { min_words }
    }

    fn profile(text: &str, tokens: &[String]) -> TextProfile {
        let sentences = sentence_count(text);
        TextProfile {
            word_count: tokens.len(),
            sentences,
            diversity: lexical_diversity(tokens),
            causal_per_sentence: CAUSAL_RE.find_iter(text).count() as f32 / sentences as f32,
            subordination_per_sentence: SUBORDINATOR_RE.find_iter(text).count() as f32
                / sentences as f32,
            hedge_count: HEDGE_RE.find_iter(text).count(),
            monitor_count: MONITOR_RE.find_iter(text).count(),
            inquiry_count: INQUIRY_RE.find_iter(text).count(),
            numeric_count: NUMERIC_RE
                .find_iter(text)
                .filter(|m| !m.as_str().trim().is_empty())
                .count(),
            comparison_count: COMPARISON_RE.find_iter(text).count(),
            sequence_count: SEQUENCE_RE.find_iter(text).count(),
        }
    }

    /// Score structural depth: connective density plus clause embedding plus
    /// sequencing, each capped so no one measure saturates.
    fn depth_score(p: &TextProfile, markers: &mut Vec<String>, hits: &mut usize) -> f32 {
        let mut score = 0.0;

        if p.causal_per_sentence > 0.0 {
            score += (p.causal_per_sentence * 0.4).min(0.35);
            markers.push(format!(
                "causal density {:.2}/sentence",
                p.causal_per_sentence
            ));
            *hits += (p.causal_per_sentence * p.sentences as f32) as usize;
        }

        if p.subordination_per_sentence > 0.0 {
            score += (p.subordination_per_sentence * 0.3).min(0.2);
            markers.push("embedded clauses".to_string());
        }

        if p.sequence_count > 0 {
            score += 0.2;
            markers.push(format!("sequenced steps ({})", p.sequence_count));
            *hits += p.sequence_count;
        }

        score + (p.word_count as f32 / 120.0).min(0.25)
    }

    fn generic_score(p: &TextProfile, markers: &mut Vec<String>) -> f32 {
        let avg_sentence_len = p.word_count as f32 / p.sentences as f32;
        let complexity = (avg_sentence_len / 28.0).min(0.35);
        let diversity = p.diversity * 0.4;
        let structure = (p.subordination_per_sentence * 0.3).min(0.25);

        if complexity > 0.2 {
            markers.push("elaborated sentences".to_string());
        }
        if p.diversity > 0.7 {
            markers.push("varied vocabulary".to_string());
        }

        complexity + diversity + structure
    }
}

impl ReasoningAnalyzer for LinguisticAnalyzer {
    fn analyze(&self, text: &str, target: CognitiveTrait) -> ReasoningAssessment {
        let tokens = words(text);
        if tokens.len() < self.min_words {
            return insufficient(&tokens, text);
        }

        let p = Self::profile(text, &tokens);
        let mut markers = Vec::new();
        let mut hits = 0usize;

        let score = match target {
            CognitiveTrait::AnalyticalDepth => Self::depth_score(&p, &mut markers, &mut hits),
            CognitiveTrait::CognitiveFlexibility => {
                let mut s = Self::depth_score(&p, &mut markers, &mut hits);
                if p.inquiry_count > 0 {
                    s += (p.inquiry_count as f32 * 0.1).min(0.2);
                    markers.push("hypothetical framing".to_string());
                    hits += p.inquiry_count;
                }
                s
            }
            CognitiveTrait::Metacognition => {
                let mut s = 0.0;
                if p.hedge_count > 0 {
                    s += (p.hedge_count as f32 * 0.12).min(0.3);
                    markers.push(format!("calibrated hedging ({})", p.hedge_count));
                    hits += p.hedge_count;
                }
                if p.monitor_count > 0 {
                    s += (p.monitor_count as f32 * 0.2).min(0.4);
                    markers.push(format!("self-monitoring ({})", p.monitor_count));
                    hits += p.monitor_count;
                }
                // Reflective texts tend toward subordinated structure
                s + (p.subordination_per_sentence * 0.2).min(0.15)
            }
            CognitiveTrait::Curiosity => {
                let mut s = 0.0;
                if p.inquiry_count > 0 {
                    s += (p.inquiry_count as f32 * 0.18).min(0.5);
                    markers.push(format!("inquiry forms ({})", p.inquiry_count));
                    hits += p.inquiry_count;
                }
                if p.comparison_count > 0 {
                    s += 0.15;
                    markers.push("cross-domain reach".to_string());
                    hits += p.comparison_count;
                }
                s + (p.diversity * 0.2).min(0.2)
            }
            CognitiveTrait::Precision => {
                let mut s = 0.0;
                if p.numeric_count > 0 {
                    s += (p.numeric_count as f32 * 0.12).min(0.4);
                    markers.push(format!("numeric specificity ({})", p.numeric_count));
                    hits += p.numeric_count;
                }
                // Short, dense sentences read as exact rather than rambling
                let avg_len = p.word_count as f32 / p.sentences as f32;
                if avg_len < 18.0 && p.numeric_count > 0 {
                    s += 0.15;
                    markers.push("compact quantitative style".to_string());
                }
                s + (p.diversity * 0.15).min(0.15)
            }
            CognitiveTrait::PatternRecognition => {
                let mut s = 0.0;
                if p.comparison_count > 0 {
                    s += (p.comparison_count as f32 * 0.15).min(0.5);
                    markers.push(format!("comparative language ({})", p.comparison_count));
                    hits += p.comparison_count;
                }
                s + (p.causal_per_sentence * 0.2).min(0.15)
            }
            CognitiveTrait::Confidence | CognitiveTrait::AttentionConsistency => {
                Self::generic_score(&p, &mut markers)
            }
        };

        ReasoningAssessment {
            score: score.clamp(0.0, 1.0),
            markers,
            features: ReasoningFeatures {
                word_count: p.word_count,
                sentence_count: p.sentences,
                lexical_diversity: p.diversity,
                marker_hits: hits,
            },
        }
    }

    fn name(&self) -> &'static str {
        "linguistic"
    }
}
