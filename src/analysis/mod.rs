//! Reasoning quality analysis
//!
//! Scores a learner's free-text justification against a target cognitive
//! trait, producing a bounded score plus human-readable evidence markers for
//! auditability.
//!
//! Two interchangeable strategies honor the same contract: a lexical-structure
//! mode (`LinguisticAnalyzer`) and a keyword/regex fallback
//! (`HeuristicAnalyzer`). Selection happens once at startup via `select`.

pub mod heuristic;
pub mod linguistic;

use crate::config::AnalyzerKind;
use crate::types::CognitiveTrait;
use serde::{Deserialize, Serialize};

pub use heuristic::HeuristicAnalyzer;
pub use linguistic::LinguisticAnalyzer;

/// Flat score assigned to texts too short to analyze
///
/// Absence of reasoning is not proof of absence of skill, so short texts
/// score low but not zero.
pub const INSUFFICIENT_EVIDENCE_SCORE: f32 = 0.3;

/// Sub-feature counts backing an assessment, for audit/export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningFeatures {
    /// Whitespace-delimited word count
    pub word_count: usize,

    /// Sentence count (terminal punctuation runs)
    pub sentence_count: usize,

    /// Unique words / total words
    pub lexical_diversity: f32,

    /// Total marker matches across all detectors that fired
    pub marker_hits: usize,
}

/// Result of analyzing one reasoning text against one trait
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningAssessment {
    /// Quality score in [0, 1]
    pub score: f32,

    /// Human-readable explanations of what was found
    pub markers: Vec<String>,

    /// Sub-feature counts for auditability
    pub features: ReasoningFeatures,
}

/// Strategy interface for reasoning quality scoring
///
/// Implementations never error: malformed or empty input degrades to the
/// insufficient-evidence score, and traits without a dedicated detector fall
/// back to generic linguistic-quality heuristics.
pub trait ReasoningAnalyzer: Send + Sync {
    /// Score `text` as evidence for `target`
    fn analyze(&self, text: &str, target: CognitiveTrait) -> ReasoningAssessment;

    /// Strategy name for diagnostics
    fn name(&self) -> &'static str;
}

/// Select an analyzer implementation at startup
pub fn select(kind: AnalyzerKind, min_words: usize) -> Box<dyn ReasoningAnalyzer> {
    match kind {
        AnalyzerKind::Linguistic => Box::new(LinguisticAnalyzer::new(min_words)),
        AnalyzerKind::Heuristic => Box::new(HeuristicAnalyzer::new(min_words)),
    }
}

/// Lowercased whitespace tokens
pub(crate) fn words(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|w| !w.is_empty())
        .collect()
}

/// Count sentences by runs of terminal punctuation
pub(crate) fn sentence_count(text: &str) -> usize {
    let count = text
        .split(['.', '!', '?'])
        .filter(|s| !s.trim().is_empty())
        .count();
    count.max(1)
}

/// Unique words / total words
pub(crate) fn lexical_diversity(tokens: &[String]) -> f32 {
    if tokens.is_empty() {
        return 0.0;
    }
    let unique: std::collections::HashSet<&str> =
        tokens.iter().map(|s| s.as_str()).collect();
    unique.len() as f32 / tokens.len() as f32
}

/// Assessment for a text below the minimum word count
pub(crate) fn insufficient(tokens: &[String], text: &str) -> ReasoningAssessment {
    ReasoningAssessment {
        score: INSUFFICIENT_EVIDENCE_SCORE,
        markers: vec!["insufficient reasoning length".to_string()],
        features: ReasoningFeatures {
            word_count: tokens.len(),
            sentence_count: if text.trim().is_empty() {
                0
            } else {
                sentence_count(text)
            },
            lexical_diversity: lexical_diversity(tokens),
            marker_hits: 0,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_words_tokenization() {
        let tokens = words("First, I checked the units!");
        assert_eq!(tokens, vec!["first", "i", "checked", "the", "units"]);
    }

    #[test]
    fn test_sentence_count() {
        assert_eq!(sentence_count("One. Two! Three?"), 3);
        assert_eq!(sentence_count("no punctuation at all"), 1);
    }

    #[test]
    fn test_lexical_diversity_bounds() {
        let all_same = words("same same same same");
        assert!((lexical_diversity(&all_same) - 0.25).abs() < 0.01);

        let all_unique = words("each word appears once");
        assert!((lexical_diversity(&all_unique) - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_both_strategies_honor_short_circuit() {
        for analyzer in [
            select(AnalyzerKind::Heuristic, 5),
            select(AnalyzerKind::Linguistic, 5),
        ] {
            let assessment = analyzer.analyze("too short", CognitiveTrait::Curiosity);
            assert_eq!(assessment.score, INSUFFICIENT_EVIDENCE_SCORE);
            assert_eq!(
                assessment.markers,
                vec!["insufficient reasoning length".to_string()]
            );
        }
    }
}
