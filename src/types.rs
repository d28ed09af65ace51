//! Core data types for the Metis trait modeling engine
//!
//! This module defines the fundamental data structures used throughout metis,
//! including the closed cognitive trait set, trait vectors, quiz response
//! events, and the misconception records that drive the tracking and
//! promotion pipelines.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Unique identifier for learners
///
/// Wraps a UUID to provide type safety and prevent mixing learner IDs
/// with other UUID-based identifiers in the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LearnerId(pub Uuid);

impl LearnerId {
    /// Create a new random learner ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a learner ID from a string
    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for LearnerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for LearnerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for misconception records (personal and global)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MisconceptionId(pub Uuid);

impl MisconceptionId {
    /// Create a new random misconception ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a misconception ID from a string
    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for MisconceptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MisconceptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One dimension of a learner's cognitive profile
///
/// The trait set is closed: questions and misconceptions may only reference
/// these eight dimensions, so a typo in upstream data cannot silently create
/// an untracked trait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CognitiveTrait {
    /// Attention to numerical accuracy, detail, and exactness
    Precision,

    /// Alignment between stated confidence and actual correctness
    Confidence,

    /// Ability to break down complex problems systematically
    AnalyticalDepth,

    /// Willingness to explore edge cases and ask "what if" questions
    Curiosity,

    /// Self-awareness of thought processes and error recognition
    Metacognition,

    /// Comfort with abstract scenarios and contradictory information
    CognitiveFlexibility,

    /// Speed and accuracy in identifying rules and regularities
    PatternRecognition,

    /// Sustained focus and careful tracking of multi-step problems
    AttentionConsistency,
}

impl CognitiveTrait {
    /// All traits in canonical order
    pub const ALL: [CognitiveTrait; 8] = [
        CognitiveTrait::Precision,
        CognitiveTrait::Confidence,
        CognitiveTrait::AnalyticalDepth,
        CognitiveTrait::Curiosity,
        CognitiveTrait::Metacognition,
        CognitiveTrait::CognitiveFlexibility,
        CognitiveTrait::PatternRecognition,
        CognitiveTrait::AttentionConsistency,
    ];

    /// Kalman gain for this trait
    ///
    /// Fast-adapting traits use a higher gain than slow, stable ones, so
    /// identical evidence moves curiosity further than precision.
    pub fn gain(&self) -> f32 {
        match self {
            CognitiveTrait::Curiosity => 0.35,
            CognitiveTrait::Confidence => 0.30,
            CognitiveTrait::Metacognition => 0.25,
            CognitiveTrait::CognitiveFlexibility => 0.22,
            CognitiveTrait::AnalyticalDepth => 0.20,
            CognitiveTrait::PatternRecognition => 0.20,
            CognitiveTrait::AttentionConsistency => 0.18,
            CognitiveTrait::Precision => 0.15,
        }
    }

    /// Default gain for traits without a specific configuration
    pub const DEFAULT_GAIN: f32 = 0.20;

    /// Canonical snake_case name
    pub fn name(&self) -> &'static str {
        match self {
            CognitiveTrait::Precision => "precision",
            CognitiveTrait::Confidence => "confidence",
            CognitiveTrait::AnalyticalDepth => "analytical_depth",
            CognitiveTrait::Curiosity => "curiosity",
            CognitiveTrait::Metacognition => "metacognition",
            CognitiveTrait::CognitiveFlexibility => "cognitive_flexibility",
            CognitiveTrait::PatternRecognition => "pattern_recognition",
            CognitiveTrait::AttentionConsistency => "attention_consistency",
        }
    }

    /// Parse a trait from upstream text
    ///
    /// Accepts snake_case names as well as the spaced title-case forms that
    /// classifier output sometimes uses ("Analytical Depth").
    pub fn from_name(s: &str) -> Option<Self> {
        let normalized = s.trim().to_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "precision" => Some(CognitiveTrait::Precision),
            "confidence" => Some(CognitiveTrait::Confidence),
            "analytical_depth" => Some(CognitiveTrait::AnalyticalDepth),
            "curiosity" => Some(CognitiveTrait::Curiosity),
            "metacognition" => Some(CognitiveTrait::Metacognition),
            "cognitive_flexibility" => Some(CognitiveTrait::CognitiveFlexibility),
            "pattern_recognition" => Some(CognitiveTrait::PatternRecognition),
            "attention_consistency" => Some(CognitiveTrait::AttentionConsistency),
            _ => None,
        }
    }
}

impl std::fmt::Display for CognitiveTrait {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A learner's cognitive signature: trait -> value in [0, 1]
///
/// Unset traits read as 0.5 (neutral). Values are clamped on write so the
/// [0, 1] invariant cannot be violated regardless of input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TraitVector {
    values: BTreeMap<CognitiveTrait, f32>,
}

/// Neutral baseline for traits with no recorded evidence
pub const NEUTRAL_TRAIT_VALUE: f32 = 0.5;

impl TraitVector {
    /// Create a vector with every trait at the neutral baseline
    pub fn neutral() -> Self {
        let values = CognitiveTrait::ALL
            .iter()
            .map(|t| (*t, NEUTRAL_TRAIT_VALUE))
            .collect();
        Self { values }
    }

    /// Get a trait value, defaulting to neutral when unset
    pub fn get(&self, t: CognitiveTrait) -> f32 {
        self.values.get(&t).copied().unwrap_or(NEUTRAL_TRAIT_VALUE)
    }

    /// Set a trait value, clamped to [0, 1]
    pub fn set(&mut self, t: CognitiveTrait, value: f32) {
        self.values.insert(t, value.clamp(0.0, 1.0));
    }

    /// Iterate over all eight traits with their current values
    pub fn iter(&self) -> impl Iterator<Item = (CognitiveTrait, f32)> + '_ {
        CognitiveTrait::ALL.iter().map(move |t| (*t, self.get(*t)))
    }
}

impl Default for TraitVector {
    fn default() -> Self {
        Self::neutral()
    }
}

/// Question difficulty tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Default for Difficulty {
    fn default() -> Self {
        Difficulty::Medium
    }
}

/// Misconception severity tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Default for Severity {
    fn default() -> Self {
        Severity::Medium
    }
}

/// Q-matrix row: a question together with the traits it is designed to probe
///
/// `traits_targeted` may be empty, in which case the engine infers targets
/// from the remaining metadata (see `engine::update::infer_targets`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionInfo {
    /// Stable question identifier
    pub id: String,

    /// Question text
    pub text: String,

    /// The correct option
    pub correct_option: String,

    /// All answer options, in presentation order
    pub options: Vec<String>,

    /// Explicit Q-matrix tags; empty means "infer from metadata"
    #[serde(default)]
    pub traits_targeted: Vec<CognitiveTrait>,

    /// Whether answering requires numeric calculation
    #[serde(default)]
    pub requires_calculation: bool,

    /// Difficulty tier
    #[serde(default)]
    pub difficulty: Difficulty,

    /// The personal misconception this question was generated to probe, if any
    #[serde(default)]
    pub misconception_target: Option<MisconceptionId>,

    /// Topic label for per-topic trait scoping
    #[serde(default)]
    pub topic: Option<String>,
}

/// One learner's answer to one question
///
/// Created at submission time and never mutated; the engine consumes it once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizResponseEvent {
    /// Identifier of the question answered
    pub question_id: String,

    /// The option the learner selected
    pub selected_option: String,

    /// Whether the selection matched the correct option
    pub is_correct: bool,

    /// Learner's self-reported confidence (0-1)
    pub confidence: f32,

    /// Free-text justification, when the learner supplied one
    #[serde(default)]
    pub reasoning: Option<String>,
}

/// A misconception extracted by the classifier from one incorrect response
///
/// Intermediate shape: it becomes a `PersonalMisconception` once it clears
/// the confidence floor and is recorded against the learner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveredMisconception {
    /// Concise description of the misconception
    pub misconception_text: String,

    /// Topic where it was observed
    pub topic: String,

    /// Classifier confidence in the identification (0-1)
    pub confidence: f32,

    /// Evidence from the reasoning that revealed the misconception
    pub evidence: String,

    /// Estimated severity
    #[serde(default)]
    pub severity: Severity,

    /// Cognitive trait most affected, when the classifier named one
    #[serde(default)]
    pub related_trait: Option<CognitiveTrait>,

    /// Brief remediation suggestion
    #[serde(default)]
    pub suggested_remediation: Option<String>,
}

/// A misconception tracked in one learner's personal history
///
/// Never hard-deleted: resolved records stay as part of the learning history
/// and can relapse back to active on re-detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonalMisconception {
    /// Unique identifier for this record
    pub id: MisconceptionId,

    /// The misconception text
    pub misconception_text: String,

    /// Topic where this misconception was observed
    pub topic: String,

    /// Question that first revealed the misconception
    #[serde(default)]
    pub question_context: Option<String>,

    /// Learner reasoning that revealed the misconception
    #[serde(default)]
    pub student_reasoning: Option<String>,

    /// When this misconception was first observed
    pub first_encountered: DateTime<Utc>,

    /// Number of times the learner has demonstrated it
    pub frequency: u32,

    /// Most recent detection timestamp
    pub last_occurrence: DateTime<Utc>,

    /// Whether the learner has overcome this misconception
    pub resolved: bool,

    /// When the misconception was marked resolved
    #[serde(default)]
    pub resolution_date: Option<DateTime<Utc>>,

    /// Consecutive correct answers on questions probing this misconception
    pub correct_streak: u32,

    /// Questions generated so far to address this misconception
    pub targeted_question_count: u32,

    /// Severity tier
    pub severity: Severity,

    /// Cognitive trait most affected
    #[serde(default)]
    pub related_trait: Option<CognitiveTrait>,
}

impl PersonalMisconception {
    /// Create a fresh record from a classifier discovery
    pub fn from_discovery(
        discovered: &DiscoveredMisconception,
        question_context: Option<String>,
        student_reasoning: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MisconceptionId::new(),
            misconception_text: discovered.misconception_text.clone(),
            topic: discovered.topic.clone(),
            question_context,
            student_reasoning,
            first_encountered: now,
            frequency: 1,
            last_occurrence: now,
            resolved: false,
            resolution_date: None,
            correct_streak: 0,
            targeted_question_count: 0,
            severity: discovered.severity,
            related_trait: discovered.related_trait,
        }
    }

    /// Whether this misconception still needs remediation
    pub fn is_active(&self) -> bool {
        !self.resolved
    }

    /// Record a re-detection of this misconception
    ///
    /// A relapse: frequency increments, the correct streak resets, and the
    /// record returns to active even if it had been resolved.
    pub fn record_recurrence(&mut self, now: DateTime<Utc>) {
        self.frequency += 1;
        self.last_occurrence = now;
        self.correct_streak = 0;
        self.resolved = false;
        self.resolution_date = None;
    }

    /// Record a correct answer tied to this misconception
    ///
    /// Returns true when the streak reaches `threshold` and the record
    /// transitions to resolved.
    pub fn record_correct(&mut self, threshold: u32, now: DateTime<Utc>) -> bool {
        self.correct_streak += 1;
        if !self.resolved && self.correct_streak >= threshold {
            self.resolved = true;
            self.resolution_date = Some(now);
            return true;
        }
        false
    }

    /// Record an incorrect answer tied to this misconception
    ///
    /// The streak resets and the record returns to active.
    pub fn record_incorrect(&mut self) {
        self.correct_streak = 0;
        self.resolved = false;
        self.resolution_date = None;
    }
}

/// A misconception promoted into the shared knowledge base
///
/// Append-only: records are immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalMisconceptionRecord {
    /// Unique record identifier
    pub id: MisconceptionId,

    /// Canonical misconception text
    pub misconception_text: String,

    /// Subject/domain (e.g. "physics")
    pub subject: String,

    /// Topic within the subject
    pub topic: String,

    /// Embedding vector (stored separately from JSON exports)
    #[serde(skip)]
    pub embedding: Vec<f32>,

    /// Distinct learners exhibiting the misconception at promotion time
    pub frequency: usize,

    /// 1 - similarity to the closest pre-existing record
    pub novelty_score: f32,

    /// When the record entered the knowledge base
    pub added_date: DateTime<Utc>,
}

/// Per-topic rollup of misconception resolution progress
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MisconceptionProgress {
    pub topic: String,
    pub total_misconceptions: usize,
    pub resolved_misconceptions: usize,
    pub active_misconceptions: usize,

    /// Fraction of tracked misconceptions resolved (0-1)
    pub resolution_rate: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_learner_id_creation() {
        let id1 = LearnerId::new();
        let id2 = LearnerId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_trait_gains_ordering() {
        assert!(CognitiveTrait::Curiosity.gain() > CognitiveTrait::Confidence.gain());
        assert!(CognitiveTrait::Confidence.gain() > CognitiveTrait::Precision.gain());
        assert_eq!(CognitiveTrait::Precision.gain(), 0.15);
    }

    #[test]
    fn test_trait_from_name() {
        assert_eq!(
            CognitiveTrait::from_name("analytical_depth"),
            Some(CognitiveTrait::AnalyticalDepth)
        );
        assert_eq!(
            CognitiveTrait::from_name("Analytical Depth"),
            Some(CognitiveTrait::AnalyticalDepth)
        );
        assert_eq!(CognitiveTrait::from_name("grit"), None);
    }

    #[test]
    fn test_trait_vector_defaults_and_clamping() {
        let mut v = TraitVector::neutral();
        assert_eq!(v.get(CognitiveTrait::Curiosity), 0.5);

        v.set(CognitiveTrait::Curiosity, 1.7);
        assert_eq!(v.get(CognitiveTrait::Curiosity), 1.0);

        v.set(CognitiveTrait::Precision, -0.2);
        assert_eq!(v.get(CognitiveTrait::Precision), 0.0);
    }

    #[test]
    fn test_misconception_lifecycle_transitions() {
        let discovered = DiscoveredMisconception {
            misconception_text: "Confuses mass and weight".to_string(),
            topic: "mechanics".to_string(),
            confidence: 0.9,
            evidence: "used kg for force".to_string(),
            severity: Severity::High,
            related_trait: Some(CognitiveTrait::Precision),
            suggested_remediation: None,
        };

        let now = Utc::now();
        let mut mc = PersonalMisconception::from_discovery(&discovered, None, None, now);
        assert_eq!(mc.frequency, 1);
        assert_eq!(mc.correct_streak, 0);
        assert!(mc.is_active());

        // Two correct answers: still active
        assert!(!mc.record_correct(3, now));
        assert!(!mc.record_correct(3, now));
        assert!(mc.is_active());

        // Third correct answer resolves
        assert!(mc.record_correct(3, now));
        assert!(!mc.is_active());
        assert!(mc.resolution_date.is_some());

        // Re-detection relapses: frequency up, streak reset, active again
        mc.record_recurrence(now);
        assert_eq!(mc.frequency, 2);
        assert_eq!(mc.correct_streak, 0);
        assert!(mc.is_active());
        assert!(mc.resolution_date.is_none());
    }

    #[test]
    fn test_trait_vector_serde_roundtrip() {
        let mut v = TraitVector::neutral();
        v.set(CognitiveTrait::Curiosity, 0.8);

        let json = serde_json::to_string(&v).unwrap();
        assert!(json.contains("\"curiosity\":0.8"));

        let back: TraitVector = serde_json::from_str(&json).unwrap();
        assert_eq!(back.get(CognitiveTrait::Curiosity), 0.8);
    }
}
