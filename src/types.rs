//! Core data types for the noesis personalization core
//!
//! This module defines the fundamental data structures used throughout
//! noesis: interaction records, user histories, preference models, mined
//! behavior patterns, predictions, and adaptation strategies. Validated
//! numeric signals live in typed fields; free-form context travels in a
//! side map of `ContextValue`, preserving name-based lookup without
//! giving up type safety.

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Identifier for a platform user
///
/// Wraps the opaque id handed over by the enclosing session manager so it
/// cannot be mixed up with pattern or strategy ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for mined behavior patterns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatternId(pub Uuid);

impl PatternId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PatternId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PatternId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for adaptation strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StrategyId(pub Uuid);

impl StrategyId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for StrategyId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for StrategyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single free-form context attribute value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContextValue {
    Flag(bool),
    Number(f32),
    Text(String),
}

impl ContextValue {
    /// Numeric view of the value. Flags read as 1.0/0.0, text as None.
    pub fn as_number(&self) -> Option<f32> {
        match self {
            ContextValue::Number(n) => Some(*n),
            ContextValue::Flag(b) => Some(if *b { 1.0 } else { 0.0 }),
            ContextValue::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContextValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<f32> for ContextValue {
    fn from(n: f32) -> Self {
        ContextValue::Number(n)
    }
}

impl From<bool> for ContextValue {
    fn from(b: bool) -> Self {
        ContextValue::Flag(b)
    }
}

impl From<&str> for ContextValue {
    fn from(s: &str) -> Self {
        ContextValue::Text(s.to_string())
    }
}

/// Free-form context map keyed by agreed attribute names
/// (`time_of_day`, `task_complexity`, `user_expertise`, ...)
pub type ContextMap = HashMap<String, ContextValue>;

/// Numeric lookup into a context map
pub fn context_number(context: &ContextMap, key: &str) -> Option<f32> {
    context.get(key).and_then(ContextValue::as_number)
}

/// Descriptor for a piece of content surfaced during an interaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentDescriptor {
    /// Content kind, e.g. "summary", "citation", "code"
    pub kind: String,

    /// Optional human-readable label
    pub label: Option<String>,
}

impl ContentDescriptor {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            label: None,
        }
    }
}

/// Immutable, append-only interaction event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interaction {
    pub timestamp: DateTime<Utc>,

    /// Action label, e.g. "search", "refine_query", "request_summary"
    pub action: String,

    /// Wall-clock duration of the interaction in seconds
    pub duration_secs: f32,

    /// Reported or inferred satisfaction in [0, 1]
    pub satisfaction: f32,

    /// Engagement signal in [0, 1]
    pub engagement: f32,

    /// Task completion signal in [0, 1]
    pub completion: f32,

    /// Free-form context captured with the event
    #[serde(default)]
    pub context: ContextMap,

    /// Content surfaced during the interaction
    #[serde(default)]
    pub content: Vec<ContentDescriptor>,
}

impl Interaction {
    /// Create an interaction with neutral signal values
    pub fn new(action: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            action: action.into(),
            duration_secs: 0.0,
            satisfaction: 0.5,
            engagement: 0.5,
            completion: 0.5,
            context: ContextMap::new(),
            content: Vec::new(),
        }
    }

    /// Numeric context attribute, if present
    pub fn context_number(&self, key: &str) -> Option<f32> {
        context_number(&self.context, key)
    }
}

/// A bounded span of interactions with start/end satisfaction readings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub start_satisfaction: f32,
    pub end_satisfaction: f32,
    pub duration_secs: f32,
    pub completion_rate: f32,
}

impl Session {
    pub fn duration_minutes(&self) -> f32 {
        self.duration_secs / 60.0
    }

    /// Satisfaction drift per minute over the session
    pub fn satisfaction_slope(&self) -> f32 {
        let minutes = self.duration_minutes();
        if minutes <= 0.0 {
            return 0.0;
        }
        (self.end_satisfaction - self.start_satisfaction) / minutes
    }
}

/// Ordered interaction history for one user
///
/// Grows monotonically; queried by recency window. Carries the current
/// preference snapshot so downstream consumers see one coherent view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserHistory {
    pub user_id: UserId,
    pub interactions: Vec<Interaction>,
    pub sessions: Vec<Session>,
    pub preferences: PreferenceModel,
}

impl UserHistory {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            interactions: Vec::new(),
            sessions: Vec::new(),
            preferences: PreferenceModel::neutral(0),
        }
    }

    /// Interactions within the given window, newest last
    pub fn recent(&self, window: chrono::Duration) -> Vec<&Interaction> {
        let cutoff = Utc::now() - window;
        self.interactions
            .iter()
            .filter(|i| i.timestamp >= cutoff)
            .collect()
    }

    pub fn push(&mut self, interaction: Interaction) {
        self.interactions.push(interaction);
    }
}

/// Coarse time-of-day buckets for temporal preferences
///
/// Weekend overrides the hour buckets: a Saturday morning interaction
/// lands in `Weekend`, not `Morning`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeBucket {
    Morning,
    Afternoon,
    Evening,
    Weekend,
}

impl TimeBucket {
    pub fn from_timestamp(ts: DateTime<Utc>) -> Self {
        if ts.weekday().num_days_from_monday() >= 5 {
            return TimeBucket::Weekend;
        }
        match ts.hour() {
            h if h < 12 => TimeBucket::Morning,
            h if h < 18 => TimeBucket::Afternoon,
            _ => TimeBucket::Evening,
        }
    }

    /// Bucket for a live context map, if it carries time attributes
    pub fn from_context(context: &ContextMap) -> Option<Self> {
        let hour = context_number(context, "time_of_day")?;
        if let Some(dow) = context_number(context, "day_of_week") {
            if dow >= 5.0 {
                return Some(TimeBucket::Weekend);
            }
        }
        Some(match hour {
            h if h < 12.0 => TimeBucket::Morning,
            h if h < 18.0 => TimeBucket::Afternoon,
            _ => TimeBucket::Evening,
        })
    }
}

impl std::fmt::Display for TimeBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeBucket::Morning => write!(f, "morning"),
            TimeBucket::Afternoon => write!(f, "afternoon"),
            TimeBucket::Evening => write!(f, "evening"),
            TimeBucket::Weekend => write!(f, "weekend"),
        }
    }
}

/// A learned time-of-day preference for one attribute
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemporalPreference {
    pub attribute: String,
    pub bucket: TimeBucket,
    pub value: f32,
    pub confidence: f32,
}

/// Replaceable preference snapshot for one user
///
/// Recomputed wholesale from an interaction batch, except for the
/// incremental EMA path in `PreferenceLearner::update_preference`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferenceModel {
    /// Compressed embedding of the interaction feature space
    pub embedding: Vec<f32>,

    /// Attribute weights in [0, 1]
    pub weights: HashMap<String, f32>,

    /// Time-of-day modifiers
    pub temporal: Vec<TemporalPreference>,

    /// Context-attribute correlation modifiers
    pub context_modifiers: HashMap<String, f32>,

    /// Per-attribute confidence intervals, lower <= upper, within [0, 1]
    pub intervals: HashMap<String, (f32, f32)>,

    pub updated_at: DateTime<Utc>,
}

/// Attribute names every preference model carries
pub const PREFERENCE_ATTRIBUTES: [&str; 6] = [
    "response_length",
    "technical_detail",
    "interaction_style",
    "content_type",
    "explanation_depth",
    "engagement_level",
];

impl PreferenceModel {
    /// Fixed neutral default: weights 0.5 with wide (0.3, 0.7) bands
    pub fn neutral(embedding_dim: usize) -> Self {
        let mut weights = HashMap::new();
        let mut intervals = HashMap::new();
        for attr in PREFERENCE_ATTRIBUTES {
            weights.insert(attr.to_string(), 0.5);
            intervals.insert(attr.to_string(), (0.3, 0.7));
        }
        Self {
            embedding: vec![0.0; embedding_dim],
            weights,
            temporal: Vec::new(),
            context_modifiers: HashMap::new(),
            intervals,
            updated_at: Utc::now(),
        }
    }

    pub fn weight(&self, attribute: &str) -> Option<f32> {
        self.weights.get(attribute).copied()
    }

    /// JSON snapshot for the persistence collaborator
    pub fn snapshot_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> crate::error::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Kind of mined behavior pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PatternType {
    Sequential,
    Cyclical,
    Contextual,
    PreferenceBased,
    Temporal,
}

impl std::fmt::Display for PatternType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PatternType::Sequential => write!(f, "sequential"),
            PatternType::Cyclical => write!(f, "cyclical"),
            PatternType::Contextual => write!(f, "contextual"),
            PatternType::PreferenceBased => write!(f, "preference-based"),
            PatternType::Temporal => write!(f, "temporal"),
        }
    }
}

/// Comparison operator inside a pattern condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConditionOp {
    Equals,
    GreaterThan,
    LessThan,
    Contains,
}

/// A single condition a live context must satisfy for a pattern to apply
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextCondition {
    pub attribute: String,
    pub op: ConditionOp,
    pub value: ContextValue,
}

impl ContextCondition {
    pub fn new(attribute: impl Into<String>, op: ConditionOp, value: ContextValue) -> Self {
        Self {
            attribute: attribute.into(),
            op,
            value,
        }
    }

    /// Evaluate this condition against a live context map
    pub fn holds(&self, context: &ContextMap) -> bool {
        let Some(actual) = context.get(&self.attribute) else {
            return false;
        };
        match self.op {
            ConditionOp::Equals => match (actual, &self.value) {
                (ContextValue::Number(a), ContextValue::Number(b)) => (a - b).abs() < 1e-6,
                (ContextValue::Text(a), ContextValue::Text(b)) => a == b,
                (ContextValue::Flag(a), ContextValue::Flag(b)) => a == b,
                _ => false,
            },
            ConditionOp::GreaterThan => match (actual.as_number(), self.value.as_number()) {
                (Some(a), Some(b)) => a > b,
                _ => false,
            },
            ConditionOp::LessThan => match (actual.as_number(), self.value.as_number()) {
                (Some(a), Some(b)) => a < b,
                _ => false,
            },
            ConditionOp::Contains => match (actual.as_text(), self.value.as_text()) {
                (Some(a), Some(b)) => a.contains(b),
                _ => false,
            },
        }
    }
}

/// Observable metric a pattern considers evidence of success
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessIndicator {
    pub metric: String,
    pub target: f32,
}

/// A recurring behavior mined from interaction history
///
/// Created by the detector, mutated in place by observation feedback,
/// cached per user with a freshness window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehaviorPattern {
    pub id: PatternId,
    pub pattern_type: PatternType,

    /// How often the behavior occurs relative to opportunity, in [0, 1]
    pub frequency: f32,

    /// Confidence that the pattern is real, in [0, 1]
    pub confidence: f32,

    /// Ordered conditions; an empty list matches any context
    pub conditions: Vec<ContextCondition>,

    /// Context attributes whose presence strengthens predictions
    pub predictive_features: Vec<String>,

    pub success_indicators: Vec<SuccessIndicator>,

    pub last_observed: DateTime<Utc>,
}

/// An alternative next action with its share of the predicted mass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlternativeAction {
    pub action: String,
    pub probability: f32,
}

/// Ephemeral next-action prediction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictedAction {
    pub action: String,
    pub parameters: HashMap<String, f32>,
    pub probability: f32,
    pub confidence: f32,
    pub reasoning: String,
    pub alternatives: Vec<AlternativeAction>,
}

/// Direction of a satisfaction trajectory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Improving,
    Stable,
    Declining,
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Trend::Improving => write!(f, "improving"),
            Trend::Stable => write!(f, "stable"),
            Trend::Declining => write!(f, "declining"),
        }
    }
}

/// Forward satisfaction projection on a fixed-step minute grid
///
/// The four arrays are parallel and equal-length; every confidence band
/// contains its point estimate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SatisfactionTrajectory {
    pub offsets_min: Vec<u32>,
    pub values: Vec<f32>,
    pub lower: Vec<f32>,
    pub upper: Vec<f32>,
    pub factors: Vec<String>,
}

/// Kind of adaptation strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyType {
    Gradual,
    Rapid,
    Conservative,
    Exploratory,
    Rollback,
}

impl std::fmt::Display for StrategyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StrategyType::Gradual => write!(f, "gradual"),
            StrategyType::Rapid => write!(f, "rapid"),
            StrategyType::Conservative => write!(f, "conservative"),
            StrategyType::Exploratory => write!(f, "exploratory"),
            StrategyType::Rollback => write!(f, "rollback"),
        }
    }
}

/// Risk classification for an adaptation strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub level: RiskLevel,
    pub factors: Vec<String>,
    pub mitigations: Vec<String>,
    pub rollback_probability: f32,
    pub impact_estimate: f32,
}

/// Trigger that reverts an applied strategy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollbackCondition {
    pub satisfaction_below: f32,
    pub window_minutes: u32,
    pub consecutive_failures: u32,
}

/// An adaptation plan transferred from peer outcomes. Immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaptationStrategy {
    pub id: StrategyId,
    pub strategy_type: StrategyType,
    pub parameters: HashMap<String, f32>,
    pub expected_improvement: f32,
    pub risk: RiskAssessment,
    pub rollback_conditions: Vec<RollbackCondition>,
    pub implementation_steps: Vec<String>,
    pub success_metrics: Vec<String>,
}

/// Observed result of applying a strategy to a user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaptationOutcome {
    pub strategy_id: StrategyId,
    pub strategy_type: StrategyType,
    pub success_score: f32,
    pub improvement: f32,
    pub recorded_at: DateTime<Utc>,
}

/// One past adaptation of a peer, with its recorded result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaptationRecord {
    pub strategy_type: StrategyType,
    pub parameters: HashMap<String, f32>,
    pub success_score: f32,
    pub improvement: f32,
}

/// Normalized behavioral profile used for peer similarity
///
/// All fields are expected in [0, 1]; `to_vector` is the 12-dim encoding
/// the meta-learner compares with cosine similarity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub avg_satisfaction: f32,
    pub avg_engagement: f32,
    pub avg_completion: f32,
    pub session_length: f32,
    pub interaction_rate: f32,
    pub content_diversity: f32,
    pub technical_level: f32,
    pub expertise: f32,
    pub response_length: f32,
    pub exploration_tendency: f32,
    pub weekend_activity: f32,
    pub consistency: f32,
}

impl UserProfile {
    pub fn to_vector(&self) -> [f32; 12] {
        [
            self.avg_satisfaction,
            self.avg_engagement,
            self.avg_completion,
            self.session_length,
            self.interaction_rate,
            self.content_diversity,
            self.technical_level,
            self.expertise,
            self.response_length,
            self.exploration_tendency,
            self.weekend_activity,
            self.consistency,
        ]
    }
}

/// A peer user considered for strategy transfer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerProfile {
    pub user_id: UserId,
    pub profile: UserProfile,
    pub adaptations: Vec<AdaptationRecord>,
}
