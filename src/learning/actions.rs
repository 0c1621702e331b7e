//! Next-action prediction from active behavior patterns
//!
//! Given a live context, the set of mined patterns, and the user's
//! history, estimates a distribution over likely next actions and picks
//! the best one with ranked alternatives and a justification string.
//! With no matching pattern the predictor degrades to a context-gated
//! default instead of failing.

use crate::config::ActionConfig;
use crate::math::clamp01;
use crate::types::{
    AlternativeAction, BehaviorPattern, ContextMap, PatternType, PredictedAction, UserHistory,
};
use std::collections::HashMap;
use tracing::debug;

/// Predicts the next likely user-facing action
pub struct ActionPredictor {
    cfg: ActionConfig,
}

impl ActionPredictor {
    pub fn new(cfg: ActionConfig) -> Self {
        Self { cfg }
    }

    /// Predict the next action for a context given active patterns
    pub fn predict(
        &self,
        context: &ContextMap,
        patterns: &[BehaviorPattern],
        history: &UserHistory,
    ) -> PredictedAction {
        let matching: Vec<&BehaviorPattern> = patterns
            .iter()
            .filter(|p| p.matches_context(context))
            .collect();

        if matching.is_empty() {
            return self.default_prediction(context, history);
        }

        // Accumulate strength-weighted probability mass per action,
        // preserving encounter order for stable tie-breaking.
        let mut order: Vec<String> = Vec::new();
        let mut scores: HashMap<String, f32> = HashMap::new();
        for pattern in &matching {
            let action = self.action_for(pattern);
            let probability = self.historical_success(pattern, history).unwrap_or_else(|| {
                default_probability(pattern.pattern_type)
            });
            let strength = pattern.prediction_strength(context);

            if !scores.contains_key(&action) {
                order.push(action.clone());
            }
            *scores.entry(action).or_insert(0.0) += strength * probability;
        }

        let total: f32 = scores.values().sum();
        let best = order
            .iter()
            .fold(None::<(&String, f32)>, |best, action| {
                let score = scores[action];
                match best {
                    Some((_, s)) if s >= score => best,
                    _ => Some((action, score)),
                }
            })
            .map(|(action, score)| (action.clone(), score))
            .unwrap_or_else(|| ("continue_current".to_string(), 0.0));

        let probability = if total > 0.0 {
            clamp01(best.1 / total)
        } else {
            0.0
        };
        let confidence = clamp01(probability * matching.len() as f32 / 5.0);

        let mut ranked: Vec<(&String, f32)> = order
            .iter()
            .filter(|a| **a != best.0)
            .map(|a| (a, scores[a]))
            .collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        let alternatives: Vec<AlternativeAction> = ranked
            .into_iter()
            .take(3)
            .map(|(action, score)| AlternativeAction {
                action: action.clone(),
                probability: if total > 0.0 { clamp01(score / total) } else { 0.0 },
            })
            .collect();

        let reasoning = self.reasoning(confidence, matching.len(), context);
        debug!(
            action = %best.0,
            probability,
            confidence,
            matching = matching.len(),
            "Predicted next action"
        );

        PredictedAction {
            action: best.0,
            parameters: HashMap::new(),
            probability,
            confidence,
            reasoning,
            alternatives,
        }
    }

    /// Success rate of this pattern's action under matching contexts
    ///
    /// Requires the configured minimum number of matching observations;
    /// otherwise the caller falls back to the per-type default.
    fn historical_success(
        &self,
        pattern: &BehaviorPattern,
        history: &UserHistory,
    ) -> Option<f32> {
        let outcomes: Vec<bool> = history
            .interactions
            .iter()
            .filter(|i| pattern.matches_context(&i.context))
            .map(|i| i.satisfaction > self.cfg.success_threshold)
            .collect();

        if outcomes.len() < self.cfg.min_observations {
            return None;
        }
        let successes = outcomes.iter().filter(|&&s| s).count();
        Some(successes as f32 / outcomes.len() as f32)
    }

    /// Action label a pattern argues for
    fn action_for(&self, pattern: &BehaviorPattern) -> String {
        match pattern.pattern_type {
            PatternType::Sequential => "continue_sequence".to_string(),
            PatternType::Cyclical => "resume_routine".to_string(),
            PatternType::Contextual => "adjust_difficulty".to_string(),
            PatternType::PreferenceBased => "apply_preference".to_string(),
            PatternType::Temporal => {
                let improving = pattern
                    .success_indicators
                    .iter()
                    .find(|s| s.metric == "satisfaction_trend")
                    .map(|s| s.target > 0.5)
                    .unwrap_or(true);
                if improving {
                    "continue_current".to_string()
                } else {
                    "change_approach".to_string()
                }
            }
        }
    }

    /// Context-gated default when no pattern matches
    fn default_prediction(&self, context: &ContextMap, history: &UserHistory) -> PredictedAction {
        let complexity = crate::types::context_number(context, "task_complexity").unwrap_or(0.5);
        let satisfaction = crate::types::context_number(context, "satisfaction")
            .unwrap_or_else(|| recent_satisfaction(history));

        let (action, confidence, reason) = if complexity > 0.7 {
            (
                "request_help",
                0.4,
                "no matching behavior patterns; task complexity is high",
            )
        } else if satisfaction < 0.4 {
            (
                "change_approach",
                0.35,
                "no matching behavior patterns; recent satisfaction is low",
            )
        } else {
            (
                "continue_current",
                0.3,
                "no matching behavior patterns; current approach is holding",
            )
        };

        debug!(action, "Falling back to default action prediction");
        PredictedAction {
            action: action.to_string(),
            parameters: HashMap::new(),
            probability: 0.5,
            confidence,
            reasoning: reason.to_string(),
            alternatives: Vec::new(),
        }
    }

    fn reasoning(&self, confidence: f32, matching: usize, context: &ContextMap) -> String {
        let tier = if confidence > 0.7 {
            "strong"
        } else if confidence > 0.4 {
            "moderate"
        } else {
            "weak"
        };
        let mut reasoning = format!(
            "{} support from {} matching behavior pattern{}",
            tier,
            matching,
            if matching == 1 { "" } else { "s" }
        );

        if let Some(c) = crate::types::context_number(context, "task_complexity") {
            if c > 0.7 {
                reasoning.push_str("; task complexity is high");
            }
        }
        if let Some(s) = crate::types::context_number(context, "satisfaction") {
            if s < 0.4 {
                reasoning.push_str("; recent satisfaction is low");
            }
        }
        reasoning
    }
}

/// Default probability when a pattern lacks historical observations
fn default_probability(pattern_type: PatternType) -> f32 {
    match pattern_type {
        PatternType::Sequential => 0.6,
        PatternType::Cyclical => 0.5,
        PatternType::Contextual => 0.5,
        PatternType::PreferenceBased => 0.55,
        PatternType::Temporal => 0.5,
    }
}

/// Mean satisfaction over the five most recent interactions
fn recent_satisfaction(history: &UserHistory) -> f32 {
    let n = history.interactions.len();
    if n == 0 {
        return 0.5;
    }
    let tail = &history.interactions[n.saturating_sub(5)..];
    tail.iter().map(|i| i.satisfaction).sum::<f32>() / tail.len() as f32
}
