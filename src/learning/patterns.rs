//! Behavior pattern mining over interaction history
//!
//! Five miners run over a user's history: sequential action 3-grams,
//! cyclical weekday/hour buckets, contextual complexity tiers,
//! preference-stability checks, and satisfaction-trend detection. All
//! share one minimum-occurrence threshold. Mined patterns are mutated in
//! place by observation feedback and cached per user by the engine.

use crate::config::PatternConfig;
use crate::math::{clamp01, mean, pearson};
use crate::types::{
    BehaviorPattern, ConditionOp, ContextCondition, ContextMap, ContextValue, Interaction,
    PatternId, PatternType, SuccessIndicator, UserHistory,
};
use chrono::{Datelike, Timelike, Utc};
use std::collections::HashMap;
use tracing::debug;

impl BehaviorPattern {
    /// True when every condition holds; an empty list matches any context
    pub fn matches_context(&self, context: &ContextMap) -> bool {
        self.conditions.iter().all(|c| c.holds(context))
    }

    /// How strongly this pattern predicts in the given context
    ///
    /// Zero for non-matching contexts. Otherwise frequency x confidence,
    /// scaled by how many predictive features the context carries:
    /// numeric features contribute min(1, |value|), present non-numeric
    /// features contribute 1, and a context with none present scales by
    /// the 0.5 floor alone.
    pub fn prediction_strength(&self, context: &ContextMap) -> f32 {
        if !self.matches_context(context) {
            return 0.0;
        }

        let present: Vec<f32> = self
            .predictive_features
            .iter()
            .filter_map(|f| context.get(f))
            .map(|v| match v {
                ContextValue::Number(n) => n.abs().min(1.0),
                _ => 1.0,
            })
            .collect();
        let feature_presence = if present.is_empty() {
            0.0
        } else {
            mean(&present)
        };

        clamp01(self.frequency * self.confidence * (0.5 + 0.5 * feature_presence))
    }
}

/// Mines recurring behaviors from interaction history
pub struct PatternDetector {
    cfg: PatternConfig,
}

impl PatternDetector {
    pub fn new(cfg: PatternConfig) -> Self {
        Self { cfg }
    }

    /// Run all five miners over a user's history
    pub fn detect(&self, history: &UserHistory) -> Vec<BehaviorPattern> {
        let interactions = &history.interactions;
        let mut patterns = Vec::new();

        patterns.extend(self.sequential(interactions));
        patterns.extend(self.cyclical(interactions));
        patterns.extend(self.contextual(interactions));
        patterns.extend(self.preference_based(history));
        patterns.extend(self.satisfaction_trend(interactions));

        debug!(
            user = %history.user_id,
            patterns = patterns.len(),
            "Pattern detection complete"
        );
        patterns
    }

    /// Identical 3-grams of consecutive action labels
    fn sequential(&self, interactions: &[Interaction]) -> Vec<BehaviorPattern> {
        if interactions.len() < 3 {
            return Vec::new();
        }
        let windows = interactions.len() - 2;

        let mut counts: HashMap<[&str; 3], usize> = HashMap::new();
        for w in interactions.windows(3) {
            *counts
                .entry([w[0].action.as_str(), w[1].action.as_str(), w[2].action.as_str()])
                .or_insert(0) += 1;
        }

        let mut grams: Vec<([&str; 3], usize)> = counts
            .into_iter()
            .filter(|(_, count)| *count >= self.cfg.min_occurrences)
            .collect();
        grams.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        grams
            .into_iter()
            .map(|(gram, count)| BehaviorPattern {
                id: PatternId::new(),
                pattern_type: PatternType::Sequential,
                frequency: clamp01(count as f32 / windows as f32),
                confidence: (count as f32 / 10.0).min(1.0),
                conditions: Vec::new(),
                predictive_features: vec!["recent_action".to_string()],
                success_indicators: vec![SuccessIndicator {
                    metric: "satisfaction".to_string(),
                    target: 0.6,
                }],
                last_observed: Utc::now(),
            })
            .collect()
    }

    /// Recurring weekday/hour activity buckets
    fn cyclical(&self, interactions: &[Interaction]) -> Vec<BehaviorPattern> {
        if interactions.is_empty() {
            return Vec::new();
        }
        let total = interactions.len();

        let mut buckets: HashMap<(u32, u32), usize> = HashMap::new();
        for i in interactions {
            let key = (
                i.timestamp.weekday().num_days_from_monday(),
                i.timestamp.hour(),
            );
            *buckets.entry(key).or_insert(0) += 1;
        }

        let mut dense: Vec<((u32, u32), usize)> = buckets
            .into_iter()
            .filter(|(_, count)| *count >= self.cfg.min_occurrences)
            .collect();
        dense.sort_by_key(|&(key, _)| key);

        dense
            .into_iter()
            .map(|((weekday, hour), count)| BehaviorPattern {
                id: PatternId::new(),
                pattern_type: PatternType::Cyclical,
                frequency: clamp01(count as f32 / total as f32),
                confidence: (count as f32 / 20.0).min(1.0),
                conditions: vec![
                    ContextCondition::new(
                        "day_of_week",
                        ConditionOp::Equals,
                        ContextValue::Number(weekday as f32),
                    ),
                    ContextCondition::new(
                        "time_of_day",
                        ConditionOp::Equals,
                        ContextValue::Number(hour as f32),
                    ),
                ],
                predictive_features: vec!["time_of_day".to_string(), "day_of_week".to_string()],
                success_indicators: vec![SuccessIndicator {
                    metric: "satisfaction".to_string(),
                    target: 0.6,
                }],
                last_observed: Utc::now(),
            })
            .collect()
    }

    /// Task-complexity tiers with their observed outcomes
    fn contextual(&self, interactions: &[Interaction]) -> Vec<BehaviorPattern> {
        #[derive(Default)]
        struct Tier {
            count: usize,
            completion: f32,
            duration: f32,
        }

        let mut tiers: [Tier; 3] = Default::default();
        let mut observed = 0usize;
        for i in interactions {
            let Some(complexity) = i.context_number("task_complexity") else {
                continue;
            };
            observed += 1;
            let tier = if complexity < 0.3 {
                &mut tiers[0]
            } else if complexity < 0.7 {
                &mut tiers[1]
            } else {
                &mut tiers[2]
            };
            tier.count += 1;
            tier.completion += i.completion;
            tier.duration += i.duration_secs;
        }
        if observed == 0 {
            return Vec::new();
        }

        let conditions_for = |tier: usize| -> Vec<ContextCondition> {
            match tier {
                0 => vec![ContextCondition::new(
                    "task_complexity",
                    ConditionOp::LessThan,
                    ContextValue::Number(0.3),
                )],
                1 => vec![
                    ContextCondition::new(
                        "task_complexity",
                        ConditionOp::GreaterThan,
                        ContextValue::Number(0.3),
                    ),
                    ContextCondition::new(
                        "task_complexity",
                        ConditionOp::LessThan,
                        ContextValue::Number(0.7),
                    ),
                ],
                _ => vec![ContextCondition::new(
                    "task_complexity",
                    ConditionOp::GreaterThan,
                    ContextValue::Number(0.7),
                )],
            }
        };

        tiers
            .iter()
            .enumerate()
            .filter(|(_, tier)| tier.count >= self.cfg.min_occurrences)
            .map(|(idx, tier)| {
                let n = tier.count as f32;
                BehaviorPattern {
                    id: PatternId::new(),
                    pattern_type: PatternType::Contextual,
                    frequency: clamp01(n / observed as f32),
                    confidence: (n / 15.0).min(1.0),
                    conditions: conditions_for(idx),
                    predictive_features: vec![
                        "task_complexity".to_string(),
                        "user_expertise".to_string(),
                    ],
                    success_indicators: vec![
                        SuccessIndicator {
                            metric: "completion".to_string(),
                            target: clamp01(tier.completion / n),
                        },
                        SuccessIndicator {
                            metric: "duration_minutes".to_string(),
                            target: tier.duration / n / 60.0,
                        },
                    ],
                    last_observed: Utc::now(),
                }
            })
            .collect()
    }

    /// Stable agreement between stored preferences and observed values
    fn preference_based(&self, history: &UserHistory) -> Vec<BehaviorPattern> {
        let mut keys: Vec<(&String, &f32)> = history.preferences.weights.iter().collect();
        keys.sort_by(|a, b| a.0.cmp(b.0));

        let mut patterns = Vec::new();
        for (key, &stored) in keys {
            let consistencies: Vec<f32> = history
                .interactions
                .iter()
                .filter_map(|i| i.context_number(key))
                .map(|v| clamp01(1.0 - (v - stored).abs()))
                .collect();

            if consistencies.len() < self.cfg.min_occurrences {
                continue;
            }
            let consistency = mean(&consistencies);
            if consistency <= 0.7 {
                continue;
            }

            patterns.push(BehaviorPattern {
                id: PatternId::new(),
                pattern_type: PatternType::PreferenceBased,
                frequency: clamp01(consistency),
                confidence: (consistencies.len() as f32 / 10.0).min(1.0),
                conditions: Vec::new(),
                predictive_features: vec![key.clone()],
                success_indicators: vec![SuccessIndicator {
                    metric: key.clone(),
                    target: stored,
                }],
                last_observed: Utc::now(),
            });
        }
        patterns
    }

    /// Monotone drift of satisfaction over chronological order
    fn satisfaction_trend(&self, interactions: &[Interaction]) -> Vec<BehaviorPattern> {
        if interactions.len() < self.cfg.trend_min_points {
            return Vec::new();
        }

        let indices: Vec<f32> = (0..interactions.len()).map(|i| i as f32).collect();
        let satisfactions: Vec<f32> = interactions.iter().map(|i| i.satisfaction).collect();

        let Some(r) = pearson(&indices, &satisfactions) else {
            return Vec::new();
        };
        if r.abs() <= self.cfg.trend_threshold {
            return Vec::new();
        }

        let improving = r > 0.0;
        debug!(correlation = r, improving, "Satisfaction trend detected");

        vec![BehaviorPattern {
            id: PatternId::new(),
            pattern_type: PatternType::Temporal,
            frequency: clamp01(r.abs()),
            confidence: clamp01(r.abs()),
            conditions: Vec::new(),
            predictive_features: vec!["satisfaction".to_string()],
            success_indicators: vec![SuccessIndicator {
                metric: "satisfaction_trend".to_string(),
                target: if improving { 1.0 } else { 0.0 },
            }],
            last_observed: Utc::now(),
        }]
    }

    /// Fold an observed outcome back into a mined pattern
    ///
    /// Applies only when the pattern matches the observation's context:
    /// frequency moves by EMA toward 1 (success) or 0 (failure),
    /// confidence takes a small asymmetric step, both clamped to [0, 1].
    pub fn update_from_observation(
        &self,
        pattern: &mut BehaviorPattern,
        context: &ContextMap,
        success: bool,
    ) {
        if !pattern.matches_context(context) {
            return;
        }

        let target = if success { 1.0 } else { 0.0 };
        pattern.frequency = clamp01(
            pattern.frequency + self.cfg.frequency_ema_rate * (target - pattern.frequency),
        );
        pattern.confidence = clamp01(if success {
            pattern.confidence + self.cfg.confidence_reward
        } else {
            pattern.confidence - self.cfg.confidence_penalty
        });
        pattern.last_observed = Utc::now();
    }
}
