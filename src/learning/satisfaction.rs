//! Multi-horizon satisfaction forecasting
//!
//! Projects satisfaction forward on a fixed five-minute grid, combining a
//! recency-weighted baseline with session drift, context pressure,
//! fatigue, and engagement adjustments. Every step carries a confidence
//! band that widens with the horizon.

use crate::config::SatisfactionConfig;
use crate::math::{clamp01, mean, recency_weighted_mean};
use crate::types::{ContextMap, SatisfactionTrajectory, Trend, UserHistory};
use chrono::{Duration, Utc};
use tracing::debug;

impl SatisfactionTrajectory {
    /// Compare the opening and closing of the trajectory
    pub fn trend(&self) -> Trend {
        if self.values.len() < 2 {
            return Trend::Stable;
        }
        let head = mean(&self.values[..2.min(self.values.len())]);
        let tail = mean(&self.values[self.values.len().saturating_sub(2)..]);
        let delta = tail - head;
        if delta > 0.1 {
            Trend::Improving
        } else if delta < -0.1 {
            Trend::Declining
        } else {
            Trend::Stable
        }
    }

    /// Linearly interpolated satisfaction at an arbitrary minute offset
    ///
    /// Offsets outside the grid clamp to the nearest endpoint.
    pub fn satisfaction_at(&self, minute: f32) -> f32 {
        if self.values.is_empty() {
            return 0.5;
        }
        let first = self.offsets_min[0] as f32;
        let last = *self.offsets_min.last().unwrap() as f32;
        if minute <= first {
            return self.values[0];
        }
        if minute >= last {
            return *self.values.last().unwrap();
        }

        for w in 0..self.offsets_min.len() - 1 {
            let left = self.offsets_min[w] as f32;
            let right = self.offsets_min[w + 1] as f32;
            if minute >= left && minute <= right {
                let fraction = (minute - left) / (right - left);
                return self.values[w] + (self.values[w + 1] - self.values[w]) * fraction;
            }
        }
        *self.values.last().unwrap()
    }
}

/// Projects satisfaction over a bounded horizon
pub struct SatisfactionPredictor {
    cfg: SatisfactionConfig,
}

impl SatisfactionPredictor {
    pub fn new(cfg: SatisfactionConfig) -> Self {
        Self { cfg }
    }

    /// Predict a satisfaction trajectory out to `horizon_minutes`
    pub fn predict_trajectory(
        &self,
        history: &UserHistory,
        context: &ContextMap,
        horizon_minutes: u32,
    ) -> SatisfactionTrajectory {
        let baseline = self.baseline(history);
        let engagement = crate::types::context_number(context, "engagement_score").unwrap_or(0.5);
        let complexity = crate::types::context_number(context, "task_complexity");
        let expertise = crate::types::context_number(context, "user_expertise");
        let support = crate::types::context_number(context, "support_available");

        let session_slope = if history.sessions.is_empty() {
            None
        } else {
            Some(mean(
                &history
                    .sessions
                    .iter()
                    .map(|s| s.satisfaction_slope())
                    .collect::<Vec<_>>(),
            ))
        };

        let mut offsets_min = Vec::new();
        let mut values = Vec::new();
        let mut lower = Vec::new();
        let mut upper = Vec::new();

        let mut offset = 0u32;
        while offset <= horizon_minutes {
            let t = offset as f32;

            let time_factor = match session_slope {
                None => 1.0,
                Some(slope) => (1.0 + slope * t).clamp(0.5, 1.5),
            };

            let mut context_factor: f32 = 1.0;
            if let Some(c) = complexity {
                if c > 0.7 {
                    context_factor *= 1.0 - t / 120.0 * 0.2;
                } else if c < 0.3 {
                    context_factor *= 1.1;
                }
            }
            if let Some(e) = expertise {
                if e > 0.7 {
                    context_factor *= 1.1;
                } else if e < 0.3 {
                    context_factor *= 1.0 - t / 60.0 * 0.1;
                }
            }
            if support == Some(0.0) {
                context_factor *= 0.9;
            }
            let context_factor = context_factor.clamp(0.5, 1.5);

            let fatigue_factor = (1.0 - (t / 120.0) * 0.3).max(0.7);

            let mut value = baseline * time_factor * context_factor * fatigue_factor;
            if engagement > 0.7 {
                value *= 1.0 + (engagement - 0.7) * 0.2;
            }
            let value = clamp01(value);

            let half_width = clamp01(0.1 + (t / 60.0) * 0.1);
            offsets_min.push(offset);
            values.push(value);
            lower.push(clamp01(value - half_width));
            upper.push(clamp01(value + half_width));

            offset += self.cfg.step_minutes;
        }

        let factors = self.influencing_factors(history, context, horizon_minutes, engagement);
        debug!(
            baseline,
            steps = values.len(),
            horizon_minutes,
            "Projected satisfaction trajectory"
        );

        SatisfactionTrajectory {
            offsets_min,
            values,
            lower,
            upper,
            factors,
        }
    }

    /// Recency-weighted satisfaction baseline
    ///
    /// Prefers the last 24 hours; an empty window falls back to the full
    /// history, and an empty history to the neutral 0.5.
    fn baseline(&self, history: &UserHistory) -> f32 {
        let cutoff = Utc::now() - Duration::hours(24);
        let recent: Vec<f32> = history
            .interactions
            .iter()
            .filter(|i| i.timestamp >= cutoff)
            .map(|i| i.satisfaction)
            .collect();

        let series = if recent.is_empty() {
            history
                .interactions
                .iter()
                .map(|i| i.satisfaction)
                .collect()
        } else {
            recent
        };

        if series.is_empty() {
            return 0.5;
        }
        clamp01(recency_weighted_mean(&series, 0.5))
    }

    fn influencing_factors(
        &self,
        history: &UserHistory,
        context: &ContextMap,
        horizon_minutes: u32,
        engagement: f32,
    ) -> Vec<String> {
        let mut factors = Vec::new();

        let recent: Vec<f32> = history
            .interactions
            .iter()
            .rev()
            .take(5)
            .map(|i| i.satisfaction)
            .collect();
        if !recent.is_empty() {
            let m = mean(&recent);
            if m < 0.4 {
                factors.push("low_recent_satisfaction".to_string());
            } else if m > 0.7 {
                factors.push("high_recent_satisfaction".to_string());
            }
        }

        if let Some(c) = crate::types::context_number(context, "task_complexity") {
            if c > 0.7 {
                factors.push("high_task_complexity".to_string());
            } else if c < 0.3 {
                factors.push("low_task_complexity".to_string());
            }
        }
        if let Some(e) = crate::types::context_number(context, "user_expertise") {
            if e > 0.7 {
                factors.push("experienced_user".to_string());
            } else if e < 0.3 {
                factors.push("novice_user".to_string());
            }
        }
        if let Some(p) = crate::types::context_number(context, "time_pressure") {
            if p > 0.5 {
                factors.push("time_pressure".to_string());
            }
        }
        if crate::types::context_number(context, "support_available") == Some(0.0) {
            factors.push("no_support_available".to_string());
        }
        if horizon_minutes > 30 {
            factors.push("fatigue_accumulation".to_string());
        }
        if engagement > 0.7 {
            factors.push("high_engagement".to_string());
        }

        factors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ContextValue, Interaction, Session, UserId};
    use chrono::Utc;

    fn predictor() -> SatisfactionPredictor {
        SatisfactionPredictor::new(SatisfactionConfig::default())
    }

    fn history_with_satisfaction(values: &[f32]) -> UserHistory {
        let mut history = UserHistory::new(UserId::new("u-1"));
        let now = Utc::now();
        for (k, &s) in values.iter().enumerate() {
            let mut i = Interaction::new("search", now - Duration::minutes(values.len() as i64 - k as i64));
            i.satisfaction = s;
            history.push(i);
        }
        history
    }

    #[test]
    fn test_trajectory_arrays_are_parallel() {
        let history = history_with_satisfaction(&[0.6, 0.7, 0.8]);
        let t = predictor().predict_trajectory(&history, &ContextMap::new(), 60);

        assert_eq!(t.offsets_min.len(), 13); // 0..=60 in steps of 5
        assert_eq!(t.values.len(), t.offsets_min.len());
        assert_eq!(t.lower.len(), t.offsets_min.len());
        assert_eq!(t.upper.len(), t.offsets_min.len());
        assert_eq!(t.offsets_min[0], 0);
        assert_eq!(*t.offsets_min.last().unwrap(), 60);
    }

    #[test]
    fn test_bands_contain_point_estimates() {
        let history = history_with_satisfaction(&[0.3, 0.9, 0.5, 0.7]);
        let mut ctx = ContextMap::new();
        ctx.insert("task_complexity".to_string(), ContextValue::Number(0.9));
        ctx.insert("user_expertise".to_string(), ContextValue::Number(0.2));

        let t = predictor().predict_trajectory(&history, &ctx, 90);
        for k in 0..t.values.len() {
            assert!(t.lower[k] <= t.values[k], "band floor above value at {}", k);
            assert!(t.upper[k] >= t.values[k], "band ceiling below value at {}", k);
            assert!((0.0..=1.0).contains(&t.values[k]));
        }
    }

    #[test]
    fn test_empty_history_uses_neutral_baseline() {
        let history = UserHistory::new(UserId::new("u-1"));
        let t = predictor().predict_trajectory(&history, &ContextMap::new(), 60);
        assert!((t.values[0] - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_fatigue_erodes_satisfaction_over_time() {
        let history = history_with_satisfaction(&[0.8, 0.8, 0.8]);
        let t = predictor().predict_trajectory(&history, &ContextMap::new(), 120);
        // No context pressure, no sessions: only fatigue acts
        assert!(t.values[0] > *t.values.last().unwrap());
        // Fatigue floors at 0.7x
        assert!(*t.values.last().unwrap() >= 0.8 * 0.7 - 1e-5);
    }

    #[test]
    fn test_engagement_boost_applies_above_threshold() {
        let history = history_with_satisfaction(&[0.6, 0.6]);
        let mut engaged = ContextMap::new();
        engaged.insert("engagement_score".to_string(), ContextValue::Number(0.9));

        let base = predictor().predict_trajectory(&history, &ContextMap::new(), 30);
        let boosted = predictor().predict_trajectory(&history, &engaged, 30);
        assert!(boosted.values[0] > base.values[0]);
    }

    #[test]
    fn test_missing_support_penalizes() {
        let history = history_with_satisfaction(&[0.6, 0.6]);
        let mut ctx = ContextMap::new();
        ctx.insert("support_available".to_string(), ContextValue::Flag(false));

        let with_support = predictor().predict_trajectory(&history, &ContextMap::new(), 30);
        let without = predictor().predict_trajectory(&history, &ctx, 30);
        assert!(without.values[0] < with_support.values[0]);
        assert!(without.factors.contains(&"no_support_available".to_string()));
    }

    #[test]
    fn test_session_drift_shapes_time_factor() {
        let mut history = history_with_satisfaction(&[0.6, 0.6]);
        let now = Utc::now();
        history.sessions.push(Session {
            started_at: now,
            ended_at: now,
            start_satisfaction: 0.2,
            end_satisfaction: 0.8,
            duration_secs: 600.0, // slope +0.06/minute
            completion_rate: 1.0,
        });

        let t = predictor().predict_trajectory(&history, &ContextMap::new(), 60);
        // Rising sessions push later steps up until the 1.5x clamp
        assert!(t.values[2] > t.values[0]);
    }

    #[test]
    fn test_trend_stable_for_constant_values() {
        let t = SatisfactionTrajectory {
            offsets_min: vec![0, 5, 10, 15],
            values: vec![0.6, 0.6, 0.6, 0.6],
            lower: vec![0.5; 4],
            upper: vec![0.7; 4],
            factors: Vec::new(),
        };
        assert_eq!(t.trend(), Trend::Stable);
    }

    #[test]
    fn test_trend_improving_and_declining() {
        let rising = SatisfactionTrajectory {
            offsets_min: vec![0, 5, 10, 15],
            values: vec![0.2, 0.3, 0.7, 0.8],
            lower: vec![0.1; 4],
            upper: vec![0.9; 4],
            factors: Vec::new(),
        };
        assert_eq!(rising.trend(), Trend::Improving);

        let falling = SatisfactionTrajectory {
            offsets_min: vec![0, 5, 10, 15],
            values: vec![0.8, 0.7, 0.3, 0.2],
            lower: vec![0.1; 4],
            upper: vec![0.9; 4],
            factors: Vec::new(),
        };
        assert_eq!(falling.trend(), Trend::Declining);
    }

    #[test]
    fn test_satisfaction_at_interpolates() {
        let t = SatisfactionTrajectory {
            offsets_min: vec![0, 5, 10],
            values: vec![0.4, 0.6, 0.8],
            lower: vec![0.3; 3],
            upper: vec![0.9; 3],
            factors: Vec::new(),
        };
        assert!((t.satisfaction_at(2.5) - 0.5).abs() < 1e-5);
        assert!((t.satisfaction_at(7.5) - 0.7).abs() < 1e-5);
        // Grid points return their stored values
        assert!((t.satisfaction_at(5.0) - 0.6).abs() < 1e-5);
        // Out-of-range offsets clamp to the endpoints
        assert!((t.satisfaction_at(-10.0) - 0.4).abs() < 1e-5);
        assert!((t.satisfaction_at(100.0) - 0.8).abs() < 1e-5);
    }

    #[test]
    fn test_band_width_grows_with_horizon() {
        let history = history_with_satisfaction(&[0.5, 0.5, 0.5]);
        let t = predictor().predict_trajectory(&history, &ContextMap::new(), 60);
        let early = t.upper[0] - t.lower[0];
        let late = t.upper[t.upper.len() - 1] - t.lower[t.lower.len() - 1];
        assert!(late >= early);
    }

    #[test]
    fn test_factor_labels_from_thresholds() {
        let history = history_with_satisfaction(&[0.2, 0.2, 0.3]);
        let mut ctx = ContextMap::new();
        ctx.insert("task_complexity".to_string(), ContextValue::Number(0.9));
        ctx.insert("user_expertise".to_string(), ContextValue::Number(0.1));
        ctx.insert("time_pressure".to_string(), ContextValue::Number(0.8));
        ctx.insert("engagement_score".to_string(), ContextValue::Number(0.9));

        let t = predictor().predict_trajectory(&history, &ctx, 60);
        assert!(t.factors.contains(&"low_recent_satisfaction".to_string()));
        assert!(t.factors.contains(&"high_task_complexity".to_string()));
        assert!(t.factors.contains(&"novice_user".to_string()));
        assert!(t.factors.contains(&"time_pressure".to_string()));
        assert!(t.factors.contains(&"fatigue_accumulation".to_string()));
        assert!(t.factors.contains(&"high_engagement".to_string()));
    }
}
