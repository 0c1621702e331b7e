//! Preference learning from behavioral signal
//!
//! Converts raw interaction history into a preference profile: attribute
//! weights, a compressed embedding of the interaction feature space,
//! time-of-day modifiers, contextual correlation modifiers, and
//! per-attribute confidence intervals.
//!
//! `learn` is a pure function of its input batch: no side effects, and
//! identical input yields identical weights and modifiers (the embedding
//! is deterministic up to eigenvector sign convention). Empty input
//! returns the fixed neutral default. The only incremental path is the
//! EMA update in `update_preference`.

use crate::config::{EmbeddingConfig, PreferenceConfig};
use crate::math::{clamp01, column_means, covariance, jacobi_eigen, mean, pearson};
use crate::types::{ContextMap, Interaction, PreferenceModel, TemporalPreference, TimeBucket};
use chrono::{Datelike, Timelike, Utc};
use rand::Rng;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Dimensions of the per-interaction feature vector
pub const FEATURE_DIM: usize = 8;

/// Learns preference profiles from interaction batches
pub struct PreferenceLearner {
    embedding: EmbeddingConfig,
    cfg: PreferenceConfig,
}

impl PreferenceLearner {
    pub fn new(embedding: EmbeddingConfig, cfg: PreferenceConfig) -> Self {
        Self { embedding, cfg }
    }

    /// Learn a full preference model from an interaction batch
    pub fn learn(&self, interactions: &[Interaction]) -> PreferenceModel {
        if interactions.is_empty() {
            debug!("Empty interaction batch, returning neutral preference model");
            return PreferenceModel::neutral(self.embedding.dimension);
        }

        let features: Vec<Vec<f32>> = interactions.iter().map(feature_vector).collect();
        let embedding = self.embed(&features);
        let weights = self.attribute_weights(interactions);
        let temporal = self.temporal_preferences(interactions);
        let context_modifiers = self.context_modifiers(interactions);
        let intervals = self.confidence_intervals(&weights);

        debug!(
            interactions = interactions.len(),
            temporal = temporal.len(),
            modifiers = context_modifiers.len(),
            "Learned preference model"
        );

        PreferenceModel {
            embedding,
            weights,
            temporal,
            context_modifiers,
            intervals,
            updated_at: Utc::now(),
        }
    }

    /// Compress the feature matrix into a single embedding vector
    ///
    /// Mean-centers the matrix, eigendecomposes its covariance, projects
    /// the rows onto the leading eigenvectors, and averages the projected
    /// rows. A single-row batch has no covariance structure; it falls
    /// back to a small random vector.
    fn embed(&self, features: &[Vec<f32>]) -> Vec<f32> {
        let dim = self.embedding.dimension;

        if features.len() < 2 {
            warn!("Single-interaction batch, embedding falls back to random initialization");
            let mut rng = rand::thread_rng();
            return (0..dim).map(|_| rng.gen_range(-0.01..0.01)).collect();
        }

        let means = column_means(features);
        let centered: Vec<Vec<f32>> = features
            .iter()
            .map(|row| row.iter().zip(means.iter()).map(|(v, m)| v - m).collect())
            .collect();

        let cov = covariance(&centered);
        let (_eigenvalues, eigenvectors) = jacobi_eigen(&cov);

        let components = dim.min(FEATURE_DIM);
        let mut pooled = vec![0.0f32; dim];
        for row in features {
            for (slot, axis) in pooled.iter_mut().zip(eigenvectors.iter().take(components)) {
                *slot += crate::math::dot(row, axis);
            }
        }
        for slot in &mut pooled {
            *slot /= features.len() as f32;
        }
        pooled
    }

    /// Compute the six attribute weights, each clamped to [0, 1]
    fn attribute_weights(&self, interactions: &[Interaction]) -> HashMap<String, f32> {
        let satisfactions: Vec<f32> = interactions.iter().map(|i| i.satisfaction).collect();
        let engagements: Vec<f32> = interactions.iter().map(|i| i.engagement).collect();

        // Length preference follows the single best-rated interaction
        let best = interactions
            .iter()
            .fold(&interactions[0], |best, i| {
                if i.satisfaction > best.satisfaction {
                    i
                } else {
                    best
                }
            });
        let response_length = clamp01(best.duration_secs / 3600.0);

        let technical_detail = mean(
            &interactions
                .iter()
                .map(|i| i.context_number("technical_level").unwrap_or(0.5) * i.satisfaction)
                .collect::<Vec<_>>(),
        );

        let interaction_style = mean(
            &interactions
                .iter()
                .map(|i| {
                    let formality = i.context_number("formality").unwrap_or(0.5);
                    let friendliness = i.context_number("friendliness").unwrap_or(0.5);
                    (formality + friendliness) / 2.0 * i.satisfaction
                })
                .collect::<Vec<_>>(),
        );

        let diversity_samples: Vec<f32> = interactions
            .iter()
            .filter(|i| !i.content.is_empty())
            .map(|i| {
                let unique: std::collections::HashSet<&str> =
                    i.content.iter().map(|c| c.kind.as_str()).collect();
                unique.len() as f32 / i.content.len() as f32 * i.satisfaction
            })
            .collect();
        let content_type = if diversity_samples.is_empty() {
            0.5
        } else {
            mean(&diversity_samples)
        };

        let mut weights = HashMap::new();
        weights.insert("response_length".to_string(), response_length);
        weights.insert("technical_detail".to_string(), clamp01(technical_detail));
        weights.insert("interaction_style".to_string(), clamp01(interaction_style));
        weights.insert("content_type".to_string(), clamp01(content_type));
        weights.insert("explanation_depth".to_string(), clamp01(mean(&satisfactions)));
        weights.insert("engagement_level".to_string(), clamp01(mean(&engagements)));
        weights
    }

    /// Bucket satisfaction by time of day, weekend overriding weekday hours
    fn temporal_preferences(&self, interactions: &[Interaction]) -> Vec<TemporalPreference> {
        let mut buckets: HashMap<TimeBucket, (usize, f32)> = HashMap::new();
        for i in interactions {
            let entry = buckets
                .entry(TimeBucket::from_timestamp(i.timestamp))
                .or_insert((0, 0.0));
            entry.0 += 1;
            entry.1 += i.satisfaction;
        }

        let mut prefs: Vec<TemporalPreference> = buckets
            .into_iter()
            .filter(|(_, (count, _))| *count >= self.cfg.min_bucket_size)
            .map(|(bucket, (count, sum))| TemporalPreference {
                attribute: "explanation_depth".to_string(),
                bucket,
                value: clamp01(sum / count as f32),
                confidence: (count as f32 / 10.0).min(1.0),
            })
            .collect();
        prefs.sort_by_key(|p| p.bucket as u8);
        prefs
    }

    /// Correlate numeric context attributes against satisfaction
    ///
    /// Keys seen in fewer interactions than the sample floor are skipped,
    /// as are zero-variance series (undefined correlation).
    fn context_modifiers(&self, interactions: &[Interaction]) -> HashMap<String, f32> {
        let mut samples: HashMap<String, (Vec<f32>, Vec<f32>)> = HashMap::new();
        for i in interactions {
            for (key, value) in &i.context {
                if let Some(n) = value.as_number() {
                    let entry = samples.entry(key.clone()).or_default();
                    entry.0.push(n);
                    entry.1.push(i.satisfaction);
                }
            }
        }

        let mut modifiers = HashMap::new();
        for (key, (values, sats)) in samples {
            if values.len() < self.cfg.min_context_samples {
                continue;
            }
            match pearson(&values, &sats) {
                Some(r) => {
                    modifiers.insert(key, r * 0.5);
                }
                None => {
                    debug!(key = %key, "Zero-variance context attribute, skipping modifier");
                }
            }
        }
        modifiers
    }

    /// Confidence interval per weight, widened near the extremes
    fn confidence_intervals(&self, weights: &HashMap<String, f32>) -> HashMap<String, (f32, f32)> {
        weights
            .iter()
            .map(|(key, &w)| {
                let cutoff = self.cfg.extreme_weight_cutoff;
                let half = if w < cutoff || w > 1.0 - cutoff {
                    self.cfg.wide_interval_half_width
                } else {
                    self.cfg.interval_half_width
                };
                (key.clone(), (clamp01(w - half), clamp01(w + half)))
            })
            .collect()
    }

    /// Blend a new observation into a stored preference weight
    ///
    /// EMA keyed by the observation's confidence: full confidence
    /// replaces the stored value outright, zero confidence is a no-op.
    pub fn update_preference(
        &self,
        model: &mut PreferenceModel,
        key: &str,
        new_value: f32,
        confidence: f32,
    ) {
        let c = clamp01(confidence);
        let v = clamp01(new_value);
        match model.weights.get_mut(key) {
            Some(stored) => {
                *stored = *stored * (1.0 - c) + v * c;
            }
            None => {
                model.weights.insert(key.to_string(), v);
            }
        }
        model.updated_at = Utc::now();
    }

    /// Stored weight adjusted for a live context
    ///
    /// Applies contextual correlation modifiers scaled by the matching
    /// context attribute's strength, then blends in a matching temporal
    /// preference by its confidence. Result is clamped to [0, 1].
    pub fn preference_for_context(
        &self,
        model: &PreferenceModel,
        key: &str,
        context: &ContextMap,
    ) -> f32 {
        let mut value = model.weights.get(key).copied().unwrap_or(0.5);

        for (ctx_key, modifier) in &model.context_modifiers {
            if let Some(strength) = crate::types::context_number(context, ctx_key) {
                value *= 1.0 + modifier * strength;
            }
        }

        if let Some(bucket) = TimeBucket::from_context(context) {
            for tp in &model.temporal {
                if tp.attribute == key && tp.bucket == bucket {
                    value = value * (1.0 - tp.confidence) + tp.value * tp.confidence;
                }
            }
        }

        clamp01(value)
    }
}

/// Extract the 8-dim feature vector for one interaction
fn feature_vector(i: &Interaction) -> Vec<f32> {
    let session_length = i
        .context_number("session_length")
        .map(|m| (m / 240.0).min(1.0))
        .unwrap_or_else(|| (i.duration_secs / 3600.0).min(1.0));

    vec![
        (i.duration_secs / 3600.0).min(1.0),
        i.satisfaction,
        i.engagement,
        i.completion,
        (i.content.len() as f32 / 10.0).min(1.0),
        i.timestamp.hour() as f32 / 24.0,
        i.timestamp.weekday().num_days_from_monday() as f32 / 7.0,
        session_length,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ContentDescriptor, ContextValue, PREFERENCE_ATTRIBUTES};
    use chrono::{Duration, TimeZone, Utc};

    fn learner() -> PreferenceLearner {
        PreferenceLearner::new(EmbeddingConfig::default(), PreferenceConfig::default())
    }

    fn small_learner(dim: usize) -> PreferenceLearner {
        PreferenceLearner::new(EmbeddingConfig { dimension: dim }, PreferenceConfig::default())
    }

    fn weekday_interaction(hour: u32, satisfaction: f32) -> Interaction {
        // 2026-08-03 is a Monday
        let ts = Utc.with_ymd_and_hms(2026, 8, 3, hour, 0, 0).unwrap();
        let mut i = Interaction::new("search", ts);
        i.satisfaction = satisfaction;
        i.engagement = 0.6;
        i.completion = 0.8;
        i.duration_secs = 600.0;
        i
    }

    #[test]
    fn test_empty_batch_returns_neutral_default() {
        let model = learner().learn(&[]);
        for attr in PREFERENCE_ATTRIBUTES {
            assert_eq!(model.weight(attr), Some(0.5));
            assert_eq!(model.intervals[attr], (0.3, 0.7));
        }
        assert_eq!(model.embedding.len(), 128);
        assert!(model.embedding.iter().all(|&v| v == 0.0));
        assert!(model.temporal.is_empty());
        assert!(model.context_modifiers.is_empty());
    }

    #[test]
    fn test_weights_and_intervals_in_unit_range() {
        let interactions: Vec<Interaction> = (0..12)
            .map(|k| weekday_interaction(9 + (k % 8), 0.2 + 0.06 * k as f32))
            .collect();
        let model = learner().learn(&interactions);

        for attr in PREFERENCE_ATTRIBUTES {
            let w = model.weight(attr).unwrap();
            assert!((0.0..=1.0).contains(&w), "{} out of range: {}", attr, w);
            let (lo, hi) = model.intervals[attr];
            assert!(lo <= hi);
            assert!((0.0..=1.0).contains(&lo) && (0.0..=1.0).contains(&hi));
        }
    }

    #[test]
    fn test_weight_computation_is_deterministic() {
        let interactions: Vec<Interaction> = (0..6)
            .map(|k| weekday_interaction(10 + k, 0.3 + 0.1 * k as f32))
            .collect();
        let a = learner().learn(&interactions);
        let b = learner().learn(&interactions);
        assert_eq!(a.weights, b.weights);
        assert_eq!(a.context_modifiers, b.context_modifiers);
    }

    #[test]
    fn test_explanation_depth_is_mean_satisfaction() {
        let interactions = vec![
            weekday_interaction(9, 0.4),
            weekday_interaction(10, 0.6),
            weekday_interaction(11, 0.8),
        ];
        let model = learner().learn(&interactions);
        assert!((model.weight("explanation_depth").unwrap() - 0.6).abs() < 1e-5);
    }

    #[test]
    fn test_response_length_tracks_best_interaction() {
        let mut short = weekday_interaction(9, 0.9);
        short.duration_secs = 900.0; // 15 minutes
        let mut long = weekday_interaction(10, 0.3);
        long.duration_secs = 3600.0;

        let model = learner().learn(&[short, long]);
        assert!((model.weight("response_length").unwrap() - 0.25).abs() < 1e-5);
    }

    #[test]
    fn test_content_diversity_weight() {
        let mut i = weekday_interaction(9, 1.0);
        i.content = vec![
            ContentDescriptor::new("summary"),
            ContentDescriptor::new("citation"),
            ContentDescriptor::new("summary"),
            ContentDescriptor::new("code"),
        ];
        let bare = weekday_interaction(10, 0.5);

        // Only the interaction with descriptors contributes: 3 unique / 4 * 1.0
        let model = learner().learn(&[i, bare]);
        assert!((model.weight("content_type").unwrap() - 0.75).abs() < 1e-5);
    }

    #[test]
    fn test_temporal_preference_emitted_for_dense_bucket() {
        let interactions: Vec<Interaction> = (0..4)
            .map(|k| weekday_interaction(9, 0.8 - 0.1 * k as f32))
            .collect();
        let model = learner().learn(&interactions);

        let morning = model
            .temporal
            .iter()
            .find(|p| p.bucket == TimeBucket::Morning)
            .expect("morning bucket with 4 interactions should emit");
        assert!((morning.value - 0.65).abs() < 1e-5);
        assert!((morning.confidence - 0.4).abs() < 1e-5);
    }

    #[test]
    fn test_sparse_bucket_emits_nothing() {
        let interactions = vec![weekday_interaction(9, 0.8), weekday_interaction(20, 0.4)];
        let model = learner().learn(&interactions);
        assert!(model.temporal.is_empty());
    }

    #[test]
    fn test_contextual_modifier_sign_follows_correlation() {
        let mut interactions = Vec::new();
        for k in 0..6 {
            let mut i = weekday_interaction(9 + k, 0.2 + 0.12 * k as f32);
            // complexity rises with satisfaction -> positive correlation
            i.context.insert(
                "task_complexity".to_string(),
                ContextValue::Number(0.1 + 0.1 * k as f32),
            );
            interactions.push(i);
        }
        let model = learner().learn(&interactions);

        let modifier = model.context_modifiers["task_complexity"];
        assert!(modifier > 0.0);
        assert!(modifier <= 0.5);
    }

    #[test]
    fn test_zero_variance_context_key_is_skipped() {
        let mut interactions = Vec::new();
        for k in 0..5 {
            let mut i = weekday_interaction(9, 0.3 + 0.1 * k as f32);
            i.context
                .insert("user_expertise".to_string(), ContextValue::Number(0.5));
            interactions.push(i);
        }
        let model = learner().learn(&interactions);
        assert!(!model.context_modifiers.contains_key("user_expertise"));
    }

    #[test]
    fn test_interval_widened_for_extreme_weights() {
        let interactions = vec![
            weekday_interaction(9, 0.05),
            weekday_interaction(10, 0.05),
        ];
        let model = learner().learn(&interactions);

        // explanation_depth = 0.05 < 0.2, gets the wide half-width
        let (lo, hi) = model.intervals["explanation_depth"];
        assert_eq!(lo, 0.0); // clamped
        assert!((hi - 0.2).abs() < 1e-5);
    }

    #[test]
    fn test_single_interaction_embedding_fallback() {
        let model = small_learner(16).learn(&[weekday_interaction(9, 0.7)]);
        assert_eq!(model.embedding.len(), 16);
        assert!(model.embedding.iter().any(|&v| v != 0.0));
        assert!(model.embedding.iter().all(|&v| v.abs() < 0.01));
    }

    #[test]
    fn test_embedding_zero_pads_beyond_feature_rank() {
        let interactions: Vec<Interaction> = (0..5)
            .map(|k| weekday_interaction(9 + k, 0.3 + 0.1 * k as f32))
            .collect();
        let model = small_learner(12).learn(&interactions);
        assert_eq!(model.embedding.len(), 12);
        // Only FEATURE_DIM components can carry signal
        assert!(model.embedding[FEATURE_DIM..].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_update_preference_full_confidence_replaces() {
        let mut model = learner().learn(&[]);
        learner().update_preference(&mut model, "response_length", 0.9, 1.0);
        assert_eq!(model.weight("response_length"), Some(0.9));
    }

    #[test]
    fn test_update_preference_blends_by_confidence() {
        let mut model = learner().learn(&[]);
        learner().update_preference(&mut model, "technical_detail", 1.0, 0.4);
        // 0.5 * 0.6 + 1.0 * 0.4
        assert!((model.weight("technical_detail").unwrap() - 0.7).abs() < 1e-5);
    }

    #[test]
    fn test_update_preference_inserts_new_key() {
        let mut model = learner().learn(&[]);
        learner().update_preference(&mut model, "citation_density", 0.8, 0.2);
        assert_eq!(model.weight("citation_density"), Some(0.8));
    }

    #[test]
    fn test_update_preference_refreshes_timestamp() {
        let mut model = learner().learn(&[]);
        model.updated_at = Utc::now() - Duration::hours(2);
        let before = model.updated_at;
        learner().update_preference(&mut model, "response_length", 0.6, 0.5);
        assert!(model.updated_at > before);
    }

    #[test]
    fn test_preference_for_context_applies_modifier_and_temporal() {
        let mut model = learner().learn(&[]);
        model.weights.insert("explanation_depth".to_string(), 0.5);
        model
            .context_modifiers
            .insert("task_complexity".to_string(), 0.4);
        model.temporal.push(TemporalPreference {
            attribute: "explanation_depth".to_string(),
            bucket: TimeBucket::Morning,
            value: 0.9,
            confidence: 0.5,
        });

        let mut ctx = ContextMap::new();
        ctx.insert("task_complexity".to_string(), ContextValue::Number(0.5));
        ctx.insert("time_of_day".to_string(), ContextValue::Number(9.0));
        ctx.insert("day_of_week".to_string(), ContextValue::Number(1.0));

        // modifier: 0.5 * (1 + 0.4*0.5) = 0.6; temporal: 0.6*0.5 + 0.9*0.5 = 0.75
        let value = learner().preference_for_context(&model, "explanation_depth", &ctx);
        assert!((value - 0.75).abs() < 1e-5);
    }

    #[test]
    fn test_preference_for_context_clamps() {
        let mut model = learner().learn(&[]);
        model.weights.insert("engagement_level".to_string(), 0.9);
        model
            .context_modifiers
            .insert("engagement_score".to_string(), 0.5);

        let mut ctx = ContextMap::new();
        ctx.insert("engagement_score".to_string(), ContextValue::Number(1.0));

        let value = learner().preference_for_context(&model, "engagement_level", &ctx);
        assert!(value <= 1.0);
    }
}
