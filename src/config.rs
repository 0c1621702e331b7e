//! Configuration for the personalization core
//!
//! Every numeric constant the algorithms depend on (thresholds, learning
//! rates, decay factors) is surfaced here as a configuration default so
//! behavioral-parity tests can pin the exact values while deployments
//! remain free to tune them.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Main personalization configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonalizationConfig {
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub preferences: PreferenceConfig,

    #[serde(default)]
    pub patterns: PatternConfig,

    #[serde(default)]
    pub actions: ActionConfig,

    #[serde(default)]
    pub satisfaction: SatisfactionConfig,

    #[serde(default)]
    pub bandit: BanditConfig,

    #[serde(default)]
    pub meta: MetaConfig,

    /// Per-user pattern cache capacity (users, not patterns)
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

fn default_cache_capacity() -> usize {
    1024
}

impl Default for PersonalizationConfig {
    fn default() -> Self {
        Self {
            embedding: EmbeddingConfig::default(),
            preferences: PreferenceConfig::default(),
            patterns: PatternConfig::default(),
            actions: ActionConfig::default(),
            satisfaction: SatisfactionConfig::default(),
            bandit: BanditConfig::default(),
            meta: MetaConfig::default(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

/// Embedding extraction settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Output embedding dimension
    pub dimension: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self { dimension: 128 }
    }
}

/// Preference learner settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferenceConfig {
    /// Minimum interactions per time bucket before a temporal preference is emitted
    pub min_bucket_size: usize,

    /// Minimum samples of a context key before correlating it with satisfaction
    pub min_context_samples: usize,

    /// Confidence interval half-width for mid-range weights
    pub interval_half_width: f32,

    /// Half-width for extreme weights (below/above the cutoff band)
    pub wide_interval_half_width: f32,

    /// Weights outside [cutoff, 1 - cutoff] get the wide interval
    pub extreme_weight_cutoff: f32,
}

impl Default for PreferenceConfig {
    fn default() -> Self {
        Self {
            min_bucket_size: 3,
            min_context_samples: 3,
            interval_half_width: 0.1,
            wide_interval_half_width: 0.15,
            extreme_weight_cutoff: 0.2,
        }
    }
}

/// Pattern detector settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternConfig {
    /// Minimum occurrences before a recurring behavior becomes a pattern
    pub min_occurrences: usize,

    /// Pattern cache freshness window (seconds)
    #[serde(with = "serde_duration")]
    pub cache_ttl: Duration,

    /// EMA rate for frequency feedback updates
    pub frequency_ema_rate: f32,

    /// Confidence delta on a successful observation
    pub confidence_reward: f32,

    /// Confidence delta on a failed observation
    pub confidence_penalty: f32,

    /// Minimum satisfaction points before trend mining runs
    pub trend_min_points: usize,

    /// Absolute correlation below which no trend pattern is emitted
    pub trend_threshold: f32,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            min_occurrences: 3,
            cache_ttl: Duration::from_secs(3600),
            frequency_ema_rate: 0.1,
            confidence_reward: 0.05,
            confidence_penalty: 0.02,
            trend_min_points: 10,
            trend_threshold: 0.3,
        }
    }
}

/// Action predictor settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionConfig {
    /// Observations required before historical success replaces the per-type default
    pub min_observations: usize,

    /// Satisfaction above this counts as a successful outcome
    pub success_threshold: f32,
}

impl Default for ActionConfig {
    fn default() -> Self {
        Self {
            min_observations: 2,
            success_threshold: 0.6,
        }
    }
}

/// Satisfaction trajectory settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SatisfactionConfig {
    /// Default projection horizon (minutes)
    pub horizon_minutes: u32,

    /// Grid step (minutes)
    pub step_minutes: u32,
}

impl Default for SatisfactionConfig {
    fn default() -> Self {
        Self {
            horizon_minutes: 60,
            step_minutes: 5,
        }
    }
}

/// Contextual bandit settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BanditConfig {
    /// UCB exploration coefficient
    pub exploration_rate: f32,

    /// Gradient step size for the linear reward model
    pub learning_rate: f32,

    /// Share of the expected reward taken from per-action history
    /// (the rest comes from the linear context model)
    pub reward_blend: f32,

    /// Expected reward assumed for never-pulled actions
    pub optimistic_default: f32,
}

impl Default for BanditConfig {
    fn default() -> Self {
        Self {
            exploration_rate: 0.3,
            learning_rate: 0.01,
            reward_blend: 0.6,
            optimistic_default: 0.7,
        }
    }
}

/// Meta-learning settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaConfig {
    /// Cosine similarity a peer must reach to contribute
    pub similarity_threshold: f32,

    /// Success score a peer adaptation must exceed to be transferred
    pub success_cutoff: f32,

    /// Expected improvement when peers recorded none
    pub default_improvement: f32,

    /// Outcome history length that triggers trimming
    pub history_cap: usize,

    /// Entries kept after a trim
    pub history_keep: usize,
}

impl Default for MetaConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.7,
            success_cutoff: 0.6,
            default_improvement: 0.3,
            history_cap: 50,
            history_keep: 25,
        }
    }
}

// Custom serde module for Duration (serialize/deserialize as seconds)
mod serde_duration {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

impl PersonalizationConfig {
    /// Load configuration from TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: PersonalizationConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.embedding.dimension == 0 {
            return Err(ConfigError::ValidationError(
                "embedding: dimension must be at least 1".to_string(),
            ));
        }

        if self.patterns.min_occurrences == 0 {
            return Err(ConfigError::ValidationError(
                "patterns: min_occurrences must be at least 1".to_string(),
            ));
        }

        Self::check_unit("patterns: frequency_ema_rate", self.patterns.frequency_ema_rate)?;
        Self::check_unit("bandit: learning_rate", self.bandit.learning_rate)?;
        Self::check_unit("bandit: reward_blend", self.bandit.reward_blend)?;
        Self::check_unit("bandit: optimistic_default", self.bandit.optimistic_default)?;
        Self::check_unit("meta: similarity_threshold", self.meta.similarity_threshold)?;
        Self::check_unit("meta: success_cutoff", self.meta.success_cutoff)?;

        if self.bandit.exploration_rate < 0.0 {
            return Err(ConfigError::ValidationError(
                "bandit: exploration_rate must not be negative".to_string(),
            ));
        }

        if self.satisfaction.step_minutes == 0
            || self.satisfaction.step_minutes > self.satisfaction.horizon_minutes
        {
            return Err(ConfigError::ValidationError(
                "satisfaction: step_minutes must be in [1, horizon_minutes]".to_string(),
            ));
        }

        if self.meta.history_keep > self.meta.history_cap {
            return Err(ConfigError::ValidationError(
                "meta: history_keep must not exceed history_cap".to_string(),
            ));
        }

        if self.cache_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "cache_capacity must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    fn check_unit(name: &str, value: f32) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&value) {
            return Err(ConfigError::ValidationError(format!(
                "{} must be within [0, 1], got {}",
                name, value
            )));
        }
        Ok(())
    }
}
