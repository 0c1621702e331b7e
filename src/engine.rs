//! Personalization coordinator
//!
//! Composes the learning components into the operations exposed to the
//! enclosing platform and owns the per-user mutable state: the LRU
//! pattern cache with its freshness window, one contextual bandit per
//! user, and the shared meta-learner outcome history.
//!
//! # Concurrency
//!
//! Every component computation is synchronous and touches only one
//! user's data. Distinct users proceed independently: the shared maps
//! are locked only long enough to fetch or insert a per-user handle, and
//! same-user bandit operations serialize on that user's own mutex so a
//! reward update never races a selection. Cache reads may be stale
//! within the freshness window; recomputation is explicit via
//! `force_refresh`, never implicit blocking.

use crate::config::PersonalizationConfig;
use crate::error::Result;
use crate::learning::{
    ActionPredictor, ActionSelection, ContextualBandit, MetaLearner, PatternDetector,
    PreferenceLearner, SatisfactionPredictor,
};
use crate::types::{
    AdaptationOutcome, AdaptationStrategy, BehaviorPattern, ContextMap, Interaction, PeerProfile,
    PredictedAction, PreferenceModel, SatisfactionTrajectory, UserHistory, UserId, UserProfile,
};
use chrono::{DateTime, Duration, Utc};
use lru::LruCache;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, info};

/// Cache effectiveness counters for the pattern cache
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub refreshes: u64,
}

struct CachedPatterns {
    patterns: Vec<BehaviorPattern>,
    computed_at: DateTime<Utc>,
}

/// Facade over the personalization core, one instance per process
///
/// Explicitly constructed and injected by the caller; owns its per-user
/// caches rather than hiding them in globals.
pub struct PersonalizationEngine {
    config: PersonalizationConfig,
    learner: PreferenceLearner,
    detector: PatternDetector,
    actions: ActionPredictor,
    satisfaction: SatisfactionPredictor,

    pattern_cache: RwLock<LruCache<UserId, CachedPatterns>>,
    bandits: Mutex<HashMap<UserId, Arc<Mutex<ContextualBandit>>>>,
    meta: Mutex<MetaLearner>,
    cache_stats: Mutex<PatternCacheStats>,
}

impl PersonalizationEngine {
    pub fn new(config: PersonalizationConfig) -> Result<Self> {
        config.validate()?;

        let capacity = NonZeroUsize::new(config.cache_capacity)
            .expect("validated configuration guarantees a non-zero cache capacity");

        info!(
            embedding_dim = config.embedding.dimension,
            cache_capacity = config.cache_capacity,
            "Personalization engine initialized"
        );

        Ok(Self {
            learner: PreferenceLearner::new(config.embedding.clone(), config.preferences.clone()),
            detector: PatternDetector::new(config.patterns.clone()),
            actions: ActionPredictor::new(config.actions.clone()),
            satisfaction: SatisfactionPredictor::new(config.satisfaction.clone()),
            pattern_cache: RwLock::new(LruCache::new(capacity)),
            bandits: Mutex::new(HashMap::new()),
            meta: Mutex::new(MetaLearner::new(config.meta.clone())),
            cache_stats: Mutex::new(PatternCacheStats::default()),
            config,
        })
    }

    /// Learn a preference model from an interaction batch
    pub fn learn_preferences(&self, interactions: &[Interaction]) -> PreferenceModel {
        self.learner.learn(interactions)
    }

    /// Blend a single observation into a stored model
    pub fn update_preference(
        &self,
        model: &mut PreferenceModel,
        key: &str,
        new_value: f32,
        confidence: f32,
    ) {
        self.learner
            .update_preference(model, key, new_value, confidence)
    }

    /// Stored preference weight adjusted for a live context
    pub fn preference_for_context(
        &self,
        model: &PreferenceModel,
        key: &str,
        context: &ContextMap,
    ) -> f32 {
        self.learner.preference_for_context(model, key, context)
    }

    /// Mined behavior patterns for a user, cached with a freshness window
    ///
    /// A cached result younger than the freshness window is returned
    /// unchanged; `force_refresh` recomputes unconditionally.
    pub fn detect_patterns(
        &self,
        history: &UserHistory,
        force_refresh: bool,
    ) -> Vec<BehaviorPattern> {
        let now = Utc::now();
        let ttl = Duration::from_std(self.config.patterns.cache_ttl)
            .unwrap_or_else(|_| Duration::hours(1));

        if !force_refresh {
            let mut cache = self.pattern_cache.write().expect("pattern cache poisoned");
            if let Some(cached) = cache.get(&history.user_id) {
                if now - cached.computed_at < ttl {
                    self.cache_stats.lock().expect("stats lock poisoned").hits += 1;
                    debug!(user = %history.user_id, "Pattern cache hit");
                    return cached.patterns.clone();
                }
            }
        }

        let patterns = self.detector.detect(history);
        {
            let mut stats = self.cache_stats.lock().expect("stats lock poisoned");
            if force_refresh {
                stats.refreshes += 1;
            } else {
                stats.misses += 1;
            }
        }

        self.pattern_cache
            .write()
            .expect("pattern cache poisoned")
            .put(
                history.user_id.clone(),
                CachedPatterns {
                    patterns: patterns.clone(),
                    computed_at: now,
                },
            );
        patterns
    }

    /// Predict the next likely action for a user in a live context
    pub fn predict_next_action(
        &self,
        context: &ContextMap,
        history: &UserHistory,
    ) -> PredictedAction {
        let patterns = self.detect_patterns(history, false);
        self.actions.predict(context, &patterns, history)
    }

    /// Project satisfaction forward; `horizon_minutes` defaults from config
    pub fn predict_satisfaction(
        &self,
        history: &UserHistory,
        context: &ContextMap,
        horizon_minutes: Option<u32>,
    ) -> SatisfactionTrajectory {
        let horizon = horizon_minutes.unwrap_or(self.config.satisfaction.horizon_minutes);
        self.satisfaction.predict_trajectory(history, context, horizon)
    }

    /// Select a response from candidates via the user's bandit
    pub fn select_action(
        &self,
        user_id: &UserId,
        context: &ContextMap,
        candidates: &[String],
    ) -> Result<ActionSelection> {
        let bandit = self.bandit_for(user_id);
        let bandit = bandit.lock().expect("bandit lock poisoned");
        bandit.select(context, candidates)
    }

    /// Feed an observed reward back into the user's bandit
    pub fn record_reward(&self, user_id: &UserId, action: &str, context: &ContextMap, reward: f32) {
        let bandit = self.bandit_for(user_id);
        let mut bandit = bandit.lock().expect("bandit lock poisoned");
        bandit.update(action, context, reward);
    }

    /// Transfer an adaptation strategy from similar peers
    pub fn adapt_from_peers(
        &self,
        target: &UserProfile,
        peers: &[PeerProfile],
    ) -> AdaptationStrategy {
        self.meta.lock().expect("meta lock poisoned").adapt(target, peers)
    }

    /// Record the outcome of an applied adaptation strategy
    pub fn record_adaptation_outcome(&self, user_id: &UserId, outcome: AdaptationOutcome) {
        self.meta
            .lock()
            .expect("meta lock poisoned")
            .record_outcome(user_id, outcome);
    }

    /// Pattern cache effectiveness counters
    pub fn cache_stats(&self) -> PatternCacheStats {
        *self.cache_stats.lock().expect("stats lock poisoned")
    }

    /// Arm statistics for a user's bandit, empty for unknown users
    pub fn bandit_arm_stats(&self, user_id: &UserId) -> Vec<crate::learning::ArmStats> {
        let bandits = self.bandits.lock().expect("bandit map poisoned");
        match bandits.get(user_id) {
            Some(bandit) => bandit.lock().expect("bandit lock poisoned").arm_stats(),
            None => Vec::new(),
        }
    }

    /// Fetch or create the per-user bandit handle
    ///
    /// The map lock is held only for the lookup; callers serialize on the
    /// returned per-user mutex.
    fn bandit_for(&self, user_id: &UserId) -> Arc<Mutex<ContextualBandit>> {
        let mut bandits = self.bandits.lock().expect("bandit map poisoned");
        bandits
            .entry(user_id.clone())
            .or_insert_with(|| {
                Arc::new(Mutex::new(ContextualBandit::new(self.config.bandit.clone())))
            })
            .clone()
    }
}
