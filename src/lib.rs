//! Noesis - Adaptive Personalization Core
//!
//! The personalization subsystem of a conversational research-assistant
//! platform. It learns a user's content and interaction preferences from
//! behavioral signal, predicts the next likely action and near-term
//! satisfaction trajectory, and selects system responses expected to
//! maximize satisfaction under uncertainty.
//!
//! # Architecture
//!
//! - **Types**: core data structures (Interaction, PreferenceModel,
//!   BehaviorPattern, AdaptationStrategy, ...)
//! - **Learning**: the statistical components (preference learner,
//!   pattern detector, action/satisfaction predictors, contextual
//!   bandit, meta-learner)
//! - **Engine**: the coordinator composing the components and owning the
//!   per-user caches
//!
//! The crate performs no I/O: histories arrive from and snapshots return
//! to the enclosing platform as in-process data structures. Operations
//! for different users are independent; same-user operations serialize
//! inside the engine.
//!
//! # Example
//!
//! ```
//! use noesis_core::{PersonalizationConfig, PersonalizationEngine};
//! use noesis_core::types::{ContextMap, UserHistory, UserId};
//!
//! # fn main() -> noesis_core::Result<()> {
//! let engine = PersonalizationEngine::new(PersonalizationConfig::default())?;
//!
//! let history = UserHistory::new(UserId::new("user-42"));
//! let model = engine.learn_preferences(&history.interactions);
//! assert_eq!(model.weight("explanation_depth"), Some(0.5));
//!
//! let trajectory = engine.predict_satisfaction(&history, &ContextMap::new(), None);
//! assert_eq!(trajectory.offsets_min.first(), Some(&0));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod learning;
pub mod math;
pub mod types;

// Re-export commonly used types
pub use config::PersonalizationConfig;
pub use engine::{PatternCacheStats, PersonalizationEngine};
pub use error::{NoesisError, Result};
pub use learning::{
    ActionPredictor, ActionSelection, ContextualBandit, MetaLearner, PatternDetector,
    PreferenceLearner, SatisfactionPredictor,
};
pub use types::{
    AdaptationOutcome, AdaptationStrategy, BehaviorPattern, Interaction, PatternType,
    PredictedAction, PreferenceModel, SatisfactionTrajectory, StrategyType, Trend, UserHistory,
    UserId, UserProfile,
};
