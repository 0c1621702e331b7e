//! Learning components of the personalization core
//!
//! Interaction history flows into the learner, detector, and predictors;
//! the bandit and meta-learner consume their outputs plus live context to
//! produce a decision, which becomes a new interaction record, closing
//! the loop.
//!
//! # Architecture
//!
//! - **PreferenceLearner**: interaction batches -> preference profile
//!   (attribute weights, compressed embedding, temporal and contextual
//!   modifiers, confidence intervals)
//! - **PatternDetector**: mines recurring behaviors (sequential,
//!   cyclical, contextual, preference-based, temporal)
//! - **ActionPredictor**: context + active patterns -> next-action
//!   distribution with justification
//! - **SatisfactionPredictor**: bounded-horizon satisfaction trajectory
//!   with confidence bands
//! - **ContextualBandit**: UCB policy over candidate responses, updated
//!   online from observed rewards
//! - **MetaLearner**: transfers adaptation strategies (not raw
//!   preferences) from similar users' outcomes
//!
//! Every component is a pure or locally-mutating computation over one
//! user's data; none performs I/O. Empty histories, missing patterns, and
//! absent peers degrade to documented low-confidence defaults rather than
//! failing.

pub mod actions;
pub mod bandit;
pub mod meta;
pub mod patterns;
pub mod preference;
pub mod satisfaction;

pub use actions::ActionPredictor;
pub use bandit::{ActionSelection, ArmStats, ContextualBandit, CONTEXT_DIM};
pub use meta::MetaLearner;
pub use patterns::PatternDetector;
pub use preference::PreferenceLearner;
pub use satisfaction::SatisfactionPredictor;
