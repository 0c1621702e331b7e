//! Cross-user strategy transfer
//!
//! Transfers an adaptation *strategy* (never raw preferences) from the
//! recorded outcomes of behaviorally similar users. Peers are compared by
//! cosine similarity over a 12-dim normalized profile vector; peers below
//! the threshold contribute nothing. Without any sufficiently similar
//! peer the adapter returns a fixed conservative strategy rather than
//! failing.

use crate::config::MetaConfig;
use crate::math::{clamp01, cosine_similarity};
use crate::types::{
    AdaptationOutcome, AdaptationStrategy, PeerProfile, RiskAssessment, RiskLevel,
    RollbackCondition, StrategyId, StrategyType, UserId, UserProfile,
};
use std::collections::HashMap;
use tracing::{debug, info};

/// Transfers adaptation strategies from similar users
pub struct MetaLearner {
    cfg: MetaConfig,
    outcomes: HashMap<UserId, Vec<AdaptationOutcome>>,
}

impl MetaLearner {
    pub fn new(cfg: MetaConfig) -> Self {
        Self {
            cfg,
            outcomes: HashMap::new(),
        }
    }

    /// Derive an adaptation strategy for a user from peer outcomes
    pub fn adapt(&self, target: &UserProfile, peers: &[PeerProfile]) -> AdaptationStrategy {
        let target_vec = target.to_vector();

        let similar: Vec<(f32, &PeerProfile)> = peers
            .iter()
            .filter_map(|peer| {
                let similarity = cosine_similarity(&target_vec, &peer.profile.to_vector());
                (similarity >= self.cfg.similarity_threshold).then_some((similarity, peer))
            })
            .collect();

        if similar.is_empty() {
            info!("No peer above similarity threshold, falling back to conservative strategy");
            return self.conservative_strategy();
        }

        // Similarity-weighted vote over peers' successful adaptations
        let mut type_weights: HashMap<StrategyType, f32> = HashMap::new();
        let mut parameter_sums: HashMap<String, (f32, f32)> = HashMap::new();
        let mut improvements: Vec<(f32, f32)> = Vec::new();

        for (similarity, peer) in &similar {
            for record in &peer.adaptations {
                if record.success_score <= self.cfg.success_cutoff {
                    continue;
                }
                *type_weights.entry(record.strategy_type).or_insert(0.0) += similarity;
                for (key, value) in &record.parameters {
                    let entry = parameter_sums.entry(key.clone()).or_insert((0.0, 0.0));
                    entry.0 += similarity * value;
                    entry.1 += similarity;
                }
                improvements.push((record.improvement, *similarity));
            }
        }

        if type_weights.is_empty() {
            debug!("Similar peers recorded no successful adaptations");
            return self.conservative_strategy();
        }

        let strategy_type = *type_weights
            .iter()
            .max_by(|a, b| {
                a.1.partial_cmp(b.1)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| b.0.to_string().cmp(&a.0.to_string()))
            })
            .map(|(t, _)| t)
            .expect("non-empty vote always has a winner");

        let parameters: HashMap<String, f32> = parameter_sums
            .into_iter()
            .filter(|(_, (_, weight))| *weight > 0.0)
            .map(|(key, (sum, weight))| (key, sum / weight))
            .collect();

        let expected_improvement = if improvements.is_empty() {
            self.cfg.default_improvement
        } else {
            let weighted: f32 = improvements.iter().map(|(v, w)| v * w).sum();
            let total: f32 = improvements.iter().map(|(_, w)| w).sum();
            clamp01(weighted / total)
        };

        debug!(
            %strategy_type,
            peers = similar.len(),
            expected_improvement,
            "Transferred adaptation strategy"
        );

        AdaptationStrategy {
            id: StrategyId::new(),
            strategy_type,
            parameters,
            expected_improvement,
            risk: RiskAssessment {
                level: RiskLevel::Medium,
                factors: vec![
                    "transferred from peer outcomes".to_string(),
                    "behavioral profiles may diverge over time".to_string(),
                ],
                mitigations: vec![
                    "rollback conditions armed".to_string(),
                    "parameters applied gradually".to_string(),
                ],
                rollback_probability: 0.2,
                impact_estimate: expected_improvement,
            },
            rollback_conditions: vec![default_rollback_condition()],
            implementation_steps: vec![
                "apply similarity-weighted parameters".to_string(),
                "monitor satisfaction over the rollback window".to_string(),
                "revert when a rollback condition triggers".to_string(),
            ],
            success_metrics: vec![
                "mean satisfaction".to_string(),
                "engagement level".to_string(),
                "completion rate".to_string(),
            ],
        }
    }

    /// Fixed low-risk strategy for users without comparable peers
    fn conservative_strategy(&self) -> AdaptationStrategy {
        let mut parameters = HashMap::new();
        parameters.insert("step_size".to_string(), 0.1);

        AdaptationStrategy {
            id: StrategyId::new(),
            strategy_type: StrategyType::Conservative,
            parameters,
            expected_improvement: 0.2,
            risk: RiskAssessment {
                level: RiskLevel::Low,
                factors: vec!["no sufficiently similar peers".to_string()],
                mitigations: vec![
                    "small adaptation steps".to_string(),
                    "frequent checkpoints".to_string(),
                ],
                rollback_probability: 0.1,
                impact_estimate: 0.2,
            },
            rollback_conditions: vec![default_rollback_condition()],
            implementation_steps: vec![
                "apply minimal parameter adjustments".to_string(),
                "re-evaluate once more interaction history accrues".to_string(),
            ],
            success_metrics: vec!["mean satisfaction".to_string()],
        }
    }

    /// Record an applied strategy's outcome for a user
    ///
    /// Histories are trimmed to the most recent entries once they exceed
    /// the cap, keeping memory bounded per user.
    pub fn record_outcome(&mut self, user_id: &UserId, outcome: AdaptationOutcome) {
        let history = self.outcomes.entry(user_id.clone()).or_default();
        history.push(outcome);
        if history.len() > self.cfg.history_cap {
            let excess = history.len() - self.cfg.history_keep;
            history.drain(..excess);
        }
    }

    pub fn history_len(&self, user_id: &UserId) -> usize {
        self.outcomes.get(user_id).map_or(0, Vec::len)
    }

    pub fn outcomes_for(&self, user_id: &UserId) -> &[AdaptationOutcome] {
        self.outcomes.get(user_id).map(Vec::as_slice).unwrap_or(&[])
    }
}

fn default_rollback_condition() -> RollbackCondition {
    RollbackCondition {
        satisfaction_below: 0.4,
        window_minutes: 5,
        consecutive_failures: 3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AdaptationRecord;
    use chrono::Utc;

    fn learner() -> MetaLearner {
        MetaLearner::new(MetaConfig::default())
    }

    fn profile(satisfaction: f32) -> UserProfile {
        UserProfile {
            avg_satisfaction: satisfaction,
            avg_engagement: 0.6,
            avg_completion: 0.7,
            session_length: 0.5,
            interaction_rate: 0.4,
            content_diversity: 0.5,
            technical_level: 0.6,
            expertise: 0.5,
            response_length: 0.5,
            exploration_tendency: 0.4,
            weekend_activity: 0.3,
            consistency: 0.6,
        }
    }

    fn record(strategy_type: StrategyType, success: f32, improvement: f32) -> AdaptationRecord {
        let mut parameters = HashMap::new();
        parameters.insert("adjustment_rate".to_string(), 0.3);
        AdaptationRecord {
            strategy_type,
            parameters,
            success_score: success,
            improvement,
        }
    }

    fn peer(id: &str, profile: UserProfile, adaptations: Vec<AdaptationRecord>) -> PeerProfile {
        PeerProfile {
            user_id: UserId::new(id),
            profile,
            adaptations,
        }
    }

    #[test]
    fn test_no_peers_yields_conservative_strategy() {
        let strategy = learner().adapt(&profile(0.6), &[]);
        assert_eq!(strategy.strategy_type, StrategyType::Conservative);
        assert!((strategy.expected_improvement - 0.2).abs() < 1e-6);
        assert_eq!(strategy.risk.level, RiskLevel::Low);
        assert_eq!(strategy.rollback_conditions.len(), 1);
        assert!((strategy.rollback_conditions[0].satisfaction_below - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_dissimilar_peers_are_ignored() {
        // Orthogonal-ish profile: high where target is low
        let distant = UserProfile {
            avg_satisfaction: 0.0,
            avg_engagement: 0.0,
            avg_completion: 0.0,
            session_length: 0.0,
            interaction_rate: 0.0,
            content_diversity: 0.0,
            technical_level: 0.0,
            expertise: 0.0,
            response_length: 0.0,
            exploration_tendency: 1.0,
            weekend_activity: 1.0,
            consistency: 0.0,
        };
        let peers = vec![peer(
            "p-1",
            distant,
            vec![record(StrategyType::Rapid, 0.9, 0.8)],
        )];

        let strategy = learner().adapt(&profile(0.6), &peers);
        assert_eq!(strategy.strategy_type, StrategyType::Conservative);
    }

    #[test]
    fn test_similar_peer_transfers_strategy() {
        let peers = vec![peer(
            "p-1",
            profile(0.65),
            vec![record(StrategyType::Gradual, 0.9, 0.5)],
        )];

        let strategy = learner().adapt(&profile(0.6), &peers);
        assert_eq!(strategy.strategy_type, StrategyType::Gradual);
        assert!((strategy.expected_improvement - 0.5).abs() < 1e-5);
        assert_eq!(strategy.risk.level, RiskLevel::Medium);
        assert!((strategy.risk.rollback_probability - 0.2).abs() < 1e-6);
        assert!((strategy.parameters["adjustment_rate"] - 0.3).abs() < 1e-5);
    }

    #[test]
    fn test_unsuccessful_adaptations_do_not_transfer() {
        let peers = vec![peer(
            "p-1",
            profile(0.6),
            vec![record(StrategyType::Rapid, 0.3, 0.9)],
        )];

        let strategy = learner().adapt(&profile(0.6), &peers);
        // Similar peer, but nothing above the success cutoff
        assert_eq!(strategy.strategy_type, StrategyType::Conservative);
    }

    #[test]
    fn test_majority_strategy_type_wins() {
        let peers = vec![
            peer(
                "p-1",
                profile(0.6),
                vec![record(StrategyType::Gradual, 0.9, 0.4)],
            ),
            peer(
                "p-2",
                profile(0.61),
                vec![record(StrategyType::Gradual, 0.8, 0.3)],
            ),
            peer(
                "p-3",
                profile(0.59),
                vec![record(StrategyType::Exploratory, 0.8, 0.6)],
            ),
        ];

        let strategy = learner().adapt(&profile(0.6), &peers);
        assert_eq!(strategy.strategy_type, StrategyType::Gradual);
    }

    #[test]
    fn test_parameters_are_similarity_weighted_averages() {
        let mut rec_a = record(StrategyType::Gradual, 0.9, 0.4);
        rec_a.parameters.insert("adjustment_rate".to_string(), 0.2);
        let mut rec_b = record(StrategyType::Gradual, 0.9, 0.4);
        rec_b.parameters.insert("adjustment_rate".to_string(), 0.6);

        // Identical profiles: equal similarity, plain average
        let peers = vec![
            peer("p-1", profile(0.6), vec![rec_a]),
            peer("p-2", profile(0.6), vec![rec_b]),
        ];

        let strategy = learner().adapt(&profile(0.6), &peers);
        assert!((strategy.parameters["adjustment_rate"] - 0.4).abs() < 1e-5);
    }

    #[test]
    fn test_record_outcome_trims_history() {
        let mut l = learner();
        let user = UserId::new("u-1");

        for k in 0..51 {
            l.record_outcome(
                &user,
                AdaptationOutcome {
                    strategy_id: StrategyId::new(),
                    strategy_type: StrategyType::Gradual,
                    success_score: 0.5,
                    improvement: k as f32 / 100.0,
                    recorded_at: Utc::now(),
                },
            );
        }

        // Exceeding 50 trims down to the most recent 25
        assert_eq!(l.history_len(&user), 25);
        let newest = l.outcomes_for(&user).last().unwrap();
        assert!((newest.improvement - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_history_below_cap_is_untouched() {
        let mut l = learner();
        let user = UserId::new("u-1");
        for _ in 0..50 {
            l.record_outcome(
                &user,
                AdaptationOutcome {
                    strategy_id: StrategyId::new(),
                    strategy_type: StrategyType::Conservative,
                    success_score: 0.5,
                    improvement: 0.1,
                    recorded_at: Utc::now(),
                },
            );
        }
        assert_eq!(l.history_len(&user), 50);
    }
}
