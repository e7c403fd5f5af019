//! Contextual multi-armed bandit over the fixed strategy set.
//!
//! Selection blends three layers, checked in order: a Bernoulli draw toward
//! the cluster's proven best strategy, an epsilon-greedy uniform exploration
//! draw, and UCB1 exploitation. Feedback recording appends to the per-user
//! log and bumps the global per-strategy accumulators; both documents are
//! persisted after every mutation.

use anyhow::Result;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;

use crate::config::BanditConfig;
use crate::store::{Artifact, JsonStore};
use crate::types::{
    round3, truncate_chars, FeedbackEntry, PerformanceMetrics, QueryComplexity, Strategy,
    StrategyMetrics, StrategyStats,
};

pub struct StrategyBandit {
    user_id: String,
    config: BanditConfig,
    store: JsonStore,
    stats: HashMap<Strategy, StrategyStats>,
    history: Vec<FeedbackEntry>,
    rng: StdRng,
}

impl StrategyBandit {
    /// Load the user's strategy statistics and feedback history. Corrupt
    /// persisted documents are fatal.
    pub fn new(user_id: impl Into<String>, config: BanditConfig, store: JsonStore) -> Result<Self> {
        Self::with_rng(user_id, config, store, StdRng::from_entropy())
    }

    /// Injectable RNG so tests can fix draw outcomes exactly.
    pub fn with_rng(
        user_id: impl Into<String>,
        config: BanditConfig,
        store: JsonStore,
        rng: StdRng,
    ) -> Result<Self> {
        let user_id = user_id.into();

        let mut stats: HashMap<Strategy, StrategyStats> = store
            .load(Artifact::StrategyStats, &user_id)?
            .unwrap_or_default();
        for strategy in Strategy::ALL {
            stats.entry(strategy).or_default();
        }

        let history: Vec<FeedbackEntry> = store
            .load(Artifact::FeedbackHistory, &user_id)?
            .unwrap_or_default();

        tracing::debug!(
            user = %user_id,
            interactions = history.len(),
            "loaded bandit state"
        );

        Ok(Self {
            user_id,
            config,
            store,
            stats,
            history,
            rng,
        })
    }

    /// Pick a strategy and its retrieval breadth for a query.
    ///
    /// The cluster-bias draw and the exploration draw are independent
    /// sequential checks: a qualifying cluster strategy gets its Bernoulli
    /// first, and only a non-firing (or non-qualifying) draw falls through
    /// to epsilon/UCB. The complexity hint is logged for analysis but does
    /// not alter the selection math.
    pub fn select_strategy(
        &mut self,
        query: &str,
        complexity: QueryComplexity,
        cluster_best: Option<Strategy>,
    ) -> (Strategy, usize) {
        if let Some(best) = cluster_best {
            let stats = &self.stats[&best];
            if stats.total >= self.config.cluster_bias_min_uses
                && stats.avg_reward() > self.config.cluster_bias_min_avg_reward
                && self.rng.gen::<f64>() < self.config.cluster_bias_probability
            {
                tracing::debug!(
                    query = %query,
                    strategy = %best,
                    complexity = %complexity,
                    "following cluster-proven strategy"
                );
                return (best, self.config.top_k(best));
            }
        }

        let strategy = if self.rng.gen::<f64>() < self.config.epsilon {
            Strategy::ALL[self.rng.gen_range(0..Strategy::ALL.len())]
        } else {
            self.ucb_best()
        };

        tracing::debug!(
            query = %query,
            strategy = %strategy,
            complexity = %complexity,
            "selected strategy"
        );
        (strategy, self.config.top_k(strategy))
    }

    /// UCB1 over the global statistics. An unused strategy scores infinity,
    /// so each is tried at least once; ties resolve to the first strategy in
    /// the fixed set order.
    fn ucb_best(&self) -> Strategy {
        let total_pulls: u64 = Strategy::ALL.iter().map(|s| self.stats[s].total).sum();

        let mut best = Strategy::ALL[0];
        let mut best_score = f64::NEG_INFINITY;
        for strategy in Strategy::ALL {
            let stats = &self.stats[&strategy];
            let score = if stats.total == 0 {
                f64::INFINITY
            } else {
                let bonus = (2.0 * ((total_pulls + 1) as f64).ln() / stats.total as f64).sqrt();
                stats.avg_reward() + bonus
            };
            if score > best_score {
                best_score = score;
                best = strategy;
            }
        }
        best
    }

    /// Append a feedback entry and update the strategy's global statistics,
    /// persisting both documents.
    pub fn record_feedback(
        &mut self,
        query: &str,
        strategy: Strategy,
        response: &str,
        feedback: i32,
        retrieved_docs: &[String],
        cluster: Option<String>,
    ) -> Result<()> {
        let reward = if feedback > 0 { 1.0 } else { -1.0 };

        self.history.push(FeedbackEntry {
            timestamp: Utc::now(),
            query: query.to_string(),
            strategy,
            response: truncate_chars(response, self.config.response_truncate_chars),
            feedback,
            reward,
            retrieved_docs: retrieved_docs
                .iter()
                .take(self.config.max_stored_snippets)
                .cloned()
                .collect(),
            cluster,
        });

        self.stats.entry(strategy).or_default().record(reward);

        self.store
            .save(Artifact::FeedbackHistory, &self.user_id, &self.history)?;
        self.store
            .save(Artifact::StrategyStats, &self.user_id, &self.stats)?;
        Ok(())
    }

    /// Dashboard metrics; cluster summaries are merged in by the engine.
    pub fn get_performance_metrics(&self) -> PerformanceMetrics {
        let strategy_performance = Strategy::ALL
            .iter()
            .map(|&strategy| {
                let stats = &self.stats[&strategy];
                let win_rate = if stats.total == 0 {
                    0.0
                } else {
                    stats.wins as f64 / stats.total as f64
                };
                (
                    strategy,
                    StrategyMetrics {
                        total_uses: stats.total,
                        win_rate: round3(win_rate),
                        avg_reward: round3(stats.avg_reward()),
                    },
                )
            })
            .collect();

        PerformanceMetrics {
            total_interactions: self.history.len(),
            positive_feedback: self.history.iter().filter(|e| e.reward > 0.0).count(),
            negative_feedback: self.history.iter().filter(|e| e.reward < 0.0).count(),
            strategy_performance,
            clusters: Vec::new(),
            total_clusters: 0,
        }
    }

    /// The most recent `n` feedback entries, oldest first.
    pub fn recent_history(&self, n: usize) -> &[FeedbackEntry] {
        &self.history[self.history.len().saturating_sub(n)..]
    }

    pub fn stats_for(&self, strategy: Strategy) -> &StrategyStats {
        &self.stats[&strategy]
    }
}
