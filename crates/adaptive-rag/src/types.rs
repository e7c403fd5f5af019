//! Shared record types for the learning core.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A fixed response-generation mode. The set is closed: every persisted
/// statistic and every bandit arm refers to one of these five.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Concise,
    Detailed,
    Structured,
    ExampleDriven,
    Analytical,
}

impl Strategy {
    /// Canonical ordering. Bandit tie-breaks resolve to the first strategy
    /// in this order that reaches the maximum score.
    pub const ALL: [Strategy; 5] = [
        Strategy::Concise,
        Strategy::Detailed,
        Strategy::Structured,
        Strategy::ExampleDriven,
        Strategy::Analytical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Concise => "concise",
            Strategy::Detailed => "detailed",
            Strategy::Structured => "structured",
            Strategy::ExampleDriven => "example_driven",
            Strategy::Analytical => "analytical",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Global per-strategy accumulators. Mutated only by feedback recording,
/// never decremented. Invariants: `wins <= total`; `total == 0` implies
/// `reward_sum == 0`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StrategyStats {
    pub wins: u64,
    pub total: u64,
    pub reward_sum: f64,
}

impl StrategyStats {
    pub fn avg_reward(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.reward_sum / self.total as f64
        }
    }

    pub fn record(&mut self, reward: f64) {
        self.total += 1;
        self.reward_sum += reward;
        if reward > 0.0 {
            self.wins += 1;
        }
    }
}

/// One entry in the append-only feedback log. Immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackEntry {
    pub timestamp: DateTime<Utc>,
    pub query: String,
    pub strategy: Strategy,
    /// Response text, truncated at record time.
    pub response: String,
    /// Raw user signal, +1 or -1.
    pub feedback: i32,
    /// Derived reward: +1.0 for positive feedback, -1.0 otherwise.
    pub reward: f64,
    /// At most two retrieved-document snippets for later inspection.
    pub retrieved_docs: Vec<String>,
    pub cluster: Option<String>,
}

/// Per-cluster, per-strategy accumulators. Kept as a vector so iteration
/// order is insertion order, which makes best-strategy tie-breaks
/// deterministic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyPerf {
    pub strategy: Strategy,
    pub total: u64,
    pub reward_sum: f64,
}

impl StrategyPerf {
    pub fn avg_reward(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.reward_sum / self.total as f64
        }
    }
}

/// A semantic group of queries. Created exactly once on first assignment,
/// never deleted; queries are appended with exact-match de-duplication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cluster {
    pub name: String,
    pub queries: Vec<String>,
    pub strategy_performance: Vec<StrategyPerf>,
}

impl Cluster {
    pub fn new(name: impl Into<String>, first_query: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            queries: vec![first_query.into()],
            strategy_performance: Vec::new(),
        }
    }
}

/// Query complexity as judged by the oracle. Parsed leniently; anything
/// unrecognized is Moderate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum QueryComplexity {
    Simple,
    #[default]
    Moderate,
    Complex,
}

impl QueryComplexity {
    pub fn from_response(text: &str) -> Self {
        let lower = text.to_lowercase();
        if lower.contains("complex") {
            QueryComplexity::Complex
        } else if lower.contains("simple") {
            QueryComplexity::Simple
        } else {
            QueryComplexity::Moderate
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QueryComplexity::Simple => "simple",
            QueryComplexity::Moderate => "moderate",
            QueryComplexity::Complex => "complex",
        }
    }
}

impl fmt::Display for QueryComplexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-strategy usage within a cluster summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyUsage {
    pub uses: u64,
    /// Average reward rounded to 3 decimals.
    pub avg_reward: f64,
}

/// Read-side view of one cluster. Unknown clusters produce the default
/// (empty) summary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterSummary {
    pub name: String,
    pub query_count: usize,
    pub example_queries: Vec<String>,
    pub strategy_performance: HashMap<Strategy, StrategyUsage>,
    pub best_strategy: Option<Strategy>,
}

/// A past query surfaced by similarity recall.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarQuery {
    pub query: String,
    pub strategy: Strategy,
    pub feedback: i32,
    pub timestamp: DateTime<Utc>,
}

/// Whether historically similar queries exist for the current one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImprovementInfo {
    pub has_similar: bool,
    pub similar_queries: Vec<SimilarQuery>,
    pub learning_active: bool,
}

/// Per-strategy dashboard metrics, all zero for strategies never used.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StrategyMetrics {
    pub total_uses: u64,
    pub win_rate: f64,
    pub avg_reward: f64,
}

/// Aggregate performance view: bandit totals plus cluster summaries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_interactions: usize,
    pub positive_feedback: usize,
    pub negative_feedback: usize,
    pub strategy_performance: HashMap<Strategy, StrategyMetrics>,
    pub clusters: Vec<ClusterSummary>,
    pub total_clusters: usize,
}

/// Metadata assembled for every answered query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryMetadata {
    pub strategy: Strategy,
    pub top_k: usize,
    pub complexity: QueryComplexity,
    /// Snippets (first 100 chars) of the retrieved passages.
    pub retrieved_docs: Vec<String>,
    pub improvement: ImprovementInfo,
    pub cluster_name: String,
    pub cluster_info: ClusterSummary,
    pub is_new_cluster: bool,
    /// Whether the chosen strategy equals the cluster's proven best.
    pub used_cluster_strategy: bool,
}

/// Final answer plus decision metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryOutcome {
    pub answer: String,
    pub metadata: QueryMetadata,
}

/// Round to 3 decimals for dashboard-facing averages.
pub(crate) fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Char-boundary-safe prefix truncation.
pub(crate) fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complexity_parses_leniently() {
        assert_eq!(
            QueryComplexity::from_response("This is a COMPLEX question"),
            QueryComplexity::Complex
        );
        assert_eq!(
            QueryComplexity::from_response("simple"),
            QueryComplexity::Simple
        );
        assert_eq!(
            QueryComplexity::from_response("somewhere in between"),
            QueryComplexity::Moderate
        );
    }

    #[test]
    fn strategy_serializes_snake_case() {
        let json = serde_json::to_string(&Strategy::ExampleDriven).unwrap();
        assert_eq!(json, "\"example_driven\"");
        let back: Strategy = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Strategy::ExampleDriven);
    }

    #[test]
    fn stats_record_keeps_invariants() {
        let mut stats = StrategyStats::default();
        stats.record(1.0);
        stats.record(-1.0);
        stats.record(1.0);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.wins, 2);
        assert!(stats.wins <= stats.total);
        assert!((stats.avg_reward() - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn unused_stats_average_is_zero() {
        assert_eq!(StrategyStats::default().avg_reward(), 0.0);
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo wörld", 5), "héllo");
        assert_eq!(truncate_chars("short", 200), "short");
    }

    #[test]
    fn round3_rounds_half_up() {
        assert_eq!(round3(0.6666666), 0.667);
        assert_eq!(round3(0.5), 0.5);
    }
}
