//! Configuration for the learning core.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::types::Strategy;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningConfig {
    /// Root directory for per-user persisted state.
    pub data_dir: PathBuf,
    pub bandit: BanditConfig,
    pub clustering: ClusteringConfig,
    pub recall: RecallConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BanditConfig {
    /// Probability of a uniform exploration draw.
    pub epsilon: f64,
    /// Probability of following the cluster's proven best strategy when it
    /// qualifies.
    pub cluster_bias_probability: f64,
    /// Minimum global uses before a cluster's best strategy qualifies.
    pub cluster_bias_min_uses: u64,
    /// Minimum global average reward before a cluster's best strategy
    /// qualifies.
    pub cluster_bias_min_avg_reward: f64,
    /// Retrieval breadth per strategy.
    pub top_k: HashMap<Strategy, usize>,
    /// Breadth for strategies absent from the table.
    pub default_top_k: usize,
    /// Response text kept per feedback entry.
    pub response_truncate_chars: usize,
    /// Retrieved-document snippets kept per feedback entry.
    pub max_stored_snippets: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusteringConfig {
    /// Clusters shown to the oracle as assignment context.
    pub max_context_groups: usize,
    /// Example queries shown per context cluster.
    pub context_examples: usize,
    /// Shared words required for the keyword fallback to join a cluster.
    pub fallback_min_overlap: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecallConfig {
    /// How many recent feedback entries to scan.
    pub window: usize,
    /// Most recent matches to surface.
    pub max_matches: usize,
    /// Strict lower bound on Jaccard similarity.
    pub similarity_threshold: f64,
}

impl BanditConfig {
    pub fn top_k(&self, strategy: Strategy) -> usize {
        self.top_k
            .get(&strategy)
            .copied()
            .unwrap_or(self.default_top_k)
    }
}

impl LearningConfig {
    /// Validate config values, returning errors for clearly broken
    /// configurations.
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.bandit.epsilon) {
            return Err("bandit.epsilon must be in [0.0, 1.0]".into());
        }
        if !(0.0..=1.0).contains(&self.bandit.cluster_bias_probability) {
            return Err("bandit.cluster_bias_probability must be in [0.0, 1.0]".into());
        }
        if self.bandit.top_k.is_empty() {
            return Err("bandit.top_k table must not be empty".into());
        }
        if self.bandit.top_k.values().any(|&k| k == 0) || self.bandit.default_top_k == 0 {
            return Err("bandit.top_k values must be > 0".into());
        }
        if self.bandit.response_truncate_chars == 0 {
            return Err("bandit.response_truncate_chars must be > 0".into());
        }
        if self.recall.window == 0 {
            return Err("recall.window must be > 0".into());
        }
        if self.recall.max_matches == 0 {
            return Err("recall.max_matches must be > 0".into());
        }
        if !(0.0..=1.0).contains(&self.recall.similarity_threshold) {
            return Err("recall.similarity_threshold must be in [0.0, 1.0]".into());
        }
        if self.clustering.max_context_groups == 0 {
            return Err("clustering.max_context_groups must be > 0".into());
        }
        Ok(())
    }

    /// Load config from a JSON file, validating the result.
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;
        let config: Self =
            serde_json::from_str(&content).map_err(|e| format!("Failed to parse config: {}", e))?;
        config.validate()?;
        Ok(config)
    }
}

impl Default for LearningConfig {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("adaptive-rag");

        Self {
            data_dir,
            bandit: BanditConfig::default(),
            clustering: ClusteringConfig::default(),
            recall: RecallConfig::default(),
        }
    }
}

impl Default for BanditConfig {
    fn default() -> Self {
        let top_k = HashMap::from([
            (Strategy::Concise, 3),
            (Strategy::Detailed, 5),
            (Strategy::Structured, 4),
            (Strategy::ExampleDriven, 4),
            (Strategy::Analytical, 6),
        ]);
        Self {
            epsilon: 0.2,
            cluster_bias_probability: 0.7,
            cluster_bias_min_uses: 3,
            cluster_bias_min_avg_reward: 0.3,
            top_k,
            default_top_k: 4,
            response_truncate_chars: 200,
            max_stored_snippets: 2,
        }
    }
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            max_context_groups: 10,
            context_examples: 2,
            fallback_min_overlap: 2,
        }
    }
}

impl Default for RecallConfig {
    fn default() -> Self {
        Self {
            window: 20,
            max_matches: 3,
            similarity_threshold: 0.6,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(LearningConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_epsilon() {
        let mut config = LearningConfig::default();
        config.bandit.epsilon = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_recall_window() {
        let mut config = LearningConfig::default();
        config.recall.window = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn top_k_falls_back_to_default() {
        let mut config = BanditConfig::default();
        assert_eq!(config.top_k(Strategy::Concise), 3);
        assert_eq!(config.top_k(Strategy::Analytical), 6);
        config.top_k.remove(&Strategy::Analytical);
        assert_eq!(config.top_k(Strategy::Analytical), 4);
    }

    #[test]
    fn config_round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = LearningConfig::default();
        std::fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();

        let loaded = LearningConfig::from_file(&path).unwrap();
        assert_eq!(loaded.bandit.epsilon, config.bandit.epsilon);
        assert_eq!(loaded.recall.window, 20);
    }
}
