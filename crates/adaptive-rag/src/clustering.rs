//! Online semantic query clustering.
//!
//! Every query ends in exactly one of two transitions: join an existing
//! cluster or create a new one. Assignment is delegated to the text oracle;
//! when the oracle fails, a deterministic keyword-overlap fallback keeps the
//! pipeline functioning. Per-cluster strategy performance accumulates
//! alongside the global bandit statistics.

use anyhow::Result;
use std::collections::HashSet;
use std::sync::Arc;

use crate::config::ClusteringConfig;
use crate::oracle::TextOracle;
use crate::store::{Artifact, JsonStore};
use crate::types::{round3, Cluster, ClusterSummary, Strategy, StrategyPerf, StrategyUsage};

pub struct QueryClusterer {
    user_id: String,
    config: ClusteringConfig,
    store: JsonStore,
    oracle: Arc<dyn TextOracle>,
    clusters: Vec<Cluster>,
}

impl QueryClusterer {
    /// Load the user's cluster map. A corrupt persisted document is fatal.
    pub fn new(
        user_id: impl Into<String>,
        config: ClusteringConfig,
        store: JsonStore,
        oracle: Arc<dyn TextOracle>,
    ) -> Result<Self> {
        let user_id = user_id.into();
        let clusters: Vec<Cluster> = store
            .load(Artifact::QueryClusters, &user_id)?
            .unwrap_or_default();
        tracing::debug!(user = %user_id, clusters = clusters.len(), "loaded query clusters");
        Ok(Self {
            user_id,
            config,
            store,
            oracle,
            clusters,
        })
    }

    /// Assign a query to a semantic cluster, creating one if needed.
    /// Returns the normalized cluster name and whether it was newly created.
    pub async fn assign_cluster(&mut self, query: &str) -> Result<(String, bool)> {
        let summary = self.existing_groups_summary();
        let assignment = self.oracle.cluster_query(query, &summary).await;
        match assignment {
            Ok(response) => {
                let name = parse_group_name(&response)
                    .unwrap_or_else(|| format!("cluster_{}", self.clusters.len()));
                let is_new = self.insert_query(&name, query);
                self.persist()?;
                tracing::debug!(cluster = %name, is_new, "assigned query to cluster");
                Ok((name, is_new))
            }
            Err(e) => {
                tracing::warn!(error = %e, "clustering oracle failed, using keyword fallback");
                self.fallback_assign(query)
            }
        }
    }

    /// Deterministic fallback: join the cluster with the highest word
    /// overlap when at least `fallback_min_overlap` words are shared,
    /// otherwise create a new cluster.
    fn fallback_assign(&mut self, query: &str) -> Result<(String, bool)> {
        let mut best_match: Option<String> = None;
        let mut best_score = 0;

        for cluster in &self.clusters {
            for existing in &cluster.queries {
                let overlap = word_overlap(query, existing);
                if overlap > best_score {
                    best_score = overlap;
                    best_match = Some(cluster.name.clone());
                }
            }
        }

        let (name, is_new) = match best_match {
            Some(name) if best_score >= self.config.fallback_min_overlap => {
                self.insert_query(&name, query);
                (name, false)
            }
            _ => {
                let name = format!("cluster_{}", self.clusters.len());
                self.insert_query(&name, query);
                (name, true)
            }
        };
        self.persist()?;
        Ok((name, is_new))
    }

    /// Accumulate a strategy's reward within a cluster. No-op for unknown
    /// clusters.
    pub fn record_strategy_performance(
        &mut self,
        cluster_name: &str,
        strategy: Strategy,
        reward: f64,
    ) -> Result<()> {
        let Some(cluster) = self.clusters.iter_mut().find(|c| c.name == cluster_name) else {
            tracing::debug!(cluster = %cluster_name, "skipping performance record for unknown cluster");
            return Ok(());
        };

        match cluster
            .strategy_performance
            .iter_mut()
            .find(|p| p.strategy == strategy)
        {
            Some(perf) => {
                perf.total += 1;
                perf.reward_sum += reward;
            }
            None => cluster.strategy_performance.push(StrategyPerf {
                strategy,
                total: 1,
                reward_sum: reward,
            }),
        }

        self.persist()
    }

    /// The strategy with the highest average reward in this cluster, only if
    /// that average is strictly positive. Ties resolve to the strategy that
    /// reached the maximum first in insertion order.
    pub fn get_best_strategy_for_cluster(&self, cluster_name: &str) -> Option<Strategy> {
        let cluster = self.clusters.iter().find(|c| c.name == cluster_name)?;

        let mut best: Option<Strategy> = None;
        let mut best_avg = f64::NEG_INFINITY;
        for perf in &cluster.strategy_performance {
            if perf.total > 0 {
                let avg = perf.avg_reward();
                if avg > best_avg {
                    best_avg = avg;
                    best = Some(perf.strategy);
                }
            }
        }

        if best_avg > 0.0 {
            best
        } else {
            None
        }
    }

    /// Ask the oracle whether a query resembles the cluster's most recently
    /// added query; fall back to word overlap on failure.
    pub async fn is_similar_to_cluster(&self, query: &str, cluster_name: &str) -> bool {
        let Some(cluster) = self.clusters.iter().find(|c| c.name == cluster_name) else {
            return false;
        };
        let Some(representative) = cluster.queries.last() else {
            return false;
        };

        match self.oracle.judge_similarity(query, representative).await {
            Ok(verdict) => verdict.to_uppercase().contains("SIMILAR"),
            Err(e) => {
                tracing::warn!(error = %e, "similarity oracle failed, using word overlap");
                word_overlap(query, representative) >= self.config.fallback_min_overlap
            }
        }
    }

    /// Read-side summary for one cluster; empty for unknown names.
    pub fn get_cluster_info(&self, cluster_name: &str) -> ClusterSummary {
        let Some(cluster) = self.clusters.iter().find(|c| c.name == cluster_name) else {
            return ClusterSummary::default();
        };

        let strategy_performance = cluster
            .strategy_performance
            .iter()
            .filter(|p| p.total > 0)
            .map(|p| {
                (
                    p.strategy,
                    StrategyUsage {
                        uses: p.total,
                        avg_reward: round3(p.avg_reward()),
                    },
                )
            })
            .collect();

        ClusterSummary {
            name: cluster.name.clone(),
            query_count: cluster.queries.len(),
            example_queries: cluster.queries.iter().take(3).cloned().collect(),
            strategy_performance,
            best_strategy: self.get_best_strategy_for_cluster(cluster_name),
        }
    }

    /// All cluster summaries, largest first; ties keep encounter order.
    pub fn get_all_clusters_summary(&self) -> Vec<ClusterSummary> {
        let mut summaries: Vec<ClusterSummary> = self
            .clusters
            .iter()
            .map(|c| self.get_cluster_info(&c.name))
            .collect();
        summaries.sort_by(|a, b| b.query_count.cmp(&a.query_count));
        summaries
    }

    pub fn cluster_count(&self) -> usize {
        self.clusters.len()
    }

    /// Short textual summary of existing clusters for oracle context.
    fn existing_groups_summary(&self) -> String {
        if self.clusters.is_empty() {
            return "No existing groups yet.".to_string();
        }

        self.clusters
            .iter()
            .take(self.config.max_context_groups)
            .map(|cluster| {
                let examples: Vec<&str> = cluster
                    .queries
                    .iter()
                    .take(self.config.context_examples)
                    .map(String::as_str)
                    .collect();
                format!("- {}: {}", cluster.name, examples.join(", "))
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Create the cluster or append the query (exact-match de-duplicated).
    /// Returns true when the cluster was newly created.
    fn insert_query(&mut self, name: &str, query: &str) -> bool {
        match self.clusters.iter_mut().find(|c| c.name == name) {
            Some(cluster) => {
                if !cluster.queries.iter().any(|q| q == query) {
                    cluster.queries.push(query.to_string());
                }
                false
            }
            None => {
                self.clusters.push(Cluster::new(name, query));
                true
            }
        }
    }

    fn persist(&self) -> Result<()> {
        self.store
            .save(Artifact::QueryClusters, &self.user_id, &self.clusters)?;
        Ok(())
    }
}

/// Parse the `GROUP:` line out of an oracle clustering response and
/// normalize it (lowercase, spaces to underscores).
fn parse_group_name(response: &str) -> Option<String> {
    response.lines().find_map(|line| {
        let name = line.trim().strip_prefix("GROUP:")?.trim();
        if name.is_empty() {
            None
        } else {
            Some(name.to_lowercase().replace(' ', "_"))
        }
    })
}

/// Number of distinct words two texts share (lowercased, whitespace split).
fn word_overlap(first: &str, second: &str) -> usize {
    let a: HashSet<String> = first.to_lowercase().split_whitespace().map(String::from).collect();
    let b: HashSet<String> = second.to_lowercase().split_whitespace().map(String::from).collect();
    a.intersection(&b).count()
}
