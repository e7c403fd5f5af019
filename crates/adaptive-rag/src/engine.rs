//! Per-user orchestrator.
//!
//! Composes the clusterer, bandit and similarity recall into one per-query
//! decision and one feedback-submission transaction. Each user owns an
//! independent engine; the calling layer serializes operations per user.

use anyhow::{anyhow, Context, Result};
use std::sync::Arc;

use crate::bandit::StrategyBandit;
use crate::clustering::QueryClusterer;
use crate::config::LearningConfig;
use crate::oracle::TextOracle;
use crate::recall;
use crate::retrieval::Retrieval;
use crate::store::JsonStore;
use crate::types::{
    truncate_chars, ClusterSummary, PerformanceMetrics, QueryComplexity, QueryMetadata,
    QueryOutcome, Strategy,
};

/// Answer used when retrieval comes back empty.
pub const NO_RESULTS_ANSWER: &str =
    "I couldn't find relevant information to answer your question.";

const SNIPPET_CHARS: usize = 100;

pub struct AdaptiveEngine {
    user_id: String,
    config: LearningConfig,
    clusterer: QueryClusterer,
    bandit: StrategyBandit,
    oracle: Arc<dyn TextOracle>,
    retrieval: Arc<dyn Retrieval>,
}

impl AdaptiveEngine {
    /// Build the engine for one user, loading persisted state. Corrupt
    /// persisted documents surface here as fatal errors.
    pub fn new(
        user_id: impl Into<String>,
        config: LearningConfig,
        oracle: Arc<dyn TextOracle>,
        retrieval: Arc<dyn Retrieval>,
    ) -> Result<Self> {
        config.validate().map_err(|e| anyhow!("invalid config: {e}"))?;
        let user_id = user_id.into();
        let store = JsonStore::new(&config.data_dir);

        let clusterer = QueryClusterer::new(
            &user_id,
            config.clustering.clone(),
            store.clone(),
            oracle.clone(),
        )
        .context("failed to load query clusters")?;
        let bandit = StrategyBandit::new(&user_id, config.bandit.clone(), store)
            .context("failed to load strategy statistics")?;

        tracing::info!(user = %user_id, "adaptive engine ready");
        Ok(Self {
            user_id,
            config,
            clusterer,
            bandit,
            oracle,
            retrieval,
        })
    }

    /// Process one query: cluster it, pick a strategy, retrieve and generate.
    pub async fn query(&mut self, user_query: &str) -> Result<QueryOutcome> {
        let query = preprocess(user_query);

        let (cluster_name, is_new_cluster) = self
            .clusterer
            .assign_cluster(&query)
            .await
            .context("cluster assignment failed")?;

        let complexity = match self.oracle.classify_complexity(&query).await {
            Ok(text) => QueryComplexity::from_response(&text),
            Err(e) => {
                tracing::warn!(error = %e, "complexity oracle failed, assuming moderate");
                QueryComplexity::Moderate
            }
        };

        let cluster_best = self.clusterer.get_best_strategy_for_cluster(&cluster_name);
        let (strategy, top_k) = self.bandit.select_strategy(&query, complexity, cluster_best);

        tracing::info!(
            user = %self.user_id,
            query = %query,
            strategy = %strategy,
            complexity = %complexity,
            cluster = %cluster_name,
            "processing query"
        );

        let improvement = recall::get_query_improvement(
            self.bandit.recent_history(self.config.recall.window),
            &query,
            &self.config.recall,
        );
        let cluster_info = self.clusterer.get_cluster_info(&cluster_name);

        let docs = self
            .retrieval
            .search(&query, top_k)
            .await
            .context("retrieval search failed")?;
        tracing::debug!(retrieved = docs.len(), top_k, "retrieval complete");

        let metadata = QueryMetadata {
            strategy,
            top_k,
            complexity,
            retrieved_docs: docs
                .iter()
                .map(|d| truncate_chars(&d.content, SNIPPET_CHARS))
                .collect(),
            improvement,
            cluster_name,
            cluster_info,
            is_new_cluster,
            used_cluster_strategy: cluster_best == Some(strategy),
        };

        if docs.is_empty() {
            return Ok(QueryOutcome {
                answer: NO_RESULTS_ANSWER.to_string(),
                metadata,
            });
        }

        let context: String = docs
            .iter()
            .map(|d| d.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let answer = self
            .oracle
            .generate(strategy, &context, &query)
            .await
            .context("answer generation failed")?;

        Ok(QueryOutcome { answer, metadata })
    }

    /// Record one feedback event across both accumulators: the bandit's
    /// global per-strategy statistics, and (when a cluster is known) the
    /// clusterer's per-cluster statistics. The two stores persist
    /// independently and atomically.
    pub fn submit_feedback(
        &mut self,
        query: &str,
        strategy: Strategy,
        response: &str,
        feedback: i32,
        retrieved_docs: &[String],
        cluster: Option<&str>,
    ) -> Result<()> {
        let reward = if feedback > 0 { 1.0 } else { -1.0 };

        self.bandit
            .record_feedback(
                query,
                strategy,
                response,
                feedback,
                retrieved_docs,
                cluster.map(str::to_string),
            )
            .context("failed to record feedback")?;

        if let Some(name) = cluster {
            self.clusterer
                .record_strategy_performance(name, strategy, reward)
                .context("failed to record cluster performance")?;
        }

        tracing::info!(
            user = %self.user_id,
            strategy = %strategy,
            feedback,
            "recorded user feedback"
        );
        Ok(())
    }

    /// Bandit metrics with cluster summaries merged in.
    pub fn metrics(&self) -> PerformanceMetrics {
        let mut metrics = self.bandit.get_performance_metrics();
        metrics.clusters = self.clusterer.get_all_clusters_summary();
        metrics.total_clusters = metrics.clusters.len();
        metrics
    }

    pub fn cluster_info(&self, cluster_name: &str) -> ClusterSummary {
        self.clusterer.get_cluster_info(cluster_name)
    }

    pub fn clusters_summary(&self) -> Vec<ClusterSummary> {
        self.clusterer.get_all_clusters_summary()
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }
}

/// Trim and collapse internal whitespace.
pub fn preprocess(query: &str) -> String {
    query.split_whitespace().collect::<Vec<_>>().join(" ")
}
