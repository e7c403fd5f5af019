//! Self-adaptive RAG decision core.
//!
//! Decides, per incoming query, which response-generation strategy to use and
//! how many passages to retrieve. Combines a contextual multi-armed bandit
//! over a fixed strategy set with online semantic query clustering, both
//! backed by per-user JSON persistence. Retrieval and text generation are
//! external collaborators behind the [`Retrieval`] and [`TextOracle`] traits.

pub mod bandit;
pub mod clustering;
pub mod config;
pub mod engine;
pub mod oracle;
pub mod recall;
pub mod retrieval;
pub mod store;
pub mod templates;
pub mod types;

pub use bandit::StrategyBandit;
pub use clustering::QueryClusterer;
pub use config::LearningConfig;
pub use engine::AdaptiveEngine;
pub use oracle::{OpenAiOracle, TextOracle};
pub use retrieval::{Retrieval, RetrievedDocument};
pub use store::{JsonStore, StoreError};
pub use types::{
    ClusterSummary, FeedbackEntry, ImprovementInfo, PerformanceMetrics, QueryComplexity,
    QueryMetadata, QueryOutcome, Strategy, StrategyStats,
};

// Re-export common types
pub use anyhow::{Error, Result};
