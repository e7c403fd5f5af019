//! Similarity recall over recent feedback history.
//!
//! Surfaces past queries similar to the current one so the caller can show
//! "learning applied" context. Pure read-side word overlap; no persistence.

use crate::config::RecallConfig;
use crate::types::{FeedbackEntry, ImprovementInfo, SimilarQuery};
use std::collections::HashSet;

/// Jaccard similarity over lowercased whitespace tokens. Either side empty
/// yields 0.0.
pub fn jaccard(first: &str, second: &str) -> f64 {
    let a: HashSet<&str> = first.split_whitespace().collect();
    let b: HashSet<&str> = second.split_whitespace().collect();

    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let intersection = a.intersection(&b).count();
    let union = a.union(&b).count();
    intersection as f64 / union as f64
}

/// Scan the most recent `window` feedback entries for queries strictly more
/// similar than the threshold, returning at most `max_matches` of the most
/// recent matches in chronological order.
pub fn get_query_improvement(
    history: &[FeedbackEntry],
    current_query: &str,
    config: &RecallConfig,
) -> ImprovementInfo {
    let start = history.len().saturating_sub(config.window);
    let current = current_query.to_lowercase();

    let mut matches: Vec<SimilarQuery> = history[start..]
        .iter()
        .filter(|entry| jaccard(&current, &entry.query.to_lowercase()) > config.similarity_threshold)
        .map(|entry| SimilarQuery {
            query: entry.query.clone(),
            strategy: entry.strategy,
            feedback: entry.feedback,
            timestamp: entry.timestamp,
        })
        .collect();

    if matches.len() > config.max_matches {
        let drop = matches.len() - config.max_matches;
        matches.drain(..drop);
    }

    ImprovementInfo {
        has_similar: !matches.is_empty(),
        learning_active: !matches.is_empty(),
        similar_queries: matches,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Strategy;
    use chrono::Utc;

    fn entry(query: &str) -> FeedbackEntry {
        FeedbackEntry {
            timestamp: Utc::now(),
            query: query.to_string(),
            strategy: Strategy::Concise,
            response: String::new(),
            feedback: 1,
            reward: 1.0,
            retrieved_docs: Vec::new(),
            cluster: None,
        }
    }

    #[test]
    fn jaccard_of_identical_queries_is_one() {
        assert_eq!(jaccard("what is rust", "what is rust"), 1.0);
    }

    #[test]
    fn jaccard_of_empty_side_is_zero() {
        assert_eq!(jaccard("", "what is rust"), 0.0);
        assert_eq!(jaccard("what is rust", "   "), 0.0);
    }

    #[test]
    fn threshold_is_strict() {
        // 3 shared of 5 total words: exactly 0.6, which must be excluded.
        let boundary = jaccard("a b c d", "a b c e");
        assert!((boundary - 0.6).abs() < 1e-12);

        let history = vec![entry("a b c d")];
        let info = get_query_improvement(&history, "a b c e", &RecallConfig::default());
        assert!(!info.has_similar);

        // 3 of 4: 0.75, above the threshold.
        let history = vec![entry("what is photosynthesis process")];
        let info = get_query_improvement(&history, "what is photosynthesis", &RecallConfig::default());
        assert!(info.has_similar);
        assert!(info.learning_active);
        assert_eq!(info.similar_queries.len(), 1);
    }

    #[test]
    fn only_recent_window_is_scanned() {
        let mut history = vec![entry("what is rust ownership")];
        for i in 0..20 {
            history.push(entry(&format!("unrelated topic number {i}")));
        }

        // The similar entry is 21 entries back, outside the 20-entry window.
        let info = get_query_improvement(&history, "what is rust ownership", &RecallConfig::default());
        assert!(!info.has_similar);
    }

    #[test]
    fn keeps_three_most_recent_matches_in_order() {
        let history: Vec<FeedbackEntry> = (0..5)
            .map(|i| entry(&format!("explain rust borrow checker {i}")))
            .collect();

        let info = get_query_improvement(
            &history,
            "explain rust borrow checker",
            &RecallConfig::default(),
        );
        assert_eq!(info.similar_queries.len(), 3);
        // Most recent three, chronological order preserved.
        assert_eq!(info.similar_queries[0].query, "explain rust borrow checker 2");
        assert_eq!(info.similar_queries[2].query, "explain rust borrow checker 4");
    }
}
