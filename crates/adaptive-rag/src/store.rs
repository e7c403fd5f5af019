//! Per-user JSON document persistence.
//!
//! One file per (user, artifact) tuple, rewritten atomically after each
//! mutation. Missing files are empty defaults; malformed files are fatal —
//! corruption must surface to the caller rather than silently reset learned
//! state.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// The three persisted documents each user owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    FeedbackHistory,
    StrategyStats,
    QueryClusters,
}

impl Artifact {
    fn file_name(&self, user_id: &str) -> String {
        match self {
            Artifact::FeedbackHistory => format!("feedback_{user_id}.json"),
            Artifact::StrategyStats => format!("strategy_{user_id}.json"),
            Artifact::QueryClusters => format!("query_clusters_{user_id}.json"),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("corrupt persisted document at {path}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode document for {path}")]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Durable key/value JSON store rooted at a data directory.
///
/// Single-writer-per-key: callers must not interleave concurrent mutations
/// for the same user.
#[derive(Debug, Clone)]
pub struct JsonStore {
    data_dir: PathBuf,
}

impl JsonStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn path_for(&self, artifact: Artifact, user_id: &str) -> PathBuf {
        self.data_dir.join(artifact.file_name(user_id))
    }

    /// Load a document. `Ok(None)` when nothing has been persisted yet.
    pub fn load<T: DeserializeOwned>(
        &self,
        artifact: Artifact,
        user_id: &str,
    ) -> Result<Option<T>, StoreError> {
        let path = self.path_for(artifact, user_id);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::Io { path, source: e }),
        };
        let doc = serde_json::from_str(&content)
            .map_err(|e| StoreError::Corrupt { path, source: e })?;
        Ok(Some(doc))
    }

    /// Atomically overwrite a document: write the whole serialized form to a
    /// sibling temp file, then rename into place.
    pub fn save<T: Serialize>(
        &self,
        artifact: Artifact,
        user_id: &str,
        doc: &T,
    ) -> Result<(), StoreError> {
        let path = self.path_for(artifact, user_id);
        ensure_parent(&path).map_err(|e| StoreError::Io {
            path: path.clone(),
            source: e,
        })?;

        let json = serde_json::to_vec_pretty(doc).map_err(|e| StoreError::Encode {
            path: path.clone(),
            source: e,
        })?;

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, &json).map_err(|e| StoreError::Io {
            path: tmp.clone(),
            source: e,
        })?;
        fs::rename(&tmp, &path).map_err(|e| StoreError::Io { path, source: e })?;
        Ok(())
    }
}

/// Create the parent directory of `path` if it does not exist.
pub fn ensure_parent(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn missing_document_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path());
        let loaded: Option<Vec<String>> = store.load(Artifact::FeedbackHistory, "alice").unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path());
        let doc: HashMap<String, u64> = HashMap::from([("concise".into(), 3)]);

        store.save(Artifact::StrategyStats, "alice", &doc).unwrap();
        let loaded: HashMap<String, u64> = store
            .load(Artifact::StrategyStats, "alice")
            .unwrap()
            .unwrap();
        assert_eq!(loaded, doc);
    }

    #[test]
    fn corrupt_document_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path());
        let path = store.path_for(Artifact::QueryClusters, "alice");
        fs::create_dir_all(dir.path()).unwrap();
        fs::write(&path, "{ not valid json").unwrap();

        let result: Result<Option<Vec<String>>, _> = store.load(Artifact::QueryClusters, "alice");
        assert!(matches!(result, Err(StoreError::Corrupt { .. })));
    }

    #[test]
    fn save_creates_missing_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path().join("nested").join("deeper"));
        store
            .save(Artifact::FeedbackHistory, "bob", &vec!["entry".to_string()])
            .unwrap();
        let loaded: Option<Vec<String>> = store.load(Artifact::FeedbackHistory, "bob").unwrap();
        assert_eq!(loaded.unwrap(), vec!["entry".to_string()]);
    }

    #[test]
    fn overwrite_replaces_whole_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path());
        store
            .save(Artifact::FeedbackHistory, "alice", &vec![1u64, 2, 3])
            .unwrap();
        store
            .save(Artifact::FeedbackHistory, "alice", &vec![9u64])
            .unwrap();
        let loaded: Vec<u64> = store
            .load(Artifact::FeedbackHistory, "alice")
            .unwrap()
            .unwrap();
        assert_eq!(loaded, vec![9]);
        // No temp file left behind after the rename
        assert!(!store
            .path_for(Artifact::FeedbackHistory, "alice")
            .with_extension("json.tmp")
            .exists());
    }

    #[test]
    fn users_have_independent_documents() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path());
        store
            .save(Artifact::StrategyStats, "alice", &vec![1u64])
            .unwrap();
        let other: Option<Vec<u64>> = store.load(Artifact::StrategyStats, "bob").unwrap();
        assert!(other.is_none());
    }
}
