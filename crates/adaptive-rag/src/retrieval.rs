//! External nearest-neighbor retrieval seam.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A passage returned by the retrieval service, ordered by relevance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedDocument {
    pub content: String,
    pub id: String,
    pub distance: f32,
}

/// Contract with the external vector store. The core only ever asks for the
/// top-k nearest passages; ranking and embedding math live on the other side
/// of this trait.
#[async_trait]
pub trait Retrieval: Send + Sync {
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<RetrievedDocument>>;
}
