// Database module
// SQLite for document metadata, a vector store (LanceDB or in-memory) for embeddings

pub mod lancedb;
pub mod memory;
pub mod sqlite;


use std::sync::Arc;

use async_trait::async_trait;

use crate::Result;
use crate::config::{Config, VectorStoreKind};
use crate::parsing::Document;

pub use self::lancedb::LanceVectorStore;
pub use memory::MemoryVectorStore;
pub use sqlite::*;

/// A chunk and its embedding, ready to be stored
#[derive(Debug, Clone, PartialEq)]
pub struct VectorRecord {
    pub id: String,
    pub vector: Vec<f32>,
    pub document: Document,
}

/// One similarity search result
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub document: Document,
    /// Squared euclidean distance to the query, smaller is closer
    pub distance: f32,
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Short backend name for logs
    fn name(&self) -> &'static str;

    async fn add(&self, records: Vec<VectorRecord>) -> Result<()>;

    /// At most `k` nearest records, nearest first. With `file_ids` only
    /// records of those files are considered.
    async fn similarity_search(
        &self,
        query_vector: &[f32],
        k: usize,
        file_ids: Option<&[String]>,
    ) -> Result<Vec<SearchHit>>;

    async fn delete_file(&self, file_id: &str) -> Result<()>;

    async fn count(&self) -> Result<usize>;

    /// Number of stored vectors belonging to `file_id`
    async fn count_file(&self, file_id: &str) -> Result<usize>;

    /// Compact storage after deletes
    #[inline]
    async fn optimize(&self) -> Result<()> {
        Ok(())
    }
}

/// Open the configured vector store for vectors produced by the embedder
/// with `signature`
#[inline]
pub async fn open_vector_store(config: &Config, signature: &str) -> Result<Arc<dyn VectorStore>> {
    let store: Arc<dyn VectorStore> = match config.retrieval.vector_store {
        VectorStoreKind::Memory => Arc::new(MemoryVectorStore::new()),
        VectorStoreKind::LanceDb => Arc::new(
            LanceVectorStore::open(&config.vector_database_path(), signature).await?,
        ),
    };
    Ok(store)
}

/// Squared euclidean distance
#[inline]
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}
