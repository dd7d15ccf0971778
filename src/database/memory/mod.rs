
use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::{SearchHit, VectorRecord, VectorStore, squared_l2};
use crate::{QaError, Result};

/// Exact flat index kept in process memory.
///
/// Every search scans all records, so results are exact.
#[derive(Debug, Default)]
pub struct MemoryVectorStore {
    records: RwLock<Vec<VectorRecord>>,
}

impl MemoryVectorStore {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    #[inline]
    fn name(&self) -> &'static str {
        "memory"
    }

    #[inline]
    async fn add(&self, records: Vec<VectorRecord>) -> Result<()> {
        let mut stored = self.records.write().await;

        let expected = stored
            .first()
            .or_else(|| records.first())
            .map(|r| r.vector.len());

        if let Some(expected) = expected
            && let Some(bad) = records.iter().find(|r| r.vector.len() != expected)
        {
            return Err(QaError::Database(format!(
                "Vector dimension mismatch: index has {} but record {} has {}",
                expected,
                bad.id,
                bad.vector.len()
            )));
        }

        debug!("Adding {} vectors to memory store", records.len());
        stored.extend(records);
        Ok(())
    }

    #[inline]
    async fn similarity_search(
        &self,
        query_vector: &[f32],
        k: usize,
        file_ids: Option<&[String]>,
    ) -> Result<Vec<SearchHit>> {
        let stored = self.records.read().await;

        if let Some(first) = stored.first()
            && first.vector.len() != query_vector.len()
        {
            return Err(QaError::Database(format!(
                "Query dimension {} does not match index dimension {}",
                query_vector.len(),
                first.vector.len()
            )));
        }

        let mut hits: Vec<SearchHit> = stored
            .iter()
            .filter(|r| {
                file_ids.is_none_or(|ids| {
                    r.document
                        .metadata
                        .file_id
                        .as_ref()
                        .is_some_and(|id| ids.contains(id))
                })
            })
            .map(|r| SearchHit {
                document: r.document.clone(),
                distance: squared_l2(query_vector, &r.vector),
            })
            .collect();

        // stable, so ties keep insertion order
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(k);

        debug!("Memory search returned {} hits", hits.len());
        Ok(hits)
    }

    #[inline]
    async fn delete_file(&self, file_id: &str) -> Result<()> {
        let mut stored = self.records.write().await;
        stored.retain(|r| r.document.metadata.file_id.as_deref() != Some(file_id));
        Ok(())
    }

    #[inline]
    async fn count(&self) -> Result<usize> {
        Ok(self.records.read().await.len())
    }

    #[inline]
    async fn count_file(&self, file_id: &str) -> Result<usize> {
        let stored = self.records.read().await;
        Ok(stored
            .iter()
            .filter(|r| r.document.metadata.file_id.as_deref() == Some(file_id))
            .count())
    }
}
