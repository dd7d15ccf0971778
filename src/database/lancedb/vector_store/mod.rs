
use std::path::Path;

use arrow::array::RecordBatchIterator;
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{Connection, DistanceType, Table};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::{
    VECTOR_COLUMN, batch_to_hits, chunk_schema, quote_literal, records_to_batch,
    schema_dimension, table_name_for,
};
use crate::database::{SearchHit, VectorRecord, VectorStore};
use crate::{QaError, Result};

/// Persistent vector store backed by a LanceDB table.
///
/// Each embedder signature gets its own table, so switching embedding
/// models never mixes vector spaces.
pub struct LanceVectorStore {
    connection: Connection,
    table_name: String,
    vector_dimension: Mutex<Option<usize>>,
}

impl LanceVectorStore {
    /// Open (or create) the database at `db_path` and bind to the table for
    /// `signature`. The table itself is created on the first insert, once
    /// the vector dimension is known.
    #[inline]
    pub async fn open(db_path: &Path, signature: &str) -> Result<Self> {
        debug!("Initializing LanceDB at path: {}", db_path.display());

        std::fs::create_dir_all(db_path).map_err(|e| {
            QaError::Database(format!("Failed to create vector database directory: {}", e))
        })?;

        let uri = db_path.to_string_lossy().to_string();

        let connection = match lancedb::connect(&uri).execute().await {
            Ok(conn) => conn,
            Err(e) => {
                error!("Failed to connect to LanceDB: {}", e);

                if looks_corrupted(&e.to_string()) {
                    warn!("Database corruption detected, attempting recovery");
                    attempt_corruption_recovery(db_path)?;

                    lancedb::connect(&uri).execute().await.map_err(|e| {
                        QaError::Database(format!(
                            "Failed to connect to LanceDB after recovery: {}",
                            e
                        ))
                    })?
                } else {
                    return Err(QaError::Database(format!(
                        "Failed to connect to LanceDB: {}",
                        e
                    )));
                }
            }
        };

        let store = Self {
            connection,
            table_name: table_name_for(signature),
            vector_dimension: Mutex::new(None),
        };
        store.detect_dimension_with_recovery().await?;

        info!("Vector store ready (table {})", store.table_name);
        Ok(store)
    }

    #[inline]
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    async fn table_exists(&self) -> Result<bool> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| QaError::Database(format!("Failed to list tables: {}", e)))?;
        Ok(table_names.contains(&self.table_name))
    }

    async fn open_table(&self) -> Result<Option<Table>> {
        if !self.table_exists().await? {
            return Ok(None);
        }

        let table = self
            .connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| QaError::Database(format!("Failed to open table: {}", e)))?;
        Ok(Some(table))
    }

    async fn detect_dimension(&self) -> Result<()> {
        let Some(table) = self.open_table().await? else {
            debug!("Table {} does not exist yet", self.table_name);
            return Ok(());
        };

        let schema = table
            .schema()
            .await
            .map_err(|e| QaError::Database(format!("Failed to get table schema: {}", e)))?;

        let dim = schema_dimension(&schema).ok_or_else(|| {
            QaError::Database("Invalid schema: could not determine vector dimension".to_string())
        })?;

        info!("Detected existing vector dimension: {}", dim);
        *self.vector_dimension.lock().await = Some(dim);
        Ok(())
    }

    async fn detect_dimension_with_recovery(&self) -> Result<()> {
        match self.detect_dimension().await {
            Ok(()) => Ok(()),
            Err(e) if looks_corrupted(&e.to_string()) => {
                warn!("Table corruption detected during initialization: {}", e);

                if let Err(drop_err) = self.drop_table_if_exists().await {
                    warn!("Failed to drop corrupted table: {}", drop_err);
                }

                *self.vector_dimension.lock().await = None;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn drop_table_if_exists(&self) -> Result<()> {
        if self.table_exists().await? {
            info!("Dropping table {}", self.table_name);
            self.connection
                .drop_table(&self.table_name)
                .await
                .map_err(|e| QaError::Database(format!("Failed to drop table: {}", e)))?;
        }
        Ok(())
    }
}

#[async_trait]
impl VectorStore for LanceVectorStore {
    #[inline]
    fn name(&self) -> &'static str {
        "lancedb"
    }

    #[inline]
    async fn add(&self, records: Vec<VectorRecord>) -> Result<()> {
        let Some(first) = records.first() else {
            debug!("No embeddings to store");
            return Ok(());
        };

        let mut dimension = self.vector_dimension.lock().await;
        let vector_dim = match *dimension {
            Some(existing) => existing,
            None => {
                let dim = first.vector.len();
                info!(
                    "Creating table {} with {} dimensions",
                    self.table_name, dim
                );
                self.connection
                    .create_empty_table(&self.table_name, chunk_schema(dim))
                    .execute()
                    .await
                    .map_err(|e| QaError::Database(format!("Failed to create table: {}", e)))?;
                *dimension = Some(dim);
                dim
            }
        };

        let record_batch = records_to_batch(&records, vector_dim)?;

        let table = self.open_table().await?.ok_or_else(|| {
            QaError::Database(format!("Table {} disappeared", self.table_name))
        })?;

        let schema = record_batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(record_batch)), schema);
        table
            .add(reader)
            .execute()
            .await
            .map_err(|e| QaError::Database(format!("Failed to insert embeddings: {}", e)))?;

        info!("Stored {} embeddings", records.len());
        Ok(())
    }

    #[inline]
    async fn similarity_search(
        &self,
        query_vector: &[f32],
        k: usize,
        file_ids: Option<&[String]>,
    ) -> Result<Vec<SearchHit>> {
        debug!("Searching for similar vectors with limit: {}", k);

        if k == 0 || file_ids.is_some_and(<[String]>::is_empty) {
            return Ok(Vec::new());
        }

        let known_dimension = *self.vector_dimension.lock().await;
        if let Some(dim) = known_dimension
            && dim != query_vector.len()
        {
            return Err(QaError::Database(format!(
                "Query dimension {} does not match index dimension {}",
                query_vector.len(),
                dim
            )));
        }

        let Some(table) = self.open_table().await? else {
            return Ok(Vec::new());
        };

        let mut query = table
            .vector_search(query_vector)
            .map_err(|e| QaError::Database(format!("Failed to create vector search: {}", e)))?
            .column(VECTOR_COLUMN)
            .distance_type(DistanceType::L2)
            .limit(k);

        if let Some(ids) = file_ids {
            let list = ids
                .iter()
                .map(|id| quote_literal(id))
                .collect::<Vec<_>>()
                .join(", ");
            query = query.only_if(format!("file_id IN ({})", list));
        }

        let mut results = query
            .execute()
            .await
            .map_err(|e| QaError::Database(format!("Failed to execute search: {}", e)))?;

        let mut hits = Vec::new();
        while let Some(batch) = results
            .try_next()
            .await
            .map_err(|e| QaError::Database(format!("Failed to read result stream: {}", e)))?
        {
            hits.extend(batch_to_hits(&batch)?);
        }

        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(k);

        debug!("Parsed {} search results", hits.len());
        Ok(hits)
    }

    #[inline]
    async fn delete_file(&self, file_id: &str) -> Result<()> {
        let Some(table) = self.open_table().await? else {
            return Ok(());
        };

        let predicate = format!("file_id = {}", quote_literal(file_id));
        table
            .delete(&predicate)
            .await
            .map_err(|e| QaError::Database(format!("Failed to delete file embeddings: {}", e)))?;

        info!("Deleted embeddings for file: {}", file_id);
        Ok(())
    }

    #[inline]
    async fn count(&self) -> Result<usize> {
        let Some(table) = self.open_table().await? else {
            return Ok(0);
        };

        table
            .count_rows(None)
            .await
            .map_err(|e| QaError::Database(format!("Failed to count rows: {}", e)))
    }

    #[inline]
    async fn count_file(&self, file_id: &str) -> Result<usize> {
        let Some(table) = self.open_table().await? else {
            return Ok(0);
        };

        table
            .count_rows(Some(format!("file_id = {}", quote_literal(file_id))))
            .await
            .map_err(|e| QaError::Database(format!("Failed to count file rows: {}", e)))
    }

    /// Compact table files after many deletes
    #[inline]
    async fn optimize(&self) -> Result<()> {
        let Some(table) = self.open_table().await? else {
            return Ok(());
        };

        table
            .optimize(lancedb::table::OptimizeAction::All)
            .await
            .map_err(|e| QaError::Database(format!("Failed to optimize table: {}", e)))?;

        info!("Vector database optimization completed");
        Ok(())
    }
}

fn looks_corrupted(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("corrupt") || message.contains("malformed") || message.contains("invalid schema")
}

/// Move a broken database aside so a fresh one can be created
fn attempt_corruption_recovery(db_path: &Path) -> Result<()> {
    warn!(
        "Attempting database corruption recovery at {}",
        db_path.display()
    );

    if db_path.exists() {
        let backup_path = db_path.with_extension("corrupted_backup");
        if let Err(e) = std::fs::rename(db_path, &backup_path) {
            error!("Failed to backup corrupted database: {}", e);
        } else {
            info!("Corrupted database backed up to {}", backup_path.display());
        }
    }

    if db_path.exists() {
        std::fs::remove_dir_all(db_path).map_err(|e| {
            QaError::Database(format!("Failed to remove corrupted database: {}", e))
        })?;
    }

    std::fs::create_dir_all(db_path).map_err(|e| {
        QaError::Database(format!("Failed to recreate vector database directory: {}", e))
    })?;

    info!("Database corruption recovery completed");
    Ok(())
}
