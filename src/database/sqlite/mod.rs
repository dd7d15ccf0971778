use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use tracing::{debug, info};

use crate::database::sqlite::models::{
    ChunkRecord, DocumentRecord, DocumentUpdate, NewChunk, NewDocument, PageRecord,
};
use crate::database::sqlite::queries::{ChunkQueries, DocumentQueries, PageQueries};
use crate::parsing::Document;


pub mod models;
pub mod queries;

pub use models::DocumentStatus;

pub type DbPool = Pool<Sqlite>;

#[derive(Debug, Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    #[inline]
    pub async fn new<P: AsRef<Path>>(database_path: P) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(database_path)
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect_with(options)
            .await
            .context("Failed to create database connection pool")?;

        let database = Self { pool };
        database.run_migrations().await?;

        Ok(database)
    }

    #[inline]
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    #[inline]
    pub async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations");

        sqlx::migrate!("src/database/sqlite/migrations")
            .run(&self.pool)
            .await
            .context("Failed to run schema migration")?;

        debug!("Database migrations completed successfully");
        Ok(())
    }

    #[inline]
    pub async fn initialize_from_config_dir(config_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(config_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                config_dir.display()
            )
        })?;

        Self::new(config_dir.join("metadata.db")).await
    }

    // Document operations
    #[inline]
    pub async fn upsert_document(&self, document: NewDocument) -> Result<DocumentRecord> {
        DocumentQueries::upsert(&self.pool, document).await
    }

    #[inline]
    pub async fn get_document(&self, id: &str) -> Result<Option<DocumentRecord>> {
        DocumentQueries::get_by_id(&self.pool, id).await
    }

    #[inline]
    pub async fn find_documents_by_id_prefix(&self, prefix: &str) -> Result<Vec<DocumentRecord>> {
        DocumentQueries::find_by_id_prefix(&self.pool, prefix).await
    }

    #[inline]
    pub async fn find_documents_by_name(&self, name: &str) -> Result<Vec<DocumentRecord>> {
        DocumentQueries::find_by_name(&self.pool, name).await
    }

    #[inline]
    pub async fn list_documents(&self) -> Result<Vec<DocumentRecord>> {
        DocumentQueries::list_all(&self.pool).await
    }

    #[inline]
    pub async fn update_document(
        &self,
        id: &str,
        update: DocumentUpdate,
    ) -> Result<Option<DocumentRecord>> {
        DocumentQueries::update(&self.pool, id, update).await
    }

    #[inline]
    pub async fn delete_document(&self, id: &str) -> Result<bool> {
        DocumentQueries::delete(&self.pool, id).await
    }

    // Page and chunk operations
    #[inline]
    pub async fn replace_pages(&self, document_id: &str, pages: &[Document]) -> Result<()> {
        PageQueries::replace_for_document(&self.pool, document_id, pages).await
    }

    #[inline]
    pub async fn get_pages(&self, document_id: &str) -> Result<Vec<PageRecord>> {
        PageQueries::list_for_document(&self.pool, document_id).await
    }

    #[inline]
    pub async fn replace_chunks(
        &self,
        document_id: &str,
        chunks: Vec<NewChunk>,
    ) -> Result<Vec<ChunkRecord>> {
        ChunkQueries::replace_for_document(&self.pool, document_id, chunks).await
    }

    #[inline]
    pub async fn get_chunks(&self, document_id: &str) -> Result<Vec<ChunkRecord>> {
        ChunkQueries::list_for_document(&self.pool, document_id).await
    }

    /// Optimize database performance by running VACUUM and ANALYZE
    #[inline]
    pub async fn optimize(&self) -> Result<()> {
        info!("Optimizing database performance");

        sqlx::query("VACUUM")
            .execute(&self.pool)
            .await
            .context("Failed to vacuum database")?;

        sqlx::query("ANALYZE")
            .execute(&self.pool)
            .await
            .context("Failed to analyze database")?;

        debug!("Database optimization completed");
        Ok(())
    }
}
