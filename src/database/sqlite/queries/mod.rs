
use super::models::*;
use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use crate::parsing::Document;

const DOCUMENT_COLUMNS: &str = r#"
    id,
    name,
    kind,
    size_bytes,
    status,
    page_count,
    chunk_count,
    embedding_signature,
    chunk_size,
    chunk_overlap,
    error_message,
    created_date,
    indexed_date
"#;

pub struct DocumentQueries;

impl DocumentQueries {
    /// Insert a new document, or reset an existing one with the same id to
    /// `pending` with the new name and chunk settings
    #[inline]
    pub async fn upsert(pool: &SqlitePool, new_document: NewDocument) -> Result<DocumentRecord> {
        let now = Utc::now().naive_utc();
        sqlx::query(
            r#"
            INSERT INTO documents (id, name, kind, size_bytes, status, chunk_size, chunk_overlap, created_date)
            VALUES (?, ?, ?, ?, 'pending', ?, ?, ?)
            ON CONFLICT (id) DO UPDATE SET
                name = excluded.name,
                status = 'pending',
                chunk_size = excluded.chunk_size,
                chunk_overlap = excluded.chunk_overlap,
                error_message = NULL
            "#,
        )
        .bind(&new_document.id)
        .bind(&new_document.name)
        .bind(new_document.kind)
        .bind(new_document.size_bytes)
        .bind(new_document.chunk_size)
        .bind(new_document.chunk_overlap)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to create document")?;

        Self::get_by_id(pool, &new_document.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Failed to retrieve created document"))
    }

    #[inline]
    pub async fn get_by_id(pool: &SqlitePool, id: &str) -> Result<Option<DocumentRecord>> {
        let query = format!("SELECT {} FROM documents WHERE id = ?", DOCUMENT_COLUMNS);
        let result = sqlx::query_as::<_, DocumentRecord>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
            .context("Failed to get document by id")?;

        Ok(result)
    }

    /// Documents whose id starts with `prefix`
    #[inline]
    pub async fn find_by_id_prefix(pool: &SqlitePool, prefix: &str) -> Result<Vec<DocumentRecord>> {
        let query = format!(
            "SELECT {} FROM documents WHERE substr(id, 1, ?) = ? ORDER BY created_date DESC",
            DOCUMENT_COLUMNS
        );
        let documents = sqlx::query_as::<_, DocumentRecord>(&query)
            .bind(prefix.len() as i64)
            .bind(prefix)
            .fetch_all(pool)
            .await
            .context("Failed to find documents by id prefix")?;

        Ok(documents)
    }

    #[inline]
    pub async fn find_by_name(pool: &SqlitePool, name: &str) -> Result<Vec<DocumentRecord>> {
        let query = format!(
            "SELECT {} FROM documents WHERE name = ? ORDER BY created_date DESC",
            DOCUMENT_COLUMNS
        );
        let documents = sqlx::query_as::<_, DocumentRecord>(&query)
            .bind(name)
            .fetch_all(pool)
            .await
            .context("Failed to find documents by name")?;

        Ok(documents)
    }

    #[inline]
    pub async fn list_all(pool: &SqlitePool) -> Result<Vec<DocumentRecord>> {
        let query = format!(
            "SELECT {} FROM documents ORDER BY created_date DESC",
            DOCUMENT_COLUMNS
        );
        let documents = sqlx::query_as::<_, DocumentRecord>(&query)
            .fetch_all(pool)
            .await
            .context("Failed to list all documents")?;

        Ok(documents)
    }

    #[inline]
    pub async fn update(
        pool: &SqlitePool,
        id: &str,
        update: DocumentUpdate,
    ) -> Result<Option<DocumentRecord>> {
        let mut builder: QueryBuilder<'_, Sqlite> = QueryBuilder::new("UPDATE documents SET ");
        let mut fields = builder.separated(", ");
        let mut has_fields = false;

        if let Some(name) = update.name {
            fields.push("name = ").push_bind_unseparated(name);
            has_fields = true;
        }

        if let Some(status) = update.status {
            fields.push("status = ").push_bind_unseparated(status);
            has_fields = true;
        }

        if let Some(page_count) = update.page_count {
            fields.push("page_count = ").push_bind_unseparated(page_count);
            has_fields = true;
        }

        if let Some(chunk_count) = update.chunk_count {
            fields.push("chunk_count = ").push_bind_unseparated(chunk_count);
            has_fields = true;
        }

        if let Some(signature) = update.embedding_signature {
            fields
                .push("embedding_signature = ")
                .push_bind_unseparated(signature);
            has_fields = true;
        }

        if let Some(error) = update.error_message {
            fields.push("error_message = ").push_bind_unseparated(error);
            has_fields = true;
        }

        if let Some(indexed_date) = update.indexed_date {
            fields
                .push("indexed_date = ")
                .push_bind_unseparated(indexed_date);
            has_fields = true;
        }

        if !has_fields {
            return Self::get_by_id(pool, id).await;
        }

        builder.push(" WHERE id = ").push_bind(id);
        builder
            .build()
            .execute(pool)
            .await
            .context("Failed to update document")?;

        Self::get_by_id(pool, id).await
    }

    /// Delete a document; its pages and chunks cascade
    #[inline]
    pub async fn delete(pool: &SqlitePool, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await
            .context("Failed to delete document")?;

        Ok(result.rows_affected() > 0)
    }
}

pub struct PageQueries;

impl PageQueries {
    /// Replace all stored pages of a document
    #[inline]
    pub async fn replace_for_document(
        pool: &SqlitePool,
        document_id: &str,
        pages: &[Document],
    ) -> Result<()> {
        let mut transaction = pool
            .begin()
            .await
            .context("Failed to begin transaction for page insert")?;

        sqlx::query("DELETE FROM document_pages WHERE document_id = ?")
            .bind(document_id)
            .execute(&mut *transaction)
            .await
            .context("Failed to clear document pages")?;

        for page in pages {
            sqlx::query("INSERT INTO document_pages (document_id, page, content) VALUES (?, ?, ?)")
                .bind(document_id)
                .bind(i64::from(page.metadata.page))
                .bind(&page.page_content)
                .execute(&mut *transaction)
                .await
                .context("Failed to insert document page")?;
        }

        transaction
            .commit()
            .await
            .context("Failed to commit page insert transaction")?;

        debug!("Stored {} pages for document {}", pages.len(), document_id);
        Ok(())
    }

    #[inline]
    pub async fn list_for_document(
        pool: &SqlitePool,
        document_id: &str,
    ) -> Result<Vec<PageRecord>> {
        let pages = sqlx::query_as::<_, PageRecord>(
            "SELECT document_id, page, content FROM document_pages WHERE document_id = ? ORDER BY page",
        )
        .bind(document_id)
        .fetch_all(pool)
        .await
        .context("Failed to list document pages")?;

        Ok(pages)
    }
}

pub struct ChunkQueries;

impl ChunkQueries {
    /// Replace all stored chunks of a document
    #[inline]
    pub async fn replace_for_document(
        pool: &SqlitePool,
        document_id: &str,
        chunks: Vec<NewChunk>,
    ) -> Result<Vec<ChunkRecord>> {
        let mut transaction = pool
            .begin()
            .await
            .context("Failed to begin transaction for batch chunk insert")?;

        sqlx::query("DELETE FROM document_chunks WHERE document_id = ?")
            .bind(document_id)
            .execute(&mut *transaction)
            .await
            .context("Failed to clear document chunks")?;

        let mut created_chunks = Vec::with_capacity(chunks.len());

        for chunk in chunks {
            let id = sqlx::query(
                r#"
                INSERT INTO document_chunks (document_id, page, chunk, source, content, vector_id)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(document_id)
            .bind(chunk.page)
            .bind(chunk.chunk)
            .bind(&chunk.source)
            .bind(&chunk.content)
            .bind(&chunk.vector_id)
            .execute(&mut *transaction)
            .await
            .context("Failed to create document chunk in batch")?
            .last_insert_rowid();

            created_chunks.push(ChunkRecord {
                id,
                document_id: document_id.to_string(),
                page: chunk.page,
                chunk: chunk.chunk,
                source: chunk.source,
                content: chunk.content,
                vector_id: chunk.vector_id,
            });
        }

        transaction
            .commit()
            .await
            .context("Failed to commit batch chunk insert transaction")?;

        debug!("Created {} document chunks", created_chunks.len());
        Ok(created_chunks)
    }

    /// Chunks in page then chunk order
    #[inline]
    pub async fn list_for_document(
        pool: &SqlitePool,
        document_id: &str,
    ) -> Result<Vec<ChunkRecord>> {
        let chunks = sqlx::query_as::<_, ChunkRecord>(
            r#"
            SELECT id, document_id, page, chunk, source, content, vector_id
            FROM document_chunks
            WHERE document_id = ?
            ORDER BY page, chunk
            "#,
        )
        .bind(document_id)
        .fetch_all(pool)
        .await
        .context("Failed to list document chunks")?;

        Ok(chunks)
    }
}
