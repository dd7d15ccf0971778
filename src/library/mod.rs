// Document library
// Indexes files once and keeps their pages, chunks and vectors across runs,
// keyed by the MD5 of the file contents.


use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::database::sqlite::models::{DocumentRecord, DocumentUpdate, NewChunk, NewDocument};
use crate::database::{Database, DocumentStatus, VectorStore, open_vector_store};
use crate::embeddings::{
    ChunkedFile, ChunkingConfig, Embedder, FolderIndex, chunk_file, create_embedder, embed_chunks,
};
use crate::parsing::{Document, ParsedFile};
use crate::ui::is_file_valid;
use crate::{QaError, Result};

/// Shortest id prefix accepted when referring to a document
pub const MIN_ID_PREFIX_LEN: usize = 6;

/// Result of indexing one file
#[derive(Debug, Clone)]
pub struct IndexOutcome {
    /// Chunks tagged with their file, as stored in the vector store
    pub file: ChunkedFile,
    pub record: DocumentRecord,
    /// Whether stored vectors were reused instead of embedding again
    pub cache_hit: bool,
}

/// A document rebuilt from the metadata database
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub record: DocumentRecord,
    pub file: ParsedFile,
    pub chunks: ChunkedFile,
}

/// Metadata view of the library.
///
/// Needs no embedder, so documents can be listed, shown and removed
/// without provider credentials.
#[derive(Debug, Clone)]
pub struct Catalog {
    config: Config,
    database: Database,
}

impl Catalog {
    #[inline]
    pub async fn open(config: Config) -> Result<Self> {
        let database = Database::initialize_from_config_dir(config.get_base_dir()).await?;
        Ok(Self { config, database })
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[inline]
    pub fn database(&self) -> &Database {
        &self.database
    }

    /// Find a document by exact id, id prefix or exact file name
    #[inline]
    pub async fn resolve(&self, ident: &str) -> Result<DocumentRecord> {
        let ident = ident.trim();
        if ident.is_empty() {
            return Err(QaError::DocumentNotFound(String::new()));
        }

        if let Some(record) = self.database.get_document(ident).await? {
            return Ok(record);
        }

        let is_id_prefix = ident.len() >= MIN_ID_PREFIX_LEN
            && ident.chars().all(|c| c.is_ascii_hexdigit());
        if is_id_prefix {
            let matches = self
                .database
                .find_documents_by_id_prefix(&ident.to_ascii_lowercase())
                .await?;
            if let Some(record) = single_match(ident, matches)? {
                return Ok(record);
            }
        }

        let matches = self.database.find_documents_by_name(ident).await?;
        single_match(ident, matches)?.ok_or_else(|| QaError::DocumentNotFound(ident.to_string()))
    }

    /// Rebuild a document's pages and chunks from the metadata database
    #[inline]
    pub async fn load(&self, ident: &str) -> Result<LoadedDocument> {
        let record = self.resolve(ident).await?;
        if !record.is_completed() {
            return Err(QaError::InvalidFile(format!(
                "{} is not indexed (status: {}{})",
                record.name,
                record.status,
                record
                    .error_message
                    .as_deref()
                    .map(|e| format!(", {}", e))
                    .unwrap_or_default()
            )));
        }

        let pages: Vec<Document> = self
            .database
            .get_pages(&record.id)
            .await?
            .into_iter()
            .map(|page| page.into_document())
            .collect();
        let chunk_docs: Vec<Document> = self
            .database
            .get_chunks(&record.id)
            .await?
            .into_iter()
            .map(|chunk| chunk.into_document(&record.name))
            .collect();

        debug!(
            "Loaded {} ({} pages, {} chunks)",
            record.name,
            pages.len(),
            chunk_docs.len()
        );

        let file = ParsedFile {
            name: record.name.clone(),
            id: record.id.clone(),
            kind: record.kind,
            size_bytes: u64::try_from(record.size_bytes).unwrap_or_default(),
            docs: pages,
        };
        let chunks = ChunkedFile {
            name: record.name.clone(),
            id: record.id.clone(),
            kind: record.kind,
            chunking: ChunkingConfig {
                chunk_size: usize::try_from(record.chunk_size).unwrap_or_default(),
                chunk_overlap: usize::try_from(record.chunk_overlap).unwrap_or_default(),
            },
            docs: chunk_docs,
        };

        Ok(LoadedDocument {
            record,
            file,
            chunks,
        })
    }

    #[inline]
    pub async fn list(&self) -> Result<Vec<DocumentRecord>> {
        Ok(self.database.list_documents().await?)
    }

    /// Delete a document's metadata and the vectors stored for it
    #[inline]
    pub async fn remove(&self, ident: &str) -> Result<DocumentRecord> {
        let record = self.resolve(ident).await?;

        if let Some(signature) = &record.embedding_signature {
            let store = open_vector_store(&self.config, signature).await?;
            store.delete_file(&record.id).await?;
            store.optimize().await?;
        }
        self.database.delete_document(&record.id).await?;
        self.database.optimize().await?;

        info!("Removed {} ({})", record.name, record.id);
        Ok(record)
    }
}

pub struct Library {
    catalog: Catalog,
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
}

impl std::fmt::Debug for Library {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Library")
            .field("base_dir", &self.config().get_base_dir())
            .field("store", &self.store.name())
            .field("embedder", &self.embedder.signature())
            .finish_non_exhaustive()
    }
}

impl Library {
    /// Open the library with the embedder selected in `config`
    #[inline]
    pub async fn open(config: Config) -> Result<Self> {
        let embedder = create_embedder(&config)?;
        Self::open_with(config, embedder).await
    }

    #[inline]
    pub async fn open_with(config: Config, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let catalog = Catalog::open(config).await?;
        let store = open_vector_store(catalog.config(), &embedder.signature()).await?;

        info!(
            "Opened library at {} ({} vectors, {})",
            catalog.config().get_base_dir().display(),
            store.name(),
            embedder.signature()
        );

        Ok(Self {
            catalog,
            store,
            embedder,
        })
    }

    #[inline]
    pub fn config(&self) -> &Config {
        self.catalog.config()
    }

    #[inline]
    pub fn database(&self) -> &Database {
        self.catalog.database()
    }

    #[inline]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    #[inline]
    pub fn embedder(&self) -> &dyn Embedder {
        self.embedder.as_ref()
    }

    #[inline]
    pub fn store(&self) -> Arc<dyn VectorStore> {
        Arc::clone(&self.store)
    }

    /// Validate, chunk and embed a file, reusing stored vectors when the
    /// file was already indexed with the same embedder and chunk settings.
    #[inline]
    pub async fn index_file(&self, file: &ParsedFile) -> Result<IndexOutcome> {
        is_file_valid(file)?;

        let ChunkingConfig {
            chunk_size,
            chunk_overlap,
        } = self.catalog.config.chunking;
        let signature = self.embedder.signature();

        if let Some(outcome) = self
            .cached(file, &signature, chunk_size, chunk_overlap)
            .await?
        {
            return Ok(outcome);
        }

        let chunked = chunk_file(file, chunk_size, chunk_overlap);
        if chunked.docs.is_empty() {
            return Err(QaError::InvalidFile(format!(
                "{} produced no chunks",
                file.name
            )));
        }

        // Vectors from an earlier run with other settings would duplicate results
        self.store.delete_file(&file.id).await?;

        self.catalog.database
            .upsert_document(NewDocument {
                id: file.id.clone(),
                name: file.name.clone(),
                kind: file.kind,
                size_bytes: i64::try_from(file.size_bytes).unwrap_or(i64::MAX),
                chunk_size: to_db_int(chunk_size),
                chunk_overlap: to_db_int(chunk_overlap),
            })
            .await?;
        self.set_status(&file.id, DocumentStatus::Indexing, None)
            .await?;

        match self.embed_and_store(file, chunked, &signature).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                warn!("Indexing {} failed: {}", file.name, e);
                if let Err(status_err) = self
                    .set_status(&file.id, DocumentStatus::Failed, Some(e.to_string()))
                    .await
                {
                    warn!("Failed to record failure for {}: {}", file.name, status_err);
                }
                Err(e)
            }
        }
    }

    async fn cached(
        &self,
        file: &ParsedFile,
        signature: &str,
        chunk_size: usize,
        chunk_overlap: usize,
    ) -> Result<Option<IndexOutcome>> {
        let Some(record) = self.catalog.database.get_document(&file.id).await? else {
            return Ok(None);
        };

        if !record.matches_index_settings(signature, chunk_size, chunk_overlap) {
            debug!(
                "{} was indexed with other settings ({:?}, {}/{}), re-indexing",
                file.name, record.embedding_signature, record.chunk_size, record.chunk_overlap
            );
            return Ok(None);
        }

        let stored_vectors = self.store.count_file(&file.id).await?;
        if usize::try_from(record.chunk_count).ok() != Some(stored_vectors) {
            debug!(
                "{} has {} of {} vectors in the {} store, re-indexing",
                file.name,
                stored_vectors,
                record.chunk_count,
                self.store.name()
            );
            return Ok(None);
        }

        // Same bytes under another file name
        let record = if record.name == file.name {
            record
        } else {
            info!("{} was indexed as {}, renaming", file.name, record.name);
            self.catalog
                .database
                .update_document(
                    &record.id,
                    DocumentUpdate {
                        name: Some(file.name.clone()),
                        ..DocumentUpdate::default()
                    },
                )
                .await?
                .ok_or_else(|| QaError::DocumentNotFound(record.id.clone()))?
        };

        let docs = self
            .catalog
            .database
            .get_chunks(&record.id)
            .await?
            .into_iter()
            .map(|chunk| chunk.into_document(&record.name))
            .collect();

        info!("Using cached index for {} ({})", record.name, record.id);
        Ok(Some(IndexOutcome {
            file: ChunkedFile {
                name: record.name.clone(),
                id: record.id.clone(),
                kind: record.kind,
                chunking: ChunkingConfig {
                    chunk_size,
                    chunk_overlap,
                },
                docs,
            },
            record,
            cache_hit: true,
        }))
    }

    async fn embed_and_store(
        &self,
        file: &ParsedFile,
        mut chunked: ChunkedFile,
        signature: &str,
    ) -> Result<IndexOutcome> {
        let records = embed_chunks(&chunked, self.embedder.as_ref())?;

        let new_chunks: Vec<NewChunk> = records
            .iter()
            .map(|r| NewChunk {
                page: i64::from(r.document.metadata.page),
                chunk: i64::from(r.document.metadata.chunk.unwrap_or_default()),
                source: r.document.metadata.source.clone(),
                content: r.document.page_content.clone(),
                vector_id: r.id.clone(),
            })
            .collect();
        chunked.docs = records.iter().map(|r| r.document.clone()).collect();

        let vector_count = records.len();
        self.store.add(records).await?;
        debug!("Stored {} vectors for {}", vector_count, file.name);

        self.catalog.database.replace_pages(&file.id, &file.docs).await?;
        self.catalog.database.replace_chunks(&file.id, new_chunks).await?;

        let record = self
            .catalog
            .database
            .update_document(
                &file.id,
                DocumentUpdate {
                    status: Some(DocumentStatus::Completed),
                    page_count: Some(to_db_int(file.docs.len())),
                    chunk_count: Some(to_db_int(vector_count)),
                    embedding_signature: Some(signature.to_string()),
                    indexed_date: Some(Utc::now().naive_utc()),
                    ..DocumentUpdate::default()
                },
            )
            .await?
            .ok_or_else(|| QaError::DocumentNotFound(file.id.clone()))?;

        info!(
            "Indexed {} ({} pages, {} chunks)",
            file.name, record.page_count, record.chunk_count
        );

        Ok(IndexOutcome {
            file: chunked,
            record,
            cache_hit: false,
        })
    }

    async fn set_status(
        &self,
        id: &str,
        status: DocumentStatus,
        error_message: Option<String>,
    ) -> Result<()> {
        self.catalog.database
            .update_document(
                id,
                DocumentUpdate {
                    status: Some(status),
                    error_message,
                    ..DocumentUpdate::default()
                },
            )
            .await?;
        Ok(())
    }

    /// Search scope over `files`, backed by this library's vector store
    #[inline]
    pub fn folder_index(&self, files: Vec<ChunkedFile>) -> FolderIndex {
        FolderIndex {
            files,
            index: Arc::clone(&self.store),
        }
    }

    #[inline]
    pub async fn resolve(&self, ident: &str) -> Result<DocumentRecord> {
        self.catalog.resolve(ident).await
    }

    #[inline]
    pub async fn load(&self, ident: &str) -> Result<LoadedDocument> {
        self.catalog.load(ident).await
    }

    #[inline]
    pub async fn list(&self) -> Result<Vec<DocumentRecord>> {
        self.catalog.list().await
    }

    /// Delete a document's metadata and vectors, including vectors held by
    /// this library's in-process store
    #[inline]
    pub async fn remove(&self, ident: &str) -> Result<DocumentRecord> {
        let record = self.catalog.remove(ident).await?;
        self.store.delete_file(&record.id).await?;
        Ok(record)
    }
}

fn single_match(ident: &str, mut matches: Vec<DocumentRecord>) -> Result<Option<DocumentRecord>> {
    match matches.len() {
        0 => Ok(None),
        1 => Ok(matches.pop()),
        n => Err(QaError::InvalidQuery(format!(
            "'{}' matches {} documents ({}); use a longer id",
            ident,
            n,
            matches
                .iter()
                .map(|r| r.id.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        ))),
    }
}

fn to_db_int(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
