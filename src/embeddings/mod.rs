// Embeddings module
// Chunking, the embedding backends and the embed-into-store pipeline step

pub mod chunking;
pub mod fake;
pub mod ollama;
pub mod openai;


use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::{Config, EmbeddingProvider};
use crate::database::{VectorRecord, VectorStore};
use crate::{QaError, Result};

pub use chunking::{
    ChunkedFile, ChunkingConfig, RecursiveSplitter, chunk_file, estimate_token_count,
};
pub use fake::FakeEmbedder;
pub use ollama::OllamaEmbedder;
pub use openai::OpenAiEmbedder;

/// Turns text into dense vectors.
///
/// Implementations are blocking; they are called from async code the same
/// way any other short network round-trip is.
pub trait Embedder: Send + Sync {
    /// Provider name, e.g. `openai`
    fn provider(&self) -> &str;

    fn model(&self) -> &str;

    /// One vector per input text, in input order
    fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    fn embed_query(&self, text: &str) -> Result<Vec<f32>>;

    /// Identifies the vector space. Vectors from embedders with different
    /// signatures are never mixed.
    #[inline]
    fn signature(&self) -> String {
        format!("{}:{}", self.provider(), self.model())
    }
}

/// The files that were embedded together with the store holding their vectors
#[derive(Clone)]
pub struct FolderIndex {
    pub files: Vec<ChunkedFile>,
    pub index: Arc<dyn VectorStore>,
}

impl FolderIndex {
    #[inline]
    pub fn file_ids(&self) -> Vec<String> {
        self.files.iter().map(|f| f.id.clone()).collect()
    }

    /// Current name of the file with `file_id`
    #[inline]
    pub fn file_name(&self, file_id: &str) -> Option<&str> {
        self.files
            .iter()
            .find(|f| f.id == file_id)
            .map(|f| f.name.as_str())
    }

    /// Number of chunks across all files
    #[inline]
    pub fn chunk_count(&self) -> usize {
        self.files.iter().map(|f| f.docs.len()).sum()
    }
}

impl std::fmt::Debug for FolderIndex {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FolderIndex")
            .field("files", &self.files)
            .field("index", &self.index.name())
            .finish()
    }
}

/// Build the embedder selected in the configuration
#[inline]
pub fn create_embedder(config: &Config) -> Result<Arc<dyn Embedder>> {
    let embedder: Arc<dyn Embedder> = match config.embedding.provider {
        EmbeddingProvider::OpenAi => {
            let api_key = config.openai_api_key().ok_or(QaError::MissingApiKey)?;
            Arc::new(OpenAiEmbedder::new(&config.openai, api_key)?)
        }
        EmbeddingProvider::Ollama => Arc::new(OllamaEmbedder::new(config)?),
        EmbeddingProvider::Debug => Arc::new(FakeEmbedder::default()),
    };

    debug!("Using embedder {}", embedder.signature());
    Ok(embedder)
}

/// Fail early when the configured embedding server is unreachable or is
/// missing the embedding model. Providers without a server always pass.
#[inline]
pub fn check_embedder(config: &Config) -> Result<()> {
    if config.embedding.provider == EmbeddingProvider::Ollama {
        OllamaEmbedder::new(config)?.health_check()?;
    }
    Ok(())
}

/// Tag every chunk with its file and pair it with a fresh vector.
///
/// Returned records are in chunk order.
#[inline]
pub fn embed_chunks(file: &ChunkedFile, embedder: &dyn Embedder) -> Result<Vec<VectorRecord>> {
    let texts: Vec<String> = file.docs.iter().map(|d| d.page_content.clone()).collect();
    let vectors = embedder.embed_documents(&texts)?;

    if vectors.len() != file.docs.len() {
        return Err(QaError::Embedding(format!(
            "Expected {} embeddings for {}, got {}",
            file.docs.len(),
            file.name,
            vectors.len()
        )));
    }

    let records = file
        .docs
        .iter()
        .zip(vectors)
        .map(|(doc, vector)| {
            let mut document = doc.clone();
            document.metadata.file_id = Some(file.id.clone());
            document.metadata.file_name = Some(file.name.clone());
            VectorRecord {
                id: Uuid::new_v4().to_string(),
                vector,
                document,
            }
        })
        .collect();

    Ok(records)
}

/// Embed every chunk of every file into `store`
#[inline]
pub async fn embed_files(
    files: Vec<ChunkedFile>,
    embedder: &dyn Embedder,
    store: Arc<dyn VectorStore>,
) -> Result<FolderIndex> {
    let total_chunks: usize = files.iter().map(|f| f.docs.len()).sum();
    info!(
        "Embedding {} chunks from {} files with {}",
        total_chunks,
        files.len(),
        embedder.signature()
    );

    let bar = if console::user_attended_stderr() {
        ProgressBar::new(total_chunks as u64).with_style(
            ProgressStyle::with_template("{spinner} [{pos}/{len}] Embedding {msg}")
                .expect("style template is valid"),
        )
    } else {
        ProgressBar::hidden()
    };

    let mut tagged_files = Vec::with_capacity(files.len());
    for mut file in files {
        bar.set_message(file.name.clone());

        let records = embed_chunks(&file, embedder)?;
        file.docs = records.iter().map(|r| r.document.clone()).collect();
        let added = records.len();
        store.add(records).await?;

        bar.inc(added as u64);
        debug!("Stored {} vectors for {}", added, file.name);
        tagged_files.push(file);
    }

    bar.finish_and_clear();

    Ok(FolderIndex {
        files: tagged_files,
        index: store,
    })
}
