
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};

use crate::parsing::{Document, DocumentMetadata, FileKind};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct DocumentRecord {
    /// Hex MD5 of the file bytes
    pub id: String,
    pub name: String,
    pub kind: FileKind,
    pub size_bytes: i64,
    pub status: DocumentStatus,
    pub page_count: i64,
    pub chunk_count: i64,
    pub embedding_signature: Option<String>,
    pub chunk_size: i64,
    pub chunk_overlap: i64,
    pub error_message: Option<String>,
    pub created_date: NaiveDateTime,
    pub indexed_date: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
pub enum DocumentStatus {
    Pending,
    Indexing,
    Completed,
    Failed,
}

impl std::fmt::Display for DocumentStatus {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            DocumentStatus::Pending => write!(f, "Pending"),
            DocumentStatus::Indexing => write!(f, "Indexing"),
            DocumentStatus::Completed => write!(f, "Completed"),
            DocumentStatus::Failed => write!(f, "Failed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDocument {
    pub id: String,
    pub name: String,
    pub kind: FileKind,
    pub size_bytes: i64,
    pub chunk_size: i64,
    pub chunk_overlap: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DocumentUpdate {
    pub name: Option<String>,
    pub status: Option<DocumentStatus>,
    pub page_count: Option<i64>,
    pub chunk_count: Option<i64>,
    pub embedding_signature: Option<String>,
    pub error_message: Option<String>,
    pub indexed_date: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct PageRecord {
    pub document_id: String,
    pub page: i64,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ChunkRecord {
    pub id: i64,
    pub document_id: String,
    pub page: i64,
    pub chunk: i64,
    pub source: String,
    pub content: String,
    pub vector_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewChunk {
    pub page: i64,
    pub chunk: i64,
    pub source: String,
    pub content: String,
    pub vector_id: String,
}

impl DocumentRecord {
    #[inline]
    pub fn is_completed(&self) -> bool {
        self.status == DocumentStatus::Completed
    }

    #[inline]
    pub fn is_failed(&self) -> bool {
        self.status == DocumentStatus::Failed
    }

    /// Whether vectors stored for this document can be reused
    #[inline]
    pub fn matches_index_settings(
        &self,
        embedding_signature: &str,
        chunk_size: usize,
        chunk_overlap: usize,
    ) -> bool {
        self.is_completed()
            && self.embedding_signature.as_deref() == Some(embedding_signature)
            && usize::try_from(self.chunk_size).ok() == Some(chunk_size)
            && usize::try_from(self.chunk_overlap).ok() == Some(chunk_overlap)
    }
}

impl PageRecord {
    #[inline]
    pub fn into_document(self) -> Document {
        Document::page(u32::try_from(self.page).unwrap_or_default(), self.content)
    }
}

impl ChunkRecord {
    /// Rebuild the chunk document, tagged with its file
    #[inline]
    pub fn into_document(self, file_name: &str) -> Document {
        Document {
            page_content: self.content,
            metadata: DocumentMetadata {
                page: u32::try_from(self.page).unwrap_or_default(),
                chunk: u32::try_from(self.chunk).ok(),
                source: self.source,
                file_id: Some(self.document_id),
                file_name: Some(file_name.to_string()),
            },
        }
    }
}
