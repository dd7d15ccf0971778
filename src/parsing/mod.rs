
mod docx;
mod pdf;

use std::fmt;
use std::path::Path;
use std::sync::LazyLock;

use fancy_regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{QaError, Result};

static LINE_BREAK_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\n\s*").expect("line break pattern is valid"));

static HYPHENATED_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?<=\w)-\n(?=\w)").expect("hyphenation pattern is valid"));

/// Kinds of files that can be read into documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Pdf,
    Docx,
    Txt,
}

impl FileKind {
    /// Detect the file kind from a file name's extension
    #[inline]
    pub fn from_file_name(name: &str) -> Result<Self> {
        let extension = Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match extension.as_str() {
            "pdf" => Ok(Self::Pdf),
            "docx" => Ok(Self::Docx),
            "txt" | "text" | "md" => Ok(Self::Txt),
            _ => Err(QaError::UnsupportedFileType(name.to_string())),
        }
    }

    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Txt => "txt",
        }
    }
}

impl fmt::Display for FileKind {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata carried by every page or chunk
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// 1-based page number within the source file
    pub page: u32,
    /// 1-based chunk number within the page, `None` for whole pages
    pub chunk: Option<u32>,
    /// Citation key, `"<page>"` for pages and `"<page>-<chunk>"` for chunks
    pub source: String,
    pub file_id: Option<String>,
    pub file_name: Option<String>,
}

/// A piece of text plus the metadata needed to cite it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub page_content: String,
    pub metadata: DocumentMetadata,
}

impl Document {
    /// Create a whole-page document
    #[inline]
    pub fn page(page: u32, page_content: String) -> Self {
        Self {
            page_content,
            metadata: DocumentMetadata {
                page,
                chunk: None,
                source: page.to_string(),
                file_id: None,
                file_name: None,
            },
        }
    }
}

/// A file read into one document per page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFile {
    pub name: String,
    /// Hex MD5 digest of the raw file bytes
    pub id: String,
    pub kind: FileKind,
    pub size_bytes: u64,
    pub docs: Vec<Document>,
}

impl ParsedFile {
    /// All page text joined by blank lines
    #[inline]
    pub fn text(&self) -> String {
        self.docs
            .iter()
            .map(|doc| doc.page_content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Compute the content identity used for caching
#[inline]
pub fn file_id(bytes: &[u8]) -> String {
    format!("{:x}", md5::compute(bytes))
}

/// Read an uploaded file into documents
#[inline]
pub fn read_file(name: &str, bytes: &[u8]) -> Result<ParsedFile> {
    let kind = FileKind::from_file_name(name)?;
    debug!("Reading {} as {} ({} bytes)", name, kind, bytes.len());

    let pages = match kind {
        FileKind::Pdf => pdf::extract_pages(bytes),
        FileKind::Docx => docx::extract_text(bytes).map(|text| vec![text]),
        FileKind::Txt => Ok(vec![String::from_utf8_lossy(bytes).into_owned()]),
    }
    .map_err(|e| QaError::FileRead {
        file_name: name.to_string(),
        reason: format!("{:#}", e),
    })?;

    let docs: Vec<Document> = pages
        .iter()
        .enumerate()
        .map(|(i, text)| Document::page(i as u32 + 1, clean_text(text)))
        .collect();

    info!("Read {} ({} pages)", name, docs.len());

    Ok(ParsedFile {
        name: name.to_string(),
        id: file_id(bytes),
        kind,
        size_bytes: bytes.len() as u64,
        docs,
    })
}

/// Read a file from disk into documents
#[inline]
pub fn read_path<P: AsRef<Path>>(path: P) -> Result<ParsedFile> {
    let path = path.as_ref();
    let name = path.file_name().map_or_else(
        || path.display().to_string(),
        |name| name.to_string_lossy().into_owned(),
    );

    // Reject unsupported files before touching the disk
    FileKind::from_file_name(&name)?;

    let bytes = std::fs::read(path).map_err(|e| QaError::FileRead {
        file_name: name.clone(),
        reason: e.to_string(),
    })?;

    read_file(&name, &bytes)
}

/// Normalise extracted text: collapse line break runs and re-join hyphenated words
#[inline]
pub fn clean_text(text: &str) -> String {
    let collapsed = LINE_BREAK_RUN.replace_all(text, "\n");
    let joined = HYPHENATED_BREAK.replace_all(&collapsed, "");
    joined.trim().to_string()
}
