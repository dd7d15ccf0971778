
use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::parsing::{Document, DocumentMetadata, FileKind, ParsedFile};

pub const DEFAULT_CHUNK_SIZE: usize = 300;
pub const DEFAULT_CHUNK_OVERLAP: usize = 0;

/// Separators tried in order, from paragraph breaks down to single characters
pub const DEFAULT_SEPARATORS: &[&str] = &["\n\n", "\n", ".", "!", "?", ",", " ", ""];

/// Configuration for document chunking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk size in tokens
    pub chunk_size: usize,
    /// Tokens carried over from the end of one chunk into the next
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

/// A parsed file whose documents have been replaced by chunks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkedFile {
    pub name: String,
    pub id: String,
    pub kind: FileKind,
    pub chunking: ChunkingConfig,
    pub docs: Vec<Document>,
}

/// Recursive character splitter measuring length in estimated tokens
#[derive(Debug, Clone)]
pub struct RecursiveSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl RecursiveSplitter {
    #[inline]
    pub fn new(config: ChunkingConfig) -> Self {
        let chunk_size = config.chunk_size.max(1);
        let chunk_overlap = if config.chunk_overlap >= chunk_size {
            warn!(
                "Chunk overlap {} is not smaller than chunk size {}, clamping",
                config.chunk_overlap, chunk_size
            );
            chunk_size - 1
        } else {
            config.chunk_overlap
        };

        Self {
            chunk_size,
            chunk_overlap,
            separators: DEFAULT_SEPARATORS.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    #[inline]
    pub fn with_separators(mut self, separators: &[&str]) -> Self {
        self.separators = separators.iter().map(|s| (*s).to_string()).collect();
        self
    }

    /// Split text into trimmed, non-empty chunks of at most `chunk_size` tokens
    #[inline]
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &self.separators)
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        let (separator, remaining) = pick_separator(text, separators);
        let mut chunks = Vec::new();
        let mut pending: Vec<&str> = Vec::new();

        for piece in split_keeping_separator(text, separator) {
            if estimate_token_count(piece) <= self.chunk_size {
                pending.push(piece);
                continue;
            }

            if !pending.is_empty() {
                chunks.extend(self.merge_pieces(&pending));
                pending.clear();
            }

            if remaining.is_empty() {
                let trimmed = piece.trim();
                if !trimmed.is_empty() {
                    chunks.push(trimmed.to_string());
                }
            } else {
                chunks.extend(self.split_recursive(piece, remaining));
            }
        }

        if !pending.is_empty() {
            chunks.extend(self.merge_pieces(&pending));
        }

        chunks
    }

    /// Greedily merge small pieces into chunks, carrying trailing pieces as overlap
    fn merge_pieces(&self, pieces: &[&str]) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current: VecDeque<&str> = VecDeque::new();

        for &piece in pieces {
            if !current.is_empty() && measure(&current, Some(piece)) > self.chunk_size {
                push_chunk(&mut chunks, &current);

                while !current.is_empty()
                    && (measure(&current, None) > self.chunk_overlap
                        || measure(&current, Some(piece)) > self.chunk_size)
                {
                    current.pop_front();
                }
            }
            current.push_back(piece);
        }

        push_chunk(&mut chunks, &current);
        chunks
    }
}

fn pick_separator<'s>(text: &str, separators: &'s [String]) -> (&'s str, &'s [String]) {
    for (i, separator) in separators.iter().enumerate() {
        if separator.is_empty() || text.contains(separator.as_str()) {
            return (separator.as_str(), &separators[i + 1..]);
        }
    }
    ("", &[])
}

/// Split on `separator`, attaching each separator to the piece that follows it
fn split_keeping_separator<'t>(text: &'t str, separator: &str) -> Vec<&'t str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (index, _) in text.match_indices(separator) {
        if index > start {
            pieces.push(&text[start..index]);
            start = index;
        }
    }
    pieces.push(&text[start..]);
    pieces.retain(|piece| !piece.is_empty());
    pieces
}

fn measure(current: &VecDeque<&str>, next: Option<&str>) -> usize {
    let mut joined: String = current.iter().copied().collect();
    if let Some(next) = next {
        joined.push_str(next);
    }
    estimate_token_count(&joined)
}

fn push_chunk(chunks: &mut Vec<String>, current: &VecDeque<&str>) {
    let joined: String = current.iter().copied().collect();
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

/// Split every page of a file into chunks cited as `"<page>-<chunk>"`
#[inline]
pub fn chunk_file(file: &ParsedFile, chunk_size: usize, chunk_overlap: usize) -> ChunkedFile {
    let chunking = ChunkingConfig {
        chunk_size,
        chunk_overlap,
    };
    let splitter = RecursiveSplitter::new(chunking);
    let mut docs = Vec::new();

    for page in &file.docs {
        let page_number = page.metadata.page;
        for (i, chunk) in splitter
            .split_text(&page.page_content)
            .into_iter()
            .enumerate()
        {
            let chunk_number = i as u32 + 1;
            docs.push(Document {
                page_content: chunk,
                metadata: DocumentMetadata {
                    page: page_number,
                    chunk: Some(chunk_number),
                    source: format!("{}-{}", page_number, chunk_number),
                    file_id: page.metadata.file_id.clone(),
                    file_name: page.metadata.file_name.clone(),
                },
            });
        }
    }

    debug!(
        "Chunked '{}' into {} chunks (avg {} tokens)",
        file.name,
        docs.len(),
        docs.iter()
            .map(|d| estimate_token_count(&d.page_content))
            .sum::<usize>()
            / docs.len().max(1)
    );

    ChunkedFile {
        name: file.name.clone(),
        id: file.id.clone(),
        kind: file.kind,
        chunking,
        docs,
    }
}

/// Estimate token count using a simple heuristic
/// This is a rough approximation - actual tokenization would be more accurate
#[inline]
pub fn estimate_token_count(text: &str) -> usize {
    // Rough heuristic: 1 token ≈ 0.75 words for English text
    // Add extra tokens for punctuation and special characters
    let word_count = text.split_whitespace().count();
    let punct_count = text.chars().filter(|c| c.is_ascii_punctuation()).count();

    (punct_count as f64).mul_add(0.1, word_count as f64 / 0.75) as usize
}
