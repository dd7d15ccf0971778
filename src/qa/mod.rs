// Retrieval-augmented answering over an embedded folder of files

pub mod prompts;

#[cfg(test)]
mod tests;

use std::collections::HashSet;

use tracing::{debug, info};

use crate::Result;
use crate::embeddings::{Embedder, FolderIndex};
use crate::llm::{ChatMessage, ChatModel};
use crate::parsing::Document;
use crate::ui::is_query_valid;

use prompts::{SOURCES_MARKER, STUFF_SYSTEM_PROMPT, stuff_prompt};

pub const DEFAULT_TOP_K: usize = 5;

const FINAL_ANSWER_PREFIX: &str = "FINAL ANSWER:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerWithSources {
    pub answer: String,
    pub sources: Vec<Document>,
}

/// Answer `query` from the chunks of `folder_index`.
///
/// The `top_k` nearest chunks are stuffed into a single prompt. With
/// `return_all` every retrieved chunk is returned as a source, otherwise
/// only the chunks the model cited.
#[inline]
pub async fn query_folder(
    folder_index: &FolderIndex,
    embedder: &dyn Embedder,
    query: &str,
    return_all: bool,
    llm: &dyn ChatModel,
    top_k: usize,
) -> Result<AnswerWithSources> {
    is_query_valid(query)?;

    let query_vector = embedder.embed_query(query)?;
    let file_ids = folder_index.file_ids();
    let hits = folder_index
        .index
        .similarity_search(&query_vector, top_k, Some(&file_ids))
        .await?;

    // Stored vectors keep the name a file had when it was embedded
    let relevant_docs: Vec<Document> = hits
        .into_iter()
        .map(|hit| {
            let mut doc = hit.document;
            if let Some(name) = doc
                .metadata
                .file_id
                .as_deref()
                .and_then(|id| folder_index.file_name(id))
            {
                doc.metadata.file_name = Some(name.to_string());
            }
            doc
        })
        .collect();
    debug!(
        "Retrieved {} chunks: {:?}",
        relevant_docs.len(),
        relevant_docs
            .iter()
            .map(|d| d.metadata.source.as_str())
            .collect::<Vec<_>>()
    );

    let messages = [
        ChatMessage::system(STUFF_SYSTEM_PROMPT),
        ChatMessage::user(stuff_prompt(query, &relevant_docs)),
    ];
    let raw_answer = llm.complete(&messages)?;
    info!("Answered with {}", llm.model());

    let sources = if return_all {
        relevant_docs
    } else {
        get_sources(&raw_answer, folder_index)
    };

    Ok(AnswerWithSources {
        answer: extract_answer(&raw_answer),
        sources,
    })
}

/// Answer text without the trailing citations
#[inline]
pub fn extract_answer(raw_answer: &str) -> String {
    let before_sources = raw_answer
        .split_once(SOURCES_MARKER)
        .map_or(raw_answer, |(answer, _)| answer)
        .trim();

    before_sources
        .strip_prefix(FINAL_ANSWER_PREFIX)
        .unwrap_or(before_sources)
        .trim()
        .to_string()
}

/// Source keys cited after the last `SOURCES:` marker
#[inline]
pub fn cited_source_keys(raw_answer: &str) -> Vec<String> {
    let Some((_, cited)) = raw_answer.rsplit_once(SOURCES_MARKER) else {
        return Vec::new();
    };

    cited
        .split(',')
        .map(|key| key.trim().trim_end_matches('.').trim())
        .filter(|key| !key.is_empty())
        .map(str::to_string)
        .collect()
}

/// Chunks of `folder_index` the answer cites, in index order
#[inline]
pub fn get_sources(raw_answer: &str, folder_index: &FolderIndex) -> Vec<Document> {
    let keys: HashSet<String> = cited_source_keys(raw_answer).into_iter().collect();
    if keys.is_empty() {
        return Vec::new();
    }

    folder_index
        .files
        .iter()
        .flat_map(|file| &file.docs)
        .filter(|doc| keys.contains(&doc.metadata.source))
        .cloned()
        .collect()
}
