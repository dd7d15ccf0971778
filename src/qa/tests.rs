use super::*;
use std::sync::Arc;

use crate::QaError;
use crate::database::{MemoryVectorStore, VectorStore};
use crate::embeddings::{FakeEmbedder, chunk_file, embed_files};
use crate::llm::fake::FakeChat;
use crate::parsing::read_file;

const CATS: &str = "Cats purr when they are content. A cat sleeps for most of the day.\n\n\
Kittens open their eyes after about a week.";

async fn index_of(files: &[(&str, &str)]) -> FolderIndex {
    let chunked = files
        .iter()
        .map(|(name, text)| {
            let parsed = read_file(name, text.as_bytes()).expect("should read text file");
            chunk_file(&parsed, 20, 0)
        })
        .collect();

    let store: Arc<dyn VectorStore> = Arc::new(MemoryVectorStore::new());
    embed_files(chunked, &FakeEmbedder::default(), store)
        .await
        .expect("should embed files")
}

/// Chat model with a fixed reply
struct Scripted(&'static str);

impl ChatModel for Scripted {
    fn model(&self) -> &str {
        "scripted"
    }

    fn complete(&self, _messages: &[ChatMessage]) -> crate::Result<String> {
        Ok(self.0.to_string())
    }
}

#[test]
fn prompt_stuffs_every_excerpt() {
    let docs = vec![
        Document::page(1, "First page".to_string()),
        Document::page(2, "Second page".to_string()),
    ];

    let prompt = stuff_prompt("  What is here? ", &docs);

    assert!(prompt.starts_with("QUESTION: What is here?\n=========\n"));
    assert!(prompt.contains("Content: First page\nSource: 1\n\nContent: Second page\nSource: 2"));
    assert!(prompt.ends_with("=========\nFINAL ANSWER:"));
}

#[test]
fn answer_is_text_before_sources() {
    assert_eq!(
        extract_answer("FINAL ANSWER: Cats purr.\nSOURCES: 1-1, 1-2"),
        "Cats purr."
    );
    assert_eq!(extract_answer("  No citations here  "), "No citations here");
    assert_eq!(extract_answer("SOURCES: 1-1"), "");
}

#[test]
fn cited_keys_are_cleaned() {
    assert_eq!(
        cited_source_keys("Answer.\nSOURCES: 1-1, 2-3 ,4-1."),
        vec!["1-1", "2-3", "4-1"]
    );
    assert!(cited_source_keys("Answer without marker").is_empty());
    assert!(cited_source_keys("I don't know.\nSOURCES:").is_empty());
    assert_eq!(
        cited_source_keys("SOURCES: 9-9\nrethought\nSOURCES: 1-2"),
        vec!["1-2"]
    );
}

#[tokio::test]
async fn sources_follow_index_order() {
    let folder_index = index_of(&[("cats.txt", CATS)]).await;
    let all_sources: Vec<&str> = folder_index.files[0]
        .docs
        .iter()
        .map(|d| d.metadata.source.as_str())
        .collect();
    assert!(all_sources.len() >= 2, "fixture should yield several chunks");

    let reply = format!("x\nSOURCES: {}, {}", all_sources[1], all_sources[0]);
    let sources = get_sources(&reply, &folder_index);

    let found: Vec<&str> = sources.iter().map(|d| d.metadata.source.as_str()).collect();
    assert_eq!(found, vec![all_sources[0], all_sources[1]]);

    assert!(get_sources("x\nSOURCES: 99-99", &folder_index).is_empty());
    assert!(get_sources("no marker", &folder_index).is_empty());
}

#[tokio::test]
async fn answers_from_cited_chunks() {
    let folder_index = index_of(&[("cats.txt", CATS)]).await;

    let result = query_folder(
        &folder_index,
        &FakeEmbedder::default(),
        "How long do kittens keep their eyes closed?",
        false,
        &FakeChat,
        DEFAULT_TOP_K,
    )
    .await
    .expect("should answer");

    assert!(!result.answer.is_empty());
    assert!(!result.answer.contains(SOURCES_MARKER));
    assert_eq!(result.sources.len(), 1);
    assert!(result.answer.starts_with(
        result.sources[0]
            .page_content
            .lines()
            .next()
            .expect("chunk has text")
    ));
}

#[tokio::test]
async fn return_all_gives_every_retrieved_chunk() {
    let folder_index = index_of(&[("cats.txt", CATS)]).await;
    let top_k = 2;

    let result = query_folder(
        &folder_index,
        &FakeEmbedder::default(),
        "cats",
        true,
        &Scripted("Nothing relevant.\nSOURCES:"),
        top_k,
    )
    .await
    .expect("should answer");

    assert_eq!(result.answer, "Nothing relevant.");
    assert_eq!(result.sources.len(), top_k.min(folder_index.chunk_count()));
}

#[tokio::test]
async fn retrieved_chunks_carry_the_current_file_name() {
    let mut folder_index = index_of(&[("cats.txt", CATS)]).await;
    folder_index.files[0].name = "felines.txt".to_string();

    let result = query_folder(
        &folder_index,
        &FakeEmbedder::default(),
        "cats",
        true,
        &Scripted("Nothing relevant.\nSOURCES:"),
        DEFAULT_TOP_K,
    )
    .await
    .expect("should answer");

    assert!(!result.sources.is_empty());
    assert!(
        result
            .sources
            .iter()
            .all(|d| d.metadata.file_name.as_deref() == Some("felines.txt"))
    );
}

#[tokio::test]
async fn search_is_limited_to_the_folder() {
    let cats = index_of(&[("cats.txt", CATS)]).await;
    let bonds_text = "Bonds pay coupons twice a year. Rising rates push bond prices down.";
    let bonds = index_of(&[("bonds.txt", bonds_text)]).await;

    // Same store, but only the cat file is part of the folder
    bonds
        .index
        .add(crate::embeddings::embed_chunks(&cats.files[0], &FakeEmbedder::default()).expect("embed"))
        .await
        .expect("should add");
    let folder_index = FolderIndex {
        files: cats.files.clone(),
        index: Arc::clone(&bonds.index),
    };

    let result = query_folder(
        &folder_index,
        &FakeEmbedder::default(),
        "bond coupons",
        true,
        &FakeChat,
        10,
    )
    .await
    .expect("should answer");

    assert!(!result.sources.is_empty());
    assert!(
        result
            .sources
            .iter()
            .all(|d| d.metadata.file_name.as_deref() == Some("cats.txt"))
    );
}

#[tokio::test]
async fn blank_query_is_rejected() {
    let folder_index = index_of(&[("cats.txt", CATS)]).await;

    let result = query_folder(
        &folder_index,
        &FakeEmbedder::default(),
        "   ",
        false,
        &FakeChat,
        DEFAULT_TOP_K,
    )
    .await;

    assert!(matches!(result, Err(QaError::InvalidQuery(_))));
}
