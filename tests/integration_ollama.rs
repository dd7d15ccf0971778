#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

// Integration tests that require a local Ollama instance
// Run with: cargo test --test integration_ollama -- --ignored

use docqa::config::{Config, EmbeddingProvider, OllamaConfig, VectorStoreKind};
use docqa::embeddings::{Embedder, OllamaEmbedder, chunk_file};
use docqa::http::HttpClient;
use docqa::library::Library;
use docqa::parsing::read_file;
use std::env;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tracing::info;

const TEST_MODEL: &str = "nomic-embed-text:latest";
const DEFAULT_OLLAMA_HOST: &str = "localhost";
const DEFAULT_OLLAMA_PORT: u16 = 11434;

fn create_integration_test_config(base_dir: &std::path::Path) -> Config {
    let host = env::var("OLLAMA_HOST").unwrap_or_else(|_| DEFAULT_OLLAMA_HOST.to_string());
    let port = env::var("OLLAMA_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_OLLAMA_PORT);
    let embedding_model = env::var("OLLAMA_MODEL").unwrap_or_else(|_| TEST_MODEL.to_string());

    let mut config = Config {
        ollama: OllamaConfig {
            host,
            port,
            embedding_model,
            batch_size: 5,
            ..OllamaConfig::default()
        },
        base_dir: base_dir.to_path_buf(),
        ..Config::default()
    };
    config.embedding.provider = EmbeddingProvider::Ollama;
    config
}

fn create_integration_test_embedder() -> OllamaEmbedder {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = create_integration_test_config(temp_dir.path());

    OllamaEmbedder::new(&config)
        .expect("Failed to create Ollama embedder")
        .with_http_client(
            HttpClient::new()
                .with_timeout(Duration::from_secs(60))
                .with_retry_attempts(3),
        )
}

fn init_test_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer()
        .try_init()
        .ok();
}

#[test]
#[ignore = "requires a running Ollama server"]
fn real_ollama_health_check() {
    init_test_tracing();

    let embedder = create_integration_test_embedder();

    info!("Testing health check against real Ollama instance");
    let result = embedder.health_check();

    assert!(
        result.is_ok(),
        "Health check should succeed with local Ollama: {:?}",
        result
    );
}

#[test]
#[ignore = "requires a running Ollama server"]
fn real_ollama_list_models() {
    init_test_tracing();

    let embedder = create_integration_test_embedder();
    let models = embedder.list_models().expect("should list models");

    info!("Found {} models", models.len());
    assert!(
        models.iter().any(|m| m.name == embedder.model()),
        "Model {} should be pulled",
        embedder.model()
    );
}

#[test]
#[ignore = "requires a running Ollama server"]
fn real_ollama_batch_embeddings() {
    init_test_tracing();

    let embedder = create_integration_test_embedder();
    let texts: Vec<String> = (1..=12)
        .map(|i| format!("Sentence number {} about document retrieval.", i))
        .collect();

    let embeddings = embedder
        .embed_documents(&texts)
        .expect("should embed a batch larger than batch_size");

    assert_eq!(embeddings.len(), texts.len());
    let dimension = embeddings[0].len();
    assert!(dimension > 0);
    assert!(embeddings.iter().all(|e| e.len() == dimension));

    let query = embedder
        .embed_query("document retrieval")
        .expect("should embed query");
    assert_eq!(query.len(), dimension);
}

#[test]
#[ignore = "requires a running Ollama server"]
fn real_ollama_chunk_embeddings() {
    init_test_tracing();

    let embedder = create_integration_test_embedder();
    let file = read_file(
        "guide.txt",
        b"Install the package with the system package manager.\n\n\
          Configure the service by editing the TOML file in your home directory.\n\n\
          Restart the service to apply the changes.",
    )
    .expect("should read");
    let chunked = chunk_file(&file, 12, 0);
    let texts: Vec<String> = chunked.docs.iter().map(|d| d.page_content.clone()).collect();

    let embeddings = embedder.embed_documents(&texts).expect("should embed chunks");

    assert_eq!(embeddings.len(), chunked.docs.len());
}

#[tokio::test]
#[ignore = "requires a running Ollama server"]
async fn real_ollama_library_round_trip() {
    init_test_tracing();

    let temp_dir = TempDir::new().expect("should create temp dir");
    let mut config = create_integration_test_config(temp_dir.path());
    config.retrieval.vector_store = VectorStoreKind::LanceDb;

    let embedder: Arc<dyn Embedder> =
        Arc::new(OllamaEmbedder::new(&config).expect("should create embedder"));
    let library = Library::open_with(config, embedder)
        .await
        .expect("should open library");

    let file = read_file(
        "notes.txt",
        b"The deployment runs every night at two in the morning.",
    )
    .expect("should read");
    let outcome = library.index_file(&file).await.expect("should index");

    assert!(!outcome.cache_hit);
    assert_eq!(
        library.store().count_file(&file.id).await.expect("count"),
        outcome.file.docs.len()
    );
}
