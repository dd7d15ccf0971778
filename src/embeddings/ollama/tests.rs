use super::*;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> Config {
    let address = server.address();
    let mut config = Config::default();
    config.ollama.host = address.ip().to_string();
    config.ollama.port = address.port();
    config.ollama.embedding_model = "test-model".to_string();
    config.ollama.batch_size = 2;
    config
}

fn embedder_for(server: &MockServer) -> OllamaEmbedder {
    OllamaEmbedder::new(&config_for(server))
        .expect("Failed to create embedder")
        .with_http_client(HttpClient::new().with_retry_attempts(1))
}

#[test]
fn embedder_configuration() {
    let mut config = Config::default();
    config.ollama.host = "test-host".to_string();
    config.ollama.port = 1234;
    config.ollama.embedding_model = "test-model".to_string();
    config.ollama.batch_size = 128;

    let embedder = OllamaEmbedder::new(&config).expect("Failed to create embedder");

    assert_eq!(embedder.model, "test-model");
    assert_eq!(embedder.batch_size, 128);
    assert_eq!(embedder.base_url.host_str(), Some("test-host"));
    assert_eq!(embedder.base_url.port(), Some(1234));
    assert_eq!(embedder.signature(), "ollama:test-model");
}

#[tokio::test]
async fn embed_documents_in_batches() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_partial_json(json!({"input": ["one", "two"]})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"embeddings": [[1.0, 0.0], [0.0, 1.0]]})),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_partial_json(json!({"input": ["three"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"embeddings": [[0.5, 0.5]]})))
        .expect(1)
        .mount(&server)
        .await;

    let embedder = embedder_for(&server);
    let texts = vec!["one".to_string(), "two".to_string(), "three".to_string()];
    let vectors = embedder
        .embed_documents(&texts)
        .expect("should embed documents");

    assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.5, 0.5]]);
}

#[tokio::test]
async fn embed_query_sends_single_input() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_partial_json(
            json!({"model": "test-model", "input": "what is it?"}),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"embeddings": [[0.25, 0.75]]})))
        .mount(&server)
        .await;

    let embedder = embedder_for(&server);
    let vector = embedder
        .embed_query("what is it?")
        .expect("should embed query");

    assert_eq!(vector, vec![0.25, 0.75]);
}

#[tokio::test]
async fn count_mismatch_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"embeddings": [[1.0]]})))
        .mount(&server)
        .await;

    let embedder = embedder_for(&server);
    let texts = vec!["one".to_string(), "two".to_string()];
    let result = embedder.embed_documents(&texts);

    assert!(matches!(result, Err(QaError::Embedding(_))));
}

#[tokio::test]
async fn health_check_validates_model() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [{"name": "test-model", "size": 1024, "digest": "abc"}]
        })))
        .mount(&server)
        .await;

    let embedder = embedder_for(&server);
    embedder.health_check().expect("health check should pass");

    let mut config = config_for(&server);
    config.ollama.embedding_model = "missing-model".to_string();
    let missing = OllamaEmbedder::new(&config)
        .expect("Failed to create embedder")
        .with_http_client(HttpClient::new().with_retry_attempts(1));
    assert!(missing.validate_model().is_err());
}

#[test]
fn empty_input_makes_no_request() {
    let mut config = Config::default();
    config.ollama.port = 1;
    let embedder = OllamaEmbedder::new(&config).expect("Failed to create embedder");

    let vectors = embedder
        .embed_documents(&[])
        .expect("empty input should succeed");
    assert!(vectors.is_empty());
}
