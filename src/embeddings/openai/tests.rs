use super::*;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn embedder_for(server: &MockServer, batch_size: u32) -> OpenAiEmbedder {
    let config = OpenAiConfig {
        base_url: format!("{}/v1", server.uri()),
        batch_size,
        ..OpenAiConfig::default()
    };

    OpenAiEmbedder::new(&config, "sk-test".to_string())
        .expect("Failed to create embedder")
        .with_http_client(
            HttpClient::new()
                .with_retry_attempts(1)
                .with_bearer_token(Some("sk-test".to_string())),
        )
}

#[test]
fn endpoint_is_below_base_path() {
    let embedder = OpenAiEmbedder::new(&OpenAiConfig::default(), "sk-test".to_string())
        .expect("Failed to create embedder");

    assert_eq!(
        embedder.endpoint.as_str(),
        "https://api.openai.com/v1/embeddings"
    );
    assert_eq!(embedder.signature(), "openai:text-embedding-ada-002");
}

#[tokio::test]
async fn embeddings_follow_response_index() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .and(header("Authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "text-embedding-ada-002",
            "input": ["first", "second"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "data": [
                {"object": "embedding", "index": 1, "embedding": [0.0, 1.0]},
                {"object": "embedding", "index": 0, "embedding": [1.0, 0.0]}
            ],
            "model": "text-embedding-ada-002"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let embedder = embedder_for(&server, 16);
    let vectors = embedder
        .embed_documents(&["first".to_string(), "second".to_string()])
        .expect("should embed documents");

    assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
}

#[tokio::test]
async fn documents_are_batched() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"index": 0, "embedding": [0.5]}]
        })))
        .expect(3)
        .mount(&server)
        .await;

    let embedder = embedder_for(&server, 1);
    let texts = vec!["a".to_string(), "b".to_string(), "c".to_string()];
    let vectors = embedder
        .embed_documents(&texts)
        .expect("should embed documents");

    assert_eq!(vectors.len(), 3);
}

#[tokio::test]
async fn unauthorized_maps_to_invalid_key() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let embedder = embedder_for(&server, 16);
    let result = embedder.embed_query("hello");

    assert!(matches!(result, Err(QaError::InvalidApiKey(_))));
}
