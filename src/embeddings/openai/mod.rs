#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::config::OpenAiConfig;
use crate::embeddings::Embedder;
use crate::http::{HttpClient, RequestError};
use crate::{QaError, Result};

#[derive(Debug, Clone)]
pub struct OpenAiEmbedder {
    endpoint: Url,
    model: String,
    batch_size: u32,
    http: HttpClient,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAiEmbedder {
    #[inline]
    pub fn new(config: &OpenAiConfig, api_key: String) -> Result<Self> {
        let endpoint = config
            .api_base_url()
            .and_then(|base| {
                base.join("embeddings")
                    .map_err(|_| crate::config::ConfigError::InvalidUrl(config.base_url.clone()))
            })
            .map_err(|e| QaError::Config(e.to_string()))?;

        Ok(Self {
            endpoint,
            model: config.embedding_model.clone(),
            batch_size: config.batch_size.max(1),
            http: HttpClient::new().with_bearer_token(Some(api_key)),
        })
    }

    /// Replace the HTTP client. The new client must carry its own bearer token.
    #[inline]
    pub fn with_http_client(mut self, http: HttpClient) -> Self {
        self.http = http;
        self
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: texts,
        };

        let response_text =
            self.http
                .post_json(&self.endpoint, &request)
                .map_err(|e| match e {
                    RequestError::Client(401) => QaError::InvalidApiKey(e.to_string()),
                    other => QaError::Embedding(format!("Failed to generate embeddings: {}", other)),
                })?;

        let mut response: EmbeddingResponse =
            serde_json::from_str(&response_text).map_err(|e| {
                QaError::Embedding(format!("Failed to parse embedding response: {}", e))
            })?;

        if response.data.len() != texts.len() {
            return Err(QaError::Embedding(format!(
                "Mismatch between request and response counts: {} vs {}",
                texts.len(),
                response.data.len()
            )));
        }

        response.data.sort_by_key(|d| d.index);
        Ok(response.data.into_iter().map(|d| d.embedding).collect())
    }
}

impl Embedder for OpenAiEmbedder {
    #[inline]
    fn provider(&self) -> &str {
        "openai"
    }

    #[inline]
    fn model(&self) -> &str {
        &self.model
    }

    #[inline]
    fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating OpenAI embeddings for {} texts", texts.len());

        let mut results = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size as usize) {
            results.extend(self.embed_batch(batch)?);
        }

        Ok(results)
    }

    #[inline]
    fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])?
            .into_iter()
            .next()
            .ok_or_else(|| QaError::Embedding("OpenAI returned no embedding".to_string()))
    }
}
