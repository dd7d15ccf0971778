#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use crate::config::Config;
use crate::embeddings::Embedder;
use crate::http::HttpClient;
use crate::{QaError, Result};

#[derive(Debug, Clone)]
pub struct OllamaEmbedder {
    base_url: Url,
    model: String,
    batch_size: u32,
    http: HttpClient,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum EmbedInput<'a> {
    Single(&'a str),
    Batch(&'a [String]),
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: EmbedInput<'a>,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub size: Option<u64>,
    pub digest: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    models: Vec<ModelInfo>,
}

impl OllamaEmbedder {
    #[inline]
    pub fn new(config: &Config) -> Result<Self> {
        let base_url = config
            .ollama_url()
            .map_err(|e| QaError::Config(e.to_string()))?;

        Ok(Self {
            base_url,
            model: config.ollama.embedding_model.clone(),
            batch_size: config.ollama.batch_size.max(1),
            http: HttpClient::new(),
        })
    }

    #[inline]
    pub fn with_http_client(mut self, http: HttpClient) -> Self {
        self.http = http;
        self
    }

    /// Test connection to Ollama server and verify model availability
    #[inline]
    pub fn health_check(&self) -> Result<()> {
        debug!("Performing health check for Ollama at {}", self.base_url);

        // ping first so an unreachable server is reported as such
        self.ping()?;
        self.validate_model()?;

        info!(
            "Health check passed for Ollama server at {} with model {}",
            self.base_url, self.model
        );
        Ok(())
    }

    /// Ping the Ollama server to check if it's responsive
    #[inline]
    pub fn ping(&self) -> Result<()> {
        let url = self.endpoint("/api/tags")?;
        debug!("Pinging Ollama server at {}", url);

        self.http
            .get(&url)
            .map_err(|e| QaError::Network(format!("Failed to ping Ollama server: {}", e)))?;

        debug!("Server ping successful");
        Ok(())
    }

    /// Validate that the configured model is available
    #[inline]
    pub fn validate_model(&self) -> Result<()> {
        debug!("Validating model: {}", self.model);

        let models = self.list_models()?;

        if models.iter().any(|m| m.name == self.model) {
            debug!("Model {} is available", self.model);
            Ok(())
        } else {
            let available_models: Vec<&str> = models.iter().map(|m| m.name.as_str()).collect();
            warn!(
                "Model {} not found. Available models: {:?}",
                self.model, available_models
            );
            Err(QaError::Embedding(format!(
                "Model '{}' is not available. Available models: {:?}",
                self.model, available_models
            )))
        }
    }

    /// List all available models
    #[inline]
    pub fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let url = self.endpoint("/api/tags")?;
        debug!("Fetching available models from {}", url);

        let response_text = self.http.get(&url)?;
        let models_response: ModelsResponse = serde_json::from_str(&response_text)
            .map_err(|e| QaError::Embedding(format!("Failed to parse models response: {}", e)))?;

        debug!("Found {} models", models_response.models.len());
        Ok(models_response.models)
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| QaError::Config(format!("Failed to build Ollama URL: {}", e)))
    }

    fn embed(&self, input: EmbedInput<'_>) -> Result<Vec<Vec<f32>>> {
        let url = self.endpoint("/api/embed")?;
        let request = EmbedRequest {
            model: &self.model,
            input,
        };

        let response_text = self
            .http
            .post_json(&url, &request)
            .map_err(|e| QaError::Embedding(format!("Failed to generate embeddings: {}", e)))?;

        let response: EmbedResponse = serde_json::from_str(&response_text).map_err(|e| {
            QaError::Embedding(format!("Failed to parse embedding response: {}", e))
        })?;

        Ok(response.embeddings)
    }
}

impl Embedder for OllamaEmbedder {
    #[inline]
    fn provider(&self) -> &str {
        "ollama"
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

        debug!("Generating embeddings for {} texts", texts.len());

        let mut results = Vec::with_capacity(texts.len());

        // keep request bodies bounded
        for batch in texts.chunks(self.batch_size as usize) {
            let embeddings = self.embed(EmbedInput::Batch(batch))?;

            if embeddings.len() != batch.len() {
                return Err(QaError::Embedding(format!(
                    "Mismatch between request and response counts: {} vs {}",
                    batch.len(),
                    embeddings.len()
                )));
            }

            results.extend(embeddings);
        }

        debug!("Generated {} embeddings total", results.len());
        Ok(results)
    }

    #[inline]
    fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        debug!("Generating embedding for query (length: {})", text.len());

        self.embed(EmbedInput::Single(text))?
            .into_iter()
            .next()
            .ok_or_else(|| QaError::Embedding("Ollama returned no embedding".to_string()))
    }
}
