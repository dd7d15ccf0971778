
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::http::HttpClient;
use crate::llm::{ChatMessage, ChatModel};
use crate::{QaError, Result};

const CHAT_TIMEOUT_SECONDS: u64 = 300;

#[derive(Debug, Clone)]
pub struct OllamaChat {
    base_url: Url,
    model: String,
    temperature: f32,
    http: HttpClient,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    options: ChatOptions,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatMessage,
}

impl OllamaChat {
    #[inline]
    pub fn new(base_url: Url, model: &str, temperature: f32) -> Self {
        Self {
            base_url,
            model: model.to_string(),
            temperature,
            http: HttpClient::new()
                .with_timeout(std::time::Duration::from_secs(CHAT_TIMEOUT_SECONDS)),
        }
    }

    #[inline]
    pub fn with_http_client(mut self, http: HttpClient) -> Self {
        self.http = http;
        self
    }
}

impl ChatModel for OllamaChat {
    #[inline]
    fn model(&self) -> &str {
        &self.model
    }

    #[inline]
    fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let url = self
            .base_url
            .join("/api/chat")
            .map_err(|e| QaError::Config(format!("Failed to build chat URL: {}", e)))?;

        debug!("Requesting Ollama chat completion from {}", self.model);

        let request = ChatRequest {
            model: &self.model,
            messages,
            stream: false,
            options: ChatOptions {
                temperature: self.temperature,
            },
        };

        let response_text = self
            .http
            .post_json(&url, &request)
            .map_err(|e| QaError::Llm(format!("Ollama chat failed: {}", e)))?;

        let response: ChatResponse = serde_json::from_str(&response_text)
            .map_err(|e| QaError::Llm(format!("Failed to parse Ollama chat response: {}", e)))?;

        Ok(response.message.content)
    }
}
