
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::http::{HttpClient, RequestError};
use crate::llm::{ChatMessage, ChatModel};
use crate::{QaError, Result};

/// Answers with up to a few hundred tokens can take a while
const CHAT_TIMEOUT_SECONDS: u64 = 120;

#[derive(Debug, Clone)]
pub struct OpenAiChat {
    endpoint: Url,
    model: String,
    temperature: f32,
    http: HttpClient,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: &'a [ChatMessage],
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

impl OpenAiChat {
    /// `base_url` must end with a slash, see `OpenAiConfig::api_base_url`
    #[inline]
    pub fn new(base_url: &Url, api_key: String, model: &str, temperature: f32) -> Result<Self> {
        let endpoint = base_url
            .join("chat/completions")
            .map_err(|e| QaError::Config(format!("Failed to build chat URL: {}", e)))?;

        Ok(Self {
            endpoint,
            model: model.to_string(),
            temperature,
            http: HttpClient::new()
                .with_timeout(std::time::Duration::from_secs(CHAT_TIMEOUT_SECONDS))
                .with_bearer_token(Some(api_key)),
        })
    }

    /// Replace the HTTP client. The new client must carry its own bearer token.
    #[inline]
    pub fn with_http_client(mut self, http: HttpClient) -> Self {
        self.http = http;
        self
    }
}

impl ChatModel for OpenAiChat {
    #[inline]
    fn model(&self) -> &str {
        &self.model
    }

    #[inline]
    fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        debug!(
            "Requesting chat completion from {} ({} messages)",
            self.model,
            messages.len()
        );

        let request = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            messages,
        };

        let response_text = self
            .http
            .post_json(&self.endpoint, &request)
            .map_err(|e| match e {
                RequestError::Client(401) => QaError::InvalidApiKey(e.to_string()),
                other => QaError::Llm(format!("Chat completion failed: {}", other)),
            })?;

        let response: ChatResponse = serde_json::from_str(&response_text)
            .map_err(|e| QaError::Llm(format!("Failed to parse chat response: {}", e)))?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| QaError::Llm("Chat response contained no answer".to_string()))
    }
}
