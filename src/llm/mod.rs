// Chat model backends used to answer questions

pub mod fake;
pub mod ollama;
pub mod openai;

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::config::Config;
use crate::config::settings::{DEBUG_MODEL, OLLAMA_MODEL_PREFIX};
use crate::http::{HttpClient, RequestError};
use crate::{QaError, Result};

pub use fake::FakeChat;
pub use ollama::OllamaChat;
pub use openai::OpenAiChat;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    #[inline]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    #[inline]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// A chat completion model. Calls block until the full reply arrives.
pub trait ChatModel: Send + Sync {
    fn model(&self) -> &str;

    fn complete(&self, messages: &[ChatMessage]) -> Result<String>;
}

/// Pick the chat backend for a model name.
///
/// `debug` answers offline, `ollama/<name>` talks to the local Ollama
/// server and anything else is sent to the OpenAI API.
#[inline]
pub fn get_llm(config: &Config, model: &str, temperature: f32) -> Result<Box<dyn ChatModel>> {
    let model = model.trim();
    if model.is_empty() {
        return Err(QaError::Llm("Model name cannot be empty".to_string()));
    }

    if model == DEBUG_MODEL {
        debug!("Using offline debug chat model");
        return Ok(Box::new(FakeChat));
    }

    if let Some(name) = model.strip_prefix(OLLAMA_MODEL_PREFIX) {
        let base_url = config
            .ollama_url()
            .map_err(|e| QaError::Config(e.to_string()))?;
        info!("Using Ollama chat model {}", name);
        return Ok(Box::new(OllamaChat::new(base_url, name, temperature)));
    }

    let api_key = config.openai_api_key().ok_or(QaError::MissingApiKey)?;
    let base_url = config
        .openai
        .api_base_url()
        .map_err(|e| QaError::Config(e.to_string()))?;
    info!("Using OpenAI chat model {}", model);
    Ok(Box::new(OpenAiChat::new(
        &base_url,
        api_key,
        model,
        temperature,
    )?))
}

/// Make sure answering with `model` will not fail for lack of credentials
#[inline]
pub fn validate_openai_key(config: &Config, model: &str) -> Result<()> {
    if model == DEBUG_MODEL || model.starts_with(OLLAMA_MODEL_PREFIX) {
        return Ok(());
    }

    let base_url = config
        .openai
        .api_base_url()
        .map_err(|e| QaError::Config(e.to_string()))?;
    check_openai_key(config.openai_api_key().as_deref(), &base_url)
}

/// Check a key against `GET {base_url}/models`
#[inline]
pub fn check_openai_key(api_key: Option<&str>, base_url: &Url) -> Result<()> {
    let api_key = api_key
        .filter(|key| !key.trim().is_empty())
        .ok_or(QaError::MissingApiKey)?;

    let url = base_url
        .join("models")
        .map_err(|e| QaError::Config(format!("Failed to build models URL: {}", e)))?;

    let client = HttpClient::new()
        .with_retry_attempts(1)
        .with_bearer_token(Some(api_key.to_string()));

    match client.get(&url) {
        Ok(_) => {
            debug!("OpenAI API key accepted");
            Ok(())
        }
        Err(RequestError::Client(401)) => Err(QaError::InvalidApiKey(
            "Incorrect API key provided".to_string(),
        )),
        Err(e) => Err(QaError::Network(format!(
            "Could not verify OpenAI API key: {}",
            e
        ))),
    }
}
