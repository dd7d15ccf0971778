//! Blocking JSON-over-HTTP client shared by the embedding and chat backends.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, warn};
use url::Url;

pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
const EXPONENTIAL_BACKOFF_BASE: u32 = 2;

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("Client error: HTTP {0}")]
    Client(u16),
    #[error("Failed to serialize request body: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Non-retryable error: {0}")]
    Fatal(String),
    #[error("Request failed after {attempts} attempts: {message}")]
    Exhausted { attempts: u32, message: String },
}

impl RequestError {
    /// HTTP status for client errors
    #[inline]
    pub fn status(&self) -> Option<u16> {
        match *self {
            Self::Client(status) => Some(status),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpClient {
    agent: ureq::Agent,
    retry_attempts: u32,
    retry_delay: Duration,
    bearer_token: Option<String>,
}

impl Default for HttpClient {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    #[inline]
    pub fn new() -> Self {
        Self {
            agent: build_agent(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)),
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            retry_delay: Duration::from_secs(1),
            bearer_token: None,
        }
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = build_agent(timeout);
        self
    }

    #[inline]
    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts.max(1);
        self
    }

    /// Delay before the first retry, doubled on every further attempt
    #[inline]
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    #[inline]
    pub fn with_bearer_token(mut self, token: Option<String>) -> Self {
        self.bearer_token = token.filter(|t| !t.trim().is_empty());
        self
    }

    #[inline]
    pub fn retry_attempts(&self) -> u32 {
        self.retry_attempts
    }

    #[inline]
    pub fn get(&self, url: &Url) -> Result<String, RequestError> {
        debug!("GET {}", url);
        self.send_with_retry(url, || {
            let mut request = self.agent.get(url.as_str());
            if let Some(token) = &self.bearer_token {
                request = request.header("Authorization", format!("Bearer {}", token));
            }
            request
                .call()
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })
    }

    #[inline]
    pub fn post_json<B: Serialize>(&self, url: &Url, body: &B) -> Result<String, RequestError> {
        let request_json = serde_json::to_string(body)?;
        debug!("POST {} ({} bytes)", url, request_json.len());

        self.send_with_retry(url, || {
            let mut request = self
                .agent
                .post(url.as_str())
                .header("Content-Type", "application/json");
            if let Some(token) = &self.bearer_token {
                request = request.header("Authorization", format!("Bearer {}", token));
            }
            request
                .send(&request_json)
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })
    }

    fn send_with_retry<F>(&self, url: &Url, mut request_fn: F) -> Result<String, RequestError>
    where
        F: FnMut() -> Result<String, ureq::Error>,
    {
        let mut last_error = String::new();

        for attempt in 1..=self.retry_attempts {
            debug!("HTTP request attempt {}/{}", attempt, self.retry_attempts);

            match request_fn() {
                Ok(response_text) => {
                    debug!("Request succeeded on attempt {}", attempt);
                    return Ok(response_text);
                }
                Err(error) => {
                    match &error {
                        ureq::Error::StatusCode(status) if *status >= 500 => {
                            warn!(
                                "Server error (status {}), attempt {}/{}",
                                status, attempt, self.retry_attempts
                            );
                        }
                        ureq::Error::StatusCode(status) => {
                            warn!("Client error (status {}), not retrying", status);
                            return Err(RequestError::Client(*status));
                        }
                        ureq::Error::ConnectionFailed
                        | ureq::Error::HostNotFound
                        | ureq::Error::Timeout(_)
                        | ureq::Error::Io(_) => {
                            warn!(
                                "Transport error: {}, attempt {}/{}",
                                error, attempt, self.retry_attempts
                            );
                        }
                        _ => {
                            warn!("Non-retryable error: {}", error);
                            return Err(RequestError::Fatal(error.to_string()));
                        }
                    }

                    last_error = error.to_string();

                    if attempt < self.retry_attempts {
                        let delay = self.retry_delay * EXPONENTIAL_BACKOFF_BASE.pow(attempt - 1);
                        debug!("Waiting {:?} before retry", delay);
                        std::thread::sleep(delay);
                    }
                }
            }
        }

        error!("All retry attempts failed for request to {}", url);

        Err(RequestError::Exhausted {
            attempts: self.retry_attempts,
            message: last_error,
        })
    }
}

fn build_agent(timeout: Duration) -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .build()
        .into()
}

impl From<RequestError> for crate::QaError {
    #[inline]
    fn from(error: RequestError) -> Self {
        match error {
            RequestError::Client(401) => Self::InvalidApiKey(error.to_string()),
            other => Self::Network(other.to_string()),
        }
    }
}
