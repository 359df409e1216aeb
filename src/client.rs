use log::{debug, error, info};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::metrics::Metrics;
use crate::retry::{self, RetryPolicy};

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("timeout after {0:?}")]
    Timeout(Duration),

    #[error("HTTP {status} server error: {message}")]
    Http5xx { status: u16, message: String },

    #[error("HTTP {status} client error: {message}")]
    Http4xx { status: u16, message: String },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("{0}")]
    Other(String),
}

impl ClientError {
    /// Transient failures are worth another attempt after a backoff wait;
    /// everything else aborts the request immediately.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ClientError::RateLimited(_)
                | ClientError::Connection(_)
                | ClientError::Timeout(_)
                | ClientError::Http5xx { .. }
        )
    }
}

// Request types for the chat completions endpoint
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

// Response types
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    pub model: String,
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    pub message: Message,
}

/// One successful prompt-completion exchange: which model answered, and with
/// what text.
#[derive(Debug, Clone)]
pub struct Completion {
    pub model: String,
    pub answer: String,
}

/// Configuration for creating a routing service client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the OpenAI-compatible routing endpoint
    pub base_url: String,
    /// API key for authentication
    pub api_key: String,
    /// Model identifier sent with every request (a literal model name or the
    /// auto-route sentinel)
    pub routing_target: String,
    /// Request timeout duration
    pub timeout: Duration,
    /// Maximum number of attempts per completion request
    pub max_retries: u32,
    /// Initial delay for exponential backoff
    pub retry_initial_delay: Duration,
}

/// Client for a model-routing chat completions API. Holds one long-lived
/// HTTP session with a fixed request timeout for its whole lifetime.
#[derive(Debug, Clone)]
pub struct OpenRouterClient {
    client: Client,
    base_url: String,
    api_key: String,
    routing_target: String,
    timeout: Duration,
    max_retries: u32,
    retry_initial_delay: Duration,
}

impl OpenRouterClient {
    pub fn new(config: ClientConfig) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            base_url: config.base_url,
            api_key: config.api_key,
            routing_target: config.routing_target,
            timeout: config.timeout,
            max_retries: config.max_retries,
            retry_initial_delay: config.retry_initial_delay,
        })
    }

    /// Requests a completion for a non-empty `prompt`, retrying transient
    /// failures with doubling backoff up to the configured attempt ceiling.
    ///
    /// Returns the model that answered and the text of the first choice.
    /// Exhausted retries and non-retryable errors both surface as `None`;
    /// no error value crosses this boundary.
    pub async fn get_completion(&self, prompt: &str) -> Option<Completion> {
        let request = ChatCompletionRequest {
            model: self.routing_target.clone(),
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        };

        let policy = RetryPolicy::new(self.max_retries, self.retry_initial_delay);
        match retry::run(policy, || self.send_once(&request)).await {
            Ok(completion) => {
                info!("Got completion using model: {}", completion.model);
                Some(completion)
            }
            Err(e) => {
                let preview: String = prompt.chars().take(50).collect();
                error!("Failed to get completion for prompt {:?}: {}", preview, e);
                None
            }
        }
    }

    async fn send_once(&self, request: &ChatCompletionRequest) -> Result<Completion, ClientError> {
        let url = format!("{}/chat/completions", self.base_url);

        debug!("Requesting completion (model: {})", request.model);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ClientError::Timeout(self.timeout)
                } else if e.is_connect() {
                    ClientError::Connection(e.to_string())
                } else {
                    ClientError::Other(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read response body".to_string());

            if status == StatusCode::TOO_MANY_REQUESTS {
                Metrics::record_rate_limited();
                return Err(ClientError::RateLimited(message));
            }
            if status.is_server_error() {
                return Err(ClientError::Http5xx {
                    status: status.as_u16(),
                    message,
                });
            }
            return Err(ClientError::Http4xx {
                status: status.as_u16(),
                message,
            });
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))?;

        extract_completion(completion)
    }
}

fn extract_completion(response: ChatCompletionResponse) -> Result<Completion, ClientError> {
    let ChatCompletionResponse { model, choices } = response;

    let answer = choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content)
        .ok_or_else(|| ClientError::Parse("response contained no choices".to_string()))?;

    Ok(Completion { model, answer })
}
