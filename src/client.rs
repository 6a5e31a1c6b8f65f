//! Chat-completion client used for AI-assisted documentation.
//!
//! The HTTP layer sits behind [`CompletionTransport`] and backoff sleeps behind [`Sleeper`],
//! so the retry policy can be exercised without a network or a clock.

use crate::extractor::RouteRecord;
use crate::prompt::{build_multiple_routes_prompt, build_route_prompt, extract_yaml, validate_response};
use async_trait::async_trait;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default chat-completion endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

/// Default model name.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Retries after the first attempt; four attempts in total.
const MAX_RETRIES: u32 = 3;

/// Connection settings for [`CompletionClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_key: String,
    pub endpoint: String,
    pub model: String,
    /// Per-request timeout, fixed for the lifetime of the client
    pub timeout: Duration,
    /// Token budget for single-route requests
    pub max_tokens: u32,
    /// Token budget for batch requests
    pub batch_max_tokens: u32,
    pub temperature: f32,
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(60),
            max_tokens: 2000,
            batch_max_tokens: 4000,
            temperature: 0.3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatChoice {
    #[serde(default)]
    pub message: ChatResponseMessage,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatResponse {
    /// Content of the first choice, if any
    pub fn first_content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.message.content.as_deref())
    }
}

/// Failure reported by a transport.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportError {
    /// A response arrived with a non-success status
    Status { status: u16, detail: Option<String> },
    /// No complete response was received (connect failure, timeout, cut-off body)
    NoResponse(String),
    /// The request was never sent or the body could not be decoded
    Other(String),
}

impl TransportError {
    /// 429 and every 5xx status are worth retrying
    pub fn is_retryable(&self) -> bool {
        matches!(self, TransportError::Status { status, .. } if *status == 429 || *status >= 500)
    }
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            TransportError::Status { status, detail } => match detail {
                Some(detail) => write!(f, "HTTP {}: {}", status, detail),
                None => write!(f, "HTTP {}", status),
            },
            TransportError::NoResponse(msg) => write!(f, "no response: {}", msg),
            TransportError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

/// Stable, user-facing completion failures.
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionError {
    BadRequest(String),
    InvalidApiKey,
    RateLimited,
    ServerError(u16),
    Api { status: u16, detail: Option<String> },
    Network(String),
    EmptyResponse,
    Unexpected(String),
}

impl std::fmt::Display for CompletionError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            CompletionError::BadRequest(payload) => write!(f, "Bad Request: {}", payload),
            CompletionError::InvalidApiKey => {
                write!(f, "Invalid API key. Check the configured key and try again.")
            }
            CompletionError::RateLimited => {
                write!(f, "Rate limit exceeded. Wait a moment and try again.")
            }
            CompletionError::ServerError(code) => write!(
                f,
                "Completion service server error ({}). Try again later.",
                code
            ),
            CompletionError::Api { status, detail } => match detail {
                Some(detail) => write!(f, "API error ({}): {}", status, detail),
                None => write!(f, "API error ({})", status),
            },
            CompletionError::Network(msg) => write!(
                f,
                "Network error: could not reach the completion service ({})",
                msg
            ),
            CompletionError::EmptyResponse => {
                write!(f, "Completion service returned an empty response")
            }
            CompletionError::Unexpected(msg) => write!(f, "Unexpected error: {}", msg),
        }
    }
}

impl std::error::Error for CompletionError {}

impl From<TransportError> for CompletionError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Status { status: 400, detail } => {
                CompletionError::BadRequest(detail.unwrap_or_else(|| "no details".to_string()))
            }
            TransportError::Status { status: 401, .. } => CompletionError::InvalidApiKey,
            TransportError::Status { status: 429, .. } => CompletionError::RateLimited,
            TransportError::Status {
                status: status @ (500 | 502 | 503 | 504),
                ..
            } => CompletionError::ServerError(status),
            TransportError::Status { status, detail } => CompletionError::Api { status, detail },
            TransportError::NoResponse(msg) => CompletionError::Network(msg),
            TransportError::Other(msg) => CompletionError::Unexpected(msg),
        }
    }
}

/// Sends one chat-completion request.
#[async_trait]
pub trait CompletionTransport: Send + Sync {
    async fn post_chat(&self, request: &ChatRequest) -> Result<ChatResponse, TransportError>;
}

/// Waits between retry attempts.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// `reqwest` transport with bearer authentication.
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| TransportError::Other(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl CompletionTransport for HttpTransport {
    async fn post_chat(&self, request: &ChatRequest) -> Result<ChatResponse, TransportError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(classify_reqwest_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(classify_reqwest_error)?;

        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                detail: error_detail(&String::from_utf8_lossy(&body)),
            });
        }

        serde_json::from_slice::<ChatResponse>(&body)
            .map_err(|e| TransportError::Other(format!("Invalid response body: {}", e)))
    }
}

/// Timeouts and connection, request or body-read failures mean no usable response arrived.
fn classify_reqwest_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() || e.is_connect() || e.is_request() || e.is_body() {
        TransportError::NoResponse(e.to_string())
    } else {
        TransportError::Other(e.to_string())
    }
}

/// Pulls `error.message` out of an error body, falling back to the raw text.
fn error_detail(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| value["error"]["message"].as_str().map(str::to_string))
        .or_else(|| Some(body.to_string()))
}

/// Completion client with bounded exponential-backoff retries.
pub struct CompletionClient {
    config: ClientConfig,
    transport: Box<dyn CompletionTransport>,
    sleeper: Box<dyn Sleeper>,
}

impl CompletionClient {
    /// Creates a client backed by [`HttpTransport`] and real sleeps.
    pub fn new(config: ClientConfig) -> Result<Self, CompletionError> {
        let transport = HttpTransport::new(&config)?;
        Ok(Self::with_transport(
            config,
            Box::new(transport),
            Box::new(TokioSleeper),
        ))
    }

    pub fn with_transport(
        config: ClientConfig,
        transport: Box<dyn CompletionTransport>,
        sleeper: Box<dyn Sleeper>,
    ) -> Self {
        Self {
            config,
            transport,
            sleeper,
        }
    }

    /// Documents one route and returns the cleaned YAML fragment.
    pub async fn generate_documentation(
        &self,
        route: &RouteRecord,
        code_snippet: Option<&str>,
    ) -> Result<String, CompletionError> {
        let prompt = build_route_prompt(route, code_snippet);
        self.complete(prompt, self.config.max_tokens).await
    }

    /// Documents several routes in one request.
    pub async fn generate_batch_documentation(
        &self,
        routes: &[RouteRecord],
    ) -> Result<String, CompletionError> {
        let prompt = build_multiple_routes_prompt(routes);
        self.complete(prompt, self.config.batch_max_tokens).await
    }

    /// Sends a minimal request; any failure yields `false`.
    pub async fn test_connection(&self) -> bool {
        let request = self.request("Reply with OK.".to_string(), 5);
        match self.transport.post_chat(&request).await {
            Ok(_) => true,
            Err(e) => {
                debug!("Connection test failed: {}", e);
                false
            }
        }
    }

    fn request(&self, prompt: String, max_tokens: u32) -> ChatRequest {
        ChatRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt,
            }],
            temperature: self.config.temperature,
            max_tokens,
        }
    }

    async fn complete(&self, prompt: String, max_tokens: u32) -> Result<String, CompletionError> {
        let request = self.request(prompt, max_tokens);
        let response = self.send_with_retries(&request).await?;

        let content = response
            .first_content()
            .map(str::trim)
            .filter(|content| !content.is_empty())
            .ok_or(CompletionError::EmptyResponse)?;

        let yaml = extract_yaml(content);
        let validation = validate_response(&yaml);
        if !validation.is_valid {
            warn!(
                "AI response failed validation: {}",
                validation.errors.join("; ")
            );
        }

        Ok(yaml)
    }

    async fn send_with_retries(&self, request: &ChatRequest) -> Result<ChatResponse, CompletionError> {
        let mut attempt = 0;

        loop {
            match self.transport.post_chat(request).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() && attempt < MAX_RETRIES => {
                    let delay = Duration::from_secs(2_u64.pow(attempt));
                    warn!(
                        "Completion request failed (attempt {}/{}): {}. Retrying in {}s",
                        attempt + 1,
                        MAX_RETRIES + 1,
                        e,
                        delay.as_secs()
                    );
                    self.sleeper.sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}
