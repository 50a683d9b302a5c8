use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use thiserror::Error;

use crate::{
    errors::{AppError, AttemptErrorKind},
    providers::OutboundRequest,
};

/// Longest slice of an upstream error body kept in messages
const MAX_ERROR_BODY_CHARS: usize = 300;

/// Outcome of a transport call that did not yield a JSON body
///
/// Messages never include the request URL: for query-authenticated
/// providers it carries the credential.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("Request failed: {0}")]
    Connection(String),

    #[error("Request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("API error: {status} - {message}")]
    Status { status: u16, message: String },

    #[error("Unexpected API response format: {0}")]
    InvalidBody(String),
}

impl TransportError {
    /// Attempt stage this failure is reported under
    pub fn kind(&self) -> AttemptErrorKind {
        match self {
            TransportError::InvalidBody(_) => AttemptErrorKind::Format,
            _ => AttemptErrorKind::Transport,
        }
    }
}

/// Sends one adapter-built request upstream
///
/// Implementations make exactly one attempt per call and never retry.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &OutboundRequest, timeout: Duration) -> Result<Value, TransportError>;
}

/// reqwest-backed transport sharing one pooled client
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a transport with a pooled client
    pub fn with_default_client() -> Result<Self, AppError> {
        let client = Client::builder()
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| AppError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self::new(client))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &OutboundRequest, timeout: Duration) -> Result<Value, TransportError> {
        let response = self
            .client
            .post(&request.url)
            .headers(request.headers.clone())
            .query(&request.query)
            .json(&request.body)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify_send_error(e, timeout))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                message: upstream_error_message(&error_body, status.canonical_reason()),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| classify_send_error(e, timeout))?;

        serde_json::from_slice(&bytes).map_err(|e| TransportError::InvalidBody(e.to_string()))
    }
}

fn classify_send_error(err: reqwest::Error, timeout: Duration) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(timeout)
    } else {
        TransportError::Connection(err.without_url().to_string())
    }
}

/// Best human-readable message from a non-2xx body
///
/// Prefers the conventional `{"error": {"message": ...}}` shape, falling back
/// to a truncated raw body or the status reason.
fn upstream_error_message(body: &str, reason: Option<&str>) -> String {
    let from_json = serde_json::from_str::<Value>(body).ok().and_then(|v| {
        let error = v.get("error")?;
        error
            .get("message")
            .and_then(Value::as_str)
            .or_else(|| error.as_str())
            .map(str::to_string)
    });

    let message = from_json.unwrap_or_else(|| body.trim().to_string());
    if message.is_empty() {
        return reason.unwrap_or("no response body").to_string();
    }

    truncate_chars(&message, MAX_ERROR_BODY_CHARS)
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
