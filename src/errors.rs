use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// Use anyhow::Result for configuration loading
// Use thiserror for well-typed errors that need to be handled specifically

/// Application-specific errors surfaced by the HTTP layer
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("{0}")]
    CompletionFailed(#[from] AggregatedError),

    #[error("Internal server error: {0}")]
    InternalServerError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::InternalServerError(msg.into())
    }
}

/// Convert AppError to HTTP response
///
/// Every failure renders as a summary line plus a detail string.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, summary, details) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "Invalid request", msg.clone()),
            AppError::CompletionFailed(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to get AI response",
                err.message().to_string(),
            ),
            AppError::InternalServerError(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error", msg.clone())
            }
            AppError::ConfigError(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Configuration error", msg.clone())
            }
        };

        let body = Json(json!({
            "error": summary,
            "details": details,
        }));

        (status, body).into_response()
    }
}

/// Convert from anyhow::Error to AppError for error context
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        tracing::error!("Application error: {:?}", err);
        AppError::ConfigError(format!("{:#}", err))
    }
}

/// Helper type for results that use AppError
pub type AppResult<T> = Result<T, AppError>;

/// Stage of a single provider attempt that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptErrorKind {
    /// Provider unknown, disabled or missing its credential; nothing was sent
    Config,
    /// Connection failure, timeout or non-2xx upstream status
    Transport,
    /// Upstream answered 2xx but the expected structure was missing
    Format,
}

impl fmt::Display for AttemptErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            AttemptErrorKind::Config => "config",
            AttemptErrorKind::Transport => "transport",
            AttemptErrorKind::Format => "format",
        };
        f.write_str(kind)
    }
}

/// One failed candidate inside an orchestrated run
#[derive(Error, Debug, Clone, PartialEq, serde::Serialize)]
#[error("{message}")]
pub struct ProviderAttemptError {
    pub provider_id: String,
    pub kind: AttemptErrorKind,
    pub message: String,
}

impl ProviderAttemptError {
    pub fn new(provider_id: impl Into<String>, kind: AttemptErrorKind, message: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
            kind,
            message: message.into(),
        }
    }

    pub fn config(provider_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(provider_id, AttemptErrorKind::Config, message)
    }

    pub fn transport(provider_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(provider_id, AttemptErrorKind::Transport, message)
    }

    pub fn format(provider_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(provider_id, AttemptErrorKind::Format, message)
    }
}

/// Failure of a whole orchestrated run
///
/// `Exhausted` carries every attempt in the order it was made; the visible
/// message is the last attempt's message.
#[derive(Error, Debug, Clone)]
pub enum AggregatedError {
    #[error("{}", last_message(.attempts))]
    Exhausted { attempts: Vec<ProviderAttemptError> },

    #[error("Completion cancelled after {} attempt(s)", .attempts.len())]
    Cancelled { attempts: Vec<ProviderAttemptError> },
}

const NO_ATTEMPT_MESSAGE: &str = "All AI models failed";

fn last_message(attempts: &[ProviderAttemptError]) -> &str {
    attempts
        .last()
        .map(|attempt| attempt.message.as_str())
        .unwrap_or(NO_ATTEMPT_MESSAGE)
}

impl AggregatedError {
    /// Message shown to the caller
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// All recorded attempts, in order
    pub fn attempts(&self) -> &[ProviderAttemptError] {
        match self {
            AggregatedError::Exhausted { attempts } | AggregatedError::Cancelled { attempts } => attempts,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, AggregatedError::Cancelled { .. })
    }
}
