//! Ordered fallback across upstream providers.
//!
//! A run walks the candidate list strictly in order, one network round trip at
//! a time. The first provider that yields text wins; the text is formatted
//! once and returned. Every failure is recorded and the walk moves on. Only
//! exhaustion (or cancellation) is surfaced to the caller.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
    completion::{CompletionRequest, CompletionResult},
    config::Config,
    errors::{AggregatedError, ProviderAttemptError},
    formatter::format_paragraphs,
    providers::ProviderRegistry,
    transport::Transport,
};

/// Selector value meaning "use the configured candidate order"
pub const AUTO_SELECTOR: &str = "auto";

/// Which providers a run may try
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderSelector {
    Auto,
    Provider(String),
}

impl ProviderSelector {
    /// `"auto"` (any case) or an empty string selects the candidate order
    pub fn parse(selector: &str) -> Self {
        let selector = selector.trim();
        if selector.is_empty() || selector.eq_ignore_ascii_case(AUTO_SELECTOR) {
            ProviderSelector::Auto
        } else {
            ProviderSelector::Provider(selector.to_string())
        }
    }
}

impl From<&str> for ProviderSelector {
    fn from(selector: &str) -> Self {
        Self::parse(selector)
    }
}

impl fmt::Display for ProviderSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderSelector::Auto => f.write_str(AUTO_SELECTOR),
            ProviderSelector::Provider(id) => f.write_str(id),
        }
    }
}

/// Result of folding over the candidate list
#[derive(Debug)]
pub enum RunOutcome {
    Success(CompletionResult),
    Failure(Vec<ProviderAttemptError>),
    Cancelled(Vec<ProviderAttemptError>),
}

impl RunOutcome {
    pub fn into_result(self) -> Result<CompletionResult, AggregatedError> {
        match self {
            RunOutcome::Success(result) => Ok(result),
            RunOutcome::Failure(attempts) => Err(AggregatedError::Exhausted { attempts }),
            RunOutcome::Cancelled(attempts) => Err(AggregatedError::Cancelled { attempts }),
        }
    }
}

/// Sequences candidate providers for one completion
///
/// Holds only immutable state, so one instance is shared by every request.
pub struct FallbackOrchestrator {
    registry: Arc<ProviderRegistry>,
    transport: Arc<dyn Transport>,
    candidate_order: Vec<String>,
}

impl FallbackOrchestrator {
    pub fn new(
        registry: Arc<ProviderRegistry>,
        transport: Arc<dyn Transport>,
        candidate_order: Vec<String>,
    ) -> Self {
        Self {
            registry,
            transport,
            candidate_order,
        }
    }

    /// Build the registry from `config` and use its candidate order
    pub fn from_config(config: &Config, transport: Arc<dyn Transport>) -> Self {
        Self::new(
            Arc::new(ProviderRegistry::from_config(config)),
            transport,
            config.routing.candidate_order.clone(),
        )
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn candidate_order(&self) -> &[String] {
        &self.candidate_order
    }

    /// Candidate ids for `selector`, in the order they will be tried
    pub fn candidates(&self, selector: &ProviderSelector) -> Vec<String> {
        match selector {
            ProviderSelector::Auto => self.candidate_order.clone(),
            ProviderSelector::Provider(id) => vec![id.clone()],
        }
    }

    /// Run the fallback chain until a provider succeeds or all have failed
    pub async fn run(
        &self,
        selector: &ProviderSelector,
        request: &CompletionRequest,
    ) -> Result<CompletionResult, AggregatedError> {
        self.run_until_cancelled(selector, request, &CancellationToken::new())
            .await
    }

    /// Same as [`run`](Self::run), stopping as soon as `cancel` fires
    ///
    /// The in-flight upstream call is dropped on cancellation and no further
    /// candidates are attempted.
    #[tracing::instrument(
        name = "completion",
        skip_all,
        fields(run_id = %Uuid::new_v4(), selector = %selector)
    )]
    pub async fn run_until_cancelled(
        &self,
        selector: &ProviderSelector,
        request: &CompletionRequest,
        cancel: &CancellationToken,
    ) -> Result<CompletionResult, AggregatedError> {
        let candidates = self.candidates(selector);
        let outcome = self.execute(&candidates, request, cancel).await;

        match &outcome {
            RunOutcome::Success(result) => {
                tracing::info!(provider = %result.provider_id, "Completion succeeded");
            }
            RunOutcome::Failure(attempts) => {
                for attempt in attempts {
                    tracing::error!(
                        provider = %attempt.provider_id,
                        kind = %attempt.kind,
                        error = %attempt.message,
                        "Provider attempt failed"
                    );
                }
                tracing::error!(attempts = attempts.len(), "All providers failed");
            }
            RunOutcome::Cancelled(attempts) => {
                tracing::warn!(attempts = attempts.len(), "Completion cancelled");
            }
        }

        outcome.into_result()
    }

    async fn execute(
        &self,
        candidates: &[String],
        request: &CompletionRequest,
        cancel: &CancellationToken,
    ) -> RunOutcome {
        let mut attempts = Vec::with_capacity(candidates.len());

        for provider_id in candidates {
            if cancel.is_cancelled() {
                return RunOutcome::Cancelled(attempts);
            }

            tracing::info!(provider = %provider_id, "Trying provider");
            let started = Instant::now();

            let attempt = tokio::select! {
                biased;
                _ = cancel.cancelled() => return RunOutcome::Cancelled(attempts),
                result = self.attempt(provider_id, request) => result,
            };

            let elapsed_ms = started.elapsed().as_millis() as u64;
            match attempt {
                Ok(text) => {
                    tracing::info!(provider = %provider_id, elapsed_ms, "Provider succeeded");
                    return RunOutcome::Success(CompletionResult {
                        text: format_paragraphs(&text),
                        provider_id: provider_id.clone(),
                    });
                }
                Err(err) => {
                    tracing::warn!(
                        provider = %provider_id,
                        kind = %err.kind,
                        elapsed_ms,
                        error = %err.message,
                        "Provider failed, moving to next candidate"
                    );
                    attempts.push(err);
                }
            }
        }

        RunOutcome::Failure(attempts)
    }

    /// Adapter -> transport -> normalizer for one candidate
    async fn attempt(
        &self,
        provider_id: &str,
        request: &CompletionRequest,
    ) -> Result<String, ProviderAttemptError> {
        let Some(provider) = self.registry.get(provider_id) else {
            return Err(ProviderAttemptError::config(
                provider_id,
                format!("Unknown model: {}", provider_id),
            ));
        };

        let detail = &provider.detail;
        if !detail.enabled {
            return Err(ProviderAttemptError::config(
                provider_id,
                format!("{} is disabled", provider_id),
            ));
        }
        if !detail.has_secret() {
            return Err(ProviderAttemptError::config(
                provider_id,
                format!("{} API key not configured", provider_id),
            ));
        }

        let scrub = |message: String| redact_secret(&message, &detail.api_key);

        let outbound = provider
            .adapter
            .build_request(detail, request)
            .map_err(|e| {
                ProviderAttemptError::config(provider_id, scrub(format!("{}: {}", provider_id, e)))
            })?;

        let body = self
            .transport
            .send(&outbound, detail.timeout())
            .await
            .map_err(|e| {
                ProviderAttemptError::new(provider_id, e.kind(), scrub(format!("{}: {}", provider_id, e)))
            })?;

        provider.adapter.extract_text(&body).map_err(|e| {
            ProviderAttemptError::format(provider_id, scrub(format!("{}: {}", provider_id, e)))
        })
    }
}

/// Replace every occurrence of `secret` in `message`
pub fn redact_secret(message: &str, secret: &str) -> String {
    let secret = secret.trim();
    if secret.is_empty() {
        return message.to_string();
    }
    message.replace(secret, "[REDACTED]")
}
