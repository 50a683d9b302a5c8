use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::Value;

use crate::{
    completion::CompletionRequest,
    config::ProviderDetail,
    providers::{OutboundRequest, ProviderAdapter, TOP_P, openai::*},
};

/// Adapter for providers with a turn-based `messages` array and bearer auth
#[derive(Debug, Default, Clone, Copy)]
pub struct OpenAIAdapter;

impl OpenAIAdapter {
    pub fn new() -> Self {
        Self
    }

    /// Convert a completion request to the OpenAI chat format
    ///
    /// Order: optional system entry, history as given, then the current user turn.
    pub fn convert_request(&self, model: &str, request: &CompletionRequest) -> OpenAIRequest {
        let mut messages = Vec::with_capacity(request.history.len() + 2);

        if let Some(system) = request.system_text() {
            messages.push(OpenAIMessage::new("system", system));
        }

        messages.extend(
            request
                .history
                .iter()
                .map(|turn| OpenAIMessage::new(turn.role.as_str(), turn.content.clone())),
        );

        messages.push(OpenAIMessage::new("user", request.message_text.clone()));

        OpenAIRequest {
            model: model.to_string(),
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            top_p: TOP_P,
        }
    }
}

impl ProviderAdapter for OpenAIAdapter {
    fn family(&self) -> &'static str {
        "openai"
    }

    fn build_request(
        &self,
        provider: &ProviderDetail,
        request: &CompletionRequest,
    ) -> Result<OutboundRequest, String> {
        if request.image.is_some() {
            // No multimodal support here; the text still goes through
            tracing::debug!("Image attachment ignored by turn-based provider");
        }

        let body = serde_json::to_value(self.convert_request(&provider.model, request))
            .map_err(|e| format!("Failed to encode chat request: {}", e))?;

        OutboundRequest::new(provider.api_base.clone(), body)
            .header(CONTENT_TYPE, "application/json", false)?
            .header(AUTHORIZATION, &format!("Bearer {}", provider.api_key), true)
            .map_err(|_| "API key contains characters not allowed in a header".to_string())
    }

    fn extract_text(&self, body: &Value) -> Result<String, String> {
        let response = OpenAIResponse::deserialize(body)
            .map_err(|e| format!("Unexpected API response format: {}", e))?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| "No choices in API response".to_string())?;

        match choice.message.content {
            Some(text) if !text.trim().is_empty() => Ok(text),
            _ => Err("API response contained no message content".to_string()),
        }
    }
}
