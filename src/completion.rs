use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::PromptConfig;
use crate::errors::AppError;

/// Token budget used when `responseLength` is missing or unrecognised
pub const DEFAULT_MAX_TOKENS: u32 = 500;

/// Temperature (0-100 scale) used when the caller sends none
pub const DEFAULT_TEMPERATURE_PERCENT: f64 = 70.0;

/// Speaker of a history turn
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One earlier message of the conversation
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// Image attached to the current turn, as the caller sent it (a data URI)
#[derive(Serialize, Deserialize, Clone, PartialEq)]
#[serde(transparent)]
pub struct ImageAttachment(pub String);

impl ImageAttachment {
    pub fn new(data_uri: impl Into<String>) -> Self {
        Self(data_uri.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ImageAttachment {
    // Payloads are megabytes of base64; only the length is useful in logs
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ImageAttachment({} bytes)", self.0.len())
    }
}

/// Provider-neutral completion request
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub message_text: String,
    /// Sent upstream with surrounding whitespace trimmed (see [`system_text`](Self::system_text));
    /// a blank value sends no system instructions at all
    pub system_instructions: Option<String>,
    /// Sampling temperature in [0, 1]
    pub temperature: f32,
    pub max_tokens: u32,
    pub language_hint: Option<String>,
    pub image: Option<ImageAttachment>,
    /// Chronological; adapters must keep this order
    pub history: Vec<ChatTurn>,
}

impl CompletionRequest {
    pub fn new(message_text: impl Into<String>) -> Self {
        Self {
            message_text: message_text.into(),
            system_instructions: None,
            temperature: scale_temperature(DEFAULT_TEMPERATURE_PERCENT),
            max_tokens: DEFAULT_MAX_TOKENS,
            language_hint: None,
            image: None,
            history: Vec::new(),
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system_instructions = Some(system.into());
        self
    }

    pub fn with_history(mut self, history: Vec<ChatTurn>) -> Self {
        self.history = history;
        self
    }

    pub fn with_image(mut self, image: ImageAttachment) -> Self {
        self.image = Some(image);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature.clamp(0.0, 1.0);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens.max(1);
        self
    }

    /// System instructions with surrounding whitespace removed, if any remain
    pub fn system_text(&self) -> Option<&str> {
        self.system_instructions
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Text of the winning provider
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CompletionResult {
    pub text: String,
    #[serde(rename = "model")]
    pub provider_id: String,
}

/// Inbound chat payload as posted by the browser client
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct ChatInput {
    /// Provider selector; "auto" or missing means the configured candidate order
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// 0-100; anything that is not a number falls back to the default
    #[serde(default)]
    pub temperature: Option<Value>,
    /// 1, 2 or 3; any other value gets the default budget
    #[serde(default)]
    pub response_length: Option<Value>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub chat_history: Vec<ChatTurn>,
}

impl ChatInput {
    /// Selector string, defaulting to "auto"
    pub fn selector(&self) -> &str {
        self.model.as_deref().filter(|m| !m.trim().is_empty()).unwrap_or("auto")
    }

    /// Convert into a provider-neutral request
    pub fn into_request(self, prompt: &PromptConfig) -> Result<CompletionRequest, AppError> {
        if self.message.trim().is_empty() {
            return Err(AppError::bad_request("Message cannot be empty"));
        }

        let system_instructions = enrich_system_prompt(self.system_prompt.as_deref(), prompt);

        Ok(CompletionRequest {
            message_text: self.message,
            system_instructions,
            temperature: scale_temperature(
                self.temperature
                    .as_ref()
                    .and_then(Value::as_f64)
                    .unwrap_or(DEFAULT_TEMPERATURE_PERCENT),
            ),
            max_tokens: max_tokens_for(self.response_length.as_ref().and_then(Value::as_i64)),
            language_hint: self.language.filter(|l| !l.trim().is_empty()),
            image: self.image.filter(|i| !i.is_empty()).map(ImageAttachment),
            history: self.chat_history,
        })
    }
}

/// Rescale a 0-100 temperature into [0, 1]
pub fn scale_temperature(percent: f64) -> f32 {
    if percent.is_nan() {
        return scale_temperature(DEFAULT_TEMPERATURE_PERCENT);
    }
    (percent.clamp(0.0, 100.0) / 100.0) as f32
}

/// Map the 1/2/3 response-length setting onto a token budget
pub fn max_tokens_for(response_length: Option<i64>) -> u32 {
    match response_length {
        Some(1) => 100,
        Some(2) => 500,
        Some(3) => 1500,
        _ => DEFAULT_MAX_TOKENS,
    }
}

/// Append the configured style instruction unless the prompt already asks for a layout
pub fn enrich_system_prompt(system: Option<&str>, prompt: &PromptConfig) -> Option<String> {
    let base = system.map(str::trim).unwrap_or_default();

    let Some(instruction) = prompt.style_instruction.as_deref().map(str::trim).filter(|s| !s.is_empty()) else {
        return Some(base.to_string()).filter(|s| !s.is_empty());
    };

    let lowered = base.to_lowercase();
    let already_styled = prompt
        .skip_keywords
        .iter()
        .filter(|keyword| !keyword.is_empty())
        .any(|keyword| lowered.contains(&keyword.to_lowercase()));

    if already_styled {
        Some(base.to_string())
    } else if base.is_empty() {
        Some(instruction.to_string())
    } else {
        Some(format!("{}\n\n{}", base, instruction))
    }
}
