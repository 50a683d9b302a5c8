use serde::Deserialize;
use serde_json::Value;

use crate::{
    completion::{CompletionRequest, Role},
    config::ProviderDetail,
    providers::{OutboundRequest, ProviderAdapter, TOP_P, gemini::*},
};

/// Google Gemini adapter
///
/// Gemini has no system role and authenticates with a `key` query parameter.
#[derive(Debug, Default, Clone, Copy)]
pub struct GeminiAdapter;

impl GeminiAdapter {
    pub fn new() -> Self {
        Self
    }

    /// Convert a completion request to Gemini's `contents` format
    ///
    /// ## 内部实现逻辑
    /// 1. 历史消息按顺序映射，assistant 改名为 model
    /// 2. 系统指令以 `[Instructions: ...]` 块内联到当前用户消息前
    /// 3. 图片可解析时作为 inline_data 放在当前消息文本之前；无法解析时丢弃并记录警告
    pub fn convert_request(&self, request: &CompletionRequest) -> GeminiRequest {
        let mut contents: Vec<GeminiContent> = request
            .history
            .iter()
            .map(|turn| GeminiContent::text(gemini_role(turn.role), turn.content.clone()))
            .collect();

        let user_text = match request.system_text() {
            Some(system) => format!("[Instructions: {}]\n\n{}", system, request.message_text),
            None => request.message_text.clone(),
        };

        let mut parts = vec![GeminiPart::Text { text: user_text }];

        if let Some(image) = &request.image {
            match parse_data_uri(image.as_str()) {
                Some(InlineImage { mime_type, data }) => {
                    tracing::debug!(mime_type = %mime_type, data_len = data.len(), "Attaching inline image");
                    parts.insert(0, GeminiPart::InlineData {
                        inline_data: InlineData { mime_type, data },
                    });
                }
                None => {
                    tracing::warn!("Invalid base64 image format, cannot extract mime type; sending text only");
                }
            }
        }

        contents.push(GeminiContent {
            role: "user".to_string(),
            parts,
        });

        GeminiRequest {
            contents,
            generation_config: GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
                top_p: TOP_P,
            },
        }
    }
}

fn gemini_role(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "model",
    }
}

impl ProviderAdapter for GeminiAdapter {
    fn family(&self) -> &'static str {
        "gemini"
    }

    fn build_request(
        &self,
        provider: &ProviderDetail,
        request: &CompletionRequest,
    ) -> Result<OutboundRequest, String> {
        let body = serde_json::to_value(self.convert_request(request))
            .map_err(|e| format!("Failed to encode Gemini request: {}", e))?;

        Ok(OutboundRequest::new(provider.api_base.clone(), body)
            .query_param("key", provider.api_key.clone()))
    }

    fn extract_text(&self, body: &Value) -> Result<String, String> {
        let response = GeminiResponse::deserialize(body)
            .map_err(|e| format!("Unexpected API response format: {}", e))?;

        let candidate = response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| "Unexpected API response format: no candidates".to_string())?;

        let parts = candidate
            .content
            .and_then(|content| content.parts)
            .ok_or_else(|| {
                let reason = candidate.finish_reason.as_deref().unwrap_or("unknown");
                format!("Unexpected API response format: candidate has no content (finish reason: {})", reason)
            })?;

        parts
            .into_iter()
            .find_map(|part| part.text)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| "Gemini response contained no text".to_string())
    }
}
