use ai_fallback::{
    completion::{ChatTurn, CompletionRequest, ImageAttachment},
    config::ProviderDetail,
    providers::{ProviderAdapter, openai::OpenAIAdapter},
};
use reqwest::header::AUTHORIZATION;
use serde_json::json;

fn chat_provider() -> ProviderDetail {
    ProviderDetail::new(
        "sk-test-0123456789",
        "https://api.groq.com/openai/v1/chat/completions",
        "llama3-8b-8192",
    )
}

#[test]
fn test_convert_request_message_order() {
    let request = CompletionRequest::new("bye")
        .with_system("Be brief")
        .with_history(vec![ChatTurn::user("hi"), ChatTurn::assistant("hello")]);

    let converted = OpenAIAdapter::new().convert_request("llama3-8b-8192", &request);

    let roles: Vec<&str> = converted.messages.iter().map(|m| m.role.as_str()).collect();
    let contents: Vec<&str> = converted.messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
    assert_eq!(contents, vec!["Be brief", "hi", "hello", "bye"]);
    assert_eq!(converted.model, "llama3-8b-8192");
    assert_eq!(converted.top_p, 0.9);
}

#[test]
fn test_convert_request_without_system_prompt() {
    let request = CompletionRequest::new("hello").with_system("   ");
    let converted = OpenAIAdapter::new().convert_request("gpt-3.5-turbo", &request);

    assert_eq!(converted.messages.len(), 1);
    assert_eq!(converted.messages[0].role, "user");
    assert_eq!(converted.messages[0].content, "hello");
}

#[test]
fn test_build_request_body_and_headers() {
    let request = CompletionRequest::new("hello")
        .with_temperature(0.5)
        .with_max_tokens(1500);

    let outbound = OpenAIAdapter::new().build_request(&chat_provider(), &request).unwrap();

    assert_eq!(outbound.url, "https://api.groq.com/openai/v1/chat/completions");
    assert!(outbound.query.is_empty());
    assert_eq!(outbound.body["model"], "llama3-8b-8192");
    assert_eq!(outbound.body["messages"], json!([{"role": "user", "content": "hello"}]));
    assert_eq!(outbound.body["temperature"], 0.5);
    assert_eq!(outbound.body["max_tokens"], 1500);
    let top_p = outbound.body["top_p"].as_f64().unwrap();
    assert!((top_p - 0.9).abs() < 1e-6);

    let auth = outbound.headers.get(AUTHORIZATION).unwrap();
    assert_eq!(auth.to_str().unwrap(), "Bearer sk-test-0123456789");
    assert!(auth.is_sensitive());
    assert_eq!(outbound.headers.get("content-type").unwrap(), "application/json");
}

#[test]
fn test_image_is_not_sent_to_chat_providers() {
    let request = CompletionRequest::new("what is this?")
        .with_image(ImageAttachment::new("data:image/png;base64,iVBORw0KGgo="));

    let outbound = OpenAIAdapter::new().build_request(&chat_provider(), &request).unwrap();
    let body = outbound.body.to_string();

    assert!(!body.contains("iVBORw0KGgo"));
    assert_eq!(outbound.body["messages"][0]["content"], "what is this?");
}

#[test]
fn test_key_with_newline_is_a_build_error() {
    let mut provider = chat_provider();
    provider.api_key = "bad\nkey".to_string();

    let err = OpenAIAdapter::new()
        .build_request(&provider, &CompletionRequest::new("hello"))
        .unwrap_err();
    assert_eq!(err, "API key contains characters not allowed in a header");
}

#[test]
fn test_debug_output_hides_bearer_token() {
    let outbound = OpenAIAdapter::new()
        .build_request(&chat_provider(), &CompletionRequest::new("hello"))
        .unwrap();
    assert!(!format!("{:?}", outbound).contains("sk-test-0123456789"));
}

#[test]
fn test_extract_text_success() {
    let body = json!({
        "id": "chatcmpl-1",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": "Hi there"},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 3, "completion_tokens": 2, "total_tokens": 5}
    });

    assert_eq!(OpenAIAdapter::new().extract_text(&body).unwrap(), "Hi there");
}

#[test]
fn test_extract_text_failures() {
    let adapter = OpenAIAdapter::new();

    let err = adapter.extract_text(&json!({"choices": []})).unwrap_err();
    assert_eq!(err, "No choices in API response");

    let err = adapter.extract_text(&json!({"object": "error"})).unwrap_err();
    assert!(err.starts_with("Unexpected API response format"));

    let err = adapter
        .extract_text(&json!({"choices": [{"message": {"role": "assistant", "content": null}}]}))
        .unwrap_err();
    assert_eq!(err, "API response contained no message content");

    let err = adapter
        .extract_text(&json!({"choices": [{"message": {"role": "assistant", "content": "  "}}]}))
        .unwrap_err();
    assert_eq!(err, "API response contained no message content");
}
