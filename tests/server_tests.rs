use std::collections::HashMap;
use std::sync::Arc;

use ai_fallback::{
    config::{Config, LoggingConfig, PromptConfig, ProviderDetail, RoutingConfig, ServerConfig},
    server::{AppState, create_app},
    transport::HttpTransport,
};
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{Value, json};
use tower::ServiceExt;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_partial_json, method, path},
};

fn create_test_config(chat_base: &str) -> Config {
    let mut providers = HashMap::new();
    providers.insert(
        "groq".to_string(),
        ProviderDetail::new("groq-test-key", format!("{}/openai/v1/chat/completions", chat_base), "llama3-8b-8192"),
    );
    providers.insert(
        "gemini".to_string(),
        ProviderDetail::new(
            "",
            "https://generativelanguage.googleapis.com/v1/models/gemini-2.0-flash:generateContent",
            "gemini-2.0-flash",
        ),
    );

    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3000,
            max_request_size_bytes: 1024 * 1024,
        },
        providers,
        routing: RoutingConfig {
            candidate_order: vec!["gemini".to_string(), "groq".to_string()],
        },
        prompt: PromptConfig::default(),
        logging: LoggingConfig::default(),
    }
}

fn test_app(config: Config) -> axum::Router {
    let transport = HttpTransport::with_default_client().unwrap();
    create_app(AppState::with_transport(config, Arc::new(transport)))
}

fn chat_request(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/chat")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn response_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_app_state_creation() {
    let app_state = AppState::new(create_test_config("http://127.0.0.1:9"));
    assert!(app_state.is_ok());
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = test_app(create_test_config("http://127.0.0.1:9"));

    let response = app
        .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = response_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["message"], "Server is running");
    // Only providers with a credential are reported
    assert_eq!(json["providers"], json!(["groq"]));
    assert!(json["timestamp"].is_string());
}

#[tokio::test]
async fn test_chat_endpoint_success() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/openai/v1/chat/completions"))
        .and(body_partial_json(json!({
            "model": "llama3-8b-8192",
            "max_tokens": 100,
            "messages": [
                {"role": "system", "content": "Be brief"},
                {"role": "user", "content": "hi"},
                {"role": "assistant", "content": "hello"},
                {"role": "user", "content": "bye"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "- Goodbye\n\nSee you"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let app = test_app(create_test_config(&server.uri()));
    let response = app
        .oneshot(chat_request(json!({
            "model": "auto",
            "message": "bye",
            "systemPrompt": "Be brief",
            "temperature": 20,
            "responseLength": 1,
            "chatHistory": [
                {"role": "user", "content": "hi"},
                {"role": "assistant", "content": "hello"}
            ]
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = response_json(response).await;
    assert_eq!(json, json!({"text": "<p>Goodbye</p><p>See you</p>", "model": "groq"}));
}

#[tokio::test]
async fn test_chat_endpoint_failure_shape() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/openai/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({
            "error": {"message": "Service unavailable"}
        })))
        .mount(&server)
        .await;

    let app = test_app(create_test_config(&server.uri()));
    let response = app.oneshot(chat_request(json!({"message": "hi"}))).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = response_json(response).await;
    assert_eq!(json["error"], "Failed to get AI response");
    assert_eq!(json["details"], "groq: API error: 503 - Service unavailable");
}

#[tokio::test]
async fn test_chat_endpoint_explicit_provider_without_key() {
    let app = test_app(create_test_config("http://127.0.0.1:9"));
    let response = app
        .oneshot(chat_request(json!({"model": "gemini", "message": "hi"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = response_json(response).await;
    assert_eq!(json["details"], "gemini API key not configured");
}

#[tokio::test]
async fn test_chat_endpoint_rejects_empty_message() {
    let app = test_app(create_test_config("http://127.0.0.1:9"));
    let response = app.oneshot(chat_request(json!({"message": ""}))).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = response_json(response).await;
    assert_eq!(json["error"], "Invalid request");
    assert_eq!(json["details"], "Message cannot be empty");
}

#[tokio::test]
async fn test_chat_endpoint_accepts_loosely_typed_numbers() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/openai/v1/chat/completions"))
        .and(body_partial_json(json!({"max_tokens": 500})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "ok"}}]
        })))
        .expect(2)
        .mount(&server)
        .await;

    for body in [
        json!({"message": "hi", "responseLength": "3", "temperature": "70"}),
        json!({"message": "hi", "responseLength": 2.5}),
    ] {
        let app = test_app(create_test_config(&server.uri()));
        let response = app.oneshot(chat_request(body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response_json(response).await["model"], "groq");
    }
}

#[tokio::test]
async fn test_chat_endpoint_rejects_oversized_body() {
    let mut config = create_test_config("http://127.0.0.1:9");
    config.server.max_request_size_bytes = 64;
    let app = test_app(config);

    let response = app
        .oneshot(chat_request(json!({"message": "x".repeat(1024)})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let app = test_app(create_test_config("http://127.0.0.1:9"));
    let response = app
        .oneshot(Request::builder().uri("/api/missing").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
