use ai_fallback::config::{
    Config, LoggingConfig, PromptConfig, ProviderDetail, ProviderKind, RoutingConfig, ServerConfig,
};
use ai_fallback::providers::{ProviderRegistry, openai::OpenAIAdapter};
use std::collections::HashMap;
use std::sync::Arc;

fn create_test_config() -> Config {
    let mut providers = HashMap::new();
    providers.insert(
        "gemini".to_string(),
        ProviderDetail::new(
            "gemini-key",
            "https://generativelanguage.googleapis.com/v1/models/gemini-2.0-flash:generateContent",
            "gemini-2.0-flash",
        ),
    );
    providers.insert(
        "deepseek".to_string(),
        ProviderDetail::new("", "https://api.deepseek.com/v1/chat/completions", "deepseek-chat"),
    );

    let mut groq = ProviderDetail::new("groq-key", "https://api.groq.com/openai/v1/chat/completions", "llama3-8b-8192");
    groq.enabled = false;
    providers.insert("groq".to_string(), groq);

    let mut vertex = ProviderDetail::new("vertex-key", "https://vertex.example.com/generate", "gemini-pro");
    vertex.kind = Some(ProviderKind::Gemini);
    providers.insert("vertex".to_string(), vertex);

    Config {
        server: ServerConfig::default(),
        providers,
        routing: RoutingConfig {
            candidate_order: vec!["gemini".to_string(), "deepseek".to_string()],
        },
        prompt: PromptConfig::default(),
        logging: LoggingConfig::default(),
    }
}

#[test]
fn test_provider_registry_creation() {
    let registry = ProviderRegistry::from_config(&create_test_config());

    assert_eq!(registry.len(), 4);
    assert!(!registry.is_empty());
    assert_eq!(registry.get_provider_ids(), vec!["deepseek", "gemini", "groq", "vertex"]);
}

#[test]
fn test_adapter_family_selection() {
    let registry = ProviderRegistry::from_config(&create_test_config());

    assert_eq!(registry.get("gemini").unwrap().adapter.family(), "gemini");
    assert_eq!(registry.get("deepseek").unwrap().adapter.family(), "openai");
    assert_eq!(registry.get("groq").unwrap().adapter.family(), "openai");
    // Explicit kind wins over the id
    assert_eq!(registry.get("vertex").unwrap().adapter.family(), "gemini");
}

#[test]
fn test_dispatchable_ids_require_enabled_and_secret() {
    let registry = ProviderRegistry::from_config(&create_test_config());
    assert_eq!(registry.dispatchable_ids(), vec!["gemini", "vertex"]);
}

#[test]
fn test_unknown_provider_lookup() {
    let registry = ProviderRegistry::from_config(&create_test_config());
    assert!(registry.get("mistral").is_none());
    assert!(!registry.contains("mistral"));
    assert!(registry.contains("gemini"));
}

#[test]
fn test_register_replaces_existing_entry() {
    let mut registry = ProviderRegistry::new_empty();
    assert!(registry.is_empty());

    registry
        .register(
            "local",
            ProviderDetail::new("k1", "http://localhost:8080/v1/chat/completions", "m1"),
            Arc::new(OpenAIAdapter::new()),
        )
        .register(
            "local",
            ProviderDetail::new("k2", "http://localhost:8080/v1/chat/completions", "m2"),
            Arc::new(OpenAIAdapter::new()),
        );

    assert_eq!(registry.len(), 1);
    assert_eq!(registry.get("local").unwrap().detail.model, "m2");
}

#[test]
fn test_registry_debug_hides_secrets() {
    let registry = ProviderRegistry::from_config(&create_test_config());
    let debug = format!("{:?}", registry);
    assert!(!debug.contains("gemini-key"));
    assert!(!debug.contains("vertex-key"));
}
