use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, State},
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    completion::{ChatInput, CompletionResult},
    config::Config,
    errors::{AppError, AppResult},
    orchestrator::{FallbackOrchestrator, ProviderSelector},
    transport::{HttpTransport, Transport},
};

/// 应用程序状态 - 在所有请求处理器之间共享
///
/// 配置与编排器在启动时构建，之后只读，无需加锁
#[derive(Clone)]
pub struct AppState {
    /// 应用程序配置（只读共享）
    pub config: Arc<Config>,
    /// 提供商回退编排器
    pub orchestrator: Arc<FallbackOrchestrator>,
}

impl AppState {
    /// Create application state with the pooled HTTP transport
    pub fn new(config: Config) -> AppResult<Self> {
        let transport = HttpTransport::with_default_client()?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Create application state over any transport
    pub fn with_transport(config: Config, transport: Arc<dyn Transport>) -> Self {
        let orchestrator = FallbackOrchestrator::from_config(&config, transport);
        Self {
            config: Arc::new(config),
            orchestrator: Arc::new(orchestrator),
        }
    }
}

/// Create the main application router with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    let body_limit = state.config.server.max_request_size_bytes;

    Router::new()
        .route("/api/chat", post(chat_handler))
        .route("/api/health", get(health_handler))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(DefaultBodyLimit::max(body_limit)),
        )
}

/// Start the HTTP server
pub async fn start_server(config: Config) -> AppResult<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let app_state = AppState::new(config)?;

    tracing::info!(
        candidates = ?app_state.orchestrator.candidate_order(),
        dispatchable = ?app_state.orchestrator.registry().dispatchable_ids(),
        "Provider registry ready"
    );

    let app = create_app(app_state);

    let listener = TcpListener::bind(&addr).await
        .map_err(|e| AppError::ConfigError(format!("Failed to bind to {}: {}", addr, e)))?;

    tracing::info!("AI fallback server starting on {}", addr);
    tracing::info!("Available endpoints:");
    tracing::info!("  POST /api/chat   - Chat completion with provider fallback");
    tracing::info!("  GET  /api/health - Health check");

    axum::serve(listener, app).await
        .map_err(|e| AppError::InternalServerError(format!("Server error: {}", e)))?;

    Ok(())
}

// Request Handlers

/// Handle chat completion requests
///
/// If the client disconnects, axum drops this future, which aborts the
/// in-flight upstream call and stops the fallback chain.
async fn chat_handler(
    State(state): State<AppState>,
    Json(input): Json<ChatInput>,
) -> AppResult<Json<CompletionResult>> {
    let selector = ProviderSelector::parse(input.selector());

    tracing::info!(
        selector = %selector,
        message_len = input.message.len(),
        has_image = input.image.is_some(),
        history_len = input.chat_history.len(),
        "Processing chat request"
    );

    let request = input.into_request(&state.config.prompt)?;
    let result = state.orchestrator.run(&selector, &request).await?;

    Ok(Json(result))
}

/// Handle service health check
async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "message": "Server is running",
        "version": env!("CARGO_PKG_VERSION"),
        "providers": state.orchestrator.registry().dispatchable_ids(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
