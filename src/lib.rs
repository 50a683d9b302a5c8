pub mod completion;
pub mod config;
pub mod errors;
pub mod formatter;
pub mod orchestrator;
pub mod providers;
pub mod server;
pub mod transport;

// Re-export commonly used types for easier access
pub use completion::{ChatInput, ChatTurn, CompletionRequest, CompletionResult, ImageAttachment, Role};
pub use config::{Config, load_config, load_config_from};
pub use errors::{AggregatedError, AppError, AppResult, AttemptErrorKind, ProviderAttemptError};
pub use orchestrator::{FallbackOrchestrator, ProviderSelector};
pub use server::{AppState, create_app, start_server};
