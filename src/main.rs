use std::path::PathBuf;

use ai_fallback::{AppError, config::LoggingConfig, load_config_from, start_server};
use clap::Parser;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Chat completion service with ordered provider fallback
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Override the listen host
    #[arg(long)]
    host: Option<String>,

    /// Override the listen port
    #[arg(short, long)]
    port: Option<u16>,
}

/// 主函数 - 服务入口
///
/// 负责加载配置、初始化日志系统并启动HTTP服务器
#[tokio::main]
async fn main() -> Result<(), AppError> {
    let args = Args::parse();

    let mut config = load_config_from(&args.config)
        .map_err(|e| AppError::ConfigError(format!("加载配置失败: {:#}", e)))?;

    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    config.server.validate()?;

    init_tracing(&config.logging)?;

    tracing::info!(
        host = %config.server.host,
        port = %config.server.port,
        providers_count = config.providers.len(),
        "Configuration loaded successfully"
    );

    start_server(config).await?;

    Ok(())
}

/// 初始化结构化日志系统
///
/// `RUST_LOG` 优先，否则使用配置中的日志级别；输出格式为 json / pretty / compact
fn init_tracing(logging: &LoggingConfig) -> Result<(), AppError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("ai_fallback={},tower_http=debug", logging.level)));

    let fmt_layer = match logging.format.as_str() {
        "pretty" => fmt::layer().pretty().with_target(true).boxed(),
        "compact" => fmt::layer().compact().with_target(false).boxed(),
        _ => fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_span_events(FmtSpan::CLOSE)
            .json()
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| AppError::ConfigError(format!("Failed to initialize tracing: {}", e)))?;

    tracing::info!("Structured logging system initialized");
    Ok(())
}
