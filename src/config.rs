use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::{Deserialize, Serialize};

/// 环境变量前缀，`AI_FALLBACK_SERVER__PORT=8080` 覆盖 `server.port`
pub const ENV_PREFIX: &str = "AI_FALLBACK_";

/// 主配置结构体
///
/// 包含服务的全部配置，从配置文件和环境变量加载，启动后只读
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Config {
    /// 服务器配置
    #[serde(default)]
    pub server: ServerConfig,
    /// 提供商配置映射（提供商ID -> 提供商详情）
    pub providers: HashMap<String, ProviderDetail>,
    /// 自动选择时的候选顺序
    #[serde(default)]
    pub routing: RoutingConfig,
    /// 系统提示词增强
    #[serde(default)]
    pub prompt: PromptConfig,
    /// 日志配置（可选，有默认值）
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_max_request_size")]
    pub max_request_size_bytes: usize,
}

/// Wire protocol family spoken by a provider
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// `messages` array with system/user/assistant roles and bearer auth
    #[serde(rename = "openai")]
    OpenAi,
    /// `contents` array without a system role, key passed as a query parameter
    Gemini,
}

impl ProviderKind {
    /// Infer the family from a provider id, the way ids are conventionally named
    pub fn infer(provider_id: &str) -> Self {
        if provider_id.starts_with("gemini") {
            ProviderKind::Gemini
        } else {
            ProviderKind::OpenAi
        }
    }
}

#[derive(Deserialize, Serialize, Clone)]
pub struct ProviderDetail {
    /// Credential; empty means the provider is never dispatched
    #[serde(default, skip_serializing)]
    pub api_key: String,
    /// Full endpoint URL that receives the POST
    pub api_base: String,
    /// Model identifier sent upstream (turn-based providers put it in the body)
    pub model: String,
    #[serde(default)]
    pub kind: Option<ProviderKind>,
    #[serde(default = "default_provider_timeout")]
    pub timeout_seconds: u64,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct RoutingConfig {
    #[serde(default = "default_candidate_order")]
    pub candidate_order: Vec<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct PromptConfig {
    /// Appended to the system prompt unless it already mentions a skip keyword
    #[serde(default)]
    pub style_instruction: Option<String>,
    #[serde(default = "default_skip_keywords")]
    pub skip_keywords: Vec<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_host() -> String { "127.0.0.1".to_string() }
fn default_port() -> u16 { 3000 }
fn default_max_request_size() -> usize { 10 * 1024 * 1024 } // 10MB
fn default_provider_timeout() -> u64 { 60 }
fn default_enabled() -> bool { true }
fn default_candidate_order() -> Vec<String> {
    ["gemini", "deepseek", "openai", "groq"].iter().map(|id| id.to_string()).collect()
}
fn default_skip_keywords() -> Vec<String> {
    vec!["paragraph".to_string(), "paragraf".to_string()]
}
fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_request_size_bytes: default_max_request_size(),
        }
    }
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            candidate_order: default_candidate_order(),
        }
    }
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            style_instruction: None,
            skip_keywords: default_skip_keywords(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl fmt::Debug for ProviderDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let api_key = if self.api_key.is_empty() { "<unset>" } else { "<redacted>" };
        f.debug_struct("ProviderDetail")
            .field("api_key", &api_key)
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("kind", &self.kind)
            .field("timeout_seconds", &self.timeout_seconds)
            .field("enabled", &self.enabled)
            .finish()
    }
}

impl ProviderDetail {
    /// 创建提供商配置，其余字段使用默认值
    pub fn new(api_key: impl Into<String>, api_base: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_base: api_base.into(),
            model: model.into(),
            kind: None,
            timeout_seconds: default_provider_timeout(),
            enabled: default_enabled(),
        }
    }

    /// Effective protocol family, falling back to the id prefix
    pub fn kind_for(&self, provider_id: &str) -> ProviderKind {
        self.kind.unwrap_or_else(|| ProviderKind::infer(provider_id))
    }

    pub fn has_secret(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// 验证AI提供商配置参数
    ///
    /// ## 功能说明
    /// 验证单个提供商的端点、模型和超时设置。
    /// 密钥缺失不是配置错误：该提供商在运行时会被跳过并记录为配置失败。
    ///
    /// ## 参数验证规则
    /// - `api_base`: 必须以http://或https://开头
    /// - `model`: 不能为空
    /// - `timeout_seconds`: 1-600秒之间
    pub fn validate(&self) -> Result<()> {
        if self.api_base.is_empty() {
            return Err(anyhow::anyhow!("Provider API base URL cannot be empty"));
        }

        if !self.api_base.starts_with("http://") && !self.api_base.starts_with("https://") {
            return Err(anyhow::anyhow!("Provider API base URL must start with http:// or https://"));
        }

        if self.model.trim().is_empty() {
            return Err(anyhow::anyhow!("Provider model cannot be empty"));
        }

        if self.timeout_seconds == 0 {
            return Err(anyhow::anyhow!("Provider timeout must be greater than 0"));
        }

        // 10分钟上限
        if self.timeout_seconds > 600 {
            return Err(anyhow::anyhow!("Provider timeout cannot exceed 600 seconds"));
        }

        Ok(())
    }
}

/// 加载工作目录下的config.toml和环境变量
pub fn load_config() -> Result<Config> {
    load_config_from("config.toml")
}

/// 加载配置文件和环境变量
///
/// ## 功能说明
/// 从指定的TOML文件和环境变量（前缀AI_FALLBACK_，嵌套键用`__`分隔）加载配置，
/// 环境变量覆盖文件中的相同设置。随后按提供商ID读取`<ID>_API_KEY`形式的密钥变量。
///
/// ## 内部实现逻辑
/// 1. 使用Figment合并TOML文件与前缀环境变量
/// 2. 反序列化为Config结构体
/// 3. 用`GEMINI_API_KEY`等密钥变量覆盖对应提供商的api_key
/// 4. 调用validate()验证配置
///
/// ## 执行例子
/// ```rust,no_run
/// let config = ai_fallback::config::load_config_from("config.toml")?;
/// println!("Server will run on {}:{}", config.server.host, config.server.port);
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn load_config_from(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    let mut config: Config = Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .with_context(|| format!("Failed to load configuration from {} or environment variables", path.display()))?;

    config.apply_secret_overrides(|name| std::env::var(name).ok());

    config.validate()
        .context("Configuration validation failed")?;

    Ok(config)
}

/// Name of the environment variable holding a provider's secret
pub fn secret_env_var(provider_id: &str) -> String {
    let normalized: String = provider_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect();
    format!("{}_API_KEY", normalized)
}

impl Config {
    /// 用密钥环境变量覆盖文件中的api_key
    ///
    /// `lookup` 返回变量值；空字符串视为未设置
    pub fn apply_secret_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        for (provider_id, provider) in self.providers.iter_mut() {
            let var = secret_env_var(provider_id);
            if let Some(secret) = lookup(&var).filter(|s| !s.trim().is_empty()) {
                tracing::debug!(provider = %provider_id, env = %var, "Provider secret taken from environment");
                provider.api_key = secret;
            }
        }
    }

    /// 验证整个配置的有效性
    ///
    /// ## 内部实现逻辑
    /// 1. 验证服务器配置
    /// 2. 检查至少配置了一个提供商，并逐个验证
    /// 3. 验证候选顺序：非空、无重复、每个ID都已配置
    /// 4. 验证日志配置
    pub fn validate(&self) -> Result<()> {
        self.server.validate()
            .context("Server configuration validation failed")?;

        if self.providers.is_empty() {
            return Err(anyhow::anyhow!("At least one provider must be configured"));
        }

        for (name, provider) in &self.providers {
            provider.validate()
                .with_context(|| format!("Provider '{}' configuration validation failed", name))?;
        }

        self.routing.validate(&self.providers)
            .context("Routing configuration validation failed")?;

        self.logging.validate()
            .context("Logging configuration validation failed")?;

        Ok(())
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(anyhow::anyhow!("Server host cannot be empty"));
        }

        if self.port == 0 {
            return Err(anyhow::anyhow!("Server port cannot be 0"));
        }

        if self.max_request_size_bytes == 0 {
            return Err(anyhow::anyhow!("Max request size must be greater than 0"));
        }

        // 100MB上限
        if self.max_request_size_bytes > 100 * 1024 * 1024 {
            return Err(anyhow::anyhow!("Max request size cannot exceed 100MB"));
        }

        Ok(())
    }
}

impl RoutingConfig {
    pub fn validate(&self, providers: &HashMap<String, ProviderDetail>) -> Result<()> {
        if self.candidate_order.is_empty() {
            return Err(anyhow::anyhow!("Candidate order cannot be empty"));
        }

        let mut seen = HashSet::new();
        for id in &self.candidate_order {
            if !seen.insert(id.as_str()) {
                return Err(anyhow::anyhow!("Provider '{}' appears more than once in candidate order", id));
            }
            if !providers.contains_key(id) {
                return Err(anyhow::anyhow!("Candidate '{}' is not a configured provider", id));
            }
        }

        Ok(())
    }
}

impl LoggingConfig {
    /// 验证日志配置参数
    ///
    /// - `level`: 必须是 "trace", "debug", "info", "warn", "error" 之一
    /// - `format`: 必须是 "json", "pretty", "compact" 之一
    pub fn validate(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.level.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log level '{}': must be one of {:?}",
                self.level, valid_levels
            ));
        }

        let valid_formats = ["json", "pretty", "compact"];
        if !valid_formats.contains(&self.format.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log format '{}': must be one of {:?}",
                self.format, valid_formats
            ));
        }

        Ok(())
    }
}
