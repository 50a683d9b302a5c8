use std::collections::HashMap;
use std::sync::Arc;

use crate::{
    config::{Config, ProviderDetail, ProviderKind},
    providers::{ProviderAdapter, gemini::GeminiAdapter, openai::OpenAIAdapter},
};

/// A configured provider paired with the adapter that speaks its protocol
#[derive(Clone)]
pub struct RegisteredProvider {
    pub id: String,
    pub detail: ProviderDetail,
    pub adapter: Arc<dyn ProviderAdapter>,
}

impl std::fmt::Debug for RegisteredProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredProvider")
            .field("id", &self.id)
            .field("family", &self.adapter.family())
            .field("detail", &self.detail)
            .finish()
    }
}

/// Provider registry that maps provider ids to their adapters
///
/// Built once at startup and read-only afterwards. Adding a provider family
/// means registering another `ProviderAdapter`, not touching the orchestrator.
#[derive(Debug, Default, Clone)]
pub struct ProviderRegistry {
    providers: HashMap<String, RegisteredProvider>,
}

impl ProviderRegistry {
    /// 从配置创建新的提供商注册表
    ///
    /// ## 功能说明
    /// 遍历配置中的所有提供商，按协议族（显式 `kind` 或ID前缀推断）选择适配器并注册
    ///
    /// ## 执行例子
    /// ```rust,no_run
    /// use ai_fallback::{config::load_config, providers::ProviderRegistry};
    ///
    /// let config = load_config()?;
    /// let registry = ProviderRegistry::from_config(&config);
    /// println!("Initialized {} providers", registry.len());
    /// # Ok::<(), anyhow::Error>(())
    /// ```
    pub fn from_config(config: &Config) -> Self {
        let mut registry = Self::new_empty();

        for (provider_id, detail) in &config.providers {
            let adapter: Arc<dyn ProviderAdapter> = match detail.kind_for(provider_id) {
                ProviderKind::Gemini => Arc::new(GeminiAdapter::new()),
                ProviderKind::OpenAi => Arc::new(OpenAIAdapter::new()),
            };
            registry.register(provider_id.clone(), detail.clone(), adapter);
        }

        registry
    }

    /// Create an empty provider registry
    pub fn new_empty() -> Self {
        Self::default()
    }

    /// Register (or replace) a provider under `id`
    pub fn register(
        &mut self,
        id: impl Into<String>,
        detail: ProviderDetail,
        adapter: Arc<dyn ProviderAdapter>,
    ) -> &mut Self {
        let id = id.into();
        tracing::debug!(provider = %id, family = adapter.family(), "Registering provider");
        self.providers.insert(id.clone(), RegisteredProvider { id, detail, adapter });
        self
    }

    pub fn get(&self, id: &str) -> Option<&RegisteredProvider> {
        self.providers.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.providers.contains_key(id)
    }

    /// 获取所有已配置的提供商ID列表（已排序，便于日志和健康检查输出）
    pub fn get_provider_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.providers.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Ids of providers that are enabled and have a credential
    pub fn dispatchable_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .providers
            .values()
            .filter(|p| p.detail.enabled && p.detail.has_secret())
            .map(|p| p.id.clone())
            .collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
