pub mod gemini;
pub mod openai;
pub mod registry;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;

use crate::{completion::CompletionRequest, config::ProviderDetail};

// Re-export registry for easier access
pub use registry::{ProviderRegistry, RegisteredProvider};

/// Nucleus sampling value sent with every request; not caller-configurable
pub const TOP_P: f32 = 0.9;

/// Provider-specific wire request produced by an adapter
///
/// Carries everything the transport needs for a single POST. Header values
/// holding credentials are marked sensitive, and query values are never
/// printed, so a request can be logged without leaking secrets.
#[derive(Clone)]
pub struct OutboundRequest {
    pub url: String,
    pub headers: HeaderMap,
    pub query: Vec<(&'static str, String)>,
    pub body: Value,
}

impl OutboundRequest {
    pub fn new(url: impl Into<String>, body: Value) -> Self {
        Self {
            url: url.into(),
            headers: HeaderMap::new(),
            query: Vec::new(),
            body,
        }
    }

    /// Attach a header; credential headers should pass `sensitive = true`
    pub fn header(mut self, name: HeaderName, value: &str, sensitive: bool) -> Result<Self, String> {
        let mut value = HeaderValue::from_str(value)
            .map_err(|_| format!("Invalid value for header {}", name))?;
        value.set_sensitive(sensitive);
        self.headers.insert(name, value);
        Ok(self)
    }

    pub fn query_param(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.query.push((name, value.into()));
        self
    }
}

impl std::fmt::Debug for OutboundRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let query: Vec<&str> = self.query.iter().map(|(name, _)| *name).collect();
        f.debug_struct("OutboundRequest")
            .field("url", &self.url)
            .field("headers", &self.headers)
            .field("query", &query)
            .finish_non_exhaustive()
    }
}

/// Capability set every provider family implements
///
/// Adapters are pure: building a request and reading a response never touch
/// the network. The orchestrator owns sequencing and the transport owns I/O.
pub trait ProviderAdapter: Send + Sync {
    /// Short family name used in logs
    fn family(&self) -> &'static str;

    /// Translate a generic request into this provider's wire request
    ///
    /// An `Err` is a configuration problem (for example a credential that
    /// cannot be placed in a header) and is recorded as such.
    fn build_request(
        &self,
        provider: &ProviderDetail,
        request: &CompletionRequest,
    ) -> Result<OutboundRequest, String>;

    /// Pull the generated text out of a successful response body
    ///
    /// Missing structure or empty text is an `Err`, never an empty success.
    fn extract_text(&self, body: &Value) -> Result<String, String>;
}
