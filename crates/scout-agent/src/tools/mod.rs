// ABOUTME: Tool trait, tool errors, and the registry the agent loop dispatches tool calls through.
// ABOUTME: Tool failures are folded into structured `{"error": ...}` results instead of failing the loop.

pub mod extract;
pub mod fetch;
pub mod normalize;
pub mod search;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use scout_core::DomainAllowList;

pub use extract::ExtractListingTool;
pub use fetch::{FetchPageTool, PageFetcher};
pub use normalize::NormalizeListingsTool;
pub use search::SearchListingsTool;

/// Errors a tool can report. They never escape the registry; the model sees
/// them as `{"error": "<message>"}`.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("missing required argument: {0}")]
    MissingArgument(&'static str),

    #[error("{0} is not set")]
    MissingCredential(&'static str),

    #[error("request failed: {0}")]
    Transport(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to fetch {url} after {attempts} attempts: {last_error}")]
    FetchExhausted {
        url: String,
        attempts: u32,
        last_error: String,
    },
}

/// A named, schema-typed capability the model may invoke.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    /// Provider-agnostic JSON schema: `name`, `description`, `parameters`.
    fn definition(&self) -> Value;

    async fn call(&self, args: Value) -> Result<Value, ToolError>;
}

/// Everything the listing tools need from configuration.
#[derive(Debug, Clone)]
pub struct ToolSettings {
    pub search_api_key: Option<String>,
    pub search_base_url: String,
    pub user_agent: String,
    pub fetch_timeout: Duration,
    pub allowed_domains: DomainAllowList,
}

/// The fixed set of tools offered to the model.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the four listing tools: search, fetch, extract, normalize.
    pub fn listing_tools(settings: &ToolSettings) -> Self {
        let fetcher = Arc::new(PageFetcher::new(&settings.user_agent, settings.fetch_timeout));

        Self::new()
            .with(SearchListingsTool::new(
                settings.search_api_key.clone(),
                settings.search_base_url.clone(),
                settings.allowed_domains.clone(),
            ))
            .with(FetchPageTool::new(Arc::clone(&fetcher)))
            .with(ExtractListingTool::new(fetcher))
            .with(NormalizeListingsTool)
    }

    pub fn with(mut self, tool: impl Tool + 'static) -> Self {
        self.tools.push(Arc::new(tool));
        self
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn definitions(&self) -> Vec<Value> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    /// Run the named tool. Unknown names and tool failures come back as
    /// `{"error": ...}` values.
    pub async fn execute(&self, name: &str, args: Value) -> Value {
        let Some(tool) = self.tools.iter().find(|t| t.name() == name) else {
            tracing::warn!(tool = name, "model requested an unknown tool");
            return json!({ "error": format!("Unknown tool {}", name) });
        };

        match tool.call(args).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(tool = name, error = %e, "tool call failed");
                json!({ "error": e.to_string() })
            }
        }
    }
}

/// Read a required, non-blank string argument.
pub(crate) fn required_str<'a>(args: &'a Value, key: &'static str) -> Result<&'a str, ToolError> {
    args.get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(ToolError::MissingArgument(key))
}

/// Read an optional, non-blank string argument.
pub(crate) fn optional_str<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args.get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
