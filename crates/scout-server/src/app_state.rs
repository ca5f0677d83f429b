// ABOUTME: Shared application state for the listing-scout HTTP server.
// ABOUTME: Holds configuration plus the injected chat model, guardrail, and tool registry.

use std::sync::Arc;

use scout_agent::{
    ChatModel, Guardrail, GuardrailChain, ModerationGuardrail, OpenAiChatModel, PiiGuardrail,
    ToolRegistry,
};

use crate::config::ScoutConfig;

/// Shared application state accessible by all Axum handlers.
/// Nothing in it is mutated after startup; every request owns its own conversation.
pub struct AppState {
    pub config: ScoutConfig,
    pub model: Arc<dyn ChatModel>,
    pub guardrail: Arc<dyn Guardrail>,
    pub tools: Arc<ToolRegistry>,
}

/// Type alias for the Arc-wrapped state used with Axum's State extractor.
pub type SharedState = Arc<AppState>;

impl AppState {
    /// Assemble state from explicit parts. Tests use this to inject doubles.
    pub fn new(
        config: ScoutConfig,
        model: Arc<dyn ChatModel>,
        guardrail: Arc<dyn Guardrail>,
        tools: Arc<ToolRegistry>,
    ) -> Self {
        Self {
            config,
            model,
            guardrail,
            tools,
        }
    }

    /// Production wiring: the OpenAI-compatible model, the listing tools, and
    /// a guardrail chain of local PII detection plus optional remote moderation.
    pub fn from_config(config: ScoutConfig) -> Self {
        let model = OpenAiChatModel::new(
            config.openai_api_key.clone(),
            config.openai_base_url.clone(),
            config.model.clone(),
        );
        if !model.has_api_key() {
            tracing::warn!("OPENAI_API_KEY is not set; workflow runs will return warnings only");
        }

        let mut guardrail = GuardrailChain::new().with(PiiGuardrail::default());
        if config.moderation {
            guardrail = guardrail.with(ModerationGuardrail::new(
                config.openai_api_key.clone(),
                config.openai_base_url.clone(),
            ));
        }
        tracing::info!(checks = guardrail.len(), "guardrail chain configured");

        let tools = ToolRegistry::listing_tools(&config.tool_settings());
        tracing::info!(tools = ?tools.names(), "listing tools registered");

        Self::new(config, Arc::new(model), Arc::new(guardrail), Arc::new(tools))
    }

    pub fn has_model_credential(&self) -> bool {
        self.config.openai_api_key.is_some()
    }

    pub fn has_search_credential(&self) -> bool {
        self.config.search_api_key.is_some()
    }
}
