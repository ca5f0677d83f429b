// ABOUTME: Defines the ChatModel trait that every language-model adapter implements.
// ABOUTME: Also defines the request/response shapes the agent loop relies on and AgentError.

use async_trait::async_trait;
use serde_json::Value;

use crate::conversation::{Message, ToolCall};

/// Why the model stopped generating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    Length,
    ToolCalls,
    ContentFilter,
    Other(String),
}

impl FinishReason {
    pub fn parse(reason: &str) -> Self {
        match reason {
            "stop" => FinishReason::Stop,
            "length" => FinishReason::Length,
            "tool_calls" | "function_call" => FinishReason::ToolCalls,
            "content_filter" => FinishReason::ContentFilter,
            other => FinishReason::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            FinishReason::Stop => "stop",
            FinishReason::Length => "length",
            FinishReason::ToolCalls => "tool_calls",
            FinishReason::ContentFilter => "content_filter",
            FinishReason::Other(reason) => reason,
        }
    }
}

/// One chat turn's input: the full conversation, the tool schemas, and the sampling temperature.
#[derive(Debug, Clone, Copy)]
pub struct ChatRequest<'a> {
    pub messages: &'a [Message],
    /// Provider-agnostic tool definitions (`name`, `description`, `parameters`).
    pub tools: &'a [Value],
    pub temperature: f32,
}

/// The first choice of a chat completion, reduced to what the loop needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatResponse {
    pub finish_reason: FinishReason,
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
}

impl ChatResponse {
    /// A final answer with `finish_reason: stop`.
    pub fn stop(content: impl Into<String>) -> Self {
        Self {
            finish_reason: FinishReason::Stop,
            content: Some(content.into()),
            tool_calls: Vec::new(),
        }
    }

    /// A turn that requests tool invocations.
    pub fn with_tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            finish_reason: FinishReason::ToolCalls,
            content: None,
            tool_calls,
        }
    }

    /// A response with no content and the given finish reason.
    pub fn finished(finish_reason: FinishReason) -> Self {
        Self {
            finish_reason,
            content: None,
            tool_calls: Vec::new(),
        }
    }
}

/// Errors that can occur while talking to a chat model.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Missing credential: {0} is not set")]
    MissingCredential(&'static str),
}

/// Trait that all chat model adapters implement. The agent loop only depends
/// on this contract, never on a particular vendor.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Run one chat completion over the given conversation.
    async fn complete(&self, request: ChatRequest<'_>) -> Result<ChatResponse, AgentError>;

    /// Provider name for logging (e.g. "openai").
    fn provider_name(&self) -> &str;

    /// Model identifier being used.
    fn model_name(&self) -> &str;
}
