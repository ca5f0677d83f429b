// ABOUTME: Agent system for listing-scout: a bounded tool-calling loop over a chat model.
// ABOUTME: Also hosts the listing tools, the OpenAI-compatible adapter, guardrails, and test doubles.

pub mod agent_loop;
pub mod conversation;
pub mod guardrail;
pub mod providers;
pub mod runtime;
pub mod testing;
pub mod tools;

pub use agent_loop::{AgentLoop, AgentOutcome, AgentStatus, MAX_TURNS, Source};
pub use conversation::{Conversation, Message, ToolCall};
pub use guardrail::{
    Guardrail, GuardrailChain, GuardrailError, GuardrailInfo, GuardrailOutcome, GuardrailReport,
    ModerationGuardrail, NoopGuardrail, PiiGuardrail, any_tripped,
};
pub use providers::openai::OpenAiChatModel;
pub use runtime::{AgentError, ChatModel, ChatRequest, ChatResponse, FinishReason};
pub use tools::{Tool, ToolError, ToolRegistry, ToolSettings};
