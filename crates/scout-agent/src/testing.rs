// ABOUTME: Test doubles for scout-agent: a scripted chat model, a fixed guardrail, and an echo tool.
// ABOUTME: Used in unit and end-to-end tests to drive the agent loop without network access.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::conversation::Message;
use crate::guardrail::{Guardrail, GuardrailInfo, GuardrailOutcome, MODERATION_NAME};
use crate::runtime::{AgentError, ChatModel, ChatRequest, ChatResponse};
use crate::tools::{Tool, ToolError};

/// A chat model that replays a fixed script of responses.
///
/// Once the script is exhausted it keeps returning the `repeat` response if
/// one was given, otherwise a provider error. Every request's messages are
/// recorded so tests can inspect what the loop sent.
pub struct ScriptedChatModel {
    script: Mutex<VecDeque<Result<ChatResponse, AgentError>>>,
    repeat: Option<ChatResponse>,
    calls: AtomicUsize,
    requests: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedChatModel {
    pub fn new(script: Vec<Result<ChatResponse, AgentError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            repeat: None,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A model that answers every turn with a final `stop` message.
    pub fn answering(text: &str) -> Self {
        Self::new(vec![Ok(ChatResponse::stop(text))])
    }

    /// A model that returns `response` on every turn, forever.
    pub fn repeating(response: ChatResponse) -> Self {
        Self {
            repeat: Some(response),
            ..Self::new(Vec::new())
        }
    }

    /// Number of completed `complete` calls.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The conversation sent on each call, in call order.
    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ChatModel for ScriptedChatModel {
    async fn complete(&self, request: ChatRequest<'_>) -> Result<ChatResponse, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.messages.to_vec());
        }

        let next = self.script.lock().ok().and_then(|mut s| s.pop_front());
        match (next, &self.repeat) {
            (Some(response), _) => response,
            (None, Some(repeat)) => Ok(repeat.clone()),
            (None, None) => Err(AgentError::ProviderError("script exhausted".to_string())),
        }
    }

    fn provider_name(&self) -> &str {
        "scripted"
    }

    fn model_name(&self) -> &str {
        "scripted-model"
    }
}

/// A guardrail that always reports the same outcomes.
#[derive(Debug, Clone, Default)]
pub struct StaticGuardrail {
    outcomes: Vec<GuardrailOutcome>,
    calls: std::sync::Arc<AtomicUsize>,
}

impl StaticGuardrail {
    pub fn new(outcomes: Vec<GuardrailOutcome>) -> Self {
        Self {
            outcomes,
            calls: Default::default(),
        }
    }

    /// A moderation check that trips with the given categories.
    pub fn tripped_moderation(categories: &[&str]) -> Self {
        Self::new(vec![GuardrailOutcome::tripped(GuardrailInfo {
            flagged_categories: categories.iter().map(|c| c.to_string()).collect(),
            ..GuardrailInfo::named(MODERATION_NAME)
        })])
    }

    /// A moderation check that passes.
    pub fn clean() -> Self {
        Self::new(vec![GuardrailOutcome::passed(GuardrailInfo::named(MODERATION_NAME))])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Guardrail for StaticGuardrail {
    async fn check(&self, _input: &str) -> Vec<GuardrailOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcomes.clone()
    }
}

/// A tool named `echo` that returns its arguments as `{"echo": args}`.
pub struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }

    fn definition(&self) -> Value {
        json!({
            "name": "echo",
            "description": "Return the arguments unchanged.",
            "parameters": { "type": "object", "properties": {}, "required": [] }
        })
    }

    async fn call(&self, args: Value) -> Result<Value, ToolError> {
        Ok(json!({ "echo": args }))
    }
}
