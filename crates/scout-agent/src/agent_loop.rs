// ABOUTME: The bounded tool-calling agent loop: model turn, tool execution, repeat until an answer or the budget.
// ABOUTME: Every exit path resolves to an AgentOutcome; the loop never returns an error to its caller.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value, json};

use scout_core::{ListingCriteria, NormalizedListing, normalize_listings};

use crate::conversation::{Conversation, Message, ToolCall};
use crate::providers::system_prompt;
use crate::runtime::{ChatModel, ChatRequest, FinishReason};
use crate::tools::ToolRegistry;

/// Maximum number of model calls per run.
pub const MAX_TURNS: usize = 6;

/// Sampling temperature for every model call.
pub const TEMPERATURE: f32 = 0.2;

pub const CONTENT_FILTER_WARNING: &str = "The model response was blocked by the content filter.";

/// A page the model cited for its answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Source {
    pub title: Option<String>,
    pub url: String,
    pub details: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Completed,
    Failed,
}

/// What a run produced. On failure the listings, sources, and notes are
/// empty and `raw_text` is `None`; `warnings` explains what happened.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentOutcome {
    pub status: AgentStatus,
    pub listings: Vec<NormalizedListing>,
    pub sources: Vec<Source>,
    pub notes_en: String,
    pub notes_fr: String,
    pub warnings: Vec<String>,
    pub raw_text: Option<String>,
    /// Model calls made.
    pub turns: usize,
}

impl AgentOutcome {
    fn failed(warnings: Vec<String>, turns: usize) -> Self {
        Self {
            status: AgentStatus::Failed,
            listings: Vec::new(),
            sources: Vec::new(),
            notes_en: String::new(),
            notes_fr: String::new(),
            warnings,
            raw_text: None,
            turns,
        }
    }

    /// Parse the model's final text. Unparseable text is treated as `{}`,
    /// which yields empty listings and sources rather than an error.
    fn completed(raw_text: String, warnings: Vec<String>, turns: usize) -> Self {
        let parsed = parse_final_answer(&raw_text);

        let raw_listings = parsed
            .get("listings")
            .and_then(|l| l.as_array())
            .map(Vec::as_slice)
            .unwrap_or_default();

        Self {
            status: AgentStatus::Completed,
            listings: normalize_listings(raw_listings),
            sources: parse_sources(&parsed),
            notes_en: string_field(&parsed, "notes_en"),
            notes_fr: string_field(&parsed, "notes_fr"),
            warnings,
            raw_text: Some(raw_text),
            turns,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == AgentStatus::Completed
    }
}

/// Strip a surrounding Markdown code fence, if any, and parse as a JSON object.
fn parse_final_answer(text: &str) -> Map<String, Value> {
    let trimmed = text.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed);

    match serde_json::from_str::<Value>(unfenced.trim()) {
        Ok(Value::Object(map)) => map,
        Ok(_) | Err(_) => {
            tracing::debug!("final answer is not a JSON object, treating as empty");
            Map::new()
        }
    }
}

fn string_field(parsed: &Map<String, Value>, key: &str) -> String {
    parsed
        .get(key)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}

/// Sources with a string `url`; everything else is dropped.
fn parse_sources(parsed: &Map<String, Value>) -> Vec<Source> {
    let text = |item: &Value, key: &str| item.get(key).and_then(|v| v.as_str()).map(String::from);

    parsed
        .get("sources")
        .and_then(|s| s.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    Some(Source {
                        url: item.get("url")?.as_str()?.to_string(),
                        title: text(item, "title"),
                        details: text(item, "details"),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Drives one bounded conversation between a chat model and the tool registry.
pub struct AgentLoop {
    model: Arc<dyn ChatModel>,
    tools: Arc<ToolRegistry>,
    max_turns: usize,
}

impl AgentLoop {
    pub fn new(model: Arc<dyn ChatModel>, tools: Arc<ToolRegistry>) -> Self {
        Self {
            model,
            tools,
            max_turns: MAX_TURNS,
        }
    }

    /// Search for listings matching `criteria` on behalf of `input`.
    pub async fn run(&self, criteria: &ListingCriteria, input: &str) -> AgentOutcome {
        let mut conversation = Conversation::seeded(system_prompt(criteria), input);
        let tool_definitions = self.tools.definitions();
        let mut warnings = Vec::new();

        for turn in 1..=self.max_turns {
            tracing::debug!(
                turn,
                messages = conversation.len(),
                model = self.model.model_name(),
                "calling model"
            );

            let request = ChatRequest {
                messages: conversation.messages(),
                tools: &tool_definitions,
                temperature: TEMPERATURE,
            };

            let response = match self.model.complete(request).await {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!(turn, error = %e, "model call failed");
                    warnings.push(format!("Model call failed: {}", e));
                    return AgentOutcome::failed(warnings, turn);
                }
            };

            if !response.tool_calls.is_empty() {
                tracing::info!(turn, count = response.tool_calls.len(), "model requested tools");
                conversation.push(Message::Assistant {
                    content: response.content,
                    tool_calls: response.tool_calls.clone(),
                });

                let results = self.execute_tools(&response.tool_calls).await;
                for (call, result) in response.tool_calls.iter().zip(results) {
                    conversation.push(Message::Tool {
                        tool_call_id: call.id.clone(),
                        content: result.to_string(),
                    });
                }
                continue;
            }

            match response.finish_reason {
                FinishReason::Stop | FinishReason::Length => {
                    tracing::info!(turn, "model produced a final answer");
                    return AgentOutcome::completed(
                        response.content.unwrap_or_default(),
                        warnings,
                        turn,
                    );
                }
                FinishReason::ContentFilter => {
                    tracing::warn!(turn, "model response blocked by content filter");
                    warnings.push(CONTENT_FILTER_WARNING.to_string());
                    return AgentOutcome::failed(warnings, turn);
                }
                other => {
                    tracing::warn!(turn, finish_reason = other.as_str(), "unexpected finish reason");
                    warnings.push(format!("Unexpected finish reason: {}", other.as_str()));
                    return AgentOutcome::failed(warnings, turn);
                }
            }
        }

        tracing::warn!(max_turns = self.max_turns, "agent step budget exhausted");
        warnings.push(format!(
            "Stopped after {} model turns without a final answer.",
            self.max_turns
        ));
        AgentOutcome::failed(warnings, self.max_turns)
    }

    /// Run one turn's tool calls concurrently; results come back in call order.
    async fn execute_tools(&self, calls: &[ToolCall]) -> Vec<Value> {
        futures::future::join_all(calls.iter().map(|call| {
            let args = parse_arguments(&call.arguments);
            tracing::debug!(tool = %call.name, call_id = %call.id, "executing tool");
            self.tools.execute(&call.name, args)
        }))
        .await
    }
}

/// Parse a tool argument payload, substituting `{}` for anything that is not a JSON object.
fn parse_arguments(raw: &str) -> Value {
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ Value::Object(_)) => value,
        _ => json!({}),
    }
}
