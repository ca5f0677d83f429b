// ABOUTME: OpenAI-compatible Chat Completions adapter implementing the ChatModel trait.
// ABOUTME: Builds request bodies with function tools and parses the first choice into a ChatResponse.

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::conversation::ToolCall;
use crate::runtime::{AgentError, ChatModel, ChatRequest, ChatResponse, FinishReason};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Calls `{base_url}/v1/chat/completions`. A missing API key is reported on
/// each call rather than at construction so the service can still start.
pub struct OpenAiChatModel {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

/// Normalize an OpenAI-compatible base URL to the API root, without a trailing
/// `/` or `/v1`. Request paths are appended as `/v1/...`.
pub fn api_root(base_url: &str) -> String {
    let trimmed = base_url.trim().trim_end_matches('/');
    trimmed
        .strip_suffix("/v1")
        .unwrap_or(trimmed)
        .to_string()
}

impl OpenAiChatModel {
    /// `base_url` may be given with or without a trailing `/v1`.
    pub fn new(api_key: Option<String>, base_url: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: api_root(&base_url),
            model,
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Build the JSON request body for the Chat Completions API.
    pub fn build_request_body(&self, request: &ChatRequest<'_>) -> Value {
        let messages: Vec<Value> = request.messages.iter().map(|m| m.to_openai()).collect();

        let mut body = json!({
            "model": self.model,
            "messages": messages,
            "temperature": request.temperature,
        });

        if !request.tools.is_empty() {
            body["tools"] = Value::Array(build_openai_tools(request.tools));
            body["tool_choice"] = json!("auto");
        }

        body
    }

    /// Parse a Chat Completions response body into a ChatResponse.
    pub fn parse_response(response_body: &Value) -> Result<ChatResponse, AgentError> {
        let choice = response_body
            .get("choices")
            .and_then(|c| c.as_array())
            .ok_or_else(|| AgentError::InvalidResponse("missing choices array in response".to_string()))?
            .first()
            .ok_or_else(|| AgentError::InvalidResponse("empty choices array".to_string()))?;

        let message = choice
            .get("message")
            .ok_or_else(|| AgentError::InvalidResponse("missing message in choice".to_string()))?;

        let tool_calls = message
            .get("tool_calls")
            .and_then(|t| t.as_array())
            .map(|calls| calls.iter().filter_map(parse_tool_call).collect())
            .unwrap_or_default();

        let content = message
            .get("content")
            .and_then(|c| c.as_str())
            .map(String::from);

        let finish_reason = choice
            .get("finish_reason")
            .and_then(|f| f.as_str())
            .map(FinishReason::parse)
            .unwrap_or_else(|| FinishReason::Other("missing".to_string()));

        Ok(ChatResponse {
            finish_reason,
            content,
            tool_calls,
        })
    }
}

/// Convert provider-agnostic tool definitions to OpenAI's function format.
fn build_openai_tools(tools: &[Value]) -> Vec<Value> {
    tools
        .iter()
        .map(|tool| {
            json!({
                "type": "function",
                "function": {
                    "name": tool.get("name").cloned().unwrap_or(Value::Null),
                    "description": tool.get("description").cloned().unwrap_or(Value::Null),
                    "parameters": tool.get("parameters").cloned().unwrap_or(json!({"type": "object"}))
                }
            })
        })
        .collect()
}

/// Parse one `tool_calls` entry. Entries without a function name are dropped.
fn parse_tool_call(tool_call: &Value) -> Option<ToolCall> {
    let function = tool_call.get("function")?;
    let name = function.get("name").and_then(|n| n.as_str())?;
    let id = tool_call.get("id").and_then(|i| i.as_str()).unwrap_or_default();
    let arguments = function
        .get("arguments")
        .and_then(|a| a.as_str())
        .unwrap_or("{}");

    Some(ToolCall::new(id, name, arguments))
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    async fn complete(&self, request: ChatRequest<'_>) -> Result<ChatResponse, AgentError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(AgentError::MissingCredential("OPENAI_API_KEY"))?;

        let body = self.build_request_body(&request);
        let url = format!("{}/v1/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AgentError::ProviderError(format!("HTTP request failed: {}", e)))?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(AgentError::RateLimited);
        }

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(AgentError::ProviderError(
                "Unauthorized: check OPENAI_API_KEY".to_string(),
            ));
        }

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(AgentError::ProviderError(format!(
                "API error {}: {}",
                status, error_body
            )));
        }

        let response_body: Value = response
            .json()
            .await
            .map_err(|e| AgentError::InvalidResponse(format!("failed to parse JSON: {}", e)))?;

        Self::parse_response(&response_body)
    }

    fn provider_name(&self) -> &str {
        "openai"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
