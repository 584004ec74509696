use crate::llm::client::{LLMClient, LLMResponse};
use crate::llm::coordinator::{ConversationMessage, MessageRole};
use crate::types::{AppError, Result, ToolCall, ToolDefinition};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

/// Decision function backed by the Ollama chat API.
///
/// Requests are sent non-streaming to `{base_url}/api/chat` with the tool
/// specifications attached, so the model may answer with tool calls.
pub struct OllamaClient {
    http_client: reqwest::Client,
    base_url: String,
    model: String,
    temperature: f32,
}

impl OllamaClient {
    pub fn new(base_url: String, model: String, temperature: f32, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::LLM(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            temperature,
        })
    }

    /// Build the JSON request body for `/api/chat`.
    pub fn build_request(&self, messages: &[ConversationMessage], tools: &[ToolDefinition]) -> Value {
        let messages: Vec<Value> = messages.iter().map(Self::message_to_json).collect();

        let tools: Vec<Value> = tools
            .iter()
            .map(|t| {
                json!({
                    "type": "function",
                    "function": {
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.parameters
                    }
                })
            })
            .collect();

        json!({
            "model": self.model,
            "messages": messages,
            "tools": tools,
            "stream": false,
            "options": {
                "temperature": self.temperature
            }
        })
    }

    fn message_to_json(msg: &ConversationMessage) -> Value {
        match msg.role {
            MessageRole::System => json!({"role": "system", "content": msg.content}),
            MessageRole::User => json!({"role": "user", "content": msg.content}),
            MessageRole::Assistant if msg.tool_calls.is_empty() => {
                json!({"role": "assistant", "content": msg.content})
            }
            MessageRole::Assistant => {
                let tool_calls: Vec<Value> = msg
                    .tool_calls
                    .iter()
                    .map(|tc| {
                        json!({
                            "function": {
                                "name": tc.name,
                                "arguments": tc.arguments
                            }
                        })
                    })
                    .collect();

                json!({
                    "role": "assistant",
                    "content": msg.content,
                    "tool_calls": tool_calls
                })
            }
            MessageRole::Tool => {
                let mut value = json!({"role": "tool", "content": msg.content});
                if let Some(name) = &msg.name {
                    value["tool_name"] = json!(name);
                }
                value
            }
        }
    }

    /// Parse an `/api/chat` response body into an [`LLMResponse`].
    pub fn parse_response(json: &Value) -> Result<LLMResponse> {
        let message = json
            .get("message")
            .ok_or_else(|| AppError::LLM("No message in Ollama response".into()))?;

        let content = message
            .get("content")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();

        let mut tool_calls = Vec::new();
        let mut finish_reason = "stop".to_string();

        if let Some(tc_array) = message.get("tool_calls").and_then(|v| v.as_array()) {
            for tc in tc_array {
                let Some(func) = tc.get("function") else {
                    continue;
                };
                let name = func
                    .get("name")
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string();
                if name.is_empty() {
                    continue;
                }

                // Some models return the arguments as a JSON-encoded string.
                let arguments = match func.get("arguments") {
                    Some(Value::String(raw)) => {
                        serde_json::from_str(raw).unwrap_or_else(|_| json!({}))
                    }
                    Some(other) => other.clone(),
                    None => json!({}),
                };

                let id = tc
                    .get("id")
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

                tool_calls.push(ToolCall {
                    id,
                    name,
                    arguments,
                });
            }
            if !tool_calls.is_empty() {
                finish_reason = "tool_calls".to_string();
            }
        }

        if tool_calls.is_empty() {
            if let Some(reason) = json.get("done_reason").and_then(|v| v.as_str()) {
                finish_reason = reason.to_string();
            }
        }

        Ok(LLMResponse {
            content,
            tool_calls,
            finish_reason,
        })
    }
}

#[async_trait]
impl LLMClient for OllamaClient {
    async fn generate_with_tools_and_history(
        &self,
        messages: &[ConversationMessage],
        tools: &[ToolDefinition],
    ) -> Result<LLMResponse> {
        let url = format!("{}/api/chat", self.base_url);
        let body = self.build_request(messages, tools);

        let response = self
            .http_client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::LLM(format!("Ollama request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::LLM(format!(
                "Ollama request failed ({}): {}",
                status, text
            )));
        }

        let response_json: Value = response
            .json()
            .await
            .map_err(|e| AppError::LLM(format!("Failed to parse Ollama response: {}", e)))?;

        Self::parse_response(&response_json)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> OllamaClient {
        OllamaClient::new(
            "http://localhost:11434/".to_string(),
            "qwen3:30b-a3b".to_string(),
            0.1,
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        assert_eq!(client().base_url, "http://localhost:11434");
    }

    #[test]
    fn test_build_request_includes_tools_and_temperature() {
        let tools = vec![ToolDefinition {
            name: "search_jira_issues".to_string(),
            description: "Search issues".to_string(),
            parameters: json!({"type": "object", "properties": {"query": {"type": "string"}}}),
        }];
        let messages = vec![
            ConversationMessage::system("You are a researcher."),
            ConversationMessage::user("Research VIT-60872"),
        ];

        let body = client().build_request(&messages, &tools);
        assert_eq!(body["model"], "qwen3:30b-a3b");
        assert_eq!(body["stream"], false);
        assert_eq!(body["tools"][0]["type"], "function");
        assert_eq!(body["tools"][0]["function"]["name"], "search_jira_issues");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "Research VIT-60872");
        assert!((body["options"]["temperature"].as_f64().unwrap() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_tool_messages_carry_tool_name() {
        let msg = ConversationMessage::tool_result("call_1", "search", &json!({"hits": 0}));
        let value = OllamaClient::message_to_json(&msg);
        assert_eq!(value["role"], "tool");
        assert_eq!(value["tool_name"], "search");
    }

    #[test]
    fn test_assistant_tool_calls_serialized() {
        let call = ToolCall::new("Sections", json!({"sections": ["A"]}));
        let msg = ConversationMessage::assistant("", vec![call]);
        let value = OllamaClient::message_to_json(&msg);
        assert_eq!(value["tool_calls"][0]["function"]["name"], "Sections");
        assert_eq!(value["tool_calls"][0]["function"]["arguments"]["sections"][0], "A");
    }

    #[test]
    fn test_parse_response_with_string_arguments() {
        let body = json!({
            "message": {
                "role": "assistant",
                "content": "",
                "tool_calls": [
                    {"function": {"name": "search", "arguments": "{\"query\": \"MTV2005\"}"}}
                ]
            },
            "done": true
        });
        let response = OllamaClient::parse_response(&body).unwrap();
        assert_eq!(response.tool_calls.len(), 1);
        assert_eq!(response.tool_calls[0].arguments["query"], "MTV2005");
        assert!(!response.tool_calls[0].id.is_empty());
        assert_eq!(response.finish_reason, "tool_calls");
    }

    #[test]
    fn test_parse_response_without_message_is_error() {
        let result = OllamaClient::parse_response(&json!({"done": true}));
        assert!(matches!(result, Err(AppError::LLM(_))));
    }

    #[test]
    fn test_parse_response_done_reason() {
        let body = json!({
            "message": {"role": "assistant", "content": "truncated"},
            "done": true,
            "done_reason": "length"
        });
        let response = OllamaClient::parse_response(&body).unwrap();
        assert_eq!(response.finish_reason, "length");
        assert!(response.tool_calls.is_empty());
    }
}
