//! LLM Client abstractions
//!
//! The orchestrator treats the language model as an opaque decision function:
//! an ordered message history plus a set of tool specifications goes in, one
//! assistant message (optionally carrying tool calls) comes out.
//!
//! - **Ollama**: chat API with tool calling (the only bundled provider)
//!
//! Embedders can plug in any other backend by implementing [`LLMClient`].

use crate::llm::coordinator::ConversationMessage;
use crate::types::{Result, ToolCall, ToolDefinition};
use async_trait::async_trait;
use std::time::Duration;

/// Generic LLM client trait for provider abstraction
///
/// Tool selection is always automatic: the model may request zero or more of
/// the offered tools, or answer with free text.
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Ask the model for its next decision given the full conversation so far.
    async fn generate_with_tools_and_history(
        &self,
        messages: &[ConversationMessage],
        tools: &[ToolDefinition],
    ) -> Result<LLMResponse>;

    /// Get the model name/identifier
    fn model_name(&self) -> &str;
}

/// Response from an LLM generation request
#[derive(Debug, Clone, Default)]
pub struct LLMResponse {
    /// The text content of the response
    pub content: String,
    /// Any tool calls requested by the model
    pub tool_calls: Vec<ToolCall>,
    /// The reason generation stopped (e.g., "stop", "tool_calls", "length")
    pub finish_reason: String,
}

impl LLMResponse {
    /// A plain text answer with no tool calls.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tool_calls: Vec::new(),
            finish_reason: "stop".to_string(),
        }
    }

    /// An answer requesting the given tool calls.
    pub fn with_tool_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            content: content.into(),
            tool_calls,
            finish_reason: "tool_calls".to_string(),
        }
    }
}

/// Provider enum for runtime selection
#[derive(Debug, Clone)]
pub enum Provider {
    /// Ollama local LLM provider
    ///
    /// # Example
    /// ```rust,ignore
    /// let provider = Provider::Ollama {
    ///     base_url: "http://localhost:11434".to_string(),
    ///     model: "qwen3:30b-a3b".to_string(),
    ///     temperature: 0.1,
    ///     timeout: Duration::from_secs(300),
    /// };
    /// ```
    Ollama {
        base_url: String,
        model: String,
        temperature: f32,
        timeout: Duration,
    },
}

impl Provider {
    /// Create a client instance for this provider
    pub fn create_client(&self) -> Result<Box<dyn LLMClient>> {
        match self {
            Provider::Ollama {
                base_url,
                model,
                temperature,
                timeout,
            } => Ok(Box::new(super::ollama::OllamaClient::new(
                base_url.clone(),
                model.clone(),
                *temperature,
                *timeout,
            )?)),
        }
    }

    /// Get a human-readable name for this provider
    pub fn name(&self) -> &'static str {
        match self {
            Provider::Ollama { .. } => "Ollama",
        }
    }
}
