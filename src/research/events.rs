//! Per-turn progress events for streaming runs.

use crate::llm::client::LLMResponse;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

const MAX_EVENT_TEXT: usize = 200;

/// A tool call as shown in progress output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallSummary {
    pub name: String,
    /// The `query` argument, when the call has one
    pub query: Option<String>,
}

/// One agent decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentEvent {
    /// `supervisor` or `researcher:<section>`
    pub node: String,
    pub tool_calls: Vec<ToolCallSummary>,
    /// Decision text, truncated
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl AgentEvent {
    pub fn from_response(node: &str, response: &LLMResponse) -> Self {
        Self {
            node: node.to_string(),
            tool_calls: response
                .tool_calls
                .iter()
                .map(|call| ToolCallSummary {
                    name: call.name.clone(),
                    query: call
                        .arguments
                        .get("query")
                        .and_then(|q| q.as_str())
                        .map(str::to_string),
                })
                .collect(),
            text: truncate(&response.content, MAX_EVENT_TEXT),
            timestamp: Utc::now(),
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

pub type EventCallback = Arc<dyn Fn(&AgentEvent) + Send + Sync>;

/// Where agent events go. Disabled sinks drop everything.
#[derive(Clone, Default)]
pub struct EventSink {
    enabled: bool,
    callback: Option<EventCallback>,
}

impl EventSink {
    pub fn new(enabled: bool, callback: Option<EventCallback>) -> Self {
        Self { enabled, callback }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn emit(&self, node: &str, response: &LLMResponse) {
        if !self.enabled {
            return;
        }
        let event = AgentEvent::from_response(node, response);
        match &self.callback {
            Some(callback) => callback(&event),
            None => {
                let tools: Vec<&str> = event.tool_calls.iter().map(|t| t.name.as_str()).collect();
                info!(node = %event.node, tools = ?tools, text = %event.text, "Agent step");
            }
        }
    }
}

impl std::fmt::Debug for EventSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSink")
            .field("enabled", &self.enabled)
            .field("callback", &self.callback.is_some())
            .finish()
    }
}
