//! Mock implementations for testing.
//!
//! This module provides a scripted LLM client and scripted tools that can be
//! used across different test files without duplication.

#![allow(dead_code)]

use async_trait::async_trait;
use mosaic::llm::{ConversationMessage, LLMClient, LLMResponse, MessageRole};
use mosaic::research::ResearchOrchestrator;
use mosaic::tools::{StaticConnector, Tool, ToolCatalog};
use mosaic::types::{AppError, Result, ToolCall, ToolDefinition};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

/// Agent key used for the supervisor's decisions.
pub const SUPERVISOR: &str = "supervisor";

const SECTION_MARKER: &str = "The section you must write is: '";

/// Which agent a decision request comes from: `supervisor`, or the section
/// name a worker was assigned.
pub fn agent_of(messages: &[ConversationMessage]) -> String {
    let system = messages
        .first()
        .filter(|m| m.role == MessageRole::System)
        .map(|m| m.content.as_str())
        .unwrap_or("");

    if system.contains("research supervisor") {
        return SUPERVISOR.to_string();
    }
    match system.find(SECTION_MARKER) {
        Some(start) => {
            let rest = &system[start + SECTION_MARKER.len()..];
            rest[..rest.find('\'').unwrap_or(rest.len())].to_string()
        }
        None => String::new(),
    }
}

/// One decision request as the model saw it.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub agent: String,
    pub messages: Vec<ConversationMessage>,
    pub tools: Vec<String>,
}

/// LLM client replaying a script per agent.
///
/// Once an agent's script runs out, the supervisor answers with plain text
/// (ending its loop) and workers write a section named after their
/// assignment.
#[derive(Default)]
pub struct ScriptedLLM {
    scripts: Mutex<HashMap<String, VecDeque<Result<LLMResponse>>>>,
    calls: Mutex<Vec<RecordedCall>>,
    delays: HashMap<String, Duration>,
}

impl ScriptedLLM {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue decisions for `agent`.
    pub fn script(self, agent: &str, responses: Vec<LLMResponse>) -> Self {
        self.scripts
            .lock()
            .entry(agent.to_string())
            .or_default()
            .extend(responses.into_iter().map(Ok));
        self
    }

    /// Queue a failing decision for `agent`.
    pub fn fail(self, agent: &str, message: &str) -> Self {
        self.scripts
            .lock()
            .entry(agent.to_string())
            .or_default()
            .push_back(Err(AppError::LLM(message.to_string())));
        self
    }

    /// Make every decision of `agent` take `delay`.
    pub fn delay(mut self, agent: &str, delay: Duration) -> Self {
        self.delays.insert(agent.to_string(), delay);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn calls_for(&self, agent: &str) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.agent == agent)
            .cloned()
            .collect()
    }

    /// Agents in the order their first decision was requested.
    pub fn agent_order(&self) -> Vec<String> {
        let mut order: Vec<String> = Vec::new();
        for call in self.calls.lock().iter() {
            if !order.contains(&call.agent) {
                order.push(call.agent.clone());
            }
        }
        order
    }

    fn next(&self, agent: &str) -> Result<LLMResponse> {
        let scripted = self
            .scripts
            .lock()
            .get_mut(agent)
            .and_then(|queue| queue.pop_front());
        match scripted {
            Some(response) => response,
            None if agent == SUPERVISOR => Ok(LLMResponse::text("Nothing left to do.")),
            None => Ok(LLMResponse::with_tool_calls(
                "",
                vec![section_call(agent, &format!("{} findings", agent))],
            )),
        }
    }
}

#[async_trait]
impl LLMClient for ScriptedLLM {
    async fn generate_with_tools_and_history(
        &self,
        messages: &[ConversationMessage],
        tools: &[ToolDefinition],
    ) -> Result<LLMResponse> {
        let agent = agent_of(messages);
        self.calls.lock().push(RecordedCall {
            agent: agent.clone(),
            messages: messages.to_vec(),
            tools: tools.iter().map(|t| t.name.clone()).collect(),
        });

        if let Some(delay) = self.delays.get(&agent) {
            tokio::time::sleep(*delay).await;
        }
        self.next(&agent)
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// Backend tool returning a fixed result, or failing with a fixed message.
pub struct ScriptedTool {
    name: String,
    result: std::result::Result<Value, String>,
    received: Mutex<Vec<Value>>,
}

impl ScriptedTool {
    pub fn returning(name: &str, result: Value) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            result: Ok(result),
            received: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(name: &str, message: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            result: Err(message.to_string()),
            received: Mutex::new(Vec::new()),
        })
    }

    /// Arguments of every invocation so far.
    pub fn received(&self) -> Vec<Value> {
        self.received.lock().clone()
    }
}

#[async_trait]
impl Tool for ScriptedTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Scripted backend tool"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {"query": {"type": "string"}},
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        self.received.lock().push(args);
        self.result.clone().map_err(AppError::Tool)
    }
}

/// Orchestrator over the scripted client for both roles and a static tool set.
pub fn orchestrator(llm: Arc<ScriptedLLM>, tools: &[Arc<ScriptedTool>]) -> ResearchOrchestrator {
    let tools: Vec<Arc<dyn Tool>> = tools
        .iter()
        .map(|tool| Arc::clone(tool) as Arc<dyn Tool>)
        .collect();
    let catalog = Arc::new(ToolCatalog::new(Arc::new(StaticConnector::new(tools))));
    ResearchOrchestrator::new(llm.clone(), llm, catalog)
}

// ============= Decision Builders =============

pub fn call(name: &str, arguments: Value) -> ToolCall {
    ToolCall::new(name, arguments)
}

pub fn decide(calls: Vec<ToolCall>) -> LLMResponse {
    LLMResponse::with_tool_calls("", calls)
}

pub fn sections_call(names: &[&str]) -> ToolCall {
    call("Sections", json!({ "sections": names }))
}

pub fn section_call(name: &str, content: &str) -> ToolCall {
    call(
        "Section",
        json!({ "name": name, "description": format!("{} scope", name), "content": content }),
    )
}

pub fn introduction_call(title: &str, content: &str) -> ToolCall {
    call("Introduction", json!({ "name": title, "content": content }))
}

pub fn conclusion_call(title: &str, content: &str) -> ToolCall {
    call("Conclusion", json!({ "name": title, "content": content }))
}

pub fn finish_report() -> ToolCall {
    call("FinishReport", json!({}))
}

pub fn finish_research() -> ToolCall {
    call("FinishResearch", json!({}))
}
