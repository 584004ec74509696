//! Generic Tool-Call Loop
//!
//! This module provides the provider-agnostic `ToolCoordinator` shared by the
//! supervisor and every research worker. It runs an explicit state machine:
//!
//! ```text
//!   Deciding ──(tool calls, none terminal)──▶ ExecutingTools
//!      ▲                                          │
//!      └──────────────(batch complete)────────────┘
//!   Deciding ──(no tool calls | terminal call)──▶ Done
//! ```
//!
//! 1. Build the role's system prompt and ask the model for a decision
//! 2. If the decision carries no tool calls, or a terminal one, stop
//! 3. Otherwise execute every requested call against the registry snapshot
//! 4. Append one tool message per call and hand the batch to the driver
//! 5. Repeat
//!
//! Role-specific behavior (prompts, terminal tools, state updates after a
//! batch) lives behind the [`LoopDriver`] trait.
//!
//! # Example
//!
//! ```rust,ignore
//! use mosaic::llm::coordinator::{ToolCoordinator, ToolCallingConfig};
//!
//! let coordinator = ToolCoordinator::new(client, registry, ToolCallingConfig::default());
//! let mut history = vec![ConversationMessage::user("Research VIT-60872")];
//! let result = coordinator.run(&mut driver, &mut history).await?;
//! println!("Finished: {}", result.finish_reason);
//! ```

use crate::llm::client::{LLMClient, LLMResponse};
use crate::tools::registry::ToolRegistry;
use crate::types::{AppError, Result, ToolCall};
use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Configuration for tool calling coordination behavior.
#[derive(Debug, Clone)]
pub struct ToolCallingConfig {
    /// Optional cap on model decisions. `None` leaves stopping entirely to
    /// the agent's own terminal tools.
    pub max_iterations: Option<usize>,

    /// Whether to execute multiple tool calls of one decision concurrently.
    /// When false, tools are executed sequentially in request order.
    pub parallel_execution: bool,

    /// Timeout for individual tool execution.
    pub tool_timeout: Option<Duration>,
}

impl Default for ToolCallingConfig {
    fn default() -> Self {
        Self {
            max_iterations: None,
            parallel_execution: true,
            tool_timeout: Some(Duration::from_secs(30)),
        }
    }
}

/// Record of a single tool call execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRecord {
    /// Correlation id of the call (from the model).
    pub id: String,
    /// Name of the tool that was called.
    pub name: String,
    /// Arguments passed to the tool.
    pub arguments: serde_json::Value,
    /// Result returned by the tool, or the error-shaped observation.
    pub result: serde_json::Value,
    /// Whether the tool execution was successful.
    pub success: bool,
    /// Time taken to execute the tool in milliseconds.
    pub duration_ms: u64,
    /// Error message if the tool failed.
    pub error: Option<String>,
}

impl ToolCallRecord {
    fn failed(call: &ToolCall, message: String, duration_ms: u64) -> Self {
        Self {
            id: call.id.clone(),
            name: call.name.clone(),
            arguments: call.arguments.clone(),
            result: error_observation(&call.name, &message),
            success: false,
            duration_ms,
            error: Some(message),
        }
    }

    /// The observation text fed back to the model.
    pub fn observation(&self) -> String {
        stringify_result(&self.result)
    }
}

/// Error-shaped observation body for a failed tool invocation.
pub fn error_observation(tool: &str, message: &str) -> serde_json::Value {
    serde_json::json!({
        "status": "error",
        "tool": tool,
        "error": message,
    })
}

fn stringify_result(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Reason why a tool coordination session ended.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum FinishReason {
    /// Model answered without requesting any tool.
    Stop,
    /// Model requested the named terminal tool.
    TerminalTool(String),
    /// Hit the configured decision cap.
    MaxIterations,
}

impl std::fmt::Display for FinishReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FinishReason::Stop => write!(f, "stop"),
            FinishReason::TerminalTool(t) => write!(f, "terminal_tool: {}", t),
            FinishReason::MaxIterations => write!(f, "max_iterations"),
        }
    }
}

/// A message in a tool-calling conversation.
///
/// Messages are immutable once created and accumulate in an append-only
/// history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationMessage {
    /// The role of the message sender.
    pub role: MessageRole,
    /// The text content of the message.
    pub content: String,
    /// Tool calls requested by the assistant (only for Assistant role).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// Correlation id of the answered call (only for Tool role).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// Name of the tool that produced this result (only for Tool role).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Role of a message sender in a tool-calling conversation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System instructions.
    System,
    /// User message.
    User,
    /// Assistant response.
    Assistant,
    /// Tool execution result.
    Tool,
}

impl ConversationMessage {
    fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
            name: None,
        }
    }

    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Create an assistant message with optional tool calls.
    pub fn assistant(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls,
            ..Self::new(MessageRole::Assistant, content)
        }
    }

    /// Create a tool result message.
    pub fn tool_result(
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        result: &serde_json::Value,
    ) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.into()),
            name: Some(tool_name.into()),
            ..Self::new(MessageRole::Tool, stringify_result(result))
        }
    }
}

/// States of the tool-call loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Waiting on the model's next decision.
    Deciding,
    /// Running the tool calls of the last decision.
    ExecutingTools,
    /// Terminal.
    Done,
}

/// Inputs that drive [`LoopState`] transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopEvent {
    /// The model produced a decision.
    Decided {
        has_tool_calls: bool,
        terminal: bool,
    },
    /// Every call of the current batch produced an observation.
    BatchComplete,
}

impl LoopState {
    /// Transition table of the loop.
    pub fn next(self, event: LoopEvent) -> Result<LoopState> {
        match (self, event) {
            (
                LoopState::Deciding,
                LoopEvent::Decided {
                    has_tool_calls: false,
                    ..
                },
            ) => Ok(LoopState::Done),
            (LoopState::Deciding, LoopEvent::Decided { terminal: true, .. }) => {
                Ok(LoopState::Done)
            }
            (LoopState::Deciding, LoopEvent::Decided { .. }) => Ok(LoopState::ExecutingTools),
            (LoopState::ExecutingTools, LoopEvent::BatchComplete) => Ok(LoopState::Deciding),
            (state, event) => Err(AppError::Internal(format!(
                "invalid tool loop transition from {:?} on {:?}",
                state, event
            ))),
        }
    }
}

/// Role-specific hooks plugged into the generic loop.
#[async_trait]
pub trait LoopDriver: Send {
    /// Node name used in logs and streaming events.
    fn node(&self) -> String;

    /// System prompt for the next decision. Rebuilt on every turn.
    fn system_prompt(&self) -> String;

    /// Messages appended after the history for the next decision only.
    fn ephemeral_messages(&self) -> Vec<ConversationMessage> {
        Vec::new()
    }

    /// Name of the terminal tool in this decision, if the decision ends the loop.
    fn terminal_tool(&self, tool_calls: &[ToolCall]) -> Option<String>;

    /// Observe every decision before its tools run.
    fn on_decision(&mut self, _response: &LLMResponse) {}

    /// Update role state once a batch of observations is in the history.
    async fn after_tools(
        &mut self,
        records: &[ToolCallRecord],
        history: &mut Vec<ConversationMessage>,
    ) -> Result<()>;
}

/// Result of a complete tool coordination session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorResult {
    /// Text content of the final decision.
    pub content: String,

    /// Tool calls carried by the final decision (terminal calls are not executed).
    pub final_tool_calls: Vec<ToolCall>,

    /// All tool calls executed during the session.
    pub tool_calls: Vec<ToolCallRecord>,

    /// Number of model decisions performed.
    pub iterations: usize,

    /// Why the session ended.
    pub finish_reason: FinishReason,
}

/// Generic tool coordinator that works with any LLMClient.
///
/// The registry is a snapshot taken when the loop is built; tools discovered
/// later are not visible to a running loop.
pub struct ToolCoordinator {
    client: Arc<dyn LLMClient>,
    registry: Arc<ToolRegistry>,
    config: ToolCallingConfig,
}

impl ToolCoordinator {
    /// Create a new ToolCoordinator with the given client, registry, and config.
    pub fn new(
        client: Arc<dyn LLMClient>,
        registry: Arc<ToolRegistry>,
        config: ToolCallingConfig,
    ) -> Self {
        Self {
            client,
            registry,
            config,
        }
    }

    /// Create a new ToolCoordinator with default configuration.
    pub fn with_defaults(client: Arc<dyn LLMClient>, registry: Arc<ToolRegistry>) -> Self {
        Self::new(client, registry, ToolCallingConfig::default())
    }

    /// Run the loop until the driver's terminal condition or the decision cap.
    ///
    /// `history` is the agent's own append-only message history; decisions
    /// and observations are appended to it in order.
    ///
    /// A failing decision function aborts the loop with its error. Failing
    /// tools never do: they become error-shaped observations.
    pub async fn run<D>(
        &self,
        driver: &mut D,
        history: &mut Vec<ConversationMessage>,
    ) -> Result<CoordinatorResult>
    where
        D: LoopDriver + ?Sized,
    {
        let tools = self.registry.get_tool_definitions();
        let node = driver.node();
        let mut state = LoopState::Deciding;
        let mut iterations = 0usize;
        let mut executed: Vec<ToolCallRecord> = Vec::new();
        let mut last_decision = LLMResponse::default();

        loop {
            match state {
                LoopState::Deciding => {
                    if let Some(max) = self.config.max_iterations {
                        if iterations >= max {
                            warn!(node = %node, max, "Decision cap reached");
                            return Ok(CoordinatorResult {
                                content: last_decision.content,
                                final_tool_calls: Vec::new(),
                                tool_calls: executed,
                                iterations,
                                finish_reason: FinishReason::MaxIterations,
                            });
                        }
                    }

                    let mut messages = Vec::with_capacity(history.len() + 2);
                    messages.push(ConversationMessage::system(driver.system_prompt()));
                    messages.extend(history.iter().cloned());
                    messages.extend(driver.ephemeral_messages());

                    debug!(node = %node, tools = tools.len(), "Requesting decision");
                    let response = self
                        .client
                        .generate_with_tools_and_history(&messages, &tools)
                        .await?;
                    iterations += 1;

                    if response.tool_calls.is_empty() {
                        info!(node = %node, "Decision without tool calls");
                    }
                    for call in &response.tool_calls {
                        info!(node = %node, tool = %call.name, args = %call.arguments, "Decided to call tool");
                    }

                    history.push(ConversationMessage::assistant(
                        response.content.clone(),
                        response.tool_calls.clone(),
                    ));
                    driver.on_decision(&response);

                    let terminal = driver.terminal_tool(&response.tool_calls);
                    state = state.next(LoopEvent::Decided {
                        has_tool_calls: !response.tool_calls.is_empty(),
                        terminal: terminal.is_some(),
                    })?;
                    last_decision = response;

                    if state == LoopState::Done {
                        let finish_reason = match terminal {
                            Some(name) => FinishReason::TerminalTool(name),
                            None => FinishReason::Stop,
                        };
                        info!(node = %node, iterations, reason = %finish_reason, "Tool loop finished");
                        return Ok(CoordinatorResult {
                            content: last_decision.content,
                            final_tool_calls: last_decision.tool_calls,
                            tool_calls: executed,
                            iterations,
                            finish_reason,
                        });
                    }
                }
                LoopState::ExecutingTools => {
                    let records = self.execute_tool_calls(&last_decision.tool_calls).await;

                    for record in &records {
                        history.push(ConversationMessage::tool_result(
                            &record.id,
                            &record.name,
                            &record.result,
                        ));
                    }
                    driver.after_tools(&records, history).await?;
                    executed.extend(records);

                    state = state.next(LoopEvent::BatchComplete)?;
                }
                LoopState::Done => {
                    return Err(AppError::Internal(
                        "tool loop resumed after completion".to_string(),
                    ));
                }
            }
        }
    }

    /// Execute tool calls, either in parallel or sequentially based on config.
    ///
    /// Records come back in request order either way.
    async fn execute_tool_calls(&self, calls: &[ToolCall]) -> Vec<ToolCallRecord> {
        if self.config.parallel_execution {
            join_all(calls.iter().map(|call| self.execute_single_tool(call))).await
        } else {
            let mut records = Vec::with_capacity(calls.len());
            for call in calls {
                records.push(self.execute_single_tool(call).await);
            }
            records
        }
    }

    /// Execute a single tool call; failures become error-shaped records.
    async fn execute_single_tool(&self, call: &ToolCall) -> ToolCallRecord {
        let start = Instant::now();
        let invocation = self.registry.execute(&call.name, call.arguments.clone());

        let outcome = match self.config.tool_timeout {
            Some(limit) => match timeout(limit, invocation).await {
                Ok(result) => result,
                Err(_) => Err(AppError::Tool(format!(
                    "Tool execution timed out after {}s",
                    limit.as_secs()
                ))),
            },
            None => invocation.await,
        };

        let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        match outcome {
            Ok(value) => ToolCallRecord {
                id: call.id.clone(),
                name: call.name.clone(),
                arguments: call.arguments.clone(),
                result: value,
                success: true,
                duration_ms,
                error: None,
            },
            Err(e) => {
                warn!(tool = %call.name, error = %e, "Tool invocation failed");
                ToolCallRecord::failed(call, e.to_string(), duration_ms)
            }
        }
    }

    /// Get a reference to the tool registry snapshot.
    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Get a reference to the configuration.
    pub fn config(&self) -> &ToolCallingConfig {
        &self.config
    }
}
