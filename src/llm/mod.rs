//! LLM client abstraction and the tool-call loop.
//!
//! - [`LLMClient`] - the decision function every agent talks to
//! - [`ollama`] - the bundled Ollama chat client
//! - [`coordinator`] - the generic decide / execute-tools / observe loop
//!
//! # Example
//!
//! ```ignore
//! use mosaic::llm::{Provider, ToolCoordinator};
//!
//! let client = Provider::Ollama {
//!     base_url: "http://localhost:11434".to_string(),
//!     model: "qwen3:30b-a3b".to_string(),
//!     temperature: 0.1,
//!     timeout: Duration::from_secs(300),
//! }
//! .create_client()?;
//!
//! let coordinator = ToolCoordinator::with_defaults(Arc::from(client), registry);
//! let result = coordinator.run(&mut driver, &mut history).await?;
//! ```

/// Core LLM client trait and provider selection.
pub mod client;
/// Tool-call loop shared by every agent.
pub mod coordinator;
/// Ollama chat API client.
pub mod ollama;

pub use client::{LLMClient, LLMResponse, Provider};
pub use coordinator::{
    ConversationMessage, CoordinatorResult, FinishReason, LoopDriver, MessageRole,
    ToolCallRecord, ToolCallingConfig, ToolCoordinator,
};
pub use ollama::OllamaClient;
