//! # Mosaic - supervisor/worker research orchestration
//!
//! Mosaic turns one natural-language research query into a structured
//! report. A supervisor agent plans the report as named sections, a research
//! worker per section gathers evidence in parallel through tool calls against
//! enterprise backends (reached over MCP), and the supervisor then writes the
//! introduction and conclusion around the collected sections.
//!
//! ## Overview
//!
//! Mosaic can be used in two ways:
//!
//! 1. **As a command line tool** - run the `mosaic` binary
//! 2. **As a library** - embed the orchestrator in your own Rust project
//!
//! ## Quick Start (Library Usage)
//!
//! ```rust,ignore
//! use mosaic::{MosaicConfig, ResearchOrchestrator, ToolCatalog};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = MosaicConfig::load("mosaic.toml")?;
//!     let catalog = Arc::new(ToolCatalog::empty());
//!     let orchestrator = ResearchOrchestrator::from_config(&config, catalog)?;
//!
//!     let outcome = orchestrator
//!         .run("What changed for MTV2005?", &config.tool_source(), false)
//!         .await?;
//!     println!("{}", outcome.final_report);
//!     Ok(())
//! }
//! ```
//!
//! ### Plugging in a model
//!
//! Any backend works as long as it implements [`LLMClient`]:
//!
//! ```rust,ignore
//! let orchestrator = ResearchOrchestrator::new(supervisor_client, researcher_client, catalog);
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `mcp` | Discover backend tools from MCP stdio servers |
//! | `full` | Everything above |
//!
//! ## Modules
//!
//! - [`research`] - supervisor, workers, fan-out and report assembly
//! - [`llm`] - LLM client abstraction, Ollama client and the tool-call loop
//! - [`tools`] - tool trait, registry snapshots and cached discovery
//! - [`utils`] - `mosaic.toml` configuration
//! - [`types`] - shared tool types and error handling

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

/// Command line interface.
pub mod cli;
/// LLM clients and the tool-call loop.
pub mod llm;
/// Research orchestration.
pub mod research;
/// Tool registry and discovery.
pub mod tools;
/// Core types and errors.
pub mod types;
/// Configuration.
pub mod utils;

// Re-export commonly used types
pub use llm::{LLMClient, LLMResponse, Provider, ToolCoordinator};
pub use research::{AgentEvent, ResearchOrchestrator, ResearchOutcome};
pub use tools::{Tool, ToolCatalog, ToolConnector, ToolRegistry};
pub use types::{AppError, Result, ToolCall, ToolDefinition};
pub use utils::toml_config::{MosaicConfig, MosaicConfigManager, ToolSourceConfig};
