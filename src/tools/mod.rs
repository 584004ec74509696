//! Tool infrastructure shared by every agent loop.
//!
//! - [`registry`] - the `Tool` trait and the name-keyed snapshot a loop runs against
//! - [`catalog`] - cached discovery of backend tools from configuration
//! - `mcp` - discovery over MCP stdio servers (feature `mcp`)
//!
//! A loop's registry is assembled once at loop start: the agent's built-in
//! tools first, then whatever the catalog discovered.
//!
//! ```ignore
//! let catalog = ToolCatalog::new(Arc::new(McpConnector::new()));
//! let discovered = catalog.get_tools(&config.tool_source()).await;
//! let registry = assemble_registry(builtins, &discovered);
//! ```

/// Cached tool discovery.
pub mod catalog;
/// MCP client connector.
#[cfg(feature = "mcp")]
pub mod mcp;
/// Tool trait and registry.
pub mod registry;

pub use catalog::{assemble_registry, StaticConnector, ToolCatalog, ToolConnector};
pub use registry::{Tool, ToolRegistry};
