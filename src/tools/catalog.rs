//! Tool catalog: discovery lifecycle for backend tools.
//!
//! The catalog is the one piece of state shared by every concurrent agent.
//! Cache hits only take a short read lock. A miss takes an async gate so
//! that concurrent first use triggers a single discovery.

use crate::tools::registry::{Tool, ToolRegistry};
use crate::types::Result;
use crate::utils::toml_config::ToolSourceConfig;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

/// Connects to the tool backends described by a configuration and returns
/// their tools.
#[async_trait]
pub trait ToolConnector: Send + Sync {
    async fn connect(&self, source: &ToolSourceConfig) -> Result<Vec<Arc<dyn Tool>>>;
}

/// A connector serving a fixed set of tools.
#[derive(Clone, Default)]
pub struct StaticConnector {
    tools: Vec<Arc<dyn Tool>>,
}

impl StaticConnector {
    pub fn new(tools: Vec<Arc<dyn Tool>>) -> Self {
        Self { tools }
    }
}

#[async_trait]
impl ToolConnector for StaticConnector {
    async fn connect(&self, _source: &ToolSourceConfig) -> Result<Vec<Arc<dyn Tool>>> {
        Ok(self.tools.clone())
    }
}

struct CachedTools {
    fingerprint: String,
    tools: Vec<Arc<dyn Tool>>,
}

/// Cached, externally owned tool discovery.
///
/// Tools are discovered once per configuration. A different configuration,
/// [`invalidate`](Self::invalidate) or [`reset`](Self::reset) forces the next
/// call to reconnect. A failed discovery yields no tools and leaves the cache
/// empty so the next call retries.
pub struct ToolCatalog {
    connector: Arc<dyn ToolConnector>,
    cache: RwLock<Option<CachedTools>>,
    load_gate: Mutex<()>,
    discoveries: AtomicUsize,
}

impl ToolCatalog {
    pub fn new(connector: Arc<dyn ToolConnector>) -> Self {
        Self {
            connector,
            cache: RwLock::new(None),
            load_gate: Mutex::new(()),
            discoveries: AtomicUsize::new(0),
        }
    }

    /// Catalog with no backends; agents only see their built-in tools.
    pub fn empty() -> Self {
        Self::new(Arc::new(StaticConnector::default()))
    }

    /// Discovered tools for `source`, unique by name and filtered by the
    /// allow-list.
    pub async fn get_tools(&self, source: &ToolSourceConfig) -> Vec<Arc<dyn Tool>> {
        let fingerprint = source.fingerprint();

        if let Some(tools) = self.cached(&fingerprint) {
            debug!(count = tools.len(), "Using cached tools");
            return tools;
        }

        let _gate = self.load_gate.lock().await;

        // Another task may have finished discovery while we waited.
        if let Some(tools) = self.cached(&fingerprint) {
            debug!(count = tools.len(), "Using tools discovered by a concurrent caller");
            return tools;
        }

        self.discoveries.fetch_add(1, Ordering::SeqCst);
        info!(servers = source.servers.len(), "Discovering tools");

        match self.connector.connect(source).await {
            Ok(discovered) => {
                let tools = unique_allowed(discovered, source);
                info!(count = tools.len(), "Tool discovery complete");
                *self.cache.write() = Some(CachedTools {
                    fingerprint,
                    tools: tools.clone(),
                });
                tools
            }
            Err(e) => {
                error!(error = %e, "Tool discovery failed; continuing without backend tools");
                Vec::new()
            }
        }
    }

    /// Drop the cached tools and reconnect on the next call.
    pub async fn refresh(&self, source: &ToolSourceConfig) -> Vec<Arc<dyn Tool>> {
        self.invalidate();
        self.get_tools(source).await
    }

    /// Force the next call to reconnect even if the configuration is unchanged.
    pub fn invalidate(&self) {
        if self.cache.write().take().is_some() {
            info!("Tool cache invalidated");
        }
    }

    /// Drop cached tools and configuration and clear the discovery counter.
    pub fn reset(&self) {
        *self.cache.write() = None;
        self.discoveries.store(0, Ordering::SeqCst);
        info!("Tool catalog reset");
    }

    pub fn is_loaded(&self) -> bool {
        self.cache.read().is_some()
    }

    /// Number of discovery sequences started since construction or reset.
    pub fn discovery_count(&self) -> usize {
        self.discoveries.load(Ordering::SeqCst)
    }

    fn cached(&self, fingerprint: &str) -> Option<Vec<Arc<dyn Tool>>> {
        let cache = self.cache.read();
        cache
            .as_ref()
            .filter(|c| c.fingerprint == fingerprint)
            .map(|c| c.tools.clone())
    }
}

fn unique_allowed(tools: Vec<Arc<dyn Tool>>, source: &ToolSourceConfig) -> Vec<Arc<dyn Tool>> {
    let mut seen = HashSet::new();
    tools
        .into_iter()
        .filter(|tool| {
            let name = tool.name();
            if !source.allows(name) {
                debug!(tool = %name, "Tool not in allow-list");
                return false;
            }
            if !seen.insert(name.to_string()) {
                debug!(tool = %name, "Skipping duplicate tool");
                return false;
            }
            true
        })
        .collect()
}

/// Build the registry snapshot for one agent loop: built-in tools first,
/// then discovered tools whose names are still free.
pub fn assemble_registry(
    builtins: Vec<Arc<dyn Tool>>,
    discovered: &[Arc<dyn Tool>],
) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    for tool in builtins {
        registry.register(tool);
    }
    for tool in discovered {
        if !registry.register(Arc::clone(tool)) {
            debug!(tool = %tool.name(), "Skipping tool shadowed by a built-in");
        }
    }
    registry
}
