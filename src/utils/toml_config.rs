//! TOML-based configuration for Mosaic
//!
//! This module provides declarative configuration for the decision models,
//! the tool servers and logging via a TOML file (`mosaic.toml`).
//!
//! Every section has defaults, so a missing or empty file yields a working
//! configuration talking to a local Ollama with no tool servers.
//!
//! Use `MosaicConfigManager` for thread-safe access to the current configuration.

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Root configuration structure loaded from mosaic.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MosaicConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub ollama: OllamaConfig,

    /// Model settings for the report-level agent
    #[serde(default = "AgentModelConfig::supervisor")]
    pub supervisor: AgentModelConfig,

    /// Model settings for the per-section agents
    #[serde(default = "AgentModelConfig::researcher")]
    pub researcher: AgentModelConfig,

    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub mcp: McpConfig,
}

impl Default for MosaicConfig {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            ollama: OllamaConfig::default(),
            supervisor: AgentModelConfig::supervisor(),
            researcher: AgentModelConfig::researcher(),
            tools: ToolsConfig::default(),
            mcp: McpConfig::default(),
        }
    }
}

// ============= Logging Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// `pretty` or `json`
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// ============= Ollama Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OllamaConfig {
    #[serde(default = "default_ollama_url")]
    pub base_url: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_request_timeout() -> u64 {
    300
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_ollama_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

// ============= Agent Model Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentModelConfig {
    #[serde(default = "default_model")]
    pub model: String,

    /// Required whenever the table is present; the role defaults differ.
    pub temperature: f32,

    /// Optional cap on decisions per loop. Absent means the agent's own
    /// terminal tools decide when to stop.
    #[serde(default)]
    pub max_iterations: Option<usize>,
}

fn default_model() -> String {
    "qwen3:30b-a3b".to_string()
}

impl AgentModelConfig {
    fn supervisor() -> Self {
        Self {
            model: default_model(),
            temperature: 0.1,
            max_iterations: None,
        }
    }

    fn researcher() -> Self {
        Self {
            model: default_model(),
            temperature: 0.2,
            max_iterations: None,
        }
    }
}

// ============= Tool Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolsConfig {
    /// Allow-list of discovered tool names. Absent means every tool.
    #[serde(default)]
    pub include: Option<Vec<String>>,

    /// Extra tool-usage guidance appended to agent system prompts
    #[serde(default)]
    pub prompt: Option<String>,

    #[serde(default = "default_tool_timeout")]
    pub timeout_secs: u64,

    /// Execute the tool calls of one decision concurrently
    #[serde(default = "default_true")]
    pub parallel: bool,
}

fn default_tool_timeout() -> u64 {
    120
}

fn default_true() -> bool {
    true
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            include: None,
            prompt: None,
            timeout_secs: default_tool_timeout(),
            parallel: true,
        }
    }
}

// ============= MCP Server Configuration =============

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct McpConfig {
    #[serde(default)]
    pub servers: BTreeMap<String, McpServerConfig>,
}

/// A tool server spawned as a child process and spoken to over stdio.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct McpServerConfig {
    pub command: String,

    #[serde(default)]
    pub args: Vec<String>,

    /// Literal environment values for the server process
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Names of variables copied from this process's environment (credentials)
    #[serde(default)]
    pub env_passthrough: Vec<String>,
}

impl McpServerConfig {
    /// Literal `env` merged with the passthrough variables that are set.
    pub fn resolved_env(&self) -> BTreeMap<String, String> {
        let mut env = self.env.clone();
        for name in &self.env_passthrough {
            match std::env::var(name) {
                Ok(value) => {
                    env.insert(name.clone(), value);
                }
                Err(_) => debug!(var = %name, "Passthrough variable not set"),
            }
        }
        env
    }
}

/// The part of the configuration that determines which tools exist.
///
/// Two equal values always discover the same tool set, so the tool catalog
/// keys its cache on [`ToolSourceConfig::fingerprint`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ToolSourceConfig {
    pub servers: BTreeMap<String, McpServerConfig>,
    pub include: Option<Vec<String>>,
}

impl ToolSourceConfig {
    /// Stable textual identity of this configuration.
    pub fn fingerprint(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Whether a discovered tool passes the allow-list.
    pub fn allows(&self, name: &str) -> bool {
        match &self.include {
            Some(names) => names.iter().any(|n| n == name),
            None => true,
        }
    }
}

// ============= Configuration Loading & Validation =============

/// Errors that can occur during configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl MosaicConfig {
    /// Load configuration from a TOML file.
    ///
    /// A missing file yields the defaults. `OLLAMA_URL` overrides
    /// `ollama.base_url` when set.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        let mut config = if path.exists() {
            let content = fs::read_to_string(path)?;
            toml::from_str::<MosaicConfig>(&content)?
        } else {
            info!(path = %path.display(), "No configuration file, using defaults");
            MosaicConfig::default()
        };

        if let Ok(url) = std::env::var("OLLAMA_URL") {
            if !url.trim().is_empty() {
                config.ollama.base_url = url;
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration for internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.logging.format.as_str() {
            "pretty" | "json" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "Unknown log format '{}' (expected 'pretty' or 'json')",
                    other
                )))
            }
        }

        if self.ollama.base_url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "ollama.base_url must not be empty".to_string(),
            ));
        }
        if self.ollama.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "ollama.request_timeout_secs must be greater than zero".to_string(),
            ));
        }

        for (role, agent) in [("supervisor", &self.supervisor), ("researcher", &self.researcher)] {
            if agent.model.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "{}.model must not be empty",
                    role
                )));
            }
            if !(0.0..=2.0).contains(&agent.temperature) {
                return Err(ConfigError::ValidationError(format!(
                    "{}.temperature must be within 0.0..=2.0, got {}",
                    role, agent.temperature
                )));
            }
            if agent.max_iterations == Some(0) {
                return Err(ConfigError::ValidationError(format!(
                    "{}.max_iterations must be greater than zero",
                    role
                )));
            }
        }

        if self.tools.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "tools.timeout_secs must be greater than zero".to_string(),
            ));
        }

        for (name, server) in &self.mcp.servers {
            if server.command.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "mcp.servers.{}.command must not be empty",
                    name
                )));
            }
        }

        Ok(())
    }

    /// The tool-discovery slice of this configuration
    pub fn tool_source(&self) -> ToolSourceConfig {
        ToolSourceConfig {
            servers: self.mcp.servers.clone(),
            include: self.tools.include.clone(),
        }
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tools.timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.ollama.request_timeout_secs)
    }
}

// ============= Configuration Manager =============

/// Thread-safe configuration holder with explicit reload
pub struct MosaicConfigManager {
    config: Arc<ArcSwap<MosaicConfig>>,
    config_path: PathBuf,
}

impl MosaicConfigManager {
    /// Create a new configuration manager and load the initial config
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref().to_path_buf();
        let config = MosaicConfig::load(&path)?;

        Ok(Self {
            config: Arc::new(ArcSwap::from_pointee(config)),
            config_path: path,
        })
    }

    /// Create a config manager directly from a config (useful for testing)
    pub fn from_config(config: MosaicConfig) -> Self {
        Self {
            config: Arc::new(ArcSwap::from_pointee(config)),
            config_path: PathBuf::from("mosaic.toml"),
        }
    }

    /// Get the current configuration (lockless read)
    pub fn config(&self) -> Arc<MosaicConfig> {
        self.config.load_full()
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Reload the configuration from disk. The previous configuration is
    /// kept when the new one fails to load.
    pub fn reload(&self) -> Result<(), ConfigError> {
        info!(path = %self.config_path.display(), "Reloading configuration");

        let new_config = MosaicConfig::load(&self.config_path)?;
        self.config.store(Arc::new(new_config));

        info!("Configuration reloaded successfully");
        Ok(())
    }
}

impl Clone for MosaicConfigManager {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            config_path: self.config_path.clone(),
        }
    }
}
