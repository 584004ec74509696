use crate::llm::client::{LLMClient, Provider};
use crate::llm::coordinator::{ConversationMessage, FinishReason, ToolCallingConfig};
use crate::research::events::{EventCallback, EventSink};
use crate::research::fanout::FanOutRouter;
use crate::research::report;
use crate::research::schemas::Section;
use crate::research::supervisor::Supervisor;
use crate::research::worker::ResearchWorker;
use crate::tools::catalog::ToolCatalog;
use crate::types::Result;
use crate::utils::toml_config::{AgentModelConfig, MosaicConfig, ToolSourceConfig};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// Everything a finished run produced.
#[derive(Debug, Clone, Serialize)]
pub struct ResearchOutcome {
    /// The assembled report. Holds only the introduction block if the
    /// supervisor stopped before concluding, and is empty if it never wrote one.
    pub final_report: String,
    pub report_complete: bool,
    /// Completed sections in declared order
    pub completed_sections: Vec<Section>,
    /// Section names as last declared
    pub sections: Vec<String>,
    pub original_query: String,
    pub supervisor_iterations: usize,
    pub delegation_rounds: usize,
    pub finish_reason: FinishReason,
    /// Supervisor message history
    pub messages: Vec<ConversationMessage>,
}

/// Loop settings for one agent role.
#[derive(Debug, Clone, Default)]
pub struct RoleSettings {
    pub loop_config: ToolCallingConfig,
}

/// Entry point of a research run.
///
/// # Example
///
/// ```rust,ignore
/// let config = MosaicConfig::load("mosaic.toml")?;
/// let catalog = Arc::new(ToolCatalog::new(Arc::new(McpConnector::new())));
/// let orchestrator = ResearchOrchestrator::from_config(&config, catalog)?;
///
/// let outcome = orchestrator
///     .run("What changed for MTV2005?", &config.tool_source(), false)
///     .await?;
/// println!("{}", outcome.final_report);
/// ```
pub struct ResearchOrchestrator {
    supervisor_client: Arc<dyn LLMClient>,
    researcher_client: Arc<dyn LLMClient>,
    catalog: Arc<ToolCatalog>,
    supervisor: RoleSettings,
    researcher: RoleSettings,
    tool_prompt: Option<String>,
    on_event: Option<EventCallback>,
}

impl ResearchOrchestrator {
    pub fn new(
        supervisor_client: Arc<dyn LLMClient>,
        researcher_client: Arc<dyn LLMClient>,
        catalog: Arc<ToolCatalog>,
    ) -> Self {
        Self {
            supervisor_client,
            researcher_client,
            catalog,
            supervisor: RoleSettings::default(),
            researcher: RoleSettings::default(),
            tool_prompt: None,
            on_event: None,
        }
    }

    /// Build Ollama-backed clients and loop settings from configuration.
    pub fn from_config(config: &MosaicConfig, catalog: Arc<ToolCatalog>) -> Result<Self> {
        let client_for = |role: &AgentModelConfig| -> Result<Arc<dyn LLMClient>> {
            let provider = Provider::Ollama {
                base_url: config.ollama.base_url.clone(),
                model: role.model.clone(),
                temperature: role.temperature,
                timeout: config.request_timeout(),
            };
            Ok(Arc::from(provider.create_client()?))
        };
        let settings_for = |role: &AgentModelConfig| RoleSettings {
            loop_config: ToolCallingConfig {
                max_iterations: role.max_iterations,
                parallel_execution: config.tools.parallel,
                tool_timeout: Some(config.tool_timeout()),
            },
        };

        Ok(Self {
            supervisor_client: client_for(&config.supervisor)?,
            researcher_client: client_for(&config.researcher)?,
            catalog,
            supervisor: settings_for(&config.supervisor),
            researcher: settings_for(&config.researcher),
            tool_prompt: config.tools.prompt.clone(),
            on_event: None,
        })
    }

    pub fn with_supervisor_settings(mut self, settings: RoleSettings) -> Self {
        self.supervisor = settings;
        self
    }

    pub fn with_researcher_settings(mut self, settings: RoleSettings) -> Self {
        self.researcher = settings;
        self
    }

    pub fn with_tool_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.tool_prompt = Some(prompt.into());
        self
    }

    /// Receive streamed events instead of having them logged.
    pub fn with_event_callback(mut self, callback: EventCallback) -> Self {
        self.on_event = Some(callback);
        self
    }

    pub fn catalog(&self) -> &Arc<ToolCatalog> {
        &self.catalog
    }

    /// Research `query` and assemble a report.
    ///
    /// With `stream` set, one event per agent decision goes to the event
    /// callback (or the log). Streaming never changes the outcome.
    pub async fn run(
        &self,
        query: &str,
        tool_source: &ToolSourceConfig,
        stream: bool,
    ) -> Result<ResearchOutcome> {
        info!(query = %query, stream, "Starting research run");

        let source = Arc::new(tool_source.clone());
        let events = EventSink::new(stream, self.on_event.clone());

        let worker = ResearchWorker::new(
            Arc::clone(&self.researcher_client),
            Arc::clone(&self.catalog),
            Arc::clone(&source),
            self.researcher.loop_config.clone(),
        )
        .with_tool_prompt(self.tool_prompt.clone())
        .with_events(events.clone());

        let supervisor = Supervisor::new(
            Arc::clone(&self.supervisor_client),
            Arc::clone(&self.catalog),
            source,
            self.supervisor.loop_config.clone(),
            FanOutRouter::new(worker),
        )
        .with_tool_prompt(self.tool_prompt.clone())
        .with_events(events);

        let run = supervisor.run(query).await?;
        let state = run.state;

        let ordered: Vec<Section> = report::ordered_sections(&state.sections, &state.completed)
            .into_iter()
            .cloned()
            .collect();

        info!(
            sections = ordered.len(),
            report_chars = state.final_report.len(),
            rounds = run.delegation_rounds,
            "Research run finished"
        );

        Ok(ResearchOutcome {
            final_report: state.final_report,
            report_complete: state.report_complete,
            completed_sections: ordered,
            sections: state.sections,
            original_query: state.original_query,
            supervisor_iterations: run.loop_result.iterations,
            delegation_rounds: run.delegation_rounds,
            finish_reason: run.loop_result.finish_reason,
            messages: state.messages,
        })
    }
}
