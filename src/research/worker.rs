//! Research worker: one tool-call loop per report section.

use crate::llm::client::{LLMClient, LLMResponse};
use crate::llm::coordinator::{
    ConversationMessage, LoopDriver, ToolCallRecord, ToolCallingConfig, ToolCoordinator,
};
use crate::research::events::EventSink;
use crate::research::identifiers::{self, Identifiers};
use crate::research::schemas::{self, FinishResearch, ReportTool, Section};
use crate::research::state::SectionState;
use crate::tools::catalog::{assemble_registry, ToolCatalog};
use crate::types::{Result, ToolCall};
use crate::utils::toml_config::ToolSourceConfig;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

const RESEARCH_PROTOCOL: &str = "\
RESEARCH STRATEGY:

1. INITIAL SEARCH: search for every identifier listed above, one search per identifier.
2. DETAILED INVESTIGATION: for every hit, fetch its full details. Details reveal related \
items and connections that search summaries omit.
3. CROSS-REFERENCE EXPANSION: pull new identifiers out of the details (feature codes in \
tickets, tickets in changelist descriptions, changelists in tickets) and search for them.
4. ITERATIVE DEEPENING: follow new identifiers 2-3 levels deep, across every source.

Example: a query mentions MTV2005. Searching changelists finds CL 27235273; its details \
mention VIT-12345; the ticket references MTV2010; search MTV2010 everywhere.

After 2-3 rounds of searching you MUST call the 'Section' tool with the written section. \
Cite sources inline, e.g. [Source: JIRA VIT-1234] or [Source: Perforce CL 12345678]. \
Do not keep searching indefinitely. If nothing relevant exists, write a short section \
saying so, or call 'FinishResearch'.";

/// Runs research for a single section. Cheap to clone; every fan-out task
/// gets its own copy.
#[derive(Clone)]
pub struct ResearchWorker {
    client: Arc<dyn LLMClient>,
    catalog: Arc<ToolCatalog>,
    source: Arc<ToolSourceConfig>,
    loop_config: ToolCallingConfig,
    tool_prompt: Option<Arc<str>>,
    events: EventSink,
}

impl ResearchWorker {
    /// Worker with no extra tool guidance and events disabled.
    pub fn new(
        client: Arc<dyn LLMClient>,
        catalog: Arc<ToolCatalog>,
        source: Arc<ToolSourceConfig>,
        loop_config: ToolCallingConfig,
    ) -> Self {
        Self {
            client,
            catalog,
            source,
            loop_config,
            tool_prompt: None,
            events: EventSink::disabled(),
        }
    }

    /// Append tool-usage guidance to every system prompt.
    pub fn with_tool_prompt(mut self, prompt: Option<String>) -> Self {
        self.tool_prompt = prompt.map(Arc::from);
        self
    }

    /// Send one event per worker decision to `events`.
    pub fn with_events(mut self, events: EventSink) -> Self {
        self.events = events;
        self
    }

    /// Research `state.section` until the model writes it or gives up.
    ///
    /// On return `state.produced` holds the section, stamped with the name
    /// this worker was assigned, or `None` for an abandoned section.
    pub async fn run(&self, mut state: SectionState) -> Result<SectionState> {
        let discovered = self.catalog.get_tools(&self.source).await;
        let registry = Arc::new(assemble_registry(schemas::worker_tools(), &discovered));
        info!(
            section = %state.section,
            tools = registry.len(),
            "Starting section research"
        );

        let coordinator = ToolCoordinator::new(
            Arc::clone(&self.client),
            registry,
            self.loop_config.clone(),
        );

        let mut driver = WorkerDriver {
            section: state.section.clone(),
            original_query: state.original_query.clone(),
            known: identifiers::extract(&state.original_query),
            tool_prompt: self.tool_prompt.clone(),
            events: &self.events,
        };
        info!(
            section = %state.section,
            tickets = ?driver.known.tickets,
            features = ?driver.known.features,
            changelists = ?driver.known.changelists,
            "Identifiers from query"
        );

        let mut history = std::mem::take(&mut state.messages);
        let result = coordinator.run(&mut driver, &mut history).await;
        state.messages = history;
        let result = result?;

        state.produced = completed_section(&state.section, &result.final_tool_calls);
        match &state.produced {
            Some(section) => info!(
                section = %section.name,
                chars = section.content.len(),
                iterations = result.iterations,
                "Section complete"
            ),
            None => warn!(
                section = %state.section,
                reason = %result.finish_reason,
                "Section abandoned without content"
            ),
        }
        Ok(state)
    }
}

/// The section written by the terminal decision, if any.
fn completed_section(assigned: &str, final_calls: &[ToolCall]) -> Option<Section> {
    let call = final_calls.iter().find(|c| c.name == Section::NAME)?;
    match Section::from_arguments(&call.arguments) {
        Ok(mut section) => {
            if section.name != assigned {
                info!(written = %section.name, assigned = %assigned, "Renaming section to its assignment");
                section.name = assigned.to_string();
            }
            Some(section)
        }
        Err(e) => {
            warn!(section = %assigned, error = %e, "Unusable Section call");
            None
        }
    }
}

struct WorkerDriver<'a> {
    section: String,
    original_query: String,
    known: Identifiers,
    tool_prompt: Option<Arc<str>>,
    events: &'a EventSink,
}

#[async_trait]
impl LoopDriver for WorkerDriver<'_> {
    fn node(&self) -> String {
        format!("researcher:{}", self.section)
    }

    fn system_prompt(&self) -> String {
        let mut prompt = format!(
            "You are an expert enterprise researcher. Your sole focus is to research and write \
one section of a report. The section you must write is: '{}'. /no_think\n\n\
CONTEXT: the user's original query was: \"{}\"\n\n\
KNOWN IDENTIFIERS (from the query and from results so far):\n{}\n\n{}",
            self.section, self.original_query, self.known, RESEARCH_PROTOCOL
        );
        if let Some(extra) = &self.tool_prompt {
            prompt.push_str("\n\nTOOL GUIDANCE:\n");
            prompt.push_str(extra);
        }
        prompt
    }

    fn terminal_tool(&self, tool_calls: &[ToolCall]) -> Option<String> {
        tool_calls
            .iter()
            .find(|c| c.name == Section::NAME || c.name == FinishResearch::NAME)
            .map(|c| c.name.clone())
    }

    fn on_decision(&mut self, response: &LLMResponse) {
        self.events.emit(&self.node(), response);
    }

    async fn after_tools(
        &mut self,
        records: &[ToolCallRecord],
        _history: &mut Vec<ConversationMessage>,
    ) -> Result<()> {
        for record in records {
            if !record.success {
                continue;
            }
            let fresh = self.known.absorb(identifiers::extract(&record.observation()));
            if !fresh.is_empty() {
                info!(
                    section = %self.section,
                    tool = %record.name,
                    tickets = ?fresh.tickets,
                    features = ?fresh.features,
                    changelists = ?fresh.changelists,
                    "Found new references to explore"
                );
            }
        }
        Ok(())
    }
}
