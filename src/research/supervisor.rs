//! Supervisor: plans sections, delegates them, then writes the report.
//!
//! The supervisor runs a single tool-call loop over the whole run. Its phase
//! is derived from [`ReportState`] rather than stored:
//!
//! - planning: no sections declared, or some still unresearched
//! - synthesis: every declared section complete and no report yet; the
//!   decision sees an extra instruction carrying the section contents
//! - finish: `FinishReport` as the only call in a decision ends the run

use crate::llm::client::{LLMClient, LLMResponse};
use crate::llm::coordinator::{
    ConversationMessage, CoordinatorResult, LoopDriver, ToolCallRecord, ToolCallingConfig,
    ToolCoordinator,
};
use crate::research::events::EventSink;
use crate::research::fanout::FanOutRouter;
use crate::research::identifiers;
use crate::research::report;
use crate::research::schemas::{self, Conclusion, FinishReport, Introduction, ReportTool, Sections};
use crate::research::state::ReportState;
use crate::tools::catalog::{assemble_registry, ToolCatalog};
use crate::types::{Result, ToolCall};
use crate::utils::toml_config::ToolSourceConfig;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

const SUPERVISOR_PROMPT: &str = "\
You are an expert enterprise research supervisor. Your goal is to create comprehensive \
reports based on user queries. /no_think

You MUST use the available tools to accomplish this task. Do not answer with text alone.

WORKFLOW:
1. Use the 'Sections' tool to list the sections to research. Each section is researched \
independently by a dedicated researcher.
2. Name sections after the specific items in the query, e.g. 'VIT-60872 Details' or \
'Related Perforce Changes for VIT-60872'.
3. Once research is complete, write the report with 'Introduction', then 'Conclusion'.
4. Finally call 'FinishReport' on its own to signal completion.";

const SYNTHESIS_INSTRUCTION: &str = "All research sections are complete. Now, write the \
introduction and conclusion for the report based on the following content:\n\n";

const AFTER_INTRODUCTION: &str = "Introduction written. Now write a conclusion.";
const AFTER_CONCLUSION: &str = "Report is complete.";
const CONCLUSION_TOO_EARLY: &str =
    "Research sections are still in progress. Do not write the conclusion yet.";
const INTRODUCTION_TOO_EARLY: &str =
    "Research sections are still in progress. Do not write the introduction yet.";
const INTRODUCTION_MISSING: &str =
    "Write the introduction with 'Introduction' before the conclusion.";
const INTRODUCTION_REPEATED: &str =
    "The introduction is already written. Now write a conclusion.";
const REPORT_ALREADY_COMPLETE: &str =
    "The report is already complete. Call FinishReport on its own.";

/// Result of a supervisor run.
#[derive(Debug)]
pub struct SupervisorRun {
    pub state: ReportState,
    pub loop_result: CoordinatorResult,
    pub delegation_rounds: usize,
}

/// Owns the report-level loop and delegates sections through a [`FanOutRouter`].
pub struct Supervisor {
    client: Arc<dyn LLMClient>,
    catalog: Arc<ToolCatalog>,
    source: Arc<ToolSourceConfig>,
    loop_config: ToolCallingConfig,
    router: FanOutRouter,
    tool_prompt: Option<String>,
    events: EventSink,
}

impl Supervisor {
    /// Supervisor with no extra tool guidance and events disabled.
    pub fn new(
        client: Arc<dyn LLMClient>,
        catalog: Arc<ToolCatalog>,
        source: Arc<ToolSourceConfig>,
        loop_config: ToolCallingConfig,
        router: FanOutRouter,
    ) -> Self {
        Self {
            client,
            catalog,
            source,
            loop_config,
            router,
            tool_prompt: None,
            events: EventSink::disabled(),
        }
    }

    /// Append tool-usage guidance to every system prompt.
    pub fn with_tool_prompt(mut self, prompt: Option<String>) -> Self {
        self.tool_prompt = prompt;
        self
    }

    /// Send one event per supervisor decision to `events`.
    pub fn with_events(mut self, events: EventSink) -> Self {
        self.events = events;
        self
    }

    /// Drive the whole report for `query`.
    pub async fn run(&self, query: &str) -> Result<SupervisorRun> {
        let discovered = self.catalog.get_tools(&self.source).await;
        let registry = Arc::new(assemble_registry(schemas::supervisor_tools(), &discovered));
        info!(tools = registry.len(), "Starting supervisor");

        let coordinator = ToolCoordinator::new(
            Arc::clone(&self.client),
            registry,
            self.loop_config.clone(),
        );

        let mut state = ReportState::new();
        state.capture_query(query);
        let mut history = vec![ConversationMessage::user(query)];

        let mut driver = SupervisorDriver {
            state,
            router: &self.router,
            tool_prompt: self.tool_prompt.as_deref(),
            events: &self.events,
            delegation_rounds: 0,
        };

        let result = coordinator.run(&mut driver, &mut history).await;
        let mut state = driver.state;
        state.messages = history;
        let loop_result = result?;

        info!(
            iterations = loop_result.iterations,
            reason = %loop_result.finish_reason,
            completed = state.completed.len(),
            report_complete = state.report_complete,
            "Supervisor finished"
        );

        Ok(SupervisorRun {
            state,
            loop_result,
            delegation_rounds: driver.delegation_rounds,
        })
    }
}

struct SupervisorDriver<'a> {
    state: ReportState,
    router: &'a FanOutRouter,
    tool_prompt: Option<&'a str>,
    events: &'a EventSink,
    delegation_rounds: usize,
}

impl SupervisorDriver<'_> {
    fn apply_sections(&mut self, record: &ToolCallRecord) {
        match Sections::from_arguments(&record.result) {
            Ok(sections) if sections.sections.is_empty() => {
                warn!(kept = ?self.state.sections, "Ignoring empty section list");
            }
            Ok(sections) => {
                info!(sections = ?sections.sections, "Supervisor declared sections");
                self.state.sections = sections.sections;
            }
            Err(e) => warn!(error = %e, "Ignoring unreadable Sections result"),
        }
    }

    fn apply_introduction(&mut self, record: &ToolCallRecord, history: &mut Vec<ConversationMessage>) {
        if self.state.report_complete {
            history.push(ConversationMessage::user(REPORT_ALREADY_COMPLETE));
            return;
        }
        if self.state.introduction_written() {
            history.push(ConversationMessage::user(INTRODUCTION_REPEATED));
            return;
        }
        if !self.state.all_sections_complete() {
            warn!("Introduction requested before research finished");
            history.push(ConversationMessage::user(INTRODUCTION_TOO_EARLY));
            return;
        }
        match Introduction::from_arguments(&record.result) {
            Ok(intro) => {
                self.state.final_report = report::introduction_block(&intro);
                info!(title = %intro.name, "Introduction written");
                history.push(ConversationMessage::user(AFTER_INTRODUCTION));
            }
            Err(e) => warn!(error = %e, "Ignoring unreadable Introduction result"),
        }
    }

    fn apply_conclusion(&mut self, record: &ToolCallRecord, history: &mut Vec<ConversationMessage>) {
        if self.state.report_complete {
            history.push(ConversationMessage::user(REPORT_ALREADY_COMPLETE));
            return;
        }
        if !self.state.all_sections_complete() {
            warn!("Conclusion requested before research finished");
            history.push(ConversationMessage::user(CONCLUSION_TOO_EARLY));
            return;
        }
        if !self.state.introduction_written() {
            warn!("Conclusion requested before the introduction");
            history.push(ConversationMessage::user(INTRODUCTION_MISSING));
            return;
        }
        match Conclusion::from_arguments(&record.result) {
            Ok(conclusion) => {
                self.state.final_report = report::assemble(
                    &self.state.final_report,
                    &self.state.sections,
                    &self.state.completed,
                    &report::conclusion_block(&conclusion),
                );
                self.state.report_complete = true;
                info!(chars = self.state.final_report.len(), "Report assembled");
                history.push(ConversationMessage::user(AFTER_CONCLUSION));
            }
            Err(e) => warn!(error = %e, "Ignoring unreadable Conclusion result"),
        }
    }
}

#[async_trait]
impl LoopDriver for SupervisorDriver<'_> {
    fn node(&self) -> String {
        "supervisor".to_string()
    }

    fn system_prompt(&self) -> String {
        let ids = identifiers::extract(&self.state.original_query);
        info!(
            tickets = ?ids.tickets,
            features = ?ids.features,
            changelists = ?ids.changelists,
            sections = self.state.sections.len(),
            completed = self.state.completed.len(),
            "Supervisor turn"
        );

        let mut prompt = format!(
            "{}\n\nIDENTIFIERS IN THE QUERY:\n{}",
            SUPERVISOR_PROMPT, ids
        );
        if let Some(extra) = self.tool_prompt {
            prompt.push_str("\n\nTOOL GUIDANCE:\n");
            prompt.push_str(extra);
        }
        prompt
    }

    fn ephemeral_messages(&self) -> Vec<ConversationMessage> {
        if !self.state.needs_synthesis() {
            return Vec::new();
        }
        info!("All research sections complete, requesting introduction and conclusion");
        let bodies = report::ordered_bodies(&self.state.sections, &self.state.completed);
        vec![ConversationMessage::user(format!(
            "{}{}",
            SYNTHESIS_INSTRUCTION,
            bodies.join("\n\n")
        ))]
    }

    fn terminal_tool(&self, tool_calls: &[ToolCall]) -> Option<String> {
        match tool_calls {
            [only] if only.name == FinishReport::NAME => Some(only.name.clone()),
            _ => None,
        }
    }

    fn on_decision(&mut self, response: &LLMResponse) {
        self.events.emit("supervisor", response);
    }

    async fn after_tools(
        &mut self,
        records: &[ToolCallRecord],
        history: &mut Vec<ConversationMessage>,
    ) -> Result<()> {
        for record in records.iter().filter(|r| r.success) {
            if record.name == Sections::NAME {
                self.apply_sections(record);
            } else if record.name == Introduction::NAME {
                self.apply_introduction(record, history);
            } else if record.name == Conclusion::NAME {
                self.apply_conclusion(record, history);
            }
        }

        if !self.state.sections.is_empty() {
            let spawned = self.router.dispatch(&mut self.state).await?;
            if spawned > 0 {
                self.delegation_rounds += 1;
            }
        }
        Ok(())
    }
}
