//! Supervisor/worker research orchestration
//!
//! A run takes one natural-language query and produces a report:
//!
//! 1. **Planning** - the supervisor declares the report's sections
//! 2. **Fan-out** - one research worker per section runs in parallel, each
//!    with its own tool-call loop against the discovered backend tools
//! 3. **Merge** - written sections are merged into the shared report state
//! 4. **Synthesis** - the supervisor writes the introduction and conclusion
//!    around the section bodies, in declared order
//!
//! # Usage
//!
//! ```ignore
//! use mosaic::research::ResearchOrchestrator;
//!
//! let orchestrator = ResearchOrchestrator::from_config(&config, catalog)?;
//! let outcome = orchestrator
//!     .run("Summarize VIT-60872 and related changelists", &config.tool_source(), false)
//!     .await?;
//!
//! println!("{}", outcome.final_report);
//! ```

/// Run entry point and outcome.
pub mod coordinator;
/// Streaming progress events.
pub mod events;
/// Parallel section dispatch.
pub mod fanout;
/// Ticket, feature-code and changelist extraction.
pub mod identifiers;
/// Report assembly.
pub mod report;
/// Built-in report tools.
pub mod schemas;
/// Shared report and per-section state.
pub mod state;
/// Planning and synthesis loop.
pub mod supervisor;
/// Per-section research loop.
pub mod worker;

pub use coordinator::{ResearchOrchestrator, ResearchOutcome, RoleSettings};
pub use events::{AgentEvent, EventCallback, EventSink, ToolCallSummary};
pub use fanout::FanOutRouter;
pub use identifiers::Identifiers;
pub use schemas::{Conclusion, FinishReport, FinishResearch, Introduction, Section, Sections};
pub use state::{CompletedSections, ReportState, SectionState};
pub use supervisor::{Supervisor, SupervisorRun};
pub use worker::ResearchWorker;
