//! Fan-out of declared sections to parallel research workers.

use crate::research::schemas::Section;
use crate::research::state::{CompletedSections, ReportState, SectionState};
use crate::research::worker::ResearchWorker;
use crate::types::{AppError, Result};
use tokio::task::JoinSet;
use tracing::{info, warn};

/// Declared names not yet completed, in declared order, each at most once.
pub fn remaining_sections(declared: &[String], completed: &CompletedSections) -> Vec<String> {
    let mut remaining: Vec<String> = Vec::new();
    for name in declared {
        if completed.contains(name) || remaining.contains(name) {
            continue;
        }
        remaining.push(name.clone());
    }
    remaining
}

/// Dispatches one worker per remaining section and joins them all before
/// returning.
#[derive(Clone)]
pub struct FanOutRouter {
    worker: ResearchWorker,
}

impl FanOutRouter {
    pub fn new(worker: ResearchWorker) -> Self {
        Self { worker }
    }

    /// Run one delegation round against `state`.
    ///
    /// Returns the number of workers spawned. Every spawned worker has
    /// terminated when this returns, and every produced section has been
    /// merged into `state.completed`.
    pub async fn dispatch(&self, state: &mut ReportState) -> Result<usize> {
        let remaining = remaining_sections(&state.sections, &state.completed);
        if remaining.is_empty() {
            return Ok(0);
        }

        if let Some(name) = remaining.iter().find(|n| state.completed.contains(n)) {
            return Err(AppError::Invariant(format!(
                "section '{}' is already complete and cannot be delegated again",
                name
            )));
        }

        info!(sections = ?remaining, "Delegating research");

        let mut workers = JoinSet::new();
        for name in &remaining {
            let worker = self.worker.clone();
            let section_state = SectionState::new(name.clone(), state.original_query.clone());
            workers.spawn(async move { worker.run(section_state).await });
        }

        // Join barrier: wait for every worker, even after a failure.
        let mut produced: Vec<Section> = Vec::new();
        let mut first_error: Option<AppError> = None;
        while let Some(joined) = workers.join_next().await {
            let outcome = joined
                .map_err(|e| AppError::Internal(format!("research worker panicked: {}", e)))
                .and_then(|result| result);
            match outcome {
                Ok(section_state) => produced.extend(section_state.produced),
                Err(e) => {
                    warn!(error = %e, "Research worker failed");
                    first_error.get_or_insert(e);
                }
            }
        }
        if let Some(e) = first_error {
            return Err(e);
        }

        let abandoned = remaining.len() - produced.len();
        state.completed.merge_all(produced)?;
        info!(
            spawned = remaining.len(),
            abandoned,
            completed = state.completed.len(),
            "Delegation round finished"
        );

        Ok(remaining.len())
    }
}
