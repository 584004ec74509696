use crate::llm::coordinator::ConversationMessage;
use crate::research::schemas::Section;
use crate::types::{AppError, Result};
use serde::{Serialize, Serializer};
use std::collections::HashMap;

/// Completed sections keyed by name.
///
/// The set only grows. Merging a name that is already present is rejected,
/// so the final set never depends on the order workers finished in.
#[derive(Debug, Clone, Default)]
pub struct CompletedSections {
    sections: Vec<Section>,
    index: HashMap<String, usize>,
}

impl CompletedSections {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one section; a repeated name is an invariant violation.
    pub fn merge(&mut self, section: Section) -> Result<()> {
        if self.index.contains_key(&section.name) {
            return Err(AppError::Invariant(format!(
                "section '{}' was completed twice",
                section.name
            )));
        }
        self.index.insert(section.name.clone(), self.sections.len());
        self.sections.push(section);
        Ok(())
    }

    /// Merge a whole round. Nothing is merged if any section would be rejected.
    pub fn merge_all(&mut self, sections: Vec<Section>) -> Result<()> {
        let mut staged = self.clone();
        for section in sections {
            staged.merge(section)?;
        }
        *self = staged;
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Section> {
        self.index.get(name).map(|&i| &self.sections[i])
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Sections in merge order.
    pub fn iter(&self) -> impl Iterator<Item = &Section> {
        self.sections.iter()
    }
}

impl Serialize for CompletedSections {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.sections.serialize(serializer)
    }
}

impl PartialEq for CompletedSections {
    /// Equality by content per name, independent of merge order.
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .sections
                .iter()
                .all(|s| other.get(&s.name) == Some(s))
    }
}

/// Supervisor-scoped state of one research run.
#[derive(Debug, Clone, Default)]
pub struct ReportState {
    /// Supervisor message history
    pub messages: Vec<ConversationMessage>,
    /// Section names as last declared, in declared order
    pub sections: Vec<String>,
    pub completed: CompletedSections,
    /// Introduction block once written, the whole report once concluded
    pub final_report: String,
    pub report_complete: bool,
    pub original_query: String,
}

impl ReportState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the query the run started from. Later calls are ignored.
    pub fn capture_query(&mut self, query: &str) {
        if self.original_query.is_empty() {
            self.original_query = query.to_string();
        }
    }

    /// Every declared section has a completed counterpart.
    pub fn all_sections_complete(&self) -> bool {
        !self.sections.is_empty() && self.sections.iter().all(|s| self.completed.contains(s))
    }

    /// Research is done but the report has not been written yet.
    pub fn needs_synthesis(&self) -> bool {
        self.all_sections_complete() && self.final_report.is_empty()
    }

    pub fn introduction_written(&self) -> bool {
        !self.final_report.is_empty()
    }
}

/// Worker-scoped state for one section.
#[derive(Debug, Clone)]
pub struct SectionState {
    /// The worker's own history, invisible to the supervisor and siblings
    pub messages: Vec<ConversationMessage>,
    pub section: String,
    pub original_query: String,
    pub produced: Option<Section>,
}

impl SectionState {
    pub fn new(section: impl Into<String>, original_query: impl Into<String>) -> Self {
        let section = section.into();
        Self {
            messages: vec![ConversationMessage::user(format!(
                "Please research and write the section: {}",
                section
            ))],
            section,
            original_query: original_query.into(),
            produced: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(name: &str) -> Section {
        Section {
            name: name.to_string(),
            description: format!("{} scope", name),
            content: format!("{} body", name),
        }
    }

    #[test]
    fn test_merge_rejects_duplicates_without_loss() {
        let mut completed = CompletedSections::new();
        completed.merge(section("A")).unwrap();

        let mut dup = section("A");
        dup.content = "overwritten".to_string();
        let err = completed.merge(dup).unwrap_err();

        assert!(matches!(err, AppError::Invariant(_)));
        assert_eq!(completed.get("A").unwrap().content, "A body");
        assert_eq!(completed.len(), 1);
    }

    #[test]
    fn test_merge_all_is_atomic() {
        let mut completed = CompletedSections::new();
        completed.merge(section("A")).unwrap();

        let result = completed.merge_all(vec![section("B"), section("A")]);
        assert!(result.is_err());
        assert!(!completed.contains("B"));
    }

    #[test]
    fn test_merge_order_does_not_matter() {
        let names = ["A", "B", "C"];
        let mut forward = CompletedSections::new();
        forward
            .merge_all(names.iter().map(|n| section(n)).collect())
            .unwrap();
        let mut backward = CompletedSections::new();
        backward
            .merge_all(names.iter().rev().map(|n| section(n)).collect())
            .unwrap();

        assert_eq!(forward, backward);
    }

    #[test]
    fn test_capture_query_once() {
        let mut state = ReportState::new();
        state.capture_query("What is MTV2005?");
        state.capture_query("something else");
        assert_eq!(state.original_query, "What is MTV2005?");
    }

    #[test]
    fn test_synthesis_condition() {
        let mut state = ReportState::new();
        assert!(!state.needs_synthesis());

        state.sections = vec!["A".to_string(), "B".to_string()];
        state.completed.merge(section("A")).unwrap();
        assert!(!state.all_sections_complete());

        state.completed.merge(section("B")).unwrap();
        assert!(state.needs_synthesis());

        state.final_report = "# Report\n\nintro".to_string();
        assert!(!state.needs_synthesis());
    }

    #[test]
    fn test_section_state_seeds_request() {
        let state = SectionState::new("VIT-60872 Details", "Research VIT-60872");
        assert_eq!(state.messages.len(), 1);
        assert_eq!(
            state.messages[0].content,
            "Please research and write the section: VIT-60872 Details"
        );
        assert!(state.produced.is_none());
    }
}
