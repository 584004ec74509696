//! Built-in report tools.
//!
//! These are the tools agents use to hand structured results back to the
//! orchestrator. Invoking one only validates the arguments against the
//! schema and echoes the payload; the supervisor and workers interpret it.

use crate::tools::registry::Tool;
use crate::types::{AppError, Result};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;

/// A section of the report being researched and written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Section {
    /// Name for this section of the report.
    pub name: String,
    /// A detailed description of the research scope for this section.
    pub description: String,
    /// The fully written content of the section, based on research.
    pub content: String,
}

/// A list of section titles that will form the main body of the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Sections {
    /// The titles of the sections to be researched.
    pub sections: Vec<String>,
}

/// The introduction for the final report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Introduction {
    /// The overall title for the report.
    pub name: String,
    /// The content of the introduction, giving an overview of the report.
    pub content: String,
}

/// The conclusion for the final report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Conclusion {
    /// The title for the conclusion section (e.g., 'Conclusion', 'Summary').
    pub name: String,
    /// The content of the conclusion, summarizing the report's findings.
    pub content: String,
}

/// Signals that research for a section ends without a written section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FinishResearch {}

/// Signals that the entire report (intro, body, conclusion) is complete.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FinishReport {}

/// A payload type exposed to the model as a tool of the same name.
pub trait ReportTool: JsonSchema + DeserializeOwned + Serialize + Send + Sync + 'static {
    const NAME: &'static str;
    const DESCRIPTION: &'static str;

    /// Parse tool-call arguments into the payload.
    fn from_arguments(args: &Value) -> Result<Self> {
        let args = match args {
            Value::Null => Value::Object(Default::default()),
            other => other.clone(),
        };
        serde_json::from_value(args).map_err(|e| {
            AppError::Tool(format!("Invalid arguments for {}: {}", Self::NAME, e))
        })
    }
}

impl ReportTool for Section {
    const NAME: &'static str = "Section";
    const DESCRIPTION: &'static str =
        "Write a completed section of the report. Include citations such as [Source: JIRA VIT-1234].";
}

impl ReportTool for Sections {
    const NAME: &'static str = "Sections";
    const DESCRIPTION: &'static str =
        "List the section titles that will form the main body of the report. Each section is researched independently.";
}

impl ReportTool for Introduction {
    const NAME: &'static str = "Introduction";
    const DESCRIPTION: &'static str =
        "Write the report title and introduction once all sections are researched.";
}

impl ReportTool for Conclusion {
    const NAME: &'static str = "Conclusion";
    const DESCRIPTION: &'static str =
        "Write the conclusion after the introduction. This completes the report.";
}

impl ReportTool for FinishResearch {
    const NAME: &'static str = "FinishResearch";
    const DESCRIPTION: &'static str =
        "Stop researching this section without writing it.";
}

impl ReportTool for FinishReport {
    const NAME: &'static str = "FinishReport";
    const DESCRIPTION: &'static str = "Signal that the entire report is complete.";
}

/// Exposes a [`ReportTool`] payload through the [`Tool`] trait.
pub struct SchemaTool<T: ReportTool> {
    _payload: PhantomData<fn() -> T>,
}

impl<T: ReportTool> SchemaTool<T> {
    pub fn shared() -> Arc<dyn Tool> {
        Arc::new(Self {
            _payload: PhantomData,
        })
    }
}

#[async_trait]
impl<T: ReportTool> Tool for SchemaTool<T> {
    fn name(&self) -> &str {
        T::NAME
    }

    fn description(&self) -> &str {
        T::DESCRIPTION
    }

    fn parameters_schema(&self) -> Value {
        let mut schema = serde_json::to_value(schemars::schema_for!(T))
            .unwrap_or_else(|_| serde_json::json!({"type": "object"}));
        if let Some(obj) = schema.as_object_mut() {
            obj.remove("$schema");
            obj.remove("title");
        }
        schema
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let payload = T::from_arguments(&args)?;
        serde_json::to_value(payload).map_err(|e| AppError::Internal(e.to_string()))
    }
}

/// Tools every research worker starts with.
pub fn worker_tools() -> Vec<Arc<dyn Tool>> {
    vec![
        SchemaTool::<Section>::shared(),
        SchemaTool::<FinishResearch>::shared(),
    ]
}

/// Tools the supervisor starts with.
pub fn supervisor_tools() -> Vec<Arc<dyn Tool>> {
    vec![
        SchemaTool::<Sections>::shared(),
        SchemaTool::<Introduction>::shared(),
        SchemaTool::<Conclusion>::shared(),
        SchemaTool::<FinishReport>::shared(),
    ]
}
