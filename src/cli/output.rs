//! Colored output helpers for CLI
//!
//! Provides consistent, colored terminal output for the Mosaic CLI.

use crate::research::events::AgentEvent;
use crate::research::ResearchOutcome;
use owo_colors::OwoColorize;

/// Output style configuration
#[derive(Debug, Clone, Copy)]
pub struct Output {
    /// Whether to use colored output
    pub colored: bool,
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

impl Output {
    /// Create a new output helper with colors enabled
    pub fn new() -> Self {
        Self { colored: true }
    }

    /// Create a new output helper with colors disabled
    pub fn no_color() -> Self {
        Self { colored: false }
    }

    /// Print the Mosaic banner to stderr
    pub fn banner(&self) {
        let version = format!("v{}", env!("CARGO_PKG_VERSION"));
        if self.colored {
            eprintln!(
                "\n  {} {}\n",
                "mosaic".bright_cyan().bold(),
                version.dimmed()
            );
        } else {
            eprintln!("\n  mosaic {}\n", version);
        }
    }

    /// Print a success message with a checkmark
    pub fn success(&self, message: &str) {
        if self.colored {
            eprintln!("  {} {}", "✓".green().bold(), message.green());
        } else {
            eprintln!("  [OK] {}", message);
        }
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.colored {
            eprintln!("  {} {}", "•".blue(), message);
        } else {
            eprintln!("  [INFO] {}", message);
        }
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.colored {
            eprintln!("  {} {}", "⚠".yellow().bold(), message.yellow());
        } else {
            eprintln!("  [WARN] {}", message);
        }
    }

    /// Print an error message
    pub fn error(&self, message: &str) {
        if self.colored {
            eprintln!("  {} {}", "✗".red().bold(), message.red());
        } else {
            eprintln!("  [ERROR] {}", message);
        }
    }

    /// Print a header for a section
    pub fn header(&self, title: &str) {
        if self.colored {
            println!("\n  {}", title.bright_white().bold().underline());
        } else {
            println!("\n  === {} ===", title);
        }
    }

    /// Print a key-value pair
    pub fn kv(&self, key: &str, value: &str) {
        if self.colored {
            println!("    {}: {}", key.dimmed(), value.bright_white());
        } else {
            println!("    {}: {}", key, value);
        }
    }

    /// Print a list item
    pub fn list_item(&self, item: &str) {
        if self.colored {
            println!("    {} {}", "•".blue(), item);
        } else {
            println!("    - {}", item);
        }
    }

    /// Print a tool with its description
    pub fn tool(&self, name: &str, description: &str) {
        let description = first_line(description);
        if self.colored {
            println!("    {} {}", name.bright_cyan().bold(), description.dimmed());
        } else {
            println!("    {} {}", name, description);
        }
    }

    /// Print one streamed agent decision to stderr
    pub fn event(&self, event: &AgentEvent) {
        eprintln!("{}", self.format_event(event));
    }

    /// Render a streamed agent decision as a single line.
    pub fn format_event(&self, event: &AgentEvent) -> String {
        let calls: Vec<String> = event
            .tool_calls
            .iter()
            .map(|call| match &call.query {
                Some(query) => format!("{}({:?})", call.name, query),
                None => call.name.clone(),
            })
            .collect();
        let calls = calls.join(", ");
        let text = event.text.replace('\n', " ");
        let time = event.timestamp.format("%H:%M:%S").to_string();

        if self.colored {
            let mut line = format!(
                "  {} {}",
                time.dimmed(),
                format!("[{}]", event.node).magenta().bold()
            );
            if !calls.is_empty() {
                line.push_str(&format!(" {} {}", "→".blue(), calls.cyan()));
            }
            if !text.trim().is_empty() {
                line.push_str(&format!(" {}", text.trim().dimmed()));
            }
            line
        } else {
            let mut line = format!("  {} [{}]", time, event.node);
            if !calls.is_empty() {
                line.push_str(&format!(" -> {}", calls));
            }
            if !text.trim().is_empty() {
                line.push_str(&format!(" {}", text.trim()));
            }
            line
        }
    }

    /// Print the final report to stdout, with a short summary on stderr
    pub fn report(&self, outcome: &ResearchOutcome) {
        let summary = format!(
            "{} sections, {} delegation rounds, {} supervisor decisions",
            outcome.completed_sections.len(),
            outcome.delegation_rounds,
            outcome.supervisor_iterations
        );
        if outcome.report_complete {
            self.success(&summary);
        } else {
            self.warning(&format!(
                "Report incomplete ({}): {}",
                outcome.finish_reason, summary
            ));
        }

        if outcome.final_report.is_empty() {
            self.warning("The supervisor did not write a report");
            return;
        }
        println!("\n{}", outcome.final_report);
    }

    /// Print newline
    pub fn newline(&self) {
        println!();
    }
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or("").trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::research::events::ToolCallSummary;
    use chrono::TimeZone;
    use chrono::Utc;

    fn event() -> AgentEvent {
        AgentEvent {
            node: "researcher:VIT-60872 Details".to_string(),
            tool_calls: vec![
                ToolCallSummary {
                    name: "search_jira_issues".to_string(),
                    query: Some("VIT-60872".to_string()),
                },
                ToolCallSummary {
                    name: "FinishResearch".to_string(),
                    query: None,
                },
            ],
            text: "looking\nup".to_string(),
            timestamp: Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap(),
        }
    }

    #[test]
    fn test_output_constructors() {
        assert!(Output::new().colored);
        assert!(!Output::no_color().colored);
        assert!(Output::default().colored);
    }

    #[test]
    fn test_plain_event_line() {
        let line = Output::no_color().format_event(&event());
        assert_eq!(
            line,
            "  03:04:05 [researcher:VIT-60872 Details] -> search_jira_issues(\"VIT-60872\"), FinishResearch looking up"
        );
    }

    #[test]
    fn test_event_without_calls_or_text() {
        let mut quiet = event();
        quiet.tool_calls.clear();
        quiet.text = "   ".to_string();
        assert_eq!(
            Output::no_color().format_event(&quiet),
            "  03:04:05 [researcher:VIT-60872 Details]"
        );
    }

    #[test]
    fn test_colored_event_keeps_content() {
        let line = Output::new().format_event(&event());
        assert!(line.contains("researcher:VIT-60872 Details"));
        assert!(line.contains("search_jira_issues"));
    }

    #[test]
    fn test_first_line() {
        assert_eq!(first_line("Search tickets.\nMore detail"), "Search tickets.");
        assert_eq!(first_line(""), "");
    }

    #[test]
    fn test_output_methods_no_panic() {
        for output in [Output::new(), Output::no_color()] {
            output.banner();
            output.success("test success");
            output.info("test info");
            output.warning("test warning");
            output.error("test error");
            output.header("Test Header");
            output.kv("key", "value");
            output.list_item("item");
            output.tool("search_jira_issues", "Search JIRA.\nDetails");
            output.event(&event());
            output.newline();
        }
    }
}
