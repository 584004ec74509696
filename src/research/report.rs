//! Report assembly.
//!
//! Section bodies always follow the supervisor's declared order, never the
//! order workers happened to finish in.

use crate::research::schemas::{Conclusion, Introduction, Section};
use crate::research::state::CompletedSections;

const SEPARATOR: &str = "\n\n";

pub fn introduction_block(intro: &Introduction) -> String {
    format!("# {}\n\n{}", intro.name, intro.content)
}

pub fn conclusion_block(conclusion: &Conclusion) -> String {
    format!("## {}\n\n{}", conclusion.name, conclusion.content)
}

/// Completed sections in declared order.
///
/// Completed sections that are no longer declared (an earlier section list
/// was replaced) follow in completion order. Declared names without a
/// completed section are skipped.
pub fn ordered_sections<'a>(declared: &[String], completed: &'a CompletedSections) -> Vec<&'a Section> {
    let mut ordered: Vec<&Section> = Vec::with_capacity(completed.len());
    for name in declared {
        if let Some(section) = completed.get(name) {
            if !ordered.iter().any(|s| s.name == section.name) {
                ordered.push(section);
            }
        }
    }
    for section in completed.iter() {
        if !ordered.iter().any(|s| s.name == section.name) {
            ordered.push(section);
        }
    }
    ordered
}

/// Section contents in the order of [`ordered_sections`].
pub fn ordered_bodies<'a>(declared: &[String], completed: &'a CompletedSections) -> Vec<&'a str> {
    ordered_sections(declared, completed)
        .into_iter()
        .map(|s| s.content.as_str())
        .collect()
}

/// `introduction + "\n\n" + bodies joined by "\n\n" + "\n\n" + conclusion`
pub fn assemble(
    introduction: &str,
    declared: &[String],
    completed: &CompletedSections,
    conclusion: &str,
) -> String {
    let body = ordered_bodies(declared, completed).join(SEPARATOR);
    [introduction, body.as_str(), conclusion].join(SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(name: &str) -> Section {
        Section {
            name: name.to_string(),
            description: String::new(),
            content: format!("{} body", name),
        }
    }

    fn declared(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_blocks() {
        let intro = Introduction {
            name: "MTV2005 Report".to_string(),
            content: "Overview".to_string(),
        };
        let conclusion = Conclusion {
            name: "Summary".to_string(),
            content: "Done".to_string(),
        };
        assert_eq!(introduction_block(&intro), "# MTV2005 Report\n\nOverview");
        assert_eq!(conclusion_block(&conclusion), "## Summary\n\nDone");
    }

    #[test]
    fn test_declared_order_wins_over_completion_order() {
        let mut completed = CompletedSections::new();
        for name in ["C", "A", "B"] {
            completed.merge(section(name)).unwrap();
        }

        let report = assemble("# T\n\ni", &declared(&["A", "B", "C"]), &completed, "## E\n\nc");
        assert_eq!(report, "# T\n\ni\n\nA body\n\nB body\n\nC body\n\n## E\n\nc");
    }

    #[test]
    fn test_every_completion_order_gives_same_report() {
        let orders = [
            ["A", "B", "C"],
            ["A", "C", "B"],
            ["B", "A", "C"],
            ["B", "C", "A"],
            ["C", "A", "B"],
            ["C", "B", "A"],
        ];
        let names = declared(&["A", "B", "C"]);
        let reports: Vec<String> = orders
            .iter()
            .map(|order| {
                let mut completed = CompletedSections::new();
                for name in order {
                    completed.merge(section(name)).unwrap();
                }
                assemble("intro", &names, &completed, "outro")
            })
            .collect();

        assert!(reports.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn test_undeclared_sections_follow_declared_ones() {
        let mut completed = CompletedSections::new();
        completed.merge(section("Old")).unwrap();
        completed.merge(section("New")).unwrap();

        let bodies = ordered_bodies(&declared(&["New", "New"]), &completed);
        assert_eq!(bodies, vec!["New body", "Old body"]);
    }
}
