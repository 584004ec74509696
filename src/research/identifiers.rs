//! Cross-reference identifier extraction.
//!
//! Three independent pattern families are matched case-insensitively:
//! ticket keys (`VIT-60872`, `CR1234`), feature codes (`MTV2005`) and
//! changelist references (`CL 27235273`, `changelist #1234567`).

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

// Literal patterns; compilation cannot fail.
// Ticket and feature prefixes must not follow a letter (`SCR-123`), but may
// follow `_` or a digit and run straight into a suffix (`VIT-60872_fix.cpp`).
static TICKET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|[^A-Za-z])(VIT|VFIT|CR|INC)-?(\d+)").expect("ticket pattern")
});

static FEATURE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:^|[^A-Za-z])(MTV\d{3,})").expect("feature pattern"));

static CHANGELIST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:CL|changelist)\s*[:#]?\s*(\d{6,8})\b").expect("changelist pattern")
});

/// Identifiers found in a piece of text, each list in first-occurrence order
/// without repeats.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identifiers {
    /// Ticket keys, normalized to `PREFIX-DIGITS` in upper case
    pub tickets: Vec<String>,
    /// Feature codes in upper case
    pub features: Vec<String>,
    /// Changelist numbers (digits only)
    pub changelists: Vec<String>,
}

/// Extract every identifier from `text`.
pub fn extract(text: &str) -> Identifiers {
    let mut ids = Identifiers::default();

    for caps in TICKET_RE.captures_iter(text) {
        let key = format!("{}-{}", caps[1].to_ascii_uppercase(), &caps[2]);
        push_unique(&mut ids.tickets, key);
    }
    for caps in FEATURE_RE.captures_iter(text) {
        push_unique(&mut ids.features, caps[1].to_ascii_uppercase());
    }
    for caps in CHANGELIST_RE.captures_iter(text) {
        push_unique(&mut ids.changelists, caps[1].to_string());
    }

    ids
}

fn push_unique(list: &mut Vec<String>, value: String) -> bool {
    if list.contains(&value) {
        false
    } else {
        list.push(value);
        true
    }
}

impl Identifiers {
    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty() && self.features.is_empty() && self.changelists.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tickets.len() + self.features.len() + self.changelists.len()
    }

    /// Add everything from `other`, returning only what was not known before.
    pub fn absorb(&mut self, other: Identifiers) -> Identifiers {
        let mut fresh = Identifiers::default();
        for t in other.tickets {
            if push_unique(&mut self.tickets, t.clone()) {
                fresh.tickets.push(t);
            }
        }
        for f in other.features {
            if push_unique(&mut self.features, f.clone()) {
                fresh.features.push(f);
            }
        }
        for c in other.changelists {
            if push_unique(&mut self.changelists, c.clone()) {
                fresh.changelists.push(c);
            }
        }
        fresh
    }
}

fn render(list: &[String]) -> String {
    if list.is_empty() {
        "None found".to_string()
    } else {
        list.join(", ")
    }
}

/// Prompt rendering.
impl fmt::Display for Identifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "- Tickets: {}", render(&self.tickets))?;
        writeln!(f, "- Feature codes: {}", render(&self.features))?;
        write!(f, "- Changelists: {}", render(&self.changelists))
    }
}
