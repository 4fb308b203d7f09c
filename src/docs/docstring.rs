//! Documentation text → summary, description and parameters.
//!
//! ```text
//! Create a user.
//!
//! Stores the user and returns its id.
//!
//! Args:
//!     name (string): Display name.
//!     age (int): Age in years.
//! ```

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

static PARAM_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([A-Za-z_]\w*)\s*(?:\(([^)]*)\))?\s*:\s*(.*)$")
        .expect("parameter line pattern is valid")
});

/// One documented parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParamDoc {
    pub name: String,
    #[serde(rename = "type")]
    pub type_hint: String,
    pub description: String,
}

/// Parsed documentation of a routine or unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocText {
    pub summary: String,
    pub description: String,
    pub params: Vec<ParamDoc>,
}

impl DocText {
    pub fn is_empty(&self) -> bool {
        self.summary.is_empty() && self.description.is_empty() && self.params.is_empty()
    }
}

/// Parse documentation text.
///
/// The first line is the summary and everything after it the description.
/// A line starting with `Args:` or `Parameters:` opens a parameter block that
/// runs until the first non-indented line.
pub fn parse_doc(text: &str) -> DocText {
    let text = text.trim();
    if text.is_empty() {
        return DocText::default();
    }

    let lines: Vec<&str> = text.lines().map(str::trim_end).collect();
    let summary = lines[0].trim().to_string();
    let description = lines[1..].join("\n").trim().to_string();

    let mut params = Vec::new();
    let mut in_block = false;
    for line in &lines {
        let stripped = line.trim();
        let lower = stripped.to_ascii_lowercase();
        if lower.starts_with("args:") || lower.starts_with("parameters:") {
            in_block = true;
            continue;
        }
        if !in_block || stripped.is_empty() {
            continue;
        }
        if !line.starts_with([' ', '\t']) {
            in_block = false;
            continue;
        }
        if let Some(caps) = PARAM_LINE.captures(line) {
            params.push(ParamDoc {
                name: caps[1].to_string(),
                type_hint: caps
                    .get(2)
                    .map(|m| m.as_str().trim().to_string())
                    .unwrap_or_default(),
                description: caps[3].trim().to_string(),
            });
        }
    }

    DocText {
        summary,
        description,
        params,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_docstring() {
        let doc = parse_doc(
            "Create a user.\n\nStores the user.\n\nArgs:\n    name (string): Display name.\n    age (int): Age in years.\n    note: Free text.\nReturns the id.",
        );
        assert_eq!(doc.summary, "Create a user.");
        assert!(doc.description.starts_with("Stores the user."));
        assert!(doc.description.contains("Returns the id."));
        assert_eq!(
            doc.params,
            vec![
                ParamDoc {
                    name: "name".into(),
                    type_hint: "string".into(),
                    description: "Display name.".into()
                },
                ParamDoc {
                    name: "age".into(),
                    type_hint: "int".into(),
                    description: "Age in years.".into()
                },
                ParamDoc {
                    name: "note".into(),
                    type_hint: String::new(),
                    description: "Free text.".into()
                },
            ]
        );
    }

    #[test]
    fn test_block_ends_at_unindented_line() {
        let doc = parse_doc("S\nParameters:\n  a (x): one\nNot: a param\n  b (y): ignored");
        assert_eq!(doc.params.len(), 1);
        assert_eq!(doc.params[0].name, "a");
    }

    #[test]
    fn test_summary_only_and_empty() {
        let doc = parse_doc("  Ping.  ");
        assert_eq!(doc.summary, "Ping.");
        assert_eq!(doc.description, "");
        assert!(parse_doc("   \n ").is_empty());
    }
}
