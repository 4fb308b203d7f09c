//! Parse-only inspection of handler units.
//!
//! # Responsibilities
//! - Compile a unit's source into a syntax tree
//! - List its public top-level functions with their doc comments
//! - Read the unit's module documentation
//!
//! # Design Decisions
//! - Uses a raw engine and never evaluates the tree: no statement of the
//!   inspected unit runs, so inspection has no side effects
//! - Functions are ordered by (name, arity) so output does not depend on
//!   the engine's internal function table order

use rhai::{Engine, FnAccess, ParseError};

/// A public function found in a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutineOutline {
    pub name: String,
    pub arity: usize,
    /// Cleaned doc comment text, if any.
    pub doc: Option<String>,
}

/// What a unit declares.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitOutline {
    /// Cleaned `//!` module documentation, if any.
    pub doc: Option<String>,
    pub routines: Vec<RoutineOutline>,
}

/// Outline `source` without running it.
pub fn outline(source: &str) -> Result<UnitOutline, ParseError> {
    let engine = Engine::new_raw();
    let ast = engine.compile(source)?;

    let mut routines: Vec<RoutineOutline> = ast
        .iter_functions()
        .filter(|f| !matches!(f.access, FnAccess::Private))
        .map(|f| RoutineOutline {
            name: f.name.to_string(),
            arity: f.params.len(),
            doc: clean_comments(f.comments.iter().copied()),
        })
        .collect();
    routines.sort_by(|a, b| (&a.name, a.arity).cmp(&(&b.name, b.arity)));

    Ok(UnitOutline {
        doc: clean_comments(ast.doc().lines()),
        routines,
    })
}

/// Strip comment markers from `///`, `//!`, `/** */` and `/*! */` comments.
fn clean_comments<'a>(comments: impl Iterator<Item = &'a str>) -> Option<String> {
    let mut lines: Vec<String> = Vec::new();
    for comment in comments {
        let comment = comment.trim_start();
        if let Some(rest) = comment
            .strip_prefix("///")
            .or_else(|| comment.strip_prefix("//!"))
        {
            lines.push(strip_one_space(rest).trim_end().to_string());
        } else if let Some(block) = comment
            .strip_prefix("/**")
            .or_else(|| comment.strip_prefix("/*!"))
        {
            let block = block.strip_suffix("*/").unwrap_or(block);
            lines.extend(block.lines().map(clean_block_line));
        } else {
            lines.push(comment.trim_end().to_string());
        }
    }

    let text = dedent(&lines).trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn strip_one_space(text: &str) -> &str {
    text.strip_prefix(' ').unwrap_or(text)
}

/// ` * text` → `text`, keeping indentation past the star.
fn clean_block_line(line: &str) -> String {
    let trimmed = line.trim_start();
    match trimmed.strip_prefix('*') {
        Some(rest) => strip_one_space(rest).trim_end().to_string(),
        None => line.trim_end().to_string(),
    }
}

/// Remove the indentation shared by every non-blank line after the first.
fn dedent(lines: &[String]) -> String {
    let lines: Vec<&str> = lines
        .iter()
        .map(String::as_str)
        .skip_while(|l| l.trim().is_empty())
        .collect();
    let common = lines
        .iter()
        .skip(1)
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);

    lines
        .iter()
        .enumerate()
        .map(|(i, l)| {
            if i == 0 {
                l.trim_start()
            } else {
                l.get(common..).unwrap_or_else(|| l.trim_start())
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
