//! Walks the handler root and collects endpoint entries.
//!
//! # Responsibilities
//! - Visit every unit file, skipping VCS, cache, environment and hidden entries
//! - Derive each unit's convention path the way the resolver does
//! - Turn every public function into an [`ApiEntry`]
//!
//! # Design Decisions
//! - Units are only parsed (see inspect.rs), never loaded into the handler engine
//! - Walk order is sorted by file name, so "first discovered" is stable
//! - Unreadable or unparsable units are skipped, not reported

use std::fs;

use walkdir::{DirEntry, WalkDir};

use crate::config::HandlerConfig;
use crate::docs::docstring::{parse_doc, DocText};
use crate::docs::inspect::{outline, UnitOutline};
use crate::docs::spec::ApiEntry;
use crate::routing::path::{convention_path, unit_id};
use crate::routing::{InvocationStyle, ENTRY_ROUTINE};

/// Directory names never descended into.
const IGNORED_DIRS: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    "target",
    "node_modules",
    "__pycache__",
    "venv",
    ".venv",
    "env",
];

/// Collect entries for every unit under the handler root.
pub fn discover(config: &HandlerConfig) -> Vec<ApiEntry> {
    let root = &config.root;
    let mut entries = Vec::new();

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_ignored(e));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::debug!(error = %err, "Skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let Some(module_path) = convention_path(relative, &config.extension) else {
            continue;
        };
        let id = unit_id(relative);
        if config.is_entry_unit(&id) {
            continue;
        }

        let source = match fs::read_to_string(entry.path()) {
            Ok(source) => source,
            Err(err) => {
                tracing::debug!(unit = %id, error = %err, "Skipping unreadable unit");
                continue;
            }
        };
        match outline(&source) {
            Ok(outline) => entries.extend(unit_entries(&module_path, &id, &outline)),
            Err(err) => tracing::debug!(unit = %id, error = %err, "Skipping unit that does not parse"),
        }
    }

    entries
}

fn is_ignored(entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || (entry.file_type().is_dir() && IGNORED_DIRS.contains(&name.as_ref()))
}

fn unit_entries(module_path: &str, source: &str, outline: &UnitOutline) -> Vec<ApiEntry> {
    let module_doc = outline.doc.as_deref().map(parse_doc).unwrap_or_default();

    outline
        .routines
        .iter()
        .map(|routine| {
            let own = routine.doc.as_deref().map(parse_doc).unwrap_or_default();
            let doc = backfill(own, &module_doc);

            let (path, kind) = if routine.name == ENTRY_ROUTINE {
                (module_path.to_string(), InvocationStyle::SingleHandler)
            } else {
                (
                    format!("{module_path}/{}", routine.name),
                    InvocationStyle::ModuleFunction,
                )
            };

            ApiEntry {
                path,
                method: "POST".to_string(),
                summary: doc.summary,
                description: doc.description,
                params: doc.params,
                source: source.to_string(),
                kind,
            }
        })
        .collect()
}

/// Fill what a routine leaves undocumented from the module docs.
fn backfill(own: DocText, module: &DocText) -> DocText {
    if own.is_empty() {
        return module.clone();
    }
    DocText {
        summary: if own.summary.is_empty() {
            module.summary.clone()
        } else {
            own.summary
        },
        description: if own.description.is_empty() {
            module.description.clone()
        } else {
            own.description
        },
        params: own.params,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::TempDir;

    fn tree(files: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for (name, source) in files {
            let path = dir.path().join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, source).unwrap();
        }
        dir
    }

    fn config(root: &Path) -> HandlerConfig {
        HandlerConfig {
            root: root.to_path_buf(),
            ..HandlerConfig::default()
        }
    }

    #[test]
    fn test_entries_for_both_conventions() {
        let dir = tree(&[
            ("ping.rhai", "/// Health check.\nfn handle_request(req) { \"pong\" }"),
            (
                "api/users.rhai",
                "//! Users.\n//!\n//! User management.\n\n/// List users.\nfn list(req) { [] }\n\nfn create(req) { #{} }\n",
            ),
        ]);
        let entries = discover(&config(dir.path()));
        let summary: Vec<_> = entries
            .iter()
            .map(|e| (e.path.as_str(), e.summary.as_str(), e.kind))
            .collect();

        assert_eq!(
            summary,
            vec![
                ("/api/users/create", "Users.", InvocationStyle::ModuleFunction),
                ("/api/users/list", "List users.", InvocationStyle::ModuleFunction),
                ("/ping", "Health check.", InvocationStyle::SingleHandler),
            ]
        );
        assert_eq!(entries[0].description, "User management.");
        assert_eq!(entries[1].description, "User management.");
        assert_eq!(entries[0].source, "api/users.rhai");
    }

    #[test]
    fn test_ignored_hidden_and_entry_units() {
        let dir = tree(&[
            ("main.rhai", "fn handle_request(req) { 1 }"),
            (".hidden/a.rhai", "fn handle_request(req) { 1 }"),
            ("node_modules/b.rhai", "fn handle_request(req) { 1 }"),
            ("target/c.rhai", "fn handle_request(req) { 1 }"),
            ("notes.txt", "fn handle_request(req) { 1 }"),
            ("broken.rhai", "fn handle_request(req) {"),
            ("ok.rhai", "fn handle_request(req) { 1 }"),
        ]);
        let mut config = config(dir.path());
        config.entry_unit = Some("main.rhai".into());

        let paths: Vec<_> = discover(&config).into_iter().map(|e| e.path).collect();
        assert_eq!(paths, vec!["/ok"]);
    }

    #[test]
    fn test_backfill_keeps_own_text() {
        let module = parse_doc("Module.\n\nModule body.");
        let own = parse_doc("Own.");
        let doc = backfill(own, &module);
        assert_eq!(doc.summary, "Own.");
        assert_eq!(doc.description, "Module body.");
    }
}
