//! The API description document.
//!
//! # Responsibilities
//! - Deduplicate entries by (path, method), first one wins
//! - Order entries by (path, method)
//! - Render the JSON document served at `/__api/spec`
//!
//! # Design Decisions
//! - Built from scratch for every request; nothing is cached
//! - JSON object keys come out sorted, so an unchanged tree always renders
//!   to the same bytes

use std::collections::HashSet;

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::config::DocsConfig;
use crate::docs::docstring::ParamDoc;
use crate::routing::InvocationStyle;

/// Content types every handler accepts.
const REQUEST_CONTENT_TYPES: [(&str, &str); 4] = [
    ("application/json", "object"),
    ("application/x-www-form-urlencoded", "object"),
    ("multipart/form-data", "object"),
    ("text/plain", "string"),
];

/// One documented endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiEntry {
    pub path: String,
    pub method: String,
    pub summary: String,
    pub description: String,
    pub params: Vec<ParamDoc>,
    /// Unit id relative to the handler root.
    pub source: String,
    pub kind: InvocationStyle,
}

/// Deduplicated, sorted entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiSpec {
    entries: Vec<ApiEntry>,
}

impl ApiSpec {
    pub fn new(mut entries: Vec<ApiEntry>) -> Self {
        let mut seen = HashSet::new();
        entries.retain(|e| seen.insert((e.path.clone(), e.method.clone())));
        entries.sort_by(|a, b| (&a.path, &a.method).cmp(&(&b.path, &b.method)));
        Self { entries }
    }

    pub fn entries(&self) -> &[ApiEntry] {
        &self.entries
    }

    /// Render the JSON document. `host` fills `servers` when known.
    pub fn to_document(&self, info: &DocsConfig, host: Option<&str>) -> Value {
        let mut paths = Map::new();
        for entry in &self.entries {
            let methods = paths
                .entry(entry.path.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(methods) = methods {
                methods.insert(entry.method.to_ascii_lowercase(), operation(entry));
            }
        }

        let servers: Vec<Value> = host
            .map(|host| json!({ "url": format!("http://{host}") }))
            .into_iter()
            .collect();

        json!({
            "openapi": "3.0.0-min",
            "info": {
                "title": info.title,
                "version": info.version,
                "description": info.description,
            },
            "servers": servers,
            "paths": paths,
        })
    }
}

fn operation(entry: &ApiEntry) -> Value {
    let content: Map<String, Value> = REQUEST_CONTENT_TYPES
        .iter()
        .map(|(content_type, schema)| {
            (
                content_type.to_string(),
                json!({ "schema": { "type": schema } }),
            )
        })
        .collect();

    json!({
        "summary": entry.summary,
        "description": entry.description,
        "parameters": entry.params,
        "requestBody": { "content": content },
        "responses": {
            "200": { "description": "Success" },
            "500": { "description": "Handler error" },
        },
        "x-source": entry.source,
        "x-kind": entry.kind,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(path: &str, source: &str) -> ApiEntry {
        ApiEntry {
            path: path.into(),
            method: "POST".into(),
            summary: format!("from {source}"),
            description: String::new(),
            params: Vec::new(),
            source: source.into(),
            kind: InvocationStyle::ModuleFunction,
        }
    }

    #[test]
    fn test_dedupe_keeps_first_and_sorts() {
        let spec = ApiSpec::new(vec![
            entry("/b", "first"),
            entry("/a", "a"),
            entry("/b", "second"),
        ]);
        let paths: Vec<_> = spec.entries().iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["/a", "/b"]);
        assert_eq!(spec.entries()[1].source, "first");
    }

    #[test]
    fn test_document_shape() {
        let spec = ApiSpec::new(vec![entry("/users/list", "users.rhai")]);
        let doc = spec.to_document(&DocsConfig::default(), Some("localhost:8000"));

        assert_eq!(doc["openapi"], "3.0.0-min");
        assert_eq!(doc["info"]["title"], "Treeserve API");
        assert_eq!(doc["servers"][0]["url"], "http://localhost:8000");

        let op = &doc["paths"]["/users/list"]["post"];
        assert_eq!(op["summary"], "from users.rhai");
        assert_eq!(op["x-source"], "users.rhai");
        assert_eq!(op["x-kind"], "module-function");
        assert_eq!(
            op["requestBody"]["content"]["text/plain"]["schema"]["type"],
            "string"
        );
    }

    #[test]
    fn test_no_host_no_servers() {
        let doc = ApiSpec::default().to_document(&DocsConfig::default(), None);
        assert_eq!(doc["servers"], json!([]));
        assert_eq!(doc["paths"], json!({}));
    }
}
