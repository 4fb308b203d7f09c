//! Static API documentation.
//!
//! # Data Flow
//! ```text
//! handler root ──walk──▶ unit sources ──parse only──▶ outlines
//!                                                        │
//!                         docstrings ◀───────────────────┘
//!                              │
//!                              ▼
//!                    entries ──dedupe/sort──▶ ApiSpec ──▶ JSON document
//! ```
//!
//! Nothing here loads units into the handler engine, so building the
//! document never runs handler code.

pub mod docstring;
pub mod inspect;
pub mod page;
pub mod scanner;
pub mod spec;

pub use docstring::{parse_doc, DocText, ParamDoc};
pub use page::DOCS_PAGE;
pub use spec::{ApiEntry, ApiSpec};

use serde_json::Value;

use crate::config::ServerConfig;

/// Scan the handler root and render the document.
pub fn build_document(config: &ServerConfig, host: Option<&str>) -> Value {
    ApiSpec::new(scanner::discover(&config.handlers)).to_document(&config.docs, host)
}
