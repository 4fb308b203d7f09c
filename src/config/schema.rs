//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Default cap on a request body: 64 MiB.
pub const DEFAULT_MAX_BODY_BYTES: u64 = 64 * 1024 * 1024;

/// Default number of admission tokens.
pub const DEFAULT_MAX_CONCURRENCY: usize = 32;

/// Root configuration for the server.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Where handler units live and how they are loaded.
    pub handlers: HandlerConfig,

    /// Body size and concurrency limits.
    pub limits: LimitsConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// API documentation endpoints.
    pub docs: DocsConfig,

    /// Static file serving for GET requests.
    pub static_files: StaticFilesConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".to_string(),
        }
    }
}

/// Handler unit discovery and loading.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct HandlerConfig {
    /// Directory that URL paths are resolved against.
    pub root: PathBuf,

    /// File extension of handler units, without the dot.
    pub extension: String,

    /// Recompile a unit whenever its source changed since the last load.
    pub hot_reload: bool,

    /// Unit path (relative to `root`) that is never routed or documented.
    pub entry_unit: Option<String>,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            extension: "rhai".to_string(),
            hot_reload: true,
            entry_unit: None,
        }
    }
}

impl HandlerConfig {
    /// True when `id` names the configured entry unit.
    pub fn is_entry_unit(&self, id: &str) -> bool {
        self.entry_unit
            .as_deref()
            .is_some_and(|entry| Path::new(entry) == Path::new(id))
    }
}

/// Request limits.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum request body size in bytes.
    pub max_body_bytes: u64,

    /// Number of requests processed at once. Extra requests wait.
    pub max_concurrency: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Total request timeout in seconds. Unset means requests run to completion.
    pub request_secs: Option<u64>,
}

/// API documentation endpoints.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct DocsConfig {
    pub enabled: bool,
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Default for DocsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            title: "Treeserve API".to_string(),
            version: "0.1".to_string(),
            description: "Endpoints discovered from handler units under the handler root."
                .to_string(),
        }
    }
}

/// Static file serving.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct StaticFilesConfig {
    pub enabled: bool,

    /// File served for directory requests.
    pub index_file: String,
}

impl Default for StaticFilesConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            index_file: "index.html".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level when RUST_LOG is not set.
    pub log_level: String,

    /// Emit logs as JSON lines.
    pub json_logs: bool,

    /// Enable the Prometheus exporter.
    pub metrics_enabled: bool,

    /// Prometheus exporter address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
