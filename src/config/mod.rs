//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ServerConfig (validated)
//!     → shared via ArcSwap to the request pipeline
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → update sent to the server task
//!     → atomic swap, next request observes the new config
//! ```
//!
//! # Design Decisions
//! - All fields have defaults so an empty file (or no file) is a valid config
//! - Validation separates syntactic (serde) from semantic checks
//! - Listener address and admission token count are fixed at startup;
//!   everything read per request can change live

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{
    DocsConfig, HandlerConfig, LimitsConfig, ListenerConfig, ObservabilityConfig, ServerConfig,
    StaticFilesConfig, TimeoutConfig,
};
