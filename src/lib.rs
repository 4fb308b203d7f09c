//! Convention-driven HTTP framework.
//!
//! A URL path is resolved to a routine in a Rhai handler unit under the
//! handler root, by file layout alone. Request bodies are normalized into a
//! single request map, return values are coerced into JSON envelopes, and the
//! API description is derived by parsing (never running) the units.

// Core subsystems
pub mod config;
pub mod http;
pub mod net;
pub mod request;
pub mod response;
pub mod routing;

// Handler units
pub mod docs;
pub mod handlers;

// Cross-cutting concerns
pub mod error;
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::ServerConfig;
pub use error::DispatchError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
