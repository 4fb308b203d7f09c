//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (router, middleware stack, config swaps)
//!     → governor (admission token, waits when saturated)
//!     → dispatch.rs
//!         POST     → body cap → normalize → resolve → invoke → coerce
//!         GET/HEAD → static_files.rs
//!         OPTIONS  → 204 (answered before admission)
//!     → CORS + x-request-id headers
//!     → Send to client
//! ```

pub mod dispatch;
pub mod server;
pub mod static_files;

pub use server::{AppState, HttpServer};
