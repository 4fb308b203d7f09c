//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Request head
//!     → limits.rs (declared Content-Length vs. cap → 413 before reading)
//!     → limits.rs (read body, abort with 413 once the cap is crossed)
//!
//! Request path
//!     → routing::path (traversal → 400, normal components only)
//! ```
//!
//! # Design Decisions
//! - Limits checked before full reading (early rejection)
//! - Chunked bodies without a declared length are still capped while reading

pub mod limits;
