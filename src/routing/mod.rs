//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Decoded request path
//!     → path.rs (traversal check, segments)
//!     → resolver.rs
//!         1. <root>/<segments>.rhai defines handle_request → single-handler
//!         2. <root>/<all but last>.rhai defines <last>      → module-function
//!     → HandlerDescriptor + loaded unit, or a DispatchError
//! ```
//!
//! # Design Decisions
//! - No route table: the filesystem is the route table
//! - Deterministic: same tree and path always give the same descriptor
//! - Private functions are never routable

pub mod path;
pub mod resolver;

pub use resolver::{HandlerDescriptor, InvocationStyle, Resolution, Resolver, ENTRY_ROUTINE};
