//! Handler unit subsystem.
//!
//! # Data Flow
//! ```text
//! resolved unit path
//!     → loader.rs (read source, compare with cached copy,
//!                  recompile + run top level on change, keep old copy on failure)
//!     → HandlerUnit (compiled AST + public routine names)
//!
//! UnifiedRequest
//!     → value.rs (request as a script object map)
//!     → invoke.rs (call routine; retry once with the text body on a shape mismatch)
//!     → value.rs (classify the returned Dynamic)
//!     → HandlerOutput
//! ```
//!
//! # Design Decisions
//! - One engine shared by every unit; units only differ by AST
//! - Reload is a source comparison, not a timestamp check, so two edits
//!   within one clock tick are still seen
//! - Concurrent reloads of one unit are not serialized; the last insert wins

pub mod engine;
pub mod invoke;
pub mod loader;
pub mod value;

pub use engine::handler_engine;
pub use invoke::{invoke, InvokeError};
pub use loader::{HandlerUnit, LoadError, UnitLoader};
