//! Response normalization subsystem.
//!
//! # Data Flow
//! ```text
//! routine return value (Dynamic)
//!     → handlers::value (classify into HandlerOutput)
//!     → coerce.rs (ordered coercion rules)
//!     → envelope.rs (ResponseEnvelope: status, content type, headers, bytes)
//!     → axum Response
//! ```
//!
//! # Design Decisions
//! - The return value is classified once into a closed set of variants;
//!   coercion is a single match over that set
//! - Framework errors and handler results share one envelope type

pub mod coerce;
pub mod envelope;

pub use coerce::{normalize, HandlerOutput};
pub use envelope::ResponseEnvelope;
