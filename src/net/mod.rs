//! Admission control subsystem.
//!
//! # Data Flow
//! ```text
//! Accepted connection (never gated)
//!     → request arrives
//!     → governor.rs (wait for an admission token)
//!     → body read → (blocking pool) normalize → resolve → invoke → respond
//!     → last lease clone dropped, next waiter admitted
//! ```
//!
//! # Design Decisions
//! - Bounded processing, unbounded acceptance
//! - Saturation delays requests, it never rejects them
//! - Tokens are RAII guards so every exit path releases them

pub mod governor;

pub use governor::{admission_middleware, AdmissionLease, AdmissionToken, Governor};
