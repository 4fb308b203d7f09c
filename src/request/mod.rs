//! Request normalization subsystem.
//!
//! # Data Flow
//! ```text
//! request head (method, URI, headers) + fully read body bytes
//!     → normalize.rs (content-type dispatch)
//!         application/json                  → text + json
//!         application/x-www-form-urlencoded → text + form   (form.rs)
//!         multipart/form-data               → form + files  (multipart.rs)
//!         anything else                     → text if UTF-8, raw bytes always
//!     → UnifiedRequest (types.rs)
//! ```
//!
//! # Design Decisions
//! - The body is read once, completely, before any parsing
//! - Parse failures never fail the request; fields are left empty instead
//! - Text decoding drops invalid byte sequences rather than substituting
//!   replacement characters (charset.rs)

pub mod charset;
pub mod form;
pub mod multipart;
pub mod normalize;
pub mod types;

pub use normalize::{media_type, normalize};
pub use types::{FieldValue, Params, UnifiedRequest, UploadedFile};
