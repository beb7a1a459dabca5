//! # Hermes JSON
//!
//! Schema-less rewriting of hook resolver output.
//!
//! - [`scan`] / [`restore`] - Put back zero values a typed resolver dropped
//! - [`strip_zero_timestamps`] - Remove unset `0001-01-01T00:00:00Z` members
//! - [`promote_any_data`] - Let `response.dataAny` override `response.data`
//! - [`Normalizer`] - Per-hook dispatch of the rewrites above
//!
//! All functions here are pure and synchronous. Object member order is
//! preserved through every parse and re-encode.

#![doc(html_root_url = "https://docs.rs/hermes-json/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod normalize;
mod path;
mod promote;
mod zero;
mod zero_time;

pub use normalize::{normalize, restore_input_zero_values, Normalizer, RewriteFn};
pub use path::{JsonPath, PathParseError, PathSegment};
pub use promote::{promote_any_data, promote_any_data_bytes};
pub use zero::{restore, restore_bytes, scan, scan_at, zero_kind, ZeroKind, ZeroValueRecord};
pub use zero_time::{strip_zero_timestamps, ZERO_INSTANT};
