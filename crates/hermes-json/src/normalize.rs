//! Output rewriting keyed by hook kind.
//!
//! [`Normalizer`] holds one rewrite per hook kind. Kinds without an entry
//! pass the resolver output through unchanged. The defaults are:
//!
//! | Hook | Rewrite |
//! |---|---|
//! | `mutatingPreResolve` | restore zero values of `input`, then strip zero timestamps |
//! | `mutatingPostResolve` | promote `response.dataAny` over `response.data` |

use crate::path::JsonPath;
use crate::promote::promote_any_data_bytes;
use crate::zero::{restore_bytes, scan_at};
use crate::zero_time::strip_zero_timestamps;
use hermes_core::MiddlewareHook;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::OnceLock;

/// A rewrite from (inbound request body, resolver output) to new output.
pub type RewriteFn = fn(input: &[u8], output: &[u8]) -> Result<Vec<u8>, serde_json::Error>;

/// Dispatch table of output rewrites.
///
/// # Example
///
/// ```
/// use hermes_core::MiddlewareHook;
/// use hermes_json::Normalizer;
///
/// let normalizer = Normalizer::default();
/// let out = normalizer.normalize(
///     MiddlewareHook::MutatingPostResolve,
///     b"{}",
///     br#"{"response":{"data":{},"dataAny":[1]}}"#,
/// );
/// assert_eq!(out, br#"{"response":{"data":[1],"dataAny":[1]}}"#);
/// ```
#[derive(Debug, Clone)]
pub struct Normalizer {
    rewrites: HashMap<MiddlewareHook, RewriteFn>,
}

impl Normalizer {
    /// A table with no rewrites at all.
    pub fn empty() -> Self {
        Self {
            rewrites: HashMap::new(),
        }
    }

    /// Adds or replaces the rewrite for `hook`.
    pub fn with_rewrite(mut self, hook: MiddlewareHook, rewrite: RewriteFn) -> Self {
        self.rewrites.insert(hook, rewrite);
        self
    }

    /// Returns `true` if `hook` has a rewrite.
    pub fn rewrites(&self, hook: MiddlewareHook) -> bool {
        self.rewrites.contains_key(&hook)
    }

    /// Applies the rewrite registered for `hook`, if any.
    ///
    /// Never fails. A rewrite that cannot parse its arguments leaves the
    /// output as the resolver produced it.
    pub fn normalize(&self, hook: MiddlewareHook, input: &[u8], output: &[u8]) -> Vec<u8> {
        let Some(rewrite) = self.rewrites.get(&hook) else {
            return output.to_vec();
        };
        match rewrite(input, output) {
            Ok(rewritten) => rewritten,
            Err(err) => {
                tracing::warn!(hook = %hook, error = %err, "Output rewrite skipped");
                output.to_vec()
            }
        }
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::empty()
            .with_rewrite(MiddlewareHook::MutatingPreResolve, restore_input_zero_values)
            .with_rewrite(MiddlewareHook::MutatingPostResolve, promote_any_data_bytes_ignoring_input)
    }
}

/// Applies the default table.
pub fn normalize(hook: MiddlewareHook, input: &[u8], output: &[u8]) -> Vec<u8> {
    static DEFAULT: OnceLock<Normalizer> = OnceLock::new();
    DEFAULT
        .get_or_init(Normalizer::default)
        .normalize(hook, input, output)
}

/// The `mutatingPreResolve` rewrite.
///
/// Zero leaves under the request's `input` are put back at the same
/// `input.*` paths of the output, then zero timestamps are stripped.
pub fn restore_input_zero_values(input: &[u8], output: &[u8]) -> Result<Vec<u8>, serde_json::Error> {
    let request: Value = serde_json::from_slice(input)?;
    let records = match request.get("input") {
        Some(node) => scan_at(node, &JsonPath::root().child("input")),
        None => Vec::new(),
    };
    let restored = restore_bytes(&records, output)?;
    Ok(strip_zero_timestamps(&restored))
}

fn promote_any_data_bytes_ignoring_input(
    _input: &[u8],
    output: &[u8],
) -> Result<Vec<u8>, serde_json::Error> {
    promote_any_data_bytes(output)
}
