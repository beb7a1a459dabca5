//! Promotion of `response.dataAny` over `response.data`.
//!
//! A resolver whose declared response type cannot express what it wants to
//! return puts the value into `response.dataAny` instead. Before the output
//! goes back to the gateway that value replaces `response.data`.

use serde_json::Value;
use std::sync::OnceLock;

use crate::path::JsonPath;

fn data_path() -> &'static JsonPath {
    static PATH: OnceLock<JsonPath> = OnceLock::new();
    PATH.get_or_init(|| JsonPath::from(vec!["response".into(), "data".into()]))
}

fn data_any_path() -> &'static JsonPath {
    static PATH: OnceLock<JsonPath> = OnceLock::new();
    PATH.get_or_init(|| JsonPath::from(vec!["response".into(), "dataAny".into()]))
}

/// Copies `response.dataAny` over `response.data`.
///
/// `dataAny` stays in place. An explicit `null` in `dataAny` is promoted
/// like any other value. Returns `false` when there was nothing to promote.
pub fn promote_any_data(doc: &mut Value) -> bool {
    let Some(any) = data_any_path().get(doc).cloned() else {
        return false;
    };
    data_path().set(doc, any)
}

/// Byte-level [`promote_any_data`]. Without `dataAny` the bytes come back as is.
pub fn promote_any_data_bytes(output: &[u8]) -> Result<Vec<u8>, serde_json::Error> {
    let mut doc: Value = serde_json::from_slice(output)?;
    if !promote_any_data(&mut doc) {
        return Ok(output.to_vec());
    }
    serde_json::to_vec(&doc)
}
