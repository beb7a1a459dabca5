//! Zero-value scanning and restoration.
//!
//! Resolvers usually deserialize the hook input into typed structs and
//! serialize them back. Serializers that skip default fields drop empty
//! strings, `false`, `0` and `null` on the way, so the gateway sees fields
//! vanish that the client did send. [`scan`] remembers every such leaf in
//! the inbound document and [`restore`] puts back the ones the output lost.
//!
//! Restoration only fills gaps. A path that exists in the output, even as
//! an explicit `null`, is left alone.

use crate::path::JsonPath;
use serde_json::{Number, Value};

/// JSON kind of a recorded zero value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ZeroKind {
    /// `null`
    Null,
    /// `""`
    String,
    /// `false`
    Boolean,
    /// A number that truncates to zero.
    Number,
}

/// A zero-valued leaf found by [`scan`].
#[derive(Debug, Clone, PartialEq)]
pub struct ZeroValueRecord {
    /// Where the leaf sits, relative to the scan prefix.
    pub path: JsonPath,
    /// The leaf itself.
    pub value: Value,
    /// Its kind.
    pub kind: ZeroKind,
}

impl ZeroValueRecord {
    /// The value as a JSON literal. Strings come out quoted.
    pub fn raw(&self) -> String {
        self.value.to_string()
    }
}

/// Classifies a scalar. Containers are never zero.
pub fn zero_kind(value: &Value) -> Option<ZeroKind> {
    match value {
        Value::Null => Some(ZeroKind::Null),
        Value::String(s) if s.is_empty() => Some(ZeroKind::String),
        Value::Bool(false) => Some(ZeroKind::Boolean),
        Value::Number(n) if number_is_zero(n) => Some(ZeroKind::Number),
        _ => None,
    }
}

// Integer comparison after coercion: 0.9 and -0.5 count as zero.
fn number_is_zero(n: &Number) -> bool {
    if let Some(i) = n.as_i64() {
        return i == 0;
    }
    if n.is_u64() {
        return false;
    }
    n.as_f64().is_some_and(|f| f.trunc() == 0.0)
}

/// Records every zero leaf of `doc`, depth-first in document order.
///
/// Paths are relative to `doc`.
pub fn scan(doc: &Value) -> Vec<ZeroValueRecord> {
    scan_at(doc, &JsonPath::root())
}

/// Like [`scan`], with every recorded path prefixed by `prefix`.
pub fn scan_at(doc: &Value, prefix: &JsonPath) -> Vec<ZeroValueRecord> {
    let mut records = Vec::new();
    visit(doc, prefix.clone(), &mut records);
    records
}

fn visit(node: &Value, path: JsonPath, records: &mut Vec<ZeroValueRecord>) {
    match node {
        Value::Object(map) => {
            for (key, child) in map {
                visit(child, path.child(key.as_str()), records);
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                visit(child, path.child(index), records);
            }
        }
        scalar => {
            if let Some(kind) = zero_kind(scalar) {
                records.push(ZeroValueRecord {
                    path,
                    value: scalar.clone(),
                    kind,
                });
            }
        }
    }
}

/// Inserts each record into `target` where its path is absent.
///
/// Records are applied in order. Returns how many were inserted.
pub fn restore(records: &[ZeroValueRecord], target: &mut Value) -> usize {
    records
        .iter()
        .filter(|record| record.path.insert_if_absent(target, record.value.clone()))
        .count()
}

/// Byte-level [`restore`]: parses `output`, fills the gaps and re-encodes.
///
/// With no records the output is returned as is.
pub fn restore_bytes(
    records: &[ZeroValueRecord],
    output: &[u8],
) -> Result<Vec<u8>, serde_json::Error> {
    if records.is_empty() {
        return Ok(output.to_vec());
    }
    let mut doc: Value = serde_json::from_slice(output)?;
    if restore(records, &mut doc) == 0 {
        return Ok(output.to_vec());
    }
    serde_json::to_vec(&doc)
}
