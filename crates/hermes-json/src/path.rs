//! Paths into untyped JSON documents.

use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// One step of a [`JsonPath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// An object member.
    Key(String),
    /// A zero-based array element.
    Index(usize),
}

impl PathSegment {
    /// An empty container able to hold this segment.
    fn empty_container(&self) -> Value {
        match self {
            Self::Key(_) => Value::Object(serde_json::Map::new()),
            Self::Index(_) => Value::Array(Vec::new()),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        Self::Key(key.to_string())
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

/// Position of a node inside a JSON document.
///
/// Rendered with dots between keys and `[n]` for array indices, so
/// `JsonPath::parse("input.tags[2]")` addresses the third tag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct JsonPath(Vec<PathSegment>);

impl JsonPath {
    /// The document root.
    #[must_use]
    pub const fn root() -> Self {
        Self(Vec::new())
    }

    /// Parses a dotted path with optional `[n]` suffixes.
    pub fn parse(s: &str) -> Result<Self, PathParseError> {
        s.parse()
    }

    /// Returns a copy of this path extended by `segment`.
    #[must_use]
    pub fn child(&self, segment: impl Into<PathSegment>) -> Self {
        let mut segments = Vec::with_capacity(self.0.len() + 1);
        segments.extend_from_slice(&self.0);
        segments.push(segment.into());
        Self(segments)
    }

    /// Returns this path followed by every segment of `other`.
    #[must_use]
    pub fn join(&self, other: &Self) -> Self {
        let mut segments = self.0.clone();
        segments.extend_from_slice(&other.0);
        Self(segments)
    }

    /// The segments, root first.
    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    /// Returns `true` for the root path.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Looks up the node at this path.
    pub fn get<'a>(&self, doc: &'a Value) -> Option<&'a Value> {
        self.0.iter().try_fold(doc, |node, segment| match (node, segment) {
            (Value::Object(map), PathSegment::Key(key)) => map.get(key),
            (Value::Array(items), PathSegment::Index(i)) => items.get(*i),
            _ => None,
        })
    }

    /// Mutable variant of [`JsonPath::get`].
    pub fn get_mut<'a>(&self, doc: &'a mut Value) -> Option<&'a mut Value> {
        self.0.iter().try_fold(doc, |node, segment| match (node, segment) {
            (Value::Object(map), PathSegment::Key(key)) => map.get_mut(key),
            (Value::Array(items), PathSegment::Index(i)) => items.get_mut(*i),
            _ => None,
        })
    }

    /// Returns `true` if a node exists at this path. An explicit null counts.
    pub fn exists(&self, doc: &Value) -> bool {
        self.get(doc).is_some()
    }

    /// Writes `value` at this path only if nothing is there yet.
    ///
    /// Missing intermediate objects and arrays are created. Arrays shorter
    /// than a requested index are padded with nulls. Returns `false` without
    /// touching the document when the path is already occupied or when an
    /// existing node on the way has the wrong shape (a scalar, or an object
    /// where an index is expected).
    pub fn insert_if_absent(&self, doc: &mut Value, value: Value) -> bool {
        let Some((last, parents)) = self.0.split_last() else {
            return false;
        };

        let mut node = doc;
        for (depth, segment) in parents.iter().enumerate() {
            let next = &self.0[depth + 1];
            node = match (node, segment) {
                (Value::Object(map), PathSegment::Key(key)) => {
                    map.entry(key.clone()).or_insert_with(|| next.empty_container())
                }
                (Value::Array(items), PathSegment::Index(i)) => {
                    if *i >= items.len() {
                        items.resize(*i, Value::Null);
                        items.push(next.empty_container());
                    }
                    &mut items[*i]
                }
                _ => return false,
            };
        }

        match (node, last) {
            (Value::Object(map), PathSegment::Key(key)) => {
                if map.contains_key(key) {
                    return false;
                }
                map.insert(key.clone(), value);
                true
            }
            (Value::Array(items), PathSegment::Index(i)) => {
                if *i < items.len() {
                    return false;
                }
                items.resize(*i, Value::Null);
                items.push(value);
                true
            }
            _ => false,
        }
    }

    /// Overwrites or creates the node at this path.
    ///
    /// Follows the same shape rules as [`JsonPath::insert_if_absent`] for
    /// intermediate nodes. Returns `false` if the path cannot be reached.
    pub fn set(&self, doc: &mut Value, value: Value) -> bool {
        if let Some(slot) = self.get_mut(doc) {
            *slot = value;
            return true;
        }
        self.insert_if_absent(doc, value)
    }
}

impl fmt::Display for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                PathSegment::Key(key) if i == 0 => f.write_str(key)?,
                PathSegment::Key(key) => write!(f, ".{key}")?,
                PathSegment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

impl FromStr for JsonPath {
    type Err = PathParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Self::root());
        }
        let mut segments = Vec::new();
        for part in s.split('.') {
            let (key, mut rest) = match part.find('[') {
                Some(pos) => part.split_at(pos),
                None => (part, ""),
            };
            if !key.is_empty() {
                segments.push(PathSegment::Key(key.to_string()));
            } else if rest.is_empty() {
                return Err(PathParseError::EmptySegment(s.to_string()));
            }
            while !rest.is_empty() {
                let close = rest
                    .find(']')
                    .ok_or_else(|| PathParseError::BadIndex(s.to_string()))?;
                let index = rest[1..close]
                    .parse()
                    .map_err(|_| PathParseError::BadIndex(s.to_string()))?;
                segments.push(PathSegment::Index(index));
                rest = &rest[close + 1..];
                if !rest.is_empty() && !rest.starts_with('[') {
                    return Err(PathParseError::BadIndex(s.to_string()));
                }
            }
        }
        Ok(Self(segments))
    }
}

impl From<Vec<PathSegment>> for JsonPath {
    fn from(segments: Vec<PathSegment>) -> Self {
        Self(segments)
    }
}

/// Error returned by [`JsonPath::parse`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathParseError {
    /// Two dots in a row, or a leading or trailing dot.
    #[error("empty segment in path '{0}'")]
    EmptySegment(String),
    /// An index that is not `[n]`.
    #[error("invalid array index in path '{0}'")]
    BadIndex(String),
}
