//! Parsed document trees
//!
//! A [`Node`] is an immutable, order-preserving view of one JSON document.
//! Numbers keep the narrowest representation chosen when the literal was
//! parsed, so later stages never re-inspect the text of a number.

use std::fmt;
use std::io::Read;

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::{Error, Result};

static MISSING: Node = Node::Missing;

/// A document node of exactly one kind
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Object(IndexMap<String, Node>),
    Array(Vec<Node>),
    Text(String),
    Number(Number),
    Bool(bool),
    Binary(Vec<u8>),
    Null,
    /// A requested node that does not exist, distinct from `Null`
    Missing,
}

/// Numeric representation fixed at parse time
#[derive(Debug, Clone, PartialEq)]
pub enum Number {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    /// Integer literal outside the signed 64-bit range
    BigInteger(String),
}

/// Discriminant of a [`Node`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Object,
    Array,
    Text,
    Number,
    Bool,
    Binary,
    Null,
    Missing,
}

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Object => "object",
            NodeKind::Array => "array",
            NodeKind::Text => "text",
            NodeKind::Number => "number",
            NodeKind::Bool => "boolean",
            NodeKind::Binary => "binary",
            NodeKind::Null => "null",
            NodeKind::Missing => "missing",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Object(_) => NodeKind::Object,
            Node::Array(_) => NodeKind::Array,
            Node::Text(_) => NodeKind::Text,
            Node::Number(_) => NodeKind::Number,
            Node::Bool(_) => NodeKind::Bool,
            Node::Binary(_) => NodeKind::Binary,
            Node::Null => NodeKind::Null,
            Node::Missing => NodeKind::Missing,
        }
    }

    /// Look up a field; absent fields and non-objects answer `Missing`
    pub fn get(&self, name: &str) -> &Node {
        match self {
            Node::Object(fields) => fields.get(name).unwrap_or(&MISSING),
            _ => &MISSING,
        }
    }

    /// True when this is an object with a field called `name`
    pub fn has(&self, name: &str) -> bool {
        matches!(self, Node::Object(fields) if fields.contains_key(name))
    }

    /// Null or missing
    pub fn is_absent(&self) -> bool {
        matches!(self, Node::Null | Node::Missing)
    }

    pub fn as_number(&self) -> Option<&Number> {
        match self {
            Node::Number(n) => Some(n),
            _ => None,
        }
    }

    /// Render back to JSON; binary becomes an ISO-8859-1 string
    pub fn to_json(&self) -> Value {
        match self {
            Node::Object(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Node::Array(items) => Value::Array(items.iter().map(Node::to_json).collect()),
            Node::Text(s) => Value::String(s.clone()),
            Node::Number(n) => n.to_json(),
            Node::Bool(b) => Value::Bool(*b),
            Node::Binary(bytes) => Value::String(latin1_string(bytes)),
            Node::Null | Node::Missing => Value::Null,
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Missing => f.write_str("<missing>"),
            other => write!(f, "{}", other.to_json()),
        }
    }
}

impl Number {
    pub fn is_int(&self) -> bool {
        matches!(self, Number::Int(_))
    }

    pub fn is_long(&self) -> bool {
        matches!(self, Number::Long(_))
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Number::Float(_))
    }

    pub fn is_double(&self) -> bool {
        matches!(self, Number::Double(_))
    }

    fn to_json(&self) -> Value {
        match self {
            Number::Int(i) => Value::from(*i),
            Number::Long(l) => Value::from(*l),
            Number::Float(f) => Value::from(*f as f64),
            Number::Double(d) => Value::from(*d),
            Number::BigInteger(digits) => {
                serde_json::from_str(digits).unwrap_or_else(|_| Value::String(digits.clone()))
            }
        }
    }
}

impl From<&serde_json::Number> for Number {
    fn from(n: &serde_json::Number) -> Self {
        if let Some(l) = n.as_i64() {
            match i32::try_from(l) {
                Ok(i) => Number::Int(i),
                Err(_) => Number::Long(l),
            }
        } else if let Some(u) = n.as_u64() {
            Number::BigInteger(u.to_string())
        } else {
            // serde_json only hands out finite f64 for non-integers
            Number::Double(n.as_f64().unwrap_or(f64::NAN))
        }
    }
}

impl From<Value> for Node {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Node::Null,
            Value::Bool(b) => Node::Bool(b),
            Value::Number(n) => Node::Number(Number::from(&n)),
            Value::String(s) => Node::Text(s),
            Value::Array(items) => Node::Array(items.into_iter().map(Node::from).collect()),
            Value::Object(fields) => Node::Object(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, Node::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&Value> for Node {
    fn from(value: &Value) -> Self {
        Node::from(value.clone())
    }
}

/// Parse one JSON document
pub fn parse(json: &str) -> Result<Node> {
    let value: Value = serde_json::from_str(json)?;
    Ok(Node::from(value))
}

/// Parse one JSON document from a reader
pub fn parse_reader<R: Read>(reader: R) -> Result<Node> {
    let value: Value = serde_json::from_reader(reader)?;
    Ok(Node::from(value))
}

/// Lazily parse a sequence of whitespace-separated JSON documents
///
/// Covers NDJSON and concatenated JSON. Nothing is read until the iterator
/// is pulled, so callers stop reading by dropping it.
pub fn parse_stream<R: Read>(reader: R) -> impl Iterator<Item = Result<Node>> {
    serde_json::Deserializer::from_reader(reader)
        .into_iter::<Value>()
        .map(|item| item.map(Node::from).map_err(Error::from))
}

/// Bytes as a string of code points 0-255, the Avro JSON encoding
pub(crate) fn latin1_string(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// Inverse of [`latin1_string`]; `None` if a char is above U+00FF
pub(crate) fn latin1_bytes(s: &str) -> Option<Vec<u8>> {
    s.chars().map(|c| u8::try_from(u32::from(c)).ok()).collect()
}
