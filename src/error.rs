//! Error types for inference and conversion

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised while walking, inferring or converting documents
#[derive(Error, Debug)]
pub enum Error {
    /// The document contains something the engine cannot read at all
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// The document does not conform to the target schema
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A representation or schema kind outside what the engine handles
    #[error("Unsupported: {0}")]
    UnsupportedConstruct(String),

    /// Schema JSON that does not describe a valid schema
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for per-record conformance failures a batch caller may skip
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }
}

/// Structural mismatch between a document and a target schema
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Cannot convert to {expected}: {found}")]
    KindMismatch { expected: String, found: String },

    #[error("Missing required field {field} of record {record}")]
    MissingField { record: String, field: String },

    #[error("Cannot resolve union: {value} not in {candidates}")]
    UnresolvedUnion { value: String, candidates: String },

    #[error("Binary data is too long: {actual} bytes for fixed {name} of size {size}")]
    FixedOverflow {
        name: String,
        size: usize,
        actual: usize,
    },

    #[error("Symbol {symbol} is not in enum {name}")]
    UnknownSymbol { name: String, symbol: String },
}
