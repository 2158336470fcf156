//! # Anneal - JSON Schema Inference and Type Coercion
//!
//! Bridges untyped JSON documents and a structural, Avro-style schema model.
//!
//! ## Modules
//!
//! - **walk**: order-preserving traversal with pluggable per-kind visitors
//! - **schema**: schema model, inference from examples, and merging
//! - **convert**: coercion of documents into values shaped by a target schema
//!
//! ## Quick Start
//!
//! ### Schema Inference
//!
//! ```rust
//! use anneal::{infer_schema, Node};
//! use serde_json::json;
//!
//! # fn main() -> anneal::Result<()> {
//! let document = Node::from(json!({"user": {"id": 1, "name": "Alice"}}));
//! let schema = infer_schema(&document, "Event")?;
//!
//! assert_eq!(schema.field("user").and_then(|f| f.schema.name()), Some("Event.user"));
//! # Ok(())
//! # }
//! ```
//!
//! ### Coercion
//!
//! ```rust
//! use anneal::{coerce, Datum, Field, Node, Schema};
//! use serde_json::json;
//!
//! # fn main() -> anneal::Result<()> {
//! let schema = Schema::record(
//!     "Counter",
//!     vec![Field::with_default("count", Schema::Long, json!(0))],
//! );
//! let datum = coerce(&Node::from(json!({})), &schema)?;
//!
//! assert_eq!(datum.get("count"), Some(&Datum::Long(0)));
//! # Ok(())
//! # }
//! ```

use std::io::Read;

pub mod convert;
pub mod error;
pub mod node;
pub mod schema;
pub mod types;
pub mod walk;

// Re-export commonly used types for convenience
pub use convert::{coerce, convert_stream, Coercer, ConvertStats, DatasetWriter, JsonLinesWriter};
pub use error::{Error, Result, ValidationError};
pub use node::{Node, NodeKind, Number};
pub use schema::{
    infer_schema, infer_schema_from_iter, infer_schema_from_reader, infer_schema_with_maps, merge,
    merge_or_union, Field, Schema, SchemaInferenceVisitor,
};
pub use types::{Datum, InferenceConfig};
pub use walk::{visit, PathContext, TreeVisitor};

/// Main entry point: convert a JSON stream into schema-conformant records
pub fn convert_json<R: Read, W: DatasetWriter + ?Sized>(
    reader: R,
    schema: &Schema,
    writer: &mut W,
    skip_invalid: bool,
) -> anyhow::Result<ConvertStats> {
    convert_stream(node::parse_stream(reader), schema, writer, skip_invalid)
}
