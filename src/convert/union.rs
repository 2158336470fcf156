//! Union member resolution
//!
//! Members are tried in declared order and the first one the node is
//! structurally compatible with wins, so schema authors set priority by
//! ordering the union.

use tracing::trace;

use crate::error::{Error, Result, ValidationError};
use crate::node::{Node, Number};
use crate::schema::Schema;

/// Pick the first member of `members` that `node` fits
pub fn resolve<'a>(node: &Node, members: &'a [Schema]) -> Result<&'a Schema> {
    for member in members {
        if is_compatible(node, member)? {
            trace!(kind = %member.kind(), node = %node.kind(), "resolved union member");
            return Ok(member);
        }
    }

    Err(ValidationError::UnresolvedUnion {
        value: node.to_string(),
        candidates: Schema::Union(members.to_vec()).to_string(),
    }
    .into())
}

/// Structural compatibility of a node with one union member
pub fn is_compatible(node: &Node, schema: &Schema) -> Result<bool> {
    let compatible = match schema {
        // every field must be present unless it declares a default
        Schema::Record(record) => {
            matches!(node, Node::Object(_))
                && record
                    .fields
                    .iter()
                    .all(|field| node.has(&field.name) || field.default.is_some())
        }
        Schema::Map(_) => matches!(node, Node::Object(_)),
        Schema::Array(_) => matches!(node, Node::Array(_)),
        Schema::Enum(e) => matches!(node, Node::Text(text) if e.symbols.contains(text)),
        Schema::Bytes | Schema::Fixed(_) => matches!(node, Node::Binary(_)),
        Schema::Union(_) => {
            return Err(Error::UnsupportedConstruct(format!(
                "union nested directly in a union: {schema}"
            )))
        }
        scalar => scalar_compatible(node, scalar),
    };
    Ok(compatible)
}

/// Kind test shared by direct scalar conversion and union resolution
pub(crate) fn scalar_compatible(node: &Node, schema: &Schema) -> bool {
    match (schema, node) {
        (Schema::Null, node) => node.is_absent(),
        (Schema::Boolean, Node::Bool(_)) => true,
        (Schema::String, Node::Text(_)) => true,
        (Schema::Int, Node::Number(n)) => n.is_int(),
        (Schema::Long, Node::Number(n)) => n.is_int() || n.is_long(),
        (Schema::Float, Node::Number(n)) => n.is_int() || n.is_float(),
        (Schema::Double, Node::Number(n)) => !matches!(n, Number::BigInteger(_)),
        _ => false,
    }
}
