//! Order-preserving traversal of document trees
//!
//! [`visit`] dispatches each node to one callback of a [`TreeVisitor`],
//! children first. Object fields are visited in document order and their
//! results are handed to [`TreeVisitor::object`] in that same order.

use indexmap::IndexMap;

use crate::node::{Node, Number};

/// Field names from the document root to the node being visited
///
/// Array elements do not add a segment, so every element of an array shares
/// the path of the field holding the array.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathContext {
    segments: Vec<String>,
}

impl PathContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Dotted name for a type synthesized at this position
    pub fn qualified_name(&self, root: &str) -> String {
        if self.segments.is_empty() {
            return root.to_string();
        }
        let mut name = String::from(root);
        for segment in &self.segments {
            name.push('.');
            name.push_str(segment);
        }
        name
    }

    fn push(&mut self, segment: &str) {
        self.segments.push(segment.to_string());
    }

    fn pop(&mut self) {
        self.segments.pop();
    }
}

/// Per-node-kind callbacks; every callback defaults to `Output::default()`
#[allow(unused_variables)]
pub trait TreeVisitor {
    type Output: Default;
    type Error;

    fn object(
        &mut self,
        path: &PathContext,
        object: &IndexMap<String, Node>,
        fields: IndexMap<String, Self::Output>,
    ) -> Result<Self::Output, Self::Error> {
        Ok(Self::Output::default())
    }

    fn array(
        &mut self,
        path: &PathContext,
        array: &[Node],
        elements: Vec<Self::Output>,
    ) -> Result<Self::Output, Self::Error> {
        Ok(Self::Output::default())
    }

    fn text(&mut self, path: &PathContext, text: &str) -> Result<Self::Output, Self::Error> {
        Ok(Self::Output::default())
    }

    fn number(&mut self, path: &PathContext, number: &Number) -> Result<Self::Output, Self::Error> {
        Ok(Self::Output::default())
    }

    fn bool(&mut self, path: &PathContext, value: bool) -> Result<Self::Output, Self::Error> {
        Ok(Self::Output::default())
    }

    fn binary(&mut self, path: &PathContext, bytes: &[u8]) -> Result<Self::Output, Self::Error> {
        Ok(Self::Output::default())
    }

    fn null_node(&mut self, path: &PathContext) -> Result<Self::Output, Self::Error> {
        Ok(Self::Output::default())
    }

    fn missing(&mut self, path: &PathContext) -> Result<Self::Output, Self::Error> {
        Ok(Self::Output::default())
    }
}

/// Walk `node` with a fresh path context
pub fn visit<V: TreeVisitor>(node: &Node, visitor: &mut V) -> Result<V::Output, V::Error> {
    let mut path = PathContext::new();
    visit_with_path(node, visitor, &mut path)
}

/// Walk `node` starting from a caller-owned path context
///
/// `path` is back to its starting state when this returns, error or not.
pub fn visit_with_path<V: TreeVisitor>(
    node: &Node,
    visitor: &mut V,
    path: &mut PathContext,
) -> Result<V::Output, V::Error> {
    match node {
        Node::Object(object) => {
            let mut fields = IndexMap::with_capacity(object.len());
            for (name, child) in object {
                path.push(name);
                let result = visit_with_path(child, visitor, path);
                path.pop();
                fields.insert(name.clone(), result?);
            }
            visitor.object(path, object, fields)
        }
        Node::Array(array) => {
            let mut elements = Vec::with_capacity(array.len());
            for element in array {
                elements.push(visit_with_path(element, visitor, path)?);
            }
            visitor.array(path, array, elements)
        }
        Node::Text(text) => visitor.text(path, text),
        Node::Number(number) => visitor.number(path, number),
        Node::Bool(value) => visitor.bool(path, *value),
        Node::Binary(bytes) => visitor.binary(path, bytes),
        Node::Null => visitor.null_node(path),
        Node::Missing => visitor.missing(path),
    }
}
